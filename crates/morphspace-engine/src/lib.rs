//! Morphspace Exploration Engine
//!
//! A parallel, iterative best-first engine that grows a tree of candidate
//! molecules from one or more sources, applying randomized morphing
//! operators and committing the winners back into a shared concurrent tree.
//!
//! Two closely related exploration variants share one parameterized engine:
//!
//! - **Path mode** explores from a single source toward a target molecule,
//!   measuring proximity by structural distance; optional decoys bias the
//!   search along an arc passing through the decoys.
//! - **Activity mode** explores from a pool of sources toward an etalon
//!   point in a numeric descriptor space, with Pareto-style non-domination
//!   filtering and iteration-based decay of stale branches.
//!
//! Each iteration is a pipeline of data-parallel stages: leaf/bag
//! selection, morph generation, sorting, filtering, Pareto reduction,
//! scan-based acceptance, improvement back-propagation and pruning, all
//! operating on the shared [`morphspace_core::Context`] under one
//! cancellation token. The [`explorer::Explorer`] drives iterations and
//! hands results to the surrounding job manager.
//!
//! Chemistry, descriptor computation and visualization enter only through
//! the traits in `morphspace_core::traits`, so the engine itself stays free
//! of RDKit/PaDEL specifics and can be exercised with in-memory stand-ins.

pub mod collect;
pub mod error;
pub mod explorer;
pub mod rng;
pub mod runtime;
pub mod stages;

pub use error::{EngineError, EngineResult};
pub use explorer::{Explorer, Mode};
