//! Morphspace Core Library
//!
//! Core domain types, contracts and shared state for the morphspace
//! chemical-space exploration engine.
//!
//! This crate defines:
//! - Domain types (`Molecule`, `MorphingParams`, selector enums)
//! - The shared per-job [`Context`] and the concurrent [`CandidateStore`]
//! - Snapshot (de)serialization for job persistence (`IterationSnapshot`)
//! - Cooperative cancellation (`CancelToken`)
//! - Trait interfaces for every external collaborator (morphing kernel,
//!   similarity measure, scaffold extraction, descriptor computation,
//!   dimensionality reduction, job manager)
//! - Error types and result aliases
//!
//! The iteration engine itself lives in `morphspace-engine`; this crate is
//! deliberately free of exploration logic so that alternative engines and
//! job managers can share one data model.
//!
//! # Example
//!
//! ```
//! use morphspace_core::molecule::Molecule;
//!
//! let mut parent = Molecule::new("CCO");
//! parent.descendants.insert("CCN".to_string());
//! assert!(parent.is_source());
//! ```

pub mod cancel;
pub mod context;
pub mod error;
pub mod molecule;
pub mod params;
pub mod selectors;
pub mod snapshot;
pub mod store;
pub mod traits;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use context::Context;
pub use error::{CoreError, CoreResult};
pub use molecule::Molecule;
pub use params::MorphingParams;
pub use selectors::{
    ChemOper, DimRedSelector, FingerprintSelector, ScaffoldSelector, SimCoefSelector,
};
pub use snapshot::IterationSnapshot;
pub use store::CandidateStore;
