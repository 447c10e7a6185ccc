//! Error types for morphspace-engine.

use morphspace_core::error::CoreError;
use morphspace_core::selectors::ScaffoldSelector;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of the exploration engine.
///
/// Tree-consistency variants (`MissingCandidate`, `MissingParent`,
/// `ScaffoldIndexDesync`) indicate a violated structural invariant; they
/// abort the current job rather than being silently ignored. Predicate
/// failures during filtering are not errors: they simply mark a morph as
/// dead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A fingerprint expected in the candidate tree was absent.
    #[error("candidate not found in tree: {smiles}")]
    MissingCandidate { smiles: String },

    /// A morph claimed a parent that is not in the candidate tree.
    #[error("morph {smiles} references missing parent {parent}")]
    MissingParent { smiles: String, parent: String },

    /// The scaffold index diverged from the candidate tree.
    #[error("scaffold index out of sync at scaffold {scaffold}")]
    ScaffoldIndexDesync { scaffold: String },

    /// The scaffold index and the candidate tree disagree in size.
    #[error("scaffold index holds {scaffolds} entries for {candidates} candidates")]
    ScaffoldIndexSize { candidates: usize, scaffolds: usize },

    /// Scaffold mode was requested but no extractor is available.
    #[error("no scaffold extractor available for {0:?}")]
    ScaffoldUnavailable(ScaffoldSelector),

    /// The parallel runtime failed to start or crashed.
    #[error("parallel runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_molecule() {
        let err = EngineError::MissingParent {
            smiles: "CCO".to_string(),
            parent: "CC".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CCO"));
        assert!(msg.contains("CC"));
    }

    #[test]
    fn core_errors_convert() {
        let err: EngineError = CoreError::validation("cnt_morphs", "must be positive").into();
        assert!(matches!(err, EngineError::Core(_)));
    }
}
