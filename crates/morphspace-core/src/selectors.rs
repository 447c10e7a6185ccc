//! Selector enums for the pluggable chemistry primitives.
//!
//! A job names the fingerprint, similarity coefficient, dimensionality
//! reduction, morphing operators and scaffold level it wants; the concrete
//! implementations live behind the traits in [`crate::traits`].

use serde::{Deserialize, Serialize};

/// Molecular fingerprint used for similarity computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FingerprintSelector {
    #[default]
    Morgan,
    AtomPair,
    TopologicalTorsion,
    Maccs,
}

/// Similarity coefficient applied to a fingerprint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SimCoefSelector {
    #[default]
    Tanimoto,
    Dice,
    Cosine,
}

/// Dimensionality-reduction method for visualization output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DimRedSelector {
    #[default]
    Pca,
    Kpca,
}

/// Structural morphing operator applied by the morphing kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChemOper {
    AddAtom,
    RemoveAtom,
    AddBond,
    RemoveBond,
    MutateAtom,
    InterlayAtom,
    RerouteBond,
    ContractBond,
}

impl ChemOper {
    /// The full operator set, used when a job does not restrict operators.
    pub fn all() -> Vec<ChemOper> {
        vec![
            ChemOper::AddAtom,
            ChemOper::RemoveAtom,
            ChemOper::AddBond,
            ChemOper::RemoveBond,
            ChemOper::MutateAtom,
            ChemOper::InterlayAtom,
            ChemOper::RerouteBond,
            ChemOper::ContractBond,
        ]
    }
}

/// Scaffold level used as secondary identity, or `Off` for plain mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaffoldSelector {
    #[default]
    Off,
    MostGeneral,
    OriginalMolecule,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_behavior() {
        assert_eq!(FingerprintSelector::default(), FingerprintSelector::Morgan);
        assert_eq!(SimCoefSelector::default(), SimCoefSelector::Tanimoto);
        assert_eq!(ScaffoldSelector::default(), ScaffoldSelector::Off);
    }

    #[test]
    fn selectors_round_trip_through_json() {
        let ops = ChemOper::all();
        let json = serde_json::to_string(&ops).unwrap();
        let back: Vec<ChemOper> = serde_json::from_str(&json).unwrap();
        assert_eq!(ops, back);
    }
}
