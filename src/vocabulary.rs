//! # Controlled Vocabularies
//!
//! Canonical value sets for the enumerated fields of the built-in templates,
//! each with a synonym table mapping the spellings seen in real lab sheets to
//! the canonical value. Synonym resolution is reported as a warning by the
//! validator, never applied silently.
//!
//! Canonical values use `Upper_Snake` style so they survive spreadsheet
//! round-trips without quoting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A canonical vocabulary term with its accepted synonyms
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    /// Canonical value written to harmonized output (e.g., "FFPE_Tumor")
    pub value: String,
    /// Human-readable label
    pub label: String,
    /// Spellings that resolve to `value`
    pub synonyms: Vec<String>,
}

impl Term {
    /// Create a term with no synonyms
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            synonyms: Vec::new(),
        }
    }

    /// Add synonyms (builder pattern)
    pub fn with_synonyms(mut self, synonyms: &[&str]) -> Self {
        self.synonyms
            .extend(synonyms.iter().map(|s| s.to_string()));
        self
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}: {}]", self.value, self.label)
    }
}

/// An ordered set of terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    name: String,
    terms: Vec<Term>,
}

impl Vocabulary {
    /// Create an empty vocabulary
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            terms: Vec::new(),
        }
    }

    /// Add a term (builder pattern)
    pub fn with(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    /// Vocabulary name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a term by canonical value
    pub fn get(&self, value: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.value == value)
    }

    /// Iterate over all terms
    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Check if the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Canonical values in declaration order
    pub fn values(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.value.clone()).collect()
    }

    /// Synonym → canonical value table
    pub fn synonym_table(&self) -> BTreeMap<String, String> {
        self.terms
            .iter()
            .flat_map(|t| t.synonyms.iter().map(move |s| (s.clone(), t.value.clone())))
            .collect()
    }
}

impl FromIterator<Term> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Self {
            name: String::new(),
            terms: iter.into_iter().collect(),
        }
    }
}

/// Tissue type and preservation state of a specimen
pub mod tissue_types {
    use super::{Term, Vocabulary};

    /// Formalin-fixed paraffin-embedded tumor tissue
    pub fn ffpe_tumor() -> Term {
        Term::new("FFPE_Tumor", "FFPE tumor").with_synonyms(&[
            "FFPE Tumor",
            "FFPE-Tumor",
            "Tumor FFPE",
            "Tumor_FFPE",
            "FFPE Tumour",
            "FFPE_Tumour",
        ])
    }

    /// Formalin-fixed paraffin-embedded normal tissue
    pub fn ffpe_normal() -> Term {
        Term::new("FFPE_Normal", "FFPE normal").with_synonyms(&[
            "FFPE Normal",
            "FFPE-Normal",
            "Normal FFPE",
            "Normal_FFPE",
            "FFPE Adjacent Normal",
        ])
    }

    /// Fresh frozen tumor tissue
    pub fn fresh_frozen_tumor() -> Term {
        Term::new("FF_Tumor", "Fresh frozen tumor").with_synonyms(&[
            "Fresh Frozen Tumor",
            "Frozen Tumor",
            "FF Tumor",
            "FF-Tumor",
        ])
    }

    /// Fresh frozen normal tissue
    pub fn fresh_frozen_normal() -> Term {
        Term::new("FF_Normal", "Fresh frozen normal").with_synonyms(&[
            "Fresh Frozen Normal",
            "Frozen Normal",
            "FF Normal",
            "FF-Normal",
        ])
    }

    /// Cell pellet or cell line control
    pub fn cell_pellet() -> Term {
        Term::new("Cell_Pellet", "Cell pellet control")
            .with_synonyms(&["Cell Pellet", "CPA", "Cell Line Pellet"])
    }

    /// Full tissue type vocabulary
    pub fn vocabulary() -> Vocabulary {
        Vocabulary::new("tissue_type")
            .with(ffpe_tumor())
            .with(ffpe_normal())
            .with(fresh_frozen_tumor())
            .with(fresh_frozen_normal())
            .with(cell_pellet())
    }
}

/// Spatial and sequencing platforms
pub mod platforms {
    use super::{Term, Vocabulary};

    /// NanoString CosMx Spatial Molecular Imager
    pub fn cosmx() -> Term {
        Term::new("CosMx", "NanoString CosMx SMI").with_synonyms(&["CosMx SMI", "Cosmx SMI", "SMI"])
    }

    /// NanoString GeoMx Digital Spatial Profiler
    pub fn geomx() -> Term {
        Term::new("GeoMx_DSP", "NanoString GeoMx DSP")
            .with_synonyms(&["GeoMx", "GeoMx DSP", "GeoMx-DSP", "DSP"])
    }

    /// 10x Genomics Visium HD
    pub fn visium_hd() -> Term {
        Term::new("Visium_HD", "10x Genomics Visium HD")
            .with_synonyms(&["Visium HD", "VisiumHD", "10x Visium HD", "Visium-HD"])
    }

    /// 10x Genomics Xenium Analyzer
    pub fn xenium() -> Term {
        Term::new("Xenium", "10x Genomics Xenium").with_synonyms(&["Xenium Analyzer", "10x Xenium"])
    }

    /// Illumina sequencing
    pub fn illumina() -> Term {
        Term::new("Illumina", "Illumina sequencing").with_synonyms(&["Illumina Sequencing", "ILMN"])
    }

    /// Full platform vocabulary
    pub fn vocabulary() -> Vocabulary {
        Vocabulary::new("platform")
            .with(cosmx())
            .with(geomx())
            .with(visium_hd())
            .with(xenium())
            .with(illumina())
    }
}

/// Tissue preservation methods
pub mod preservation_methods {
    use super::{Term, Vocabulary};

    /// Formalin-fixed paraffin-embedded
    pub fn ffpe() -> Term {
        Term::new("FFPE", "Formalin-fixed paraffin-embedded").with_synonyms(&[
            "Formalin-Fixed Paraffin-Embedded",
            "Formalin Fixed Paraffin Embedded",
            "Paraffin",
        ])
    }

    /// Fresh frozen
    pub fn fresh_frozen() -> Term {
        Term::new("Fresh_Frozen", "Fresh frozen").with_synonyms(&["Fresh Frozen", "FF", "Frozen"])
    }

    /// Fixed frozen
    pub fn fixed_frozen() -> Term {
        Term::new("Fixed_Frozen", "Fixed frozen").with_synonyms(&["Fixed Frozen", "PFA Frozen"])
    }

    /// Optimal cutting temperature compound embedding
    pub fn oct() -> Term {
        Term::new("OCT", "OCT embedded").with_synonyms(&["OCT Embedded", "O.C.T."])
    }

    /// Full preservation method vocabulary
    pub fn vocabulary() -> Vocabulary {
        Vocabulary::new("preservation_method")
            .with(ffpe())
            .with(fresh_frozen())
            .with(fixed_frozen())
            .with(oct())
    }
}

/// Illumina sequencing instruments
pub mod instruments {
    use super::{Term, Vocabulary};

    /// NovaSeq 6000
    pub fn novaseq_6000() -> Term {
        Term::new("NovaSeq_6000", "Illumina NovaSeq 6000")
            .with_synonyms(&["NovaSeq 6000", "NovaSeq6000", "NovaSeq-6000"])
    }

    /// NovaSeq X / X Plus
    pub fn novaseq_x() -> Term {
        Term::new("NovaSeq_X", "Illumina NovaSeq X").with_synonyms(&[
            "NovaSeq X",
            "NovaSeq X Plus",
            "NovaSeqX",
        ])
    }

    /// NextSeq 2000
    pub fn nextseq_2000() -> Term {
        Term::new("NextSeq_2000", "Illumina NextSeq 2000")
            .with_synonyms(&["NextSeq 2000", "NextSeq2000"])
    }

    /// MiSeq
    pub fn miseq() -> Term {
        Term::new("MiSeq", "Illumina MiSeq").with_synonyms(&["Mi-Seq", "MiSeq Dx"])
    }

    /// Full instrument vocabulary
    pub fn vocabulary() -> Vocabulary {
        Vocabulary::new("sequencing_instrument")
            .with(novaseq_6000())
            .with(novaseq_x())
            .with(nextseq_2000())
            .with(miseq())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_display() {
        let term = tissue_types::ffpe_tumor();
        assert_eq!(term.to_string(), "[FFPE_Tumor: FFPE tumor]");
    }

    #[test]
    fn test_synonym_table_targets_are_canonical() {
        for vocabulary in [
            tissue_types::vocabulary(),
            platforms::vocabulary(),
            preservation_methods::vocabulary(),
            instruments::vocabulary(),
        ] {
            let values = vocabulary.values();
            for (synonym, target) in vocabulary.synonym_table() {
                assert!(values.contains(&target), "{} -> {}", synonym, target);
                assert!(!values.contains(&synonym), "synonym {} shadows a value", synonym);
            }
        }
    }

    #[test]
    fn test_vocabulary_lookup() {
        let vocabulary = tissue_types::vocabulary();
        assert_eq!(vocabulary.len(), 5);
        assert_eq!(vocabulary.name(), "tissue_type");
        assert!(vocabulary.get("FFPE_Normal").is_some());
        assert!(vocabulary.get("FFPE Normal").is_none());
        assert_eq!(
            vocabulary.synonym_table().get("Tumor FFPE").map(String::as_str),
            Some("FFPE_Tumor")
        );
    }
}
