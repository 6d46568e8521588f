use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TaxoError;

/// Opaque, case-sensitive identifier for one InterPro entry. No pattern is
/// enforced beyond being non-empty; the accession is purely a string key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = TaxoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
            return Err(TaxoError::InvalidAccession(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// The two independent query modes against the taxonomy API. Each mode owns
/// one artifact family in the store, distinguished by its filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum QueryMode {
    #[serde(rename = "taxonomy")]
    Taxonomy,
    #[serde(rename = "taxonomy_by_cellorg")]
    #[value(name = "taxonomy-by-cellorg")]
    TaxonomyByCellOrg,
}

impl QueryMode {
    pub fn suffix(self) -> &'static str {
        match self {
            QueryMode::Taxonomy => "_taxonomy",
            QueryMode::TaxonomyByCellOrg => "_taxonomy_by_cellorg",
        }
    }

    /// Filename for one artifact: `{accession}{suffix}.json`.
    pub fn file_name(self, accession: &Accession) -> String {
        format!("{}{}.json", accession.as_str(), self.suffix())
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Taxonomy => write!(f, "taxonomy"),
            QueryMode::TaxonomyByCellOrg => write!(f, "taxonomy_by_cellorg"),
        }
    }
}

/// Inverse of [`QueryMode::file_name`]. The `_taxonomy` suffix is a strict
/// prefix of `_taxonomy_by_cellorg`, so the longer suffix is matched first;
/// a file from one family is never attributed to the other.
pub fn parse_artifact_name(file_name: &str) -> Option<(Accession, QueryMode)> {
    let stem = file_name.strip_suffix(".json")?;
    for mode in [QueryMode::TaxonomyByCellOrg, QueryMode::Taxonomy] {
        if let Some(accession) = stem.strip_suffix(mode.suffix()) {
            return accession.parse().ok().map(|acc| (acc, mode));
        }
    }
    None
}
