use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::Accession;
use crate::error::TaxoError;

/// Missing accessions shown in a human summary before truncating.
pub const MISSING_DISPLAY_LIMIT: usize = 10;
/// Extra accessions shown in a human summary before truncating.
pub const EXTRA_DISPLAY_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub required_count: usize,
    pub completed_count: usize,
    pub missing_count: usize,
    pub completed_pct: f64,
    pub missing_pct: f64,
    /// Every required accession with no artifact, sorted ascending.
    pub missing: Vec<Accession>,
    /// Every stored accession not in the required set, sorted ascending.
    pub extra: Vec<Accession>,
}

/// Diffs the required set against the completion ledger. Percentages are
/// computed against the required count; an empty required set reports 100%
/// complete rather than dividing by zero.
pub fn reconcile(required: &BTreeSet<Accession>, completed: &BTreeSet<Accession>) -> Report {
    let missing: Vec<Accession> = required.difference(completed).cloned().collect();
    let extra: Vec<Accession> = completed.difference(required).cloned().collect();
    let completed_count = required.intersection(completed).count();

    let (completed_pct, missing_pct) = if required.is_empty() {
        (100.0, 0.0)
    } else {
        let total = required.len() as f64;
        (
            completed_count as f64 / total * 100.0,
            missing.len() as f64 / total * 100.0,
        )
    };

    Report {
        required_count: required.len(),
        completed_count,
        missing_count: missing.len(),
        completed_pct,
        missing_pct,
        missing,
        extra,
    }
}

impl Report {
    /// Writes the full missing list, one accession per line. Display
    /// truncation never applies here.
    pub fn write_missing(&self, path: &Path) -> Result<(), TaxoError> {
        let mut content = String::new();
        for accession in &self.missing {
            content.push_str(accession.as_str());
            content.push('\n');
        }
        fs::write(path, content).map_err(|err| TaxoError::Filesystem(err.to_string()))
    }
}
