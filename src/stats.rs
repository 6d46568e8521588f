use camino::Utf8Path;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::domain::{Accession, QueryMode};
use crate::error::TaxoError;
use crate::store::ArtifactStore;

/// Node counts for one stored taxonomy artifact. All fields tolerate being
/// absent from the document: `count`, `results`, `metadata.children` and the
/// pagination cursors are optional in the API response.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStats {
    pub api_count: u64,
    pub nodes_in_file: usize,
    pub nodes_with_children: usize,
    pub leaf_nodes: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// No pagination cursor in either direction: the file holds the whole
    /// dataset the API knows about.
    pub complete: bool,
}

pub fn stats_for_value(value: &Value) -> NodeStats {
    let api_count = value.get("count").and_then(|v| v.as_u64()).unwrap_or(0);
    let empty = Vec::new();
    let results = value
        .get("results")
        .and_then(|v| v.as_array())
        .unwrap_or(&empty);

    let nodes_with_children = results
        .iter()
        .filter(|node| {
            node.get("metadata")
                .and_then(|m| m.get("children"))
                .and_then(|c| c.as_array())
                .is_some_and(|children| !children.is_empty())
        })
        .count();

    let has_next_page = value.get("next").is_some_and(|v| !v.is_null());
    let has_previous_page = value.get("previous").is_some_and(|v| !v.is_null());

    NodeStats {
        api_count,
        nodes_in_file: results.len(),
        nodes_with_children,
        leaf_nodes: results.len() - nodes_with_children,
        has_next_page,
        has_previous_page,
        complete: !has_next_page && !has_previous_page,
    }
}

pub fn stats_for_file(path: &Utf8Path) -> Result<NodeStats, TaxoError> {
    let content = std::fs::read_to_string(path.as_std_path())
        .map_err(|err| TaxoError::Filesystem(err.to_string()))?;
    let value: Value =
        serde_json::from_str(&content).map_err(|err| TaxoError::Decode(err.to_string()))?;
    Ok(stats_for_value(&value))
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub accession: Accession,
    #[serde(flatten)]
    pub stats: NodeStats,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct DirectorySummary {
    pub files: Vec<FileStats>,
    pub failed_files: usize,
    pub complete_files: usize,
    pub incomplete_files: usize,
    pub api_node_total: u64,
    pub stored_node_total: usize,
}

/// Aggregates node statistics over every artifact of one family. A file that
/// cannot be read or parsed is counted and warned about, not fatal.
pub fn summarize_store(store: &ArtifactStore, mode: QueryMode) -> DirectorySummary {
    let mut summary = DirectorySummary::default();
    for accession in store.list_completed(mode) {
        let path = store.artifact_path(&accession, mode);
        match stats_for_file(&path) {
            Ok(stats) => {
                if stats.complete {
                    summary.complete_files += 1;
                } else {
                    summary.incomplete_files += 1;
                }
                summary.api_node_total += stats.api_count;
                summary.stored_node_total += stats.nodes_in_file;
                summary.files.push(FileStats { accession, stats });
            }
            Err(err) => {
                warn!(%path, cause = %err, "skipping unreadable artifact");
                summary.failed_files += 1;
            }
        }
    }
    summary
}
