use std::fs;
use std::path::Path;

use crate::error::TaxoError;

pub const DEFAULT_COLUMN: &str = "Accession";

/// Reads one column of a tab-separated table, first row being the header.
/// The column lookup is case-sensitive; a missing column is fatal and the
/// error names the columns that do exist. Row order is preserved, empty
/// cells are skipped.
pub fn load_column(path: &Path, column: &str) -> Result<Vec<String>, TaxoError> {
    let content = fs::read_to_string(path).map_err(|err| TaxoError::TableRead {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;

    let mut lines = content.lines();
    let header = lines.next().ok_or_else(|| TaxoError::TableRead {
        path: path.display().to_string(),
        message: "table is empty".to_string(),
    })?;

    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
    let index = columns
        .iter()
        .position(|name| *name == column)
        .ok_or_else(|| TaxoError::MissingColumn {
            column: column.to_string(),
            available: columns.join(", "),
        })?;

    let mut values = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(cell) = line.split('\t').nth(index) {
            let cell = cell.trim();
            if !cell.is_empty() {
                values.push(cell.to_string());
            }
        }
    }
    Ok(values)
}

/// Splits a table's data rows round-robin into `parts` files named
/// `{stem}_part{i}.tsv`, each carrying the original header. Part `i` holds
/// rows `i, i+parts, i+2*parts, ...` of the source.
pub fn split(path: &Path, parts: usize) -> Result<Vec<std::path::PathBuf>, TaxoError> {
    if parts == 0 {
        return Err(TaxoError::TableRead {
            path: path.display().to_string(),
            message: "cannot split into zero parts".to_string(),
        });
    }
    let content = fs::read_to_string(path).map_err(|err| TaxoError::TableRead {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    let mut lines = content.lines();
    let header = lines.next().ok_or_else(|| TaxoError::TableRead {
        path: path.display().to_string(),
        message: "table is empty".to_string(),
    })?;
    let rows: Vec<&str> = lines.filter(|line| !line.trim().is_empty()).collect();

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut written = Vec::new();
    for part in 0..parts {
        let mut out = String::with_capacity(content.len() / parts + header.len());
        out.push_str(header);
        out.push('\n');
        for row in rows.iter().skip(part).step_by(parts) {
            out.push_str(row);
            out.push('\n');
        }
        let out_path = dir.join(format!("{stem}_part{}.tsv", part + 1));
        fs::write(&out_path, out).map_err(|err| TaxoError::Filesystem(err.to_string()))?;
        written.push(out_path);
    }
    Ok(written)
}
