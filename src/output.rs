use std::io::{self, Write};

use serde::Serialize;

use crate::batch::BatchSummary;
use crate::reconcile::Report;
use crate::stats::{DirectorySummary, NodeStats};

/// Machine-readable output mode: one pretty JSON document on stdout.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(result: &BatchSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_report(result: &Report) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_stats(result: &NodeStats) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_directory_summary(result: &DirectorySummary) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
