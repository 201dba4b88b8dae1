//! Output formatting for CLI commands.

use std::io::{self, Write};

use serde::Serialize;

use crate::cli::args::{OutputFormat, VariaArgs};
use crate::error::Result;
use crate::indexer::{IndexMetadata, WriteFailure, WriteReport};
use crate::search::SearchResult;

/// Human-readable rendering of a command result.
pub trait HumanOutput {
    fn write_human(&self, out: &mut dyn Write, verbosity: u8) -> io::Result<()>;
}

/// Summary of indexing a batch of content items.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexingSummary {
    pub index: String,
    pub items: usize,
    pub skipped: usize,
    pub written: usize,
    pub deleted: u64,
    pub failures: Vec<WriteFailure>,
    pub duration_ms: u64,
}

impl IndexingSummary {
    pub fn add(&mut self, report: WriteReport) {
        self.index = report.index;
        self.items += 1;
        if report.skipped {
            self.skipped += 1;
        }
        self.written += report.written;
        self.deleted += report.deleted;
        self.failures.extend(report.failures);
    }
}

/// Statistics of one index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatsOutput {
    pub index: String,
    #[serde(flatten)]
    pub metadata: IndexMetadata,
}

fn write_failures(out: &mut dyn Write, failures: &[WriteFailure]) -> io::Result<()> {
    for failure in failures {
        match &failure.document_id {
            Some(id) => writeln!(out, "  failed [{id}]: {}", failure.reason)?,
            None => writeln!(out, "  failed: {}", failure.reason)?,
        }
    }
    Ok(())
}

impl HumanOutput for WriteReport {
    fn write_human(&self, out: &mut dyn Write, _verbosity: u8) -> io::Result<()> {
        if self.skipped {
            return writeln!(
                out,
                "{} on [{}] skipped: this node may not mutate indexes",
                self.operation, self.index
            );
        }
        let status = if self.is_success() { "done" } else { "failed" };
        writeln!(out, "{} on [{}] {status}", self.operation, self.index)?;
        if self.deleted > 0 {
            writeln!(out, "  deleted: {}", self.deleted)?;
        }
        write_failures(out, &self.failures)
    }
}

impl HumanOutput for IndexingSummary {
    fn write_human(&self, out: &mut dyn Write, _verbosity: u8) -> io::Result<()> {
        writeln!(out, "Indexed {} items into [{}]", self.items, self.index)?;
        writeln!(out, "  documents written: {}", self.written)?;
        writeln!(out, "  stale documents removed: {}", self.deleted)?;
        if self.skipped > 0 {
            writeln!(out, "  skipped: {}", self.skipped)?;
        }
        writeln!(out, "  duration: {} ms", self.duration_ms)?;
        write_failures(out, &self.failures)
    }
}

impl HumanOutput for IndexStatsOutput {
    fn write_human(&self, out: &mut dyn Write, _verbosity: u8) -> io::Result<()> {
        writeln!(out, "Index [{}]", self.index)?;
        writeln!(out, "  documents: {}", self.metadata.document_count)?;
        writeln!(out, "  health: {:?}", self.metadata.health)
    }
}

impl HumanOutput for SearchResult {
    fn write_human(&self, out: &mut dyn Write, verbosity: u8) -> io::Result<()> {
        writeln!(out, "Found {} documents", self.total)?;
        for (rank, document) in self.documents.iter().enumerate() {
            writeln!(out, "{:>4}. {} ({})", rank + 1, document.key, document.object_type)?;
        }
        for facet in &self.facets {
            writeln!(out)?;
            writeln!(out, "{}:", facet.field_name)?;
            if facet.values.is_empty() && verbosity > 1 {
                writeln!(out, "  (no values)")?;
            }
            for value in &facet.values {
                writeln!(out, "  {:<30} {:>8}", value.label(), value.count())?;
            }
        }
        Ok(())
    }
}

/// Output a result in the selected format.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &VariaArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output_format {
        OutputFormat::Human => result.write_human(&mut out, args.verbosity())?,
        OutputFormat::Json => {
            let json = if args.pretty {
                serde_json::to_string_pretty(result)?
            } else {
                serde_json::to_string(result)?
            };
            writeln!(out, "{json}")?;
        }
    }
    Ok(())
}
