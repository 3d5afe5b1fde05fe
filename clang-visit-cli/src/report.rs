//! Report generation
//!
//! Renders an inspection as a plain-text listing or as JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::{OutputConfig, OutputFormat};
use crate::inspect::{Failure, HeaderReport};

/// Complete inspection run
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub generated_at: String,
    pub tool_version: String,
    pub libclang: PathBuf,
    pub headers: Vec<HeaderReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Failure>,
}

impl InspectionReport {
    pub fn new(libclang: &Path, headers: Vec<HeaderReport>, failures: Vec<Failure>) -> Self {
        Self {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            libclang: libclang.to_path_buf(),
            headers,
            failures,
        }
    }

    pub fn declaration_count(&self) -> usize {
        self.headers.iter().map(|h| h.declarations.len()).sum()
    }
}

/// Plain-text listing
pub fn render_txt(report: &InspectionReport, include_comments: bool) -> Result<String> {
    let mut out = String::new();
    write_txt(&mut out, report, include_comments).context("Failed to render report")?;
    Ok(out)
}

fn write_txt(out: &mut String, report: &InspectionReport, include_comments: bool) -> fmt::Result {

    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "  Header Inspection Report")?;
    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "Generated: {}", report.generated_at)?;
    writeln!(out, "libclang:  {}", report.libclang.display())?;
    writeln!(out, "Headers:   {}", report.headers.len())?;
    writeln!(out, "Declarations: {}", report.declaration_count())?;

    for header in &report.headers {
        writeln!(out)?;
        writeln!(out, "── {} (identity #{}) ──", header.path.display(), header.identity)?;

        for diagnostic in &header.diagnostics {
            writeln!(out, "  ! [{:?}] {}", diagnostic.severity, diagnostic.message)?;
        }

        for decl in &header.declarations {
            write!(out, "  {:>4}:{:<3} {:<10} {}", decl.position.line, decl.position.column, decl.kind, decl.name)?;
            if !decl.type_spelling.is_empty() && decl.type_spelling != decl.name {
                write!(out, " : {}", decl.type_spelling)?;
            }
            if let Some(value) = &decl.value {
                write!(out, " = {}", value)?;
            }
            writeln!(out)?;

            if include_comments {
                if let Some(comment) = &decl.comment {
                    writeln!(out, "             /// {}", comment)?;
                }
            }

            for member in &decl.members {
                write!(out, "             - {} {}", member.kind, member.name)?;
                if !member.type_spelling.is_empty() {
                    write!(out, " : {}", member.type_spelling)?;
                }
                if let Some(width) = member.bit_width {
                    write!(out, " ({} bits)", width)?;
                }
                if let Some(value) = member.value {
                    write!(out, " = {}", value)?;
                }
                writeln!(out)?;
            }
        }

        if !header.cursors.is_empty() {
            writeln!(out, "  Top-level cursors:")?;
            for line in &header.cursors {
                writeln!(out, "    {}", line)?;
            }
        }
    }

    if !report.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failures:")?;
        for failure in &report.failures {
            writeln!(out, "  ✗ {}: {}", failure.path.display(), failure.error)?;
        }
    }

    Ok(())
}

/// Pretty-printed JSON
pub fn render_json(report: &InspectionReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

/// Render in the configured format and write to the output file or stdout
pub fn write_report(report: &InspectionReport, output: &OutputConfig) -> Result<()> {
    let rendered = match output.format {
        OutputFormat::Txt => render_txt(report, output.include_comments)?,
        OutputFormat::Json => render_json(report)?,
    };

    match &output.output_file {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("Failed to write report: {:?}", path))?;
            log::info!("Report written to {:?}", path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
