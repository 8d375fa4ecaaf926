//
//  bkt-cli
//  output/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Output Formatting
//!
//! Commands print through an [`OutputWriter`], which renders records as a
//! table (default), JSON (`--json`) or YAML (`--yaml`). Status lines go to
//! the same stream and are prefixed with `✓`; errors and warnings go to the
//! error stream.
//!
//! ```rust,no_run
//! use bkt::output::{OutputFormat, OutputWriter};
//!
//! let mut out = OutputWriter::stdout(OutputFormat::Json);
//! out.write_value(&serde_json::json!({"id": 1}))?;
//! out.write_success("done")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod table;

pub use table::*;

use std::io::{self, Write};

use anyhow::Result;
use console::style;
use serde::Serialize;

/// How records are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables and field lists.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

impl OutputFormat {
    /// Picks the format from the global flags.
    pub fn from_flags(json: bool, yaml: bool) -> Self {
        match (json, yaml) {
            (true, _) => Self::Json,
            (false, true) => Self::Yaml,
            _ => Self::Table,
        }
    }

    /// `true` for JSON and YAML.
    pub fn is_structured(self) -> bool {
        !matches!(self, Self::Table)
    }
}

/// Writes command output to a pair of streams.
pub struct OutputWriter {
    format: OutputFormat,
    color: bool,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl OutputWriter {
    /// A writer over arbitrary streams.
    pub fn new(format: OutputFormat, out: Box<dyn Write + Send>, err: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            format,
            color,
            out,
            err,
        }
    }

    /// A writer over the process's stdout and stderr.
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(
            format,
            Box::new(io::stdout()),
            Box::new(io::stderr()),
            console::colors_enabled(),
        )
    }

    /// The active format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Raw access to the output stream (for downloads and `bkt api`).
    pub fn raw(&mut self) -> &mut (dyn Write + Send) {
        self.out.as_mut()
    }

    fn structured<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<bool> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.out, value)?;
                writeln!(self.out)?;
                Ok(true)
            }
            OutputFormat::Yaml => {
                let value = yaml_value(serde_json::to_value(value)?);
                self.out.write_all(serde_yaml::to_string(&value)?.as_bytes())?;
                Ok(true)
            }
            OutputFormat::Table => Ok(false),
        }
    }

    /// Writes a list of records.
    pub fn write_list<T: Serialize + TableOutput>(&mut self, records: &[T]) -> Result<()> {
        if self.structured(records)? {
            return Ok(());
        }
        if records.is_empty() {
            writeln!(self.out, "No results")?;
        } else {
            writeln!(self.out, "{}", render_table(records, self.color))?;
        }
        Ok(())
    }

    /// Writes one record as a field list.
    pub fn write_record<T: Serialize + TableOutput>(&mut self, record: &T) -> Result<()> {
        if self.structured(record)? {
            return Ok(());
        }
        let fields = record.fields();
        let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in fields {
            let label = format!("{key:<width$}");
            if self.color {
                writeln!(self.out, "{}  {}", style(label).dim(), value)?;
            } else {
                writeln!(self.out, "{label}  {value}")?;
            }
        }
        Ok(())
    }

    /// Writes an arbitrary value; tables fall back to pretty JSON.
    pub fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        if !self.structured(value)? {
            serde_json::to_writer_pretty(&mut self.out, value)?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// `✓ message` status line.
    pub fn write_success(&mut self, msg: &str) -> Result<()> {
        if self.color {
            writeln!(self.out, "{} {}", style("✓").green().bold(), msg)?;
        } else {
            writeln!(self.out, "✓ {msg}")?;
        }
        Ok(())
    }

    /// Plain informational line.
    pub fn write_info(&mut self, msg: &str) -> Result<()> {
        writeln!(self.out, "{msg}")?;
        Ok(())
    }

    /// `warning:` line on the error stream.
    pub fn write_warning(&mut self, msg: &str) {
        let _ = if self.color {
            writeln!(self.err, "{} {}", style("warning:").yellow().bold(), msg)
        } else {
            writeln!(self.err, "warning: {msg}")
        };
    }

    /// `error:` line on the error stream.
    pub fn write_error(&mut self, msg: &str) {
        let _ = if self.color {
            writeln!(self.err, "{} {}", style("error:").red().bold(), msg)
        } else {
            writeln!(self.err, "error: {msg}")
        };
    }

    /// Flushes both streams.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        self.err.flush()?;
        Ok(())
    }
}

/// Re-expresses JSON as YAML. Integers outside the 64-bit range are written
/// as their decimal text, since YAML numbers cannot carry them.
fn yaml_value(value: serde_json::Value) -> serde_yaml::Value {
    use serde_json::Value as Json;
    use serde_yaml::Value as Yaml;

    match value {
        Json::Null => Yaml::Null,
        Json::Bool(b) => Yaml::Bool(b),
        Json::Number(n) => {
            if let Some(u) = n.as_u64() {
                Yaml::Number(u.into())
            } else if let Some(i) = n.as_i64() {
                Yaml::Number(i.into())
            } else if n.to_string().contains(['.', 'e', 'E']) {
                n.as_f64()
                    .map(|f| Yaml::Number(f.into()))
                    .unwrap_or_else(|| Yaml::String(n.to_string()))
            } else {
                Yaml::String(n.to_string())
            }
        }
        Json::String(s) => Yaml::String(s),
        Json::Array(items) => Yaml::Sequence(items.into_iter().map(yaml_value).collect()),
        Json::Object(map) => Yaml::Mapping(
            map.into_iter()
                .map(|(k, v)| (Yaml::String(k), yaml_value(v)))
                .collect(),
        ),
    }
}
