//! Trace export to CSV and JSON.
//!
//! CSV has one row per sample under a unit-bearing header
//! (`wavelength_nm,power_dbm` or `wavelength_nm,power_mw`). JSON carries the
//! scale and unit alongside the two columns.

use anyhow::{Context, Result};
use osa_core::{DecodedTrace, ScaleMode};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// File format for exported traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Two columns, `wavelength_nm,power`, with a header row.
    #[default]
    Csv,
    /// The whole `DecodedTrace` as one JSON object.
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct TraceDocument<'a> {
    mode: ScaleMode,
    power_unit: &'static str,
    samples: usize,
    wavelengths_nm: &'a [f64],
    powers: &'a [f64],
}

fn power_column(trace: &DecodedTrace) -> String {
    format!("power_{}", trace.power_unit().to_ascii_lowercase())
}

/// Write `trace` as CSV.
pub fn write_csv<W: Write>(trace: &DecodedTrace, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["wavelength_nm", power_column(trace).as_str()])?;
    for (wavelength, power) in trace.samples() {
        csv.write_record([wavelength.to_string(), power.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `trace` as pretty-printed JSON.
pub fn write_json<W: Write>(trace: &DecodedTrace, mut writer: W) -> Result<()> {
    let document = TraceDocument {
        mode: trace.mode,
        power_unit: trace.power_unit(),
        samples: trace.len(),
        wavelengths_nm: &trace.wavelengths,
        powers: &trace.powers,
    };
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writeln!(writer)?;
    Ok(())
}

/// Write `trace` in `format`.
pub fn write_trace<W: Write>(trace: &DecodedTrace, format: ExportFormat, writer: W) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(trace, writer),
        ExportFormat::Json => write_json(trace, writer),
    }
}

/// Create `path` (and missing parent directories) and write the trace.
pub fn save_trace(trace: &DecodedTrace, format: ExportFormat, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_trace(trace, format, BufWriter::new(file))
        .with_context(|| format!("Failed to write trace to {}", path.display()))?;
    tracing::info!(path = %path.display(), ?format, samples = trace.len(), "Saved trace");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_trace() -> DecodedTrace {
        DecodedTrace {
            wavelengths: vec![1500.0, 1550.0, 1600.0],
            powers: vec![-57.26, 0.0, 1.0],
            mode: ScaleMode::Logarithmic,
        }
    }

    #[test]
    fn csv_has_one_row_per_sample() {
        let mut out = Vec::new();
        write_csv(&log_trace(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "wavelength_nm,power_dbm");
        assert_eq!(lines[1], "1500,-57.26");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn linear_csv_header_names_milliwatts() {
        let trace = DecodedTrace {
            wavelengths: vec![1550.0],
            powers: vec![1e-9],
            mode: ScaleMode::Linear,
        };
        let mut out = Vec::new();
        write_csv(&trace, &mut out).unwrap();
        assert!(String::from_utf8(out)
            .unwrap()
            .starts_with("wavelength_nm,power_mw\n"));
    }

    #[test]
    fn json_carries_scale_and_unit() {
        let mut out = Vec::new();
        write_json(&log_trace(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["mode"], "LOG");
        assert_eq!(value["power_unit"], "dBm");
        assert_eq!(value["samples"], 3);
        assert_eq!(value["powers"][0], -57.26);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs/a/trace.csv");

        save_trace(&log_trace(), ExportFormat::Csv, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("wavelength_nm,power_dbm"));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/trace.JSON")),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_path(Path::new("trace.csv")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(Path::new("trace")), None);
    }
}
