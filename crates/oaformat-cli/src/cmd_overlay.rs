use crate::io::{self, Format};
use anyhow::{Context, Result};
use oaformat::{OverlayReport, OverlaySet, apply_overlay};
use std::path::PathBuf;

pub fn run(
    input: String,
    overlay_file: PathBuf,
    output: Option<PathBuf>,
    report: bool,
    pretty: bool,
) -> Result<()> {
    let (doc, input_format) = io::read_document(&input)?;
    let overlay = OverlaySet::from_value(io::read_rules(&overlay_file)?);
    let overlaid = apply_overlay(&doc, &overlay).context("failed to apply overlay")?;

    if report {
        eprint!("{}", format_report(&overlaid.report, pretty)?);
    }

    let format = output
        .as_deref()
        .and_then(Format::from_path)
        .unwrap_or(input_format);
    let rendered = io::render(&overlaid.data, format, pretty)?;
    match &output {
        Some(path) => io::write_atomic(path, &rendered)?,
        None => print!("{}", rendered),
    }
    Ok(())
}

fn format_report(report: &OverlayReport, pretty: bool) -> Result<String> {
    let mut out = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .context("failed to serialize overlay report")?;
    out.push('\n');
    Ok(out)
}
