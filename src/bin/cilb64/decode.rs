use std::path::{Path, PathBuf};

use anyhow::Context;
use cilb64::{deobfuscation::decode_module, Module, WriteSummary, WriterOptions};
use serde::Serialize;

use crate::{
    app::Cli,
    output::{print_output, GridWriter},
};

const SUFFIX: &str = "_decoded";
const DEFAULT_EXTENSION: &str = "exe";
const DROPPED: &str = "decoded, but the edit could not be written back";

#[derive(Debug, Serialize)]
struct DecodeReport {
    file: String,
    output: Option<String>,
    decoded: Vec<DecodedEntry>,
    failures: Vec<FailureEntry>,
}

#[derive(Debug, Serialize)]
struct DecodedEntry {
    encoded: String,
    decoded: String,
    method: String,
    offset: String,
}

#[derive(Debug, Serialize)]
struct FailureEntry {
    encoded: Option<String>,
    cause: String,
    method: String,
    offset: String,
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let path = cli.path.as_path();

    let mut module = Module::from_file(path)
        .with_context(|| format!("failed to load assembly: {}", path.display()))?;
    let result = decode_module(&mut module);

    let mut report = DecodeReport {
        file: path.display().to_string(),
        output: None,
        decoded: Vec::new(),
        failures: result
            .failures
            .iter()
            .map(|failure| FailureEntry {
                encoded: failure.encoded.clone(),
                cause: failure.cause.clone(),
                method: failure.method.to_string(),
                offset: il_offset(failure.offset),
            })
            .collect(),
    };

    if result.is_empty() {
        log::info!("No Base64 strings decoded in {}", path.display());
        if cli.json {
            print_output(&report, true, |_| {})?;
        }
        return Ok(());
    }

    let options = if cli.strict {
        WriterOptions::strict()
    } else {
        WriterOptions::default()
    };
    let output_path = output_path(path);
    let summary = write_module(&module, &output_path, &options)?;

    for pair in &result.decoded {
        if summary.is_neutralized(pair.method, pair.offset) {
            report.decoded.push(DecodedEntry {
                encoded: pair.encoded.clone(),
                decoded: pair.decoded.clone(),
                method: pair.method.to_string(),
                offset: il_offset(pair.offset),
            });
        } else {
            report.failures.push(FailureEntry {
                encoded: Some(pair.encoded.clone()),
                cause: DROPPED.to_string(),
                method: pair.method.to_string(),
                offset: il_offset(pair.offset),
            });
        }
    }

    if summary.is_empty() {
        log::info!(
            "None of the {} decoded strings could be written back; no output file created",
            result.decoded.len()
        );
        if cli.json {
            print_output(&report, true, |_| {})?;
        }
        return Ok(());
    }

    report.output = Some(output_path.display().to_string());
    if cli.json {
        return print_output(&report, true, |_| {});
    }

    print_output(&report, false, print_table)?;
    println!("Modified binary saved as: {}", output_path.display());

    Ok(())
}

fn write_module(
    module: &Module,
    output_path: &Path,
    options: &WriterOptions,
) -> anyhow::Result<WriteSummary> {
    module
        .write(output_path, options)
        .with_context(|| format!("failed to write output: {}", output_path.display()))
}

fn il_offset(offset: u32) -> String {
    format!("IL_{offset:04x}")
}

fn print_table(report: &DecodeReport) {
    let mut grid = GridWriter::new(&["Encoded Base64", "Decoded Value"]);
    for entry in &report.decoded {
        grid.row(vec![entry.encoded.clone(), entry.decoded.clone()]);
    }
    grid.print();

    println!();
    println!("Number of decoded strings: {}", report.decoded.len());
}

/// `<dir>/<stem>_decoded.<ext>` next to the input; inputs without an extension get `.exe`.
fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or("output", |s| s.to_str().unwrap_or("output"));
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_EXTENSION);

    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}{SUFFIX}.{ext}"))
}
