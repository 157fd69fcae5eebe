use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};

use scopelang::backend::backend_by_name;
use scopelang::config::Config;
use scopelang::diagnostics::{Diagnostic, Diagnostics};
use scopelang::interpreter::RunFailure;
use scopelang::parser;
use scopelang::transpiler::TranspileError;

#[derive(Default)]
struct Args {
    backend: Option<String>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    input: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--backend" | "-b" => {
                parsed.backend = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("Missing backend name after {arg}"))?,
                );
            }
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing config path after {arg}"))?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--output" | "-o" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing output path after {arg}"))?;
                parsed.output = Some(PathBuf::from(path));
            }
            _ => {
                if parsed.input.is_some() {
                    bail!("Only one input file is supported");
                }
                parsed.input = Some(PathBuf::from(arg));
            }
        }
    }
    Ok(parsed)
}

fn read_source(input: Option<&PathBuf>) -> Result<String> {
    if let Some(path) = input {
        return fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()));
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Reading stdin")?;
    Ok(buffer)
}

fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
}

fn write_output(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Writing {}", path.display()))?
        }
        None if !output.is_empty() => println!("{}", output.trim_end_matches('\n')),
        None => {}
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let backend_name = args
        .backend
        .or_else(|| config.backend.clone())
        .unwrap_or_else(|| "interpreter".to_string());
    let output_path = args.output.or_else(|| config.output.clone());
    let backend = backend_by_name(&backend_name, &config)?;

    let source = read_source(args.input.as_ref())?;
    let parsed = match parser::parse(&source) {
        Ok(parsed) => parsed,
        Err(diagnostics) => {
            report(&diagnostics);
            return Ok(ExitCode::FAILURE);
        }
    };

    let output = match backend.run(&parsed) {
        Ok(output) => output,
        Err(error) => {
            if let Some(failure) = error.downcast_ref::<RunFailure>() {
                write_output(&failure.output, output_path.as_deref())?;
                eprintln!("{}", Diagnostic::from(&failure.error));
                return Ok(ExitCode::FAILURE);
            }
            if let Some(error) = error.downcast_ref::<TranspileError>() {
                eprintln!("{}", Diagnostic::from(error));
                return Ok(ExitCode::FAILURE);
            }
            return Err(error);
        }
    };

    write_output(&output, output_path.as_deref())?;
    Ok(ExitCode::SUCCESS)
}
