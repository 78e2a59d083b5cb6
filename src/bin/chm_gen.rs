//! Command-line generator: keys file in, Rust source out.
//!
//! Reads one record per line, takes the key from the configured column,
//! builds the minimal perfect hash, and writes a self-contained Rust module
//! implementing the verified lookup.

use chm_hash::codegen::{self, Style};
use chm_hash::{BuildConfig, Builder};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "chm-gen", version, about = "Generate a minimal perfect hash function from a file of keys")]
struct Cli {
    /// File with one record per line; keys come from `--keycol`.
    keys_file: PathBuf,

    /// Write the generated source here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Comment marker; text from the marker to end of line is ignored.
    #[arg(long, default_value = "#")]
    comment: String,

    /// Column delimiter for the keys file.
    #[arg(long, default_value = ",")]
    splitby: String,

    /// 1-based column holding the keys.
    #[arg(long, default_value_t = 1)]
    keycol: usize,

    /// Vertex ratio ng/n for the construction graph.
    #[arg(long, default_value_t = 2.09)]
    gamma: f64,

    /// Seed for the deterministic salt search.
    #[arg(long)]
    seed: Option<u64>,

    /// Salt-table pairs to try per vertex-table size.
    #[arg(long, default_value_t = 5)]
    trials: u32,

    /// Report construction statistics on stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let text = match fs::read_to_string(&cli.keys_file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: could not read `{}`: {e}", cli.keys_file.display());
            return ExitCode::FAILURE;
        }
    };

    let keys = match read_keys(&text, &cli.comment, &cli.splitby, cli.keycol) {
        Ok(keys) => keys,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::FAILURE;
        }
    };

    if cli.verbose {
        eprintln!("{} keys read from `{}`", keys.len(), cli.keys_file.display());
    }

    let mut cfg = BuildConfig {
        gamma: cli.gamma,
        trials_per_ng: cli.trials,
        ..Default::default()
    };
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }

    let mph = match Builder::new()
        .with_config(cfg)
        .build(keys.iter().map(|k| k.as_bytes()))
    {
        Ok(mph) => mph,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.verbose {
        eprintln!(
            "construction done: n={}, ns={}, ng={}",
            mph.len(),
            mph.s1.len(),
            mph.ng
        );
    }

    let code = codegen::rust_source(&mph, &Style::default());
    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, code) {
                eprintln!("error: could not write `{}`: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
        None => print!("{code}"),
    }
    ExitCode::SUCCESS
}

/// Extract keys from delimited text, skipping blank lines and comments.
fn read_keys(
    text: &str,
    comment: &str,
    splitby: &str,
    keycol: usize,
) -> Result<Vec<String>, String> {
    if keycol == 0 {
        return Err("--keycol is 1-based".into());
    }
    let mut keys = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = if comment.is_empty() {
            raw
        } else {
            raw.split(comment).next().unwrap_or("")
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split(splitby).nth(keycol - 1) {
            Some(col) if !col.trim().is_empty() => keys.push(col.trim().to_string()),
            _ => {
                return Err(format!(
                    "line {}: cannot read key, not enough columns",
                    lineno + 1
                ));
            }
        }
    }
    if keys.is_empty() {
        return Err("no keys found".into());
    }
    Ok(keys)
}
