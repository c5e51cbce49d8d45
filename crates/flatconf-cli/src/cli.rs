//! flatconf CLI - resolve, inspect, and check flat key=value configuration
//!
//! Usage:
//!   flatconf resolve app.conf --format json
//!   flatconf get app.conf font-size
//!   flatconf check a.conf b.conf

use clap::{Parser, Subcommand};
use colored::Colorize;
use flatconf_core::{
    encode, resolve_path, resolve_unit_lenient, Document, EngineOptions, FsResolver,
    LineDiagnostic, Resolver,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// flatconf - flat key=value configuration with includes
#[derive(Parser)]
#[command(name = "flatconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a configuration file, expanding all includes
    Resolve {
        /// Configuration file to resolve
        file: PathBuf,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip malformed lines (reported on stderr) instead of failing
        #[arg(long)]
        lenient: bool,

        /// Include directive key
        #[arg(long, default_value = "config-file")]
        include_key: String,

        /// Maximum include depth
        #[arg(long, default_value_t = 16)]
        max_depth: usize,
    },

    /// Print the resolved value(s) for a single key
    Get {
        /// Configuration file
        file: PathBuf,

        /// Key to look up
        key: String,

        /// Print every value for the key, not just the last
        #[arg(short, long)]
        all: bool,

        /// Include directive key
        #[arg(long, default_value = "config-file")]
        include_key: String,
    },

    /// Parse and resolve files, reporting errors without producing output
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Skip malformed lines (reported on stderr) instead of failing
        #[arg(long)]
        lenient: bool,

        /// Include directive key
        #[arg(long, default_value = "config-file")]
        include_key: String,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            file,
            format,
            output,
            lenient,
            include_key,
            max_depth,
        } => cmd_resolve(file, &format, output, lenient, &include_key, max_depth),

        Commands::Get {
            file,
            key,
            all,
            include_key,
        } => cmd_get(file, &key, all, &include_key),

        Commands::Check {
            files,
            lenient,
            include_key,
        } => cmd_check(files, lenient, &include_key),
    }
}

fn load(file: &PathBuf, opts: &EngineOptions, lenient: bool) -> Result<Document, String> {
    if lenient {
        let resolver = FsResolver::new();
        let unit = resolver
            .resolve(&file.to_string_lossy(), None)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("configuration file not found: {}", file.display()))?;
        let mut on_error = |d: &LineDiagnostic| {
            eprintln!("{} {}", "warning:".yellow(), d);
        };
        resolve_unit_lenient(&unit, &resolver, opts, &mut on_error).map_err(|e| e.to_string())
    } else {
        resolve_path(file, opts).map_err(|e| e.to_string())
    }
}

fn render(doc: &Document, format: &str) -> Result<String, String> {
    match format {
        "text" => Ok(encode(doc)),
        "json" => serde_json::to_string_pretty(doc)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| format!("JSON encoding failed: {}", e)),
        other => Err(format!("Unknown format '{}'; expected text or json", other)),
    }
}

fn cmd_resolve(
    file: PathBuf,
    format: &str,
    output: Option<PathBuf>,
    lenient: bool,
    include_key: &str,
    max_depth: usize,
) -> ExitCode {
    let opts = EngineOptions::default()
        .with_include_key(include_key)
        .with_max_depth(max_depth);

    let doc = match load(&file, &opts, lenient) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(1);
        }
    };

    let rendered = match render(&doc, format) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, rendered) {
                eprintln!("{}: {}", "Error writing file".red(), e);
                return ExitCode::from(2);
            }
            eprintln!("{} Wrote to {}", "✓".green(), path.display());
            ExitCode::SUCCESS
        }
        None => {
            print!("{}", rendered);
            ExitCode::SUCCESS
        }
    }
}

fn cmd_get(file: PathBuf, key: &str, all: bool, include_key: &str) -> ExitCode {
    let opts = EngineOptions::default().with_include_key(include_key);

    let doc = match load(&file, &opts, false) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(1);
        }
    };

    if all {
        match doc.all_values(key) {
            Some(values) => {
                for value in values {
                    println!("{}", value.as_deref().unwrap_or(""));
                }
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("{}: key '{}' not found", "Error".red(), key);
                ExitCode::from(1)
            }
        }
    } else {
        match doc.latest(key) {
            Some(value) => {
                println!("{}", value.unwrap_or(""));
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("{}: key '{}' not found", "Error".red(), key);
                ExitCode::from(1)
            }
        }
    }
}

fn cmd_check(files: Vec<PathBuf>, lenient: bool, include_key: &str) -> ExitCode {
    let opts = EngineOptions::default().with_include_key(include_key);
    let mut failed = false;

    for file in &files {
        match load(file, &opts, lenient) {
            Ok(doc) => {
                println!(
                    "{} {}: {} entries, {} keys",
                    "✓".green(),
                    file.display(),
                    doc.len(),
                    doc.keys().count()
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
