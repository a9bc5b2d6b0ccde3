//! GLB diffuse texture transcoder CLI

use clap::{Parser, Subcommand};
use glbtex_core::{
    inspect, CallbackSink, ConvertConfig, Converter, GammaDirection, LogEvent, Quality,
    QualityLevel, Severity,
};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "glbtex")]
#[command(about = "Gamma-correct and recompress the diffuse textures of GLB files. Offline.")]
#[command(version = concat!("v", env!("CARGO_PKG_VERSION")))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML): gamma, level or quality, max_dimension
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Conversion flags shared by convert and batch; they override the config file
#[derive(clap::Args, Debug, Default, Clone)]
struct ConvertArgs {
    /// Gamma direction for diffuse textures: linearize or delinearize
    #[arg(long)]
    gamma: Option<String>,
    /// Named level: none, balanced, or aggressive
    #[arg(long, conflicts_with = "quality")]
    level: Option<String>,
    /// Quality scale 0-100 (100 = lossless)
    #[arg(long)]
    quality: Option<u32>,
    /// Longest texture edge in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_dimension: Option<u32>,
    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single GLB file
    Convert {
        /// Input .glb file
        input: PathBuf,
        /// Output .glb file
        #[arg(short, long)]
        output: PathBuf,
        /// Write the size report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        args: ConvertArgs,
    },
    /// Recursively convert every .glb file under a folder
    Batch {
        /// Root folder to scan recursively
        #[arg(value_name = "ROOT-FOLDER")]
        root: PathBuf,
        /// Output folder (relative layout is preserved)
        #[arg(short, long)]
        output: PathBuf,
        /// Write an aggregated JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        args: ConvertArgs,
    },
    /// Print container layout and texture usage without converting
    Inspect {
        /// Path to the .glb file
        file: PathBuf,
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Batch JSON report entry
#[derive(Debug, Serialize)]
struct BatchEntry {
    path: String,
    output: Option<String>,
    error: Option<String>,
    report: Option<glbtex_core::SizeReport>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert { input, output, report, args } => {
            let config = build_config(cli.config.as_deref(), &args)?;
            cmd_convert(&input, &output, report.as_deref(), &config, args.quiet)
        }
        Commands::Batch { root, output, report, args } => {
            let config = build_config(cli.config.as_deref(), &args)?;
            cmd_batch(&root, &output, report.as_deref(), &config, args.quiet)
        }
        Commands::Inspect { file, json } => cmd_inspect(&file, json),
    }
}

/// Config file values first, then flags on top
fn build_config(
    config_path: Option<&Path>,
    args: &ConvertArgs,
) -> Result<ConvertConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => ConvertConfig::load(path)?,
        None => ConvertConfig::default(),
    };

    if let Some(gamma) = &args.gamma {
        config.gamma = gamma.parse::<GammaDirection>()?;
    }
    if let Some(level) = &args.level {
        config.quality = Quality::Level(level.parse::<QualityLevel>()?);
    }
    if let Some(q) = args.quality {
        config.quality = Quality::scale(q)?;
    }
    if let Some(max) = args.max_dimension {
        config = config.with_max_dimension(max);
    }
    Ok(config)
}

fn print_event(event: &LogEvent, quiet: bool) {
    let prefix = match event.severity {
        Severity::Info if quiet => return,
        Severity::Success if quiet => return,
        Severity::Info => "ℹ",
        Severity::Success => "✓",
        Severity::Warning => "⚠",
        Severity::Error => "✗",
    };
    println!("{} {}", prefix, event.message);
}

fn convert_file(
    converter: &Converter,
    input: &Path,
    output: &Path,
    quiet: bool,
) -> Result<glbtex_core::SizeReport, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(input)?;
    let mut sink = CallbackSink::new(|event: &LogEvent| print_event(event, quiet));
    let conversion = converter.convert(&bytes, &mut sink)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, &conversion.bytes)?;

    let name = input
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("input.glb");
    Ok(conversion.report.with_name(name))
}

fn cmd_convert(
    input: &Path,
    output: &Path,
    report_path: Option<&Path>,
    config: &ConvertConfig,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let converter = Converter::new(*config);
    let report = convert_file(&converter, input, output, quiet)?;

    if !quiet {
        println!();
        println!("{}", report.to_text());
    }
    if let Some(path) = report_path {
        std::fs::write(path, report.to_json()?)?;
        if !quiet {
            println!("Report written to {}", path.display());
        }
    }
    println!("Wrote {}", output.display());
    Ok(())
}

fn cmd_batch(
    root: &Path,
    output: &Path,
    report_path: Option<&Path>,
    config: &ConvertConfig,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    find_glb_files(root, &mut files);
    files.sort();

    if files.is_empty() {
        println!("No .glb files found under {}", root.display());
        return Ok(());
    }

    let converter = Converter::new(*config);
    let mut entries = Vec::new();
    let mut converted = 0usize;

    for file in &files {
        let relative = file.strip_prefix(root).unwrap_or(file);
        let target = output.join(relative);
        tracing::debug!(input = %file.display(), output = %target.display(), "batch item");
        if !quiet {
            println!("── {}", relative.display());
        }
        match convert_file(&converter, file, &target, quiet) {
            Ok(report) => {
                converted += 1;
                if !quiet {
                    println!(
                        "  {} -> {} bytes ({:+.1}% saved)",
                        report.original_file_bytes,
                        report.final_file_bytes,
                        report.savings_percent()
                    );
                }
                entries.push(BatchEntry {
                    path: file.display().to_string(),
                    output: Some(target.display().to_string()),
                    error: None,
                    report: Some(report),
                });
            }
            Err(e) => {
                println!("⚠ Skipping {}: {}", file.display(), e);
                entries.push(BatchEntry {
                    path: file.display().to_string(),
                    output: None,
                    error: Some(e.to_string()),
                    report: None,
                });
            }
        }
    }

    println!(
        "\nConverted {} of {} file(s) into {}",
        converted,
        files.len(),
        output.display()
    );
    if let Some(path) = report_path {
        std::fs::write(path, serde_json::to_string_pretty(&entries)?)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn find_glb_files(dir: &Path, results: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            find_glb_files(&path, results);
        } else if path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("glb"))
        {
            results.push(path);
        }
    }
}

fn cmd_inspect(file: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file)?;
    let inspection = inspect(&bytes)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
    } else {
        println!("{}", file.display());
        println!("{}", inspection.to_text());
    }
    Ok(())
}
