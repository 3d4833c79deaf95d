//! PU Dataset Preparation Tool
//!
//! Configuration-driven wrapper around `TrainingDataPreparer` for offline
//! runs: reads raw meter readings from JSON, prepares the PU training data
//! and writes a NumPy bundle.
//!
//! ## Output Format
//!
//! - `{train,validation,test}_features.npy` - Shape `[N, 41]`
//! - `{train,validation,test}_labels.npy` - Shape `[N]`, 1.0 positive / 0.0 unlabeled
//! - `test_ids.json`, `prior.json`, `metadata.json`
//!
//! The input is a JSON array of readings; `is_positive_label` decides
//! whether a reading goes to the P or the U pool.
//!
//! # Usage
//!
//! ```bash
//! # Prepare and export
//! cargo run --release --bin prepare_pu_dataset -- \
//!     --config prep.toml --samples readings.json --out exports/run-1
//!
//! # Generate sample config
//! cargo run --release --bin prepare_pu_dataset -- --generate-config prep.toml
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) to see progress.

use pu_feature_prep::export::{BundleExporter, JsonTestIdStore, TestIdStore};
use pu_feature_prep::sample::partition_by_label;
use pu_feature_prep::{PrepConfig, RawSample, RunMetadata, TrainingDataPreparer};
use std::fs;
use std::path::Path;

/// Parsed `--config/--samples/--out` invocation
struct RunArgs {
    config: Option<String>,
    samples: String,
    out: String,
    normalize: bool,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--generate-config" => {
            if args.len() < 3 {
                eprintln!("Error: --generate-config requires a path argument");
                std::process::exit(1);
            }
            generate_sample_config(&args[2]);
        }
        "--help" | "-h" => {
            print_usage(&args[0]);
        }
        _ => match parse_run_args(&args[1..]) {
            Ok(run) => {
                if let Err(e) = run_preparation(&run) {
                    eprintln!("❌ Preparation failed: {e}");
                    std::process::exit(1);
                }
            }
            Err(msg) => {
                eprintln!("Error: {msg}");
                print_usage(&args[0]);
                std::process::exit(1);
            }
        },
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
PU Dataset Preparation Tool

Usage:
    {program} --samples <readings.json> --out <dir> [--config <prep.toml>] [--normalize]
    {program} --generate-config <path.toml>   Generate sample config file
    {program} --help                          Show this help

Without --config the default configuration is used.
"#
    );
}

fn parse_run_args(args: &[String]) -> Result<RunArgs, String> {
    let mut config = None;
    let mut samples = None;
    let mut out = None;
    let mut normalize = false;

    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--config" => {
                config = Some(iter.next().ok_or("--config requires a path argument")?.clone())
            }
            "--samples" => {
                samples = Some(iter.next().ok_or("--samples requires a path argument")?.clone())
            }
            "--out" => out = Some(iter.next().ok_or("--out requires a path argument")?.clone()),
            "--normalize" => normalize = true,
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    Ok(RunArgs {
        config,
        samples: samples.ok_or("--samples is required")?,
        out: out.ok_or("--out is required")?,
        normalize,
    })
}

fn run_preparation(run: &RunArgs) -> pu_feature_prep::Result<()> {
    let config = match &run.config {
        Some(path) if path.ends_with(".json") => PrepConfig::load_json(path)?,
        Some(path) => PrepConfig::load_toml(path)?,
        None => PrepConfig::default(),
    };

    let contents = fs::read_to_string(&run.samples)?;
    let samples: Vec<RawSample> = serde_json::from_str(&contents)?;
    let (positives, unlabeled) = partition_by_label(&samples);

    println!("📂 Loaded {} readings from {}", samples.len(), run.samples);
    println!("   Positive: {}", positives.len());
    println!("   Unlabeled: {}", unlabeled.len());

    let preparer = TrainingDataPreparer::new(config)?;
    let prepared = preparer.prepare(&positives, &unlabeled)?;

    let result = BundleExporter::new(&run.out)
        .with_normalization(run.normalize)
        .export(&prepared, preparer.config())?;

    let run_name = preparer
        .config()
        .metadata
        .as_ref()
        .map(|m| m.name.clone())
        .unwrap_or_else(|| format!("seed-{}", prepared.seed));
    JsonTestIdStore::new(Path::new(&run.out).join("holdouts"))
        .save_test_ids(&run_name, prepared.test_ids())?;

    let (n_train, n_val, n_test) = prepared.split.sizes();
    println!("\n✅ Export complete: {}", result.output_dir.display());
    println!("   Train: {n_train}  Validation: {n_val}  Test: {n_test}");
    println!(
        "   Prior: {:.4} ({}{})",
        prepared.prior.value,
        prepared.prior.method,
        if prepared.prior.was_clipped() { ", clipped" } else { "" }
    );
    println!(
        "   Dropped: {} overlap, {} duplicate, {} by cap",
        prepared.assembly.dropped_overlap,
        prepared.assembly.dropped_duplicates,
        prepared.assembly.dropped_by_cap
    );

    Ok(())
}

fn generate_sample_config(path: &str) {
    let config = PrepConfig::default().with_metadata(RunMetadata {
        name: "meter-pu-baseline".to_string(),
        description: Some("Default windows, 70/20/10 split, median prior".to_string()),
        tags: vec!["pu".to_string(), "baseline".to_string()],
    });

    let result = if path.ends_with(".json") {
        config.save_json(path)
    } else {
        config.save_toml(path)
    };

    match result {
        Ok(()) => println!("✅ Sample config written to {path}"),
        Err(e) => {
            eprintln!("❌ Failed to write config: {e}");
            std::process::exit(1);
        }
    }
}
