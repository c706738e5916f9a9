//! Train the attrition classifier from a CSV export and publish its artifact.

use std::path::{Path, PathBuf};

use attrition::config::{self, AppConfig};
use attrition::logging;
use attrition::pipeline::{TrainingRun, train_from_csv, write_outputs};

fn main() {
    if let Err(err) = logging::init("train") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let config = load_config(options.config.as_deref())?;

    let mut run = TrainingRun::from(&config.training);
    if let Some(epochs) = options.epochs {
        run.options.epochs = epochs;
    }
    if let Some(learning_rate) = options.learning_rate {
        run.options.learning_rate = learning_rate;
    }
    if let Some(test_fraction) = options.test_fraction {
        run.test_fraction = test_fraction;
    }
    if let Some(seed) = options.seed {
        run.seed = seed;
    }

    let data = options
        .data
        .or(config.paths.dataset.clone())
        .ok_or_else(|| format!("--data is required\n\n{}", help_text()))?;
    let model_out = options.model_out.unwrap_or(config.paths.model.clone());
    let metrics_out = options
        .metrics_out
        .unwrap_or_else(|| beside(&model_out, &config.paths.metrics));

    let outcome = train_from_csv(&data, &run).map_err(|err| err.to_string())?;
    write_outputs(&outcome, &model_out, &metrics_out).map_err(|err| err.to_string())?;

    let report = &outcome.report;
    println!(
        "trained on {} rows, evaluated on {}",
        report.train_rows, report.test_rows
    );
    println!("accuracy:  {:.4}", report.metrics.accuracy);
    println!("precision: {:.4}", report.metrics.precision);
    println!("recall:    {:.4}", report.metrics.recall);
    println!("f1:        {:.4}", report.metrics.f1);
    println!("confusion matrix (rows=true, cols=pred):");
    for row in report.confusion_matrix {
        println!("{:6}{:6}", row[0], row[1]);
    }
    println!("top determinants:");
    for determinant in &report.top_determinants {
        println!("  {:<32} {:+.6}", determinant.feature, determinant.coefficient);
    }
    println!("model written to {}", model_out.display());
    println!("metrics written to {}", metrics_out.display());
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    data: Option<PathBuf>,
    model_out: Option<PathBuf>,
    metrics_out: Option<PathBuf>,
    epochs: Option<usize>,
    learning_rate: Option<f64>,
    test_fraction: Option<f64>,
    seed: Option<u64>,
    config: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        if matches!(flag, "-h" | "--help") {
            return Err(help_text());
        }
        idx += 1;
        let value = args
            .get(idx)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--data" => options.data = Some(PathBuf::from(value)),
            "--out" => options.model_out = Some(PathBuf::from(value)),
            "--metrics-out" => options.metrics_out = Some(PathBuf::from(value)),
            "--config" => options.config = Some(PathBuf::from(value)),
            "--epochs" => {
                options.epochs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --epochs value: {value}"))?,
                );
            }
            "--learning-rate" => {
                options.learning_rate = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --learning-rate value: {value}"))?,
                );
            }
            "--test-fraction" => {
                options.test_fraction = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --test-fraction value: {value}"))?,
                );
            }
            "--seed" => {
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
    match path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())
}

/// Relative metrics paths sit next to the model artifact.
fn beside(model_out: &Path, metrics: &Path) -> PathBuf {
    if metrics.is_absolute() {
        return metrics.to_path_buf();
    }
    match model_out.parent() {
        Some(parent) => parent.join(metrics),
        None => metrics.to_path_buf(),
    }
}

fn help_text() -> String {
    [
        "attrition-train",
        "",
        "Train the attrition classifier and write its model artifact.",
        "",
        "Usage:",
        "  attrition-train --data <csv> [options]",
        "",
        "Options:",
        "  --data <csv>            Training table; the last column is the 0/1 label.",
        "  --out <file>            Model artifact path (default: model_artifacts.json).",
        "  --metrics-out <file>    Metrics report path (default: metrics.json beside the model).",
        "  --epochs <n>            Passes over the training rows (default: 50).",
        "  --learning-rate <f>     Update step size (default: 0.01).",
        "  --test-fraction <f>     Share of rows held out for evaluation (default: 0.2).",
        "  --seed <n>              Shuffle seed (default: 42).",
        "  --config <file>         Settings file (default: app config directory).",
    ]
    .join("\n")
}
