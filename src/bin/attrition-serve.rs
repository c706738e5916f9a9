//! Serve attrition scores over HTTP from a trained model artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use attrition::config::{self, AppConfig};
use attrition::logging;
use attrition::serve::{InferenceService, ScoringServer, ServerOptions};

fn main() {
    if let Err(err) = logging::init("serve") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = load_config(options.config.as_deref())?;
    if let Some(bind) = options.bind {
        config.serving.bind_addr = bind;
    }
    if let Some(workers) = options.workers {
        config.serving.workers = workers;
    }
    let config = config.normalized();
    let model_path = options.model.unwrap_or(config.paths.model.clone());

    let service = InferenceService::from_artifact(&model_path).map_err(|err| err.to_string())?;
    let server = ScoringServer::bind(
        config.serving.bind_addr.as_str(),
        Arc::new(service),
        ServerOptions::from(&config.serving),
    )
    .map_err(|err| format!("Failed to bind {}: {err}", config.serving.bind_addr))?;
    let addr = server.local_addr().map_err(|err| err.to_string())?;
    println!("serving {} on http://{addr}/predict", model_path.display());
    server.run().map_err(|err| err.to_string())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    model: Option<PathBuf>,
    bind: Option<String>,
    workers: Option<usize>,
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
            "--model" => options.model = Some(PathBuf::from(value)),
            "--bind" => options.bind = Some(value.clone()),
            "--config" => options.config = Some(PathBuf::from(value)),
            "--workers" => {
                options.workers = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --workers value: {value}"))?,
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

fn help_text() -> String {
    [
        "attrition-serve",
        "",
        "Answer POST /predict with attrition probabilities from a model artifact.",
        "",
        "Usage:",
        "  attrition-serve [options]",
        "",
        "Options:",
        "  --model <file>     Model artifact (default: model_artifacts.json).",
        "  --bind <addr>      Listen address (default: 0.0.0.0:8000).",
        "  --workers <n>      Connection worker threads (default: 4).",
        "  --config <file>    Settings file (default: app config directory).",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn parses_serving_flags() {
        let options = parse_args(args(&[
            "--model",
            "m.json",
            "--bind",
            "127.0.0.1:9000",
            "--workers",
            "2",
        ]))
        .unwrap();
        assert_eq!(options.model, Some(PathBuf::from("m.json")));
        assert_eq!(options.bind.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(options.workers, Some(2));
    }

    #[test]
    fn rejects_bad_worker_count() {
        assert!(parse_args(args(&["--workers", "-1"])).is_err());
        assert!(parse_args(args(&["--model"])).is_err());
    }
}
