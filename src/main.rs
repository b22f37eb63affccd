use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use log::info;
use medpredict::registry::provider::{ArtifactModelProvider, ModelProvider, NoModels};
use medpredict::utils::logging::{create_spinner, finish_progress_bar};
use medpredict::{BatchProcessor, DiseaseRegistry, PipelineConfig, read_results, stage_upload};

const CONFIG_ENV: &str = "MEDPREDICT_CONFIG";

const USAGE: &str = "\
Usage:
  medpredict predict <input.parquet> [--page N]
  medpredict report <results.parquet> [--page N]
  medpredict history

Set MEDPREDICT_CONFIG to a JSON configuration file to override defaults.";

enum Command {
    Predict { input: PathBuf, page: usize },
    Report { results: PathBuf, page: usize },
    History,
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let Some((command, rest)) = args.split_first() else {
        bail!("missing command\n\n{USAGE}");
    };

    let mut positional = Vec::new();
    let mut page = 1;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        if arg == "--page" {
            let raw = iter.next().context("--page needs a value")?;
            page = raw
                .parse()
                .with_context(|| format!("invalid page number {raw}"))?;
        } else {
            positional.push(PathBuf::from(arg));
        }
    }

    match (command.as_str(), positional.as_slice()) {
        ("predict", [input]) => Ok(Command::Predict {
            input: input.clone(),
            page,
        }),
        ("report", [results]) => Ok(Command::Report {
            results: results.clone(),
            page,
        }),
        ("history", []) => Ok(Command::History),
        _ => bail!("unrecognised arguments\n\n{USAGE}"),
    }
}

fn load_config() -> anyhow::Result<PipelineConfig> {
    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            PipelineConfig::load(&path)
                .with_context(|| format!("loading configuration from {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn load_registry(config: &PipelineConfig) -> anyhow::Result<DiseaseRegistry> {
    let provider: Box<dyn ModelProvider> = match &config.model_dir {
        Some(dir) => Box::new(ArtifactModelProvider::new(dir)),
        None => Box::new(NoModels),
    };

    let registry = match &config.registry_file {
        Some(path) => DiseaseRegistry::load(path, provider.as_ref())
            .with_context(|| format!("loading disease registry from {}", path.display()))?,
        None => DiseaseRegistry::builtin(provider.as_ref())?,
    };
    Ok(registry)
}

fn predict(processor: &BatchProcessor, input: &Path, page: usize) -> anyhow::Result<()> {
    let upload = stage_upload(input, &processor.config().upload_dir)
        .with_context(|| format!("staging {}", input.display()))?;

    let spinner = create_spinner(Some("Predicting..."));
    let outcome = processor.process(upload);
    finish_progress_bar(&spinner, None);
    let outcome = outcome.with_context(|| format!("processing {}", input.display()))?;

    info!(
        "Results written to {} (batch {})",
        outcome.result_file.display(),
        outcome.history.id
    );

    let view = processor.report(&outcome.result_set, page)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn report(processor: &BatchProcessor, results: &Path, page: usize) -> anyhow::Result<()> {
    let result_set = read_results(results, processor.registry(), processor.config())
        .with_context(|| format!("reading results from {}", results.display()))?;
    let view = processor.report(&result_set, page)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn history(processor: &BatchProcessor) -> anyhow::Result<()> {
    let entries = processor
        .history()
        .entries()
        .context("reading batch history")?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let config = load_config()?;
    let registry = Arc::new(load_registry(&config)?);
    let processor = BatchProcessor::new(registry, config)?;

    match command {
        Command::Predict { input, page } => predict(&processor, &input, page),
        Command::Report { results, page } => report(&processor, &results, page),
        Command::History => history(&processor),
    }
}
