//! Deal Hunter pipeline commands
//!
//! Offline steps that prepare the estimators (curation, indexing, training,
//! ensemble fitting) plus one-shot estimation and scanning.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use deal_core::{DealConfig, Item, PredictorKind};
use deal_data::{balance, load_items, load_jsonl, save_items, BalanceConfig, ItemConfig, ItemNormalizer, Tokenizer};
use deal_embedding::build_index;
use deal_pricing::{evaluate, EnsembleModel, ForestConfig, Pricer, RandomForest};
use deal_services::bootstrap;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "deal-cli")]
#[command(about = "Curate data, train estimators and hunt for deals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw product dumps into balanced train/test batches
    Curate {
        /// Raw JSONL dump per category, as CATEGORY=PATH
        #[arg(required = true, value_parser = parse_source)]
        sources: Vec<(String, PathBuf)>,
        /// Hugging Face tokenizer.json used for token budgets (words otherwise)
        #[arg(long)]
        tokenizer: Option<PathBuf>,
        #[arg(long, default_value_t = 400_000)]
        train_size: usize,
        #[arg(long, default_value_t = 2_000)]
        test_size: usize,
        /// Category that dominates the raw data
        #[arg(long, default_value = "Automotive")]
        dominant: String,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, env = "DATA_DIR", default_value = "data")]
        out_dir: PathBuf,
    },
    /// Embed the training batch into the vector store
    Index {
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
    /// Fit the random forest on every stored vector
    TrainForest {
        #[arg(long, default_value_t = 100)]
        trees: usize,
        #[arg(long)]
        max_depth: Option<usize>,
        /// Features tried per split (square root of the dimension otherwise)
        #[arg(long)]
        max_features: Option<usize>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Score one estimator against the test batch
    Evaluate {
        /// specialist, frontier, forest or ensemble
        #[arg(short, long)]
        predictor: Target,
        #[arg(short, long, default_value_t = deal_pricing::evaluation::DEFAULT_SIZE)]
        size: usize,
    },
    /// Fit the ensemble weights on a slice of the test batch
    FitEnsemble {
        /// First test item of the fitting slice
        #[arg(long, default_value_t = 1000)]
        offset: usize,
        #[arg(short, long, default_value_t = deal_pricing::evaluation::DEFAULT_SIZE)]
        size: usize,
    },
    /// Estimate the price of a product description
    Estimate {
        description: String,
    },
    /// Run one scan cycle and remember any opportunity found
    Scan,
}

/// Estimator selected for evaluation
#[derive(Debug, Clone, Copy)]
enum Target {
    Single(PredictorKind),
    Ensemble,
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ensemble") {
            Ok(Target::Ensemble)
        } else {
            s.parse().map(Target::Single)
        }
    }
}

fn parse_source(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((category, path)) if !category.is_empty() && !path.is_empty() => {
            Ok((category.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected CATEGORY=PATH, got {}", s)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::from_filename(".env.local") {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Curate {
            sources,
            tokenizer,
            train_size,
            test_size,
            dominant,
            seed,
            out_dir,
        } => {
            let balance_config = BalanceConfig {
                dominant_category: dominant,
                seed,
                train_size,
                test_size,
                ..BalanceConfig::default()
            };
            curate(&sources, tokenizer.as_deref(), &balance_config, &out_dir)
        }
        Commands::Index { batch_size } => index(&DealConfig::from_env()?, batch_size).await,
        Commands::TrainForest {
            trees,
            max_depth,
            max_features,
            seed,
        } => {
            let forest_config = ForestConfig {
                n_trees: trees,
                max_depth,
                max_features,
                seed,
                ..ForestConfig::default()
            };
            train_forest(&DealConfig::from_env()?, forest_config)
        }
        Commands::Evaluate { predictor, size } => {
            run_evaluation(&DealConfig::from_env()?, predictor, size).await
        }
        Commands::FitEnsemble { offset, size } => {
            fit_ensemble(&DealConfig::from_env()?, offset, size).await
        }
        Commands::Estimate { description } => {
            let config = DealConfig::from_env()?;
            let ensemble = bootstrap::ensemble_pricer(&config)?;
            let estimate = ensemble.estimate(&description).await?;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
            Ok(())
        }
        Commands::Scan => scan(&DealConfig::from_env()?).await,
    }
}

fn curate(
    sources: &[(String, PathBuf)],
    tokenizer: Option<&Path>,
    balance_config: &BalanceConfig,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let tokenizer = match tokenizer {
        Some(path) => Tokenizer::from_file(path)?,
        None => Tokenizer::Words,
    };
    let normalizer = ItemNormalizer::new(tokenizer, ItemConfig::default());

    let mut items = Vec::new();
    for (category, path) in sources {
        let (loaded, report) = load_jsonl(path, category, &normalizer)
            .with_context(|| format!("loading {}", path.display()))?;
        info!(
            "{}: {} lines, {} parsed, {} kept",
            category, report.lines, report.parsed, report.kept
        );
        items.extend(loaded);
    }
    info!("Curated {} items in total", items.len());

    let dataset = balance(items, balance_config)?;
    info!(
        "Balanced {} -> {} items",
        dataset.report.total_before, dataset.report.total_after
    );

    std::fs::create_dir_all(out_dir)?;
    save_items(out_dir.join("train.bin"), &dataset.train)?;
    save_items(out_dir.join("test.bin"), &dataset.test)?;
    info!(
        "Wrote {} train and {} test items to {}",
        dataset.train.len(),
        dataset.test.len(),
        out_dir.display()
    );
    Ok(())
}

fn train_items(config: &DealConfig) -> anyhow::Result<Vec<Item>> {
    let path = config.pipeline.data_dir.join("train.bin");
    load_items(&path).with_context(|| format!("loading {}", path.display()))
}

fn test_items(config: &DealConfig) -> anyhow::Result<Vec<Item>> {
    let path = config.pipeline.data_dir.join("test.bin");
    load_items(&path).with_context(|| format!("loading {}", path.display()))
}

async fn index(config: &DealConfig, batch_size: usize) -> anyhow::Result<()> {
    let items = train_items(config)?;
    let encoder = bootstrap::encoder(config);
    let store = bootstrap::open_store(config)?;

    let written = build_index(
        encoder.as_ref(),
        &store,
        &config.store.collection,
        &items,
        batch_size,
    )
    .await?;
    info!("Indexed {} items into {}", written, config.store.collection);
    Ok(())
}

fn train_forest(config: &DealConfig, forest_config: ForestConfig) -> anyhow::Result<()> {
    let store = bootstrap::open_store(config)?;
    let (vectors, prices) = store.all_vectors(&config.store.collection)?;
    if prices.is_empty() {
        bail!("collection {} is empty, run `index` first", config.store.collection);
    }

    let forest = RandomForest::fit(vectors.view(), &prices, forest_config)?;
    forest.save(&config.pipeline.forest_path)?;
    info!("Saved forest to {}", config.pipeline.forest_path.display());
    Ok(())
}

async fn run_evaluation(config: &DealConfig, target: Target, size: usize) -> anyhow::Result<()> {
    let items = test_items(config)?;
    let report = match target {
        Target::Ensemble => {
            let ensemble = bootstrap::ensemble_pricer(config)?;
            let ensemble = &ensemble;
            evaluate("Ensemble", &items, size, move |description| async move {
                ensemble.price(&description).await
            })
            .await
        }
        Target::Single(kind) => {
            let pricer = single_pricer(config, kind)?;
            let pricer = &pricer;
            evaluate(kind.display_name(), &items, size, move |description| async move {
                pricer.price(&description).await
            })
            .await
        }
    };

    println!("{}", report);
    Ok(())
}

fn single_pricer(config: &DealConfig, kind: PredictorKind) -> anyhow::Result<Pricer> {
    let pricer = match kind {
        PredictorKind::Specialist => Pricer::Specialist(Arc::new(bootstrap::specialist_pricer(config)?)),
        PredictorKind::Frontier => {
            let store = bootstrap::open_store(config)?;
            Pricer::Frontier(Arc::new(bootstrap::frontier_pricer(
                config,
                bootstrap::encoder(config),
                store,
            )))
        }
        PredictorKind::RandomForest => {
            Pricer::RandomForest(Arc::new(bootstrap::forest_pricer(config, bootstrap::encoder(config))?))
        }
    };
    Ok(pricer)
}

async fn fit_ensemble(config: &DealConfig, offset: usize, size: usize) -> anyhow::Result<()> {
    let items = test_items(config)?;
    let slice: Vec<&Item> = items.iter().skip(offset).take(size).collect();
    if slice.is_empty() {
        bail!("no test items after offset {}", offset);
    }

    let pricers: Vec<Pricer> = PredictorKind::ALL
        .iter()
        .map(|&kind| single_pricer(config, kind))
        .collect::<anyhow::Result<_>>()?;

    let mut estimates = Vec::with_capacity(slice.len());
    let mut prices = Vec::with_capacity(slice.len());
    for (i, item) in slice.iter().enumerate() {
        let description = item.description();
        let mut row = [0.0; 3];
        let mut failed = false;
        for (slot, pricer) in row.iter_mut().zip(&pricers) {
            match pricer.price(&description).await {
                Ok(price) => *slot = price,
                Err(e) => {
                    warn!("{}: {} failed for {}: {}", i + 1, pricer.kind(), item.title, e);
                    failed = true;
                    break;
                }
            }
        }
        if !failed {
            estimates.push(row);
            prices.push(item.price);
        }
    }
    info!("Collected estimates for {} of {} items", estimates.len(), slice.len());

    let model = EnsembleModel::fit(&estimates, &prices)?;
    model.save(&config.pipeline.ensemble_path)?;
    info!("Saved ensemble weights to {}", config.pipeline.ensemble_path.display());
    Ok(())
}

async fn scan(config: &DealConfig) -> anyhow::Result<()> {
    let ensemble = Arc::new(bootstrap::ensemble_pricer(config)?);
    let service = bootstrap::deal_service(config, ensemble)?;

    match service.run_cycle().await? {
        Some(opportunity) => println!("{}", serde_json::to_string_pretty(&opportunity)?),
        None => println!("No new opportunity"),
    }
    info!("{} opportunities remembered", service.table().await.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            parse_source("Appliances=raw/appliances.jsonl"),
            Ok(("Appliances".to_string(), PathBuf::from("raw/appliances.jsonl")))
        );
        assert!(parse_source("appliances.jsonl").is_err());
        assert!(parse_source("=x.jsonl").is_err());
    }

    #[test]
    fn test_parse_target() {
        assert!(matches!("Ensemble".parse::<Target>(), Ok(Target::Ensemble)));
        assert!(matches!(
            "forest".parse::<Target>(),
            Ok(Target::Single(PredictorKind::RandomForest))
        ));
        assert!("bogus".parse::<Target>().is_err());
    }

    #[test]
    fn test_cli_parses_evaluate() {
        let cli = Cli::try_parse_from(["deal-cli", "evaluate", "--predictor", "rag", "--size", "10"]).unwrap();
        match cli.command {
            Commands::Evaluate { predictor, size } => {
                assert!(matches!(predictor, Target::Single(PredictorKind::Frontier)));
                assert_eq!(size, 10);
            }
            _ => panic!("expected evaluate"),
        }
    }
}
