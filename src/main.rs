use std::{env, fs, path::PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::info;
use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng};

use emotion_cnn::{
    classify::Labels,
    config::EngineConfig,
    initialization::Architecture,
    predictor::load_predictor,
    preprocess,
    store::{self, Container, Node},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a He normal initialized weight container
    Init {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 48)]
        side: usize,
        #[arg(long, default_value_t = 6)]
        labels: usize,
    },
    /// List every group and dataset of a weight container
    Inspect { path: PathBuf },
    /// Classify a raw 8-bit grayscale image
    Predict {
        /// JSON engine configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the configured weights
        #[arg(long)]
        weights: Option<PathBuf>,
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Init {
            out,
            seed,
            side,
            labels,
        } => init(out, seed, side, labels),
        Command::Inspect { path } => inspect(path),
        Command::Predict {
            config,
            weights,
            image,
            width,
            height,
        } => run_predict(config, weights, image, (height, width)),
    }
}

fn init(out: PathBuf, seed: u64, side: usize, labels: usize) -> anyhow::Result<()> {
    let mut arch = Architecture {
        side,
        labels,
        ..Architecture::default()
    };
    if arch.output_bias.as_ref().is_some_and(|bias| bias.len() != labels) {
        arch.output_bias = None;
    }

    let params = arch.he_normal(StdRng::seed_from_u64(seed))?;
    store::to_keras_container(&params)?.save(&out)?;

    info!("wrote {} (seed {seed}, side {side})", out.display());
    Ok(())
}

fn inspect(path: PathBuf) -> anyhow::Result<()> {
    let container = Container::open(&path)?;

    container.visit(|path, _, node| match node {
        Node::Group(_) => println!("[DIR] {path}"),
        Node::Dataset(tensor) => println!("[FILE] {path} - {:?}", tensor.shape()),
    });

    Ok(())
}

fn run_predict(
    config: Option<PathBuf>,
    weights: Option<PathBuf>,
    image: PathBuf,
    (height, width): (usize, usize),
) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(path) = weights.or_else(|| env::var_os("EMOTION_WEIGHTS").map(PathBuf::from)) {
        config.weights = path;
    }

    let raw = fs::read(&image).with_context(|| format!("cannot read '{}'", image.display()))?;
    if raw.len() != width * height {
        bail!(
            "'{}' holds {} bytes, expected {width}x{height}",
            image.display(),
            raw.len()
        );
    }

    let pixels = Array2::from_shape_vec((height, width), raw)?;
    let x = preprocess::normalize(pixels.view(), config.input_side)?;

    let predictor = load_predictor(&config)?;
    let probs = predictor.predict(x.view())?;

    let labels = Labels::new(config.labels.iter().cloned());
    let best = labels.classify(probs.view())?;

    println!("{} ({:.1}%)", best.label, best.confidence);
    for (name, p) in labels.names().iter().zip(&probs) {
        println!("  {name:<10} {:.4}", p);
    }

    Ok(())
}
