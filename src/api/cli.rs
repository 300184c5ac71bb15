//! `stunting` command line.
//!
//! Flags override the `STUNTING_*` environment, which overrides built-in
//! defaults. Errors map to process exit codes through [`ErrorCode`].

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};

use crate::common::config::{Kernel, LogFormat, TrainerConfig};
use crate::common::error::{ErrorCode, StuntingError, StuntingResult};
use crate::common::log;
use crate::data::domain::Features;
use crate::data::repo_fs::ObservationLog;
use crate::inference::domain::PredictionOutcome;
use crate::inference::service::{ModelHandle, Predictor};
use crate::tracking::repo_fs::FsTracker;
use crate::training::repo_fs::FsModelStore;
use crate::training::service;

#[derive(Debug, Parser)]
#[command(name = "stunting", about = "Retrain and query the stunting classifier")]
#[command(version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log filter, e.g. "info" or "stunting_core=debug"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fuse data, train, evaluate, track and persist a new model
    Train(TrainArgs),
    /// Classify one child with the persisted model
    Predict(PredictArgs),
}

#[derive(Debug, Default, Args)]
pub struct TrainArgs {
    /// Historical corpus (CSV)
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Operational prediction log (CSV) to fuse
    #[arg(long, conflicts_with = "no_log")]
    pub log_path: Option<PathBuf>,

    /// Train on historical data only
    #[arg(long)]
    pub no_log: bool,

    /// Where the trained artefact is written
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// SVM kernel: linear, rbf or poly
    #[arg(long, value_parser = parse_kernel)]
    pub kernel: Option<Kernel>,

    /// Regularization strength C
    #[arg(long, visible_alias = "c")]
    pub regularization: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Holdout fraction
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Root directory of the experiment tracker
    #[arg(long)]
    pub tracking_dir: Option<PathBuf>,

    #[arg(long)]
    pub experiment: Option<String>,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Age in months
    #[arg(long)]
    pub umur_bulan: u32,

    /// Sex, e.g. "Laki-laki" or "Perempuan"
    #[arg(long)]
    pub jenis_kelamin: String,

    /// Height in centimetres
    #[arg(long)]
    pub tinggi_badan: f64,

    /// Append the prediction to this operational log
    #[arg(long)]
    pub log_path: Option<PathBuf>,
}

impl TrainArgs {
    /// Layer the flags on top of `cfg`.
    pub fn apply(self, mut cfg: TrainerConfig) -> TrainerConfig {
        if let Some(v) = self.data_path {
            cfg.data_path = v;
        }
        if self.no_log {
            cfg.log_path = None;
        } else if let Some(v) = self.log_path {
            cfg.log_path = Some(v);
        }
        if let Some(v) = self.model_path {
            cfg.model_path = v;
        }
        if let Some(v) = self.kernel {
            cfg.kernel = v;
        }
        if let Some(v) = self.regularization {
            cfg.regularization = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = self.test_size {
            cfg.test_size = v;
        }
        if let Some(v) = self.tracking_dir {
            cfg.tracking_dir = v;
        }
        if let Some(v) = self.experiment {
            cfg.experiment = v;
        }
        cfg
    }
}

fn parse_kernel(raw: &str) -> Result<Kernel, String> {
    raw.parse().map_err(|e: StuntingError| e.to_string())
}

fn parse_log_format(raw: &str) -> Result<LogFormat, String> {
    raw.parse().map_err(|e: StuntingError| e.to_string())
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> StuntingResult<()> {
    let mut cfg = TrainerConfig::from_env()?;
    if let Some(level) = cli.log_level {
        cfg.log_level = level;
    }
    if let Some(format) = cli.log_format {
        cfg.log_format = format;
    }
    log::init(&cfg.log_level, cfg.log_format);

    match cli.command {
        Command::Train(args) => train(args.apply(cfg)),
        Command::Predict(args) => predict(args, cfg),
    }
}

fn train(cfg: TrainerConfig) -> StuntingResult<()> {
    let tracker = FsTracker::new(&cfg.tracking_dir);
    let store = FsModelStore::new(&cfg.model_path);
    let summary = service::run(&cfg, &tracker, &store)?;

    println!(
        "run {} accuracy {:.4} on {} rows ({} from the prediction log), model at {}",
        summary.run_id,
        summary.accuracy,
        summary.data_count,
        summary.new_rows,
        summary.artifact.path.display()
    );
    if let Some(reason) = summary.fusion_fallback {
        println!("prediction log ignored: {reason}");
    }
    Ok(())
}

fn predict(args: PredictArgs, cfg: TrainerConfig) -> StuntingResult<()> {
    let model_path = args.model_path.unwrap_or(cfg.model_path);
    let store = FsModelStore::new(&model_path);
    let handle = ModelHandle::empty();
    if let Err(err) = handle.reload(&store) {
        warn!(error = %err, "model could not be loaded");
    }

    let mut predictor = Predictor::new(Arc::new(handle));
    if let Some(path) = args.log_path {
        predictor = predictor.with_log(ObservationLog::new(path));
    }

    let request = Features::new(args.umur_bulan, args.jenis_kelamin, args.tinggi_badan);
    let outcome = predictor.predict(&request);
    println!("{}", serde_json::to_string(&outcome)?);

    match outcome {
        PredictionOutcome::Predicted { .. } => Ok(()),
        PredictionOutcome::ModelUnavailable => Err(StuntingError::ModelUnavailable {
            path: model_path,
            reason: "no model loaded".to_string(),
        }),
    }
}

/// Parse the process arguments, run, and return the exit status.
pub fn main() -> i32 {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ErrorCode::Ok.exit_status(),
        Err(err) => {
            error!(code = ?err.code(), error = %err, "stunting failed");
            eprintln!("error: {err}");
            err.code().exit_status()
        }
    }
}
