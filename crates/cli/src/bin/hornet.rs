//! The binary hornet.

use hornet_api::*;
use hornet_cli::*;
use hornet_core::cache::FileStore;
use hornet_core::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(clap::Parser, Debug)]
#[command(version)]
pub struct Args {
    /// By default hornet runs in "testing" configuration, with a small
    /// cache and short retry back-off. Set this to use the production
    /// configuration instead.
    #[arg(long)]
    pub production: bool,

    /// Directory holding one subdirectory of snapshots per measurement.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// The persistent cache file.
    #[arg(long, default_value = "cache.db")]
    pub cache: PathBuf,

    /// Override the number of entries the cache retains.
    #[arg(long)]
    pub cache_size: Option<usize>,

    /// Override how many intervals the windows around a boundary span.
    #[arg(long)]
    pub num_strides: Option<usize>,

    /// Override how many distinct origin ASes to sample probes from.
    #[arg(long)]
    pub as_thresh: Option<usize>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(clap::Args, Debug)]
pub struct Span {
    /// Measurement id.
    pub msm_id: u64,

    /// Start, in unix seconds.
    pub start: i64,

    /// End, in unix seconds.
    pub end: i64,
}

#[derive(clap::Subcommand, Debug)]
pub enum Cmd {
    /// Search for and analyze the upstream change of sampled probes whose
    /// observation differs between start and end.
    Analyze(Span),

    /// Rank probes by how attributable their change is.
    Scores(Span),

    /// Summarize upstream changes per origin AS.
    AsSummary {
        #[command(flatten)]
        span: Span,

        /// Analyze at most this many probes.
        #[arg(long, default_value_t = 100)]
        max_probes: usize,
    },
}

impl Cmd {
    fn span(&self) -> &Span {
        match self {
            Self::Analyze(s) | Self::Scores(s) => s,
            Self::AsSummary { span, .. } => span,
        }
    }
}

fn main() -> ExitCode {
    let args = <Args as clap::Parser>::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let mut config = if args.production {
        Config::production()
    } else {
        Config::testing()
    };
    if let Some(n) = args.cache_size {
        config.cache_max_entries = n;
    }
    if let Some(n) = args.num_strides {
        config.num_strides = n;
    }
    if let Some(n) = args.as_thresh {
        config.as_thresh = n;
    }

    tracing::debug!(?args, ?config);

    match run(&args, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_cache_integrity() => {
            tracing::error!(?err, "Cache is corrupt, refusing to continue");
            ExitCode::from(2)
        }
        Err(err) => {
            tracing::error!(?err, "Failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: Config) -> HornetResult<()> {
    let store = FileStore::open_file(&args.cache, config.cache_max_entries)?;
    let _close = CloseOnDrop(store.clone());

    let source: DynProbePathSource = Arc::new(RetryingSource::new(
        JsonDirSource::new(&args.data_dir),
        &config,
    ));
    let source = CachedProbePathSource::create(source, store.clone(), &config);

    let span = args.cmd.span();
    let hornet = Hornet::new(span.msm_id, source, store, config)?;
    let start = Timestamp::from_secs(span.start);
    let end = Timestamp::from_secs(span.end);

    match &args.cmd {
        Cmd::Analyze(_) => analyze(&hornet, start, end),
        Cmd::Scores(_) => {
            for (probe, score) in hornet.hornet_scores(start, end)? {
                println!("{probe},{score}");
            }
            Ok(())
        }
        Cmd::AsSummary { max_probes, .. } => {
            let instants =
                hornet.analysis_interval_points(start, end, hornet.interval())?;
            for row in hornet.as_change_summary(&instants, Some(*max_probes))? {
                println!("{row}");
            }
            Ok(())
        }
    }
}

fn analyze(
    hornet: &Hornet,
    start: Timestamp,
    end: Timestamp,
) -> HornetResult<()> {
    println!("{}", REPORT_HEADER.join(","));
    analyze_sampled(hornet, start, end, |row| println!("{row}"))
}
