use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rbpmaps::{
    commands::{
        rbpmaps_divergence, rbpmaps_normalize, rbpmaps_stats, rbpmaps_subtract,
        BackgroundOptions, Divergence,
    },
    prelude::{RbpMapsError, SignificanceTest},
    reporting::Report,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "dev-commands")]
use rbpmaps::commands::rbpmaps_random_matrix;

const INFO: &str = "\
rbpmaps: normalization and significance for RNA-binding protein maps
usage: rbpmaps [--help] <subcommand>

Subcommands:

  normalize: convert a density matrix into per-event probability distributions.
  subtract:  subtract normalized control density from normalized signal density.
  kl:        per-event KL divergence terms between signal and control.
  entropy:   per-event divergence terms in reads-per-million space.
  stats:     trimmed per-position statistics, and significance against a background.

";

#[derive(Parser)]
#[clap(name = "rbpmaps")]
#[clap(about = INFO)]
struct Cli {
    /// increase logging verbosity (-d for debug, -dd for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Normalize {
        /// a TSV density matrix (events × positions, -1 for missing)
        #[arg(long, required = true)]
        input: PathBuf,

        /// events whose summed density is not above this are dropped
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Subtract {
        /// the signal (IP) TSV density matrix
        #[arg(long, required = true)]
        signal: PathBuf,

        /// the control (input) TSV density matrix
        #[arg(long, required = true)]
        control: PathBuf,

        /// events whose summed density is not above this are dropped
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,

        /// subtract per event, rather than subtracting the mean profiles
        #[arg(long)]
        per_event: bool,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Kl {
        /// the signal (IP) TSV density matrix
        #[arg(long, required = true)]
        signal: PathBuf,

        /// the control (input) TSV density matrix
        #[arg(long, required = true)]
        control: PathBuf,

        /// events whose summed density is not above this are dropped
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,

        /// output the mean over events, rather than the per-event matrix
        #[arg(long)]
        mean: bool,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Entropy {
        /// the signal (IP) TSV density matrix
        #[arg(long, required = true)]
        signal: PathBuf,

        /// the control (input) TSV density matrix
        #[arg(long, required = true)]
        control: PathBuf,

        /// events whose summed density is not above this are dropped
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,

        /// output the mean over events, rather than the per-event matrix
        #[arg(long)]
        mean: bool,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Stats {
        /// a TSV event matrix
        #[arg(long, required = true)]
        input: PathBuf,

        /// fraction of values kept at each position after trimming both tails
        #[arg(long, default_value_t = 0.95)]
        confidence: f64,

        /// lines with no more than this many events are flagged as dim
        #[arg(long, default_value_t = 0)]
        min_events: usize,

        /// a background TSV event matrix to test against
        #[arg(long)]
        background: Option<PathBuf>,

        /// the per-position test to run against the background
        #[arg(long, value_enum)]
        test: Option<SignificanceTest>,

        /// compute z-scores against the background
        #[arg(long)]
        zscore: bool,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    #[cfg(feature = "dev-commands")]
    RandomMatrix {
        /// number of events
        #[arg(long, required = true)]
        nevents: usize,

        /// number of positions
        #[arg(long, required = true)]
        npositions: usize,

        /// fraction of missing values
        #[arg(long, default_value_t = 0.0)]
        missing: f64,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(debug: u8) {
    let default_level = match debug {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn run() -> Result<(), RbpMapsError> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let report: Report = match &cli.command {
        Some(Commands::Normalize {
            input,
            threshold,
            output,
        }) => rbpmaps_normalize(input, *threshold, output.as_ref())?.into_parts().1,
        Some(Commands::Subtract {
            signal,
            control,
            threshold,
            per_event,
            output,
        }) => {
            rbpmaps_subtract(signal, control, *threshold, *per_event, output.as_ref())?
                .into_parts()
                .1
        }
        Some(Commands::Kl {
            signal,
            control,
            threshold,
            mean,
            output,
        }) => {
            rbpmaps_divergence(
                signal,
                control,
                *threshold,
                Divergence::KullbackLeibler,
                *mean,
                output.as_ref(),
            )?
            .into_parts()
            .1
        }
        Some(Commands::Entropy {
            signal,
            control,
            threshold,
            mean,
            output,
        }) => {
            rbpmaps_divergence(
                signal,
                control,
                *threshold,
                Divergence::EntropyOfReads,
                *mean,
                output.as_ref(),
            )?
            .into_parts()
            .1
        }
        Some(Commands::Stats {
            input,
            confidence,
            min_events,
            background,
            test,
            zscore,
            output,
        }) => {
            let options = BackgroundOptions {
                background: background.clone(),
                test: *test,
                zscore: *zscore,
            };
            rbpmaps_stats(input, *confidence, *min_events, &options, output.as_ref())?
                .into_parts()
                .1
        }
        #[cfg(feature = "dev-commands")]
        Some(Commands::RandomMatrix {
            nevents,
            npositions,
            missing,
            output,
        }) => {
            rbpmaps_random_matrix(*nevents, *npositions, *missing, output.as_ref())?
                .into_parts()
                .1
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };

    for issue in report.issues() {
        warn!("{}", issue);
    }
    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
