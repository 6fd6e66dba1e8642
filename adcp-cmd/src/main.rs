mod decode;
mod info;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Input wire format. Never guessed from the data.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputFormat {
    Rtb,
    Pd0,
}

impl From<InputFormat> for adcp::Format {
    fn from(val: InputFormat) -> Self {
        match val {
            InputFormat::Rtb => adcp::Format::Rtb,
            InputFormat::Pd0 => adcp::Format::Pd0,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a recorded ensemble file.
    Info {
        /// Input ensemble file
        input: PathBuf,

        /// Wire format of the input
        #[arg(short, long)]
        format: InputFormat,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: info::Format,
    },
    /// Decode every ensemble in a file, writing one JSON document per ensemble to stdout.
    Decode {
        /// Input ensemble file
        input: PathBuf,

        /// Wire format of the input
        #[arg(short, long)]
        format: InputFormat,

        /// Convert RTB ensembles to PD0 units and beam order.
        #[arg(long, action)]
        pd0_convention: bool,

        /// Report a partial frame at the end of the file as an error.
        #[arg(long, action)]
        strict: bool,

        /// Stop at the first fatal error rather than searching for the next frame.
        #[arg(long, action)]
        abort: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("ADCP_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Info {
            input,
            format,
            output,
        } => info::info(input, (*format).into(), output),
        Commands::Decode {
            input,
            format,
            pd0_convention,
            strict,
            abort,
        } => {
            let config = adcp::DecoderConfig::builder()
                .format((*format).into())
                .strict(*strict)
                .policy(if *abort {
                    adcp::FatalPolicy::Abort
                } else {
                    adcp::FatalPolicy::Resync
                })
                .convention(if *pd0_convention {
                    adcp::Convention::Pd0Compatible
                } else {
                    adcp::Convention::Native
                })
                .build();
            decode::decode(input, config)
        }
    }
}
