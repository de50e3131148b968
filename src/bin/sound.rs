//! Sound bridge command line
//!
//! Subcommands:
//! - `sound list` - Print audio devices with their index
//! - `sound in` - Capture from a device and write raw PCM to the transport
//! - `sound out` - Read raw PCM from the transport and play it
//! - `sound midiin` / `sound midiout` - Reserved

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sound_bridge::{
    audio::device::list_devices,
    config::{AppConfig, Direction, Overrides, SessionConfig},
    session::{run_midi, Session},
};

#[derive(Parser)]
#[command(name = "sound")]
#[command(about = "Bridge an audio device and a raw PCM byte stream")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio devices
    List,

    /// Capture audio and send it to the transport
    In(AudioArgs),

    /// Receive audio from the transport and play it
    Out(AudioArgs),

    /// Reserved: MIDI input
    Midiin,

    /// Reserved: MIDI output
    Midiout,
}

#[derive(Args)]
struct AudioArgs {
    /// Device index from `list` (default: system default device)
    #[arg(short = 'd')]
    device: Option<usize>,

    /// Channel count
    #[arg(short = 'c')]
    channels: Option<u16>,

    /// Sample rate in Hz
    #[arg(short = 'r')]
    rate: Option<u32>,

    /// Frames per period (default: rate / 50)
    #[arg(short = 'b')]
    frames: Option<u32>,

    /// Sample format: s8, s16, s24, s32, f32, f64
    #[arg(short = 'f')]
    format: Option<String>,

    /// TCP port to listen on; 0 uses standard input/output
    #[arg(short = 'p')]
    port: Option<u16>,

    /// Address to listen on when a port is given
    #[arg(long)]
    bind: Option<IpAddr>,
}

impl From<AudioArgs> for Overrides {
    fn from(args: AudioArgs) -> Self {
        Overrides {
            device: args.device,
            channels: args.channels,
            sample_rate: args.rate,
            frames: args.frames,
            format: args.format,
            port: args.port,
            bind_address: args.bind,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Logs go to stderr; stdout may carry PCM
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::List => {
            for device in list_devices()? {
                println!("{}", device);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::In(args) => audio(Direction::Capture, cli.config, args),
        Commands::Out(args) => audio(Direction::Playback, cli.config, args),
        Commands::Midiin => {
            run_midi(Direction::Capture)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Midiout => {
            run_midi(Direction::Playback)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn audio(direction: Direction, config_path: Option<PathBuf>, args: AudioArgs) -> Result<ExitCode> {
    let file = AppConfig::load(config_path.as_deref())?;
    let config = SessionConfig::resolve(direction, &file, &args.into())?;

    let report = Session::new(config).run()?;
    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
