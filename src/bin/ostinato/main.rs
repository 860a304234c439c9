//! ostinato - algorithmic rhythm and melody over MIDI
//!
//! Run with: cargo run -- mix melodic

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Index of the MIDI output port
    #[arg(short, long, default_value_t = 0)]
    pub port: usize,

    /// List MIDI output ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Rhythm library (JSON) to use instead of the built-in one
    #[arg(long, value_name = "FILE")]
    pub library: Option<PathBuf>,

    /// Mix settings (JSON); missing fields take the mix's defaults
    #[arg(long, value_name = "FILE")]
    pub mix_config: Option<PathBuf>,

    /// Seed for every random choice, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Record to memory instead of opening a port, for SECS seconds
    #[arg(long, value_name = "SECS")]
    pub dry_run: Option<f64>,

    /// Stop after SECS seconds instead of waiting for Enter
    #[arg(long, value_name = "SECS")]
    pub duration: Option<f64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Loop one rhythm (by number or name prefix)
    Play { rhythm: String },
    /// Cycle through rhythms with thin-out and build-up transitions
    Mix {
        #[arg(value_enum, default_value_t = MixKind::Rhythmic)]
        kind: MixKind,
    },
    /// Random melody over a chord progression
    Random {
        #[arg(long, default_value_t = 110.0)]
        bpm: f64,
    },
    /// A small band on one downbeat: synth-pop, piano or jazz
    Ensemble {
        #[arg(value_enum)]
        style: EnsembleStyle,
        /// Override the style's tempo
        #[arg(long)]
        bpm: Option<f64>,
    },
    /// Print the rhythm library
    List,
    /// Write the rhythm library as JSON to stdout
    Export,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixKind {
    /// Fanga and Kpanlogo, drums only
    Rhythmic,
    /// Every rhythm, with call-and-response melody
    Melodic,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsembleStyle {
    /// Drums, bass, keys, arpeggio, lead and pad in C major
    SynthPop,
    /// Soprano, inverted alto and tenor, bass and accompaniment
    Piano,
    /// Jazz voicings, blues melody, walking bass
    Jazz,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    app::run(Args::parse())
}
