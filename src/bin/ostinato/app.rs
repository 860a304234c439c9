//! Command dispatch: pick a sink, start players, wait, shut down cleanly.

use std::io::BufRead;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use crossbeam_channel::Receiver;
use tracing::{info, warn};

use ostinato::config::{MixConfig, PlayerConfig, SchedulerConfig};
use ostinato::engine::EventScheduler;
use ostinato::io::{MidiEvent, MidirSink, RecordingSink};
use ostinato::runtime::{
    Ensemble, MelodyLayer, MixPlayer, PlayerHandle, RhythmPlayer, SectionRecord, VoiceSet,
};
use ostinato::sequencing::RhythmLibrary;

use super::{Args, Command, EnsembleStyle, MixKind};

pub fn run(args: Args) -> EyreResult<()> {
    if args.list_ports {
        let ports = MidirSink::list_ports().wrap_err("failed to query MIDI outputs")?;
        if ports.is_empty() {
            println!("No MIDI output ports found.");
        }
        for (i, name) in ports.iter().enumerate() {
            println!("  [{i}] {name}");
        }
        return Ok(());
    }

    let library = match &args.library {
        Some(path) => RhythmLibrary::load(path)
            .wrap_err_with(|| format!("failed to load rhythm library {}", path.display()))?,
        None => RhythmLibrary::builtin(),
    };

    let Some(command) = args.command.clone() else {
        print_library(&library);
        println!(
            "\nRun `ostinato play <RHYTHM>`, `ostinato mix melodic` or `ostinato ensemble jazz`."
        );
        return Ok(());
    };
    match command {
        Command::List => {
            print_library(&library);
            return Ok(());
        }
        Command::Export => {
            println!("{}", library.to_json()?);
            return Ok(());
        }
        _ => {}
    }

    let recording = args.dry_run.map(|_| RecordingSink::new());
    let scheduler = match &recording {
        Some(sink) => EventScheduler::spawn(sink.clone(), SchedulerConfig::default())?,
        None => {
            let sink = MidirSink::open(args.port)
                .wrap_err_with(|| format!("cannot open MIDI output port {}", args.port))?;
            println!("MIDI port '{}' opened.", sink.port_name());
            EventScheduler::spawn(sink, SchedulerConfig::default())?
        }
    };

    let player = PlayerConfig {
        seed: args.seed,
        ..PlayerConfig::default()
    };

    let (players, sections) = match start(&command, &args, &library, &scheduler, &player) {
        Ok(started) => started,
        Err(e) => {
            let _ = scheduler.stop();
            return Err(e);
        }
    };

    wait(args.dry_run.or(args.duration))?;
    shutdown(players, &scheduler)?;

    if let Some(sink) = recording {
        report_dry_run(&sink, sections);
    }
    Ok(())
}

type Started = (Vec<PlayerHandle>, Option<Receiver<SectionRecord>>);

fn start(
    command: &Command,
    args: &Args,
    library: &RhythmLibrary,
    scheduler: &EventScheduler,
    player: &PlayerConfig,
) -> EyreResult<Started> {
    match command {
        Command::Play { rhythm } => {
            let rhythm = library.find(rhythm)?.clone();
            println!(
                "Playing '{}' ({} BPM, {} beats). Press Enter to stop.",
                rhythm.name, rhythm.bpm, rhythm.beats_per_measure
            );
            let handle = RhythmPlayer::new(scheduler.clone(), rhythm, player.clone())?.start()?;
            Ok((vec![handle], None))
        }
        Command::Mix { kind } => {
            let (voices, defaults) = match kind {
                MixKind::Rhythmic => (
                    VoiceSet::rhythmic(library.rhythmic_mix()?),
                    MixConfig::rhythmic(),
                ),
                MixKind::Melodic => (
                    VoiceSet::melodic(library.melodic_mix(), MelodyLayer::from_library(library)),
                    MixConfig::melodic(),
                ),
            };
            let mix = match &args.mix_config {
                Some(path) => load_mix_config(path, defaults)?,
                None => defaults,
            };
            println!("Starting {kind:?} mix. Press Enter to stop.");
            let (tx, rx) = crossbeam_channel::unbounded();
            let handle = MixPlayer::new(scheduler.clone(), voices, mix, player.clone())?
                .with_observer(tx)
                .start()?;
            Ok((vec![handle], Some(rx)))
        }
        Command::Random { bpm } => {
            let ensemble = Ensemble::random(*bpm, args.seed, player.ppq)?;
            println!("Random melody at {bpm} BPM. Press Enter to stop.");
            Ok((ensemble.start(scheduler, player)?, None))
        }
        Command::Ensemble { style, bpm } => {
            let mut ensemble = match style {
                EnsembleStyle::SynthPop => Ensemble::synth_pop(args.seed, player.ppq)?,
                EnsembleStyle::Piano => Ensemble::piano(args.seed, player.ppq)?,
                EnsembleStyle::Jazz => Ensemble::jazz(args.seed, player.ppq)?,
            };
            if let Some(bpm) = bpm {
                ensemble = ensemble.with_bpm(*bpm);
            }
            let voices: Vec<&str> = ensemble.voices().iter().map(|v| v.name()).collect();
            println!(
                "{} at {} BPM ({}). Press Enter to stop.",
                ensemble.name(),
                ensemble.bpm(),
                voices.join(", ")
            );
            Ok((ensemble.start(scheduler, player)?, None))
        }
        Command::List | Command::Export => Err(eyre!("nothing to play")),
    }
}

fn load_mix_config(path: &std::path::Path, defaults: MixConfig) -> EyreResult<MixConfig> {
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    // Fields absent from the file keep this mix's defaults, not the global ones.
    let mut value = serde_json::to_value(&defaults)?;
    let overrides: serde_json::Value = serde_json::from_str(&json)
        .wrap_err_with(|| format!("{} is not valid JSON", path.display()))?;
    if let (Some(base), Some(overrides)) = (value.as_object_mut(), overrides.as_object()) {
        for (key, v) in overrides {
            base.insert(key.clone(), v.clone());
        }
    }
    let mix: MixConfig = serde_json::from_value(value)?;
    mix.validate()?;
    Ok(mix)
}

fn wait(limit: Option<f64>) -> EyreResult<()> {
    match limit {
        Some(secs) => {
            let secs = if secs.is_finite() && secs >= 0.0 { secs } else { 0.0 };
            std::thread::sleep(Duration::from_secs_f64(secs));
        }
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
        }
    }
    Ok(())
}

/// Stop every player, then silence, stop the dispatch thread and silence
/// again for anything it sent while stopping.
fn shutdown(players: Vec<PlayerHandle>, scheduler: &EventScheduler) -> EyreResult<()> {
    println!("Stopping...");
    let mut failed = None;
    for handle in players {
        let name = handle.name().to_string();
        if let Err(e) = handle.join() {
            warn!(player = %name, error = %e, "player failed");
            failed.get_or_insert(e);
        }
    }

    if let Err(e) = scheduler.silence_all() {
        warn!(error = %e, "silence failed");
    }
    let stats = scheduler.stop();
    if let Err(e) = scheduler.silence_all() {
        warn!(error = %e, "silence failed");
    }
    println!("All notes silenced.");

    let stats = stats.wrap_err("MIDI output reported errors")?;
    info!(
        dispatched = stats.dispatched,
        max_lateness_us = stats.max_lateness.as_micros() as u64,
        "done"
    );
    match failed {
        Some(e) => Err(e).wrap_err("a player stopped with an error"),
        None => Ok(()),
    }
}

fn report_dry_run(sink: &RecordingSink, sections: Option<Receiver<SectionRecord>>) {
    let events = sink.events();
    let notes = events
        .iter()
        .filter(|e| matches!(e, MidiEvent::NoteOn { velocity, .. } if *velocity > 0))
        .count();
    println!("Recorded {} messages ({notes} notes).", events.len());

    if let Some(sections) = sections {
        for record in sections.try_iter() {
            println!(
                "  {:<9} pattern {} x{} from tick {}",
                record.state.to_string(),
                record.pattern + 1,
                record.measures,
                record.start_tick
            );
        }
    }
}

fn print_library(library: &RhythmLibrary) {
    println!("{}", "=".repeat(60));
    println!("{:^60}", "RHYTHM LIBRARY");
    println!("{}", "=".repeat(60));
    for (i, rhythm) in library.rhythms.iter().enumerate() {
        println!(
            "  [{}] {:<25} ({} BPM, {} beats)",
            i + 1,
            rhythm.name,
            rhythm.bpm,
            rhythm.beats_per_measure
        );
    }
    println!("{}", "-".repeat(60));
    println!("  mix rhythmic   cycles through rhythms 1 and 3");
    println!("  mix melodic    cycles through every rhythm, with melody");
    println!("  ensemble       synth-pop, piano or jazz band on one downbeat");
}
