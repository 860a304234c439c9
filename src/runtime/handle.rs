use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use super::signal::StopSignal;
use crate::error::{Error, Result};

/// A producer that runs on its own thread until stopped.
pub trait Player: Send + 'static {
    /// Used as the thread name and in log lines.
    fn name(&self) -> &str;

    /// Generate and submit events until `stop` is set. Implementations must
    /// check `stop` at the top of each loop and wait on it rather than
    /// sleeping.
    fn run(&mut self, stop: &StopSignal) -> Result<()>;
}

/// Owner of a running player thread.
///
/// Dropping the handle signals the player to stop but does not join it.
pub struct PlayerHandle {
    name: String,
    stop: StopSignal,
    thread: Option<JoinHandle<Result<()>>>,
}

impl PlayerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signal stop and wait for the thread, returning the player's result.
    pub fn join(mut self) -> Result<()> {
        self.stop.stop();
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        let result = thread
            .join()
            .map_err(|_| Error::PlayerPanicked(self.name.clone()))?;
        info!(player = %self.name, "player stopped");
        result
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            debug!(player = %self.name, "handle dropped, signalling stop");
            self.stop.stop();
        }
    }
}

/// Run `player` on a named thread.
pub fn spawn(mut player: impl Player) -> Result<PlayerHandle> {
    let name = player.name().to_string();
    let stop = StopSignal::new();
    let thread_stop = stop.clone();

    let thread = thread::Builder::new()
        .name(format!("ostinato-{name}"))
        .spawn(move || player.run(&thread_stop))
        .map_err(Error::Spawn)?;

    info!(player = %name, "player started");
    Ok(PlayerHandle {
        name,
        stop,
        thread: Some(thread),
    })
}
