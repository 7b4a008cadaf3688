//! Audio device output.
//!
//! Abstracts the OS audio device behind the [`AudioOutput`] capability so
//! the playback engine (and its tests) never touch a real device directly.
//! The rodio-backed implementation runs the device on a dedicated thread
//! because the underlying output stream is not Send; the handle held by
//! the engine only carries a command channel.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStreamBuilder, Sink};
use tokio::sync::oneshot;

use crate::error::{DaemonError, Result};

use super::fade;

/// Resolves when the output finishes on its own: Ok on natural end of the
/// asset, Err with a diagnostic on a mid-playback device failure. Dropped
/// without a value when the output is stopped or replaced.
pub type FinishedRx = oneshot::Receiver<std::result::Result<(), String>>;

/// Capability contract for one playback device acquisition.
///
/// One AudioOutput instance serves one session; the engine drops it to
/// release the device.
pub trait AudioOutput: Send {
    /// Opens the asset and starts playback at `volume`, optionally ramping
    /// gain over `fade`. Fails if the device cannot be acquired or the
    /// file cannot be decoded.
    fn start(&mut self, path: &Path, volume: f32, fade: Option<Duration>) -> Result<FinishedRx>;

    /// Suspends output, keeping the device.
    fn pause(&mut self);

    /// Resumes suspended output.
    fn resume(&mut self);

    /// Stops output. The device is released by the time this returns, so
    /// a replacement output can acquire it immediately.
    fn stop(&mut self);
}

/// Factory producing a fresh output per session.
pub type OutputFactory = Box<dyn Fn() -> Box<dyn AudioOutput> + Send>;

/// Returns a factory producing rodio-backed outputs.
pub fn rodio_factory() -> OutputFactory {
    Box::new(|| Box::new(RodioOutput::new()))
}

/// Commands sent to the device thread.
enum OutputCmd {
    Pause,
    Resume,
    Stop,
}

/// Rodio-backed audio output.
///
/// `start` spawns the device thread and waits for its ready handshake, so
/// device-unavailable and decode errors surface synchronously.
pub struct RodioOutput {
    cmd_tx: Option<mpsc::Sender<OutputCmd>>,
    device_thread: Option<thread::JoinHandle<()>>,
}

impl RodioOutput {
    /// Creates an output with no device acquired yet.
    pub fn new() -> Self {
        Self {
            cmd_tx: None,
            device_thread: None,
        }
    }

    fn send(&self, cmd: OutputCmd) {
        if let Some(ref tx) = self.cmd_tx {
            tx.send(cmd).ok();
        }
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for RodioOutput {
    fn start(&mut self, path: &Path, volume: f32, fade: Option<Duration>) -> Result<FinishedRx> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = oneshot::channel();

        let path = path.to_path_buf();
        let spawned = thread::Builder::new()
            .name("vibe-audio".to_string())
            .spawn(move || run_device_thread(path, volume, fade, cmd_rx, ready_tx, done_tx));
        let handle = match spawned {
            Ok(h) => h,
            Err(e) => {
                return Err(DaemonError::playback_failed(format!(
                    "could not spawn audio thread: {}",
                    e
                )))
            }
        };

        // Wait for the thread to acquire the device and decode the file
        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.cmd_tx = Some(cmd_tx);
                self.device_thread = Some(handle);
                Ok(done_rx)
            }
            Ok(Err(message)) => {
                handle.join().ok();
                Err(DaemonError::playback_failed(message))
            }
            Err(_) => {
                handle.join().ok();
                Err(DaemonError::playback_failed(
                    "audio thread exited before becoming ready",
                ))
            }
        }
    }

    fn pause(&mut self) {
        self.send(OutputCmd::Pause);
    }

    fn resume(&mut self) {
        self.send(OutputCmd::Resume);
    }

    fn stop(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            tx.send(OutputCmd::Stop).ok();
        }
        // The next session may open its own stream as soon as stop()
        // returns, so wait for the thread to drop this one
        if let Some(handle) = self.device_thread.take() {
            handle.join().ok();
        }
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Device thread body: owns the output stream and sink for one session.
fn run_device_thread(
    path: PathBuf,
    volume: f32,
    fade: Option<Duration>,
    cmd_rx: mpsc::Receiver<OutputCmd>,
    ready_tx: mpsc::Sender<std::result::Result<(), String>>,
    done_tx: oneshot::Sender<std::result::Result<(), String>>,
) {
    let stream = match OutputStreamBuilder::open_default_stream() {
        Ok(s) => s,
        Err(e) => {
            ready_tx
                .send(Err(format!("audio device unavailable: {}", e)))
                .ok();
            return;
        }
    };
    let sink = Sink::connect_new(stream.mixer());

    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) => {
            ready_tx
                .send(Err(format!("cannot open {}: {}", path.display(), e)))
                .ok();
            return;
        }
    };
    let source = match Decoder::new(BufReader::new(file)) {
        Ok(s) => s,
        Err(e) => {
            ready_tx
                .send(Err(format!("cannot decode {}: {}", path.display(), e)))
                .ok();
            return;
        }
    };

    sink.set_volume(if fade.is_some() { 0.0 } else { volume });
    sink.append(source);
    ready_tx.send(Ok(())).ok();

    // Fade position only advances while audio is flowing
    let mut fade_pos = Duration::ZERO;
    let mut last_tick = Instant::now();

    let outcome = loop {
        match cmd_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(OutputCmd::Pause) => sink.pause(),
            Ok(OutputCmd::Resume) => sink.play(),
            Ok(OutputCmd::Stop) => {
                sink.stop();
                break Ok(());
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // Engine handle dropped; release the device
                sink.stop();
                break Ok(());
            }
        }

        let now = Instant::now();
        if !sink.is_paused() {
            fade_pos += now - last_tick;
            if let Some(window) = fade {
                if fade_pos < window + Duration::from_millis(100) {
                    sink.set_volume(fade::gain_at(fade_pos, window, volume));
                }
            }
        }
        last_tick = now;

        if sink.empty() {
            break Ok(());
        }
    };

    done_tx.send(outcome).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstarted_output_commands_are_harmless() {
        let mut output = RodioOutput::new();
        output.pause();
        output.resume();
        output.stop();
    }
}
