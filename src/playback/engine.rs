//! Playback engine.
//!
//! Runs the playback state machine over one exclusively-owned audio
//! device and pushes typed events to its subscriber (the tool server).
//! At most one session is ever active: a new play() interrupts the
//! previous session rather than queueing behind it. The engine is an
//! explicitly constructed instance handed to the server at startup, so
//! tests construct isolated engines with stub outputs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::{DaemonError, Result};
use crate::types::{EndReason, PlaybackSession, PlaybackState};

use super::output::{AudioOutput, FinishedRx, OutputFactory};

/// Lifecycle event pushed on every terminal state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// A session reached Playing.
    Started {
        session_id: u64,
        path: PathBuf,
        volume: f32,
        fade_in: bool,
    },
    /// A session ended; the reason distinguishes natural end, explicit
    /// stop, and interruption by a newer session.
    Ended { session_id: u64, reason: EndReason },
    /// A session failed with a device or decode error.
    Error { session_id: u64, message: String },
}

/// Handle returned by play().
///
/// The `finished` receiver resolves when the device output ends on its
/// own; the server spawns a monitor task that feeds the outcome back into
/// the engine via [`PlaybackEngine::finish_session`] /
/// [`PlaybackEngine::fail_session`].
pub struct SessionHandle {
    pub session_id: u64,
    pub finished: FinishedRx,
}

struct ActiveSession {
    session: PlaybackSession,
    output: Box<dyn AudioOutput>,
}

/// The playback state machine and owner of the audio device.
pub struct PlaybackEngine {
    factory: OutputFactory,
    fade_window: Duration,
    events: UnboundedSender<PlaybackEvent>,
    next_session_id: u64,
    active: Option<ActiveSession>,
}

impl PlaybackEngine {
    /// Creates a new engine.
    ///
    /// `factory` produces one device output per session; `events` receives
    /// every lifecycle event.
    pub fn new(
        factory: OutputFactory,
        fade_window: Duration,
        events: UnboundedSender<PlaybackEvent>,
    ) -> Self {
        Self {
            factory,
            fade_window,
            events,
            next_session_id: 0,
            active: None,
        }
    }

    /// Returns the current state (Idle when no session is active).
    pub fn state(&self) -> PlaybackState {
        self.active
            .as_ref()
            .map(|a| a.session.state)
            .unwrap_or(PlaybackState::Idle)
    }

    /// Returns the active session id, if any.
    pub fn active_session_id(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.session.session_id)
    }

    /// Starts playback of an asset, interrupting any active session.
    ///
    /// Volume is clamped to [0, 1]. With `fade_in`, gain ramps from 0 to
    /// the volume over the configured window instead of jumping. Device or
    /// decode failures emit a playback error event and reset the engine to
    /// Idle, so a later play() always remains possible.
    pub fn play(&mut self, path: &Path, volume: f32, fade_in: bool) -> Result<SessionHandle> {
        self.interrupt_active();

        self.next_session_id += 1;
        let mut session =
            PlaybackSession::new(self.next_session_id, path.to_path_buf(), volume, fade_in);

        if !session.path.exists() {
            let err =
                DaemonError::playback_failed(format!("audio file not found: {}", path.display()));
            self.emit(PlaybackEvent::Error {
                session_id: session.session_id,
                message: err.message.clone(),
            });
            return Err(err);
        }

        let mut output = (self.factory)();
        let fade = fade_in.then_some(self.fade_window);
        match output.start(&session.path, session.volume, fade) {
            Ok(finished) => {
                session.state = PlaybackState::Playing;
                self.emit(PlaybackEvent::Started {
                    session_id: session.session_id,
                    path: session.path.clone(),
                    volume: session.volume,
                    fade_in: session.fade_in,
                });
                let session_id = session.session_id;
                self.active = Some(ActiveSession { session, output });
                Ok(SessionHandle {
                    session_id,
                    finished,
                })
            }
            Err(err) => {
                self.emit(PlaybackEvent::Error {
                    session_id: session.session_id,
                    message: err.message.clone(),
                });
                Err(err)
            }
        }
    }

    /// Pauses playback. Valid only in Playing.
    pub fn pause(&mut self) -> Result<()> {
        match self.active.as_mut() {
            Some(active) if active.session.state == PlaybackState::Playing => {
                active.output.pause();
                active.session.state = PlaybackState::Paused;
                Ok(())
            }
            _ => Err(DaemonError::playback_failed(format!(
                "pause is only valid while playing (state: {})",
                self.state().as_str()
            ))),
        }
    }

    /// Resumes playback. Valid only in Paused.
    pub fn resume(&mut self) -> Result<()> {
        match self.active.as_mut() {
            Some(active) if active.session.state == PlaybackState::Paused => {
                active.output.resume();
                active.session.state = PlaybackState::Playing;
                Ok(())
            }
            _ => Err(DaemonError::playback_failed(format!(
                "resume is only valid while paused (state: {})",
                self.state().as_str()
            ))),
        }
    }

    /// Stops the active session, releasing the device.
    ///
    /// Safe in every state; a stop with nothing playing is a no-op.
    pub fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.output.stop();
            self.emit(PlaybackEvent::Ended {
                session_id: active.session.session_id,
                reason: EndReason::Stopped,
            });
        }
    }

    /// Records the natural end of a session.
    ///
    /// Ignored unless the session is still the active one; a session that
    /// was stopped or interrupted already emitted its end event.
    pub fn finish_session(&mut self, session_id: u64) {
        if self.active_session_id() == Some(session_id) {
            self.active = None;
            self.emit(PlaybackEvent::Ended {
                session_id,
                reason: EndReason::Completed,
            });
        }
    }

    /// Records a mid-playback device failure for a session.
    ///
    /// Ignored unless the session is still the active one. The engine
    /// resets to Idle, releasing the device.
    pub fn fail_session(&mut self, session_id: u64, message: &str) {
        if self.active_session_id() == Some(session_id) {
            self.active = None;
            self.emit(PlaybackEvent::Error {
                session_id,
                message: message.to_string(),
            });
        }
    }

    /// Interrupts the active session ahead of a new play().
    fn interrupt_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.output.stop();
            self.emit(PlaybackEvent::Ended {
                session_id: active.session.session_id,
                reason: EndReason::Interrupted,
            });
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // Subscriber gone means the server is shutting down; nothing to do
        self.events.send(event).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
    use tokio::sync::oneshot;

    /// Shared controls for stub outputs created by one factory.
    #[derive(Default)]
    struct StubControls {
        /// Senders for each started output, in creation order.
        done_txs: Mutex<Vec<Option<oneshot::Sender<std::result::Result<(), String>>>>>,
        starts: AtomicUsize,
        stops: AtomicUsize,
        pauses: AtomicUsize,
        resumes: AtomicUsize,
        /// Outputs currently holding the device, and the high-water mark.
        live: AtomicUsize,
        max_live: AtomicUsize,
        /// When set, start() fails with this message.
        fail_start: Mutex<Option<String>>,
    }

    struct StubOutput {
        controls: Arc<StubControls>,
    }

    impl AudioOutput for StubOutput {
        fn start(
            &mut self,
            _path: &Path,
            _volume: f32,
            _fade: Option<Duration>,
        ) -> Result<FinishedRx> {
            if let Some(msg) = self.controls.fail_start.lock().unwrap().clone() {
                return Err(DaemonError::playback_failed(msg));
            }
            self.controls.starts.fetch_add(1, Ordering::SeqCst);
            let live = self.controls.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.controls.max_live.fetch_max(live, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            self.controls.done_txs.lock().unwrap().push(Some(tx));
            Ok(rx)
        }

        fn pause(&mut self) {
            self.controls.pauses.fetch_add(1, Ordering::SeqCst);
        }

        fn resume(&mut self) {
            self.controls.resumes.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.controls.stops.fetch_add(1, Ordering::SeqCst);
            self.controls.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn stub_engine() -> (
        PlaybackEngine,
        Arc<StubControls>,
        UnboundedReceiver<PlaybackEvent>,
    ) {
        let controls = Arc::new(StubControls::default());
        let factory_controls = controls.clone();
        let factory: OutputFactory = Box::new(move || {
            Box::new(StubOutput {
                controls: factory_controls.clone(),
            })
        });
        let (tx, rx) = unbounded_channel();
        let engine = PlaybackEngine::new(factory, Duration::from_millis(1500), tx);
        (engine, controls, rx)
    }

    fn temp_audio_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.mp3");
        std::fs::write(&path, b"not really mp3").unwrap();
        (dir, path)
    }

    #[test]
    fn engine_starts_idle() {
        let (engine, _, _rx) = stub_engine();
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(engine.active_session_id().is_none());
    }

    #[test]
    fn play_transitions_to_playing_and_emits_start() {
        let (mut engine, controls, mut rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        let handle = engine.play(&path, 0.8, true).unwrap();
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.active_session_id(), Some(handle.session_id));
        assert_eq!(controls.starts.load(Ordering::SeqCst), 1);

        match rx.try_recv().unwrap() {
            PlaybackEvent::Started {
                session_id,
                volume,
                fade_in,
                ..
            } => {
                assert_eq!(session_id, handle.session_id);
                assert_eq!(volume, 0.8);
                assert!(fade_in);
            }
            other => panic!("expected Started, got {:?}", other),
        }
    }

    #[test]
    fn play_clamps_volume() {
        let (mut engine, _, mut rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        engine.play(&path, 3.0, false).unwrap();
        match rx.try_recv().unwrap() {
            PlaybackEvent::Started { volume, .. } => assert_eq!(volume, 1.0),
            other => panic!("expected Started, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_errors_and_resets_to_idle() {
        let (mut engine, controls, mut rx) = stub_engine();

        let err = engine.play(Path::new("/no/such/file.mp3"), 0.5, false);
        assert!(err.is_err());
        assert_eq!(engine.state(), PlaybackState::Idle);
        // No device was ever acquired
        assert_eq!(controls.starts.load(Ordering::SeqCst), 0);
        assert!(matches!(rx.try_recv().unwrap(), PlaybackEvent::Error { .. }));
    }

    #[test]
    fn device_failure_errors_and_resets_to_idle() {
        let (mut engine, controls, mut rx) = stub_engine();
        let (_dir, path) = temp_audio_file();
        *controls.fail_start.lock().unwrap() = Some("device busy".to_string());

        assert!(engine.play(&path, 0.5, false).is_err());
        assert_eq!(engine.state(), PlaybackState::Idle);
        match rx.try_recv().unwrap() {
            PlaybackEvent::Error { message, .. } => assert!(message.contains("device busy")),
            other => panic!("expected Error, got {:?}", other),
        }

        // A subsequent play succeeds once the device recovers
        *controls.fail_start.lock().unwrap() = None;
        assert!(engine.play(&path, 0.5, false).is_ok());
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn second_play_interrupts_first() {
        let (mut engine, controls, mut rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        let first = engine.play(&path, 1.0, false).unwrap();
        let second = engine.play(&path, 1.0, false).unwrap();
        assert_ne!(first.session_id, second.session_id);
        // Only one session active at any instant
        assert_eq!(engine.active_session_id(), Some(second.session_id));
        assert_eq!(controls.stops.load(Ordering::SeqCst), 1);

        // Exactly one end-then-start pair between the two starts
        assert!(matches!(rx.try_recv().unwrap(), PlaybackEvent::Started { .. }));
        match rx.try_recv().unwrap() {
            PlaybackEvent::Ended { session_id, reason } => {
                assert_eq!(session_id, first.session_id);
                assert_eq!(reason, EndReason::Interrupted);
            }
            other => panic!("expected Ended, got {:?}", other),
        }
        match rx.try_recv().unwrap() {
            PlaybackEvent::Started { session_id, .. } => {
                assert_eq!(session_id, second.session_id)
            }
            other => panic!("expected Started, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn interrupt_releases_device_before_reacquiring() {
        let (mut engine, controls, _rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        engine.play(&path, 1.0, false).unwrap();
        engine.play(&path, 1.0, false).unwrap();
        engine.play(&path, 1.0, false).unwrap();
        engine.stop();

        // The old output is stopped before a new one is created, so two
        // outputs never hold the device at once
        assert_eq!(controls.max_live.load(Ordering::SeqCst), 1);
        assert_eq!(controls.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pause_resume_toggle() {
        let (mut engine, controls, _rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        engine.play(&path, 1.0, false).unwrap();
        engine.pause().unwrap();
        assert_eq!(engine.state(), PlaybackState::Paused);
        // Pausing twice is an invalid transition
        assert!(engine.pause().is_err());

        engine.resume().unwrap();
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert!(engine.resume().is_err());

        assert_eq!(controls.pauses.load(Ordering::SeqCst), 1);
        assert_eq!(controls.resumes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pause_resume_invalid_when_idle() {
        let (mut engine, _, _rx) = stub_engine();
        assert!(engine.pause().is_err());
        assert!(engine.resume().is_err());
    }

    #[test]
    fn stop_emits_end_with_stopped_reason() {
        let (mut engine, _, mut rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        let handle = engine.play(&path, 1.0, false).unwrap();
        rx.try_recv().unwrap(); // Started

        engine.stop();
        assert_eq!(engine.state(), PlaybackState::Idle);
        match rx.try_recv().unwrap() {
            PlaybackEvent::Ended { session_id, reason } => {
                assert_eq!(session_id, handle.session_id);
                assert_eq!(reason, EndReason::Stopped);
            }
            other => panic!("expected Ended, got {:?}", other),
        }
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let (mut engine, _, mut rx) = stub_engine();
        engine.stop();
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn natural_end_emits_completed() {
        let (mut engine, _, mut rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        let handle = engine.play(&path, 1.0, false).unwrap();
        rx.try_recv().unwrap(); // Started

        engine.finish_session(handle.session_id);
        assert_eq!(engine.state(), PlaybackState::Idle);
        match rx.try_recv().unwrap() {
            PlaybackEvent::Ended { reason, .. } => assert_eq!(reason, EndReason::Completed),
            other => panic!("expected Ended, got {:?}", other),
        }
    }

    #[test]
    fn stale_finish_is_ignored() {
        let (mut engine, _, mut rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        let first = engine.play(&path, 1.0, false).unwrap();
        let _second = engine.play(&path, 1.0, false).unwrap();
        while rx.try_recv().is_ok() {}

        // The interrupted session's output finishing later must not emit
        engine.finish_session(first.session_id);
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn fail_session_emits_error_and_resets() {
        let (mut engine, _, mut rx) = stub_engine();
        let (_dir, path) = temp_audio_file();

        let handle = engine.play(&path, 1.0, false).unwrap();
        rx.try_recv().unwrap(); // Started

        engine.fail_session(handle.session_id, "stream underrun");
        assert_eq!(engine.state(), PlaybackState::Idle);
        match rx.try_recv().unwrap() {
            PlaybackEvent::Error { message, .. } => assert!(message.contains("underrun")),
            other => panic!("expected Error, got {:?}", other),
        }

        // Engine is usable again after the error
        assert!(engine.play(&path, 1.0, false).is_ok());
    }
}
