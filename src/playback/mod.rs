//! Local audio playback: fade ramp, device output, and the session
//! state machine.

pub mod engine;
pub mod fade;
pub mod output;

pub use engine::{PlaybackEngine, PlaybackEvent, SessionHandle};
pub use output::{rodio_factory, AudioOutput, FinishedRx, OutputFactory};
