//! Narrated slide deck that advances itself along the audio track.
//!
//! Slides carry a narration timestamp; playback position drives
//! advancement (forward only — skips allowed, regression never). The
//! shared session row carries only start and restart transitions, with
//! a local-action flag breaking update loops since there is no
//! controller here.

pub mod audio;
pub mod driver;
pub mod engine;
pub mod slide;

pub use audio::{AudioTransport, StubAudio};
pub use driver::{DeckCommand, run_deck};
pub use engine::{DeckEngine, DeckView, RecordingDeckView};
pub use slide::{Slide, deck};
