//! Audio transport seam — the narration track lives in the host page.

use std::sync::Mutex;

use async_trait::async_trait;

/// The embedding page's audio element, reduced to what the engine needs.
/// Playback failure is reported, everything else is fire-and-forget.
#[async_trait]
pub trait AudioTransport: Send + Sync {
    async fn play(&self) -> anyhow::Result<()>;
    async fn pause(&self);
    async fn seek(&self, seconds: f64);
    /// Current playback position in seconds.
    async fn position(&self) -> f64;
    /// Whether the track has played to its end.
    async fn ended(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
struct StubState {
    playing: bool,
    position: f64,
    ended: bool,
    fail_play: bool,
}

/// Scriptable transport for tests: position and end-of-track are set by
/// the test, seeks and play/pause are recorded.
#[derive(Default)]
pub struct StubAudio {
    state: Mutex<StubState>,
    seeks: Mutex<Vec<f64>>,
}

impl StubAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let stub = Self::default();
        stub.state.lock().unwrap().fail_play = true;
        stub
    }

    pub fn set_position(&self, seconds: f64) {
        self.state.lock().unwrap().position = seconds;
    }

    pub fn finish_track(&self) {
        let mut state = self.state.lock().unwrap();
        state.ended = true;
        state.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioTransport for StubAudio {
    async fn play(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_play {
            anyhow::bail!("autoplay rejected");
        }
        state.playing = true;
        state.ended = false;
        Ok(())
    }

    async fn pause(&self) {
        self.state.lock().unwrap().playing = false;
    }

    async fn seek(&self, seconds: f64) {
        self.state.lock().unwrap().position = seconds;
        self.seeks.lock().unwrap().push(seconds);
    }

    async fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    async fn ended(&self) -> bool {
        self.state.lock().unwrap().ended
    }
}
