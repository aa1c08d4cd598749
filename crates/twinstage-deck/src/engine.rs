//! The deck sequencer.
//!
//! Forward-only: the narration position selects the highest slide whose
//! timestamp has been crossed, never a lower one. The only backward move
//! is the explicit restart sentinel.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use twinstage_core::bridge::{HostBridge, toggle_visibility};
use twinstage_sync::{DeckRow, RESTART_SENTINEL, SessionSync};

use crate::audio::AudioTransport;
use crate::slide::{ALL_MEDIA, BASELINE_ACTOR, CLOSING_MEDIA, SOUND_ACTOR, Slide, deck};

/// The page around the deck: slide text, end screen, the start/restart
/// control, and the progress bar.
pub trait DeckView: Send + Sync {
    fn show_slide(&self, index: usize, slide: &Slide);
    fn show_end_screen(&self);
    fn set_start_visible(&self, visible: bool);
    fn set_progress(&self, current: usize, total: usize);
}

pub struct DeckEngine {
    view: Arc<dyn DeckView>,
    bridge: Arc<dyn HostBridge>,
    audio: Arc<dyn AudioTransport>,
    current: i32,
    sound_started: bool,
    running: bool,
}

impl DeckEngine {
    pub fn new(
        view: Arc<dyn DeckView>,
        bridge: Arc<dyn HostBridge>,
        audio: Arc<dyn AudioTransport>,
    ) -> Self {
        Self {
            view,
            bridge,
            audio,
            current: RESTART_SENTINEL,
            sound_started: false,
            running: false,
        }
    }

    pub fn current_slide(&self) -> i32 {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Initial stage state: no media, no sound indicator, start control
    /// offered.
    pub fn prepare(&self) {
        for media in ALL_MEDIA {
            toggle_visibility(self.bridge.as_ref(), media, false);
        }
        toggle_visibility(self.bridge.as_ref(), SOUND_ACTOR, false);
        self.view.set_start_visible(true);
        self.view.set_progress(0, deck().len());
    }

    /// User pressed start: announce it to the session, then begin
    /// narration and show the first slide.
    pub async fn start(&mut self, sync: &SessionSync) {
        if self.sound_started {
            return;
        }
        sync.publish(DeckRow::patch_position(0, 0.0)).await;
        self.begin_playback(None).await;
        self.show_slide(0);
        info!("Presentation started");
    }

    async fn begin_playback(&mut self, seek_to: Option<f64>) {
        toggle_visibility(self.bridge.as_ref(), SOUND_ACTOR, true);
        self.sound_started = true;
        self.running = true;
        self.view.set_start_visible(false);

        if let Some(seconds) = seek_to {
            self.audio.seek(seconds).await;
        }
        if let Err(e) = self.audio.play().await {
            error!(%e, "Error playing audio");
        }
    }

    fn show_slide(&mut self, index: usize) {
        self.current = index as i32;
        let slide = &deck()[index];
        if let Some(media) = slide.media {
            toggle_visibility(self.bridge.as_ref(), media, true);
            if media == CLOSING_MEDIA {
                toggle_visibility(self.bridge.as_ref(), BASELINE_ACTOR, false);
            }
        }
        self.view.show_slide(index, slide);
        self.view.set_progress(index + 1, deck().len());
        debug!(index, "Slide shown");
    }

    /// Advance along the narration: pick the highest slide whose
    /// timestamp is behind `position` and ahead of where we are.
    pub fn on_audio_tick(&mut self, position: f64) {
        if !self.running {
            return;
        }
        let slides = deck();
        for i in (0..slides.len()).rev() {
            if position >= slides[i].at && self.current < i as i32 {
                self.show_slide(i);
                break;
            }
        }
    }

    /// The narration ran out; on the last slide this offers the finish
    /// control.
    pub fn on_audio_ended(&mut self) {
        if !self.running {
            return;
        }
        info!("Audio ended");
        self.running = false;
        if self.current == deck().len() as i32 - 1 {
            self.view.set_start_visible(true);
        }
    }

    /// Read the transport and feed position / end-of-track into the
    /// sequencer. The driver calls this on its polling tick.
    pub async fn poll_audio(&mut self) {
        if !self.running {
            return;
        }
        let position = self.audio.position().await;
        self.on_audio_tick(position);
        if self.audio.ended().await {
            self.on_audio_ended();
        }
    }

    pub fn finish(&self) {
        self.view.show_end_screen();
    }

    /// User asked for a restart: announce the sentinel, then rewind.
    pub async fn restart(&mut self, sync: &SessionSync) {
        sync.publish(DeckRow::patch_restart()).await;
        self.restart_local().await;
    }

    /// Rewind to the pre-start state without touching the session row.
    pub async fn restart_local(&mut self) {
        self.audio.pause().await;
        self.audio.seek(0.0).await;

        for media in ALL_MEDIA {
            toggle_visibility(self.bridge.as_ref(), media, false);
        }
        toggle_visibility(self.bridge.as_ref(), BASELINE_ACTOR, true);
        toggle_visibility(self.bridge.as_ref(), SOUND_ACTOR, false);

        self.current = RESTART_SENTINEL;
        self.sound_started = false;
        self.running = false;
        self.view.set_start_visible(true);
        self.view.set_progress(0, deck().len());
        info!("Presentation restarted");
    }

    /// Replay a remote row. Holds the local-action guard for the whole
    /// application so nothing here publishes back. Forward-only: targets
    /// that neither restart nor advance are ignored.
    pub async fn apply_remote(&mut self, row: &DeckRow, sync: &SessionSync) {
        let _guard = sync.begin_local_action();
        let target = row.current_slide;
        debug!(target, audio = row.audio_timestamp, "Syncing to slide");

        if target == RESTART_SENTINEL && self.current != RESTART_SENTINEL {
            self.restart_local().await;
        } else if target == 0 && self.current == RESTART_SENTINEL {
            self.begin_playback(Some(row.audio_timestamp)).await;
            self.show_slide(0);
        } else if target > self.current {
            let Ok(index) = usize::try_from(target) else {
                return;
            };
            if index >= deck().len() {
                warn!(target, "Slide target out of range, ignoring");
                return;
            }
            if !self.sound_started {
                self.begin_playback(Some(row.audio_timestamp)).await;
            }
            self.show_slide(index);
        }
    }
}

/// Headless deck view, for tests and driverless runs.
#[derive(Default)]
pub struct RecordingDeckView {
    shown: Mutex<Vec<usize>>,
    end_screens: Mutex<usize>,
    start_visible: Mutex<Option<bool>>,
}

impl RecordingDeckView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<usize> {
        self.shown.lock().unwrap().clone()
    }

    pub fn end_screens(&self) -> usize {
        *self.end_screens.lock().unwrap()
    }

    pub fn start_visible(&self) -> Option<bool> {
        *self.start_visible.lock().unwrap()
    }
}

impl DeckView for RecordingDeckView {
    fn show_slide(&self, index: usize, _slide: &Slide) {
        self.shown.lock().unwrap().push(index);
    }

    fn show_end_screen(&self) {
        *self.end_screens.lock().unwrap() += 1;
    }

    fn set_start_visible(&self, visible: bool) {
        *self.start_visible.lock().unwrap() = Some(visible);
    }

    fn set_progress(&self, _current: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::StubAudio;
    use serde_json::json;
    use twinstage_core::bridge::RecordingBridge;
    use twinstage_sync::{MemoryBackend, WritePolicy};

    struct Rig {
        engine: DeckEngine,
        sync: SessionSync,
        view: Arc<RecordingDeckView>,
        bridge: Arc<RecordingBridge>,
        audio: Arc<StubAudio>,
        backend: Arc<MemoryBackend>,
    }

    async fn rig() -> Rig {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed(
                "deck_session",
                json!({ "id": "d1", "current_slide": -1, "audio_timestamp": 0.0 }),
            )
            .await;
        let sync =
            SessionSync::connect(backend.clone(), "deck_session", "viewer-1", WritePolicy::Open)
                .await;

        let view = Arc::new(RecordingDeckView::new());
        let bridge = Arc::new(RecordingBridge::new());
        let audio = Arc::new(StubAudio::new());
        let engine = DeckEngine::new(view.clone(), bridge.clone(), audio.clone());
        Rig {
            engine,
            sync,
            view,
            bridge,
            audio,
            backend,
        }
    }

    #[tokio::test]
    async fn test_start_publishes_and_begins_narration() {
        let mut r = rig().await;
        r.engine.start(&r.sync).await;

        assert_eq!(r.engine.current_slide(), 0);
        assert!(r.engine.is_running());
        assert!(r.audio.is_playing());
        assert_eq!(r.bridge.last_for(SOUND_ACTOR), Some(true));
        assert_eq!(r.view.shown(), vec![0]);

        let row = r.backend.row("deck_session").await.unwrap();
        assert_eq!(row["current_slide"], 0);
        assert_eq!(row["audio_timestamp"], 0.0);

        // A second press is a no-op.
        r.engine.start(&r.sync).await;
        assert_eq!(r.view.shown(), vec![0]);
    }

    #[tokio::test]
    async fn test_audio_sweep_selects_greatest_crossed_threshold() {
        let mut r = rig().await;
        r.engine.start(&r.sync).await;

        let thresholds: Vec<f64> = deck().iter().map(|s| s.at).collect();
        let mut previous = r.engine.current_slide();
        let mut position = 0.0;
        while position <= 60.0 {
            r.engine.on_audio_tick(position);
            let current = r.engine.current_slide();
            assert!(current >= previous, "slide index regressed at {position}");

            let expected = thresholds
                .iter()
                .rposition(|&at| at <= position)
                .map(|i| i as i32)
                .unwrap_or(0);
            assert_eq!(current, expected, "wrong slide at {position}");

            previous = current;
            position += 0.25;
        }
        assert_eq!(r.engine.current_slide(), 5);
    }

    #[tokio::test]
    async fn test_skips_are_allowed_regression_is_not() {
        let mut r = rig().await;
        r.engine.start(&r.sync).await;

        // Jump straight past three thresholds.
        r.engine.on_audio_tick(30.0);
        assert_eq!(r.engine.current_slide(), 3);

        // A stale lower position must not rewind.
        r.engine.on_audio_tick(8.0);
        assert_eq!(r.engine.current_slide(), 3);
    }

    #[tokio::test]
    async fn test_closing_media_retires_baseline_actor() {
        let mut r = rig().await;
        r.engine.start(&r.sync).await;
        r.engine.on_audio_tick(59.5);

        assert_eq!(r.bridge.last_for(CLOSING_MEDIA), Some(true));
        assert_eq!(r.bridge.last_for(BASELINE_ACTOR), Some(false));
        // Earlier media stays visible; the deck accumulates.
        assert_eq!(r.bridge.last_for("PRD 4"), None);
    }

    #[tokio::test]
    async fn test_audio_end_on_last_slide_offers_finish() {
        let mut r = rig().await;
        r.engine.start(&r.sync).await;
        r.audio.set_position(59.5);
        r.audio.finish_track();
        r.engine.poll_audio().await;

        assert!(!r.engine.is_running());
        assert_eq!(r.engine.current_slide(), 5);
        assert_eq!(r.view.start_visible(), Some(true));

        r.engine.finish();
        assert_eq!(r.view.end_screens(), 1);
    }

    #[tokio::test]
    async fn test_restart_rewinds_everything() {
        let mut r = rig().await;
        r.engine.start(&r.sync).await;
        r.engine.on_audio_tick(25.0);
        r.engine.restart(&r.sync).await;

        assert_eq!(r.engine.current_slide(), RESTART_SENTINEL);
        assert!(!r.engine.is_running());
        assert!(!r.audio.is_playing());
        assert_eq!(*r.audio.seeks().last().unwrap(), 0.0);
        assert_eq!(r.bridge.last_for(BASELINE_ACTOR), Some(true));
        assert_eq!(r.bridge.last_for(SOUND_ACTOR), Some(false));
        for media in ALL_MEDIA {
            assert_eq!(r.bridge.last_for(media), Some(false));
        }

        let row = r.backend.row("deck_session").await.unwrap();
        assert_eq!(row["current_slide"], -1);
    }

    #[tokio::test]
    async fn test_remote_start_seeks_to_published_position() {
        let mut r = rig().await;
        let row = DeckRow::from_value(&json!({
            "id": "d1", "current_slide": 0, "audio_timestamp": 4.5
        }))
        .unwrap();
        r.engine.apply_remote(&row, &r.sync).await;

        assert_eq!(r.engine.current_slide(), 0);
        assert!(r.audio.is_playing());
        assert_eq!(r.audio.seeks(), vec![4.5]);

        // The guard kept the replay from publishing back.
        let stored = r.backend.row("deck_session").await.unwrap();
        assert_eq!(stored["current_slide"], -1);
    }

    #[tokio::test]
    async fn test_remote_forward_jump_and_ignored_targets() {
        let mut r = rig().await;
        r.engine.start(&r.sync).await;
        r.engine.on_audio_tick(8.0);
        assert_eq!(r.engine.current_slide(), 1);

        let forward = DeckRow::from_value(&json!({
            "id": "d1", "current_slide": 3, "audio_timestamp": 30.0
        }))
        .unwrap();
        r.engine.apply_remote(&forward, &r.sync).await;
        assert_eq!(r.engine.current_slide(), 3);

        // Non-increasing target: ignored, protocol is forward-only.
        let backward = DeckRow::from_value(&json!({
            "id": "d1", "current_slide": 2, "audio_timestamp": 21.0
        }))
        .unwrap();
        r.engine.apply_remote(&backward, &r.sync).await;
        assert_eq!(r.engine.current_slide(), 3);

        // Out-of-range target: ignored.
        let wild = DeckRow::from_value(&json!({
            "id": "d1", "current_slide": 99, "audio_timestamp": 0.0
        }))
        .unwrap();
        r.engine.apply_remote(&wild, &r.sync).await;
        assert_eq!(r.engine.current_slide(), 3);
    }

    #[tokio::test]
    async fn test_remote_restart_sentinel() {
        let mut r = rig().await;
        r.engine.start(&r.sync).await;
        r.engine.on_audio_tick(25.0);

        let row = DeckRow::from_value(&json!({ "id": "d1", "current_slide": -1 })).unwrap();
        r.engine.apply_remote(&row, &r.sync).await;
        assert_eq!(r.engine.current_slide(), RESTART_SENTINEL);
        assert!(!r.engine.is_running());

        // The sentinel with nothing started is a no-op.
        r.engine.apply_remote(&row, &r.sync).await;
        assert_eq!(r.engine.current_slide(), RESTART_SENTINEL);
    }

    #[tokio::test]
    async fn test_play_failure_is_not_fatal() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed("deck_session", json!({ "id": "d1", "current_slide": -1 }))
            .await;
        let sync =
            SessionSync::connect(backend, "deck_session", "viewer-1", WritePolicy::Open).await;

        let view = Arc::new(RecordingDeckView::new());
        let mut engine = DeckEngine::new(
            view.clone(),
            Arc::new(RecordingBridge::new()),
            Arc::new(StubAudio::failing()),
        );
        engine.start(&sync).await;

        // Playback failed but the deck still advanced to slide 0.
        assert_eq!(engine.current_slide(), 0);
        assert!(engine.is_running());
        assert_eq!(view.shown(), vec![0]);
    }
}
