//! Transition-aware video playback
//!
//! `VideoPlayer` composes a [`FadeImage`] poster with a live video element.
//! Caller intents (pause, mount, muted, source) and native media events
//! arrive independently; the player reconciles them into a [`PlaybackState`]
//! and decides when the video surface may be revealed over the poster.
//!
//! Browsers fire `play` before a freshly loaded element can render frames.
//! The reveal guard (`loaded_once`) defers revealing a new element until its
//! first `canplay`; after that, play/pause cycles reveal immediately.

use crate::{
    cell::Current,
    element::{ElementRef, MediaElement},
    events::{MediaEvent, MediaEventHandlers},
    image::{FadeImage, FadeImageOptions, FadeImageView},
    probe::MediaProbe,
    timer::{Scheduler, TimerSlot},
    transition::{MountState, MountTransition},
    types::{Attributes, InstanceId, MediaSource},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for a [`VideoPlayer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    pub source: Option<MediaSource>,
    pub poster_source: Option<MediaSource>,
    /// Keep playback paused; the element stays mounted
    pub pause: bool,
    /// Keep the video element in the tree
    pub mount: bool,
    pub muted: bool,
    /// Display options for the poster image; its `source` is replaced by
    /// `poster_source`
    pub poster: FadeImageOptions,
    /// Hold the poster back this long before showing it (ms)
    pub poster_delay_ms: u64,
    /// How long the video stays mounted while fading out (ms)
    pub exit_transition_ms: u64,
    /// Forwarded to the video element untouched
    pub attributes: Attributes,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            source: None,
            poster_source: None,
            pause: false,
            mount: true,
            muted: false,
            poster: FadeImageOptions::default(),
            poster_delay_ms: 0,
            exit_transition_ms: 250,
            attributes: Attributes::default(),
        }
    }
}

impl VideoOptions {
    pub fn with_source(mut self, source: impl Into<MediaSource>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_poster(mut self, source: impl Into<MediaSource>) -> Self {
        self.poster_source = Some(source.into());
        self
    }

    pub fn paused(mut self, pause: bool) -> Self {
        self.pause = pause;
        self
    }

    pub fn mounted(mut self, mount: bool) -> Self {
        self.mount = mount;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_poster_delay(mut self, delay: Duration) -> Self {
        self.poster_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    pub fn exit_transition(&self) -> Duration {
        Duration::from_millis(self.exit_transition_ms)
    }

    pub fn poster_delay(&self) -> Duration {
        Duration::from_millis(self.poster_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.poster.validate()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Playback flags reflecting native media events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    /// The video surface may be shown over the poster
    pub is_showing_video: bool,
    pub started: bool,
    pub playing: bool,
    pub paused: bool,
    pub ended: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_showing_video: false,
            started: false,
            playing: false,
            paused: true,
            ended: false,
        }
    }
}

impl PlaybackState {
    /// State after `ended`, independent of what came before
    pub fn ended() -> Self {
        Self {
            is_showing_video: false,
            started: false,
            playing: false,
            paused: true,
            ended: true,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        if self.ended {
            PlaybackPhase::Ended
        } else if !self.started {
            PlaybackPhase::NotStarted
        } else if self.playing {
            PlaybackPhase::Playing
        } else {
            PlaybackPhase::Paused
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackPhase {
    NotStarted,
    Playing,
    Paused,
    Ended,
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::NotStarted => write!(f, "not-started"),
            PlaybackPhase::Playing => write!(f, "playing"),
            PlaybackPhase::Paused => write!(f, "paused"),
            PlaybackPhase::Ended => write!(f, "ended"),
        }
    }
}

/// What the renderer should draw for a [`VideoPlayer`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoView {
    pub source: Option<MediaSource>,
    pub muted: bool,
    /// Keep the video element in the tree
    pub mount_video: bool,
    /// Apply the active (entered) styling to the video element
    pub active: bool,
    pub playback: PlaybackState,
    pub show_poster: bool,
    pub poster: FadeImageView,
    pub attributes: Attributes,
}

/// State read by asynchronous continuations (transition callbacks, timers)
struct VideoShared {
    id: InstanceId,
    source: Current<Option<MediaSource>>,
    play_intended: Current<bool>,
    mount_intended: Current<bool>,
    muted: Current<bool>,
    playback: Current<PlaybackState>,
    loaded_once: Current<bool>,
    show_poster: Current<bool>,
    element: ElementRef,
}

impl VideoShared {
    fn start_playback(&self) {
        self.request("play", |element| element.play());
    }

    fn pause_playback(&self) {
        self.request("pause", |element| element.pause());
    }

    /// Forward a request to the attached element; missing elements and
    /// unsupported capabilities turn the request into a no-op
    fn request(&self, request: &'static str, op: impl FnOnce(&dyn MediaElement) -> Result<()>) {
        let Some(element) = self.element.get() else {
            trace!(instance = %self.id, request, "No video element attached");
            return;
        };
        match op(element.as_ref()) {
            Ok(()) => trace!(instance = %self.id, request, "Request sent to video element"),
            Err(e) => debug!(instance = %self.id, request, error = %e, "Request ignored"),
        }
    }

    fn release_element(&self) {
        if self.element.detach().is_some() {
            debug!(instance = %self.id, "Video element released");
        }
        self.loaded_once.set(false);
    }
}

/// Video player with a fading poster
pub struct VideoPlayer {
    shared: Arc<VideoShared>,
    attributes: Attributes,
    poster: FadeImage,
    transition: MountTransition,
    poster_timer: TimerSlot,
    handlers: MediaEventHandlers,
}

impl VideoPlayer {
    /// Create a player on the current runtime
    pub fn new(options: VideoOptions, probe: Arc<dyn MediaProbe>) -> Result<Self> {
        Self::with_scheduler(options, probe, Scheduler::current()?)
    }

    pub fn with_scheduler(
        options: VideoOptions,
        probe: Arc<dyn MediaProbe>,
        scheduler: Scheduler,
    ) -> Result<Self> {
        options.validate()?;

        let shared = Arc::new(VideoShared {
            id: InstanceId::new(),
            source: Current::new(options.source.clone()),
            play_intended: Current::new(!options.pause),
            mount_intended: Current::new(options.mount),
            muted: Current::new(options.muted),
            playback: Current::new(PlaybackState::default()),
            loaded_once: Current::new(false),
            show_poster: Current::new(options.poster_delay_ms == 0),
            element: ElementRef::new(),
        });

        let mut poster_options = options.poster.clone();
        poster_options.source = options.poster_source.clone();
        let poster = FadeImage::with_scheduler(poster_options, probe, scheduler.clone())?;

        let entering = Arc::clone(&shared);
        let exited = Arc::clone(&shared);
        let transition = MountTransition::new(options.mount, options.exit_transition(), scheduler.clone())
            .on_entering(move || {
                if entering.play_intended.get() {
                    entering.start_playback();
                }
            })
            .on_exited(move || exited.release_element());

        let mut poster_timer = TimerSlot::new("poster-delay", scheduler);
        if options.poster_delay_ms > 0 {
            let delayed = Arc::clone(&shared);
            poster_timer.schedule(options.poster_delay(), move || {
                if !delayed.show_poster.set(true) {
                    debug!(instance = %delayed.id, "Poster shown after delay");
                }
            });
        }

        info!(
            instance = %shared.id,
            source = ?options.source,
            pause = options.pause,
            mount = options.mount,
            "Video player created"
        );

        Ok(Self {
            shared,
            attributes: options.attributes,
            poster,
            transition,
            poster_timer,
            handlers: MediaEventHandlers::default(),
        })
    }

    pub fn with_handlers(mut self, handlers: MediaEventHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn set_handlers(&mut self, handlers: MediaEventHandlers) {
        self.handlers = handlers;
    }

    pub fn id(&self) -> InstanceId {
        self.shared.id
    }

    // ------------------------------------------------------------------
    // Element lifecycle
    // ------------------------------------------------------------------

    /// Attach the live video element the renderer just inserted
    ///
    /// A new element has never reached a playable state, so the reveal guard
    /// starts cleared.
    pub fn attach_video(&self, element: Arc<dyn MediaElement>) -> Result<()> {
        if !self.transition.state().should_mount {
            return Err(Error::NotMounted);
        }
        self.shared.element.attach(element);
        self.shared.loaded_once.set(false);
        debug!(instance = %self.shared.id, "Video element attached");
        Ok(())
    }

    pub fn detach_video(&self) -> Option<Arc<dyn MediaElement>> {
        let element = self.shared.element.detach();
        self.shared.loaded_once.set(false);
        element
    }

    /// Handle to the live video element, for imperative control
    pub fn element(&self) -> ElementRef {
        self.shared.element.clone()
    }

    // ------------------------------------------------------------------
    // Caller intents
    // ------------------------------------------------------------------

    /// Change the video source
    ///
    /// The element reloads, so playback state goes back to its initial value
    /// and the new media must reach `canplay` before it is revealed.
    pub fn set_source(&self, source: Option<MediaSource>) -> bool {
        if self.shared.source.change(source).is_none() {
            return false;
        }
        self.shared.playback.set(PlaybackState::default());
        self.shared.loaded_once.set(false);
        debug!(instance = %self.shared.id, source = ?self.shared.source.get(), "Video source changed");
        true
    }

    pub fn set_poster(&mut self, source: Option<MediaSource>) -> bool {
        self.poster.set_source(source)
    }

    pub fn set_pause(&self, pause: bool) {
        if self.shared.play_intended.change(!pause).is_none() {
            return;
        }
        debug!(instance = %self.shared.id, pause, "Pause intent changed");
        if pause {
            self.shared.pause_playback();
        } else {
            self.shared.start_playback();
        }
    }

    /// Change mount intent
    ///
    /// Unmounting pauses playback immediately; the element itself stays in
    /// the tree until the exit transition has run.
    pub fn set_mount(&mut self, mount: bool) {
        let Some(change) = self.shared.mount_intended.change(mount) else {
            return;
        };
        debug!(instance = %self.shared.id, mount, "Mount intent changed");
        if change.fell() {
            self.shared.pause_playback();
        }
        self.transition.set_should_be_mounted(mount);
    }

    /// Muting is applied as volume, 0 or 1
    pub fn set_muted(&self, muted: bool) {
        if self.shared.muted.change(muted).is_none() {
            return;
        }
        let volume = if muted { 0.0 } else { 1.0 };
        self.shared
            .request("set_volume", |element| element.set_volume(volume));
    }

    // ------------------------------------------------------------------
    // Native events
    // ------------------------------------------------------------------

    /// React to a native media event, then run the caller's handler for it
    pub fn handle_event(&self, event: MediaEvent) {
        let shared = &self.shared;
        match event {
            MediaEvent::Play => {
                let reveal = shared.loaded_once.get();
                shared.playback.update(|s| {
                    s.is_showing_video = reveal;
                    s.started = true;
                    s.playing = true;
                    s.paused = false;
                    s.ended = false;
                });
                if !reveal {
                    trace!(instance = %shared.id, "Play before first canplay; reveal deferred");
                }
            }
            MediaEvent::Pause => {
                shared.playback.update(|s| {
                    s.playing = false;
                    s.paused = true;
                });
            }
            MediaEvent::Ended => {
                shared.playback.set(PlaybackState::ended());
                shared.show_poster.set(true);
            }
            MediaEvent::CanPlay => {
                let first = !shared.loaded_once.get();
                if first && shared.play_intended.get() && shared.mount_intended.get() {
                    shared.start_playback();
                    shared.playback.update(|s| {
                        s.is_showing_video = true;
                        s.ended = false;
                    });
                    debug!(instance = %shared.id, "First canplay; video revealed");
                }
                shared.loaded_once.set(true);
            }
        }
        trace!(
            instance = %shared.id,
            %event,
            phase = %shared.playback.with(PlaybackState::phase),
            "Media event handled"
        );
        self.handlers.dispatch(event);
    }

    pub fn on_play(&self) {
        self.handle_event(MediaEvent::Play);
    }

    pub fn on_pause(&self) {
        self.handle_event(MediaEvent::Pause);
    }

    pub fn on_ended(&self) {
        self.handle_event(MediaEvent::Ended);
    }

    pub fn on_can_play(&self) {
        self.handle_event(MediaEvent::CanPlay);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn playback(&self) -> PlaybackState {
        self.shared.playback.get()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.shared.playback.with(PlaybackState::phase)
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.playback.subscribe()
    }

    /// Whether the attached element has reached a playable state
    pub fn loaded_once(&self) -> bool {
        self.shared.loaded_once.get()
    }

    pub fn mount_state(&self) -> MountState {
        self.transition.state()
    }

    /// How long the element stays mounted after mount intent is dropped
    pub fn exit_transition(&self) -> Duration {
        self.transition.duration()
    }

    pub fn poster(&self) -> &FadeImage {
        &self.poster
    }

    pub fn poster_mut(&mut self) -> &mut FadeImage {
        &mut self.poster
    }

    pub fn view(&self) -> VideoView {
        let mount = self.transition.state();
        VideoView {
            source: self.shared.source.get(),
            muted: self.shared.muted.get(),
            mount_video: mount.should_mount,
            active: mount.active,
            playback: self.shared.playback.get(),
            show_poster: self.shared.show_poster.get(),
            poster: self.poster.view(),
            attributes: self.attributes.clone(),
        }
    }

    /// Cancel pending timers and release both elements
    pub fn unmount(&mut self) {
        self.poster_timer.cancel();
        self.poster.unmount();
        self.shared.release_element();
        trace!(instance = %self.shared.id, "Video player unmounted");
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::SimulatedProbe;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play,
        Pause,
        Volume(f64),
    }

    #[derive(Default)]
    struct RecordingVideo {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingVideo {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MediaElement for RecordingVideo {
        fn play(&self) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Play);
            Ok(())
        }

        fn pause(&self) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Pause);
            Ok(())
        }

        fn set_volume(&self, volume: f64) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Volume(volume));
            Ok(())
        }
    }

    /// An element without playback support, as in headless harnesses
    struct StubVideo;
    impl MediaElement for StubVideo {}

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn player(options: VideoOptions) -> (VideoPlayer, Arc<RecordingVideo>) {
        let probe = Arc::new(SimulatedProbe::new(ms(100)));
        let player = VideoPlayer::new(options.with_source("clip.mp4"), probe).unwrap();
        let video = Arc::new(RecordingVideo::default());
        player.attach_video(video.clone()).unwrap();
        (player, video)
    }

    #[test]
    fn test_options_defaults() {
        let options = VideoOptions::default();
        assert!(!options.pause);
        assert!(options.mount);
        assert!(!options.muted);
        assert_eq!(options.exit_transition(), ms(250));
        assert_eq!(options.poster_delay(), Duration::ZERO);
    }

    #[test]
    fn test_options_json() {
        let options = VideoOptions::from_json(
            r#"{"source": "clip.mp4", "pause": true, "poster": {"fade_duration_secs": 0.5}}"#,
        )
        .unwrap();
        assert!(options.pause);
        assert!(options.mount);
        assert_eq!(options.poster.fade_duration_secs, 0.5);
        assert_eq!(options.poster.fade_threshold_secs, 0.35);

        assert!(VideoOptions::from_json(r#"{"poster": {"fade_duration_secs": -2}}"#).is_err());
        assert!(VideoOptions::from_json("not json").is_err());
    }

    #[test]
    fn test_playback_phase() {
        assert_eq!(PlaybackState::default().phase(), PlaybackPhase::NotStarted);
        assert_eq!(PlaybackState::ended().phase(), PlaybackPhase::Ended);
        assert_eq!(PlaybackPhase::Paused.to_string(), "paused");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_play_waits_for_can_play() {
        let (player, video) = player(VideoOptions::default());

        player.on_play();
        assert!(player.playback().playing);
        assert!(!player.playback().is_showing_video);

        player.on_can_play();
        assert!(player.playback().is_showing_video);
        assert!(player.loaded_once());
        assert_eq!(video.calls(), vec![Call::Play]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_plays_reveal_immediately() {
        let (player, video) = player(VideoOptions::default());
        player.on_can_play();

        player.on_pause();
        assert_eq!(player.phase(), PlaybackPhase::Paused);
        player.on_play();
        assert!(player.playback().is_showing_video);

        // A repeated canplay does not request playback again
        player.on_can_play();
        assert_eq!(video.calls(), vec![Call::Play]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_can_play_without_play_intent() {
        let (player, video) = player(VideoOptions::default().paused(true));

        player.on_can_play();
        assert!(player.loaded_once());
        assert!(!player.playback().is_showing_video);
        assert!(video.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_resets_state() {
        let (player, _video) = player(VideoOptions::default());
        player.on_can_play();
        player.on_play();

        player.on_ended();
        assert_eq!(player.playback(), PlaybackState::ended());
        assert!(player.view().show_poster);

        player.on_play();
        let state = player.playback();
        assert!(state.playing);
        assert!(!state.ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_intent() {
        let (player, video) = player(VideoOptions::default());

        player.set_pause(true);
        player.set_pause(true);
        player.set_pause(false);
        assert_eq!(video.calls(), vec![Call::Pause, Call::Play]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_muted_sets_volume() {
        let (player, video) = player(VideoOptions::default());

        player.set_muted(true);
        player.set_muted(false);
        player.set_muted(false);
        assert_eq!(video.calls(), vec![Call::Volume(0.0), Call::Volume(1.0)]);
        assert!(!player.view().muted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_pauses_before_exit() {
        let (mut player, video) = player(VideoOptions::default());
        player.on_can_play();
        player.on_play();

        player.set_mount(false);
        assert_eq!(video.calls(), vec![Call::Play, Call::Pause]);
        let view = player.view();
        assert!(view.mount_video);
        assert!(!view.active);

        tokio::time::sleep(ms(200)).await;
        assert!(player.view().mount_video);

        tokio::time::sleep(ms(100)).await;
        assert!(!player.view().mount_video);
        assert!(!player.element().is_attached());
        assert!(!player.loaded_once());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remount_during_exit_resumes() {
        let (mut player, video) = player(VideoOptions::default());
        player.on_can_play();

        player.set_mount(false);
        tokio::time::sleep(ms(100)).await;
        player.set_mount(true);

        assert_eq!(video.calls(), vec![Call::Play, Call::Pause, Call::Play]);
        tokio::time::sleep(ms(500)).await;
        assert!(player.view().mount_video);
        assert!(player.element().is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_requires_mount() {
        let probe = Arc::new(SimulatedProbe::new(ms(100)));
        let player = VideoPlayer::new(VideoOptions::default().mounted(false), probe).unwrap();
        let err = player.attach_video(Arc::new(StubVideo)).unwrap_err();
        assert!(matches!(err, Error::NotMounted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_element_degrades_to_noop() {
        let probe = Arc::new(SimulatedProbe::new(ms(100)));
        let mut player = VideoPlayer::new(VideoOptions::default(), probe).unwrap();
        player.attach_video(Arc::new(StubVideo)).unwrap();

        player.on_can_play();
        player.set_pause(true);
        player.set_muted(true);
        player.set_mount(false);

        assert!(player.playback().is_showing_video);
        assert!(player.loaded_once());
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_change_resets_playback() {
        let (player, _video) = player(VideoOptions::default());
        player.on_can_play();
        player.on_play();

        assert!(!player.set_source(Some("clip.mp4".into())));
        assert!(player.set_source(Some("next.mp4".into())));
        assert_eq!(player.playback(), PlaybackState::default());
        assert!(!player.loaded_once());

        player.on_play();
        assert!(!player.playback().is_showing_video);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poster_delay() {
        let probe = Arc::new(SimulatedProbe::new(ms(100)));
        let player = VideoPlayer::new(
            VideoOptions::default()
                .with_poster("poster.jpg")
                .with_poster_delay(ms(500)),
            probe,
        )
        .unwrap();
        assert!(!player.view().show_poster);

        tokio::time::sleep(ms(200)).await;
        let view = player.view();
        assert!(!view.show_poster);
        assert!(view.poster.loaded);

        tokio::time::sleep(ms(400)).await;
        assert!(player.view().show_poster);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handlers_run_after_internal_reaction() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let handlers = MediaEventHandlers::new()
            .on_play({
                let log = Arc::clone(&log);
                move |event| log.lock().unwrap().push(event)
            })
            .on_can_play(move |event| log.lock().unwrap().push(event));

        let (player, _video) = player(VideoOptions::default());
        let player = player.with_handlers(handlers);

        player.on_play();
        player.on_pause();
        player.on_can_play();
        assert_eq!(*seen.lock().unwrap(), vec![MediaEvent::Play, MediaEvent::CanPlay]);
    }
}
