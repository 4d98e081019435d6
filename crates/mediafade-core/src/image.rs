//! Fade-in image loading
//!
//! `FadeImage` owns the load/fade state machine for one image source:
//!
//! ```text
//!   Idle ──source──▶ Loading ──threshold elapsed──▶ LoadingSlow
//!                       │                               │
//!                       └────────probe done─────────────┴──▶ Loaded
//! ```
//!
//! The image element is only rendered once the current source has loaded, so
//! the fade applies exactly once, at insertion. `should_fade` is only raised
//! when the threshold expires before the load does; fast loads appear
//! without a visible fade.

use crate::{
    cell::Current,
    element::ElementRef,
    probe::MediaProbe,
    timer::{Scheduler, TaskGroup, TimerSlot},
    types::{seconds, Attributes, InstanceId, MediaSource, TimingFunction},
    Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Configuration for a [`FadeImage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeImageOptions {
    /// Image to load; `None` renders nothing
    pub source: Option<MediaSource>,
    /// How long a load may take before it is faded in (seconds)
    pub fade_threshold_secs: f64,
    /// Length of the fade (seconds)
    pub fade_duration_secs: f64,
    /// Timing function of the fade
    pub timing_function: TimingFunction,
    /// Forwarded to the image element untouched
    pub attributes: Attributes,
}

impl Default for FadeImageOptions {
    fn default() -> Self {
        Self {
            source: None,
            fade_threshold_secs: 0.35,
            fade_duration_secs: 0.25,
            timing_function: TimingFunction::EaseOut,
            attributes: Attributes::default(),
        }
    }
}

impl FadeImageOptions {
    pub fn with_source(mut self, source: impl Into<MediaSource>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_threshold(mut self, secs: f64) -> Self {
        self.fade_threshold_secs = secs;
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.fade_duration_secs = secs;
        self
    }

    pub fn with_timing_function(mut self, timing_function: TimingFunction) -> Self {
        self.timing_function = timing_function;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    pub fn threshold(&self) -> Result<Duration> {
        seconds("fade_threshold_secs", self.fade_threshold_secs)
    }

    pub fn fade_duration(&self) -> Result<Duration> {
        seconds("fade_duration_secs", self.fade_duration_secs)
    }

    pub fn validate(&self) -> Result<()> {
        self.threshold()?;
        self.fade_duration()?;
        Ok(())
    }

    /// Parse and validate options from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Load state of the current source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadState {
    /// The source this state describes
    pub source: Option<MediaSource>,
    pub loaded: bool,
    /// Raised once the threshold expired before `loaded`
    pub should_fade: bool,
}

impl LoadState {
    fn for_source(source: Option<MediaSource>) -> Self {
        Self {
            source,
            loaded: false,
            should_fade: false,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        match (&self.source, self.loaded, self.should_fade) {
            (None, _, _) => LoadPhase::Idle,
            (Some(_), true, _) => LoadPhase::Loaded,
            (Some(_), false, true) => LoadPhase::LoadingSlow,
            (Some(_), false, false) => LoadPhase::Loading,
        }
    }
}

/// Coarse phase of the load/fade machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadPhase {
    Idle,
    Loading,
    LoadingSlow,
    Loaded,
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadPhase::Idle => write!(f, "idle"),
            LoadPhase::Loading => write!(f, "loading"),
            LoadPhase::LoadingSlow => write!(f, "loading-slow"),
            LoadPhase::Loaded => write!(f, "loaded"),
        }
    }
}

/// Fade parameters handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FadeTransition {
    pub duration: Duration,
    pub timing_function: TimingFunction,
}

/// What the renderer should draw for a [`FadeImage`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FadeImageView {
    pub source: Option<MediaSource>,
    /// Instantiate the image element
    pub render_image: bool,
    pub loaded: bool,
    /// Apply the slow-load fade treatment
    pub fading: bool,
    pub transition: FadeTransition,
    pub attributes: Attributes,
}

/// Fade-in image loader
pub struct FadeImage {
    id: InstanceId,
    state: Arc<Current<LoadState>>,
    threshold: Current<Duration>,
    transition: FadeTransition,
    attributes: Attributes,
    probe: Arc<dyn MediaProbe>,
    element: ElementRef,
    threshold_timer: TimerSlot,
    probes: TaskGroup,
}

impl FadeImage {
    /// Create an image on the current runtime and start loading its source
    pub fn new(options: FadeImageOptions, probe: Arc<dyn MediaProbe>) -> Result<Self> {
        Self::with_scheduler(options, probe, Scheduler::current()?)
    }

    pub fn with_scheduler(
        options: FadeImageOptions,
        probe: Arc<dyn MediaProbe>,
        scheduler: Scheduler,
    ) -> Result<Self> {
        let threshold = options.threshold()?;
        let duration = options.fade_duration()?;

        let mut image = Self {
            id: InstanceId::new(),
            state: Arc::new(Current::new(LoadState::default())),
            threshold: Current::new(threshold),
            transition: FadeTransition {
                duration,
                timing_function: options.timing_function,
            },
            attributes: options.attributes,
            probe,
            element: ElementRef::new(),
            threshold_timer: TimerSlot::new("fade-threshold", scheduler.clone()),
            probes: TaskGroup::new(scheduler),
        };

        if options.source.is_some() {
            image.restart(options.source);
        }
        Ok(image)
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Request a new source
    ///
    /// Returns false when `source` is already the current one. Otherwise the
    /// state resets, the pending threshold timer is cancelled and the machine
    /// starts over for the new source.
    pub fn set_source(&mut self, source: Option<MediaSource>) -> bool {
        if self.state.with(|s| s.source == source) {
            return false;
        }
        self.restart(source);
        true
    }

    fn restart(&mut self, source: Option<MediaSource>) {
        self.threshold_timer.cancel();
        self.probes.abort_all();
        self.state.set(LoadState::for_source(source.clone()));
        if self.element.detach().is_some() {
            trace!(instance = %self.id, "Image element detached");
        }

        let Some(source) = source else {
            debug!(instance = %self.id, "Image source cleared");
            return;
        };
        debug!(instance = %self.id, source = %source, "Loading image");

        let id = self.id;
        let state = Arc::clone(&self.state);
        let pending = source.clone();
        self.threshold_timer.schedule(self.threshold.get(), move || {
            let slowed = state.update_if(|s| {
                if s.source.as_ref() != Some(&pending) || s.loaded || s.should_fade {
                    return false;
                }
                s.should_fade = true;
                true
            });
            if slowed {
                debug!(instance = %id, source = %pending, "Load exceeded threshold");
            }
        });

        let state = Arc::clone(&self.state);
        let probe = Arc::clone(&self.probe);
        self.probes.spawn(async move {
            match probe.probe(&source).await {
                Ok(()) => {
                    let accepted = state.update_if(|s| {
                        if s.source.as_ref() != Some(&source) || s.loaded {
                            return false;
                        }
                        s.loaded = true;
                        true
                    });
                    if accepted {
                        debug!(instance = %id, source = %source, "Image loaded");
                    } else {
                        trace!(instance = %id, source = %source, "Discarding stale probe result");
                    }
                }
                Err(e) => {
                    debug!(
                        instance = %id,
                        source = %source,
                        code = e.error_code(),
                        error = %e,
                        "Probe failed"
                    );
                }
            }
        });
    }

    /// Threshold used by the next load; a load already in progress keeps its timer
    pub fn set_threshold(&self, secs: f64) -> Result<()> {
        self.threshold.set(seconds("fade_threshold_secs", secs)?);
        Ok(())
    }

    pub fn set_fade_duration(&mut self, secs: f64) -> Result<()> {
        self.transition.duration = seconds("fade_duration_secs", secs)?;
        Ok(())
    }

    pub fn set_timing_function(&mut self, timing_function: TimingFunction) {
        self.transition.timing_function = timing_function;
    }

    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    pub fn source(&self) -> Option<MediaSource> {
        self.state.with(|s| s.source.clone())
    }

    pub fn state(&self) -> LoadState {
        self.state.get()
    }

    pub fn phase(&self) -> LoadPhase {
        self.state.with(LoadState::phase)
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    /// Handle to the live image element
    pub fn element(&self) -> ElementRef {
        self.element.clone()
    }

    pub fn view(&self) -> FadeImageView {
        let state = self.state.get();
        FadeImageView {
            render_image: state.loaded,
            loaded: state.loaded,
            fading: state.should_fade,
            source: state.source,
            transition: self.transition.clone(),
            attributes: self.attributes.clone(),
        }
    }

    /// Cancel pending work and release the element
    pub fn unmount(&mut self) {
        self.threshold_timer.cancel();
        self.probes.abort_all();
        self.element.detach();
        trace!(instance = %self.id, "Image unmounted");
    }
}

impl Drop for FadeImage {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::element::MediaElement;
    use crate::probe::{ProbeScript, SimulatedProbe};

    struct ImageElement;
    impl MediaElement for ImageElement {}

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn image(probe: SimulatedProbe, source: Option<&str>) -> FadeImage {
        let mut options = FadeImageOptions::default();
        options.source = source.map(MediaSource::from);
        FadeImage::new(options, Arc::new(probe)).unwrap()
    }

    #[test]
    fn test_options_defaults() {
        let options = FadeImageOptions::default();
        assert_eq!(options.fade_threshold_secs, 0.35);
        assert_eq!(options.fade_duration_secs, 0.25);
        assert_eq!(options.timing_function, TimingFunction::EaseOut);
        assert!(options.source.is_none());
    }

    #[test]
    fn test_options_json() {
        let options = FadeImageOptions::from_json(
            r#"{"source": "a.jpg", "fade_threshold_secs": 1.5, "attributes": {"alt": "A"}}"#,
        )
        .unwrap();
        assert_eq!(options.source, Some(MediaSource::from("a.jpg")));
        assert_eq!(options.fade_threshold_secs, 1.5);
        assert_eq!(options.fade_duration_secs, 0.25);
        assert_eq!(options.attributes.get("alt"), Some("A"));

        let json = options.to_json().unwrap();
        assert!(json.contains("\"timing_function\": \"ease-out\""));

        assert!(FadeImageOptions::from_json(r#"{"fade_threshold_secs": -1}"#).is_err());
        assert!(matches!(
            FadeImageOptions::from_json(r#"{"fade_threshold_secs": 1e300}"#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_requires_runtime() {
        let probe = Arc::new(SimulatedProbe::new(ms(10)));
        assert!(FadeImage::new(FadeImageOptions::default(), probe).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_load_never_fades() {
        let probe = SimulatedProbe::new(ms(100));
        let image = image(probe, Some("a.jpg"));
        assert_eq!(image.phase(), LoadPhase::Loading);
        assert!(!image.view().render_image);

        tokio::time::sleep(ms(150)).await;
        assert_eq!(image.phase(), LoadPhase::Loaded);

        tokio::time::sleep(ms(500)).await;
        let state = image.state();
        assert!(state.loaded);
        assert!(!state.should_fade);
        assert!(image.view().render_image);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_load_fades_then_loads() {
        let probe = SimulatedProbe::new(ms(1000));
        let image = image(probe, Some("b.jpg"));

        tokio::time::sleep(ms(400)).await;
        assert_eq!(image.phase(), LoadPhase::LoadingSlow);
        assert!(image.view().fading);
        assert!(!image.view().render_image);

        tokio::time::sleep(ms(700)).await;
        let state = image.state();
        assert!(state.loaded);
        assert!(state.should_fade);
        assert_eq!(image.phase(), LoadPhase::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_change_rejects_stale_probe() {
        let probe = SimulatedProbe::new(ms(50))
            .script("old.jpg", ProbeScript::LoadAfter(ms(100)))
            .script("new.jpg", ProbeScript::LoadAfter(ms(1000)));
        let mut image = image(probe, Some("old.jpg"));

        tokio::time::sleep(ms(20)).await;
        assert!(image.set_source(Some("new.jpg".into())));

        tokio::time::sleep(ms(200)).await;
        let state = image.state();
        assert_eq!(state.source, Some(MediaSource::from("new.jpg")));
        assert!(!state.loaded);
    }

    struct CountingProbe {
        finished: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl MediaProbe for CountingProbe {
        async fn probe(&self, _source: &MediaSource) -> Result<()> {
            tokio::time::sleep(ms(100)).await;
            self.finished.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_change_aborts_superseded_load() {
        let finished = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let probe = Arc::new(CountingProbe {
            finished: Arc::clone(&finished),
        });
        let mut options = FadeImageOptions::default();
        options.source = Some("old.jpg".into());
        let mut image = FadeImage::new(options, probe).unwrap();

        tokio::time::sleep(ms(20)).await;
        assert!(image.set_source(Some("new.jpg".into())));

        tokio::time::sleep(ms(500)).await;
        assert_eq!(finished.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(image.state().loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_source_does_not_restart() {
        let probe = Arc::new(SimulatedProbe::new(ms(100)));
        let options = FadeImageOptions::default().with_source("a.jpg");
        let mut image = FadeImage::new(options, Arc::clone(&probe) as Arc<dyn MediaProbe>).unwrap();

        tokio::time::sleep(ms(150)).await;
        assert!(!image.set_source(Some("a.jpg".into())));
        assert!(image.state().loaded);
        assert_eq!(probe.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_source_resets_and_idles() {
        let probe = SimulatedProbe::new(ms(100));
        let mut image = image(probe, Some("a.jpg"));
        image.element().attach(Arc::new(ImageElement));

        tokio::time::sleep(ms(150)).await;
        assert!(image.set_source(None));
        assert_eq!(image.phase(), LoadPhase::Idle);
        assert!(!image.element().is_attached());

        tokio::time::sleep(ms(1000)).await;
        assert_eq!(image.state(), LoadState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_stays_loading() {
        let probe = SimulatedProbe::new(ms(100))
            .script("broken.jpg", ProbeScript::FailAfter(ms(50)));
        let image = image(probe, Some("broken.jpg"));

        tokio::time::sleep(ms(2000)).await;
        assert_eq!(image.phase(), LoadPhase::LoadingSlow);
        assert!(!image.view().render_image);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_threshold_timer() {
        let probe = SimulatedProbe::new(ms(100)).script("stuck.jpg", ProbeScript::Never);
        let mut image = image(probe, Some("stuck.jpg"));

        tokio::time::sleep(ms(100)).await;
        image.unmount();

        tokio::time::sleep(ms(1000)).await;
        assert!(!image.state().should_fade);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_change_applies_to_next_source() {
        let probe = SimulatedProbe::new(ms(100)).script("stuck.jpg", ProbeScript::Never);
        let mut image = image(probe, Some("a.jpg"));
        image.set_threshold(2.0).unwrap();
        assert!(image.set_threshold(-0.5).is_err());

        image.set_source(Some("stuck.jpg".into()));
        tokio::time::sleep(ms(1000)).await;
        assert_eq!(image.phase(), LoadPhase::Loading);

        tokio::time::sleep(ms(1100)).await;
        assert_eq!(image.phase(), LoadPhase::LoadingSlow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_observes_load() {
        let probe = SimulatedProbe::new(ms(100));
        let image = image(probe, Some("a.jpg"));
        let mut rx = image.subscribe();

        let state = rx.wait_for(|s| s.loaded).await.unwrap().clone();
        assert_eq!(state.source, Some(MediaSource::from("a.jpg")));
        assert!(!state.should_fade);
    }
}
