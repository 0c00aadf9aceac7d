//! Single-owner controller tying the route, playback, photos and recording
//! together.
//!
//! Control actions never fail outward: errors are logged and queued as alerts
//! for the operator. [`SessionHandle`] serialises access when commands arrive
//! from another thread than the one driving time.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};

use crate::{
    animation::{AnimationEngine, AnimationOptions, PlaybackContext, PlaybackState, TickOutcome},
    config::AppConfig,
    photo::{PhotoMetadata, PhotoQueue},
    record::{
        EncoderFactory, EncoderOutput, FrameSync, Recorder, RecordingFormat, RecordingOptions,
        RecordingProgress, RecordingStatus,
    },
    render::Renderer,
    route::{RecordDecoder, Route},
    scene::{DisplayMode, Scene, SceneOptions},
    stats::RouteStatistics,
    timeline::{Scheduler, VirtualScheduler},
    FlyoverError, Result,
};

/// Collaborators lent to the engine on every call.
#[derive(Debug)]
struct Stage<R> {
    renderer: R,
    scheduler: VirtualScheduler,
    photos: PhotoQueue,
}

impl<R: Renderer> Stage<R> {
    fn ctx(&mut self) -> PlaybackContext<'_> {
        PlaybackContext {
            renderer: &mut self.renderer,
            scheduler: &mut self.scheduler,
            photos: &mut self.photos,
        }
    }
}

#[derive(Debug)]
pub struct Session<R: Renderer> {
    config: AppConfig,
    stage: Stage<R>,
    route: Option<Arc<Route>>,
    statistics: Option<RouteStatistics>,
    scene: Scene,
    engine: AnimationEngine,
    recorder: Recorder,
    alerts: Vec<FlyoverError>,
}

impl<R: Renderer> Session<R> {
    pub fn new(renderer: R, encoders: Box<dyn EncoderFactory>, config: AppConfig) -> Self {
        let engine = AnimationEngine::new(AnimationOptions::from(&config));
        Self {
            config,
            stage: Stage {
                renderer,
                scheduler: VirtualScheduler::new(),
                photos: PhotoQueue::new(),
            },
            route: None,
            statistics: None,
            scene: Scene::new(),
            engine,
            recorder: Recorder::new(encoders),
            alerts: Vec::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.stage.renderer
    }

    pub fn engine(&self) -> &AnimationEngine {
        &self.engine
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn photos(&self) -> &PhotoQueue {
        &self.stage.photos
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    pub fn statistics(&self) -> Option<&RouteStatistics> {
        self.statistics.as_ref()
    }

    pub fn mode(&self) -> DisplayMode {
        self.scene.mode()
    }

    /// Scheduler clock.
    pub fn now(&self) -> Duration {
        self.stage.scheduler.now()
    }

    /// Drains the alerts raised since the last call.
    pub fn take_alerts(&mut self) -> Vec<FlyoverError> {
        std::mem::take(&mut self.alerts)
    }

    fn alert(&mut self, err: FlyoverError) {
        tracing::warn!(%err, "action failed");
        self.alerts.push(err);
    }

    fn scene_options(&self) -> SceneOptions {
        SceneOptions {
            show_tooltips: self.config.animation.show_tooltips,
            speed_unit: self.config.display.speed_unit,
        }
    }

    /// Replaces the loaded route wholesale.
    pub fn load_route(&mut self, route: Route) {
        self.engine.clear(&mut self.stage.ctx());
        self.end_tick_locked_recording();

        let statistics = RouteStatistics::compute(&route);
        tracing::info!(
            points = statistics.total_points,
            distance_m = statistics.total_distance_m,
            "route loaded"
        );
        self.statistics = Some(statistics);
        self.route = Some(Arc::new(route));

        let mode = match self.scene.mode() {
            DisplayMode::Animated => DisplayMode::Route,
            mode => mode,
        };
        self.show_mode(mode);
        self.fit_to_route();
    }

    pub fn load_route_bytes(&mut self, decoder: &dyn RecordDecoder, bytes: &[u8]) {
        match decoder.decode_route(bytes) {
            Ok(route) => self.load_route(route),
            Err(err) => self.alert(err),
        }
    }

    /// Replaces the photo markers. Returns how many photos had a position.
    pub fn load_photos(&mut self, photos: &[PhotoMetadata], now: DateTime<Utc>) -> usize {
        let stage = &mut self.stage;
        stage.photos.clear(&mut stage.renderer);
        for located in photos.iter().filter_map(|meta| meta.locate(now)) {
            let pending = located.place(&mut stage.renderer);
            stage.photos.push(pending);
        }
        tracing::info!(placed = stage.photos.len(), total = photos.len(), "photos loaded");
        stage.photos.len()
    }

    /// Switches the map representation. Leaving the animated mode stops
    /// playback.
    pub fn show_mode(&mut self, mode: DisplayMode) {
        if mode == DisplayMode::Animated {
            self.start_animation();
            return;
        }
        self.engine.clear(&mut self.stage.ctx());
        self.end_tick_locked_recording();
        let options = self.scene_options();
        self.scene
            .show(mode, self.route.as_deref(), &mut self.stage.renderer, options);
    }

    pub fn fit_to_route(&mut self) {
        if let Some(route) = &self.route {
            self.stage.renderer.fit_bounds(&route.coordinates());
        }
    }

    pub fn start_animation(&mut self) {
        self.scene.clear(&mut self.stage.renderer);
        match self.engine.start(self.route.as_deref(), &mut self.stage.ctx()) {
            Ok(()) => self.scene.set_animated(),
            Err(err) => self.alert(err),
        }
    }

    /// Play/pause button: pauses a running animation, resumes a paused one
    /// and otherwise starts from the beginning.
    pub fn play_pause(&mut self) {
        match self.engine.state() {
            PlaybackState::Running => self.engine.pause(&mut self.stage.scheduler),
            PlaybackState::Paused => {
                if let Err(err) = self.engine.resume(&mut self.stage.scheduler) {
                    self.alert(err);
                }
            }
            PlaybackState::Stopped => self.start_animation(),
        }
    }

    /// Pausing keeps a tick-locked recording open; frames resume with the
    /// next tick or step.
    pub fn pause_animation(&mut self) {
        self.engine.pause(&mut self.stage.scheduler);
    }

    /// Ends playback. The track stays drawn and the map returns to the route
    /// mode. A tick-locked recording is finalised with the frames it has.
    pub fn stop_animation(&mut self) {
        self.engine.stop(&mut self.stage.ctx());
        self.scene.leave_animated();
        self.end_tick_locked_recording();
    }

    fn end_tick_locked_recording(&mut self) {
        if !self.recorder.is_recording() || self.recorder.sync() != Some(FrameSync::AnimationTick) {
            return;
        }
        tracing::info!(
            frames = self.recorder.frame_count(),
            "playback halted, finalising recording"
        );
        if let Err(err) = self.recorder.stop(&mut self.stage.scheduler) {
            self.alert(err);
        }
    }

    pub fn restart_animation(&mut self) {
        self.scene.clear(&mut self.stage.renderer);
        match self.engine.restart(self.route.as_deref(), &mut self.stage.ctx()) {
            Ok(()) => self.scene.set_animated(),
            Err(err) => self.alert(err),
        }
    }

    pub fn step_animation(&mut self) {
        if self.engine.state() == PlaybackState::Stopped {
            self.scene.clear(&mut self.stage.renderer);
        }
        match self.engine.step(self.route.as_deref(), &mut self.stage.ctx()) {
            Ok(outcome) => {
                self.scene.set_animated();
                self.after_tick(outcome);
            }
            Err(err) => self.alert(err),
        }
    }

    pub fn set_cadence(&mut self, interval_ms: u64) {
        match self.engine.set_cadence(interval_ms, &mut self.stage.scheduler) {
            Ok(()) => self.config.animation.interval_ms = interval_ms,
            Err(err) => self.alert(err),
        }
    }

    pub fn set_follow_marker(&mut self, follow: bool) {
        self.config.animation.follow_marker = follow;
        self.engine.set_follow_marker(follow);
    }

    pub fn toggle_tooltips(&mut self) {
        let show = !self.config.animation.show_tooltips;
        self.config.animation.show_tooltips = show;
        self.engine.set_show_tooltips(show, &mut self.stage.renderer);
        self.redraw_static_mode();
    }

    pub fn toggle_speed_unit(&mut self) {
        let unit = self.config.display.speed_unit.toggled();
        self.config.display.speed_unit = unit;
        self.engine.set_speed_unit(unit, &mut self.stage.renderer);
        self.redraw_static_mode();
    }

    /// Lines for the information panel in the current speed unit.
    pub fn info_panel(&self) -> Vec<String> {
        self.statistics
            .as_ref()
            .map(|stats| stats.summary_lines(self.config.display.speed_unit))
            .unwrap_or_default()
    }

    fn redraw_static_mode(&mut self) {
        let mode = self.scene.mode();
        if matches!(mode, DisplayMode::Points | DisplayMode::Heatmap) {
            let options = self.scene_options();
            self.scene
                .show(mode, self.route.as_deref(), &mut self.stage.renderer, options);
        }
    }

    /// Changes the defaults used by the next recording.
    pub fn set_recording_options(
        &mut self,
        duration_secs: Option<f64>,
        frame_rate: Option<u32>,
        format: Option<RecordingFormat>,
    ) {
        let mut recording = self.config.recording.clone();
        if let Some(duration) = duration_secs {
            recording.duration_secs = duration;
        }
        if let Some(rate) = frame_rate {
            recording.frame_rate = rate;
        }
        if let Some(format) = format {
            recording.format = format;
        }
        match recording.validate() {
            Ok(()) => self.config.recording = recording,
            Err(err) => self.alert(err),
        }
    }

    /// Record button.
    pub fn toggle_recording(&mut self) -> RecordingStatus {
        let result = if self.recorder.is_recording() {
            self.recorder.stop(&mut self.stage.scheduler).map(|_| ())
        } else {
            RecordingOptions::from_config(
                &self.config.recording,
                format!("map-recording-{}", Utc::now().timestamp_millis()),
            )
            .and_then(|options| {
                self.recorder
                    .start(options, &self.stage.renderer, &mut self.stage.scheduler)
            })
        };
        if let Err(err) = result {
            self.alert(err);
        }
        self.recorder.status()
    }

    pub fn stop_recording(&mut self) -> Option<EncoderOutput> {
        match self.recorder.stop(&mut self.stage.scheduler) {
            Ok(output) => Some(output),
            Err(err) => {
                self.alert(err);
                None
            }
        }
    }

    /// Records a full play-through from the first point.
    pub fn record_animation_sequence(&mut self, sync: FrameSync) -> Option<RecordingOptions> {
        match self.try_record_animation_sequence(sync) {
            Ok(options) => Some(options),
            Err(err) => {
                self.alert(err);
                None
            }
        }
    }

    fn try_record_animation_sequence(&mut self, sync: FrameSync) -> Result<RecordingOptions> {
        let route = self.route.clone().ok_or(FlyoverError::NoRouteLoaded)?;
        let points = self.engine.prepare(Some(&*route)).map_or(0, <[_]>::len);
        if points == 0 {
            return Err(FlyoverError::EmptyPlaybackSet);
        }

        let interval = self.engine.interval();
        let (duration, frame_rate) = match sync {
            FrameSync::DisplayRefresh => (
                RecordingOptions::animation_duration(points, interval)?,
                self.config.recording.frame_rate,
            ),
            FrameSync::AnimationTick => {
                let rate = (1000.0 / interval.as_millis().max(1) as f64).round().max(1.0) as u32;
                let secs = points as f64 / f64::from(rate);
                let duration = Duration::try_from_secs_f64(secs).map_err(|err| {
                    FlyoverError::InvalidInput(format!("recording of {points} frames: {err}"))
                })?;
                (duration, rate)
            }
        };
        let options = RecordingOptions {
            name: format!("animation-{}", Utc::now().timestamp_millis()),
            duration,
            frame_rate,
            format: self.config.recording.format,
            sync,
        };

        self.recorder
            .start(options.clone(), &self.stage.renderer, &mut self.stage.scheduler)?;

        self.scene.clear(&mut self.stage.renderer);
        if let Err(err) = self.engine.restart(Some(&*route), &mut self.stage.ctx()) {
            if let Err(stop_err) = self.recorder.stop(&mut self.stage.scheduler) {
                tracing::debug!(%stop_err, "recording cleanup failed");
            }
            return Err(err);
        }
        self.scene.set_animated();
        tracing::info!(
            points,
            duration_secs = duration.as_secs_f64(),
            "recording animation sequence"
        );
        Ok(options)
    }

    /// Moves the scheduler clock forward, delivering every due timer in order.
    pub fn advance(&mut self, elapsed: Duration) {
        let deadline = self.stage.scheduler.now() + elapsed;
        while let Some(handle) = self.stage.scheduler.poll_until(deadline) {
            if self.engine.owns_timer(handle) {
                let outcome = self.engine.tick(&mut self.stage.ctx());
                self.after_tick(outcome);
            } else if !self.recorder.on_timer(handle) {
                tracing::trace!(?handle, "stale timer fired");
            }
        }
    }

    /// Display refresh: feeds refresh-paced recordings one frame.
    pub fn on_display_refresh(&mut self) -> Option<RecordingProgress> {
        match self
            .recorder
            .on_display_refresh(&self.stage.renderer, &mut self.stage.scheduler)
        {
            Ok(progress) => progress,
            Err(err) => {
                self.alert(err);
                None
            }
        }
    }

    /// Drives the session for `total` time, refreshing the display every
    /// `refresh` period.
    pub fn drive(&mut self, total: Duration, refresh: Duration) {
        let refresh = refresh.max(Duration::from_millis(1));
        let mut remaining = total;
        while !remaining.is_zero() {
            let step = remaining.min(refresh);
            self.advance(step);
            self.on_display_refresh();
            remaining -= step;
        }
    }

    /// Whether anything still needs time to pass.
    pub fn is_busy(&self) -> bool {
        self.engine.is_running() || self.recorder.is_recording()
    }

    fn after_tick(&mut self, outcome: TickOutcome) {
        let result = match outcome {
            TickOutcome::Advanced { .. } => self
                .recorder
                .on_animation_tick(&self.stage.renderer, &mut self.stage.scheduler)
                .map(|_| ()),
            TickOutcome::Finished => {
                tracing::info!("animation finished");
                self.scene.leave_animated();
                if self.recorder.is_recording()
                    && self.recorder.sync() == Some(FrameSync::AnimationTick)
                {
                    self.recorder.stop(&mut self.stage.scheduler).map(|_| ())
                } else {
                    Ok(())
                }
            }
            TickOutcome::Inactive => Ok(()),
        };
        if let Err(err) = result {
            self.alert(err);
        }
    }
}

/// Thread-safe view over a [`Session`].
pub struct SessionHandle<R: Renderer> {
    shared: Arc<Mutex<Session<R>>>,
}

impl<R: Renderer> Clone for SessionHandle<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R: Renderer> SessionHandle<R> {
    pub fn new(session: Session<R>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(session)),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Session<R>>> {
        self.shared
            .lock()
            .map_err(|_| FlyoverError::msg("session state has been poisoned"))
    }

    /// Runs `f` with exclusive access. Ticks and commands never interleave.
    pub fn with<T>(&self, f: impl FnOnce(&mut Session<R>) -> T) -> Result<T> {
        let mut session = self.lock()?;
        Ok(f(&mut session))
    }
}

impl<R: Renderer> std::fmt::Debug for SessionHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").finish()
    }
}
