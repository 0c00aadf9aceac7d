//! Timed route playback.
//!
//! The engine walks the trimmed point sequence one point per tick, moving the
//! marker, extending the speed-coloured trail and refreshing the overlay. It
//! owns at most one live scheduler timer at any time.

use std::time::Duration;

use crate::{
    config::{AppConfig, DEFAULT_INTERVAL_MS, DEFAULT_TRIM_FRACTION},
    mapping::{speed_color, Color, SpeedUnit},
    photo::{PendingPhoto, PhotoQueue},
    render::{Layer, LayerId, MarkerId, MarkerStyle, PlaybackStatus, Renderer, Segment, Stroke},
    route::{Route, RoutePoint},
    scene::animation_tooltip,
    timeline::{format_elapsed, Scheduler, TimerHandle},
    FlyoverError, Result,
};

const TRACK_STROKE: Stroke = Stroke {
    color: Color::rgb(0x94, 0xa3, 0xb8),
    width: 3.0,
};
const TRAIL_WIDTH: f32 = 5.0;
const MARKER_STYLE: MarkerStyle = MarkerStyle::Circle {
    radius: 8.0,
    fill: Color::rgb(0xef, 0x44, 0x44),
    outline: Color::WHITE,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationOptions {
    pub interval: Duration,
    pub trim_fraction: f64,
    pub follow_marker: bool,
    pub show_tooltips: bool,
    pub speed_unit: SpeedUnit,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            trim_fraction: DEFAULT_TRIM_FRACTION,
            follow_marker: true,
            show_tooltips: true,
            speed_unit: SpeedUnit::Kmh,
        }
    }
}

impl From<&AppConfig> for AnimationOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            interval: config.animation.interval(),
            trim_fraction: config.animation.trim_fraction,
            follow_marker: config.animation.follow_marker,
            show_tooltips: config.animation.show_tooltips,
            speed_unit: config.display.speed_unit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The point at `index` was displayed.
    Advanced {
        index: usize,
        retired_photo: Option<PendingPhoto>,
    },
    /// The cursor had passed the last point; playback was stopped.
    Finished,
    /// No playback session exists.
    Inactive,
}

/// Collaborators the engine drives. Owned by the session, lent per call.
pub struct PlaybackContext<'a> {
    pub renderer: &'a mut dyn Renderer,
    pub scheduler: &'a mut dyn Scheduler,
    pub photos: &'a mut PhotoQueue,
}

/// Drops noisy endpoint samples: `floor(n * fraction)` points from each end,
/// and never fewer than one.
pub fn trim_endpoints(points: &[RoutePoint], fraction: f64) -> &[RoutePoint] {
    let n = points.len();
    let cut = ((n as f64 * fraction).floor() as usize).max(1);
    if n <= 2 * cut {
        return &[];
    }
    &points[cut..n - cut]
}

#[derive(Debug)]
pub struct AnimationEngine {
    options: AnimationOptions,
    points: Vec<RoutePoint>,
    index: usize,
    state: PlaybackState,
    started_at: Duration,
    timer: Option<TimerHandle>,
    marker: Option<MarkerId>,
    track: Option<LayerId>,
    trail: Option<LayerId>,
}

impl AnimationEngine {
    pub fn new(options: AnimationOptions) -> Self {
        Self {
            options,
            points: Vec::new(),
            index: 0,
            state: PlaybackState::Stopped,
            started_at: Duration::ZERO,
            timer: None,
            marker: None,
            track: None,
            trail: None,
        }
    }

    pub fn options(&self) -> &AnimationOptions {
        &self.options
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn interval(&self) -> Duration {
        self.options.interval
    }

    pub fn marker(&self) -> Option<MarkerId> {
        self.marker
    }

    /// Whether `handle` is the engine's live tick timer.
    pub fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.timer == Some(handle)
    }

    /// Point most recently shown by the marker.
    pub fn current_point(&self) -> Option<&RoutePoint> {
        self.marker?;
        self.points.get(self.index.saturating_sub(1))
    }

    /// Derives the playback sequence from `route`. Without a route nothing
    /// changes.
    pub fn prepare(&mut self, route: Option<&Route>) -> Option<&[RoutePoint]> {
        let route = route?;
        self.points = trim_endpoints(route.points(), self.options.trim_fraction).to_vec();
        tracing::info!(
            points = self.points.len(),
            total = route.len(),
            "animation data prepared"
        );
        Some(&self.points)
    }

    /// Starts playback from the first point.
    pub fn start(&mut self, route: Option<&Route>, ctx: &mut PlaybackContext<'_>) -> Result<()> {
        self.begin(route, ctx)?;
        self.install_timer(ctx.scheduler);
        self.state = PlaybackState::Running;
        tracing::info!(interval_ms = self.options.interval.as_millis() as u64, "animation started");
        Ok(())
    }

    /// Continues a paused session without moving the cursor.
    pub fn resume(&mut self, scheduler: &mut dyn Scheduler) -> Result<()> {
        match self.state {
            PlaybackState::Running => Ok(()),
            PlaybackState::Paused => {
                self.install_timer(scheduler);
                self.state = PlaybackState::Running;
                tracing::debug!(index = self.index, "animation resumed");
                Ok(())
            }
            PlaybackState::Stopped => Err(FlyoverError::InvalidState("no paused animation to resume")),
        }
    }

    pub fn pause(&mut self, scheduler: &mut dyn Scheduler) {
        if self.state != PlaybackState::Running {
            return;
        }
        self.cancel_timer(scheduler);
        self.state = PlaybackState::Paused;
        tracing::debug!(index = self.index, "animation paused");
    }

    /// Ends the session: the timer is cancelled before returning, the marker
    /// and status disappear and the cursor goes back to zero. The track and
    /// trail stay visible until the next start or [`Self::clear`].
    pub fn stop(&mut self, ctx: &mut PlaybackContext<'_>) {
        self.cancel_timer(ctx.scheduler);
        if let Some(marker) = self.marker.take() {
            ctx.renderer.remove_marker(marker);
        }
        ctx.renderer.clear_status();
        self.index = 0;
        if self.state != PlaybackState::Stopped {
            tracing::info!("animation stopped");
        }
        self.state = PlaybackState::Stopped;
    }

    pub fn restart(&mut self, route: Option<&Route>, ctx: &mut PlaybackContext<'_>) -> Result<()> {
        self.stop(ctx);
        self.start(route, ctx)
    }

    /// Stops playback and removes every layer the engine drew.
    pub fn clear(&mut self, ctx: &mut PlaybackContext<'_>) {
        self.stop(ctx);
        self.remove_layers(ctx.renderer);
    }

    /// Manual single advance. A stopped engine first opens a paused session
    /// at the first point.
    pub fn step(&mut self, route: Option<&Route>, ctx: &mut PlaybackContext<'_>) -> Result<TickOutcome> {
        match self.state {
            PlaybackState::Running => Err(FlyoverError::InvalidState(
                "stepping is only available while playback is paused",
            )),
            PlaybackState::Paused => Ok(self.tick(ctx)),
            PlaybackState::Stopped => {
                self.begin(route, ctx)?;
                self.state = PlaybackState::Paused;
                Ok(self.tick(ctx))
            }
        }
    }

    /// Changes the tick cadence. A running timer is cancelled before its
    /// replacement is installed, so the old interval never fires again.
    pub fn set_cadence(&mut self, interval_ms: u64, scheduler: &mut dyn Scheduler) -> Result<()> {
        if interval_ms == 0 {
            return Err(FlyoverError::InvalidInput(
                "animation interval must be at least 1 ms".into(),
            ));
        }
        self.options.interval = Duration::from_millis(interval_ms);
        if self.is_running() {
            self.install_timer(scheduler);
        }
        tracing::debug!(interval_ms, "animation cadence changed");
        Ok(())
    }

    pub fn set_follow_marker(&mut self, follow: bool) {
        self.options.follow_marker = follow;
    }

    pub fn set_show_tooltips(&mut self, show: bool, renderer: &mut dyn Renderer) {
        self.options.show_tooltips = show;
        self.refresh_tooltip(renderer);
    }

    pub fn set_speed_unit(&mut self, unit: SpeedUnit, renderer: &mut dyn Renderer) {
        self.options.speed_unit = unit;
        self.refresh_tooltip(renderer);
    }

    /// Advances by one point.
    pub fn tick(&mut self, ctx: &mut PlaybackContext<'_>) -> TickOutcome {
        if self.state == PlaybackState::Stopped {
            return TickOutcome::Inactive;
        }
        if self.index >= self.points.len() {
            self.stop(ctx);
            return TickOutcome::Finished;
        }

        let index = self.index;
        let point = &self.points[index];

        if let Some(marker) = self.marker {
            ctx.renderer.move_marker(marker, point.coordinate);
            if self.options.follow_marker {
                ctx.renderer.center_on(point.coordinate);
            }
        }

        if let (Some(trail), Some(previous)) = (self.trail, index.checked_sub(1)) {
            ctx.renderer.append_segment(
                trail,
                Segment {
                    from: self.points[previous].coordinate,
                    to: point.coordinate,
                    stroke: Stroke {
                        color: speed_color(point.speed.unwrap_or(0.0)),
                        width: TRAIL_WIDTH,
                    },
                },
            );
        }

        let progress = (index + 1) as f64 / self.points.len() as f64 * 100.0;
        let elapsed = ctx.scheduler.now().saturating_sub(self.started_at);
        ctx.renderer.show_status(&PlaybackStatus {
            progress: format!("{progress:.1}%"),
            elapsed: format_elapsed(elapsed),
        });

        let visited = point.timestamp;
        self.index += 1;
        self.refresh_tooltip(ctx.renderer);

        let retired_photo = ctx.photos.correlate(visited, ctx.renderer);
        tracing::trace!(index, "animation tick");
        TickOutcome::Advanced {
            index,
            retired_photo,
        }
    }

    /// Sets up a fresh session at point 0 without installing a timer.
    fn begin(&mut self, route: Option<&Route>, ctx: &mut PlaybackContext<'_>) -> Result<()> {
        let route = route.ok_or(FlyoverError::NoRouteLoaded)?;
        self.prepare(Some(route));
        let first = self
            .points
            .first()
            .map(|p| p.coordinate)
            .ok_or(FlyoverError::EmptyPlaybackSet)?;

        self.stop(ctx);
        self.remove_layers(ctx.renderer);

        self.track = Some(ctx.renderer.add_layer(Layer::Polyline {
            coordinates: self.points.iter().map(|p| p.coordinate).collect(),
            stroke: TRACK_STROKE,
        }));
        self.trail = Some(ctx.renderer.add_layer(Layer::Segments(Vec::new())));
        self.marker = Some(ctx.renderer.place_marker(first, MARKER_STYLE));
        if self.options.follow_marker {
            ctx.renderer.center_on(first);
        }

        self.index = 0;
        self.started_at = ctx.scheduler.now();
        ctx.photos.sort_for_playback();
        Ok(())
    }

    fn install_timer(&mut self, scheduler: &mut dyn Scheduler) {
        self.cancel_timer(scheduler);
        self.timer = Some(scheduler.every(self.options.interval));
    }

    fn cancel_timer(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
    }

    fn remove_layers(&mut self, renderer: &mut dyn Renderer) {
        for layer in [self.track.take(), self.trail.take()].into_iter().flatten() {
            renderer.remove_layer(layer);
        }
    }

    fn refresh_tooltip(&self, renderer: &mut dyn Renderer) {
        let Some(marker) = self.marker else {
            return;
        };
        let tooltip = match (self.options.show_tooltips, self.current_point()) {
            (true, Some(point)) => Some(animation_tooltip(point, self.options.speed_unit)),
            _ => None,
        };
        renderer.set_marker_tooltip(marker, tooltip);
    }
}
