//! Frame capture into an external video encoder.
//!
//! A recording walks `idle → recording → processing → completed | error`.
//! Completed reverts to idle after [`COMPLETED_DISPLAY_DELAY`]; error stays
//! until the operator starts another recording.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    config::RecordingConfig,
    render::{CompositeSurface, Raster, Renderer},
    timeline::{Scheduler, TimerHandle},
    FlyoverError, Result,
};

pub const COMPLETED_DISPLAY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingFormat {
    #[default]
    Mp4,
    Webm,
    Mkv,
    Gif,
    /// Plain numbered image sequence.
    Png,
}

impl RecordingFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RecordingFormat::Mp4 => "mp4",
            RecordingFormat::Webm => "webm",
            RecordingFormat::Mkv => "mkv",
            RecordingFormat::Gif => "gif",
            RecordingFormat::Png => "png",
        }
    }
}

impl std::str::FromStr for RecordingFormat {
    type Err = FlyoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" => Ok(RecordingFormat::Mp4),
            "webm" => Ok(RecordingFormat::Webm),
            "mkv" => Ok(RecordingFormat::Mkv),
            "gif" => Ok(RecordingFormat::Gif),
            "png" => Ok(RecordingFormat::Png),
            other => Err(FlyoverError::InvalidInput(format!(
                "unsupported recording format `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Idle,
    Recording,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordingStatus::Idle => "idle",
            RecordingStatus::Recording => "recording",
            RecordingStatus::Processing => "processing",
            RecordingStatus::Completed => "completed",
            RecordingStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// What paces frame capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameSync {
    /// One frame per display refresh until the encoder's budget is spent.
    #[default]
    DisplayRefresh,
    /// One frame per animation tick; the recording ends with playback.
    AnimationTick,
}

/// Parameters fixed for the lifetime of one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingOptions {
    pub name: String,
    pub duration: Duration,
    pub frame_rate: u32,
    pub format: RecordingFormat,
    pub sync: FrameSync,
}

impl RecordingOptions {
    /// Options for a manual recording. Fails on durations that do not fit a
    /// [`Duration`] or exceed the configured bounds.
    pub fn from_config(config: &RecordingConfig, name: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let duration = Duration::try_from_secs_f64(config.duration_secs).map_err(|err| {
            FlyoverError::InvalidInput(format!(
                "recording duration {}: {err}",
                config.duration_secs
            ))
        })?;
        Ok(Self {
            name: name.into(),
            duration,
            frame_rate: config.frame_rate,
            format: config.format,
            sync: FrameSync::DisplayRefresh,
        })
    }

    /// Nominal length of a full play-through: one tick per point.
    pub fn animation_duration(points: usize, interval: Duration) -> Result<Duration> {
        u32::try_from(points)
            .ok()
            .and_then(|points| interval.checked_mul(points))
            .ok_or_else(|| {
                FlyoverError::InvalidInput(format!(
                    "{points} points at {interval:?} exceed the maximum recording length"
                ))
            })
    }

    /// Number of frames the encoder expects.
    pub fn frame_budget(&self) -> u64 {
        (self.duration.as_secs_f64() * f64::from(self.frame_rate)).round() as u64
    }

    fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(FlyoverError::InvalidInput("frame rate must be positive".into()));
        }
        if self.duration.is_zero() {
            return Err(FlyoverError::InvalidInput(
                "recording duration must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStatus {
    Recording,
    Finished,
}

/// What the encoder produced once finalised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderOutput {
    pub frames: u64,
    pub location: Option<String>,
}

/// External video encoder session.
pub trait VideoEncoder: Send {
    fn start(&mut self) -> Result<()>;

    /// Submits the next frame.
    fn step(&mut self, frame: &Raster) -> Result<EncoderStatus>;

    /// Flushes and finalises the output.
    fn stop(&mut self) -> Result<EncoderOutput>;

    /// Releases resources. Called after `stop`, successful or not.
    fn dispose(&mut self) {}
}

pub trait EncoderFactory: Send {
    fn create(
        &mut self,
        options: &RecordingOptions,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn VideoEncoder>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingProgress {
    pub frame_count: u64,
    pub total_frames: u64,
    pub percent: f64,
    pub remaining_secs: f64,
}

impl fmt::Display for RecordingProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} frames | {:.1}s remaining",
            self.frame_count, self.total_frames, self.remaining_secs
        )
    }
}

struct ActiveRecording {
    options: RecordingOptions,
    encoder: Box<dyn VideoEncoder>,
    surface: CompositeSurface,
    frame_count: u64,
}

impl ActiveRecording {
    fn progress(&self) -> RecordingProgress {
        let total_frames = self.options.frame_budget();
        let percent = if total_frames > 0 {
            self.frame_count as f64 / total_frames as f64 * 100.0
        } else {
            0.0
        };
        let remaining_frames = total_frames.saturating_sub(self.frame_count);
        RecordingProgress {
            frame_count: self.frame_count,
            total_frames,
            percent,
            remaining_secs: remaining_frames as f64 / f64::from(self.options.frame_rate.max(1)),
        }
    }
}

/// Recording workflow around a pluggable encoder.
pub struct Recorder {
    factory: Box<dyn EncoderFactory>,
    status: RecordingStatus,
    active: Option<ActiveRecording>,
    revert_timer: Option<TimerHandle>,
    last_output: Option<EncoderOutput>,
    last_error: Option<String>,
}

impl Recorder {
    pub fn new(factory: Box<dyn EncoderFactory>) -> Self {
        Self {
            factory,
            status: RecordingStatus::Idle,
            active: None,
            revert_timer: None,
            last_output: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    pub fn is_recording(&self) -> bool {
        self.status == RecordingStatus::Recording
    }

    pub fn sync(&self) -> Option<FrameSync> {
        self.active.as_ref().map(|active| active.options.sync)
    }

    pub fn frame_count(&self) -> u64 {
        self.active.as_ref().map_or(0, |active| active.frame_count)
    }

    pub fn progress(&self) -> Option<RecordingProgress> {
        self.active.as_ref().map(ActiveRecording::progress)
    }

    pub fn last_output(&self) -> Option<&EncoderOutput> {
        self.last_output.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.revert_timer == Some(handle)
    }

    /// Opens the encoder and arms frame capture. Frames are pulled by
    /// [`Self::on_display_refresh`] or [`Self::on_animation_tick`].
    pub fn start(
        &mut self,
        options: RecordingOptions,
        renderer: &dyn Renderer,
        scheduler: &mut dyn Scheduler,
    ) -> Result<()> {
        if matches!(
            self.status,
            RecordingStatus::Recording | RecordingStatus::Processing
        ) {
            return Err(FlyoverError::RecordingInProgress);
        }
        options.validate()?;

        if let Some(timer) = self.revert_timer.take() {
            scheduler.cancel(timer);
        }
        self.last_error = None;
        self.last_output = None;
        self.status = RecordingStatus::Recording;

        let surface = CompositeSurface::for_viewport(renderer.viewport());
        let (width, height) = (surface.raster().width(), surface.raster().height());

        let mut encoder = match self.factory.create(&options, width, height) {
            Ok(encoder) => encoder,
            Err(err) => return Err(self.fail(FlyoverError::EncoderInit(err.to_string()))),
        };
        if let Err(err) = encoder.start() {
            encoder.dispose();
            return Err(self.fail(FlyoverError::EncoderInit(err.to_string())));
        }

        tracing::info!(
            name = %options.name,
            width,
            height,
            frame_rate = options.frame_rate,
            duration_secs = options.duration.as_secs_f64(),
            format = options.format.extension(),
            sync = ?options.sync,
            "recording started"
        );
        self.active = Some(ActiveRecording {
            options,
            encoder,
            surface,
            frame_count: 0,
        });
        Ok(())
    }

    /// Display-refresh hook. Captures one frame for refresh-paced recordings.
    pub fn on_display_refresh(
        &mut self,
        renderer: &dyn Renderer,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Option<RecordingProgress>> {
        if self.sync() != Some(FrameSync::DisplayRefresh) || !self.is_recording() {
            return Ok(None);
        }
        self.capture_frame(renderer, scheduler)
    }

    /// Animation-tick hook. Captures one frame for tick-locked recordings.
    pub fn on_animation_tick(
        &mut self,
        renderer: &dyn Renderer,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Option<RecordingProgress>> {
        if self.sync() != Some(FrameSync::AnimationTick) || !self.is_recording() {
            return Ok(None);
        }
        self.capture_frame(renderer, scheduler)
    }

    /// Finalises the encoder and moves to completed, or to error when the
    /// encoder cannot flush its output.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) -> Result<EncoderOutput> {
        let Some(mut active) = self.active.take() else {
            return Err(FlyoverError::InvalidState("no recording in progress"));
        };
        self.status = RecordingStatus::Processing;

        let result = active.encoder.stop();
        active.encoder.dispose();
        match result {
            Ok(output) => {
                tracing::info!(
                    frames = active.frame_count,
                    location = output.location.as_deref().unwrap_or("-"),
                    "recording completed"
                );
                self.status = RecordingStatus::Completed;
                self.revert_timer = Some(scheduler.after(COMPLETED_DISPLAY_DELAY));
                self.last_output = Some(output.clone());
                Ok(output)
            }
            Err(err) => Err(self.fail(FlyoverError::EncoderFinalize(err.to_string()))),
        }
    }

    /// Record button behaviour: stops an active recording, otherwise starts
    /// one with `options`.
    pub fn toggle(
        &mut self,
        options: RecordingOptions,
        renderer: &dyn Renderer,
        scheduler: &mut dyn Scheduler,
    ) -> Result<RecordingStatus> {
        if self.is_recording() {
            self.stop(scheduler)?;
        } else {
            self.start(options, renderer, scheduler)?;
        }
        Ok(self.status)
    }

    /// Delivers a fired timer. Returns `true` when the timer belonged here.
    pub fn on_timer(&mut self, handle: TimerHandle) -> bool {
        if !self.owns_timer(handle) {
            return false;
        }
        self.revert_timer = None;
        if self.status == RecordingStatus::Completed {
            self.status = RecordingStatus::Idle;
        }
        true
    }

    fn capture_frame(
        &mut self,
        renderer: &dyn Renderer,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Option<RecordingProgress>> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };

        let stepped = renderer
            .capture(&mut active.surface)
            .and_then(|()| active.encoder.step(active.surface.raster()));
        let encoder_status = match stepped {
            Ok(status) => status,
            Err(err) => {
                self.abort();
                return Err(self.fail(FlyoverError::EncoderStep(err.to_string())));
            }
        };

        active.frame_count += 1;
        let progress = active.progress();
        tracing::debug!(frame = progress.frame_count, total = progress.total_frames, "frame captured");

        if encoder_status == EncoderStatus::Finished {
            self.stop(scheduler)?;
        }
        Ok(Some(progress))
    }

    /// Best-effort flush after a failed step so no encoder session leaks.
    fn abort(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Err(err) = active.encoder.stop() {
                tracing::debug!(%err, "encoder flush after failure also failed");
            }
            active.encoder.dispose();
        }
    }

    fn fail(&mut self, err: FlyoverError) -> FlyoverError {
        tracing::error!(%err, "recording failed");
        self.status = RecordingStatus::Error;
        self.last_error = Some(err.to_string());
        err
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("status", &self.status)
            .field("frame_count", &self.frame_count())
            .field("revert_timer", &self.revert_timer)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        render::{RenderGraph, Viewport},
        timeline::VirtualScheduler,
    };

    /// Shared log of what the test encoder saw.
    #[derive(Debug, Default)]
    pub(crate) struct EncoderLog {
        pub created: Vec<(RecordingOptions, u32, u32)>,
        pub frames: u64,
        pub stopped: u32,
        pub disposed: u32,
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub(crate) enum Failure {
        #[default]
        None,
        Create,
        Start,
        StepAt(u64),
        Stop,
    }

    /// Encoder double that finishes once the frame budget is reached.
    pub(crate) struct TestEncoderFactory {
        pub log: Arc<Mutex<EncoderLog>>,
        pub failure: Failure,
    }

    impl TestEncoderFactory {
        pub(crate) fn new(failure: Failure) -> (Self, Arc<Mutex<EncoderLog>>) {
            let log = Arc::new(Mutex::new(EncoderLog::default()));
            (
                Self {
                    log: log.clone(),
                    failure,
                },
                log,
            )
        }
    }

    struct TestEncoder {
        log: Arc<Mutex<EncoderLog>>,
        failure: Failure,
        budget: u64,
        frames: u64,
    }

    impl EncoderFactory for TestEncoderFactory {
        fn create(
            &mut self,
            options: &RecordingOptions,
            width: u32,
            height: u32,
        ) -> Result<Box<dyn VideoEncoder>> {
            if let Failure::Create = self.failure {
                return Err(FlyoverError::msg("no codec"));
            }
            self.log
                .lock()
                .unwrap()
                .created
                .push((options.clone(), width, height));
            Ok(Box::new(TestEncoder {
                log: self.log.clone(),
                failure: self.failure,
                budget: options.frame_budget(),
                frames: 0,
            }))
        }
    }

    impl VideoEncoder for TestEncoder {
        fn start(&mut self) -> Result<()> {
            match self.failure {
                Failure::Start => Err(FlyoverError::msg("device busy")),
                _ => Ok(()),
            }
        }

        fn step(&mut self, frame: &Raster) -> Result<EncoderStatus> {
            assert!(frame.width() > 0);
            if let Failure::StepAt(n) = self.failure {
                if self.frames == n {
                    return Err(FlyoverError::msg("write failed"));
                }
            }
            self.frames += 1;
            self.log.lock().unwrap().frames += 1;
            Ok(if self.frames >= self.budget {
                EncoderStatus::Finished
            } else {
                EncoderStatus::Recording
            })
        }

        fn stop(&mut self) -> Result<EncoderOutput> {
            self.log.lock().unwrap().stopped += 1;
            match self.failure {
                Failure::Stop => Err(FlyoverError::msg("mux failed")),
                _ => Ok(EncoderOutput {
                    frames: self.frames,
                    location: Some("memory".into()),
                }),
            }
        }

        fn dispose(&mut self) {
            self.log.lock().unwrap().disposed += 1;
        }
    }

    fn renderer() -> RenderGraph {
        RenderGraph::new(Viewport {
            width: 64,
            height: 48,
            device_pixel_ratio: 2.0,
        })
    }

    fn options(duration_ms: u64, frame_rate: u32) -> RecordingOptions {
        RecordingOptions {
            name: "test".into(),
            duration: Duration::from_millis(duration_ms),
            frame_rate,
            format: RecordingFormat::Mp4,
            sync: FrameSync::DisplayRefresh,
        }
    }

    #[test]
    fn animation_duration_and_budget() {
        let duration =
            RecordingOptions::animation_duration(1000, Duration::from_millis(100)).unwrap();
        assert_eq!(duration, Duration::from_secs(100));
        assert!(RecordingOptions::animation_duration(10, Duration::MAX).is_err());
        let opts = RecordingOptions {
            duration,
            ..options(1, 30)
        };
        assert_eq!(opts.frame_budget(), 100 * 30);
    }

    #[test]
    fn options_from_config_reject_oversized_durations() {
        let mut config = RecordingConfig::default();
        let opts = RecordingOptions::from_config(&config, "clip").unwrap();
        assert_eq!(opts.duration, Duration::from_secs(10));
        assert_eq!(opts.sync, FrameSync::DisplayRefresh);

        config.duration_secs = 1e300;
        assert!(matches!(
            RecordingOptions::from_config(&config, "clip"),
            Err(FlyoverError::InvalidInput(_))
        ));
        config.duration_secs = f64::NAN;
        assert!(RecordingOptions::from_config(&config, "clip").is_err());
    }

    #[test]
    fn records_until_encoder_finishes() {
        let (factory, log) = TestEncoderFactory::new(Failure::None);
        let mut recorder = Recorder::new(Box::new(factory));
        let renderer = renderer();
        let mut scheduler = VirtualScheduler::new();

        recorder.start(options(100, 30), &renderer, &mut scheduler).unwrap();
        assert_eq!(recorder.status(), RecordingStatus::Recording);

        let mut refreshes = 0;
        while recorder.is_recording() {
            recorder.on_display_refresh(&renderer, &mut scheduler).unwrap();
            refreshes += 1;
        }
        assert_eq!(refreshes, 3);
        assert_eq!(recorder.status(), RecordingStatus::Completed);
        assert_eq!(recorder.last_output().unwrap().frames, 3);

        let log = log.lock().unwrap();
        assert_eq!(log.created[0].1, 128);
        assert_eq!(log.created[0].2, 96);
        assert_eq!((log.stopped, log.disposed), (1, 1));
    }

    #[test]
    fn completed_reverts_to_idle_after_delay() {
        let (factory, _log) = TestEncoderFactory::new(Failure::None);
        let mut recorder = Recorder::new(Box::new(factory));
        let renderer = renderer();
        let mut scheduler = VirtualScheduler::new();

        recorder.start(options(1000, 30), &renderer, &mut scheduler).unwrap();
        recorder.stop(&mut scheduler).unwrap();
        assert_eq!(recorder.status(), RecordingStatus::Completed);

        assert_eq!(scheduler.poll_until(Duration::from_millis(2999)), None);
        let fired = scheduler.poll_until(COMPLETED_DISPLAY_DELAY).unwrap();
        assert!(recorder.on_timer(fired));
        assert_eq!(recorder.status(), RecordingStatus::Idle);
    }

    #[test]
    fn rejects_second_start_while_recording() {
        let (factory, log) = TestEncoderFactory::new(Failure::None);
        let mut recorder = Recorder::new(Box::new(factory));
        let renderer = renderer();
        let mut scheduler = VirtualScheduler::new();

        recorder.start(options(1000, 30), &renderer, &mut scheduler).unwrap();
        let err = recorder
            .start(options(1000, 30), &renderer, &mut scheduler)
            .unwrap_err();
        assert!(matches!(err, FlyoverError::RecordingInProgress));
        assert_eq!(log.lock().unwrap().created.len(), 1);

        // The record button toggles instead of queueing.
        let status = recorder
            .toggle(options(1000, 30), &renderer, &mut scheduler)
            .unwrap();
        assert_eq!(status, RecordingStatus::Completed);
    }

    #[test]
    fn init_failures_end_in_error() {
        for failure in [Failure::Create, Failure::Start] {
            let (factory, log) = TestEncoderFactory::new(failure);
            let mut recorder = Recorder::new(Box::new(factory));
            let mut scheduler = VirtualScheduler::new();

            let err = recorder
                .start(options(1000, 30), &renderer(), &mut scheduler)
                .unwrap_err();
            assert!(matches!(err, FlyoverError::EncoderInit(_)));
            assert_eq!(recorder.status(), RecordingStatus::Error);
            assert!(recorder.last_error().is_some());
            if let Failure::Start = failure {
                assert_eq!(log.lock().unwrap().disposed, 1);
            }
        }
    }

    #[test]
    fn step_failure_flushes_encoder_and_persists_error() {
        let (factory, log) = TestEncoderFactory::new(Failure::StepAt(2));
        let mut recorder = Recorder::new(Box::new(factory));
        let renderer = renderer();
        let mut scheduler = VirtualScheduler::new();

        recorder.start(options(1000, 30), &renderer, &mut scheduler).unwrap();
        recorder.on_display_refresh(&renderer, &mut scheduler).unwrap();
        recorder.on_display_refresh(&renderer, &mut scheduler).unwrap();
        let err = recorder
            .on_display_refresh(&renderer, &mut scheduler)
            .unwrap_err();
        assert!(matches!(err, FlyoverError::EncoderStep(_)));
        assert_eq!(recorder.status(), RecordingStatus::Error);
        {
            let log = log.lock().unwrap();
            assert_eq!((log.frames, log.stopped, log.disposed), (2, 1, 1));
        }

        // Error does not revert by itself.
        assert_eq!(scheduler.poll_until(Duration::from_secs(60)), None);
        assert_eq!(recorder.status(), RecordingStatus::Error);
        assert!(recorder.on_display_refresh(&renderer, &mut scheduler).unwrap().is_none());
    }

    #[test]
    fn finalize_failure_is_reported() {
        let (factory, log) = TestEncoderFactory::new(Failure::Stop);
        let mut recorder = Recorder::new(Box::new(factory));
        let mut scheduler = VirtualScheduler::new();

        recorder.start(options(1000, 30), &renderer(), &mut scheduler).unwrap();
        let err = recorder.stop(&mut scheduler).unwrap_err();
        assert!(matches!(err, FlyoverError::EncoderFinalize(_)));
        assert_eq!(recorder.status(), RecordingStatus::Error);
        assert_eq!(log.lock().unwrap().disposed, 1);
    }

    #[test]
    fn tick_locked_recordings_ignore_display_refresh() {
        let (factory, log) = TestEncoderFactory::new(Failure::None);
        let mut recorder = Recorder::new(Box::new(factory));
        let renderer = renderer();
        let mut scheduler = VirtualScheduler::new();

        let opts = RecordingOptions {
            sync: FrameSync::AnimationTick,
            ..options(1000, 10)
        };
        recorder.start(opts, &renderer, &mut scheduler).unwrap();
        assert!(recorder.on_display_refresh(&renderer, &mut scheduler).unwrap().is_none());
        let progress = recorder
            .on_animation_tick(&renderer, &mut scheduler)
            .unwrap()
            .unwrap();
        assert_eq!(progress.to_string(), "1/10 frames | 0.9s remaining");
        assert_eq!(log.lock().unwrap().frames, 1);
    }

    #[test]
    fn rejects_invalid_options() {
        let (factory, _log) = TestEncoderFactory::new(Failure::None);
        let mut recorder = Recorder::new(Box::new(factory));
        let mut scheduler = VirtualScheduler::new();
        let err = recorder
            .start(options(1000, 0), &renderer(), &mut scheduler)
            .unwrap_err();
        assert!(matches!(err, FlyoverError::InvalidInput(_)));
        assert_eq!(recorder.status(), RecordingStatus::Idle);
    }
}
