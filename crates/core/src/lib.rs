//! Core library for replaying recorded GPS activities on a map.
//!
//! A loaded [`Route`] can be drawn statically or played back point by point
//! by the [`AnimationEngine`], which retires photo markers as the moving
//! marker passes them. The [`Recorder`] captures composited frames of the map
//! into an encoder. [`Session`] owns all of these and is what front ends
//! drive. Drawing and time are reached through the [`Renderer`] and
//! [`Scheduler`] traits so the whole pipeline runs headless.

pub mod animation;
pub mod config;
pub mod error;
pub mod mapping;
pub mod photo;
pub mod record;
pub mod render;
pub mod route;
pub mod scene;
pub mod session;
pub mod stats;
pub mod timeline;

pub use animation::{AnimationEngine, AnimationOptions, PlaybackContext, PlaybackState, TickOutcome};
pub use config::{AppConfig, SizePreset};
pub use error::{FlyoverError, Result};
pub use mapping::{speed_color, Color, SpeedUnit};
pub use photo::{read_photo_metadata, PhotoMetadata, PhotoQueue};
pub use record::{
    EncoderFactory, EncoderOutput, EncoderStatus, FrameSync, Recorder, RecordingFormat,
    RecordingOptions, RecordingProgress, RecordingStatus, VideoEncoder,
};
pub use render::{CompositeSurface, Raster, RenderGraph, Renderer, Viewport};
pub use route::{
    Coordinate, FitRecordDecoder, JsonRecordDecoder, RecordDecoder, Route, RoutePoint, TrackRecord,
};
pub use scene::DisplayMode;
pub use session::{Session, SessionHandle};
pub use stats::RouteStatistics;
pub use timeline::{Scheduler, TimerHandle, VirtualScheduler};
