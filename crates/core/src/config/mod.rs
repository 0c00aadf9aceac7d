use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{mapping::SpeedUnit, record::RecordingFormat, FlyoverError, Result};

/// Fraction of points dropped from each end of a route before playback.
pub const DEFAULT_TRIM_FRACTION: f64 = 0.01;

/// Default delay between two animation ticks.
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Longest recording accepted, in seconds.
pub const MAX_RECORDING_SECS: f64 = 86_400.0;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub animation: AnimationConfig,
    pub display: DisplayConfig,
    pub recording: RecordingConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections and fields fall back
    /// to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(?path, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.animation.interval_ms == 0 {
            return Err(FlyoverError::InvalidInput(
                "animation interval must be at least 1 ms".into(),
            ));
        }
        if !(0.0..0.5).contains(&self.animation.trim_fraction) {
            return Err(FlyoverError::InvalidInput(format!(
                "trim fraction {} must be within [0, 0.5)",
                self.animation.trim_fraction
            )));
        }
        self.recording.validate()?;
        if self.display.device_pixel_ratio <= 0.0 {
            return Err(FlyoverError::InvalidInput(
                "device pixel ratio must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Playback behaviour of the animation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub interval_ms: u64,
    pub trim_fraction: f64,
    pub follow_marker: bool,
    pub show_tooltips: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            trim_fraction: DEFAULT_TRIM_FRACTION,
            follow_marker: true,
            show_tooltips: true,
        }
    }
}

impl AnimationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub speed_unit: SpeedUnit,
    pub size_preset: SizePreset,
    pub device_pixel_ratio: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            speed_unit: SpeedUnit::Kmh,
            size_preset: SizePreset::Fullscreen,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Named map sizes matching the common video targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizePreset {
    Fullscreen,
    Youtube,
    InstagramSquare,
    InstagramStory,
    Tiktok,
    Twitter,
    Facebook,
    Custom { width: u32, height: u32 },
}

impl SizePreset {
    /// Logical size in CSS pixels. Fullscreen has no intrinsic size and uses
    /// the supplied screen dimensions.
    pub fn dimensions(&self, screen: (u32, u32)) -> (u32, u32) {
        match *self {
            SizePreset::Fullscreen => screen,
            SizePreset::Youtube => (1280, 720),
            SizePreset::InstagramSquare => (600, 600),
            SizePreset::InstagramStory | SizePreset::Tiktok => (405, 720),
            SizePreset::Twitter => (800, 450),
            SizePreset::Facebook => (1200, 630),
            SizePreset::Custom { width, height } => (width, height),
        }
    }
}

impl std::str::FromStr for SizePreset {
    type Err = FlyoverError;

    fn from_str(s: &str) -> Result<Self> {
        let preset = match s {
            "fullscreen" => SizePreset::Fullscreen,
            "youtube" => SizePreset::Youtube,
            "instagram-square" => SizePreset::InstagramSquare,
            "instagram-story" => SizePreset::InstagramStory,
            "tiktok" => SizePreset::Tiktok,
            "twitter" => SizePreset::Twitter,
            "facebook" => SizePreset::Facebook,
            other => {
                let (w, h) = other.split_once('x').ok_or_else(|| {
                    FlyoverError::InvalidInput(format!("unknown size preset `{other}`"))
                })?;
                let parse = |v: &str| {
                    v.trim().parse::<u32>().map_err(|_| {
                        FlyoverError::InvalidInput(format!("invalid custom size `{other}`"))
                    })
                };
                SizePreset::Custom {
                    width: parse(w)?,
                    height: parse(h)?,
                }
            }
        };
        Ok(preset)
    }
}

/// Default recording parameters. A running recording never observes changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub duration_secs: f64,
    pub frame_rate: u32,
    pub format: RecordingFormat,
}

impl RecordingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(FlyoverError::InvalidInput(
                "frame rate must be positive".into(),
            ));
        }
        if !(self.duration_secs > 0.0 && self.duration_secs <= MAX_RECORDING_SECS) {
            return Err(FlyoverError::InvalidInput(format!(
                "recording duration {} must be within (0, {MAX_RECORDING_SECS}] seconds",
                self.duration_secs
            )));
        }
        Ok(())
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            duration_secs: 10.0,
            frame_rate: 30,
            format: RecordingFormat::Mp4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "animation": { "interval_ms": 40 } }"#).unwrap();
        assert_eq!(config.animation.interval_ms, 40);
        assert_eq!(config.animation.trim_fraction, DEFAULT_TRIM_FRACTION);
        assert_eq!(config.recording.frame_rate, 30);
        assert_eq!(config.display.size_preset, SizePreset::Fullscreen);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = AppConfig::default();
        config.animation.interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(FlyoverError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_unusable_recording_durations() {
        for duration in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e300] {
            let mut config = AppConfig::default();
            config.recording.duration_secs = duration;
            assert!(
                matches!(config.validate(), Err(FlyoverError::InvalidInput(_))),
                "{duration} accepted"
            );
        }
        let mut config = AppConfig::default();
        config.recording.duration_secs = MAX_RECORDING_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_size_presets() {
        assert_eq!(
            "youtube".parse::<SizePreset>().unwrap().dimensions((1, 1)),
            (1280, 720)
        );
        assert_eq!(
            "640x480".parse::<SizePreset>().unwrap(),
            SizePreset::Custom {
                width: 640,
                height: 480
            }
        );
        assert_eq!(SizePreset::Fullscreen.dimensions((1920, 1080)), (1920, 1080));
        assert!("wide".parse::<SizePreset>().is_err());
    }

    #[test]
    fn custom_preset_round_trips_through_json() {
        let json = serde_json::to_string(&SizePreset::Custom {
            width: 320,
            height: 240,
        })
        .unwrap();
        let back: SizePreset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dimensions((0, 0)), (320, 240));
        let named: SizePreset = serde_json::from_str(r#""instagram-story""#).unwrap();
        assert_eq!(named, SizePreset::InstagramStory);
    }
}
