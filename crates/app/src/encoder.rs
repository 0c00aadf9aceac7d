use std::path::{Path, PathBuf};

use flyover_core::{
    EncoderFactory, EncoderOutput, EncoderStatus, FlyoverError, Raster, RecordingFormat,
    RecordingOptions, Result, VideoEncoder,
};
use serde::Serialize;

/// Writes every captured frame as a numbered PNG under `<root>/<name>/`,
/// followed by a `manifest.json` describing how to mux the sequence.
#[derive(Debug, Clone)]
pub struct FrameDirectoryFactory {
    root: PathBuf,
}

impl FrameDirectoryFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl EncoderFactory for FrameDirectoryFactory {
    fn create(
        &mut self,
        options: &RecordingOptions,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn VideoEncoder>> {
        if width == 0 || height == 0 {
            return Err(FlyoverError::InvalidInput(format!(
                "cannot encode a {width}x{height} surface"
            )));
        }
        Ok(Box::new(FrameDirectoryEncoder {
            dir: self.root.join(&options.name),
            manifest: Manifest {
                name: options.name.clone(),
                format: options.format,
                frame_rate: options.frame_rate,
                width,
                height,
                frames: 0,
                frame_pattern: FRAME_PATTERN.to_string(),
            },
            budget: options.frame_budget(),
        }))
    }
}

const FRAME_PATTERN: &str = "frame_%05d.png";

#[derive(Debug, Clone, Serialize)]
struct Manifest {
    name: String,
    format: RecordingFormat,
    frame_rate: u32,
    width: u32,
    height: u32,
    frames: u64,
    frame_pattern: String,
}

#[derive(Debug)]
struct FrameDirectoryEncoder {
    dir: PathBuf,
    manifest: Manifest,
    budget: u64,
}

impl FrameDirectoryEncoder {
    fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:05}.png"))
    }
}

impl VideoEncoder for FrameDirectoryEncoder {
    fn start(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        tracing::debug!(dir = %self.dir.display(), "frame directory ready");
        Ok(())
    }

    fn step(&mut self, frame: &Raster) -> Result<EncoderStatus> {
        let path = self.frame_path(self.manifest.frames);
        save_png(frame, &path)?;
        self.manifest.frames += 1;
        Ok(if self.manifest.frames >= self.budget {
            EncoderStatus::Finished
        } else {
            EncoderStatus::Recording
        })
    }

    fn stop(&mut self) -> Result<EncoderOutput> {
        let path = self.dir.join("manifest.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&self.manifest)?)?;
        Ok(EncoderOutput {
            frames: self.manifest.frames,
            location: Some(self.dir.display().to_string()),
        })
    }
}

/// Writes `raster` to `path` as an RGBA PNG.
pub fn save_png(raster: &Raster, path: &Path) -> Result<()> {
    raster
        .image()
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|err| FlyoverError::msg(format!("failed to write {}: {err}", path.display())))
}
