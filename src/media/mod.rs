//! Media processing stages backed by ffmpeg subprocesses.

pub mod compose;
pub mod concat;
pub mod ffmpeg;
pub mod placeholder;
pub mod probe;
pub mod tempo;

use std::path::{Path, PathBuf};

use crate::config::PipLayout;
use crate::error::Result;

/// The media operations the orchestrator drives.
///
/// Everything here is a blocking call; the orchestrator issues at most
/// one at a time. The production implementation shells out to ffmpeg;
/// tests substitute an in-memory fake.
pub trait MediaEngine: Send + Sync {
    /// Verify the backing tools are usable before a run starts.
    fn ensure_available(&self) -> Result<()>;

    /// Duration of an audio file in seconds; `0.0` on any failure.
    fn audio_duration(&self, path: &Path) -> f64;

    /// Scale playback speed by `rate` with pitch preserved. Non-fatal:
    /// returns the input path unchanged when adjustment is impossible.
    fn adjust_speech_rate(&self, input: &Path, rate: f64) -> PathBuf;

    /// Render slide text centered on a blank canvas.
    fn render_text_slide(&self, text: &str, output: &Path) -> Result<()>;

    /// Write a silent narration track of the given duration.
    fn silent_track(&self, duration_seconds: f64, output: &Path) -> Result<()>;

    /// Overlay the talking-head clip on the slide image.
    fn composite_slide(
        &self,
        slide_image: &Path,
        head_video: &Path,
        output: &Path,
        layout: &PipLayout,
    ) -> Result<()>;

    /// Concatenate the ordered composites into the final video.
    fn concat_videos(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;
}

/// ffmpeg/ffprobe-backed implementation of [`MediaEngine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegEngine;

impl MediaEngine for FfmpegEngine {
    fn ensure_available(&self) -> Result<()> {
        ffmpeg::ensure_media_tools()
    }

    fn audio_duration(&self, path: &Path) -> f64 {
        probe::audio_duration(path)
    }

    fn adjust_speech_rate(&self, input: &Path, rate: f64) -> PathBuf {
        tempo::adjust_speech_rate(input, rate)
    }

    fn render_text_slide(&self, text: &str, output: &Path) -> Result<()> {
        placeholder::render_text_slide(text, output)
    }

    fn silent_track(&self, duration_seconds: f64, output: &Path) -> Result<()> {
        placeholder::silent_track(duration_seconds, output)
    }

    fn composite_slide(
        &self,
        slide_image: &Path,
        head_video: &Path,
        output: &Path,
        layout: &PipLayout,
    ) -> Result<()> {
        compose::composite_slide(slide_image, head_video, output, layout)
    }

    fn concat_videos(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        concat::concat_videos(inputs, output)
    }
}
