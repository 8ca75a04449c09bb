//! Picture-in-picture slide composition.
//!
//! Overlays the talking-head clip on the slide image with ffmpeg. The
//! slide is looped as a still background and the result is trimmed to
//! the clip's duration; audio is stream-copied from the clip.

use std::path::Path;

use log::{info, warn};

use crate::config::PipLayout;
use crate::error::{PipelineError, Result};

use super::ffmpeg::{last_stderr_line, run_ffmpeg};
use super::probe::image_dimensions;

/// Video encoder used for the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// NVIDIA hardware encoder
    Nvenc,
    /// Software x264 encoder
    X264,
}

impl Encoder {
    pub fn codec(&self) -> &'static str {
        match self {
            Self::Nvenc => "h264_nvenc",
            Self::X264 => "libx264",
        }
    }

    pub fn preset(&self) -> &'static str {
        match self {
            Self::Nvenc => "p5",
            Self::X264 => "ultrafast",
        }
    }
}

/// Build the overlay filter graph.
///
/// Pads the background to even dimensions (most encoders reject odd
/// sizes), scales the overlay to `overlay_width` keeping aspect, and
/// anchors it in the top-right corner.
pub fn overlay_filter(overlay_width: u32, margin: u32) -> String {
    format!(
        "[0:v]pad=ceil(iw/2)*2:ceil(ih/2)*2[bg];\
         [1:v]scale={overlay_width}:-2:flags=lanczos[face];\
         [bg][face]overlay=W-w-{margin}:{margin},format=yuv420p[vout]"
    )
}

/// Build the full ffmpeg argument list for one composition attempt.
pub fn compose_args(
    slide_image: &Path,
    head_video: &Path,
    output: &Path,
    overlay_width: u32,
    layout: &PipLayout,
    encoder: Encoder,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        slide_image.display().to_string(),
        "-i".to_string(),
        head_video.display().to_string(),
        "-filter_complex".to_string(),
        overlay_filter(overlay_width, layout.margin),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "1:a?".to_string(),
        "-c:v".to_string(),
        encoder.codec().to_string(),
        "-preset".to_string(),
        encoder.preset().to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-r".to_string(),
        layout.fps.to_string(),
        "-shortest".to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        output.display().to_string(),
    ]
}

/// Composite the talking-head clip onto the slide image.
///
/// Tries the hardware encoder first when the layout prefers it and
/// transparently retries with the software encoder on any failure; only
/// a post-fallback failure propagates.
pub fn composite_slide(
    slide_image: &Path,
    head_video: &Path,
    output: &Path,
    layout: &PipLayout,
) -> Result<()> {
    let (slide_w, _slide_h) = image_dimensions(slide_image)?;
    let overlay_width = ((slide_w as f64 * layout.ratio) as u32).max(1);

    let encoders: &[Encoder] = if layout.prefer_hardware {
        &[Encoder::Nvenc, Encoder::X264]
    } else {
        &[Encoder::X264]
    };

    let mut last_error = String::new();
    for encoder in encoders {
        let args = compose_args(slide_image, head_video, output, overlay_width, layout, *encoder);
        let out = run_ffmpeg(&args)?;
        if out.status.success() && output.exists() {
            info!(
                "composited slide with {}: {}",
                encoder.codec(),
                output.display()
            );
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&out.stderr);
        last_error = last_stderr_line(&stderr).to_string();
        warn!(
            "composition with {} failed ({}): {}",
            encoder.codec(),
            out.status,
            last_error
        );
    }

    Err(PipelineError::VideoProcessing(format!(
        "slide composition failed on all encoders: {last_error}"
    )))
}
