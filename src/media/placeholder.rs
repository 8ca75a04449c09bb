//! Synthesized stand-in media: text-only slide images and silent
//! narration tracks, both rendered through ffmpeg's lavfi sources.

use std::path::Path;

use log::warn;

use crate::error::{PipelineError, Result};

use super::ffmpeg::run_ffmpeg_checked;

pub const PLACEHOLDER_WIDTH: u32 = 1280;
pub const PLACEHOLDER_HEIGHT: u32 = 720;

/// Render the slide text centered on a white canvas.
///
/// Used when a slide has no extracted image. If text rendering fails
/// (drawtext needs a usable font), a plain white canvas is produced
/// instead so the slide can still be composited.
pub fn render_text_slide(text: &str, output: &Path) -> Result<()> {
    let text_file = output.with_extension("txt");
    std::fs::write(&text_file, text)?;

    let drawtext = format!(
        "drawtext=textfile='{}':fontcolor=black:fontsize=40:x=(w-text_w)/2:y=(h-text_h)/2",
        text_file.display()
    );
    let result = render_canvas(output, Some(&drawtext));
    let _ = std::fs::remove_file(&text_file);

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("text rendering failed, producing blank slide: {e}");
            render_canvas(output, None)
        }
    }
}

fn render_canvas(output: &Path, filter: Option<&str>) -> Result<()> {
    let mut args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("color=c=white:s={PLACEHOLDER_WIDTH}x{PLACEHOLDER_HEIGHT}"),
    ];
    if let Some(filter) = filter {
        args.push("-vf".to_string());
        args.push(filter.to_string());
    }
    args.push("-frames:v".to_string());
    args.push("1".to_string());
    args.push(output.display().to_string());

    run_ffmpeg_checked(&args, "slide placeholder")?;
    if !output.exists() {
        return Err(PipelineError::VideoProcessing(
            "placeholder image was not written".to_string(),
        ));
    }
    Ok(())
}

/// Write a silent mono track of the given duration.
///
/// Fallback narration for slides whose TTS failed completely.
pub fn silent_track(duration_seconds: f64, output: &Path) -> Result<()> {
    let args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        "anullsrc=r=44100:cl=mono".to_string(),
        "-t".to_string(),
        format!("{duration_seconds:.3}"),
        "-acodec".to_string(),
        "pcm_s16le".to_string(),
        output.display().to_string(),
    ];

    run_ffmpeg_checked(&args, "silent track")?;
    if !output.exists() {
        return Err(PipelineError::AudioProcessing(
            "silent track was not written".to_string(),
        ));
    }
    Ok(())
}
