//! Stream probing via ffprobe.

use std::path::Path;

use log::warn;

use super::ffmpeg::run_ffprobe;
use crate::error::{PipelineError, Result};

/// Measure the duration of an audio file in seconds.
///
/// Degrades to `0.0` on a missing file, an unreadable file or a probe
/// failure; the orchestrator floor-clamps the result, so this never
/// needs to error.
pub fn audio_duration(path: &Path) -> f64 {
    if !path.exists() {
        warn!("audio file missing, reporting zero duration: {}", path.display());
        return 0.0;
    }

    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path.display().to_string(),
    ];

    match run_ffprobe(&args) {
        Ok(stdout) => stdout.trim().parse::<f64>().unwrap_or_else(|_| {
            warn!("unparseable duration for {}: {:?}", path.display(), stdout.trim());
            0.0
        }),
        Err(e) => {
            warn!("duration probe failed for {}: {}", path.display(), e);
            0.0
        }
    }
}

/// Read the pixel dimensions of an image or video file.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.display().to_string()));
    }

    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream=width,height".to_string(),
        "-of".to_string(),
        "csv=s=x:p=0".to_string(),
        path.display().to_string(),
    ];

    let stdout = run_ffprobe(&args)?;
    parse_dimensions(stdout.trim())
}

fn parse_dimensions(s: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(PipelineError::VideoProcessing(format!(
            "failed to parse dimensions: {s:?}"
        )));
    }
    let width = parts[0]
        .parse::<u32>()
        .map_err(|_| PipelineError::VideoProcessing(format!("failed to parse width: {}", parts[0])))?;
    let height = parts[1]
        .parse::<u32>()
        .map_err(|_| PipelineError::VideoProcessing(format!("failed to parse height: {}", parts[1])))?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_reports_zero() {
        let missing = PathBuf::from("/nonexistent/narration.wav");
        assert_eq!(audio_duration(&missing), 0.0);
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1280x720").unwrap(), (1280, 720));
        assert!(parse_dimensions("1280").is_err());
        assert!(parse_dimensions("axb").is_err());
    }
}
