//! Speech-rate adjustment with pitch preserved.
//!
//! Uses ffmpeg's `atempo` filter. A single `atempo` stage is only valid
//! over `[0.5, 2.0]`, so rates outside that range are decomposed into a
//! chain of stages whose product equals the requested rate.

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::ffmpeg::{last_stderr_line, run_ffmpeg};

const RATE_EPSILON: f64 = 1e-3;

/// Decompose a tempo multiplier into `atempo` stages within `[0.5, 2.0]`.
pub fn atempo_chain(rate: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    let mut r = rate;
    while r > 2.0 + 1e-9 {
        stages.push(2.0);
        r /= 2.0;
    }
    while r < 0.5 - 1e-9 {
        stages.push(0.5);
        r /= 0.5;
    }
    stages.push(r);
    stages
}

/// Render the stage chain as an ffmpeg audio filter string.
pub fn atempo_filter(rate: f64) -> String {
    atempo_chain(rate)
        .iter()
        .map(|stage| format!("atempo={stage:.3}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Produce a new audio file with playback speed scaled by `rate`.
///
/// The input file is never mutated. Rates within 0.1% of 1.0 are a no-op
/// returning the input path unchanged. A subprocess failure is non-fatal:
/// the original path is returned and a warning is logged.
pub fn adjust_speech_rate(input: &Path, rate: f64) -> PathBuf {
    if !input.exists() || (rate - 1.0).abs() < RATE_EPSILON {
        return input.to_path_buf();
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "narration".to_string());
    let ext = input
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "wav".to_string());
    let output = input.with_file_name(format!("{stem}_r{rate:.2}.{ext}"));

    let args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-filter:a".to_string(),
        atempo_filter(rate),
        output.display().to_string(),
    ];

    match run_ffmpeg(&args) {
        Ok(out) if out.status.success() && output.exists() => {
            info!("adjusted speech rate to {rate:.2}x: {}", output.display());
            output
        }
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(
                "atempo failed ({}), keeping original audio: {}",
                out.status,
                last_stderr_line(&stderr)
            );
            input.to_path_buf()
        }
        Err(e) => {
            warn!("atempo failed, keeping original audio: {e}");
            input.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_product(rate: f64) -> f64 {
        atempo_chain(rate).iter().product()
    }

    #[test]
    fn test_chain_identity() {
        let stages = atempo_chain(1.0);
        assert_eq!(stages, vec![1.0]);
    }

    #[test]
    fn test_chain_in_range_is_single_stage() {
        assert_eq!(atempo_chain(1.5), vec![1.5]);
        assert_eq!(atempo_chain(0.7), vec![0.7]);
    }

    #[test]
    fn test_chain_fast_rate() {
        // 4.0 = 2.0 * 2.0 * 1.0
        let stages = atempo_chain(4.0);
        assert!(stages.iter().all(|s| (0.5..=2.0).contains(s)));
        assert!((chain_product(4.0) - 4.0).abs() / 4.0 < 0.001);
    }

    #[test]
    fn test_chain_slow_rate() {
        let stages = atempo_chain(0.2);
        assert!(stages.iter().all(|s| (0.5..=2.0).contains(s)));
        assert!((chain_product(0.2) - 0.2).abs() / 0.2 < 0.001);
    }

    #[test]
    fn test_chain_odd_rate() {
        let stages = atempo_chain(3.0);
        assert!(stages.iter().all(|s| (0.5..=2.0).contains(s)));
        assert!((chain_product(3.0) - 3.0).abs() / 3.0 < 0.001);
    }

    #[test]
    fn test_filter_string() {
        assert_eq!(atempo_filter(1.5), "atempo=1.500");
        assert_eq!(atempo_filter(4.0), "atempo=2.000,atempo=2.000");
    }

    #[test]
    fn test_unity_rate_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("narration.wav");
        std::fs::write(&input, b"fake").unwrap();

        let out = adjust_speech_rate(&input, 1.0);
        assert_eq!(out, input);
        // No new file is created for the no-op path.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
