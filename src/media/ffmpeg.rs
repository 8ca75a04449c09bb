//! Thin wrappers around the ffmpeg and ffprobe executables.

use std::process::{Command, Output, Stdio};

use log::debug;

use crate::error::{PipelineError, Result};

/// Check whether ffmpeg is available on PATH.
pub fn is_ffmpeg_installed() -> bool {
    which::which("ffmpeg").is_ok()
}

/// Check whether ffprobe is available on PATH.
pub fn is_ffprobe_installed() -> bool {
    which::which("ffprobe").is_ok()
}

/// Get the first line of `ffmpeg -version`.
pub fn ffmpeg_version() -> Result<String> {
    let output = Command::new("ffmpeg").arg("-version").output()?;
    if !output.status.success() {
        return Err(PipelineError::Configuration(
            "failed to query ffmpeg version".to_string(),
        ));
    }
    let version = String::from_utf8_lossy(&output.stdout);
    Ok(version.lines().next().unwrap_or("").to_string())
}

/// Fail early when ffmpeg/ffprobe are missing from PATH.
pub fn ensure_media_tools() -> Result<()> {
    if !is_ffmpeg_installed() {
        return Err(PipelineError::Configuration(
            "ffmpeg not found in PATH".to_string(),
        ));
    }
    if !is_ffprobe_installed() {
        return Err(PipelineError::Configuration(
            "ffprobe not found in PATH".to_string(),
        ));
    }
    if let Ok(version) = ffmpeg_version() {
        debug!("using {version}");
    }
    Ok(())
}

/// Run ffmpeg with the given arguments, capturing output.
///
/// Returns the raw `Output` so callers can decide how to treat a non-zero
/// exit status (several stages have their own fallback on failure).
pub fn run_ffmpeg(args: &[String]) -> Result<Output> {
    debug!("ffmpeg {}", args.join(" "));
    let output = Command::new("ffmpeg")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    Ok(output)
}

/// Run ffmpeg and map a non-zero exit status into an error.
pub fn run_ffmpeg_checked(args: &[String], context: &str) -> Result<()> {
    let output = run_ffmpeg(args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::VideoProcessing(format!(
            "{context}: ffmpeg exited with {}: {}",
            output.status,
            last_stderr_line(&stderr)
        )));
    }
    Ok(())
}

/// Run ffprobe and return its stdout on success.
pub fn run_ffprobe(args: &[String]) -> Result<String> {
    debug!("ffprobe {}", args.join(" "));
    let output = Command::new("ffprobe")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        return Err(PipelineError::AudioProcessing(format!(
            "ffprobe exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// The last non-empty stderr line, which is where ffmpeg puts its
/// actual error message.
pub fn last_stderr_line(stderr: &str) -> &str {
    stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_stderr_line() {
        let stderr = "frame= 100\nframe= 200\nConversion failed!\n\n";
        assert_eq!(last_stderr_line(stderr), "Conversion failed!");
        assert_eq!(last_stderr_line(""), "");
    }
}
