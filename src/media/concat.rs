//! Final sequence assembly.
//!
//! Joins the per-slide composites with the concat demuxer (stream copy,
//! no re-encoding). When the inputs turn out not to be bitstream
//! compatible the demuxer exits non-zero and a full re-encoding concat
//! runs instead.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{PipelineError, Result};

use super::ffmpeg::{last_stderr_line, run_ffmpeg};

/// Render the concat demuxer list file contents.
///
/// Paths are wrapped in single quotes with embedded quotes escaped the
/// way the demuxer expects.
pub fn concat_list_contents(inputs: &[PathBuf]) -> String {
    let mut contents = String::new();
    for path in inputs {
        let escaped = path.display().to_string().replace('\'', r"'\''");
        contents.push_str(&format!("file '{escaped}'\n"));
    }
    contents
}

/// Argument list for the stream-copy fast path.
pub fn stream_copy_args(list_file: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_file.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.display().to_string(),
    ]
}

/// Argument list for the re-encoding fallback: every input is reopened
/// and joined through the concat filter.
pub fn reencode_args(inputs: &[PathBuf], output: &Path) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    for input in inputs {
        args.push("-i".to_string());
        args.push(input.display().to_string());
    }

    let mut filter = String::new();
    for i in 0..inputs.len() {
        filter.push_str(&format!("[{i}:v][{i}:a]"));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=1[v][a]", inputs.len()));

    args.extend([
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "[a]".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "ultrafast".to_string(),
        "-crf".to_string(),
        "23".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        output.display().to_string(),
    ]);
    args
}

/// Concatenate the ordered slide composites into one output file.
///
/// Failure of both the fast path and the re-encoding fallback is
/// terminal for the run.
pub fn concat_videos(inputs: &[PathBuf], output: &Path) -> Result<()> {
    concat_videos_with(inputs, output, run_ffmpeg)
}

/// Concatenation with an injected ffmpeg runner, so the copy/re-encode
/// decision is testable without real media.
fn concat_videos_with<F>(inputs: &[PathBuf], output: &Path, mut run: F) -> Result<()>
where
    F: FnMut(&[String]) -> Result<std::process::Output>,
{
    if inputs.is_empty() {
        return Err(PipelineError::VideoProcessing(
            "no input videos to concatenate".to_string(),
        ));
    }

    let list_file = output.with_extension("concat.txt");
    std::fs::write(&list_file, concat_list_contents(inputs))?;

    let fast = run(&stream_copy_args(&list_file, output))?;
    let fast_ok = fast.status.success() && output.exists();
    let _ = std::fs::remove_file(&list_file);

    if fast_ok {
        info!("concatenated {} slides (stream copy)", inputs.len());
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&fast.stderr);
    warn!(
        "stream-copy concat failed ({}), re-encoding: {}",
        fast.status,
        last_stderr_line(&stderr)
    );

    let slow = run(&reencode_args(inputs, output))?;
    if !slow.status.success() || !output.exists() {
        let stderr = String::from_utf8_lossy(&slow.stderr);
        return Err(PipelineError::VideoProcessing(format!(
            "concatenation failed on both paths: {}",
            last_stderr_line(&stderr)
        )));
    }

    info!("concatenated {} slides (re-encoded)", inputs.len());
    Ok(())
}
