//! Talking-head generation boundary.
//!
//! The model is an external collaborator behind [`TalkingHeadGenerator`].
//! Failures are classified into a structured kind at this boundary;
//! message-marker matching against the model's raw error text is an
//! implementation detail of concrete generators, not of the retry loop.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};

use crate::config::{PreprocessMode, RenderConfig};

/// Structured failure kind of a generation attempt.
///
/// Failed attempts carry the working directories they created before
/// dying, so the run can still delete them; an OOM mid-generation is
/// exactly the case that leaves scratch behind.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeneratorError {
    /// Device memory was insufficient for the requested batch; worth
    /// retrying with a smaller batch size.
    #[error("resource exhausted: {message}")]
    ResourceExhausted {
        message: String,
        scratch_dirs: Vec<PathBuf>,
    },
    /// Any other failure; fatal for the slide.
    #[error("generation failed: {message}")]
    Failed {
        message: String,
        scratch_dirs: Vec<PathBuf>,
    },
}

impl GeneratorError {
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
            scratch_dirs: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            scratch_dirs: Vec::new(),
        }
    }

    /// Attach the working directories the failed attempt created.
    pub fn with_scratch_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        match &mut self {
            Self::ResourceExhausted { scratch_dirs, .. } | Self::Failed { scratch_dirs, .. } => {
                *scratch_dirs = dirs;
            }
        }
        self
    }

    fn into_scratch_dirs(self) -> Vec<PathBuf> {
        match self {
            Self::ResourceExhausted { scratch_dirs, .. } | Self::Failed { scratch_dirs, .. } => {
                scratch_dirs
            }
        }
    }
}

/// Translate a raw model error message into a structured kind.
///
/// Boundary adapter for subprocess- or FFI-backed generators whose only
/// failure signal is an error string.
pub fn classify_generator_failure(message: &str) -> GeneratorError {
    let lowered = message.to_lowercase();
    if lowered.contains("out of memory") || lowered.contains("oom") {
        GeneratorError::resource_exhausted(message)
    } else {
        GeneratorError::failed(message)
    }
}

/// One generation request.
#[derive(Debug, Clone)]
pub struct GeneratorRequest {
    /// Source face image
    pub source_image: PathBuf,
    /// Narration audio driving the lips
    pub audio_path: PathBuf,
    /// Face preprocessing mode
    pub preprocess: PreprocessMode,
    /// Render with a still head pose
    pub still_mode: bool,
    /// Run the face enhancer pass
    pub enhancer: bool,
    /// Frames per model invocation
    pub batch_size: u32,
    /// Output resolution (pixels, square)
    pub resolution: u32,
    /// Pose style index
    pub pose_style: u32,
}

impl GeneratorRequest {
    pub fn new(source_image: PathBuf, audio_path: PathBuf, config: &RenderConfig) -> Self {
        Self {
            source_image,
            audio_path,
            preprocess: config.preprocess,
            still_mode: config.still_mode,
            enhancer: config.enhancer,
            batch_size: config.batch_size,
            resolution: config.head_resolution,
            pose_style: config.pose_style,
        }
    }
}

/// A successfully generated clip.
///
/// The generator reports the working directories it created so the
/// orchestrator can delete exactly those at the end of the run.
#[derive(Debug, Clone)]
pub struct GeneratorOutput {
    pub video_path: PathBuf,
    pub scratch_dirs: Vec<PathBuf>,
}

/// External talking-head model: maps `(image, audio, parameters)` to a
/// video clip.
#[async_trait]
pub trait TalkingHeadGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GeneratorRequest,
    ) -> std::result::Result<GeneratorOutput, GeneratorError>;

    /// Memory-reclaim pass: cache eviction plus forced collection. Runs
    /// after every attempt regardless of outcome; the compositor and
    /// assembler stages that follow are memory-sensitive too.
    async fn release_memory(&self) {}
}

/// Bounded-retry policy for memory pressure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between attempts, after the reclaim pass
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown: Duration::from_secs(2),
        }
    }
}

/// What a bounded-retry generation run produced.
///
/// `scratch_dirs` accumulates the working directories of *every*
/// attempt, failed ones included, so the orchestrator can delete them
/// whether or not a clip came out.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    pub output: Option<GeneratorOutput>,
    pub scratch_dirs: Vec<PathBuf>,
}

/// Drive the generator with batch-size backoff under memory pressure.
///
/// Resource exhaustion halves the batch size (floor 1) and retries up to
/// `policy.max_attempts` times with a reclaim pass and cooldown between
/// attempts. Any other failure gives up immediately. Never propagates an
/// error: a slide-level failure is reported as `output: None`.
pub async fn generate_with_retry(
    generator: &dyn TalkingHeadGenerator,
    request: &GeneratorRequest,
    policy: &RetryPolicy,
) -> GenerationOutcome {
    let mut outcome = GenerationOutcome::default();

    if !request.source_image.exists() {
        error!(
            "source image not found, skipping generation: {}",
            request.source_image.display()
        );
        return outcome;
    }

    let mut attempt = request.clone();
    for attempt_no in 1..=policy.max_attempts {
        info!(
            "generating talking head (attempt {attempt_no}/{}, batch {}, preprocess {})",
            policy.max_attempts,
            attempt.batch_size,
            attempt.preprocess.as_str()
        );
        let result = generator.generate(&attempt).await;
        generator.release_memory().await;

        match result {
            Ok(output) => {
                outcome.scratch_dirs.extend(output.scratch_dirs.iter().cloned());
                if output.video_path.exists() {
                    outcome.output = Some(output);
                } else {
                    error!(
                        "generator reported success but clip is missing: {}",
                        output.video_path.display()
                    );
                }
                return outcome;
            }
            Err(e @ GeneratorError::ResourceExhausted { .. }) => {
                warn!(
                    "memory pressure on attempt {attempt_no}/{}: {e}",
                    policy.max_attempts
                );
                outcome.scratch_dirs.extend(e.into_scratch_dirs());
                attempt.batch_size = (attempt.batch_size / 2).max(1);
                if attempt_no < policy.max_attempts {
                    tokio::time::sleep(policy.cooldown).await;
                }
            }
            Err(e @ GeneratorError::Failed { .. }) => {
                error!("talking-head generation failed: {e}");
                outcome.scratch_dirs.extend(e.into_scratch_dirs());
                return outcome;
            }
        }
    }

    error!(
        "talking-head generation exhausted {} attempts",
        policy.max_attempts
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Per-attempt outcome for [`ScriptedGenerator`].
    enum Attempt {
        Succeed,
        Oom,
        Fail,
    }

    struct ScriptedGenerator {
        script: Mutex<Vec<Attempt>>,
        batches_seen: Mutex<Vec<u32>>,
        dir: PathBuf,
        clip: PathBuf,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Attempt>, dir: &std::path::Path, clip: PathBuf) -> Self {
            Self {
                script: Mutex::new(script),
                batches_seen: Mutex::new(Vec::new()),
                dir: dir.to_path_buf(),
                clip,
            }
        }

        /// Every attempt, successful or not, leaves a working directory
        /// behind and reports it.
        fn make_scratch(&self, attempt: usize) -> PathBuf {
            let scratch = self.dir.join(format!("scratch_{attempt}"));
            std::fs::create_dir_all(&scratch).unwrap();
            scratch
        }
    }

    #[async_trait]
    impl TalkingHeadGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            request: &GeneratorRequest,
        ) -> std::result::Result<GeneratorOutput, GeneratorError> {
            let attempt = {
                let mut batches = self.batches_seen.lock().unwrap();
                batches.push(request.batch_size);
                batches.len()
            };
            let scratch = self.make_scratch(attempt);
            let next = self.script.lock().unwrap().remove(0);
            match next {
                Attempt::Succeed => Ok(GeneratorOutput {
                    video_path: self.clip.clone(),
                    scratch_dirs: vec![scratch],
                }),
                Attempt::Oom => Err(GeneratorError::resource_exhausted("CUDA out of memory")
                    .with_scratch_dirs(vec![scratch])),
                Attempt::Fail => Err(GeneratorError::failed("face not detected")
                    .with_scratch_dirs(vec![scratch])),
            }
        }
    }

    fn request_with_batch(dir: &std::path::Path, batch_size: u32) -> GeneratorRequest {
        let image = dir.join("face.png");
        std::fs::write(&image, b"png").unwrap();
        let audio = dir.join("narration.wav");
        std::fs::write(&audio, b"wav").unwrap();
        GeneratorRequest {
            source_image: image,
            audio_path: audio,
            preprocess: PreprocessMode::Crop,
            still_mode: true,
            enhancer: false,
            batch_size,
            resolution: 256,
            pose_style: 0,
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            cooldown: Duration::ZERO,
        }
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_generator_failure("CUDA out of memory. Tried to allocate 2.00 GiB"),
            GeneratorError::ResourceExhausted { .. }
        ));
        assert!(matches!(
            classify_generator_failure("face not detected"),
            GeneratorError::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_retry_halves_batch_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"mp4").unwrap();

        let generator = ScriptedGenerator::new(
            vec![Attempt::Oom, Attempt::Oom, Attempt::Succeed],
            dir.path(),
            clip,
        );
        let request = request_with_batch(dir.path(), 8);

        let outcome = generate_with_retry(&generator, &request, &fast_policy()).await;
        assert!(outcome.output.is_some());
        assert_eq!(*generator.batches_seen.lock().unwrap(), vec![8, 4, 2]);
    }

    #[tokio::test]
    async fn test_batch_floor_is_one() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"mp4").unwrap();

        let generator = ScriptedGenerator::new(
            vec![Attempt::Oom, Attempt::Oom, Attempt::Succeed],
            dir.path(),
            clip,
        );
        let request = request_with_batch(dir.path(), 1);

        let outcome = generate_with_retry(&generator, &request, &fast_policy()).await;
        assert!(outcome.output.is_some());
        assert_eq!(*generator.batches_seen.lock().unwrap(), vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ScriptedGenerator::new(
            vec![Attempt::Oom, Attempt::Oom, Attempt::Oom],
            dir.path(),
            dir.path().join("clip.mp4"),
        );
        let request = request_with_batch(dir.path(), 4);

        let outcome = generate_with_retry(&generator, &request, &fast_policy()).await;
        assert!(outcome.output.is_none());
        assert_eq!(generator.batches_seen.lock().unwrap().len(), 3);
        // Every failed attempt's working directory is still reported.
        assert_eq!(outcome.scratch_dirs.len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ScriptedGenerator::new(
            vec![Attempt::Fail],
            dir.path(),
            dir.path().join("clip.mp4"),
        );
        let request = request_with_batch(dir.path(), 4);

        let outcome = generate_with_retry(&generator, &request, &fast_policy()).await;
        assert!(outcome.output.is_none());
        assert_eq!(generator.batches_seen.lock().unwrap().len(), 1);
        assert_eq!(outcome.scratch_dirs.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_image_skips_generation() {
        let dir = tempfile::tempdir().unwrap();
        let generator =
            ScriptedGenerator::new(vec![Attempt::Succeed], dir.path(), dir.path().join("clip.mp4"));
        let mut request = request_with_batch(dir.path(), 4);
        request.source_image = dir.path().join("missing.png");

        let outcome = generate_with_retry(&generator, &request, &fast_policy()).await;
        assert!(outcome.output.is_none());
        assert!(generator.batches_seen.lock().unwrap().is_empty());
    }

    // Scratch left by attempts that died of memory pressure must be
    // reported alongside the successful attempt's own directories, or it
    // can never be deleted at end of run.
    #[tokio::test]
    async fn test_failed_attempt_scratch_dirs_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"mp4").unwrap();

        let generator = ScriptedGenerator::new(
            vec![Attempt::Oom, Attempt::Succeed],
            dir.path(),
            clip,
        );
        let request = request_with_batch(dir.path(), 4);

        let outcome = generate_with_retry(&generator, &request, &fast_policy()).await;
        assert!(outcome.output.is_some());

        let oom_scratch = dir.path().join("scratch_1");
        assert!(oom_scratch.exists());
        assert!(
            outcome.scratch_dirs.contains(&oom_scratch),
            "scratch dir from failed attempt is unreported"
        );
        assert!(outcome.scratch_dirs.contains(&dir.path().join("scratch_2")));
    }

    // The cooldown exists to let memory pressure subside before the next
    // attempt; there is no next attempt after the last one. The paused
    // clock makes the sleep accounting exact.
    #[tokio::test(start_paused = true)]
    async fn test_no_cooldown_after_final_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ScriptedGenerator::new(
            vec![Attempt::Oom, Attempt::Oom, Attempt::Oom],
            dir.path(),
            dir.path().join("clip.mp4"),
        );
        let request = request_with_batch(dir.path(), 4);
        let policy = RetryPolicy {
            max_attempts: 3,
            cooldown: Duration::from_secs(2),
        };

        let started = tokio::time::Instant::now();
        let outcome = generate_with_retry(&generator, &request, &policy).await;
        let elapsed = started.elapsed();

        assert!(outcome.output.is_none());
        // Two cooldowns between three attempts, none after the last.
        assert_eq!(elapsed, Duration::from_secs(4));
    }
}
