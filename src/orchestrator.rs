//! Lecture run orchestration.
//!
//! Drives the full per-slide pipeline: background resolution, narration
//! synthesis, speech-rate adjustment, talking-head generation, PIP
//! composition, and the final concatenation. Slides are processed
//! strictly sequentially; the generator shares one device context and
//! concurrent invocations would interleave memory pressure
//! unpredictably.
//!
//! No error escapes [`LectureOrchestrator::render`]: every stage failure
//! becomes a fallback, a skipped slide, or (only when no slide survived)
//! a `(None, message)` result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc::Sender;

use crate::config::{RenderConfig, VoiceCatalog, VoiceSpec};
use crate::error::{PipelineError, Result};
use crate::generator::{
    generate_with_retry, GeneratorRequest, RetryPolicy, TalkingHeadGenerator,
};
use crate::media::MediaEngine;
use crate::progress::{report, ProgressUpdate, SlideStage};
use crate::slides::SlideRecord;
use crate::tts::{synthesize_with_fallback, SpeechSynthesizer, VoiceSelection};
use crate::workdir::RunWorkspace;

/// Audio shorter than this is treated as degenerate.
const MIN_MEASURABLE_SECONDS: f64 = 0.1;
/// Floor applied to degenerate per-slide durations.
const MIN_SLIDE_SECONDS: f64 = 3.0;

/// Clamp a probed duration to the per-slide minimum.
pub fn clamp_duration(measured: f64) -> f64 {
    if measured < MIN_MEASURABLE_SECONDS {
        MIN_SLIDE_SECONDS
    } else {
        measured
    }
}

/// Ordered per-run output state.
#[derive(Debug, Default)]
struct RunAccumulator {
    composites: Vec<PathBuf>,
    total_duration: f64,
    skipped: usize,
}

/// Coordinates the per-slide pipeline and the final assembly.
pub struct LectureOrchestrator {
    config: RenderConfig,
    catalog: VoiceCatalog,
    retry_policy: RetryPolicy,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    generator: Arc<dyn TalkingHeadGenerator>,
    media: Arc<dyn MediaEngine>,
}

impl LectureOrchestrator {
    pub fn new(
        config: RenderConfig,
        catalog: VoiceCatalog,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        generator: Arc<dyn TalkingHeadGenerator>,
        media: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            config,
            catalog,
            retry_policy: RetryPolicy::default(),
            synthesizer,
            generator,
            media,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Render the whole lecture.
    ///
    /// Returns the final video path and a human-readable status string;
    /// `None` only when no usable output could be produced.
    pub async fn render(
        &self,
        slides: &[SlideRecord],
        source_image: &Path,
        voice: &VoiceSpec,
        progress: Option<Sender<ProgressUpdate>>,
    ) -> (Option<PathBuf>, String) {
        match self.render_inner(slides, source_image, voice, &progress).await {
            Ok((path, status)) => {
                report(&progress, ProgressUpdate::Completed);
                (Some(path), status)
            }
            Err(e) => {
                let message = e.to_string();
                error!("lecture run failed: {message}");
                report(&progress, ProgressUpdate::Error(message.clone()));
                (None, message)
            }
        }
    }

    async fn render_inner(
        &self,
        slides: &[SlideRecord],
        source_image: &Path,
        voice: &VoiceSpec,
        progress: &Option<Sender<ProgressUpdate>>,
    ) -> Result<(PathBuf, String)> {
        if slides.is_empty() {
            return Err(PipelineError::Configuration(
                "no slides to process".to_string(),
            ));
        }
        self.media.ensure_available()?;

        if !source_image.exists() {
            return Err(PipelineError::FileNotFound(format!(
                "source face image: {}",
                source_image.display()
            )));
        }

        let mut workspace = RunWorkspace::create(&self.config.results_root)?;
        info!("creating lecture video in {}", workspace.dir().display());
        report(
            progress,
            ProgressUpdate::Started {
                total_slides: slides.len(),
            },
        );

        // Work from a copy so the run no longer depends on the caller's file.
        let safe_image = workspace.path("source_image.png");
        std::fs::copy(source_image, &safe_image)?;
        workspace.track(&safe_image);

        // Final ordering is slide_number ascending, independent of the
        // order the caller handed us.
        let mut ordered: Vec<&SlideRecord> = slides.iter().collect();
        ordered.sort_by_key(|s| s.slide_number);

        let (primary_voice, fallback_voice) =
            crate::tts::resolve_voice(voice, &self.catalog, &self.config.language);

        let mut acc = RunAccumulator::default();
        let total = ordered.len();
        for (idx, slide) in ordered.into_iter().enumerate() {
            let current = idx + 1;
            info!("--- processing slide {current}/{total} (number {}) ---", slide.slide_number);

            match self
                .process_slide(
                    slide,
                    current,
                    total,
                    &safe_image,
                    &primary_voice,
                    fallback_voice.as_ref(),
                    &mut workspace,
                    progress,
                )
                .await
            {
                Ok((composite, duration)) => {
                    acc.composites.push(composite);
                    acc.total_duration += duration;
                    info!("slide {current}/{total} done ({duration:.2}s)");
                }
                Err(e) => {
                    warn!("slide {current}/{total} skipped: {e}");
                    acc.skipped += 1;
                    report(
                        progress,
                        ProgressUpdate::SlideSkipped {
                            current,
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        if acc.composites.is_empty() {
            workspace.cleanup();
            return Err(PipelineError::VideoProcessing(
                "no slide could be processed".to_string(),
            ));
        }

        report(progress, ProgressUpdate::Assembling);
        info!(
            "assembling final video from {} slides ({:.2}s estimated)",
            acc.composites.len(),
            acc.total_duration
        );

        let final_path = workspace.path("lecture_final.mp4");
        if let Err(e) = self.media.concat_videos(&acc.composites, &final_path) {
            // Terminal failure: nothing usable came out, so the run dir
            // must not keep the per-slide composites around.
            for composite in &acc.composites {
                workspace.remove_now(composite);
            }
            workspace.remove_now(&final_path);
            workspace.cleanup();
            return Err(e);
        }

        for composite in &acc.composites {
            workspace.remove_now(composite);
        }
        workspace.cleanup();
        self.generator.release_memory().await;

        let status = format!(
            "Done: rendered {} of {} slides ({} skipped), estimated duration {:.1}s",
            acc.composites.len(),
            total,
            acc.skipped,
            acc.total_duration
        );
        info!("{status}");
        Ok((final_path, status))
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_slide(
        &self,
        slide: &SlideRecord,
        current: usize,
        total: usize,
        safe_image: &Path,
        primary_voice: &VoiceSelection,
        fallback_voice: Option<&VoiceSelection>,
        workspace: &mut RunWorkspace,
        progress: &Option<Sender<ProgressUpdate>>,
    ) -> Result<(PathBuf, f64)> {
        let stage = |s: SlideStage| {
            report(
                progress,
                ProgressUpdate::Slide {
                    current,
                    total,
                    stage: s,
                },
            )
        };

        // 1. Slide background: the deck image when usable, otherwise a
        // placeholder rendered from the narration text.
        stage(SlideStage::Background);
        let slide_image = workspace.path(&format!("slide_{:03}.png", slide.slide_number));
        self.resolve_background(slide, &slide_image)?;
        workspace.track(&slide_image);

        // 2. Narration with the cloned -> catalog -> silence fallback chain.
        stage(SlideStage::Narration);
        let silent_path = workspace.path(&format!("silent_{:03}.wav", slide.slide_number));
        let audio = synthesize_with_fallback(
            self.synthesizer.as_ref(),
            self.media.as_ref(),
            &slide.text,
            primary_voice,
            fallback_voice,
            &silent_path,
        )
        .await
        .map_err(|e| {
            workspace.remove_now(&slide_image);
            e
        })?;
        workspace.track(&audio);

        // 3. Tempo adjustment; the input copy is superseded if a new
        // file was produced.
        let adjusted = self
            .media
            .adjust_speech_rate(&audio, self.config.speech_rate);
        if adjusted != audio {
            workspace.track(&adjusted);
            workspace.remove_now(&audio);
        }

        // 4. Duration, floor-clamped against degenerate audio.
        let duration = clamp_duration(self.media.audio_duration(&adjusted));

        // 5. Talking head from the adjusted narration. Scratch dirs are
        // tracked whether or not a clip came out; failed attempts leave
        // working directories behind too.
        stage(SlideStage::TalkingHead);
        let request = GeneratorRequest::new(safe_image.to_path_buf(), adjusted.clone(), &self.config);
        let outcome = generate_with_retry(self.generator.as_ref(), &request, &self.retry_policy).await;
        workspace.track_scratch_dirs(&outcome.scratch_dirs);
        let output = match outcome.output {
            Some(output) => output,
            None => {
                workspace.remove_now(&adjusted);
                workspace.remove_now(&slide_image);
                return Err(PipelineError::VideoGeneration(format!(
                    "talking-head generation failed for slide {}",
                    slide.slide_number
                )));
            }
        };
        workspace.track(&output.video_path);

        // 6. Picture-in-picture composition.
        stage(SlideStage::Composition);
        let composite = workspace.path(&format!("slide_{:03}.mp4", slide.slide_number));
        if let Err(e) = self.media.composite_slide(
            &slide_image,
            &output.video_path,
            &composite,
            &self.config.layout,
        ) {
            workspace.remove_now(&adjusted);
            workspace.remove_now(&slide_image);
            workspace.remove_now(&output.video_path);
            workspace.remove_now(&composite);
            return Err(e);
        }

        // 7. The composite supersedes every per-slide intermediate.
        workspace.remove_now(&adjusted);
        workspace.remove_now(&slide_image);
        workspace.remove_now(&output.video_path);

        Ok((composite, duration))
    }

    fn resolve_background(&self, slide: &SlideRecord, output: &Path) -> Result<()> {
        if let Some(original) = &slide.image_path {
            if original.exists() {
                match std::fs::copy(original, output) {
                    Ok(_) => return Ok(()),
                    Err(e) => {
                        warn!(
                            "copying slide image {} failed ({e}), rendering placeholder",
                            original.display()
                        );
                    }
                }
            } else {
                warn!(
                    "slide {} image missing: {}",
                    slide.slide_number,
                    original.display()
                );
            }
        }
        self.media.render_text_slide(&slide.text, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_duration() {
        assert_eq!(clamp_duration(0.05), 3.0);
        assert_eq!(clamp_duration(0.0), 3.0);
        assert_eq!(clamp_duration(4.2), 4.2);
        assert_eq!(clamp_duration(0.1), 0.1);
    }
}
