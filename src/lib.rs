//! slidecast turns a slide deck plus a narration script into a single
//! lecture video: one synthesized-speech, talking-head clip per slide,
//! composited picture-in-picture over the slide image, then concatenated
//! into the final output.
//!
//! The TTS engines and the talking-head model are external collaborators
//! behind the [`tts::SpeechSynthesizer`] and
//! [`generator::TalkingHeadGenerator`] traits; media composition runs
//! through ffmpeg subprocesses. Slides are processed strictly
//! sequentially, with graceful degradation at every stage.

pub mod config;
pub mod error;
pub mod generator;
pub mod media;
pub mod orchestrator;
pub mod progress;
pub mod slides;
pub mod tts;
pub mod workdir;

pub use config::{Gender, PipLayout, PreprocessMode, RenderConfig, VoiceCatalog, VoiceSpec};
pub use error::{PipelineError, Result};
pub use generator::{
    GenerationOutcome, GeneratorError, GeneratorOutput, GeneratorRequest, RetryPolicy,
    TalkingHeadGenerator,
};
pub use media::{FfmpegEngine, MediaEngine};
pub use orchestrator::LectureOrchestrator;
pub use progress::{ProgressUpdate, SlideStage};
pub use slides::{merge_with_deck_images, parse_slide_script, SlideRecord};
pub use tts::{SpeechSynthesizer, VoiceSelection};
