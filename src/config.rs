//! Configuration for the rendering pipeline.
//!
//! All tunables are plain serde structs injected into the orchestrator;
//! there is no ambient global state.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Face preprocessing mode passed through to the talking-head model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PreprocessMode {
    /// Crop the face region
    Crop,
    /// Resize the whole image
    Resize,
    /// Use the full image
    Full,
}

impl Default for PreprocessMode {
    fn default() -> Self {
        Self::Crop
    }
}

impl PreprocessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Resize => "resize",
            Self::Full => "full",
        }
    }
}

/// Speaker gender used for catalog voice lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    Female,
    Male,
}

impl Default for Gender {
    fn default() -> Self {
        Self::Female
    }
}

/// Read-only mapping of `(language, gender)` to a concrete voice identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceCatalog {
    voices: HashMap<String, HashMap<Gender, String>>,
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a voice for a language/gender pair.
    pub fn insert(&mut self, language: &str, gender: Gender, voice_id: &str) {
        self.voices
            .entry(language.to_string())
            .or_default()
            .insert(gender, voice_id.to_string());
    }

    /// Look up the catalog voice for a language/gender pair.
    pub fn lookup(&self, language: &str, gender: Gender) -> Option<&str> {
        self.voices
            .get(language)
            .and_then(|by_gender| by_gender.get(&gender))
            .map(String::as_str)
    }
}

/// How narration should be voiced, resolved once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VoiceSpec {
    /// Catalog voice: language plus gender, with an optional explicit
    /// voice identifier overriding the catalog lookup.
    BuiltIn {
        language: String,
        gender: Gender,
        voice_id: Option<String>,
    },
    /// Cloned voice: reference recording plus the language of the content.
    Cloned {
        reference_wav: PathBuf,
        language: Option<String>,
    },
}

/// Picture-in-picture layout for the slide compositor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipLayout {
    /// Overlay width as a fraction of the slide width
    pub ratio: f64,
    /// Margin from the slide edges, in pixels
    pub margin: u32,
    /// Target frame rate of the composite
    pub fps: u32,
    /// Try the hardware encoder before falling back to software
    pub prefer_hardware: bool,
}

impl Default for PipLayout {
    fn default() -> Self {
        Self {
            ratio: 0.10,
            margin: 50,
            fps: 25,
            prefer_hardware: true,
        }
    }
}

/// Rendering parameters for one lecture run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output resolution of the talking-head clip (pixels, square)
    pub head_resolution: u32,
    /// Pose style index of the talking-head model
    pub pose_style: u32,
    /// Face preprocessing mode
    pub preprocess: PreprocessMode,
    /// Render with a still head pose
    pub still_mode: bool,
    /// Run the face enhancer pass
    pub enhancer: bool,
    /// Initial generator batch size; halved on memory pressure
    pub batch_size: u32,
    /// Narration tempo multiplier, pitch preserved
    pub speech_rate: f64,
    /// Narration language code (e.g. "vi", "en")
    pub language: String,
    /// Picture-in-picture layout
    pub layout: PipLayout,
    /// Root directory that per-run working directories are created under
    pub results_root: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            head_resolution: 256,
            pose_style: 0,
            preprocess: PreprocessMode::default(),
            still_mode: true,
            enhancer: false,
            batch_size: 2,
            speech_rate: 1.0,
            language: "vi".to_string(),
            layout: PipLayout::default(),
            results_root: PathBuf::from("results"),
        }
    }
}
