//! Progress updates for a lecture run.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

/// Pipeline stage currently running for a slide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SlideStage {
    /// Resolving or synthesizing the slide background
    Background,
    /// Narration synthesis
    Narration,
    /// Talking-head generation
    TalkingHead,
    /// Picture-in-picture composition
    Composition,
}

/// Updates emitted over the run's progress channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressUpdate {
    /// Run started with this many slides
    Started { total_slides: usize },
    /// A slide entered a stage
    Slide {
        current: usize,
        total: usize,
        stage: SlideStage,
    },
    /// A slide was skipped after an unrecoverable failure
    SlideSkipped { current: usize, reason: String },
    /// Final concatenation started
    Assembling,
    /// Run finished successfully
    Completed,
    /// Run failed terminally
    Error(String),
}

/// Best-effort send: a dropped or full receiver never stalls the run.
pub fn report(sender: &Option<Sender<ProgressUpdate>>, update: ProgressUpdate) {
    if let Some(sender) = sender {
        let _ = sender.try_send(update);
    }
}
