//! Observable pipeline state and its pure transition function.

use crate::error::RecapError;
use crate::summary::ConversationContext;
use crate::transcript::Transcript;
use crate::video::{VideoMetadata, VideoReference};
use std::fmt;
use std::sync::Arc;

/// The side-effecting step a run is performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Resolve,
    Metadata,
    Transcript,
    Summary,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Resolve => write!(f, "resolving the active video"),
            Step::Metadata => write!(f, "fetching video details"),
            Step::Transcript => write!(f, "fetching the transcript"),
            Step::Summary => write!(f, "summarizing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    #[default]
    Idle,
    Resolving,
    FetchingMetadata,
    FetchingTranscript,
    Summarizing,
    Ready,
    /// The video has no transcript in any configured language.
    NoTranscript,
    Cancelled,
    Failed {
        at: Step,
    },
}

impl PipelineStage {
    /// The step this stage is waiting on, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            PipelineStage::Resolving => Some(Step::Resolve),
            PipelineStage::FetchingMetadata => Some(Step::Metadata),
            PipelineStage::FetchingTranscript => Some(Step::Transcript),
            PipelineStage::Summarizing => Some(Step::Summary),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.step().is_some()
    }

    /// True once a run has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStage::Ready
                | PipelineStage::NoTranscript
                | PipelineStage::Cancelled
                | PipelineStage::Failed { .. }
        )
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Idle => write!(f, "idle"),
            PipelineStage::Resolving => write!(f, "Finding the active YouTube tab..."),
            PipelineStage::FetchingMetadata => write!(f, "Fetching video details..."),
            PipelineStage::FetchingTranscript => write!(f, "Fetching transcript..."),
            PipelineStage::Summarizing => write!(f, "Summarizing..."),
            PipelineStage::Ready => write!(f, "ready"),
            PipelineStage::NoTranscript => write!(f, "no transcript"),
            PipelineStage::Cancelled => write!(f, "cancelled"),
            PipelineStage::Failed { at } => write!(f, "failed while {}", at),
        }
    }
}

/// Something that happened to the current run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Activated,
    Resolved(VideoReference),
    MetadataFetched(VideoMetadata),
    TranscriptFound(Arc<Transcript>),
    TranscriptUnavailable { attempted: Vec<String> },
    Summarized(String),
    StepFailed { step: Step, message: String },
    /// A newer activation replaced this run.
    Superseded,
    TornDown,
}

/// Next stage for `event` in `stage`. Pairs that make no sense keep the stage.
pub fn transition(stage: PipelineStage, event: &PipelineEvent) -> PipelineStage {
    use PipelineEvent as E;
    use PipelineStage as S;

    match (stage, event) {
        (_, E::Activated) => S::Resolving,
        (S::Resolving, E::Resolved(_)) => S::FetchingMetadata,
        (S::FetchingMetadata, E::MetadataFetched(_)) => S::FetchingTranscript,
        (S::FetchingTranscript, E::TranscriptFound(_)) => S::Summarizing,
        (S::FetchingTranscript, E::TranscriptUnavailable { .. }) => S::NoTranscript,
        (S::Summarizing, E::Summarized(_)) => S::Ready,
        (current, E::StepFailed { step, .. }) if current.step() == Some(*step) => {
            S::Failed { at: *step }
        }
        (current, E::Superseded | E::TornDown) if current.is_active() => S::Cancelled,
        (current, _) => current,
    }
}

/// State of the follow-up form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FollowUpStatus {
    #[default]
    Closed,
    Asking,
    Failed(String),
}

/// Snapshot of everything a view needs to render.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub generation: u64,
    pub stage: PipelineStage,
    pub video: Option<VideoReference>,
    pub metadata: Option<VideoMetadata>,
    pub transcript: Option<Arc<Transcript>>,
    pub summary: Option<String>,
    pub summary_is_loading: bool,
    pub error: Option<String>,
    /// Guidance shown when the run ends without a transcript.
    pub notice: Option<String>,
    pub follow_up: FollowUpStatus,
}

impl PipelineState {
    /// Empty state for a new run.
    pub fn fresh(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Apply `event`, updating the stage and the data it carries.
    ///
    /// Data is only recorded when the stage actually accepts the event.
    pub fn apply(&mut self, event: PipelineEvent) {
        let next = transition(self.stage, &event);
        let accepted = next != self.stage || matches!(event, PipelineEvent::Activated);
        self.stage = next;
        if !accepted {
            return;
        }

        match event {
            PipelineEvent::Activated => {}
            PipelineEvent::Resolved(video) => self.video = Some(video),
            PipelineEvent::MetadataFetched(metadata) => self.metadata = Some(metadata),
            PipelineEvent::TranscriptFound(transcript) => {
                self.transcript = Some(transcript);
                self.summary_is_loading = true;
            }
            PipelineEvent::TranscriptUnavailable { attempted } => {
                let reason = RecapError::NoTranscriptAvailable(attempted.join(", "));
                self.notice = Some(format!(
                    "{} Try another video, or add its caption language to \
                     transcript.fallback_languages in the config file.",
                    reason
                ));
            }
            PipelineEvent::Summarized(summary) => {
                self.summary = Some(summary);
                self.summary_is_loading = false;
            }
            PipelineEvent::StepFailed { step, message } => {
                self.summary_is_loading = false;
                self.error = Some(failure_message(step, &message));
            }
            PipelineEvent::Superseded | PipelineEvent::TornDown => {
                self.summary_is_loading = false;
            }
        }
    }

    /// Context for a follow-up question; only available once a summary exists.
    pub fn conversation(&self) -> Option<ConversationContext> {
        if self.stage != PipelineStage::Ready {
            return None;
        }
        Some(ConversationContext {
            transcript: self.transcript.clone()?,
            title: self
                .metadata
                .as_ref()
                .map(|m| m.title.clone())
                .unwrap_or_default(),
            latest_answer: self.summary.clone()?,
        })
    }
}

fn failure_message(step: Step, message: &str) -> String {
    match step {
        Step::Resolve => format!("Could not find a YouTube video to summarize. {}", message),
        Step::Metadata => format!("Could not load the video details. {}", message),
        Step::Transcript => format!("Could not load the transcript. {}", message),
        Step::Summary => format!("Could not generate a summary. {}", message),
    }
}
