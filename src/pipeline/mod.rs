//! The fetch-and-summarize pipeline.
//!
//! Each activation starts a run that walks tab → video → metadata →
//! transcript → summary. Runs are identified by a generation number and own a
//! cancellation token; a newer activation (or a teardown) cancels the previous
//! run, and anything it would still have written is dropped. State is
//! published on a `tokio::sync::watch` channel so views can follow along.

mod state;

pub use state::{transition, FollowUpStatus, PipelineEvent, PipelineStage, PipelineState, Step};

use crate::browser::{tab_source_from_settings, TabSource};
use crate::cancel::or_cancelled;
use crate::config::{Prompts, Settings};
use crate::error::{RecapError, Result};
use crate::summary::{
    build_backend, ConversationContext, FollowUpEngine, SummaryBackend, SummaryEngine,
    SummaryOptions,
};
use crate::transcript::{
    LanguagePriority, TranscriptFetcher, TranscriptOutcome, TranscriptProvider,
    YoutubeCaptionProvider,
};
use crate::video::{
    resolve_active_video, MetadataProvider, VideoMetadataFetcher, VideoReference,
    YtDlpMetadataProvider,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The external services a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub tabs: Arc<dyn TabSource>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub transcripts: Arc<dyn TranscriptProvider>,
    pub backend: Arc<dyn SummaryBackend>,
}

impl Collaborators {
    /// Build the concrete collaborators. `url` replaces the browser with a
    /// single active tab showing that video.
    pub fn from_settings(settings: &Settings, url: Option<&str>) -> Result<Self> {
        let video = url.map(VideoReference::parse).transpose()?;

        Ok(Self {
            tabs: tab_source_from_settings(
                &settings.browser,
                video.as_ref().map(|v| v.watch_url()),
            ),
            metadata: Arc::new(YtDlpMetadataProvider::new()),
            transcripts: Arc::new(YoutubeCaptionProvider::new()?),
            backend: build_backend(settings)?,
        })
    }
}

/// Per-run configuration, captured when a run starts.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub languages: LanguagePriority,
    pub summary: SummaryOptions,
    pub prompts: Prompts,
}

impl RunConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            languages: LanguagePriority::new(
                settings.transcript.language.clone(),
                settings.transcript.fallback_languages.clone(),
            ),
            summary: SummaryOptions::from_settings(settings),
            prompts: Prompts::load(
                settings.prompts.custom_dir.as_deref(),
                Some(&settings.prompts.variables),
            )?,
        })
    }
}

/// Handle to a spawned run.
pub struct RunHandle {
    pub generation: u64,
    handle: JoinHandle<()>,
}

impl RunHandle {
    /// Wait for the run to finish (including being cancelled).
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                std::panic::resume_unwind(e.into_panic());
            }
        }
    }
}

/// Everything a spawned run needs, cloned out of the controller.
#[derive(Clone)]
struct Services {
    tabs: Arc<dyn TabSource>,
    metadata: VideoMetadataFetcher,
    transcripts: TranscriptFetcher,
    summaries: SummaryEngine,
    config: RunConfig,
}

/// Owns the current run and the published [`PipelineState`].
pub struct PipelineController {
    services: Services,
    follow_ups: FollowUpEngine,
    state: Arc<watch::Sender<PipelineState>>,
    current: CancellationToken,
    generation: u64,
}

impl PipelineController {
    pub fn new(collaborators: Collaborators, config: RunConfig) -> Self {
        let (state, _) = watch::channel(PipelineState::default());
        let backend = collaborators.backend;

        Self {
            services: Services {
                tabs: collaborators.tabs,
                metadata: VideoMetadataFetcher::new(collaborators.metadata),
                transcripts: TranscriptFetcher::new(collaborators.transcripts),
                summaries: SummaryEngine::new(backend.clone())
                    .with_prompts(config.prompts.clone()),
                config: config.clone(),
            },
            follow_ups: FollowUpEngine::new(backend).with_prompts(config.prompts),
            state: Arc::new(state),
            current: CancellationToken::new(),
            generation: 0,
        }
    }

    /// Build a controller with the concrete collaborators for `settings`.
    pub fn from_settings(settings: &Settings, url: Option<&str>) -> Result<Self> {
        let collaborators = Collaborators::from_settings(settings, url)?;
        Ok(Self::new(collaborators, RunConfig::from_settings(settings)?))
    }

    /// Start a new run, cancelling the current one. Must be called from
    /// within a tokio runtime.
    pub fn activate(&mut self) -> RunHandle {
        self.current.cancel();
        self.state.send_if_modified(|state| {
            let before = state.stage;
            state.apply(PipelineEvent::Superseded);
            if state.stage != before {
                debug!("Run {} superseded", state.generation);
            }
            state.stage != before
        });

        self.generation += 1;
        self.current = CancellationToken::new();

        let mut fresh = PipelineState::fresh(self.generation);
        fresh.apply(PipelineEvent::Activated);
        self.state.send_replace(fresh);

        let run = Run {
            generation: self.generation,
            cancel: self.current.clone(),
            state: self.state.clone(),
        };
        info!("Starting run {}", self.generation);

        RunHandle {
            generation: self.generation,
            handle: tokio::spawn(run.drive(self.services.clone())),
        }
    }

    /// Cancel the in-flight run. A finished run keeps its content.
    pub fn teardown(&self) {
        self.current.cancel();
        self.state.send_if_modified(|state| {
            let before = (state.stage, state.follow_up.clone());
            state.apply(PipelineEvent::TornDown);
            if state.follow_up == FollowUpStatus::Asking {
                state.follow_up = FollowUpStatus::Closed;
            }
            (state.stage, state.follow_up.clone()) != before
        });
        info!("Pipeline torn down");
    }

    /// Ask a question about the summarized video. Only valid once the current
    /// run is [`PipelineStage::Ready`].
    ///
    /// On success the answer replaces the summary. On failure the summary is
    /// kept and the error is shown in [`PipelineState::follow_up`].
    #[instrument(skip(self, question), fields(generation = self.generation))]
    pub async fn follow_up(&self, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(RecapError::InvalidInput("question is empty".to_string()));
        }

        let generation = self.generation;
        let cancel = self.current.clone();
        let is_current =
            move |state: &PipelineState| state.generation == generation && !cancel.is_cancelled();

        // Checking for a question in flight and claiming the form happen
        // under the same lock, so concurrent callers cannot both get through.
        let mut claimed: Result<ConversationContext> = Err(RecapError::Cancelled);
        self.state.send_if_modified(|state| {
            if !is_current(state) {
                return false;
            }
            if state.follow_up == FollowUpStatus::Asking {
                claimed = Err(RecapError::InvalidInput(
                    "a follow-up question is already being answered".to_string(),
                ));
                return false;
            }
            match state.conversation() {
                Some(context) => {
                    state.follow_up = FollowUpStatus::Asking;
                    claimed = Ok(context);
                    true
                }
                None => {
                    claimed = Err(RecapError::InvalidInput(
                        "follow-up questions are available once a summary is shown".to_string(),
                    ));
                    false
                }
            }
        });
        let context = claimed?;

        let result = self
            .follow_ups
            .answer(&context, question, &self.services.config.summary, &self.current)
            .await;

        self.state.send_if_modified(|state| {
            if !is_current(state) {
                return false;
            }
            match &result {
                Ok(answer) => {
                    state.summary = Some(answer.clone());
                    state.follow_up = FollowUpStatus::Closed;
                }
                Err(e) => {
                    warn!("Follow-up failed: {}", e);
                    state.follow_up = FollowUpStatus::Failed(e.to_string());
                }
            }
            true
        });

        result
    }

    pub fn snapshot(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.current.cancel();
    }
}

/// Step that failed, with its error.
type StepResult<T> = std::result::Result<T, (Step, RecapError)>;

/// One activation of the pipeline.
struct Run {
    generation: u64,
    cancel: CancellationToken,
    state: Arc<watch::Sender<PipelineState>>,
}

impl Run {
    /// Apply `event` if this run is still the current one. The check and the
    /// write happen under the channel's lock.
    fn commit(&self, event: PipelineEvent) -> bool {
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.generation != self.generation || self.cancel.is_cancelled() {
                return false;
            }
            state.apply(event);
            accepted = true;
            true
        });
        if !accepted {
            debug!("Dropped result of stale run {}", self.generation);
        }
        accepted
    }

    async fn guarded<T>(&self, step: Step, fut: impl Future<Output = Result<T>>) -> StepResult<T> {
        or_cancelled(&self.cancel, fut)
            .await
            .and_then(|r| r)
            .map_err(|e| (step, e))
    }

    #[instrument(skip_all, fields(generation = self.generation))]
    async fn drive(self, services: Services) {
        match self.execute(&services).await {
            Ok(()) => {}
            Err((step, RecapError::Cancelled)) => {
                debug!("Run cancelled while {}", step);
            }
            Err((step, e)) => {
                warn!("Run failed while {}: {}", step, e);
                self.commit(PipelineEvent::StepFailed {
                    step,
                    message: e.to_string(),
                });
            }
        }
    }

    async fn execute(&self, services: &Services) -> StepResult<()> {
        let tabs = self
            .guarded(Step::Resolve, services.tabs.list_tabs(&self.cancel))
            .await?;
        let video = resolve_active_video(&tabs).map_err(|e| (Step::Resolve, e))?;
        if !self.commit(PipelineEvent::Resolved(video.clone())) {
            return Ok(());
        }

        let metadata = self
            .guarded(Step::Metadata, services.metadata.fetch(&video, &self.cancel))
            .await?;
        let title = metadata.title.clone();
        if !self.commit(PipelineEvent::MetadataFetched(metadata)) {
            return Ok(());
        }

        let outcome = self
            .guarded(
                Step::Transcript,
                services
                    .transcripts
                    .fetch(&video, &services.config.languages, &self.cancel),
            )
            .await?;
        let transcript = match outcome {
            TranscriptOutcome::Found(transcript) => Arc::new(transcript),
            TranscriptOutcome::Unavailable { attempted } => {
                self.commit(PipelineEvent::TranscriptUnavailable { attempted });
                return Ok(());
            }
        };
        if !self.commit(PipelineEvent::TranscriptFound(transcript.clone())) {
            return Ok(());
        }

        let summary = self
            .guarded(
                Step::Summary,
                services.summaries.summarize(
                    &transcript,
                    &title,
                    &services.config.summary,
                    &self.cancel,
                ),
            )
            .await?;
        if self.commit(PipelineEvent::Summarized(summary)) {
            info!("Run {} ready", self.generation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{CommandTabSource, Tab};
    use crate::summary::tests::CannedBackend;
    use crate::transcript::TranscriptProviderError;
    use crate::video::VideoMetadata;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Returns the queued tab lists in order, repeating the last one.
    struct QueuedTabs {
        lists: Mutex<VecDeque<Vec<Tab>>>,
        calls: AtomicUsize,
    }

    impl QueuedTabs {
        fn new(urls: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                lists: Mutex::new(urls.iter().map(|u| vec![Tab::new(*u, true)]).collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TabSource for QueuedTabs {
        async fn list_tabs(&self, _cancel: &CancellationToken) -> Result<Vec<Tab>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut lists = self.lists.lock().unwrap();
            if lists.len() > 1 {
                Ok(lists.pop_front().unwrap())
            } else {
                Ok(lists.front().cloned().unwrap_or_default())
            }
        }
    }

    struct FakeMetadata {
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeMetadata {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetadataProvider for FakeMetadata {
        async fn fetch_metadata(
            &self,
            video: &VideoReference,
            _cancel: &CancellationToken,
        ) -> Result<VideoMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RecapError::Config("yt-dlp exited with status 1".to_string()));
            }
            Ok(VideoMetadata {
                title: "Talk".to_string(),
                channel_name: "Channel".to_string(),
                channel_url: None,
                thumbnail_url: None,
                published: None,
                duration: Some("12:34".to_string()),
                view_count: Some(1_000),
                video_url: video.watch_url().to_string(),
            })
        }
    }

    #[derive(Clone, Copy)]
    enum Captions {
        Available,
        Missing,
        Broken,
    }

    /// Serves "transcript of <id>", no captions, or a hard error, optionally
    /// holding the first call until released.
    struct GatedTranscripts {
        captions: Captions,
        calls: AtomicUsize,
        started: Arc<Notify>,
        gate: Mutex<Option<Arc<Notify>>>,
    }

    impl GatedTranscripts {
        fn new(captions: Captions) -> Arc<Self> {
            Arc::new(Self {
                captions,
                calls: AtomicUsize::new(0),
                started: Arc::new(Notify::new()),
                gate: Mutex::new(None),
            })
        }

        fn hold_first_call(&self) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            *self.gate.lock().unwrap() = Some(gate.clone());
            gate
        }
    }

    #[async_trait]
    impl TranscriptProvider for GatedTranscripts {
        async fn fetch_transcript(
            &self,
            video: &VideoReference,
            language: &str,
            _cancel: &CancellationToken,
        ) -> std::result::Result<String, TranscriptProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                self.started.notify_one();
                gate.notified().await;
            }
            match self.captions {
                Captions::Available => Ok(format!("transcript of {}", video.id())),
                Captions::Missing => Err(TranscriptProviderError::NotFoundForLanguage(
                    language.to_string(),
                )),
                Captions::Broken => Err(TranscriptProviderError::Other("HTTP 500".to_string())),
            }
        }
    }

    struct Fixture {
        tabs: Arc<QueuedTabs>,
        metadata: Arc<FakeMetadata>,
        transcripts: Arc<GatedTranscripts>,
        backend: Arc<CannedBackend>,
    }

    impl Fixture {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                tabs: QueuedTabs::new(&["https://www.youtube.com/watch?v=abc123"]),
                metadata: FakeMetadata::new(false),
                transcripts: GatedTranscripts::new(Captions::Available),
                backend: CannedBackend::new(replies),
            }
        }

        fn controller(&self) -> PipelineController {
            let collaborators = Collaborators {
                tabs: self.tabs.clone(),
                metadata: self.metadata.clone(),
                transcripts: self.transcripts.clone(),
                backend: self.backend.clone(),
            };
            PipelineController::new(collaborators, RunConfig::default())
        }
    }

    fn summary_reply() -> Vec<Result<String>> {
        vec![Ok("Summary: talk about X.".to_string())]
    }

    #[tokio::test]
    async fn test_happy_path_reaches_ready() {
        let fixture = Fixture::new(summary_reply());
        let mut controller = fixture.controller();

        let run = controller.activate();
        assert_eq!(run.generation, 1);
        run.wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Ready);
        assert_eq!(state.summary.as_deref(), Some("Summary: talk about X."));
        assert_eq!(state.metadata.as_ref().unwrap().title, "Talk");
        assert_eq!(state.video.as_ref().unwrap().id(), "abc123");
        assert_eq!(state.transcript.as_ref().unwrap().text, "transcript of abc123");
        assert!(!state.summary_is_loading);
        assert!(state.error.is_none());
        assert_eq!(fixture.backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_terminal_state() {
        let fixture = Fixture::new(summary_reply());
        let mut controller = fixture.controller();
        let mut rx = controller.subscribe();

        let _run = controller.activate();
        let state = rx
            .wait_for(|state| state.stage.is_terminal())
            .await
            .unwrap()
            .clone();
        assert_eq!(state.stage, PipelineStage::Ready);
    }

    #[tokio::test]
    async fn test_no_transcript_ends_without_summary() {
        let mut fixture = Fixture::new(vec![]);
        fixture.transcripts = GatedTranscripts::new(Captions::Missing);
        let mut controller = fixture.controller();

        controller.activate().wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::NoTranscript);
        assert!(!state.summary_is_loading);
        assert!(state.summary.is_none());
        assert!(state.error.is_none());
        assert!(state.notice.unwrap().contains("No transcript available"));
        assert_eq!(fixture.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_reactivation_discards_previous_run() {
        let mut fixture = Fixture::new(summary_reply());
        fixture.tabs = QueuedTabs::new(&[
            "https://www.youtube.com/watch?v=aaaaaaaaaaa",
            "https://www.youtube.com/watch?v=bbbbbbbbbbb",
        ]);
        let gate = fixture.transcripts.hold_first_call();
        let mut controller = fixture.controller();

        let first = controller.activate();
        fixture.transcripts.started.notified().await;
        assert_eq!(controller.snapshot().stage, PipelineStage::FetchingTranscript);

        let second = controller.activate();
        second.wait().await;
        gate.notify_one();
        first.wait().await;

        let state = controller.snapshot();
        assert_eq!(state.generation, 2);
        assert_eq!(state.stage, PipelineStage::Ready);
        assert_eq!(state.video.as_ref().unwrap().id(), "bbbbbbbbbbb");
        assert_eq!(state.transcript.as_ref().unwrap().text, "transcript of bbbbbbbbbbb");

        let requests = fixture.backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].user.contains("aaaaaaaaaaa"));
    }

    #[tokio::test]
    async fn test_teardown_cancels_in_flight_run() {
        let fixture = Fixture::new(summary_reply());
        let _gate = fixture.transcripts.hold_first_call();
        let mut controller = fixture.controller();

        let run = controller.activate();
        fixture.transcripts.started.notified().await;
        controller.teardown();
        run.wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Cancelled);
        assert!(state.transcript.is_none());
        assert!(state.summary.is_none());
        assert!(!state.summary_is_loading);
        assert_eq!(fixture.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_metadata_failure_stops_the_run() {
        let mut fixture = Fixture::new(summary_reply());
        fixture.metadata = FakeMetadata::new(true);
        let mut controller = fixture.controller();

        controller.activate().wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Failed { at: Step::Metadata });
        let error = state.error.unwrap();
        assert!(error.starts_with("Could not load the video details."));
        assert!(error.contains("yt-dlp exited with status 1"));
        assert_eq!(fixture.transcripts.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_watch_tab_fails_resolution() {
        let mut fixture = Fixture::new(summary_reply());
        fixture.tabs = QueuedTabs::new(&["https://example.com/"]);
        let mut controller = fixture.controller();

        controller.activate().wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Failed { at: Step::Resolve });
        assert!(state.error.unwrap().contains("Invalid YouTube video reference"));
        assert_eq!(fixture.metadata.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_tab_list_fails_resolution() {
        let mut fixture = Fixture::new(summary_reply());
        fixture.tabs = QueuedTabs::new(&[]);
        let mut controller = fixture.controller();

        controller.activate().wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Failed { at: Step::Resolve });
        let error = state.error.unwrap();
        assert!(error.starts_with("Could not find a YouTube video to summarize."));
        assert!(error.contains("No active YouTube tab found"));
        assert!(state.video.is_none());
        assert_eq!(fixture.metadata.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_tab_bridge_fails_resolution() {
        let fixture = Fixture::new(summary_reply());
        let collaborators = Collaborators {
            tabs: Arc::new(CommandTabSource::new(None)),
            metadata: fixture.metadata.clone(),
            transcripts: fixture.transcripts.clone(),
            backend: fixture.backend.clone(),
        };
        let mut controller = PipelineController::new(collaborators, RunConfig::default());

        controller.activate().wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Failed { at: Step::Resolve });
        assert!(state.error.unwrap().contains("Browser extension unavailable"));
        assert_eq!(fixture.metadata.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_transcript_error_fails_the_run() {
        let mut fixture = Fixture::new(summary_reply());
        fixture.transcripts = GatedTranscripts::new(Captions::Broken);
        let mut controller = fixture.controller();

        controller.activate().wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Failed { at: Step::Transcript });
        let error = state.error.unwrap();
        assert!(error.starts_with("Could not load the transcript."));
        assert!(error.contains("HTTP 500"));
        assert!(state.metadata.is_some());
        assert!(state.transcript.is_none());
        assert!(!state.summary_is_loading);
        assert_eq!(fixture.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_fails_the_summary() {
        let fixture = Fixture::new(vec![Err(RecapError::Config("HTTP 500".to_string()))]);
        let mut controller = fixture.controller();

        controller.activate().wait().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Failed { at: Step::Summary });
        let error = state.error.unwrap();
        assert!(error.starts_with("Could not generate a summary. openai backend error:"));
        assert!(error.contains("HTTP 500"));
        assert!(!state.summary_is_loading);
        assert!(state.summary.is_none());
        assert_eq!(state.transcript.as_ref().unwrap().text, "transcript of abc123");
        assert_eq!(fixture.backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_teardown_while_summarizing_discards_the_summary() {
        let fixture = Fixture::new(summary_reply());
        let gate = fixture.backend.hold_next_call();
        let mut controller = fixture.controller();

        let run = controller.activate();
        fixture.backend.started.notified().await;
        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Summarizing);
        assert!(state.summary_is_loading);

        controller.teardown();
        run.wait().await;
        gate.notify_one();
        tokio::task::yield_now().await;

        let state = controller.snapshot();
        assert_eq!(state.stage, PipelineStage::Cancelled);
        assert!(state.summary.is_none());
        assert!(!state.summary_is_loading);
        assert_eq!(fixture.backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_follow_up_is_refused() {
        let fixture = Fixture::new(vec![
            Ok("Summary: talk about X.".to_string()),
            Ok("First answer.".to_string()),
            Ok("Never used.".to_string()),
        ]);
        let mut controller = fixture.controller();
        controller.activate().wait().await;

        let gate = fixture.backend.hold_next_call();
        let first = controller.follow_up("What is X?");
        let second = async {
            fixture.backend.started.notified().await;
            assert_eq!(controller.snapshot().follow_up, FollowUpStatus::Asking);
            let refused = controller.follow_up("And Y?").await;
            gate.notify_one();
            refused
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), "First answer.");
        assert!(matches!(second, Err(RecapError::InvalidInput(_))));
        assert_eq!(fixture.backend.calls(), 2);

        let state = controller.snapshot();
        assert_eq!(state.summary.as_deref(), Some("First answer."));
        assert_eq!(state.follow_up, FollowUpStatus::Closed);
    }

    #[tokio::test]
    async fn test_follow_ups_reuse_the_transcript() {
        let fixture = Fixture::new(vec![
            Ok("Summary: talk about X.".to_string()),
            Ok("First answer.".to_string()),
            Ok("Second answer.".to_string()),
        ]);
        let mut controller = fixture.controller();
        controller.activate().wait().await;

        let first = controller.follow_up("What is X?").await.unwrap();
        assert_eq!(first, "First answer.");
        let second = controller.follow_up("And Y?").await.unwrap();
        assert_eq!(second, "Second answer.");

        assert_eq!(fixture.tabs.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.metadata.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.transcripts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.backend.calls(), 3);

        let requests = fixture.backend.requests.lock().unwrap();
        assert!(requests[2].user.contains("First answer."));
        assert!(requests[2].user.contains("transcript of abc123"));

        let state = controller.snapshot();
        assert_eq!(state.summary.as_deref(), Some("Second answer."));
        assert_eq!(state.follow_up, FollowUpStatus::Closed);
        assert_eq!(state.stage, PipelineStage::Ready);
    }

    #[tokio::test]
    async fn test_failed_follow_up_keeps_summary() {
        let fixture = Fixture::new(vec![
            Ok("Summary: talk about X.".to_string()),
            Err(RecapError::Config("rate limited".to_string())),
        ]);
        let mut controller = fixture.controller();
        controller.activate().wait().await;

        let result = controller.follow_up("What is X?").await;
        assert!(matches!(result, Err(RecapError::SummaryBackend { .. })));

        let state = controller.snapshot();
        assert_eq!(state.summary.as_deref(), Some("Summary: talk about X."));
        match state.follow_up {
            FollowUpStatus::Failed(message) => assert!(message.contains("rate limited")),
            other => panic!("unexpected follow-up status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_up_requires_ready() {
        let mut fixture = Fixture::new(vec![]);
        fixture.transcripts = GatedTranscripts::new(Captions::Missing);
        let mut controller = fixture.controller();

        assert!(matches!(
            controller.follow_up("Anything?").await,
            Err(RecapError::InvalidInput(_))
        ));

        controller.activate().wait().await;
        assert!(matches!(
            controller.follow_up("Anything?").await,
            Err(RecapError::InvalidInput(_))
        ));
        assert_eq!(fixture.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_commit_is_rejected() {
        let (sender, _) = watch::channel(PipelineState::fresh(2));
        let state = Arc::new(sender);
        let stale = Run {
            generation: 1,
            cancel: CancellationToken::new(),
            state: state.clone(),
        };
        assert!(!stale.commit(PipelineEvent::Activated));
        assert_eq!(state.borrow().stage, PipelineStage::Idle);

        let cancelled = Run {
            generation: 2,
            cancel: CancellationToken::new(),
            state: state.clone(),
        };
        cancelled.cancel.cancel();
        assert!(!cancelled.commit(PipelineEvent::Activated));

        let current = Run {
            generation: 2,
            cancel: CancellationToken::new(),
            state: state.clone(),
        };
        assert!(current.commit(PipelineEvent::Activated));
        assert_eq!(state.borrow().stage, PipelineStage::Resolving);
    }

    #[test]
    fn test_url_override_replaces_browser() {
        let mut settings = Settings::default();
        settings.browser.tab_command = None;
        let collaborators =
            Collaborators::from_settings(&settings, Some("https://youtu.be/dQw4w9WgXcQ"));
        let collaborators = match collaborators {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };

        let tabs = tokio_test::block_on(collaborators.tabs.list_tabs(&CancellationToken::new()))
            .unwrap();
        assert_eq!(tabs, vec![Tab::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ", true)]);

        assert!(Collaborators::from_settings(&settings, Some("not a video")).is_err());
    }
}
