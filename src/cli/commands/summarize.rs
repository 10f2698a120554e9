//! Summarize command: run the pipeline and answer follow-up questions.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{BackendKind, Creativity, Settings};
use crate::pipeline::{PipelineController, PipelineStage};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Command-line overrides for a summary run.
#[derive(Debug, Default)]
pub struct SummarizeOptions {
    pub url: Option<String>,
    pub backend: Option<BackendKind>,
    pub model: Option<String>,
    pub creativity: Option<Creativity>,
    pub language: Option<String>,
    pub follow_up: bool,
}

impl SummarizeOptions {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(backend) = self.backend {
            settings.backend.kind = backend;
        }
        if let Some(model) = &self.model {
            settings.set_backend_model(model);
        }
        if let Some(creativity) = self.creativity {
            settings.backend.creativity = creativity;
        }
        if let Some(language) = &self.language {
            settings.summary.language = Some(language.clone());
        }
    }
}

/// Run the summarize command.
pub async fn run_summarize(options: SummarizeOptions, mut settings: Settings) -> Result<()> {
    options.apply_to(&mut settings);

    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Summarize, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'recap doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let mut controller = PipelineController::from_settings(&settings, options.url.as_deref())?;
    let mut updates = controller.subscribe();
    let run = controller.activate();

    let spinner = Output::spinner("Starting...");
    let progress = async {
        loop {
            let stage = updates.borrow_and_update().stage;
            if stage.is_terminal() {
                break;
            }
            spinner.set_message(stage.to_string());
            if updates.changed().await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = progress => {}
        _ = tokio::signal::ctrl_c() => controller.teardown(),
    }
    run.wait().await;
    spinner.finish_and_clear();

    let state = controller.snapshot();
    if let Some(metadata) = &state.metadata {
        Output::video_info(metadata);
    }

    match state.stage {
        PipelineStage::Ready => {
            Output::answer(state.summary.as_deref().unwrap_or_default());
        }
        PipelineStage::NoTranscript => {
            Output::warning(state.notice.as_deref().unwrap_or("No transcript available."));
            return Ok(());
        }
        PipelineStage::Cancelled => {
            Output::warning("Cancelled.");
            return Ok(());
        }
        _ => {
            let error = state.error.unwrap_or_else(|| format!("Stopped while {}", state.stage));
            Output::error(&error);
            return Err(anyhow::anyhow!(error));
        }
    }

    if options.follow_up {
        follow_up_loop(&controller).await?;
    }

    Ok(())
}

/// Read questions from stdin until an empty line or `exit`.
async fn follow_up_loop(controller: &PipelineController) -> Result<()> {
    println!(
        "{}",
        style("Ask a follow-up question, or press Enter to quit.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("?").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty()
            || input.eq_ignore_ascii_case("exit")
            || input.eq_ignore_ascii_case("quit")
        {
            break;
        }

        let spinner = Output::spinner("Thinking...");
        let result = controller.follow_up(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => Output::answer(&answer),
            Err(e) => Output::error(&format!("{}", e)),
        }
    }

    Ok(())
}
