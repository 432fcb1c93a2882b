//! TourEngine — one per mounted page. Decides whether the page's tour runs,
//! walks the filtered steps, and records the outcome in the progress store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::progress::ProgressStore;
use crate::progress::model::{ProgressPatch, is_valid_page_id};

use super::guardian::{ClickGuardian, GuardHandle};
use super::resolver::{TargetResolver, filter_steps};
use super::state::{TourEngineState, TourOutcome, TourPhase};
use super::step::{ConsentPrompt, Step};

/// Fired at most once, on the matching terminal transition.
pub type TourCallback = Box<dyn FnOnce() + Send>;

/// What the page asks of its tour.
#[derive(Default)]
pub struct TourOptions {
    /// Forces the start decision, ignoring stored progress.
    pub run_override: Option<bool>,
    /// Ask before showing any step.
    pub consent: Option<ConsentPrompt>,
    pub on_complete: Option<TourCallback>,
    pub on_skip: Option<TourCallback>,
}

impl TourOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_override(mut self, run: bool) -> Self {
        self.run_override = Some(run);
        self
    }

    pub fn with_consent(mut self, prompt: ConsentPrompt) -> Self {
        self.consent = Some(prompt);
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_skip(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_skip = Some(Box::new(f));
        self
    }
}

/// Lifecycle events reported by the tour renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourEventKind {
    Advance,
    Rewind,
    Close,
    Skip,
    Finish,
    TargetNotFound,
}

/// A renderer event, tagged with the step index it happened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourEvent {
    pub kind: TourEventKind,
    pub index: usize,
}

impl TourEvent {
    pub fn new(kind: TourEventKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// Answer to the consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentAction {
    Start,
    Skip,
}

/// What the renderer should currently show.
#[derive(Debug, Clone, Copy)]
pub struct RenderView<'a> {
    pub steps: &'a [Step],
    pub current_index: usize,
    pub is_running: bool,
    /// Present only while waiting for consent.
    pub consent: Option<&'a ConsentPrompt>,
}

pub struct TourEngine {
    page_id: String,
    steps: Vec<Step>,
    run_override: Option<bool>,
    consent: Option<ConsentPrompt>,
    on_complete: Option<TourCallback>,
    on_skip: Option<TourCallback>,
    store: Arc<ProgressStore>,
    resolver: Arc<dyn TargetResolver>,
    guardian: Option<ClickGuardian>,
    guard: Option<GuardHandle>,
    state: TourEngineState,
    persist: Option<JoinHandle<()>>,
}

impl TourEngine {
    /// Mount a tour for `page_id`. Nothing is decided until [`evaluate`](Self::evaluate).
    pub fn new(
        page_id: &str,
        steps: Vec<Step>,
        options: TourOptions,
        store: Arc<ProgressStore>,
        resolver: Arc<dyn TargetResolver>,
    ) -> Self {
        Self {
            page_id: page_id.to_string(),
            steps,
            run_override: options.run_override,
            consent: options.consent,
            on_complete: options.on_complete,
            on_skip: options.on_skip,
            store,
            resolver,
            guardian: None,
            guard: None,
            state: TourEngineState::default(),
            persist: None,
        }
    }

    /// Suppress stray pointer input through `guardian` while running.
    pub fn with_guardian(mut self, guardian: ClickGuardian) -> Self {
        self.guardian = Some(guardian);
        self
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn phase(&self) -> TourPhase {
        self.state.phase
    }

    pub fn state(&self) -> &TourEngineState {
        &self.state
    }

    pub fn outcome(&self) -> Option<TourOutcome> {
        self.state.outcome
    }

    /// The full, unfiltered step list the page supplied.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.state.current_step()
    }

    pub fn view(&self) -> RenderView<'_> {
        RenderView {
            steps: &self.state.filtered_steps,
            current_index: self.state.step_index,
            is_running: self.state.phase == TourPhase::Running,
            consent: match self.state.phase {
                TourPhase::AwaitingConsent => self.consent.as_ref(),
                _ => None,
            },
        }
    }

    /// Make the start decision if it is due. Safe to call on every render.
    ///
    /// Does nothing until the store's session load has settled, and nothing
    /// after the decision has been made once.
    pub async fn evaluate(&mut self) -> TourPhase {
        if self.state.has_started || !self.store.is_ready() {
            return self.state.phase;
        }

        let should_run = self.should_run().await;
        self.state.mark_started();
        info!(page_id = %self.page_id, should_run, "Tour start decision");

        if !should_run {
            return self.state.phase;
        }

        if self.consent.is_some() {
            if let Err(e) = self.state.await_consent() {
                warn!(page_id = %self.page_id, "Failed to enter consent: {}", e);
            }
        } else {
            self.begin();
        }
        self.state.phase
    }

    async fn should_run(&self) -> bool {
        if !is_valid_page_id(&self.page_id) || self.steps.is_empty() {
            return false;
        }
        if let Some(run) = self.run_override {
            return run;
        }
        !self.store.is_completed(&self.page_id).await && !self.store.is_skipped(&self.page_id).await
    }

    /// Answer the consent prompt.
    pub fn consent(&mut self, action: ConsentAction) -> TourPhase {
        if self.state.phase != TourPhase::AwaitingConsent {
            debug!(page_id = %self.page_id, phase = %self.state.phase, "Consent ignored");
            return self.state.phase;
        }
        match action {
            ConsentAction::Start => self.begin(),
            ConsentAction::Skip => self.finish(TourOutcome::Skipped),
        }
        self.state.phase
    }

    /// Apply a renderer event.
    ///
    /// Step-moving events must carry the current index; anything else is a
    /// late event for a step already left and is dropped.
    pub fn handle(&mut self, event: TourEvent) -> TourPhase {
        if self.state.phase != TourPhase::Running {
            debug!(page_id = %self.page_id, ?event, phase = %self.state.phase, "Tour event ignored");
            return self.state.phase;
        }

        match event.kind {
            TourEventKind::Close | TourEventKind::Skip => {
                self.finish(TourOutcome::Skipped);
            }
            _ if event.index != self.state.step_index => {
                debug!(
                    page_id = %self.page_id,
                    ?event,
                    current = self.state.step_index,
                    "Stale tour event ignored"
                );
            }
            TourEventKind::Advance | TourEventKind::Finish | TourEventKind::TargetNotFound => {
                if event.kind == TourEventKind::TargetNotFound {
                    debug!(page_id = %self.page_id, index = event.index, "Step target missing, skipping");
                }
                if self.state.advance().is_none() {
                    self.finish(TourOutcome::Completed);
                }
            }
            TourEventKind::Rewind => {
                self.state.rewind();
            }
        }
        self.state.phase
    }

    /// Filter steps against the page as it is now and start running.
    fn begin(&mut self) {
        let filtered = filter_steps(&self.steps, self.resolver.as_ref());
        if filtered.is_empty() {
            info!(page_id = %self.page_id, "No step targets present, finishing tour");
            self.finish(TourOutcome::Completed);
            return;
        }

        let count = filtered.len();
        if let Err(e) = self.state.run(filtered) {
            warn!(page_id = %self.page_id, "Failed to start tour: {}", e);
            return;
        }
        self.guard = self.guardian.as_ref().map(|g| g.engage(&self.page_id));
        info!(page_id = %self.page_id, steps = count, "Tour running");
    }

    fn finish(&mut self, outcome: TourOutcome) {
        if let Err(e) = self.state.finish(outcome) {
            warn!(page_id = %self.page_id, "Failed to finish tour: {}", e);
            return;
        }
        self.guard = None;
        info!(page_id = %self.page_id, ?outcome, "Tour finished");

        let (fire, discard, patch) = match outcome {
            TourOutcome::Completed => (
                self.on_complete.take(),
                self.on_skip.take(),
                ProgressPatch::completed(),
            ),
            TourOutcome::Skipped => (
                self.on_skip.take(),
                self.on_complete.take(),
                ProgressPatch::skipped(),
            ),
        };
        drop(discard);
        self.persist(patch);
        if let Some(callback) = fire {
            callback();
        }
    }

    fn persist(&mut self, patch: ProgressPatch) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(page_id = %self.page_id, "No async runtime, tour progress not persisted");
            return;
        };
        let store = Arc::clone(&self.store);
        let page_id = self.page_id.clone();
        self.persist = Some(runtime.spawn(async move {
            // The store logs failures; the finished phase stands either way.
            let _ = store.update(&page_id, patch).await;
        }));
    }

    /// Wait for the terminal progress write, if one was issued.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.persist.take() {
            if let Err(e) = handle.await {
                warn!(page_id = %self.page_id, "Tour progress write task failed: {}", e);
            }
        }
    }

    /// Tear down the mount: releases the click guardian and drops callbacks
    /// that have not fired. An in-flight progress write still completes.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for TourEngine {
    fn drop(&mut self) {
        self.guard = None;
        self.on_complete = None;
        self.on_skip = None;
        debug!(page_id = %self.page_id, phase = %self.state.phase, "Tour unmounted");
    }
}
