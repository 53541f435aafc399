//! StepSequencer: the linear onboarding controller.
//!
//! Fetches authoritative progress once at mount, then drives the user through
//! the steps. Input steps complete only through their handlers.

use tracing::{debug, info};

use super::handlers::StepDrafts;
use super::state::{OnboardingProgress, StepId};
use crate::context::FlowContext;
use crate::error::FlowError;
use crate::navigation::Route;

/// Lifecycle of the sequencer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerPhase {
    /// Not mounted, or mounted without a session.
    Idle,
    /// Showing onboarding steps.
    Active,
    /// Left for the wallet area because everything was already complete.
    Redirected,
    /// Final submission accepted.
    Finished,
}

impl std::fmt::Display for SequencerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Redirected => "redirected",
            Self::Finished => "finished",
        };
        write!(f, "{s}")
    }
}

/// Where `mount` left the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// No session; nothing fetched.
    Idle,
    /// Nothing done yet; starts at welcome.
    Fresh,
    /// Some steps already done; starts at the progress screen.
    Resumed,
    /// All four input steps done; onboarding bypassed.
    RedirectedToWallet,
}

pub struct StepSequencer {
    ctx: FlowContext,
    phase: SequencerPhase,
    progress: OnboardingProgress,
    drafts: StepDrafts,
    error: Option<FlowError>,
}

impl StepSequencer {
    pub fn new(ctx: FlowContext) -> Self {
        Self {
            ctx,
            phase: SequencerPhase::Idle,
            progress: OnboardingProgress::default(),
            drafts: StepDrafts::default(),
            error: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn phase(&self) -> SequencerPhase {
        self.phase
    }

    pub fn current_step(&self) -> StepId {
        self.progress.current_step
    }

    pub fn progress(&self) -> &OnboardingProgress {
        &self.progress
    }

    pub fn percent_complete(&self) -> u8 {
        self.progress.percent_complete()
    }

    pub fn drafts(&self) -> &StepDrafts {
        &self.drafts
    }

    /// Edit the staged input. Nothing here reaches the progress record until
    /// the matching submit is acknowledged.
    pub fn drafts_mut(&mut self) -> &mut StepDrafts {
        &mut self.drafts
    }

    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    // ── Mount ───────────────────────────────────────────────────────

    /// Reconcile with the server.
    ///
    /// Without a session this does nothing. With one, the summary decides the
    /// entry point: all input steps done redirects to the wallet area, some
    /// done resumes at the progress screen (not at the next unfinished step),
    /// none done starts at welcome.
    pub async fn mount(&mut self) -> Result<MountOutcome, FlowError> {
        if !self.ctx.is_authenticated() {
            debug!("Sequencer mounted without a session; staying idle");
            self.phase = SequencerPhase::Idle;
            return Ok(MountOutcome::Idle);
        }

        let ctx = self.ctx.clone();
        let summary = self.record(ctx.call("summary", ctx.verification.summary()).await)?;

        self.progress.absorb_summary(&summary);
        self.drafts.prefill(&self.progress);

        if self.progress.all_input_complete() {
            info!("All verification steps already complete; redirecting to wallet");
            self.phase = SequencerPhase::Redirected;
            self.ctx.navigator.navigate(Route::WalletArea);
            return Ok(MountOutcome::RedirectedToWallet);
        }

        self.phase = SequencerPhase::Active;
        if self.progress.completed().is_empty() {
            self.set_step(StepId::Welcome);
            Ok(MountOutcome::Fresh)
        } else {
            self.set_step(StepId::Progress);
            Ok(MountOutcome::Resumed)
        }
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Advance one step. A no-op at the last step or while the current
    /// step's draft is incomplete. Returns whether the step changed.
    pub fn go_next(&mut self) -> bool {
        if self.phase != SequencerPhase::Active {
            return false;
        }
        let current = self.current_step();
        if !self.is_step_ready(current) {
            debug!(step = %current, "Forward navigation blocked: step not ready");
            return false;
        }
        match current.next() {
            Some(next) => {
                self.set_step(next);
                true
            }
            None => false,
        }
    }

    /// Go back one step. A no-op at the first step.
    pub fn go_prev(&mut self) -> bool {
        if self.phase != SequencerPhase::Active {
            return false;
        }
        match self.current_step().prev() {
            Some(prev) => {
                self.set_step(prev);
                true
            }
            None => false,
        }
    }

    pub fn jump_to(&mut self, step: StepId) -> Result<(), FlowError> {
        if self.phase != SequencerPhase::Active {
            return Err(FlowError::invalid_action(self.phase, "change step"));
        }
        self.set_step(step);
        Ok(())
    }

    /// "Get started" on the welcome screen goes straight to the name step,
    /// skipping the progress screen.
    pub fn get_started(&mut self) -> Result<(), FlowError> {
        if self.current_step() != StepId::Welcome {
            return Err(FlowError::invalid_action(self.current_step(), "get started"));
        }
        self.jump_to(StepId::Name)
    }

    pub fn mark_step_complete(&mut self, step: StepId) -> Result<bool, FlowError> {
        self.progress.mark_complete(step)
    }

    /// False iff a required field of `step` is empty in the in-memory drafts.
    pub fn is_step_ready(&self, step: StepId) -> bool {
        self.drafts.is_ready(step)
    }

    fn set_step(&mut self, step: StepId) {
        debug!(from = %self.progress.current_step, to = %step, "Onboarding step changed");
        self.progress.current_step = step;
    }

    // ── Submissions ─────────────────────────────────────────────────

    pub async fn submit_name(&mut self) -> Result<(), FlowError> {
        self.ensure_active("submit name")?;
        let result = self.drafts.name.submit(&self.ctx, &mut self.progress).await;
        self.record(result)?;
        self.advance_from(StepId::Name);
        Ok(())
    }

    pub async fn submit_bvn(&mut self) -> Result<(), FlowError> {
        self.ensure_active("submit BVN")?;
        let result = self.drafts.bvn.submit(&self.ctx, &mut self.progress).await;
        self.record(result)?;
        self.advance_from(StepId::Bvn);
        Ok(())
    }

    pub async fn submit_nin(&mut self) -> Result<(), FlowError> {
        self.ensure_active("submit NIN")?;
        let result = self.drafts.nin.submit(&self.ctx, &mut self.progress).await;
        self.record(result)?;
        self.advance_from(StepId::Nin);
        Ok(())
    }

    pub async fn submit_address(&mut self) -> Result<(), FlowError> {
        self.ensure_active("submit address")?;
        let result = self
            .drafts
            .address
            .submit(&self.ctx, &mut self.progress)
            .await;
        self.record(result)?;
        self.advance_from(StepId::Address);
        Ok(())
    }

    /// Submit the completed verification from the summary step. On success
    /// the user is sent to the wallet area.
    pub async fn finish(&mut self) -> Result<String, FlowError> {
        self.ensure_active("finish onboarding")?;
        if self.current_step() != StepId::Summary {
            return self.record(Err(FlowError::invalid_action(
                self.current_step(),
                "finish onboarding",
            )));
        }
        if !self.progress.all_input_complete() {
            return self.record(Err(FlowError::validation(
                "Please complete all verification steps before submitting",
            )));
        }

        let ctx = self.ctx.clone();
        let outcome = self.record(ctx.call("submit_final", ctx.verification.submit_final()).await)?;
        if !outcome.success {
            return self.record(Err(FlowError::Server(outcome.message)));
        }

        info!("Verification submitted");
        self.phase = SequencerPhase::Finished;
        self.ctx.navigator.navigate(Route::WalletArea);
        Ok(outcome.message)
    }

    fn ensure_active(&mut self, action: &str) -> Result<(), FlowError> {
        if self.phase == SequencerPhase::Active {
            Ok(())
        } else {
            self.record(Err(FlowError::invalid_action(self.phase, action)))
        }
    }

    fn advance_from(&mut self, step: StepId) {
        if let Some(next) = step.next() {
            self.set_step(next);
        }
    }

    /// Keep the latest error as local state; a success clears it.
    fn record<T>(&mut self, result: Result<T, FlowError>) -> Result<T, FlowError> {
        match &result {
            Ok(_) => self.error = None,
            Err(e) => self.error = Some(e.clone()),
        }
        result
    }
}
