//! Step handlers for the four input steps.
//!
//! Each handler holds a staged draft of what the user typed. `submit`
//! validates the draft, sends it to the verification service, and only after
//! the server acknowledges it merges the result into `OnboardingProgress` and
//! marks the step complete.

use tracing::{info, warn};

use super::state::{OnboardingProgress, StepId};
use crate::context::FlowContext;
use crate::error::{FlowError, IdentityDocument};
use crate::services::{AddressSubmission, BvnSubmission, NameSubmission, NinSubmission};

/// Length of both the BVN and the NIN.
pub const IDENTITY_NUMBER_LENGTH: usize = 11;

/// Keep ASCII digits only, truncated to `max_len`.
pub fn digits_only(raw: &str, max_len: usize) -> String {
    raw.chars().filter(char::is_ascii_digit).take(max_len).collect()
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

// ── Name ────────────────────────────────────────────────────────────

/// Legal first and last name.
#[derive(Debug, Clone, Default)]
pub struct NameStep {
    pub first_name: String,
    pub last_name: String,
}

impl NameStep {
    pub fn is_ready(&self) -> bool {
        !self.first_name.trim().is_empty() && !self.last_name.trim().is_empty()
    }

    /// Submission success alone completes the step; there is no verified
    /// flag for names.
    pub async fn submit(
        &self,
        ctx: &FlowContext,
        progress: &mut OnboardingProgress,
    ) -> Result<(), FlowError> {
        if !self.is_ready() {
            return Err(FlowError::validation("First name and last name are required"));
        }
        let request = NameSubmission {
            first_name: trimmed(&self.first_name),
            last_name: trimmed(&self.last_name),
        };

        let info = ctx
            .call("submit_name", ctx.verification.submit_name(&request))
            .await?;

        progress.fields.first_name = non_empty_or(info.first_name, request.first_name);
        progress.fields.last_name = non_empty_or(info.last_name, request.last_name);
        progress.mark_complete(StepId::Name)?;
        info!(step = %StepId::Name, "Onboarding step completed");
        Ok(())
    }

    fn prefill(&mut self, progress: &OnboardingProgress) {
        fill_if_empty(&mut self.first_name, &progress.fields.first_name);
        fill_if_empty(&mut self.last_name, &progress.fields.last_name);
    }
}

// ── BVN / NIN ───────────────────────────────────────────────────────

/// An 11-digit identity number checked against the national registry.
#[derive(Debug, Clone)]
pub struct IdentityNumberStep {
    document: IdentityDocument,
    value: String,
}

impl IdentityNumberStep {
    pub fn bvn() -> Self {
        Self {
            document: IdentityDocument::Bvn,
            value: String::new(),
        }
    }

    pub fn nin() -> Self {
        Self {
            document: IdentityDocument::Nin,
            value: String::new(),
        }
    }

    pub fn document(&self) -> IdentityDocument {
        self.document
    }

    pub fn step(&self) -> StepId {
        match self.document {
            IdentityDocument::Bvn => StepId::Bvn,
            IdentityDocument::Nin => StepId::Nin,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Apply a keystroke or paste. Non-digits are dropped and anything past
    /// 11 digits is cut off.
    pub fn set_input(&mut self, raw: &str) {
        self.value = digits_only(raw, IDENTITY_NUMBER_LENGTH);
    }

    pub fn is_ready(&self) -> bool {
        !self.value.is_empty()
    }

    /// A non-match is reported with its confidence and leaves the step
    /// incomplete. There is no automatic retry.
    pub async fn submit(
        &self,
        ctx: &FlowContext,
        progress: &mut OnboardingProgress,
    ) -> Result<(), FlowError> {
        if self.value.len() != IDENTITY_NUMBER_LENGTH {
            return Err(FlowError::validation(format!(
                "{} must be exactly {IDENTITY_NUMBER_LENGTH} digits",
                self.document
            )));
        }

        let check = match self.document {
            IdentityDocument::Bvn => {
                let request = BvnSubmission {
                    bvn: self.value.clone(),
                };
                ctx.call("submit_bvn", ctx.verification.submit_bvn(&request))
                    .await?
            }
            IdentityDocument::Nin => {
                let request = NinSubmission {
                    nin: self.value.clone(),
                };
                ctx.call("submit_nin", ctx.verification.submit_nin(&request))
                    .await?
            }
        };

        if !check.verified {
            warn!(
                document = %self.document,
                confidence = check.confidence,
                similarity = check.similarity,
                "Identity number did not match"
            );
            return Err(FlowError::VerificationMismatch {
                document: self.document,
                confidence: check.confidence,
            });
        }

        match self.document {
            IdentityDocument::Bvn => {
                progress.fields.bvn = self.value.clone();
                progress.bvn_verified = true;
            }
            IdentityDocument::Nin => {
                progress.fields.nin = self.value.clone();
                progress.nin_verified = true;
            }
        }
        progress.mark_complete(self.step())?;
        info!(step = %self.step(), confidence = check.confidence, "Onboarding step completed");
        Ok(())
    }

    fn prefill(&mut self, progress: &OnboardingProgress) {
        let known = match self.document {
            IdentityDocument::Bvn => &progress.fields.bvn,
            IdentityDocument::Nin => &progress.fields.nin,
        };
        if self.value.is_empty() {
            self.set_input(known);
        }
    }
}

// ── Address ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AddressStep {
    pub state: String,
    pub lga: String,
    pub city: String,
    pub street: String,
}

impl AddressStep {
    pub fn is_ready(&self) -> bool {
        [&self.state, &self.lga, &self.city, &self.street]
            .iter()
            .all(|v| !v.trim().is_empty())
    }

    /// Acceptance by the service is all that is required.
    pub async fn submit(
        &self,
        ctx: &FlowContext,
        progress: &mut OnboardingProgress,
    ) -> Result<(), FlowError> {
        if !self.is_ready() {
            return Err(FlowError::validation("State, LGA, city and street are required"));
        }
        let request = AddressSubmission {
            state: trimmed(&self.state),
            lga: trimmed(&self.lga),
            city: trimmed(&self.city),
            street: trimmed(&self.street),
        };

        let info = ctx
            .call("submit_address", ctx.verification.submit_address(&request))
            .await?;

        let fields = &mut progress.fields;
        fields.state = non_empty_or(info.state, request.state);
        fields.lga = non_empty_or(info.lga, request.lga);
        fields.city = non_empty_or(info.city, request.city);
        fields.street = non_empty_or(info.street, request.street);
        progress.mark_complete(StepId::Address)?;
        info!(step = %StepId::Address, "Onboarding step completed");
        Ok(())
    }

    fn prefill(&mut self, progress: &OnboardingProgress) {
        let f = &progress.fields;
        fill_if_empty(&mut self.state, &f.state);
        fill_if_empty(&mut self.lga, &f.lga);
        fill_if_empty(&mut self.city, &f.city);
        fill_if_empty(&mut self.street, &f.street);
    }
}

/// Drafts for all four input steps.
#[derive(Debug, Clone)]
pub struct StepDrafts {
    pub name: NameStep,
    pub bvn: IdentityNumberStep,
    pub nin: IdentityNumberStep,
    pub address: AddressStep,
}

impl Default for StepDrafts {
    fn default() -> Self {
        Self {
            name: NameStep::default(),
            bvn: IdentityNumberStep::bvn(),
            nin: IdentityNumberStep::nin(),
            address: AddressStep::default(),
        }
    }
}

impl StepDrafts {
    /// Seed empty drafts from acknowledged data. Anything the user already
    /// typed is kept.
    pub fn prefill(&mut self, progress: &OnboardingProgress) {
        self.name.prefill(progress);
        self.bvn.prefill(progress);
        self.nin.prefill(progress);
        self.address.prefill(progress);
    }

    /// Readiness from in-memory drafts only. Informational steps are always
    /// ready.
    pub fn is_ready(&self, step: StepId) -> bool {
        match step {
            StepId::Name => self.name.is_ready(),
            StepId::Bvn => self.bvn.is_ready(),
            StepId::Nin => self.nin.is_ready(),
            StepId::Address => self.address.is_ready(),
            StepId::Welcome | StepId::Progress | StepId::Summary => true,
        }
    }
}

fn non_empty_or(preferred: String, fallback: String) -> String {
    if preferred.trim().is_empty() {
        fallback
    } else {
        preferred
    }
}

fn fill_if_empty(target: &mut String, source: &str) {
    if target.is_empty() {
        *target = source.to_string();
    }
}
