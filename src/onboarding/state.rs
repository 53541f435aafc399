//! Onboarding step model and the server-reconciled progress record.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::services::VerificationSummary;

/// The onboarding steps, in their fixed order.
///
/// Welcome → Progress → Name → Bvn → Nin → Address → Summary. The four
/// middle ones collect user data; the rest are informational.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Welcome,
    Progress,
    Name,
    Bvn,
    Nin,
    Address,
    Summary,
}

impl StepId {
    pub const FIRST: StepId = StepId::Welcome;
    pub const LAST: StepId = StepId::Summary;

    pub const INPUT_STEPS: [StepId; 4] = [StepId::Name, StepId::Bvn, StepId::Nin, StepId::Address];

    /// Numeric id, 0 through 6.
    pub fn index(&self) -> u8 {
        match self {
            Self::Welcome => 0,
            Self::Progress => 1,
            Self::Name => 2,
            Self::Bvn => 3,
            Self::Nin => 4,
            Self::Address => 5,
            Self::Summary => 6,
        }
    }

    pub fn from_index(index: u8) -> Option<StepId> {
        use StepId::*;
        match index {
            0 => Some(Welcome),
            1 => Some(Progress),
            2 => Some(Name),
            3 => Some(Bvn),
            4 => Some(Nin),
            5 => Some(Address),
            6 => Some(Summary),
            _ => None,
        }
    }

    pub fn next(&self) -> Option<StepId> {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(&self) -> Option<StepId> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Whether this step collects user-supplied data.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Name | Self::Bvn | Self::Nin | Self::Address)
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Progress => "progress",
            Self::Name => "name",
            Self::Bvn => "bvn",
            Self::Nin => "nin",
            Self::Address => "address",
            Self::Summary => "summary",
        };
        write!(f, "{s}")
    }
}

/// Identity data acknowledged by the verification service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingFields {
    pub first_name: String,
    pub last_name: String,
    pub bvn: String,
    pub nin: String,
    pub state: String,
    pub lga: String,
    pub city: String,
    pub street: String,
}

/// Progress through onboarding for the active session.
///
/// Built from the server summary at mount and only ever merged forward:
/// `completed` never shrinks.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingProgress {
    pub current_step: StepId,
    completed: BTreeSet<StepId>,
    pub fields: OnboardingFields,
    pub bvn_verified: bool,
    pub nin_verified: bool,
}

impl Default for OnboardingProgress {
    fn default() -> Self {
        Self {
            current_step: StepId::Welcome,
            completed: BTreeSet::new(),
            fields: OnboardingFields::default(),
            bvn_verified: false,
            nin_verified: false,
        }
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl OnboardingProgress {
    pub fn from_summary(summary: &VerificationSummary) -> Self {
        let mut progress = Self::default();
        progress.absorb_summary(summary);
        progress
    }

    /// Merge authoritative server state. Fields the server reports replace
    /// local ones; completion is derived and unioned in.
    ///
    /// Name is complete when both names are present, BVN/NIN when verified,
    /// address when the state is present.
    pub fn absorb_summary(&mut self, summary: &VerificationSummary) {
        let fields = &mut self.fields;
        for (target, source) in [
            (&mut fields.first_name, &summary.first_name),
            (&mut fields.last_name, &summary.last_name),
            (&mut fields.bvn, &summary.bvn),
            (&mut fields.nin, &summary.nin),
            (&mut fields.state, &summary.state),
            (&mut fields.lga, &summary.lga),
            (&mut fields.city, &summary.city),
            (&mut fields.street, &summary.street),
        ] {
            if let Some(value) = filled(source) {
                *target = value.to_string();
            }
        }

        self.bvn_verified |= summary.bvn_verified;
        self.nin_verified |= summary.nin_verified;

        if filled(&summary.first_name).is_some() && filled(&summary.last_name).is_some() {
            self.completed.insert(StepId::Name);
        }
        if summary.bvn_verified {
            self.completed.insert(StepId::Bvn);
        }
        if summary.nin_verified {
            self.completed.insert(StepId::Nin);
        }
        if filled(&summary.state).is_some() {
            self.completed.insert(StepId::Address);
        }
    }

    /// Whether the acknowledged data allows `step` to count as complete.
    pub fn can_complete(&self, step: StepId) -> bool {
        let f = &self.fields;
        match step {
            StepId::Name => !f.first_name.is_empty() && !f.last_name.is_empty(),
            StepId::Bvn => self.bvn_verified,
            StepId::Nin => self.nin_verified,
            StepId::Address => {
                !f.state.is_empty() && !f.lga.is_empty() && !f.city.is_empty() && !f.street.is_empty()
            }
            StepId::Welcome | StepId::Progress | StepId::Summary => false,
        }
    }

    /// Idempotent insert into the completed set. Returns whether the step was
    /// newly added.
    pub fn mark_complete(&mut self, step: StepId) -> Result<bool, FlowError> {
        if !step.is_input() {
            return Err(FlowError::invalid_action(step, "mark an informational step complete"));
        }
        if !self.can_complete(step) {
            return Err(FlowError::validation(format!(
                "The {step} step is missing required information"
            )));
        }
        Ok(self.completed.insert(step))
    }

    pub fn is_complete(&self, step: StepId) -> bool {
        self.completed.contains(&step)
    }

    pub fn completed(&self) -> &BTreeSet<StepId> {
        &self.completed
    }

    pub fn completed_input_steps(&self) -> usize {
        StepId::INPUT_STEPS
            .iter()
            .filter(|s| self.completed.contains(s))
            .count()
    }

    pub fn all_input_complete(&self) -> bool {
        self.completed_input_steps() == StepId::INPUT_STEPS.len()
    }

    /// Completed input steps as a percentage of the four.
    pub fn percent_complete(&self) -> u8 {
        (self.completed_input_steps() * 100 / StepId::INPUT_STEPS.len()) as u8
    }
}
