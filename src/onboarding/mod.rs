//! Identity-verification onboarding.
//!
//! A linear sequence of welcome, progress, four input steps (legal name, BVN,
//! NIN, address) and a summary. Progress is reconciled against the
//! verification service once at mount; each input step is merged into the
//! progress record only after the service acknowledges it.

pub mod handlers;
pub mod sequencer;
pub mod state;

pub use handlers::{AddressStep, IdentityNumberStep, NameStep, StepDrafts, digits_only};
pub use sequencer::{MountOutcome, SequencerPhase, StepSequencer};
pub use state::{OnboardingFields, OnboardingProgress, StepId};
