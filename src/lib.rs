//! KYC onboarding and wallet flows: identity verification, wallet
//! provisioning, the PIN lifecycle and withdrawals, driven against a remote
//! verification/wallet API.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod navigation;
pub mod onboarding;
pub mod services;
pub mod session;
pub mod wallet;

#[cfg(test)]
mod testing;
