//! PIN entry: a bounded, digits-only secret.

use secrecy::{ExposeSecret, SecretString};

use crate::error::FlowError;
use crate::onboarding::digits_only;

/// Every wallet PIN is exactly this many digits.
pub const PIN_LENGTH: usize = 5;

/// A PIN being typed. Holds at most `PIN_LENGTH` ASCII digits; every update
/// re-establishes that invariant. The buffer is zeroized when replaced or
/// dropped and never shows up in `Debug` output.
pub struct PinEntry {
    digits: SecretString,
    len: usize,
}

impl PinEntry {
    pub fn new() -> Self {
        Self {
            digits: SecretString::from(String::new()),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_complete(&self) -> bool {
        self.len == PIN_LENGTH
    }

    /// Append one digit. Ignored (returns false) for non-digits or when the
    /// PIN is already full.
    pub fn push_digit(&mut self, digit: char) -> bool {
        if !digit.is_ascii_digit() || self.len >= PIN_LENGTH {
            return false;
        }
        let mut next = String::with_capacity(PIN_LENGTH);
        next.push_str(self.digits.expose_secret());
        next.push(digit);
        self.replace(next);
        true
    }

    /// Remove the last digit. Returns false when already empty.
    pub fn backspace(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        let current = self.digits.expose_secret();
        let next = current[..current.len() - 1].to_string();
        self.replace(next);
        true
    }

    /// Replace the whole value, e.g. from a paste. Non-digits are dropped and
    /// the result is truncated to `PIN_LENGTH`.
    pub fn set(&mut self, raw: &str) {
        self.replace(digits_only(raw, PIN_LENGTH));
    }

    pub fn clear(&mut self) {
        self.replace(String::new());
    }

    /// Exact string equality; both sides must be complete.
    pub fn matches(&self, other: &PinEntry) -> bool {
        self.is_complete()
            && other.is_complete()
            && self.digits.expose_secret() == other.digits.expose_secret()
    }

    /// The finished PIN, ready to send. Fails validation unless exactly
    /// `PIN_LENGTH` digits have been entered.
    pub fn to_secret(&self) -> Result<SecretString, FlowError> {
        if !self.is_complete() {
            return Err(FlowError::validation(format!(
                "PIN must be exactly {PIN_LENGTH} digits"
            )));
        }
        Ok(SecretString::from(self.digits.expose_secret().to_owned()))
    }

    fn replace(&mut self, digits: String) {
        self.len = digits.len();
        self.digits = SecretString::from(digits);
    }
}

impl Default for PinEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PinEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinEntry")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl From<&str> for PinEntry {
    fn from(raw: &str) -> Self {
        let mut entry = Self::new();
        entry.set(raw);
        entry
    }
}
