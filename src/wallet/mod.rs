//! Wallet flows: provisioning, PIN lifecycle, bank details and withdrawal.
//!
//! Every flow owns a `FlowContext` clone and shares one `WalletStatusStore`,
//! which is the client's advisory copy of the server's wallet state.

pub mod credentials;
pub mod details;
pub mod guard;
pub mod pin;
pub mod provisioning;
pub mod status;
pub mod withdrawal;

pub use credentials::{ChangePinFlow, ChangePinStep, PinResetNotice, redeem_reset_token};
pub use details::WalletDetailsEditor;
pub use guard::{CloseGuard, CloseOutcome};
pub use pin::{PIN_LENGTH, PinEntry};
pub use provisioning::{Acknowledgement, ProvisioningStep, WalletProvisioning};
pub use status::{WalletEvent, WalletStatusStore};
pub use withdrawal::{WithdrawalFlow, WithdrawalReceipt, WithdrawalStep, validate_amount};

use crate::onboarding::digits_only;

/// Nigerian NUBAN account numbers are ten digits.
pub const ACCOUNT_NUMBER_LENGTH: usize = 10;

/// Banks offered in the bank picker.
pub const SUPPORTED_BANKS: &[&str] = &[
    "Access Bank",
    "Fidelity Bank",
    "First Bank of Nigeria",
    "GTBank",
    "Kuda Bank",
    "Opay",
    "Stanbic IBTC",
    "Sterling Bank",
    "UBA",
    "Union Bank",
    "Wema Bank",
    "Zenith Bank",
];

/// Strip non-digits and cap at `ACCOUNT_NUMBER_LENGTH`.
pub fn normalize_account_number(raw: &str) -> String {
    digits_only(raw, ACCOUNT_NUMBER_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_numbers_are_digits_capped_at_ten() {
        assert_eq!(normalize_account_number("0123 456 789"), "0123456789");
        assert_eq!(normalize_account_number("01234567891234"), "0123456789");
        assert_eq!(normalize_account_number("abc"), "");
    }

    #[test]
    fn bank_list_is_sorted_and_unique() {
        let mut sorted = SUPPORTED_BANKS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, SUPPORTED_BANKS);
    }
}
