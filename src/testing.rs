//! In-memory service doubles shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

use crate::config::FlowConfig;
use crate::context::FlowContext;
use crate::error::{ServiceError, WALLET_DISABLED_MESSAGE};
use crate::navigation::RouteLog;
use crate::services::*;
use crate::session::Session;

/// Verification double. Name and address submissions echo their input;
/// BVN/NIN answers and the summary are configurable.
pub struct StubVerification {
    pub summary: Mutex<VerificationSummary>,
    pub bvn_check: Mutex<IdentityCheck>,
    pub nin_check: Mutex<IdentityCheck>,
    pub final_submission: Mutex<FinalSubmission>,
    pub fail_next: Mutex<Option<ServiceError>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl StubVerification {
    pub fn new() -> Self {
        let verified = IdentityCheck {
            verified: true,
            confidence: 98.0,
            similarity: 97.5,
        };
        Self {
            summary: Mutex::new(VerificationSummary::default()),
            bvn_check: Mutex::new(verified.clone()),
            nin_check: Mutex::new(verified),
            final_submission: Mutex::new(FinalSubmission {
                success: true,
                message: "Verification submitted".into(),
            }),
            fail_next: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(call);
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VerificationService for StubVerification {
    async fn submit_name(&self, request: &NameSubmission) -> Result<NameInfo, ServiceError> {
        self.record("submit_name")?;
        Ok(NameInfo {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
        })
    }

    async fn submit_bvn(&self, _request: &BvnSubmission) -> Result<IdentityCheck, ServiceError> {
        self.record("submit_bvn")?;
        Ok(self.bvn_check.lock().unwrap().clone())
    }

    async fn submit_nin(&self, _request: &NinSubmission) -> Result<IdentityCheck, ServiceError> {
        self.record("submit_nin")?;
        Ok(self.nin_check.lock().unwrap().clone())
    }

    async fn submit_address(
        &self,
        request: &AddressSubmission,
    ) -> Result<AddressInfo, ServiceError> {
        self.record("submit_address")?;
        Ok(AddressInfo {
            state: request.state.clone(),
            lga: request.lga.clone(),
            city: request.city.clone(),
            street: request.street.clone(),
        })
    }

    async fn summary(&self) -> Result<VerificationSummary, ServiceError> {
        self.record("summary")?;
        Ok(self.summary.lock().unwrap().clone())
    }

    async fn submit_final(&self) -> Result<FinalSubmission, ServiceError> {
        self.record("submit_final")?;
        Ok(self.final_submission.lock().unwrap().clone())
    }
}

/// Wallet double that behaves like a small server: it owns a PIN, a balance
/// and the activation flag.
pub struct StubWallet {
    pub status: Mutex<WalletStatus>,
    pub pin: Mutex<String>,
    pub fail_next: Mutex<Option<ServiceError>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub last_withdrawal: Mutex<Option<(Decimal, String)>>,
}

impl StubWallet {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(WalletStatus::default()),
            pin: Mutex::new(String::new()),
            fail_next: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            last_withdrawal: Mutex::new(None),
        }
    }

    /// An activated wallet with the given PIN and balance.
    pub fn activated(pin: &str, balance: Decimal) -> Self {
        let stub = Self::new();
        *stub.pin.lock().unwrap() = pin.to_string();
        *stub.status.lock().unwrap() = WalletStatus {
            activated: true,
            disabled: Some(false),
            bank_name: Some("GTBank".into()),
            account_number: Some("0123456789".into()),
            balance: Some(balance),
            currency: Some("NGN".into()),
        };
        stub
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    fn record(&self, call: &'static str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(call);
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_pin(&self, endpoint: &str, pin: &SecretString) -> Result<(), ServiceError> {
        if self.status.lock().unwrap().is_disabled() {
            return Err(ServiceError::rejected(endpoint, WALLET_DISABLED_MESSAGE));
        }
        if *self.pin.lock().unwrap() != pin.expose_secret() {
            return Err(ServiceError::rejected(endpoint, "Invalid PIN"));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletService for StubWallet {
    async fn wallet_status(&self) -> Result<WalletStatus, ServiceError> {
        self.record("wallet_status")?;
        Ok(self.status.lock().unwrap().clone())
    }

    async fn setup_wallet(&self, request: &WalletSetup) -> Result<MessageResponse, ServiceError> {
        self.record("setup_wallet")?;
        *self.pin.lock().unwrap() = request.pin.expose_secret().to_string();
        let mut status = self.status.lock().unwrap();
        status.activated = true;
        status.bank_name = Some(request.bank_name.clone());
        status.account_number = Some(request.account_number.clone());
        status.balance = Some(Decimal::ZERO);
        Ok(MessageResponse {
            message: "Wallet created successfully".into(),
        })
    }

    async fn validate_pin(
        &self,
        current_pin: &SecretString,
    ) -> Result<MessageResponse, ServiceError> {
        self.record("validate_pin")?;
        self.check_pin("wallet/pin/validate", current_pin)?;
        Ok(MessageResponse {
            message: "PIN is valid".into(),
        })
    }

    async fn change_pin(&self, request: &PinChange) -> Result<MessageResponse, ServiceError> {
        self.record("change_pin")?;
        self.check_pin("wallet/pin/change", &request.old_pin)?;
        *self.pin.lock().unwrap() = request.new_pin.expose_secret().to_string();
        Ok(MessageResponse {
            message: "PIN changed successfully".into(),
        })
    }

    async fn reset_pin(
        &self,
        token: &str,
        request: &PinReset,
    ) -> Result<MessageResponse, ServiceError> {
        self.record("reset_pin")?;
        if token != "valid-token" {
            return Err(ServiceError::rejected("wallet/pin/reset", "Invalid or expired token"));
        }
        *self.pin.lock().unwrap() = request.new_pin.expose_secret().to_string();
        Ok(MessageResponse {
            message: "PIN reset successfully".into(),
        })
    }

    async fn update_wallet_details(
        &self,
        request: &WalletDetailsUpdate,
    ) -> Result<MessageResponse, ServiceError> {
        self.record("update_wallet_details")?;
        let mut status = self.status.lock().unwrap();
        if let Some(bank) = &request.bank_name {
            status.bank_name = Some(bank.clone());
        }
        if let Some(account) = &request.account_number {
            status.account_number = Some(account.clone());
        }
        Ok(MessageResponse {
            message: "Wallet details updated".into(),
        })
    }

    async fn withdraw(
        &self,
        request: &WithdrawalRequest,
    ) -> Result<WithdrawalResponse, ServiceError> {
        self.record("withdraw")?;
        self.check_pin("wallet/withdraw", &request.pin)?;
        let mut status = self.status.lock().unwrap();
        let balance = status.balance.unwrap_or(Decimal::ZERO);
        if request.amount > balance {
            return Err(ServiceError::rejected("wallet/withdraw", "Insufficient funds"));
        }
        status.balance = Some(balance - request.amount);
        *self.last_withdrawal.lock().unwrap() =
            Some((request.amount, request.pin.expose_secret().to_string()));
        Ok(WithdrawalResponse {
            transaction_id: "txn-0001".into(),
        })
    }
}

/// A fully wired `FlowContext` over the doubles, with handles kept for
/// assertions.
pub struct Harness {
    pub ctx: FlowContext,
    pub session: Arc<Session>,
    pub verification: Arc<StubVerification>,
    pub wallet: Arc<StubWallet>,
    pub navigator: Arc<RouteLog>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(
            Session::with_token("test-token"),
            StubWallet::new(),
            FlowConfig::default(),
        )
    }

    pub fn signed_out() -> Self {
        Self::build(Session::new(), StubWallet::new(), FlowConfig::default())
    }

    pub fn with_wallet(wallet: StubWallet) -> Self {
        Self::build(Session::with_token("test-token"), wallet, FlowConfig::default())
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let config = FlowConfig {
            request_timeout: timeout,
            ..Default::default()
        };
        Self::build(Session::with_token("test-token"), StubWallet::new(), config)
    }

    fn build(session: Session, wallet: StubWallet, config: FlowConfig) -> Self {
        let session = Arc::new(session);
        let verification = Arc::new(StubVerification::new());
        let wallet = Arc::new(wallet);
        let navigator = Arc::new(RouteLog::new());
        let ctx = FlowContext::new(
            session.clone(),
            verification.clone(),
            wallet.clone(),
            navigator.clone(),
            config,
        );
        Self {
            ctx,
            session,
            verification,
            wallet,
            navigator,
        }
    }
}
