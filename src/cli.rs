//! Console: a stdin/stdout driver for the onboarding and wallet flows.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::context::FlowContext;
use crate::error::FlowError;
use crate::navigation::Route;
use crate::onboarding::{MountOutcome, SequencerPhase, StepId, StepSequencer};
use crate::session::Session;
use crate::wallet::{
    Acknowledgement, ChangePinFlow, CloseOutcome, PinEntry, PinResetNotice, ProvisioningStep,
    SUPPORTED_BANKS, WalletDetailsEditor, WalletProvisioning, WalletStatusStore, WithdrawalFlow,
    redeem_reset_token,
};

const HELP: &str = "\
Onboarding:
  start                              load progress from the server
  next | back | goto <step>          move between steps
  get-started                        skip from welcome to the name step
  name <first> <last>
  bvn <11 digits> | nin <11 digits>
  address <state> | <lga> | <city> | <street>
  progress                           show completed steps
  finish                             submit verification
Wallet:
  wallet                             show wallet status
  banks                              list supported banks
  setup <bank> <account> <pin> <confirm-pin>
  close                              leave wallet setup
  change-pin <old> <new> <confirm>
  forgot-pin
  reset-pin <token> <new> <confirm>
  update-bank <bank> | update-account <account>
  withdraw <amount> <pin>
Session:
  login <token> | logout | help | quit";

/// One console line, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Login(String),
    Logout,
    Start,
    Next,
    Back,
    Goto(StepId),
    GetStarted,
    Name { first: String, last: String },
    Bvn(String),
    Nin(String),
    Address {
        state: String,
        lga: String,
        city: String,
        street: String,
    },
    Progress,
    Finish,
    Wallet,
    Banks,
    Setup {
        bank: String,
        account: String,
        pin: String,
        confirm: String,
    },
    Close,
    ChangePin {
        old: String,
        new: String,
        confirm: String,
    },
    ForgotPin,
    ResetPin {
        token: String,
        new: String,
        confirm: String,
    },
    UpdateBank(String),
    UpdateAccount(String),
    Withdraw { amount: String, pin: String },
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, FlowError> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match verb.to_ascii_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "quit" | "exit" | "/quit" => Command::Quit,
            "login" => Command::Login(single(&args, "login <token>")?),
            "logout" => Command::Logout,
            "start" => Command::Start,
            "next" => Command::Next,
            "back" => Command::Back,
            "goto" => Command::Goto(parse_step(&single(&args, "goto <step>")?)?),
            "get-started" => Command::GetStarted,
            "name" => match args.as_slice() {
                [first, last @ ..] if !last.is_empty() => Command::Name {
                    first: first.to_string(),
                    last: last.join(" "),
                },
                _ => return Err(usage("name <first> <last>")),
            },
            "bvn" => Command::Bvn(single(&args, "bvn <11 digits>")?),
            "nin" => Command::Nin(single(&args, "nin <11 digits>")?),
            "address" => {
                let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
                match parts.as_slice() {
                    [state, lga, city, street] => Command::Address {
                        state: state.to_string(),
                        lga: lga.to_string(),
                        city: city.to_string(),
                        street: street.to_string(),
                    },
                    _ => return Err(usage("address <state> | <lga> | <city> | <street>")),
                }
            }
            "progress" => Command::Progress,
            "finish" | "submit" => Command::Finish,
            "wallet" => Command::Wallet,
            "banks" => Command::Banks,
            // The bank name may contain spaces; the last three words are
            // always account, PIN and confirmation.
            "setup" => match args.as_slice() {
                [bank @ .., account, pin, confirm] if !bank.is_empty() => Command::Setup {
                    bank: bank.join(" "),
                    account: account.to_string(),
                    pin: pin.to_string(),
                    confirm: confirm.to_string(),
                },
                _ => return Err(usage("setup <bank> <account> <pin> <confirm-pin>")),
            },
            "close" => Command::Close,
            "change-pin" => match args.as_slice() {
                [old, new, confirm] => Command::ChangePin {
                    old: old.to_string(),
                    new: new.to_string(),
                    confirm: confirm.to_string(),
                },
                _ => return Err(usage("change-pin <old> <new> <confirm>")),
            },
            "forgot-pin" => Command::ForgotPin,
            "reset-pin" => match args.as_slice() {
                [token, new, confirm] => Command::ResetPin {
                    token: token.to_string(),
                    new: new.to_string(),
                    confirm: confirm.to_string(),
                },
                _ => return Err(usage("reset-pin <token> <new> <confirm>")),
            },
            "update-bank" if !rest.is_empty() => Command::UpdateBank(rest.to_string()),
            "update-bank" => return Err(usage("update-bank <bank>")),
            "update-account" => Command::UpdateAccount(single(&args, "update-account <account>")?),
            "withdraw" => match args.as_slice() {
                [amount, pin] => Command::Withdraw {
                    amount: amount.to_string(),
                    pin: pin.to_string(),
                },
                _ => return Err(usage("withdraw <amount> <pin>")),
            },
            other => {
                return Err(FlowError::validation(format!(
                    "Unknown command '{other}'. Type 'help' for a list."
                )));
            }
        };
        Ok(command)
    }
}

fn usage(text: &str) -> FlowError {
    FlowError::validation(format!("Usage: {text}"))
}

fn single(args: &[&str], text: &str) -> Result<String, FlowError> {
    match args {
        [value] => Ok(value.to_string()),
        _ => Err(usage(text)),
    }
}

fn parse_step(raw: &str) -> Result<StepId, FlowError> {
    if let Ok(index) = raw.parse::<u8>() {
        return StepId::from_index(index)
            .ok_or_else(|| FlowError::validation(format!("No step {index}")));
    }
    (0..=StepId::LAST.index())
        .filter_map(StepId::from_index)
        .find(|step| step.to_string() == raw.to_ascii_lowercase())
        .ok_or_else(|| FlowError::validation(format!("Unknown step '{raw}'")))
}

/// What the console should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Exit,
}

/// Holds one instance of every flow and routes commands to them.
pub struct Console {
    ctx: FlowContext,
    session: Arc<Session>,
    store: Arc<WalletStatusStore>,
    sequencer: StepSequencer,
    provisioning: WalletProvisioning,
    change_pin: ChangePinFlow,
    withdrawal: WithdrawalFlow,
    details: WalletDetailsEditor,
}

impl Console {
    pub fn new(ctx: FlowContext, session: Arc<Session>) -> Self {
        let store = WalletStatusStore::new();
        Self {
            sequencer: StepSequencer::new(ctx.clone()),
            provisioning: WalletProvisioning::new(ctx.clone(), store.clone()),
            change_pin: ChangePinFlow::new(ctx.clone(), store.clone()),
            withdrawal: WithdrawalFlow::new(ctx.clone(), store.clone()),
            details: WalletDetailsEditor::new(ctx.clone(), store.clone()),
            ctx,
            session,
            store,
        }
    }

    /// Read commands from stdin until EOF or `quit`.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        eprint!("> ");
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                eprint!("> ");
                continue;
            }
            match self.handle_line(&line).await {
                Reply::Print(text) => println!("\n{text}\n"),
                Reply::Exit => break,
            }
            eprint!("> ");
        }
        Ok(())
    }

    /// Parse and execute one line. Errors are rendered, never propagated.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => return Reply::Print(format!("Error: {e}")),
        };
        if command == Command::Quit {
            return Reply::Exit;
        }
        match self.execute(command).await {
            Ok(text) => Reply::Print(text),
            Err(e) => Reply::Print(format!("Error: {e}")),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<String, FlowError> {
        match command {
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
            Command::Login(token) => {
                self.session.sign_in(token);
                Ok("Signed in.".into())
            }
            Command::Logout => {
                self.session.sign_out();
                Ok("Signed out.".into())
            }
            Command::Start => self.start().await,
            Command::Next => {
                self.ensure_mounted().await?;
                if self.sequencer.go_next() {
                    Ok(self.describe_step())
                } else {
                    Err(FlowError::validation(format!(
                        "Cannot move past '{}' yet",
                        self.sequencer.current_step()
                    )))
                }
            }
            Command::Back => {
                self.ensure_mounted().await?;
                self.sequencer.go_prev();
                Ok(self.describe_step())
            }
            Command::Goto(step) => {
                self.ensure_mounted().await?;
                self.sequencer.jump_to(step)?;
                Ok(self.describe_step())
            }
            Command::GetStarted => {
                self.ensure_mounted().await?;
                self.sequencer.get_started()?;
                Ok(self.describe_step())
            }
            Command::Name { first, last } => {
                self.enter_step(StepId::Name).await?;
                let draft = &mut self.sequencer.drafts_mut().name;
                draft.first_name = first;
                draft.last_name = last;
                self.sequencer.submit_name().await?;
                Ok(format!("Name saved. {}", self.describe_step()))
            }
            Command::Bvn(raw) => {
                self.enter_step(StepId::Bvn).await?;
                self.sequencer.drafts_mut().bvn.set_input(&raw);
                self.sequencer.submit_bvn().await?;
                Ok(format!("BVN verified. {}", self.describe_step()))
            }
            Command::Nin(raw) => {
                self.enter_step(StepId::Nin).await?;
                self.sequencer.drafts_mut().nin.set_input(&raw);
                self.sequencer.submit_nin().await?;
                Ok(format!("NIN verified. {}", self.describe_step()))
            }
            Command::Address {
                state,
                lga,
                city,
                street,
            } => {
                self.enter_step(StepId::Address).await?;
                let draft = &mut self.sequencer.drafts_mut().address;
                draft.state = state;
                draft.lga = lga;
                draft.city = city;
                draft.street = street;
                self.sequencer.submit_address().await?;
                Ok(format!("Address saved. {}", self.describe_step()))
            }
            Command::Progress => {
                self.ensure_mounted().await?;
                Ok(self.describe_progress())
            }
            Command::Finish => {
                self.enter_step(StepId::Summary).await?;
                let message = self.sequencer.finish().await?;
                Ok(format!("{message}\nContinue with 'wallet'."))
            }
            Command::Wallet => self.wallet().await,
            Command::Banks => Ok(SUPPORTED_BANKS.join("\n")),
            Command::Setup {
                bank,
                account,
                pin,
                confirm,
            } => self.setup(&bank, &account, &pin, &confirm).await,
            Command::Close => match self.provisioning.close().await {
                CloseOutcome::Closed => Ok("Wallet setup closed.".into()),
                CloseOutcome::Redirected(route) => {
                    Ok(format!("Wallet is not set up; returned to {route}."))
                }
            },
            Command::ChangePin { old, new, confirm } => {
                self.change_pin.open();
                self.change_pin.entry_mut().set(&old);
                self.change_pin.submit_old_pin().await?;
                self.change_pin.entry_mut().set(&new);
                self.change_pin.continue_to_confirm()?;
                self.change_pin.entry_mut().set(&confirm);
                self.change_pin.commit().await
            }
            Command::ForgotPin => Ok(PinResetNotice::new(&self.ctx).message()),
            Command::ResetPin {
                token,
                new,
                confirm,
            } => {
                redeem_reset_token(
                    &self.ctx,
                    &token,
                    &PinEntry::from(new.as_str()),
                    &PinEntry::from(confirm.as_str()),
                )
                .await
            }
            Command::UpdateBank(bank) => {
                self.details.set_bank_name(&bank);
                self.details.submit().await
            }
            Command::UpdateAccount(account) => {
                self.details.set_account_number(&account);
                self.details.submit().await
            }
            Command::Withdraw { amount, pin } => self.withdraw(&amount, &pin).await,
        }
    }

    async fn start(&mut self) -> Result<String, FlowError> {
        match self.sequencer.mount().await? {
            MountOutcome::Idle => Ok("Not signed in. Use 'login <token>' first.".into()),
            MountOutcome::Fresh => Ok(format!(
                "Welcome! Verify your identity to open a wallet. Type 'get-started'.\n{}",
                self.describe_step()
            )),
            MountOutcome::Resumed => Ok(self.describe_progress()),
            MountOutcome::RedirectedToWallet => {
                let wallet = self.wallet().await?;
                Ok(format!(
                    "Verification already complete; opening the {} area.\n{wallet}",
                    Route::WalletArea
                ))
            }
        }
    }

    async fn ensure_mounted(&mut self) -> Result<(), FlowError> {
        match self.sequencer.phase() {
            SequencerPhase::Active => Ok(()),
            SequencerPhase::Idle => match self.sequencer.mount().await? {
                MountOutcome::Idle => Err(FlowError::AuthRequired),
                _ if self.sequencer.phase() == SequencerPhase::Active => Ok(()),
                _ => Err(FlowError::invalid_action(self.sequencer.phase(), "edit onboarding")),
            },
            phase => Err(FlowError::invalid_action(phase, "edit onboarding")),
        }
    }

    async fn enter_step(&mut self, step: StepId) -> Result<(), FlowError> {
        self.ensure_mounted().await?;
        if self.sequencer.current_step() != step {
            self.sequencer.jump_to(step)?;
        }
        Ok(())
    }

    fn describe_step(&self) -> String {
        let step = self.sequencer.current_step();
        format!("Step {} of {}: {}", step.index(), StepId::LAST.index(), step)
    }

    fn describe_progress(&self) -> String {
        let progress = self.sequencer.progress();
        let lines: Vec<String> = StepId::INPUT_STEPS
            .iter()
            .map(|step| {
                let mark = if progress.is_complete(*step) { "x" } else { " " };
                format!("  [{mark}] {step}")
            })
            .collect();
        format!(
            "{}% complete\n{}\n{}",
            self.sequencer.percent_complete(),
            lines.join("\n"),
            self.describe_step()
        )
    }

    async fn wallet(&mut self) -> Result<String, FlowError> {
        if self.provisioning.sync_with_status().await? {
            return Ok("Your wallet is not set up yet. Type 'banks', then \
                       'setup <bank> <account> <pin> <confirm-pin>'."
                .into());
        }
        let status = self.store.refresh(&self.ctx).await?;
        let currency = status.currency.as_deref().unwrap_or("NGN");
        let mut text = format!(
            "Balance: {} {currency}\nBank: {} ({})",
            status.balance.unwrap_or(Decimal::ZERO),
            status.bank_name.as_deref().unwrap_or("-"),
            status.account_number.as_deref().unwrap_or("-"),
        );
        if status.is_disabled() {
            text.push_str(&format!(
                "\nThis wallet is disabled. Contact {}.",
                self.ctx.support_contact()
            ));
        }
        Ok(text)
    }

    async fn setup(
        &mut self,
        bank: &str,
        account: &str,
        pin: &str,
        confirm: &str,
    ) -> Result<String, FlowError> {
        if !self.provisioning.is_open() && !self.provisioning.sync_with_status().await? {
            return Err(FlowError::validation("Your wallet is already set up"));
        }
        if matches!(self.provisioning.step(), ProvisioningStep::Error { .. }) {
            self.provisioning.acknowledge().await?;
        }
        while self.provisioning.back() {}

        self.provisioning.select_bank(bank);
        self.provisioning.set_account_number(account);
        self.provisioning.continue_to_pin()?;
        if let Some(entry) = self.provisioning.pin_entry_mut() {
            entry.set(pin);
        }
        self.provisioning.continue_to_confirm()?;
        if let Some(entry) = self.provisioning.pin_entry_mut() {
            entry.set(confirm);
        }
        self.provisioning.submit().await?;

        let message = match self.provisioning.step() {
            ProvisioningStep::Success { message } => message.clone(),
            _ => String::new(),
        };
        match self.provisioning.acknowledge().await? {
            Acknowledgement::Closed => Ok(message),
            Acknowledgement::Restarted => Err(FlowError::Server(message)),
        }
    }

    async fn withdraw(&mut self, amount: &str, pin: &str) -> Result<String, FlowError> {
        self.withdrawal.reset();
        self.withdrawal.set_amount(amount);
        self.withdrawal.continue_to_pin().await?;
        if let Some(entry) = self.withdrawal.pin_mut() {
            entry.set(pin);
        }
        let receipt = self.withdrawal.submit().await?;
        let balance = self.store.balance().await;
        Ok(format!(
            "Withdrew {} (transaction {}) at {}. New balance: {balance}",
            receipt.amount,
            receipt.transaction_id,
            receipt.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::services::VerificationSummary;
    use crate::testing::{Harness, StubWallet};

    fn console(harness: &Harness) -> Console {
        Console::new(harness.ctx.clone(), harness.session.clone())
    }

    #[test]
    fn parses_representative_lines() {
        assert_eq!(
            Command::parse("bvn 12345678901").unwrap(),
            Command::Bvn("12345678901".into())
        );
        assert_eq!(
            Command::parse("setup GTBank 0123456789 12345 12345").unwrap(),
            Command::Setup {
                bank: "GTBank".into(),
                account: "0123456789".into(),
                pin: "12345".into(),
                confirm: "12345".into(),
            }
        );
        assert_eq!(
            Command::parse("withdraw 500 12345").unwrap(),
            Command::Withdraw {
                amount: "500".into(),
                pin: "12345".into(),
            }
        );
        assert_eq!(
            Command::parse("change-pin 11111 22222 22222").unwrap(),
            Command::ChangePin {
                old: "11111".into(),
                new: "22222".into(),
                confirm: "22222".into(),
            }
        );
    }

    #[test]
    fn parses_multi_word_arguments() {
        assert_eq!(
            Command::parse("setup First Bank of Nigeria 0123456789 12345 12345").unwrap(),
            Command::Setup {
                bank: "First Bank of Nigeria".into(),
                account: "0123456789".into(),
                pin: "12345".into(),
                confirm: "12345".into(),
            }
        );
        assert_eq!(
            Command::parse("address Lagos | Ikeja | Ikeja | 12 Allen Avenue").unwrap(),
            Command::Address {
                state: "Lagos".into(),
                lga: "Ikeja".into(),
                city: "Ikeja".into(),
                street: "12 Allen Avenue".into(),
            }
        );
        assert_eq!(
            Command::parse("name Ada Lovelace Byron").unwrap(),
            Command::Name {
                first: "Ada".into(),
                last: "Lovelace Byron".into(),
            }
        );
        assert_eq!(Command::parse("goto 3").unwrap(), Command::Goto(StepId::Bvn));
        assert_eq!(Command::parse("goto NIN").unwrap(), Command::Goto(StepId::Nin));
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["bvn", "withdraw 500", "setup 0123456789 12345 12345", "goto 9", "dance"] {
            assert!(
                matches!(Command::parse(line), Err(FlowError::Validation(_))),
                "{line:?} should not parse"
            );
        }
    }

    #[tokio::test]
    async fn onboarding_end_to_end() {
        let harness = Harness::new();
        let mut console = console(&harness);

        let text = console.execute(Command::Start).await.unwrap();
        assert!(text.contains("Welcome"));
        console.execute(Command::GetStarted).await.unwrap();
        console
            .execute(Command::parse("name Ada Obi").unwrap())
            .await
            .unwrap();
        console
            .execute(Command::parse("bvn 12345678901").unwrap())
            .await
            .unwrap();
        console
            .execute(Command::parse("nin 10987654321").unwrap())
            .await
            .unwrap();
        console
            .execute(Command::parse("address Lagos | Ikeja | Ikeja | 1 Allen Ave").unwrap())
            .await
            .unwrap();

        assert_eq!(console.sequencer.percent_complete(), 100);
        console.execute(Command::Finish).await.unwrap();
        assert_eq!(harness.navigator.last(), Some(Route::WalletArea));
    }

    #[tokio::test]
    async fn start_redirects_when_already_verified() {
        let harness = Harness::with_wallet(StubWallet::activated("12345", dec!(100)));
        *harness.verification.summary.lock().unwrap() = VerificationSummary {
            first_name: Some("Ada".into()),
            last_name: Some("Obi".into()),
            bvn: Some("12345678901".into()),
            nin: Some("10987654321".into()),
            state: Some("Lagos".into()),
            lga: Some("Ikeja".into()),
            city: Some("Ikeja".into()),
            street: Some("1 Allen Ave".into()),
            bvn_verified: true,
            nin_verified: true,
            ..Default::default()
        };
        let mut console = console(&harness);

        let text = console.execute(Command::Start).await.unwrap();
        assert!(text.contains("Balance: 100 NGN"), "{text}");
        assert!(console.execute(Command::Next).await.is_err());
    }

    #[tokio::test]
    async fn wallet_setup_then_withdraw_and_change_pin() {
        let harness = Harness::new();
        let mut console = console(&harness);

        let text = console.execute(Command::Wallet).await.unwrap();
        assert!(text.contains("not set up"));
        let message = console
            .execute(Command::parse("setup GTBank 0123456789 12345 12345").unwrap())
            .await
            .unwrap();
        assert_eq!(message, "Wallet created successfully");

        harness.wallet.status.lock().unwrap().balance = Some(dec!(1000));
        console.store.refresh(&harness.ctx).await.unwrap();
        let text = console
            .execute(Command::parse("withdraw 400 12345").unwrap())
            .await
            .unwrap();
        assert!(text.contains("txn-0001"), "{text}");

        console
            .execute(Command::parse("change-pin 12345 22222 22222").unwrap())
            .await
            .unwrap();
        assert_eq!(*harness.wallet.pin.lock().unwrap(), "22222");
    }

    #[tokio::test]
    async fn setup_retries_after_a_mismatch() {
        let harness = Harness::new();
        let mut console = console(&harness);

        let reply = console
            .handle_line("setup GTBank 0123456789 12345 54321")
            .await;
        assert_eq!(reply, Reply::Print("Error: PINs do not match".into()));

        console
            .execute(Command::parse("setup Zenith Bank 0123456789 12345 12345").unwrap())
            .await
            .unwrap();
        assert_eq!(
            harness.wallet.status.lock().unwrap().bank_name.as_deref(),
            Some("Zenith Bank")
        );
    }

    #[tokio::test]
    async fn signed_out_console_reports_auth() {
        let harness = Harness::signed_out();
        let mut console = console(&harness);

        assert_eq!(
            console.execute(Command::Start).await.unwrap(),
            "Not signed in. Use 'login <token>' first."
        );
        assert_eq!(
            console.execute(Command::Wallet).await,
            Err(FlowError::AuthRequired)
        );
        console.execute(Command::Login("abc".into())).await.unwrap();
        assert!(console.execute(Command::Wallet).await.is_ok());
        assert_eq!(console.handle_line("quit").await, Reply::Exit);
    }
}
