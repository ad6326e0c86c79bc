//! Drives a registration attempt through the payment flow.
//!
//! [`payment::step`] decides what happens; this module carries out the effects
//! against the ledger and the registry and reports what the player should see.
//! Registration preconditions are checked before any money moves, so a wallet
//! charge is never taken for a registration that would fail.

use tracing::{info, warn};

use super::Platform;
use crate::model::{QrCode, TournamentId, TournamentRegistration, UserId, WalletTransaction};
use crate::payment::{self, Effect, FlowError, FlowEvent, FlowState};
use crate::qr::QrError;
use crate::registry::{Entry, RegistryError};
use crate::{Amount, Error};

/// One player's attempt to enter one tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationAttempt {
    pub user: UserId,
    pub tournament: TournamentId,
    state: FlowState,
}

impl RegistrationAttempt {
    pub fn state(&self) -> &FlowState {
        &self.state
    }
}

/// What the player is shown after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Nothing to show yet.
    Pending,
    PaymentOptions { fee: Amount, wallet_enabled: bool },
    QrCode { fee: Amount, qr_code: QrCode },
    Registered(TournamentRegistration),
    /// Manual payment submitted; an operator has to approve the deposit.
    DepositRequested(WalletTransaction),
    Abandoned,
}

impl Platform {
    /// Start a registration: collect the game id and quote the entry fee.
    ///
    /// Free tournaments register right away. Paid ones come back with
    /// [`FlowOutcome::PaymentOptions`].
    pub fn begin_registration(
        &mut self,
        user: UserId,
        tournament: TournamentId,
        game_id: &str,
        entry: Entry,
    ) -> Result<(RegistrationAttempt, FlowOutcome), Error> {
        let player = self.player(user, game_id)?;
        self.registry
            .ensure_can_register(&player, tournament, &entry)?;

        let mut attempt = RegistrationAttempt {
            user,
            tournament,
            state: FlowState::NotStarted,
        };
        self.advance(
            &mut attempt,
            FlowEvent::GameIdSubmitted {
                game_id: game_id.to_string(),
                entry,
            },
        )?;
        let outcome = self.quote(&mut attempt)?;
        Ok((attempt, outcome))
    }

    /// Feed one player event into the attempt and carry out its effects.
    ///
    /// On failure the attempt keeps its previous state, except after a failed
    /// wallet payment, which is quoted again against the current balance.
    pub fn advance(
        &mut self,
        attempt: &mut RegistrationAttempt,
        event: FlowEvent,
    ) -> Result<FlowOutcome, Error> {
        let event_name = event.name();
        let previous = attempt.state.clone();
        let transition = payment::step(&attempt.state, event)?;
        attempt.state = transition.state;

        let result = self.execute(attempt, transition.effects);
        match &result {
            Ok(_) if attempt.state.is_transient() => {
                attempt.state = payment::step(&attempt.state, FlowEvent::EffectsSucceeded)?.state;
            }
            Ok(_) => {}
            Err(_) if attempt.state.is_transient() => {
                attempt.state = payment::step(&attempt.state, FlowEvent::EffectsFailed)?.state;
                if matches!(attempt.state, FlowState::GameIdCollected { .. })
                    && let Err(e) = self.quote(attempt)
                {
                    warn!(
                        user = attempt.user,
                        tournament = attempt.tournament,
                        reason = %e,
                        "could not quote entry fee again"
                    );
                }
            }
            Err(_) => attempt.state = previous,
        }

        match &result {
            Ok(_) => info!(
                user = attempt.user,
                tournament = attempt.tournament,
                state = attempt.state.name(),
                "{event_name} applied"
            ),
            Err(e) => info!(
                user = attempt.user,
                tournament = attempt.tournament,
                state = attempt.state.name(),
                reason = %e,
                "{event_name} skipped"
            ),
        }
        result
    }

    /// Register through the wallet: free entries register directly, paid ones
    /// are charged to the wallet in the same step.
    pub fn register_with_wallet(
        &mut self,
        user: UserId,
        tournament: TournamentId,
        game_id: &str,
        entry: Entry,
    ) -> Result<TournamentRegistration, Error> {
        let (mut attempt, outcome) = self.begin_registration(user, tournament, game_id, entry)?;
        let outcome = match outcome {
            FlowOutcome::Registered(registration) => return Ok(registration),
            _ => self.advance(&mut attempt, FlowEvent::WalletChosen)?,
        };
        match outcome {
            FlowOutcome::Registered(registration) => Ok(registration),
            _ => Err(FlowError::InvalidTransition {
                state: attempt.state.name(),
                event: "wallet_chosen",
            }
            .into()),
        }
    }
}

/// Private API
impl Platform {
    fn quote(&mut self, attempt: &mut RegistrationAttempt) -> Result<FlowOutcome, Error> {
        let fee = self
            .registry
            .get_tournament(attempt.tournament)
            .ok_or(RegistryError::TournamentNotFound(attempt.tournament))?
            .entry_fee;
        let available_balance = self
            .ledger
            .get_balance(attempt.user)
            .map(|b| b.available_balance)
            .unwrap_or_default();
        self.advance(
            attempt,
            FlowEvent::FeeQuoted {
                fee,
                available_balance,
            },
        )
    }

    fn execute(
        &mut self,
        attempt: &RegistrationAttempt,
        effects: Vec<Effect>,
    ) -> Result<FlowOutcome, Error> {
        for effect in &effects {
            if let Effect::Register { game_id, entry, .. } = effect {
                let player = self.player(attempt.user, game_id)?;
                self.registry
                    .ensure_can_register(&player, attempt.tournament, entry)?;
            }
        }

        let mut outcome = match attempt.state {
            FlowState::Abandoned => FlowOutcome::Abandoned,
            _ => FlowOutcome::Pending,
        };
        for effect in effects {
            outcome = match effect {
                Effect::ChargeWallet { amount } => {
                    let name = self
                        .registry
                        .get_tournament(attempt.tournament)
                        .ok_or(RegistryError::TournamentNotFound(attempt.tournament))?
                        .name
                        .clone();
                    self.ledger
                        .pay_with_wallet(attempt.user, amount, attempt.tournament, &name)?;
                    outcome
                }
                Effect::Register {
                    game_id,
                    entry,
                    payment_amount,
                } => {
                    let player = self.player(attempt.user, &game_id)?;
                    let registration =
                        self.registry
                            .register(attempt.tournament, player, entry, payment_amount)?;
                    FlowOutcome::Registered(registration)
                }
                Effect::ShowPaymentOptions {
                    fee,
                    wallet_enabled,
                } => FlowOutcome::PaymentOptions {
                    fee,
                    wallet_enabled,
                },
                Effect::ShowQrCode { fee } => {
                    let qr_code = self
                        .qr_codes
                        .active()
                        .cloned()
                        .ok_or(QrError::NoActiveCode)?;
                    FlowOutcome::QrCode { fee, qr_code }
                }
                Effect::RequestDeposit { amount, proof } => {
                    FlowOutcome::DepositRequested(self.request_deposit(attempt.user, amount, &proof)?)
                }
            };
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::ledger::LedgerError;
    use crate::model::{TeamSize, TournamentStatus, TransactionStatus, TransactionType};
    use crate::platform::tests::{ADMIN, fund, platform, proof, tournament};
    use crate::qr::NewQrCode;

    fn add_qr_code(platform: &mut Platform) -> QrCode {
        platform
            .create_qr_code(
                ADMIN,
                NewQrCode {
                    name: "GPay".to_string(),
                    description: None,
                    image_url: "https://cdn.example.com/gpay.png".to_string(),
                    is_active: true,
                },
            )
            .unwrap()
    }

    #[test]
    fn free_tournament_registers_on_begin() {
        let mut platform = platform();
        let t = tournament(&mut platform, "Free", 10, TeamSize::Solo);
        let (attempt, outcome) = platform
            .begin_registration(2, t, "BGMI-2", Entry::Solo)
            .unwrap();

        assert_eq!(attempt.state(), &FlowState::Registered);
        let FlowOutcome::Registered(registration) = outcome else {
            panic!("expected a registration");
        };
        assert_eq!(registration.payment_amount, Amount::ZERO);
        assert_eq!(registration.player_name, "Player 2");
        assert!(platform.balance(2).is_none());
    }

    #[test]
    fn paid_tournament_offers_wallet_when_covered() {
        let mut platform = platform();
        fund(&mut platform, 2, 50);
        let t = tournament(&mut platform, "₹30", 10, TeamSize::Solo);
        let (mut attempt, outcome) = platform
            .begin_registration(2, t, "BGMI-2", Entry::Solo)
            .unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::PaymentOptions {
                fee: Amount::from_whole(30),
                wallet_enabled: true
            }
        );

        let outcome = platform
            .advance(&mut attempt, FlowEvent::WalletChosen)
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::Registered(ref r) if r.payment_amount == Amount::from_whole(30)));
        assert_eq!(attempt.state(), &FlowState::Registered);

        let balance = platform.balance(2).unwrap();
        assert_eq!(balance.available_balance, Amount::from_whole(20));
        assert_eq!(balance.total_withdrawn, Amount::from_whole(30));

        let payment = platform.transactions(2)[0].clone();
        assert_eq!(payment.transaction_type, TransactionType::Withdrawal);
        assert_eq!(payment.status, TransactionStatus::Approved);
        assert_eq!(payment.payment_method, "wallet");
        assert_eq!(payment.transaction_reference, Some(format!("tournament_{t}")));
        assert_eq!(payment.admin_notes.as_deref(), Some("Tournament: Weekend Clash"));
    }

    #[test]
    fn wallet_disabled_without_funds() {
        let mut platform = platform();
        fund(&mut platform, 2, 20);
        let t = tournament(&mut platform, "₹30", 10, TeamSize::Solo);
        let (mut attempt, outcome) = platform
            .begin_registration(2, t, "BGMI-2", Entry::Solo)
            .unwrap();
        assert!(matches!(
            outcome,
            FlowOutcome::PaymentOptions {
                wallet_enabled: false,
                ..
            }
        ));

        let err = platform
            .advance(&mut attempt, FlowEvent::WalletChosen)
            .unwrap_err();
        assert!(matches!(err, Error::Flow(FlowError::WalletUnavailable { .. })));
        assert!(matches!(attempt.state(), FlowState::PaymentMethodChoice { .. }));
        assert_eq!(
            platform.balance(2).unwrap().available_balance,
            Amount::from_whole(20)
        );
        assert!(platform.check_existing(2, t).is_none());
    }

    #[test]
    fn stale_quote_is_charged_against_live_balance() {
        let mut platform = platform();
        fund(&mut platform, 2, 50);
        let a = tournament(&mut platform, "₹30", 10, TeamSize::Solo);
        let b = tournament(&mut platform, "₹30", 10, TeamSize::Solo);
        let (mut first, _) = platform.begin_registration(2, a, "BGMI-2", Entry::Solo).unwrap();
        let (mut second, _) = platform.begin_registration(2, b, "BGMI-2", Entry::Solo).unwrap();

        platform.advance(&mut first, FlowEvent::WalletChosen).unwrap();
        let err = platform
            .advance(&mut second, FlowEvent::WalletChosen)
            .unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::InsufficientBalance { .. })));

        // quoted again with the balance that is left
        assert!(matches!(
            second.state(),
            FlowState::PaymentMethodChoice { available_balance, .. } if *available_balance == Amount::from_whole(20)
        ));
        assert_eq!(
            platform.balance(2).unwrap().available_balance,
            Amount::from_whole(20)
        );
        assert!(platform.check_existing(2, b).is_none());
    }

    #[test]
    fn full_tournament_does_not_charge_wallet() {
        let mut platform = platform();
        fund(&mut platform, 2, 50);
        fund(&mut platform, 3, 50);
        let t = tournament(&mut platform, "₹30", 1, TeamSize::Solo);
        let (mut late, _) = platform.begin_registration(2, t, "BGMI-2", Entry::Solo).unwrap();
        platform
            .register_with_wallet(3, t, "BGMI-3", Entry::Solo)
            .unwrap();

        let err = platform.advance(&mut late, FlowEvent::WalletChosen).unwrap_err();
        assert!(matches!(err, Error::Registry(RegistryError::TournamentFull(_))));
        assert_eq!(
            platform.balance(2).unwrap().available_balance,
            Amount::from_whole(50)
        );
        assert_eq!(
            platform.tournament(t).unwrap().status,
            TournamentStatus::Full
        );
    }

    #[test]
    fn manual_path_creates_pending_deposit() {
        let mut platform = platform();
        let qr = add_qr_code(&mut platform);
        let t = tournament(&mut platform, "₹30", 10, TeamSize::Solo);
        let (mut attempt, _) = platform.begin_registration(2, t, "BGMI-2", Entry::Solo).unwrap();

        let outcome = platform.advance(&mut attempt, FlowEvent::ManualChosen).unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::QrCode {
                fee: Amount::from_whole(30),
                qr_code: qr
            }
        );

        let outcome = platform
            .advance(&mut attempt, FlowEvent::ProofSubmitted(proof()))
            .unwrap();
        let FlowOutcome::DepositRequested(tx) = outcome else {
            panic!("expected a deposit request");
        };
        assert_eq!(tx.amount, Amount::from_whole(30));
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(matches!(attempt.state(), FlowState::AwaitingApproval { .. }));

        // approval credits the wallet; it does not register
        platform.approve(ADMIN, tx.id, None).unwrap();
        assert!(platform.check_existing(2, t).is_none());
        platform
            .register_with_wallet(2, t, "BGMI-2", Entry::Solo)
            .unwrap();
        assert_eq!(platform.balance(2).unwrap().available_balance, Amount::ZERO);
    }

    #[test]
    fn manual_path_needs_active_qr_code() {
        let mut platform = platform();
        let t = tournament(&mut platform, "₹30", 10, TeamSize::Solo);
        let (mut attempt, _) = platform.begin_registration(2, t, "BGMI-2", Entry::Solo).unwrap();
        let err = platform
            .advance(&mut attempt, FlowEvent::ManualChosen)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(attempt.state(), FlowState::PaymentMethodChoice { .. }));
    }

    #[test]
    fn closing_abandons_attempt() {
        let mut platform = platform();
        let t = tournament(&mut platform, "₹30", 10, TeamSize::Solo);
        let (mut attempt, _) = platform.begin_registration(2, t, "BGMI-2", Entry::Solo).unwrap();
        let outcome = platform.advance(&mut attempt, FlowEvent::Closed).unwrap();
        assert_eq!(outcome, FlowOutcome::Abandoned);
        assert!(platform.advance(&mut attempt, FlowEvent::WalletChosen).is_err());
    }

    #[test]
    fn begin_fails_fast_when_already_registered() {
        let mut platform = platform();
        let t = tournament(&mut platform, "Free", 10, TeamSize::Solo);
        platform
            .register_with_wallet(2, t, "BGMI-2", Entry::Solo)
            .unwrap();
        let err = platform
            .begin_registration(2, t, "BGMI-2", Entry::Solo)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::AlreadyRegistered { user: 2, .. })
        ));
    }

    #[test]
    fn paid_team_creation_charges_captain() {
        let mut platform = platform();
        fund(&mut platform, 2, 100);
        let t = tournament(&mut platform, "₹40", 8, TeamSize::Duo);
        let captain = platform
            .register_with_wallet(
                2,
                t,
                "BGMI-2",
                Entry::CreateTeam {
                    team_name: "Night Owls".to_string(),
                },
            )
            .unwrap();
        assert!(captain.is_team_captain);
        assert_eq!(captain.payment_amount, Amount::from_whole(40));
        assert_eq!(platform.available_teams(t).len(), 1);
        assert_eq!(
            platform.balance(2).unwrap().available_balance,
            Amount::from_whole(60)
        );
    }
}
