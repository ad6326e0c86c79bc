//! Payment flow of a single registration attempt.
//!
//! ```text
//! NotStarted -> GameIdCollected -> FreeRegistration ------------------------> Registered
//!                               -> PaymentMethodChoice -> WalletPayment ----> Registered
//!                                                      -> ManualQrSubmission -> SubmittingProof
//!                                                                            -> AwaitingApproval
//! any non-final state -> Abandoned
//! ```
//!
//! A failed wallet payment goes back to `GameIdCollected` for a fresh quote.
//!
//! [`step`] is pure: it maps a state and an event to the next state plus the
//! effects the caller has to carry out. Transient states (`FreeRegistration`,
//! `WalletPayment`, `SubmittingProof`) wait for `EffectsSucceeded` or
//! `EffectsFailed`. The manual path ends with a pending deposit, not a
//! registration; the player pays from the wallet once the deposit is approved.

use thiserror::Error;

use crate::Amount;
use crate::registry::Entry;

/// Out-of-band payment details typed in by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProof {
    pub payer_name: String,
    /// Reference printed by the payment app.
    pub transaction_id: String,
    pub phone: String,
}

impl PaymentProof {
    pub fn validate(&self) -> Result<(), FlowError> {
        required(&self.payer_name, "payer name")?;
        required(&self.transaction_id, "transaction id")?;
        required(&self.phone, "phone number")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    NotStarted,
    GameIdCollected {
        game_id: String,
        entry: Entry,
    },
    FreeRegistration {
        game_id: String,
        entry: Entry,
    },
    PaymentMethodChoice {
        game_id: String,
        entry: Entry,
        fee: Amount,
        available_balance: Amount,
    },
    WalletPayment {
        game_id: String,
        entry: Entry,
        fee: Amount,
    },
    ManualQrSubmission {
        game_id: String,
        entry: Entry,
        fee: Amount,
    },
    SubmittingProof {
        game_id: String,
        entry: Entry,
        fee: Amount,
    },
    AwaitingApproval {
        fee: Amount,
    },
    Registered,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    GameIdSubmitted { game_id: String, entry: Entry },
    FeeQuoted { fee: Amount, available_balance: Amount },
    WalletChosen,
    ManualChosen,
    ProofSubmitted(PaymentProof),
    EffectsSucceeded,
    EffectsFailed,
    Closed,
}

/// Work the caller performs after a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Register {
        game_id: String,
        entry: Entry,
        payment_amount: Amount,
    },
    ChargeWallet {
        amount: Amount,
    },
    ShowPaymentOptions {
        fee: Amount,
        wallet_enabled: bool,
    },
    ShowQrCode {
        fee: Amount,
    },
    RequestDeposit {
        amount: Amount,
        proof: PaymentProof,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: FlowState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: FlowState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(state: FlowState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("{event} is not allowed in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("wallet balance {available} does not cover the entry fee {fee}")]
    WalletUnavailable { fee: Amount, available: Amount },

    #[error("{0} must not be empty")]
    MissingField(&'static str),
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::NotStarted => "not_started",
            FlowState::GameIdCollected { .. } => "game_id_collected",
            FlowState::FreeRegistration { .. } => "free_registration",
            FlowState::PaymentMethodChoice { .. } => "payment_method_choice",
            FlowState::WalletPayment { .. } => "wallet_payment",
            FlowState::ManualQrSubmission { .. } => "manual_qr_submission",
            FlowState::SubmittingProof { .. } => "submitting_proof",
            FlowState::AwaitingApproval { .. } => "awaiting_approval",
            FlowState::Registered => "registered",
            FlowState::Abandoned => "abandoned",
        }
    }

    /// No further events are accepted.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            FlowState::AwaitingApproval { .. } | FlowState::Registered | FlowState::Abandoned
        )
    }

    /// Waiting for the outcome of its effects.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FlowState::FreeRegistration { .. }
                | FlowState::WalletPayment { .. }
                | FlowState::SubmittingProof { .. }
        )
    }
}

impl FlowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FlowEvent::GameIdSubmitted { .. } => "game_id_submitted",
            FlowEvent::FeeQuoted { .. } => "fee_quoted",
            FlowEvent::WalletChosen => "wallet_chosen",
            FlowEvent::ManualChosen => "manual_chosen",
            FlowEvent::ProofSubmitted(_) => "proof_submitted",
            FlowEvent::EffectsSucceeded => "effects_succeeded",
            FlowEvent::EffectsFailed => "effects_failed",
            FlowEvent::Closed => "closed",
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<(), FlowError> {
    if value.trim().is_empty() {
        Err(FlowError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Compute the next state of the flow.
pub fn step(state: &FlowState, event: FlowEvent) -> Result<Transition, FlowError> {
    use FlowEvent as E;
    use FlowState as S;

    let invalid = |event: &FlowEvent| FlowError::InvalidTransition {
        state: state.name(),
        event: event.name(),
    };

    match (state, event) {
        (s, E::Closed) if !s.is_final() => Ok(Transition::to(S::Abandoned)),

        (S::NotStarted, E::GameIdSubmitted { game_id, entry }) => {
            required(&game_id, "game id")?;
            if let Entry::CreateTeam { team_name } = &entry {
                required(team_name, "team name")?;
            }
            Ok(Transition::to(S::GameIdCollected {
                game_id: game_id.trim().to_string(),
                entry,
            }))
        }

        (
            S::GameIdCollected { game_id, entry },
            E::FeeQuoted {
                fee,
                available_balance,
            },
        ) => {
            if fee.is_zero() {
                Ok(Transition::with(
                    S::FreeRegistration {
                        game_id: game_id.clone(),
                        entry: entry.clone(),
                    },
                    vec![Effect::Register {
                        game_id: game_id.clone(),
                        entry: entry.clone(),
                        payment_amount: Amount::ZERO,
                    }],
                ))
            } else {
                Ok(Transition::with(
                    S::PaymentMethodChoice {
                        game_id: game_id.clone(),
                        entry: entry.clone(),
                        fee,
                        available_balance,
                    },
                    vec![Effect::ShowPaymentOptions {
                        fee,
                        wallet_enabled: available_balance >= fee,
                    }],
                ))
            }
        }

        (S::FreeRegistration { .. } | S::WalletPayment { .. }, E::EffectsSucceeded) => {
            Ok(Transition::to(S::Registered))
        }
        (S::FreeRegistration { .. }, E::EffectsFailed) => Ok(Transition::to(S::Abandoned)),

        (
            S::PaymentMethodChoice {
                game_id,
                entry,
                fee,
                available_balance,
            },
            E::WalletChosen,
        ) => {
            if available_balance < fee {
                return Err(FlowError::WalletUnavailable {
                    fee: *fee,
                    available: *available_balance,
                });
            }
            Ok(Transition::with(
                S::WalletPayment {
                    game_id: game_id.clone(),
                    entry: entry.clone(),
                    fee: *fee,
                },
                vec![
                    Effect::ChargeWallet { amount: *fee },
                    Effect::Register {
                        game_id: game_id.clone(),
                        entry: entry.clone(),
                        payment_amount: *fee,
                    },
                ],
            ))
        }
        // the balance seen before the charge is stale now, so ask for a new quote
        (S::WalletPayment { game_id, entry, .. }, E::EffectsFailed) => {
            Ok(Transition::to(S::GameIdCollected {
                game_id: game_id.clone(),
                entry: entry.clone(),
            }))
        }

        (S::PaymentMethodChoice { game_id, entry, fee, .. }, E::ManualChosen) => {
            Ok(Transition::with(
                S::ManualQrSubmission {
                    game_id: game_id.clone(),
                    entry: entry.clone(),
                    fee: *fee,
                },
                vec![Effect::ShowQrCode { fee: *fee }],
            ))
        }

        (S::ManualQrSubmission { game_id, entry, fee }, E::ProofSubmitted(proof)) => {
            proof.validate()?;
            Ok(Transition::with(
                S::SubmittingProof {
                    game_id: game_id.clone(),
                    entry: entry.clone(),
                    fee: *fee,
                },
                vec![Effect::RequestDeposit {
                    amount: *fee,
                    proof,
                }],
            ))
        }
        (S::SubmittingProof { fee, .. }, E::EffectsSucceeded) => {
            Ok(Transition::to(S::AwaitingApproval { fee: *fee }))
        }
        (S::SubmittingProof { game_id, entry, fee }, E::EffectsFailed) => {
            Ok(Transition::with(
                S::ManualQrSubmission {
                    game_id: game_id.clone(),
                    entry: entry.clone(),
                    fee: *fee,
                },
                vec![Effect::ShowQrCode { fee: *fee }],
            ))
        }

        (_, event) => Err(invalid(&event)),
    }
}
