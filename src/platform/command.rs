//! Commands: the serializable surface of the platform.
//!
//! The journal replay and [`PlatformHandle`](super::PlatformHandle) both feed
//! `Command`s through [`Platform::apply`], which logs each one as applied or
//! skipped.

use tokio_stream::{Stream, StreamExt};
use tracing::info;

use super::Platform;
use crate::admin::WinningsGrant;
use crate::ledger::{Decision, Payout, WalletBalance};
use crate::model::{
    Tournament, TournamentId, TournamentRegistration, TournamentStatus, TxId, UserId, UserProfile,
    WalletTransaction,
};
use crate::payment::PaymentProof;
use crate::registry::{Entry, NewTournament, RegistryError};
use crate::{Amount, Error};

#[derive(Debug, Clone)]
pub enum Command {
    UpsertProfile {
        user: UserId,
        name: String,
        email: String,
    },
    CreateTournament {
        actor: UserId,
        tournament: NewTournament,
    },
    SetTournamentStatus {
        actor: UserId,
        tournament: TournamentId,
        status: TournamentStatus,
    },
    RequestDeposit {
        user: UserId,
        amount: Amount,
        proof: PaymentProof,
    },
    RequestWithdrawal {
        user: UserId,
        amount: Amount,
        payout: Payout,
    },
    ResolveTransaction {
        actor: UserId,
        tx: TxId,
        decision: Decision,
        notes: Option<String>,
    },
    GrantWinnings {
        actor: UserId,
        grant: WinningsGrant,
    },
    /// Wallet registration through any entry path.
    Register {
        user: UserId,
        tournament: TournamentId,
        game_id: String,
        entry: Entry,
    },
    GetBalance {
        user: UserId,
    },
    GetTournament {
        tournament: TournamentId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Profile(UserProfile),
    Tournament(Tournament),
    Transaction(WalletTransaction),
    Registration(TournamentRegistration),
    Balance(Option<WalletBalance>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::UpsertProfile { .. } => "profile",
            Command::CreateTournament { .. } => "tournament",
            Command::SetTournamentStatus { .. } => "tournament status",
            Command::RequestDeposit { .. } => "deposit request",
            Command::RequestWithdrawal { .. } => "withdrawal request",
            Command::ResolveTransaction {
                decision: Decision::Approve,
                ..
            } => "approval",
            Command::ResolveTransaction {
                decision: Decision::Reject,
                ..
            } => "rejection",
            Command::GrantWinnings { .. } => "winnings",
            Command::Register {
                entry: Entry::Solo, ..
            } => "registration",
            Command::Register {
                entry: Entry::CreateTeam { .. },
                ..
            } => "team creation",
            Command::Register {
                entry: Entry::JoinTeam { .. },
                ..
            } => "team join",
            Command::GetBalance { .. } => "balance query",
            Command::GetTournament { .. } => "tournament query",
        }
    }

    /// The user issuing the command.
    pub fn user(&self) -> Option<UserId> {
        match self {
            Command::UpsertProfile { user, .. }
            | Command::RequestDeposit { user, .. }
            | Command::RequestWithdrawal { user, .. }
            | Command::Register { user, .. }
            | Command::GetBalance { user } => Some(*user),
            Command::CreateTournament { actor, .. }
            | Command::SetTournamentStatus { actor, .. }
            | Command::ResolveTransaction { actor, .. }
            | Command::GrantWinnings { actor, .. } => Some(*actor),
            Command::GetTournament { .. } => None,
        }
    }

    fn amount(&self) -> Option<Amount> {
        match self {
            Command::RequestDeposit { amount, .. } | Command::RequestWithdrawal { amount, .. } => {
                Some(*amount)
            }
            Command::GrantWinnings { grant, .. } => Some(grant.amount),
            _ => None,
        }
    }
}

/// Public API
impl Platform {
    /// Run the platform over a stream of commands until it ends.
    pub async fn run(&mut self, mut stream: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = stream.next().await {
            // a failing command is logged by `apply` and must not stop the replay
            let _ = self.apply(command);
        }
    }

    /// Apply a single command on top of the current state.
    pub fn apply(&mut self, command: Command) -> Result<Outcome, Error> {
        let name = command.name();
        let user = command.user();
        let amount = command.amount();
        let result = self.dispatch(command);
        Self::log_result(name, user, amount, &result);
        result
    }
}

/// Private API
impl Platform {
    fn dispatch(&mut self, command: Command) -> Result<Outcome, Error> {
        match command {
            Command::UpsertProfile { user, name, email } => self
                .upsert_profile(user, &name, &email)
                .map(Outcome::Profile),
            Command::CreateTournament { actor, tournament } => self
                .create_tournament(actor, tournament)
                .map(Outcome::Tournament),
            Command::SetTournamentStatus {
                actor,
                tournament,
                status,
            } => self
                .set_tournament_status(actor, tournament, status)
                .map(Outcome::Tournament),
            Command::RequestDeposit {
                user,
                amount,
                proof,
            } => self
                .request_deposit(user, amount, &proof)
                .map(Outcome::Transaction),
            Command::RequestWithdrawal {
                user,
                amount,
                payout,
            } => self
                .request_withdrawal(user, amount, &payout)
                .map(Outcome::Transaction),
            Command::ResolveTransaction {
                actor,
                tx,
                decision,
                notes,
            } => self
                .resolve_transaction(actor, tx, decision, notes)
                .map(Outcome::Transaction),
            Command::GrantWinnings { actor, grant } => self
                .grant_winnings(actor, &grant)
                .map(Outcome::Transaction),
            Command::Register {
                user,
                tournament,
                game_id,
                entry,
            } => self
                .register_with_wallet(user, tournament, &game_id, entry)
                .map(Outcome::Registration),
            Command::GetBalance { user } => Ok(Outcome::Balance(self.balance(user).cloned())),
            Command::GetTournament { tournament } => self
                .tournament(tournament)
                .cloned()
                .map(Outcome::Tournament)
                .ok_or_else(|| RegistryError::TournamentNotFound(tournament).into()),
        }
    }

    /// Small helper to log `apply` results
    fn log_result<T>(
        command: &str,
        user: Option<UserId>,
        amount: Option<Amount>,
        result: &Result<T, Error>,
    ) {
        let user = user.map(|u| u.to_string()).unwrap_or_default();
        match (result, amount) {
            (Ok(_), Some(amt)) => {
                info!(user = %user, amount = %amt, "{command} applied");
            }
            (Ok(_), None) => {
                info!(user = %user, "{command} applied");
            }
            (Err(e), Some(amt)) => {
                info!(user = %user, amount = %amt, reason = %e, "{command} skipped");
            }
            (Err(e), None) => {
                info!(user = %user, reason = %e, "{command} skipped");
            }
        }
    }
}
