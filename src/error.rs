//! Crate-level error and its client-facing classification.

use thiserror::Error;

use crate::admin::AdminError;
use crate::announcements::BoardError;
use crate::ledger::LedgerError;
use crate::payment::FlowError;
use crate::qr::QrError;
use crate::registry::RegistryError;

/// Top-level error returned by [`Platform`](crate::Platform) operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("wallet: {0}")]
    Ledger(#[from] LedgerError),

    #[error("registration: {0}")]
    Registry(#[from] RegistryError),

    #[error("payment: {0}")]
    Flow(#[from] FlowError),

    #[error("{0}")]
    Admin(#[from] AdminError),

    #[error("announcement: {0}")]
    Board(#[from] BoardError),

    #[error("payment qr: {0}")]
    Qr(#[from] QrError),

    #[error("platform unavailable: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; fixing the request fixes the error.
    Validation,
    NotFound,
    /// The request is valid but the current state forbids it.
    Conflict,
    Authorization,
    /// The platform could not be reached or did not answer.
    Upstream,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use ErrorKind as K;
        match self {
            Error::Ledger(e) => match e {
                LedgerError::InvalidAmount(_)
                | LedgerError::MissingDetail(_)
                | LedgerError::BalanceOverflow(_) => K::Validation,
                LedgerError::TransactionNotFound(_) => K::NotFound,
                LedgerError::NotPending(..) | LedgerError::InsufficientBalance { .. } => K::Conflict,
            },
            Error::Registry(e) => match e {
                RegistryError::TournamentNotFound(_)
                | RegistryError::TeamNotFound(_)
                | RegistryError::RegistrationNotFound(_) => K::NotFound,
                RegistryError::AlreadyRegistered { .. }
                | RegistryError::TournamentFull(_)
                | RegistryError::TeamFull(_)
                | RegistryError::RegistrationClosed(..)
                | RegistryError::TeamClosed(_) => K::Conflict,
                RegistryError::TeamRequired(..)
                | RegistryError::NotTeamTournament(_)
                | RegistryError::EmptyField(_)
                | RegistryError::InvalidCapacity => K::Validation,
            },
            Error::Flow(e) => match e {
                FlowError::MissingField(_) => K::Validation,
                FlowError::InvalidTransition { .. } | FlowError::WalletUnavailable { .. } => {
                    K::Conflict
                }
            },
            Error::Admin(e) => match e {
                AdminError::NotAuthorized { .. } => K::Authorization,
                AdminError::UnknownUser(_) | AdminError::UserNotFound(_) => K::NotFound,
                AdminError::DuplicateEmail(_) => K::Conflict,
                AdminError::InvalidAmount(_) | AdminError::EmptyField(_) => K::Validation,
            },
            Error::Board(e) => match e {
                BoardError::NotFound(_) => K::NotFound,
                BoardError::EmptyField(_) => K::Validation,
            },
            Error::Qr(e) => match e {
                QrError::NotFound(_) | QrError::NoActiveCode => K::NotFound,
                QrError::EmptyField(_) => K::Validation,
            },
            Error::Upstream(_) => K::Upstream,
        }
    }

    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Upstream
    }

    /// Short message safe to show to players.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Upstream => "Service temporarily unavailable, please try again".to_string(),
            ErrorKind::Authorization => "You are not allowed to do that".to_string(),
            _ => self.to_string(),
        }
    }
}
