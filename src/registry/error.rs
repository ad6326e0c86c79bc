//! Error types for tournament registration and team formation.

use thiserror::Error;

use crate::model::{RegistrationId, TeamId, TeamSize, TournamentId, TournamentStatus, UserId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tournament {0} not found")]
    TournamentNotFound(TournamentId),

    #[error("team {0} not found")]
    TeamNotFound(TeamId),

    #[error("registration {0} not found")]
    RegistrationNotFound(RegistrationId),

    #[error("user {user} is already registered for tournament {tournament}")]
    AlreadyRegistered {
        user: UserId,
        tournament: TournamentId,
    },

    #[error("tournament {0} is full")]
    TournamentFull(TournamentId),

    #[error("team {0} is full")]
    TeamFull(TeamId),

    #[error("registration for tournament {0} is closed ({1})")]
    RegistrationClosed(TournamentId, TournamentStatus),

    #[error("team {0} is closed")]
    TeamClosed(TeamId),

    #[error("tournament {0} is a {1} tournament, join or create a team")]
    TeamRequired(TournamentId, TeamSize),

    #[error("tournament {0} is a solo tournament")]
    NotTeamTournament(TournamentId),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("max participants must be greater than zero")]
    InvalidCapacity,
}
