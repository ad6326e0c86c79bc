//! Team formation for duo and squad tournaments.
//!
//! Team size comes from the tournament's category, never from the player.
//! Member counts and `is_full` are kept here, in the same step as the
//! registration that changes them.

use chrono::Utc;

use super::{Entry, Player, Registry, RegistryError};
use crate::Amount;
use crate::model::{
    TeamId, TeamStatus, TournamentId, TournamentRegistration, TournamentTeam,
};

impl Registry {
    /// Create a team with `captain` as its first member.
    ///
    /// The team row and the captain's registration are written together.
    /// Team names are not required to be unique.
    pub fn create_team(
        &mut self,
        tournament: TournamentId,
        team_name: &str,
        captain: Player,
        payment_amount: Amount,
    ) -> Result<(TournamentTeam, TournamentRegistration), RegistryError> {
        let entry = Entry::CreateTeam {
            team_name: team_name.to_string(),
        };
        let max_members = self
            .ensure_can_register(&captain, tournament, &entry)?
            .team_size
            .max_members();

        self.next_team += 1;
        let team_id = self.next_team;
        let now = Utc::now();
        let team = TournamentTeam {
            id: team_id,
            tournament_id: tournament,
            captain_user_id: captain.user_id,
            team_name: team_name.trim().to_string(),
            max_members,
            current_members: 1,
            is_full: max_members <= 1,
            status: TeamStatus::Open,
            created_at: now,
            updated_at: now,
        };
        self.teams.insert(team_id, team.clone());

        let id = self.insert_registration(tournament, captain, payment_amount, Some(team_id), true);
        self.recompute_participant_count(tournament)?;
        let registration = self
            .registrations
            .get(&id)
            .cloned()
            .ok_or(RegistryError::RegistrationNotFound(id))?;
        Ok((team, registration))
    }

    /// Join an existing team that still has a free slot.
    pub fn join_team(
        &mut self,
        team_id: TeamId,
        player: Player,
        payment_amount: Amount,
    ) -> Result<&TournamentRegistration, RegistryError> {
        let tournament = self
            .teams
            .get(&team_id)
            .ok_or(RegistryError::TeamNotFound(team_id))?
            .tournament_id;
        self.ensure_can_register(&player, tournament, &Entry::JoinTeam { team_id })?;

        let id = self.insert_registration(tournament, player, payment_amount, Some(team_id), false);
        let team = self
            .teams
            .get_mut(&team_id)
            .ok_or(RegistryError::TeamNotFound(team_id))?;
        team.current_members += 1;
        team.is_full = team.current_members >= team.max_members;
        team.updated_at = Utc::now();

        self.recompute_participant_count(tournament)?;
        self.registrations
            .get(&id)
            .ok_or(RegistryError::RegistrationNotFound(id))
    }

    pub fn get_team(&self, team_id: TeamId) -> Option<&TournamentTeam> {
        self.teams.get(&team_id)
    }

    /// All teams of a tournament in creation order.
    pub fn tournament_teams(&self, tournament: TournamentId) -> Vec<&TournamentTeam> {
        self.teams
            .values()
            .filter(|t| t.tournament_id == tournament)
            .collect()
    }

    /// Open teams of a tournament that still have room.
    pub fn list_available_teams(&self, tournament: TournamentId) -> Vec<&TournamentTeam> {
        self.teams
            .values()
            .filter(|t| t.tournament_id == tournament)
            .filter(|t| t.status == TeamStatus::Open && !t.is_full)
            .collect()
    }

    /// Members of a team, captain first, then in joining order.
    pub fn list_team_members(&self, team_id: TeamId) -> Vec<&TournamentRegistration> {
        let mut members: Vec<_> = self
            .registrations
            .values()
            .filter(|r| r.team_id == Some(team_id))
            .collect();
        members.sort_by_key(|r| (!r.is_team_captain, r.id));
        members
    }

    /// A team of `tournament` that can take one more member.
    pub(super) fn joinable_team(
        &self,
        team_id: TeamId,
        tournament: TournamentId,
    ) -> Result<&TournamentTeam, RegistryError> {
        let team = self
            .teams
            .get(&team_id)
            .filter(|t| t.tournament_id == tournament)
            .ok_or(RegistryError::TeamNotFound(team_id))?;
        if team.status == TeamStatus::Closed {
            return Err(RegistryError::TeamClosed(team_id));
        }
        if team.is_full {
            return Err(RegistryError::TeamFull(team_id));
        }
        Ok(team)
    }
}
