//! Tournaments and who is playing in them.
//!
//! The registry owns the `tournaments`, `tournament_registrations`,
//! `tournament_teams` and `tournament_rooms` rows. Every write goes through
//! `&mut self`, so the capacity check, the uniqueness check and the insert are
//! one step and the participant count is recomputed in the same step.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::Amount;
use crate::amount::parse_entry_fee;
use crate::model::{
    RegistrationId, RegistrationStatus, TeamId, TeamSize, TeamStatus, Tournament, TournamentId,
    TournamentRegistration, TournamentRoom, TournamentStatus, TournamentTeam, TournamentTimer,
    UserId,
};

mod error;
pub use error::RegistryError;

mod teams;

/// Fields an admin fills in when creating a tournament.
#[derive(Debug, Clone)]
pub struct NewTournament {
    pub name: String,
    /// Free-text fee such as `"₹30"` or `"Free"`.
    pub entry_fee: String,
    pub max_participants: u32,
    pub team_size: TeamSize,
    pub timer_duration: u32,
}

/// The player behind a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub user_id: UserId,
    pub player_name: String,
    /// In-game identifier.
    pub game_id: String,
}

/// How a player enters a tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Solo,
    CreateTeam { team_name: String },
    JoinTeam { team_id: TeamId },
}

#[derive(Debug, Default)]
pub struct Registry {
    tournaments: BTreeMap<TournamentId, Tournament>,
    registrations: BTreeMap<RegistrationId, TournamentRegistration>,
    /// Uniqueness index over (user, tournament)
    by_player: HashMap<(UserId, TournamentId), RegistrationId>,
    teams: BTreeMap<TeamId, TournamentTeam>,
    rooms: HashMap<TournamentId, TournamentRoom>,
    next_tournament: TournamentId,
    next_registration: RegistrationId,
    next_team: TeamId,
}

/// Tournaments
impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_tournament(&mut self, new: NewTournament) -> Result<&Tournament, RegistryError> {
        if new.name.trim().is_empty() {
            return Err(RegistryError::EmptyField("tournament name"));
        }
        if new.max_participants == 0 {
            return Err(RegistryError::InvalidCapacity);
        }

        self.next_tournament += 1;
        let id = self.next_tournament;
        let now = Utc::now();
        let tournament = Tournament {
            id,
            name: new.name.trim().to_string(),
            entry_fee: parse_entry_fee(&new.entry_fee),
            entry_fee_label: new.entry_fee,
            max_participants: new.max_participants,
            current_participants: 0,
            team_size: new.team_size,
            status: TournamentStatus::Upcoming,
            timer: TournamentTimer {
                timer_duration: new.timer_duration,
                ..TournamentTimer::default()
            },
            created_at: now,
            updated_at: now,
        };
        Ok(&*self.tournaments.entry(id).or_insert(tournament))
    }

    pub fn get_tournament(&self, id: TournamentId) -> Option<&Tournament> {
        self.tournaments.get(&id)
    }

    pub fn tournaments(&self) -> impl Iterator<Item = &Tournament> + '_ {
        self.tournaments.values()
    }

    /// Change a tournament's status. Once play starts or ends, its teams close.
    pub fn set_tournament_status(
        &mut self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> Result<&Tournament, RegistryError> {
        let now = Utc::now();
        if matches!(status, TournamentStatus::Ongoing | TournamentStatus::Completed) {
            for team in self.teams.values_mut().filter(|t| t.tournament_id == id) {
                team.status = TeamStatus::Closed;
                team.updated_at = now;
            }
        }
        let tournament = self.tournament_mut(id)?;
        tournament.status = status;
        tournament.updated_at = now;
        Ok(&*tournament)
    }

    pub fn start_timer(
        &mut self,
        id: TournamentId,
        now: DateTime<Utc>,
    ) -> Result<&TournamentTimer, RegistryError> {
        let tournament = self.tournament_mut(id)?;
        tournament.timer.timer_is_running = true;
        tournament.timer.timer_start_time = Some(now);
        tournament.updated_at = now;
        Ok(&tournament.timer)
    }

    pub fn stop_timer(&mut self, id: TournamentId) -> Result<&TournamentTimer, RegistryError> {
        let tournament = self.tournament_mut(id)?;
        tournament.timer.timer_is_running = false;
        tournament.updated_at = Utc::now();
        Ok(&tournament.timer)
    }
}

/// Registrations
impl Registry {
    /// Existing registration of `user` for `tournament`, if any.
    pub fn check_existing(
        &self,
        user: UserId,
        tournament: TournamentId,
    ) -> Option<&TournamentRegistration> {
        self.by_player
            .get(&(user, tournament))
            .and_then(|id| self.registrations.get(id))
    }

    /// Check every precondition of `entry` without writing anything.
    ///
    /// Used before money moves, so a wallet charge is only taken when the
    /// registration that follows it cannot fail.
    pub fn ensure_can_register(
        &self,
        player: &Player,
        tournament: TournamentId,
        entry: &Entry,
    ) -> Result<&Tournament, RegistryError> {
        Self::validate_player(player)?;
        let user = player.user_id;
        let t = self.open_tournament(tournament)?;
        if self.by_player.contains_key(&(user, tournament)) {
            return Err(RegistryError::AlreadyRegistered { user, tournament });
        }
        match entry {
            Entry::Solo if t.team_size.is_team() => {
                Err(RegistryError::TeamRequired(tournament, t.team_size))
            }
            Entry::Solo => Ok(t),
            Entry::CreateTeam { team_name } => {
                if !t.team_size.is_team() {
                    return Err(RegistryError::NotTeamTournament(tournament));
                }
                if team_name.trim().is_empty() {
                    return Err(RegistryError::EmptyField("team name"));
                }
                Ok(t)
            }
            Entry::JoinTeam { team_id } => {
                self.joinable_team(*team_id, tournament)?;
                Ok(t)
            }
        }
    }

    /// Register through any entry path.
    pub fn register(
        &mut self,
        tournament: TournamentId,
        player: Player,
        entry: Entry,
        payment_amount: Amount,
    ) -> Result<TournamentRegistration, RegistryError> {
        match entry {
            Entry::Solo => self
                .register_solo(tournament, player, payment_amount)
                .cloned(),
            Entry::CreateTeam { team_name } => self
                .create_team(tournament, &team_name, player, payment_amount)
                .map(|(_, registration)| registration),
            Entry::JoinTeam { team_id } => {
                // the team decides the tournament; a mismatch is reported as not found
                self.joinable_team(team_id, tournament)?;
                self.join_team(team_id, player, payment_amount).cloned()
            }
        }
    }

    /// Register a player for a solo tournament.
    pub fn register_solo(
        &mut self,
        tournament: TournamentId,
        player: Player,
        payment_amount: Amount,
    ) -> Result<&TournamentRegistration, RegistryError> {
        self.ensure_can_register(&player, tournament, &Entry::Solo)?;

        let id = self.insert_registration(tournament, player, payment_amount, None, false);
        self.recompute_participant_count(tournament)?;
        self.registrations
            .get(&id)
            .ok_or(RegistryError::RegistrationNotFound(id))
    }

    /// Recount a tournament's registrations, store the count and flip the
    /// tournament to `full` once it reaches capacity.
    pub fn recompute_participant_count(
        &mut self,
        tournament: TournamentId,
    ) -> Result<u32, RegistryError> {
        let count = self
            .registrations
            .values()
            .filter(|r| r.tournament_id == tournament)
            .count() as u32;

        let t = self.tournament_mut(tournament)?;
        t.current_participants = count;
        t.updated_at = Utc::now();
        if count >= t.max_participants && t.status != TournamentStatus::Full {
            t.status = TournamentStatus::Full;
            warn!(
                tournament = t.id,
                participants = count,
                "tournament is full, registration closed"
            );
        }
        Ok(count)
    }

    /// Registrations of a tournament, oldest first.
    pub fn tournament_registrations(&self, tournament: TournamentId) -> Vec<&TournamentRegistration> {
        self.registrations
            .values()
            .filter(|r| r.tournament_id == tournament)
            .collect()
    }

    /// Registrations of a user, newest first.
    pub fn user_registrations(&self, user: UserId) -> Vec<&TournamentRegistration> {
        self.registrations
            .values()
            .rev()
            .filter(|r| r.user_id == user)
            .collect()
    }

    pub fn update_status(
        &mut self,
        id: RegistrationId,
        status: RegistrationStatus,
    ) -> Result<&TournamentRegistration, RegistryError> {
        let registration = self
            .registrations
            .get_mut(&id)
            .ok_or(RegistryError::RegistrationNotFound(id))?;
        registration.status = status;
        registration.updated_at = Utc::now();
        Ok(&*registration)
    }
}

/// Rooms
impl Registry {
    pub fn room(&self, tournament: TournamentId) -> Option<&TournamentRoom> {
        self.rooms.get(&tournament)
    }

    /// Insert or update the lobby credentials; `None` fields keep their value.
    pub fn upsert_room(
        &mut self,
        tournament: TournamentId,
        room_id: Option<String>,
        room_password: Option<String>,
    ) -> Result<&TournamentRoom, RegistryError> {
        if !self.tournaments.contains_key(&tournament) {
            return Err(RegistryError::TournamentNotFound(tournament));
        }
        let now = Utc::now();
        let room = self.rooms.entry(tournament).or_insert_with(|| TournamentRoom {
            tournament_id: tournament,
            room_id: None,
            room_password: None,
            created_at: now,
            updated_at: now,
        });
        if room_id.is_some() {
            room.room_id = room_id;
        }
        if room_password.is_some() {
            room.room_password = room_password;
        }
        room.updated_at = now;
        Ok(&*room)
    }
}

/// Private API
impl Registry {
    fn tournament_mut(&mut self, id: TournamentId) -> Result<&mut Tournament, RegistryError> {
        self.tournaments
            .get_mut(&id)
            .ok_or(RegistryError::TournamentNotFound(id))
    }

    /// A tournament that still accepts registrations.
    fn open_tournament(&self, id: TournamentId) -> Result<&Tournament, RegistryError> {
        let t = self
            .tournaments
            .get(&id)
            .ok_or(RegistryError::TournamentNotFound(id))?;
        match t.status {
            TournamentStatus::Ongoing | TournamentStatus::Completed => {
                Err(RegistryError::RegistrationClosed(id, t.status))
            }
            _ if t.is_full() => Err(RegistryError::TournamentFull(id)),
            _ => Ok(t),
        }
    }

    fn validate_player(player: &Player) -> Result<(), RegistryError> {
        if player.player_name.trim().is_empty() {
            return Err(RegistryError::EmptyField("player name"));
        }
        if player.game_id.trim().is_empty() {
            return Err(RegistryError::EmptyField("game id"));
        }
        Ok(())
    }

    fn insert_registration(
        &mut self,
        tournament: TournamentId,
        player: Player,
        payment_amount: Amount,
        team_id: Option<TeamId>,
        is_team_captain: bool,
    ) -> RegistrationId {
        self.next_registration += 1;
        let id = self.next_registration;
        let now = Utc::now();
        self.by_player.insert((player.user_id, tournament), id);
        self.registrations.insert(
            id,
            TournamentRegistration {
                id,
                user_id: player.user_id,
                tournament_id: tournament,
                player_name: player.player_name.trim().to_string(),
                game_id: player.game_id.trim().to_string(),
                status: RegistrationStatus::Registered,
                payment_amount,
                team_id,
                is_team_captain,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn player(user: UserId) -> Player {
        Player {
            user_id: user,
            player_name: format!("player{user}"),
            game_id: format!("BGMI-{user}"),
        }
    }

    pub(super) fn tournament(registry: &mut Registry, fee: &str, max: u32, size: TeamSize) -> TournamentId {
        registry
            .create_tournament(NewTournament {
                name: "Weekend Clash".to_string(),
                entry_fee: fee.to_string(),
                max_participants: max,
                team_size: size,
                timer_duration: 300,
            })
            .unwrap()
            .id
    }

    #[test]
    fn create_tournament_parses_fee_once() {
        let mut registry = Registry::new();
        let t = registry
            .create_tournament(NewTournament {
                name: " Cup ".to_string(),
                entry_fee: "₹30".to_string(),
                max_participants: 10,
                team_size: TeamSize::Solo,
                timer_duration: 0,
            })
            .unwrap();
        assert_eq!(t.name, "Cup");
        assert_eq!(t.entry_fee, Amount::from_whole(30));
        assert_eq!(t.entry_fee_label, "₹30");
        assert_eq!(t.status, TournamentStatus::Upcoming);
        assert!(!t.is_free());
    }

    #[test]
    fn create_tournament_validates_input() {
        let mut registry = Registry::new();
        let mut new = NewTournament {
            name: "".to_string(),
            entry_fee: "Free".to_string(),
            max_participants: 10,
            team_size: TeamSize::Solo,
            timer_duration: 0,
        };
        assert_eq!(
            registry.create_tournament(new.clone()).unwrap_err(),
            RegistryError::EmptyField("tournament name")
        );
        new.name = "Cup".to_string();
        new.max_participants = 0;
        assert_eq!(
            registry.create_tournament(new).unwrap_err(),
            RegistryError::InvalidCapacity
        );
    }

    #[test]
    fn register_solo_creates_registration_and_counts() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "Free", 10, TeamSize::Solo);
        let reg = registry
            .register_solo(t, player(1), Amount::ZERO)
            .unwrap()
            .clone();
        assert_eq!(reg.status, RegistrationStatus::Registered);
        assert_eq!(reg.game_id, "BGMI-1");
        assert_eq!(registry.check_existing(1, t), Some(&reg));
        assert_eq!(registry.get_tournament(t).unwrap().current_participants, 1);
    }

    #[test]
    fn second_registration_for_same_pair_fails() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "Free", 10, TeamSize::Solo);
        registry.register_solo(t, player(1), Amount::ZERO).unwrap();

        let result = registry.register_solo(t, player(1), Amount::ZERO);
        assert_eq!(
            result.unwrap_err(),
            RegistryError::AlreadyRegistered {
                user: 1,
                tournament: t
            }
        );
        assert_eq!(registry.tournament_registrations(t).len(), 1);
    }

    #[test]
    fn last_slot_flips_tournament_to_full() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "", 2, TeamSize::Solo);
        registry.register_solo(t, player(1), Amount::ZERO).unwrap();
        registry.register_solo(t, player(2), Amount::ZERO).unwrap();

        let full = registry.get_tournament(t).unwrap();
        assert_eq!(full.current_participants, 2);
        assert_eq!(full.status, TournamentStatus::Full);

        let result = registry.register_solo(t, player(3), Amount::ZERO);
        assert_eq!(result.unwrap_err(), RegistryError::TournamentFull(t));
        assert_eq!(registry.get_tournament(t).unwrap().current_participants, 2);
    }

    #[test]
    fn started_tournament_rejects_registration() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "", 10, TeamSize::Solo);
        registry
            .set_tournament_status(t, TournamentStatus::Ongoing)
            .unwrap();
        let result = registry.register_solo(t, player(1), Amount::ZERO);
        assert_eq!(
            result.unwrap_err(),
            RegistryError::RegistrationClosed(t, TournamentStatus::Ongoing)
        );
    }

    #[test]
    fn solo_entry_into_team_tournament_fails() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "", 10, TeamSize::Duo);
        let result = registry.register_solo(t, player(1), Amount::ZERO);
        assert_eq!(
            result.unwrap_err(),
            RegistryError::TeamRequired(t, TeamSize::Duo)
        );
    }

    #[test]
    fn missing_game_id_is_rejected() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "", 10, TeamSize::Solo);
        let mut p = player(1);
        p.game_id = "  ".to_string();
        assert_eq!(
            registry.register_solo(t, p, Amount::ZERO).unwrap_err(),
            RegistryError::EmptyField("game id")
        );
        assert!(registry.check_existing(1, t).is_none());
    }

    #[test]
    fn unknown_tournament_is_not_found() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.register_solo(9, player(1), Amount::ZERO).unwrap_err(),
            RegistryError::TournamentNotFound(9)
        );
    }

    #[test]
    fn user_registrations_are_newest_first() {
        let mut registry = Registry::new();
        let a = tournament(&mut registry, "", 10, TeamSize::Solo);
        let b = tournament(&mut registry, "", 10, TeamSize::Solo);
        registry.register_solo(a, player(1), Amount::ZERO).unwrap();
        registry.register_solo(b, player(1), Amount::ZERO).unwrap();
        let order: Vec<TournamentId> = registry
            .user_registrations(1)
            .iter()
            .map(|r| r.tournament_id)
            .collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn update_status_changes_only_status() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "", 10, TeamSize::Solo);
        let id = registry.register_solo(t, player(1), Amount::ZERO).unwrap().id;
        let reg = registry
            .update_status(id, RegistrationStatus::Confirmed)
            .unwrap();
        assert_eq!(reg.status, RegistrationStatus::Confirmed);
        assert_eq!(reg.user_id, 1);
        assert_eq!(
            registry.update_status(77, RegistrationStatus::Cancelled).unwrap_err(),
            RegistryError::RegistrationNotFound(77)
        );
    }

    #[test]
    fn room_upsert_keeps_unset_fields() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "", 10, TeamSize::Solo);
        registry
            .upsert_room(t, Some("ROOM-1".into()), Some("secret".into()))
            .unwrap();
        let room = registry.upsert_room(t, Some("ROOM-2".into()), None).unwrap();
        assert_eq!(room.room_id.as_deref(), Some("ROOM-2"));
        assert_eq!(room.room_password.as_deref(), Some("secret"));
        assert_eq!(
            registry.upsert_room(42, None, None).unwrap_err(),
            RegistryError::TournamentNotFound(42)
        );
    }

    #[test]
    fn timer_start_and_stop() {
        let mut registry = Registry::new();
        let t = tournament(&mut registry, "", 10, TeamSize::Solo);
        let now = Utc::now();
        let timer = registry.start_timer(t, now).unwrap();
        assert_eq!(timer.remaining(now), 300);
        let timer = registry.stop_timer(t).unwrap();
        assert_eq!(timer.remaining(now), 0);
    }
}
