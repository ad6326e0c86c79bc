//! The platform engine.
//!
//! `Platform` owns the wallet ledger, the tournament registry and the
//! operator-side stores, and is the only place where they change. Every write
//! takes `&mut self`, so a check and the write that depends on it can never be
//! interleaved with another request. Concurrent callers go through a
//! [`PlatformHandle`], which serializes their requests on one task.

use chrono::Utc;
use std::collections::BTreeSet;

use crate::admin::{
    AdminError, Authorizer, Directory, RoleAuthorizer, TransactionWithUserInfo, WinningsGrant,
};
use crate::announcements::{AnnouncementUpdate, Board, NewAnnouncement};
use crate::config::Config;
use crate::ledger::{Decision, Ledger, NewTransaction, Payout, SettlementToken, WalletBalance};
use crate::model::{
    Announcement, AnnouncementId, QrCode, QrCodeId, RegistrationId, RegistrationStatus, Role,
    TeamId, Tournament, TournamentId, TournamentRegistration, TournamentRoom, TournamentStatus,
    TournamentTeam, TournamentTimer, TransactionStatus, TransactionType, TxId, UserId,
    UserProfile, WalletTransaction,
};
use crate::payment::PaymentProof;
use crate::qr::{NewQrCode, QrRegistry};
use crate::registry::{NewTournament, Player, Registry, RegistryError};
use crate::{Amount, Error};

mod command;
pub use command::{Command, Outcome};

mod flow;
pub use flow::{FlowOutcome, RegistrationAttempt};

mod handle;
pub use handle::PlatformHandle;

pub struct Platform {
    config: Config,
    ledger: Ledger,
    registry: Registry,
    directory: Directory,
    board: Board,
    qr_codes: QrRegistry,
    authorizer: Box<dyn Authorizer>,
}

impl Platform {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ledger: Ledger::new(),
            registry: Registry::new(),
            directory: Directory::new(),
            board: Board::new(),
            qr_codes: QrRegistry::new(),
            authorizer: Box::new(RoleAuthorizer),
        }
    }

    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Box::new(authorizer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every wallet, sorted by user.
    pub fn balances(&self) -> Vec<&WalletBalance> {
        let mut balances: Vec<_> = self.ledger.balances().collect();
        balances.sort_by_key(|b| b.user_id);
        balances
    }
}

/// Profiles
impl Platform {
    /// Create or update a profile. Emails listed in the config get the admin role.
    pub fn upsert_profile(
        &mut self,
        user: UserId,
        name: &str,
        email: &str,
    ) -> Result<UserProfile, Error> {
        let roles = if self.config.is_admin_email(email) {
            BTreeSet::from([Role::Admin])
        } else {
            BTreeSet::new()
        };
        Ok(self.directory.upsert(user, name, email, roles)?.clone())
    }

    pub fn profile(&self, user: UserId) -> Option<&UserProfile> {
        self.directory.get(user)
    }

    pub fn set_role(
        &mut self,
        actor: UserId,
        user: UserId,
        role: Role,
        granted: bool,
    ) -> Result<UserProfile, Error> {
        self.authorize(actor, "manage roles")?;
        Ok(self.directory.set_role(user, role, granted)?.clone())
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.directory
            .get(user)
            .is_some_and(|profile| self.authorizer.has_role(profile, Role::Admin))
    }
}

/// Wallet
impl Platform {
    pub fn balance(&self, user: UserId) -> Option<&WalletBalance> {
        self.ledger.get_balance(user)
    }

    /// A user's transactions, newest first.
    pub fn transactions(&self, user: UserId) -> Vec<&WalletTransaction> {
        self.ledger.list_transactions(user)
    }

    /// Ask for money paid outside the platform to be credited to the wallet.
    pub fn request_deposit(
        &mut self,
        user: UserId,
        amount: Amount,
        proof: &PaymentProof,
    ) -> Result<WalletTransaction, Error> {
        self.directory.profile(user)?;
        proof.validate()?;
        let tx = self.ledger.request_transaction(NewTransaction {
            user_id: user,
            transaction_type: TransactionType::Deposit,
            amount,
            payment_method: self.config.deposit_method.clone(),
            transaction_reference: Some(proof.transaction_id.trim().to_string()),
            admin_notes: Some(format!(
                "Name: {}, Mobile: {}",
                proof.payer_name.trim(),
                proof.phone.trim()
            )),
        })?;
        Ok(tx.clone())
    }

    pub fn request_withdrawal(
        &mut self,
        user: UserId,
        amount: Amount,
        payout: &Payout,
    ) -> Result<WalletTransaction, Error> {
        self.directory.profile(user)?;
        let notes = payout.notes()?;
        let tx = self.ledger.request_transaction(NewTransaction {
            user_id: user,
            transaction_type: TransactionType::Withdrawal,
            amount,
            payment_method: "UPI Transfer".to_string(),
            transaction_reference: None,
            admin_notes: Some(notes),
        })?;
        Ok(tx.clone())
    }
}

/// Wallet administration
impl Platform {
    pub fn resolve_transaction(
        &mut self,
        actor: UserId,
        id: TxId,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<WalletTransaction, Error> {
        self.authorize(actor, "resolve transactions")?;
        let notes = notes.filter(|n| !n.trim().is_empty());
        Ok(self
            .ledger
            .resolve_transaction(id, decision, notes, actor)?
            .clone())
    }

    pub fn approve(
        &mut self,
        actor: UserId,
        id: TxId,
        notes: Option<String>,
    ) -> Result<WalletTransaction, Error> {
        self.resolve_transaction(actor, id, Decision::Approve, notes)
    }

    pub fn reject(
        &mut self,
        actor: UserId,
        id: TxId,
        notes: Option<String>,
    ) -> Result<WalletTransaction, Error> {
        self.resolve_transaction(actor, id, Decision::Reject, notes)
    }

    /// Credit prize money to the player found by email, already approved.
    pub fn grant_winnings(
        &mut self,
        actor: UserId,
        grant: &WinningsGrant,
    ) -> Result<WalletTransaction, Error> {
        self.authorize(actor, "grant winnings")?;
        if !grant.amount.is_positive() {
            return Err(AdminError::InvalidAmount(grant.amount).into());
        }
        let notes = grant.notes()?;
        let user = self
            .directory
            .find_by_email(&grant.email)
            .ok_or_else(|| AdminError::UserNotFound(grant.email.trim().to_string()))?
            .user_id;

        let tx = self.ledger.record_settled_transaction(
            SettlementToken::issue(),
            NewTransaction {
                user_id: user,
                transaction_type: TransactionType::Deposit,
                amount: grant.amount,
                payment_method: "Tournament Winnings".to_string(),
                transaction_reference: Some(format!("winning_{}", Utc::now().timestamp_millis())),
                admin_notes: Some(notes),
            },
        )?;
        Ok(tx.clone())
    }

    /// Every transaction, newest first, with the owner's name, email and
    /// current available balance.
    pub fn transactions_with_user_info(
        &self,
        actor: UserId,
    ) -> Result<Vec<TransactionWithUserInfo>, Error> {
        self.authorize(actor, "view transactions")?;
        Ok(self
            .ledger
            .all_transactions()
            .map(|tx| self.with_user_info(tx))
            .collect())
    }

    pub fn pending_transactions(
        &self,
        actor: UserId,
    ) -> Result<Vec<TransactionWithUserInfo>, Error> {
        self.authorize(actor, "view transactions")?;
        Ok(self
            .ledger
            .all_transactions()
            .filter(|tx| tx.status == TransactionStatus::Pending)
            .map(|tx| self.with_user_info(tx))
            .collect())
    }
}

/// Tournaments
impl Platform {
    pub fn create_tournament(
        &mut self,
        actor: UserId,
        new: NewTournament,
    ) -> Result<Tournament, Error> {
        self.authorize(actor, "create tournaments")?;
        Ok(self.registry.create_tournament(new)?.clone())
    }

    pub fn set_tournament_status(
        &mut self,
        actor: UserId,
        tournament: TournamentId,
        status: TournamentStatus,
    ) -> Result<Tournament, Error> {
        self.authorize(actor, "change tournament status")?;
        Ok(self
            .registry
            .set_tournament_status(tournament, status)?
            .clone())
    }

    pub fn start_timer(
        &mut self,
        actor: UserId,
        tournament: TournamentId,
    ) -> Result<TournamentTimer, Error> {
        self.authorize(actor, "run the tournament timer")?;
        Ok(self.registry.start_timer(tournament, Utc::now())?.clone())
    }

    pub fn stop_timer(
        &mut self,
        actor: UserId,
        tournament: TournamentId,
    ) -> Result<TournamentTimer, Error> {
        self.authorize(actor, "run the tournament timer")?;
        Ok(self.registry.stop_timer(tournament)?.clone())
    }

    pub fn upsert_room(
        &mut self,
        actor: UserId,
        tournament: TournamentId,
        room_id: Option<String>,
        room_password: Option<String>,
    ) -> Result<TournamentRoom, Error> {
        self.authorize(actor, "manage rooms")?;
        Ok(self
            .registry
            .upsert_room(tournament, room_id, room_password)?
            .clone())
    }

    /// Room credentials, visible to registered players and admins only.
    pub fn room(
        &self,
        user: UserId,
        tournament: TournamentId,
    ) -> Result<Option<&TournamentRoom>, Error> {
        if self.registry.get_tournament(tournament).is_none() {
            return Err(RegistryError::TournamentNotFound(tournament).into());
        }
        if self.registry.check_existing(user, tournament).is_none() && !self.is_admin(user) {
            return Err(AdminError::NotAuthorized {
                user,
                action: "view the room",
            }
            .into());
        }
        Ok(self.registry.room(tournament))
    }

    pub fn update_registration_status(
        &mut self,
        actor: UserId,
        id: RegistrationId,
        status: RegistrationStatus,
    ) -> Result<TournamentRegistration, Error> {
        self.authorize(actor, "update registrations")?;
        Ok(self.registry.update_status(id, status)?.clone())
    }

    pub fn tournament(&self, id: TournamentId) -> Option<&Tournament> {
        self.registry.get_tournament(id)
    }

    pub fn tournaments(&self) -> Vec<&Tournament> {
        self.registry.tournaments().collect()
    }

    pub fn check_existing(
        &self,
        user: UserId,
        tournament: TournamentId,
    ) -> Option<&TournamentRegistration> {
        self.registry.check_existing(user, tournament)
    }

    pub fn tournament_registrations(&self, tournament: TournamentId) -> Vec<&TournamentRegistration> {
        self.registry.tournament_registrations(tournament)
    }

    pub fn user_registrations(&self, user: UserId) -> Vec<&TournamentRegistration> {
        self.registry.user_registrations(user)
    }

    pub fn available_teams(&self, tournament: TournamentId) -> Vec<&TournamentTeam> {
        self.registry.list_available_teams(tournament)
    }

    pub fn team_members(&self, team: TeamId) -> Vec<&TournamentRegistration> {
        self.registry.list_team_members(team)
    }
}

/// Announcements
impl Platform {
    pub fn create_announcement(
        &mut self,
        actor: UserId,
        new: NewAnnouncement,
    ) -> Result<Announcement, Error> {
        self.authorize(actor, "post announcements")?;
        Ok(self.board.create(new, actor)?.clone())
    }

    pub fn update_announcement(
        &mut self,
        actor: UserId,
        id: AnnouncementId,
        update: AnnouncementUpdate,
    ) -> Result<Announcement, Error> {
        self.authorize(actor, "edit announcements")?;
        Ok(self.board.update(id, update)?.clone())
    }

    pub fn set_announcement_active(
        &mut self,
        actor: UserId,
        id: AnnouncementId,
        active: bool,
    ) -> Result<Announcement, Error> {
        self.authorize(actor, "edit announcements")?;
        Ok(self.board.set_active(id, active)?.clone())
    }

    pub fn delete_announcement(
        &mut self,
        actor: UserId,
        id: AnnouncementId,
    ) -> Result<Announcement, Error> {
        self.authorize(actor, "delete announcements")?;
        Ok(self.board.delete(id)?)
    }

    /// Active announcements, most urgent first.
    pub fn announcements(&self) -> Vec<&Announcement> {
        self.board.public()
    }

    pub fn all_announcements(&self, actor: UserId) -> Result<Vec<&Announcement>, Error> {
        self.authorize(actor, "view all announcements")?;
        Ok(self.board.all())
    }
}

/// Payment QR codes
impl Platform {
    pub fn create_qr_code(&mut self, actor: UserId, new: NewQrCode) -> Result<QrCode, Error> {
        self.authorize(actor, "manage qr codes")?;
        Ok(self.qr_codes.create(new)?.clone())
    }

    pub fn set_qr_code_active(
        &mut self,
        actor: UserId,
        id: QrCodeId,
        active: bool,
    ) -> Result<QrCode, Error> {
        self.authorize(actor, "manage qr codes")?;
        Ok(self.qr_codes.set_active(id, active)?.clone())
    }

    pub fn delete_qr_code(&mut self, actor: UserId, id: QrCodeId) -> Result<QrCode, Error> {
        self.authorize(actor, "manage qr codes")?;
        Ok(self.qr_codes.delete(id)?)
    }

    pub fn active_qr_code(&self) -> Option<&QrCode> {
        self.qr_codes.active()
    }

    pub fn qr_codes(&self, actor: UserId) -> Result<Vec<&QrCode>, Error> {
        self.authorize(actor, "manage qr codes")?;
        Ok(self.qr_codes.all())
    }
}

/// Private API
impl Platform {
    fn authorize(&self, actor: UserId, action: &'static str) -> Result<(), Error> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            Err(AdminError::NotAuthorized {
                user: actor,
                action,
            }
            .into())
        }
    }

    /// The registering player, named after their profile.
    fn player(&self, user: UserId, game_id: &str) -> Result<Player, Error> {
        let profile = self.directory.profile(user)?;
        Ok(Player {
            user_id: user,
            player_name: profile.display_name().to_string(),
            game_id: game_id.to_string(),
        })
    }

    fn with_user_info(&self, tx: &WalletTransaction) -> TransactionWithUserInfo {
        let profile = self.directory.get(tx.user_id);
        TransactionWithUserInfo {
            transaction: tx.clone(),
            user_name: profile
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            user_email: profile
                .map(|p| p.email.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            user_balance: self
                .ledger
                .get_balance(tx.user_id)
                .map(|b| b.available_balance)
                .unwrap_or_default(),
        }
    }
}
