//! Operator access: roles, the user directory and back-office views.

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

use crate::Amount;
use crate::model::{Role, UserId, UserProfile, WalletTransaction};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("user {user} may not {action}")]
    NotAuthorized { user: UserId, action: &'static str },

    #[error("user {0} has no profile")]
    UnknownUser(UserId),

    #[error("no user found with email '{0}'")]
    UserNotFound(String),

    #[error("email '{0}' already belongs to another user")]
    DuplicateEmail(String),

    #[error("amount must be greater than zero, got {0}")]
    InvalidAmount(Amount),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Decides whether a user holds a role.
pub trait Authorizer: Send + Sync {
    fn has_role(&self, user: &UserProfile, role: Role) -> bool;
}

/// Reads roles straight from the user's profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn has_role(&self, user: &UserProfile, role: Role) -> bool {
        user.roles.contains(&role)
    }
}

/// Prize money an operator credits to a player's wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningsGrant {
    /// Exact address or a fragment of it.
    pub email: String,
    pub amount: Amount,
    pub tournament_name: String,
    pub description: Option<String>,
}

impl WinningsGrant {
    pub fn notes(&self) -> Result<String, AdminError> {
        let tournament = self.tournament_name.trim();
        if tournament.is_empty() {
            return Err(AdminError::EmptyField("tournament name"));
        }
        Ok(match self.description.as_deref().map(str::trim) {
            Some(description) if !description.is_empty() => {
                format!("Tournament: {tournament} - {description}")
            }
            _ => format!("Tournament: {tournament}"),
        })
    }
}

/// A transaction joined with who made it and what they hold now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionWithUserInfo {
    #[serde(flatten)]
    pub transaction: WalletTransaction,
    pub user_name: String,
    pub user_email: String,
    pub user_balance: Amount,
}

/// User profiles, indexed by id and by lowercase email.
#[derive(Debug, Default)]
pub struct Directory {
    profiles: BTreeMap<UserId, UserProfile>,
    by_email: HashMap<String, UserId>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId) -> Option<&UserProfile> {
        self.profiles.get(&user)
    }

    pub fn profile(&self, user: UserId) -> Result<&UserProfile, AdminError> {
        self.get(user).ok_or(AdminError::UnknownUser(user))
    }

    /// Create or update a profile. Roles of an existing profile are kept and
    /// `roles` are added to them.
    pub fn upsert(
        &mut self,
        user: UserId,
        name: &str,
        email: &str,
        roles: BTreeSet<Role>,
    ) -> Result<&UserProfile, AdminError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AdminError::EmptyField("email"));
        }
        if let Some(owner) = self.by_email.get(&email)
            && *owner != user
        {
            return Err(AdminError::DuplicateEmail(email));
        }

        let profile = self.profiles.entry(user).or_insert_with(|| UserProfile {
            user_id: user,
            name: String::new(),
            email: String::new(),
            roles: BTreeSet::new(),
            created_at: Utc::now(),
        });
        if profile.email != email {
            self.by_email.remove(&profile.email);
            self.by_email.insert(email.clone(), user);
            profile.email = email;
        }
        profile.name = name.trim().to_string();
        profile.roles.extend(roles);
        Ok(&*profile)
    }

    pub fn set_role(&mut self, user: UserId, role: Role, granted: bool) -> Result<&UserProfile, AdminError> {
        let profile = self
            .profiles
            .get_mut(&user)
            .ok_or(AdminError::UnknownUser(user))?;
        if granted {
            profile.roles.insert(role);
        } else {
            profile.roles.remove(&role);
        }
        Ok(&*profile)
    }

    /// Exact (case-insensitive) email match first, then the first profile
    /// whose email contains the query.
    pub fn find_by_email(&self, email: &str) -> Option<&UserProfile> {
        let query = email.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        if let Some(user) = self.by_email.get(&query) {
            return self.profiles.get(user);
        }
        self.profiles.values().find(|p| p.email.contains(&query))
    }
}
