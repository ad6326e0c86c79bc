//! Core domain types: identifiers, enumerations and the rows the platform stores.
//!
//! Enumerations serialize to the lowercase names used by the persisted rows
//! (`deposit`, `pending`, `squad`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::Amount;

/// User identifier.
pub type UserId = u32;

/// Tournament identifier.
pub type TournamentId = u32;

/// Team identifier.
pub type TeamId = u32;

/// Wallet transaction identifier.
pub type TxId = u64;

/// Tournament registration identifier.
pub type RegistrationId = u64;

/// Announcement identifier.
pub type AnnouncementId = u32;

/// Payment QR code identifier.
pub type QrCodeId = u32;

/// Error returned when a wire name does not match any variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum!(
    /// Direction of a wallet transaction.
    TransactionType, "transaction type" {
        Deposit => "deposit",
        Withdrawal => "withdrawal",
    }
);

wire_enum!(
    /// Lifecycle of a wallet transaction. `Approved` and `Rejected` are final.
    TransactionStatus, "transaction status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

wire_enum!(
    /// Team size category of a tournament.
    TeamSize, "team size" {
        Solo => "solo",
        Duo => "duo",
        Squad => "squad",
    }
);

wire_enum!(
    TournamentStatus, "tournament status" {
        Upcoming => "upcoming",
        Ongoing => "ongoing",
        Completed => "completed",
        Full => "full",
    }
);

wire_enum!(
    TeamStatus, "team status" {
        Open => "open",
        Closed => "closed",
    }
);

wire_enum!(
    RegistrationStatus, "registration status" {
        Registered => "registered",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
);

wire_enum!(
    /// Announcement priority. Declared most urgent first so `Ord` is display order.
    Priority, "priority" {
        Urgent => "urgent",
        High => "high",
        Normal => "normal",
        Low => "low",
    }
);

wire_enum!(
    Role, "role" {
        Admin => "admin",
    }
);

impl TransactionStatus {
    pub fn is_final(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl TeamSize {
    /// Number of players per team for this category.
    pub fn max_members(self) -> u32 {
        match self {
            TeamSize::Solo => 1,
            TeamSize::Duo => 2,
            TeamSize::Squad => 4,
        }
    }

    pub fn is_team(self) -> bool {
        !matches!(self, TeamSize::Solo)
    }
}

impl Priority {
    /// Sort rank, urgent first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

/// A ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: TxId,
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub payment_method: String,
    pub transaction_reference: Option<String>,
    pub admin_notes: Option<String>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    /// Entry fee as it was typed when the tournament was created.
    pub entry_fee_label: String,
    /// Structured fee parsed once from `entry_fee_label`.
    pub entry_fee: Amount,
    pub max_participants: u32,
    pub current_participants: u32,
    pub team_size: TeamSize,
    pub status: TournamentStatus,
    pub timer: TournamentTimer,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    pub fn is_free(&self) -> bool {
        self.entry_fee.is_zero()
    }

    pub fn is_full(&self) -> bool {
        self.status == TournamentStatus::Full || self.current_participants >= self.max_participants
    }
}

/// Countdown shown before a tournament starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentTimer {
    pub timer_duration: u32,
    pub timer_is_running: bool,
    pub timer_start_time: Option<DateTime<Utc>>,
}

impl TournamentTimer {
    /// Whole seconds left at `now`; zero when stopped or elapsed.
    pub fn remaining(&self, now: DateTime<Utc>) -> u32 {
        let Some(started) = self.timer_start_time else {
            return 0;
        };
        if !self.timer_is_running {
            return 0;
        }
        let elapsed = (now - started).num_seconds().max(0);
        (i64::from(self.timer_duration) - elapsed).max(0) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentRegistration {
    pub id: RegistrationId,
    pub user_id: UserId,
    pub tournament_id: TournamentId,
    pub player_name: String,
    pub game_id: String,
    pub status: RegistrationStatus,
    pub payment_amount: Amount,
    pub team_id: Option<TeamId>,
    pub is_team_captain: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentTeam {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    pub captain_user_id: UserId,
    pub team_name: String,
    pub max_members: u32,
    pub current_members: u32,
    pub is_full: bool,
    pub status: TeamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TournamentTeam {
    pub fn slots_left(&self) -> u32 {
        self.max_members.saturating_sub(self.current_members)
    }
}

/// Lobby credentials handed to registered players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentRoom {
    pub tournament_id: TournamentId,
    pub room_id: Option<String>,
    pub room_password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    /// Always stored lowercase.
    pub email: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Name shown on registrations, falling back to the email address.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub is_active: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// QR code image players scan to pay manually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    pub id: QrCodeId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
