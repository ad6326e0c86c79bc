use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::admin::WinningsGrant;
use crate::ledger::{Decision, Payout, WalletBalance};
use crate::model::{TeamId, TeamSize, TournamentId, TournamentStatus, TxId, UserId};
use crate::payment::PaymentProof;
use crate::platform::Command;
use crate::registry::{Entry, NewTournament};
use crate::Amount;

/// Errors that can occur when reading the command journal
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open journal: {0}")]
    Open(csv::Error),

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized op '{op}'")]
    UnrecognizedOp { line: usize, op: String },

    #[error("line {line}: {op} missing {field}")]
    MissingField {
        line: usize,
        op: String,
        field: &'static str,
    },

    #[error("line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// One journal row. Which columns an op reads:
///
/// | op            | columns                                                      |
/// |---------------|--------------------------------------------------------------|
/// | `profile`     | user, name, detail = email                                   |
/// | `tournament`  | user (admin), name, amount = fee label, detail = `size/max`  |
/// | `status`      | user (admin), tournament, detail = status                    |
/// | `deposit`     | user, amount, name = payer, detail = `reference/phone`       |
/// | `withdraw`    | user, amount, name = account name, detail = `upi/mobile`     |
/// | `approve`     | user (admin), tx, detail = notes                             |
/// | `reject`      | user (admin), tx, detail = notes                             |
/// | `grant`       | user (admin), amount, name = tournament name, detail = email |
/// | `register`    | user, tournament, name = game id                             |
/// | `create_team` | user, tournament, name = game id, detail = team name         |
/// | `join_team`   | user, tournament, team, name = game id                       |
#[derive(Debug, Deserialize)]
struct InputRow {
    op: String,
    user: Option<UserId>,
    tournament: Option<TournamentId>,
    team: Option<TeamId>,
    tx: Option<TxId>,
    amount: Option<String>,
    name: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    user: UserId,
    available: String,
    pending: String,
    deposited: String,
    withdrawn: String,
}

/// Read platform commands from a csv journal
pub fn read_commands(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Command, CsvError>>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(CsvError::Open)?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            row.into_command(line)
        }))
}

/// Write wallet balances in csv format, in the order given
pub fn write_balances<'a>(
    balances: impl IntoIterator<Item = &'a WalletBalance>,
    out: impl io::Write,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);

    for balance in balances {
        writer.serialize(OutputRow {
            user: balance.user_id,
            available: balance.available_balance.to_string(),
            pending: balance.pending_balance.to_string(),
            deposited: balance.total_deposited.to_string(),
            withdrawn: balance.total_withdrawn.to_string(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

impl InputRow {
    fn into_command(self, line: usize) -> Result<Command, CsvError> {
        let op = self.op.to_lowercase();
        let missing = |field: &'static str| CsvError::MissingField {
            line,
            op: op.clone(),
            field,
        };
        let user = self.user.ok_or_else(|| missing("user"))?;

        let command = match op.as_str() {
            "profile" => Command::UpsertProfile {
                user,
                name: self.name.unwrap_or_default(),
                email: self.detail.ok_or_else(|| missing("email"))?,
            },
            "tournament" => {
                let detail = self.detail.ok_or_else(|| missing("size/max"))?;
                let (size, max) = split_pair(&detail).ok_or_else(|| missing("size/max"))?;
                Command::CreateTournament {
                    actor: user,
                    tournament: NewTournament {
                        name: self.name.ok_or_else(|| missing("name"))?,
                        entry_fee: self.amount.unwrap_or_else(|| "Free".to_string()),
                        max_participants: parse(line, "max participants", max)?,
                        team_size: parse::<TeamSize>(line, "team size", size)?,
                        timer_duration: 0,
                    },
                }
            }
            "status" => Command::SetTournamentStatus {
                actor: user,
                tournament: self.tournament.ok_or_else(|| missing("tournament"))?,
                status: parse::<TournamentStatus>(
                    line,
                    "status",
                    &self.detail.ok_or_else(|| missing("status"))?,
                )?,
            },
            "deposit" => {
                let detail = self.detail.ok_or_else(|| missing("reference/phone"))?;
                let (reference, phone) =
                    split_pair(&detail).ok_or_else(|| missing("reference/phone"))?;
                Command::RequestDeposit {
                    user,
                    amount: amount(line, self.amount).ok_or_else(|| missing("amount"))??,
                    proof: PaymentProof {
                        payer_name: self.name.ok_or_else(|| missing("name"))?,
                        transaction_id: reference.to_string(),
                        phone: phone.to_string(),
                    },
                }
            }
            "withdraw" => {
                let detail = self.detail.ok_or_else(|| missing("upi/mobile"))?;
                let (upi_id, mobile) = split_pair(&detail).ok_or_else(|| missing("upi/mobile"))?;
                Command::RequestWithdrawal {
                    user,
                    amount: amount(line, self.amount).ok_or_else(|| missing("amount"))??,
                    payout: Payout {
                        upi_id: upi_id.to_string(),
                        name: self.name.ok_or_else(|| missing("name"))?,
                        mobile: mobile.to_string(),
                    },
                }
            }
            "approve" | "reject" => Command::ResolveTransaction {
                actor: user,
                tx: self.tx.ok_or_else(|| missing("tx"))?,
                decision: if op == "approve" {
                    Decision::Approve
                } else {
                    Decision::Reject
                },
                notes: self.detail,
            },
            "grant" => Command::GrantWinnings {
                actor: user,
                grant: WinningsGrant {
                    email: self.detail.ok_or_else(|| missing("email"))?,
                    amount: amount(line, self.amount).ok_or_else(|| missing("amount"))??,
                    tournament_name: self.name.ok_or_else(|| missing("name"))?,
                    description: None,
                },
            },
            "register" | "create_team" | "join_team" => {
                let entry = match op.as_str() {
                    "register" => Entry::Solo,
                    "create_team" => Entry::CreateTeam {
                        team_name: self.detail.ok_or_else(|| missing("team name"))?,
                    },
                    _ => Entry::JoinTeam {
                        team_id: self.team.ok_or_else(|| missing("team"))?,
                    },
                };
                Command::Register {
                    user,
                    tournament: self.tournament.ok_or_else(|| missing("tournament"))?,
                    game_id: self.name.ok_or_else(|| missing("game id"))?,
                    entry,
                }
            }
            _ => {
                return Err(CsvError::UnrecognizedOp {
                    line,
                    op: self.op,
                });
            }
        };
        Ok(command)
    }
}

fn split_pair(value: &str) -> Option<(&str, &str)> {
    value
        .split_once('/')
        .map(|(a, b)| (a.trim(), b.trim()))
        .filter(|(a, b)| !a.is_empty() && !b.is_empty())
}

fn parse<T: std::str::FromStr>(line: usize, field: &'static str, value: &str) -> Result<T, CsvError> {
    value.trim().parse().map_err(|_| CsvError::InvalidField {
        line,
        field,
        value: value.to_string(),
    })
}

fn amount(line: usize, value: Option<String>) -> Option<Result<Amount, CsvError>> {
    value.map(|v| {
        let value = parse::<f64>(line, "amount", &v)?;
        Amount::from_float(value).ok_or(CsvError::InvalidField {
            line,
            field: "amount",
            value: v,
        })
    })
}
