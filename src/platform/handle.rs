//! Actor front-end for concurrent callers.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use super::{Command, Outcome, Platform};
use crate::Error;
use crate::config::Config;
use crate::ledger::WalletBalance;
use crate::model::{Tournament, TournamentId, TournamentRegistration, UserId};
use crate::registry::Entry;

struct Request {
    command: Command,
    response: oneshot::Sender<Result<Outcome, Error>>,
}

/// Cloneable handle to a platform running on its own task.
///
/// Requests are applied one at a time in arrival order.
#[derive(Debug, Clone)]
pub struct PlatformHandle {
    sender: mpsc::Sender<Request>,
}

impl PlatformHandle {
    /// Send a command and wait for its result.
    pub async fn send(&self, command: Command) -> Result<Outcome, Error> {
        let (response, reply) = oneshot::channel();
        self.sender
            .send(Request { command, response })
            .await
            .map_err(|_| Error::Upstream("platform task has stopped".to_string()))?;
        reply
            .await
            .map_err(|_| Error::Upstream("platform dropped the request".to_string()))?
    }

    pub async fn register(
        &self,
        user: UserId,
        tournament: TournamentId,
        game_id: &str,
        entry: Entry,
    ) -> Result<TournamentRegistration, Error> {
        let command = Command::Register {
            user,
            tournament,
            game_id: game_id.to_string(),
            entry,
        };
        match self.send(command).await? {
            Outcome::Registration(registration) => Ok(registration),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn balance(&self, user: UserId) -> Result<Option<WalletBalance>, Error> {
        match self.send(Command::GetBalance { user }).await? {
            Outcome::Balance(balance) => Ok(balance),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn tournament(&self, tournament: TournamentId) -> Result<Tournament, Error> {
        match self.send(Command::GetTournament { tournament }).await? {
            Outcome::Tournament(tournament) => Ok(tournament),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(outcome: &Outcome) -> Error {
    Error::Upstream(format!("unexpected reply {outcome:?}"))
}

impl Platform {
    /// Start a fresh platform on a background task.
    pub fn spawn(config: Config) -> PlatformHandle {
        Platform::new(config).start().0
    }

    /// Move this platform onto a background task.
    ///
    /// The task ends once every handle is dropped and gives the platform back.
    pub fn start(self) -> (PlatformHandle, JoinHandle<Platform>) {
        let (sender, inbox) = mpsc::channel(self.config.channel_capacity);
        let task = tokio::spawn(self.serve(inbox));
        (PlatformHandle { sender }, task)
    }

    async fn serve(mut self, mut inbox: mpsc::Receiver<Request>) -> Platform {
        while let Some(Request { command, response }) = inbox.recv().await {
            let result = self.apply(command);
            if response.send(result).is_err() {
                warn!("caller went away before the reply was sent");
            }
        }
        self
    }
}
