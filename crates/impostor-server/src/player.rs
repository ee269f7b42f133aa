//! Per-connection participant state.

use impostor_core::protocol::{PlayerId, Role, ServerMessage};
use tokio::sync::mpsc;

/// Handle to a connection's outbound queue.
///
/// The WebSocket write loop drains the matching receiver and forwards each
/// message as a JSON text frame.
pub type PlayerTx = mpsc::UnboundedSender<ServerMessage>;
pub type PlayerRx = mpsc::UnboundedReceiver<ServerMessage>;

/// Serial number of a gateway connection.  Unlike player ids these are
/// never reused, even across a reset.
pub type ConnectionId = u64;

/// A connected player.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub role: Role,
    pub alive: bool,
    pub tasks_left: u32,
    pub connection: ConnectionId,
    tx: PlayerTx,
}

impl Player {
    pub fn new(
        id: PlayerId,
        role: Role,
        tasks_left: u32,
        connection: ConnectionId,
        tx: PlayerTx,
    ) -> Self {
        Self {
            id,
            role,
            alive: true,
            tasks_left,
            connection,
            tx,
        }
    }

    pub fn is_impostor(&self) -> bool {
        self.role.is_impostor()
    }

    /// Finish one task.  Returns `false` if the player is dead or has none
    /// left.
    pub fn complete_task(&mut self) -> bool {
        if !self.alive || self.tasks_left == 0 {
            return false;
        }
        self.tasks_left -= 1;
        true
    }

    /// Mark the player dead and tell them.  The caller is responsible for
    /// refreshing everyone's counts afterwards.
    pub fn kill(&mut self) {
        self.alive = false;
        self.send(&ServerMessage::Death);
    }

    /// The `S2C_ASSIGN_PLAYER` message describing this player.
    pub fn assignment(&self) -> ServerMessage {
        ServerMessage::AssignPlayer {
            role: self.role,
            id: self.id.clone(),
            number_of_tasks_left: self.tasks_left,
        }
    }

    /// Queue a message for this player.  Failures are logged and dropped.
    pub fn send(&self, msg: &ServerMessage) {
        tracing::debug!(player = %self.id, ?msg, "Send");
        self.deliver(msg);
    }

    /// Like [`send`](Self::send) but without per-message logging, for
    /// broadcasts.
    pub(crate) fn deliver(&self, msg: &ServerMessage) {
        if self.tx.send(msg.clone()).is_err() {
            tracing::warn!(player = %self.id, ?msg, "Could not deliver message, connection gone");
        }
    }
}
