//! The game orchestrator: player registry, global countdown, and the
//! emergency meeting, plus every state transition that touches them.
//!
//! All transitions are synchronous methods.  The orchestrator is shared as
//! a [`SharedOrchestrator`] and every caller (connection loops, timers)
//! holds the lock for exactly one transition, so mutations never interleave.
//! Outbound messages go to unbounded per-connection queues and never block
//! while the lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use impostor_core::meeting::EmergencyMeeting;
use impostor_core::protocol::{
    AdminMessage, AdminServerMessage, ClientMessage, GameOverReason, PlayerId, Role, RosterEntry,
    ServerMessage,
};
use impostor_core::rules::{self, GameConfig};
use rand::RngExt;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use crate::player::{ConnectionId, Player, PlayerTx};

pub type SharedOrchestrator = Arc<Mutex<Orchestrator>>;

/// Outbound queue of an admin connection.
pub type AdminTx = mpsc::UnboundedSender<AdminServerMessage>;
pub type AdminRx = mpsc::UnboundedReceiver<AdminServerMessage>;

/// Serial number of a meeting, used to recognise stale resolution timers.
pub type MeetingId = u64;

struct ActiveMeeting {
    id: MeetingId,
    meeting: EmergencyMeeting,
}

/// Authoritative game state.
pub struct Orchestrator {
    config: GameConfig,
    players: HashMap<PlayerId, Player>,
    admins: HashMap<ConnectionId, AdminTx>,
    global_timer: u32,
    is_running: bool,
    meeting: Option<ActiveMeeting>,
    last_meeting_time: Option<Instant>,
    next_player_id: u32,
    next_connection_id: ConnectionId,
    next_meeting_id: MeetingId,
}

impl Orchestrator {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            players: HashMap::new(),
            admins: HashMap::new(),
            global_timer: config.game_total_length_secs,
            is_running: false,
            meeting: None,
            last_meeting_time: None,
            next_player_id: 1,
            next_connection_id: 1,
            next_meeting_id: 1,
        }
    }

    pub fn shared(config: GameConfig) -> SharedOrchestrator {
        Arc::new(Mutex::new(Self::new(config)))
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn global_timer(&self) -> u32 {
        self.global_timer
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn has_active_meeting(&self) -> bool {
        self.meeting.is_some()
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Register a new player connection.  A role is drawn, the player is
    /// told their assignment, and their id is returned together with the
    /// connection serial the gateway must present on every later call.
    pub fn connect_player(&mut self, tx: PlayerTx) -> (PlayerId, ConnectionId) {
        let mut rng = rand::rng();
        let role = rules::assign_role(
            self.players.len(),
            self.impostors_left() as usize,
            self.config.impostor_amount,
            || rng.random::<f64>(),
        );
        self.register_player(tx, role)
    }

    pub(crate) fn register_player(&mut self, tx: PlayerTx, role: Role) -> (PlayerId, ConnectionId) {
        let id = self.next_player_id.to_string();
        self.next_player_id += 1;
        let connection = self.next_connection();

        let player = Player::new(
            id.clone(),
            role,
            self.config.starting_tasks(role),
            connection,
            tx,
        );
        player.send(&player.assignment());
        self.players.insert(id.clone(), player);

        tracing::info!(player = %id, %role, "Player connected");
        (id, connection)
    }

    /// Overwrite a connected player's drawn role.
    #[cfg(test)]
    pub(crate) fn set_role(&mut self, id: &str, role: Role) {
        let tasks = self.config.starting_tasks(role);
        if let Some(player) = self.players.get_mut(id) {
            player.role = role;
            player.tasks_left = tasks;
        }
    }

    /// Remove a player when their connection ends.  Ignored if the id has
    /// since been handed to a different connection (after a reset).
    pub fn disconnect_player(&mut self, id: &str, connection: ConnectionId) {
        if self
            .players
            .get(id)
            .is_some_and(|p| p.connection == connection)
        {
            self.players.remove(id);
            tracing::info!(player = id, "Player disconnected");
        }
    }

    pub fn connect_admin(&mut self, tx: AdminTx) -> ConnectionId {
        let connection = self.next_connection();
        self.admins.insert(connection, tx);
        tracing::info!(admin = connection, "Admin connected");
        connection
    }

    pub fn disconnect_admin(&mut self, connection: ConnectionId) {
        if self.admins.remove(&connection).is_some() {
            tracing::info!(admin = connection, "Admin disconnected");
        }
    }

    fn next_connection(&mut self) -> ConnectionId {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        id
    }

    // -----------------------------------------------------------------------
    // Message dispatch
    // -----------------------------------------------------------------------

    /// Apply one message from a player.
    ///
    /// Returns the id of a newly opened meeting; the caller must schedule its
    /// resolution.
    pub fn handle_client_message(
        &mut self,
        player_id: &str,
        connection: ConnectionId,
        msg: ClientMessage,
    ) -> Option<MeetingId> {
        if !self
            .players
            .get(player_id)
            .is_some_and(|p| p.connection == connection)
        {
            tracing::debug!(player = player_id, ?msg, "Message from unregistered connection");
            return None;
        }

        match msg {
            ClientMessage::TaskDone => {
                self.complete_task(player_id);
                None
            }
            ClientMessage::ImpostorKill { player_id: target } => {
                self.impostor_kill(player_id, &target);
                None
            }
            ClientMessage::CallMeeting => self.call_meeting(player_id),
            ClientMessage::VoteMeeting { player_id: target } => {
                self.vote(player_id, &target);
                None
            }
            ClientMessage::TryReconnect { player_id: previous } => {
                tracing::info!(
                    player = player_id,
                    previous = %previous,
                    "Reconnect requested; session recovery is not supported"
                );
                None
            }
        }
    }

    pub fn handle_admin_message(&mut self, msg: AdminMessage) {
        tracing::info!(?msg, "Admin command");
        match msg {
            AdminMessage::ForceStartGame => self.start_game(),
            AdminMessage::ForceStopGame => self.stop_game(GameOverReason::ForceStopped),
            AdminMessage::ResetGame => self.reset(),
        }
    }

    // -----------------------------------------------------------------------
    // Game lifecycle
    // -----------------------------------------------------------------------

    pub fn start_game(&mut self) {
        self.is_running = true;
        self.global_timer = self.config.game_total_length_secs;
        tracing::info!(players = self.players.len(), "Game started");
        self.broadcast(&ServerMessage::GameStarted);
        self.update_counts();
    }

    pub fn stop_game(&mut self, reason: GameOverReason) {
        self.is_running = false;
        self.global_timer = self.config.game_total_length_secs;
        tracing::info!(%reason, "Game over");
        self.broadcast(&ServerMessage::GameOver { reason });
    }

    /// Return to the freshly started state.  Dropping the registry closes
    /// every player's outbound queue, which ends their connections.
    pub fn reset(&mut self) {
        self.players.clear();
        self.global_timer = self.config.game_total_length_secs;
        self.next_player_id = 1;
        self.is_running = false;
        self.meeting = None;
        self.last_meeting_time = None;
        tracing::info!("Game reset");
    }

    /// One second of the global countdown.  Frozen while stopped or while a
    /// meeting is open; running out of time is a crewmate win.
    pub fn tick(&mut self) {
        if !self.is_running || self.meeting.is_some() {
            return;
        }
        self.global_timer = self.global_timer.saturating_sub(1);
        if self.global_timer == 0 {
            self.stop_game(GameOverReason::CrewmatesWin);
        }
    }

    // -----------------------------------------------------------------------
    // Player actions
    // -----------------------------------------------------------------------

    fn complete_task(&mut self, player_id: &str) {
        let Some(player) = self.players.get_mut(player_id) else {
            return;
        };
        if !player.complete_task() {
            return;
        }

        let total = self.tasks_left();
        self.broadcast(&ServerMessage::UpdateTasksCount { count: total });
        if total == 0 {
            self.stop_game(GameOverReason::CrewmatesWin);
        }
    }

    fn impostor_kill(&mut self, killer_id: &str, target_id: &str) {
        if killer_id == target_id {
            return;
        }
        let Some(killer) = self.players.get(killer_id) else {
            return;
        };
        if !killer.alive || !killer.is_impostor() {
            return;
        }
        let Some(target) = self.players.get_mut(target_id) else {
            return;
        };
        if !target.alive || target.is_impostor() {
            return;
        }

        target.kill();
        tracing::info!(killer = killer_id, target = target_id, "Player killed");
        self.update_counts();
        self.check_win();
    }

    fn call_meeting(&mut self, caller_id: &str) -> Option<MeetingId> {
        let caller = self.players.get(caller_id)?;
        if !caller.alive || !self.is_running {
            return None;
        }

        let cooldown = self.meeting_cooldown_left();
        if cooldown > 0 {
            caller.send(&ServerMessage::MeetingCooldown {
                seconds_left: cooldown,
            });
            return None;
        }
        if self.meeting.is_some() {
            return None;
        }

        let id = self.next_meeting_id;
        self.next_meeting_id += 1;
        self.meeting = Some(ActiveMeeting {
            id,
            meeting: EmergencyMeeting::new(self.players.keys().cloned()),
        });
        self.last_meeting_time = Some(Instant::now());

        tracing::info!(meeting = id, caller = caller_id, "Emergency meeting called");
        self.broadcast(&ServerMessage::EmergencyMeeting);
        Some(id)
    }

    fn vote(&mut self, voter_id: &str, target_id: &str) {
        let voter_alive = self.players.get(voter_id).is_some_and(|p| p.alive);
        if let Some(active) = self.meeting.as_mut()
            && active.meeting.vote(voter_alive, target_id)
        {
            tracing::debug!(meeting = active.id, voter = voter_id, target = target_id, "Vote");
        }
    }

    /// Close meeting `meeting_id`: eliminate the unique top-voted player,
    /// check for a winner, and otherwise publish the tally and restart the
    /// cooldown.
    ///
    /// Resolution timers cannot be cancelled, so this is a no-op unless
    /// `meeting_id` is still the open meeting.  A meeting left open when the
    /// game stopped is discarded without eliminating anyone.
    pub fn resolve_meeting(&mut self, meeting_id: MeetingId) {
        let Some(active) = self.meeting.take_if(|m| m.id == meeting_id) else {
            tracing::debug!(meeting = meeting_id, "Stale meeting resolution ignored");
            return;
        };
        if !self.is_running {
            tracing::info!(meeting = meeting_id, "Meeting discarded, game not running");
            return;
        }

        let eliminated = active.meeting.resolve().cloned();
        if let Some(target) = &eliminated
            && let Some(player) = self.players.get_mut(target)
            && player.alive
        {
            player.kill();
            tracing::info!(meeting = meeting_id, player = %target, "Voted out");
            self.update_counts();
        }

        if self.check_win() {
            return;
        }

        tracing::info!(meeting = meeting_id, eliminated = ?eliminated, "Meeting ended");
        self.broadcast(&ServerMessage::EmergencyMeetingEnd {
            player_votes: active.meeting.player_votes(),
            highest_voted_id: eliminated,
        });
        self.last_meeting_time = Some(Instant::now());
    }

    /// Stop the game if either side has won.  Returns whether it stopped.
    fn check_win(&mut self) -> bool {
        match rules::evaluate_win(self.crewmates_left(), self.impostors_left()) {
            Some(reason) => {
                self.stop_game(reason);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Counts
    // -----------------------------------------------------------------------

    pub fn crewmates_left(&self) -> u32 {
        self.players
            .values()
            .filter(|p| p.alive && !p.is_impostor())
            .count() as u32
    }

    pub fn impostors_left(&self) -> u32 {
        self.players
            .values()
            .filter(|p| p.alive && p.is_impostor())
            .count() as u32
    }

    /// Tasks still owed by living players.
    pub fn tasks_left(&self) -> u32 {
        self.players
            .values()
            .filter(|p| p.alive)
            .map(|p| p.tasks_left)
            .sum()
    }

    pub fn meeting_cooldown_left(&self) -> u64 {
        rules::meeting_cooldown_left(
            &self.config,
            self.global_timer,
            self.last_meeting_time.map(|t| t.elapsed()),
        )
    }

    /// Roster snapshot, ordered by player id.
    pub fn roster(&self) -> Vec<RosterEntry> {
        let mut players: Vec<RosterEntry> = self
            .players
            .values()
            .map(|p| RosterEntry {
                id: p.id.clone(),
                is_impostor: p.is_impostor(),
                is_alive: p.alive,
                tasks_left: p.tasks_left,
            })
            .collect();
        players.sort_by(|a, b| a.id.len().cmp(&b.id.len()).then_with(|| a.id.cmp(&b.id)));
        players
    }

    // -----------------------------------------------------------------------
    // Broadcasts
    // -----------------------------------------------------------------------

    /// Push survivor and task counts to every client and the roster to every
    /// admin.
    pub fn update_counts(&self) {
        self.broadcast(&ServerMessage::UpdateCrewmateCount {
            count: self.crewmates_left(),
        });
        self.broadcast(&ServerMessage::UpdateImpostorCount {
            count: self.impostors_left(),
        });
        self.broadcast(&ServerMessage::UpdateTasksCount {
            count: self.tasks_left(),
        });
        self.broadcast_roster();
    }

    /// Periodic resync of timer, meeting cooldown, and task count.
    pub fn broadcast_status(&self) {
        self.broadcast(&ServerMessage::UpdateTimer {
            timer: self.global_timer,
        });
        self.broadcast(&ServerMessage::MeetingCooldown {
            seconds_left: self.meeting_cooldown_left(),
        });
        self.broadcast(&ServerMessage::UpdateTasksCount {
            count: self.tasks_left(),
        });
    }

    pub fn broadcast_roster(&self) {
        self.broadcast_admins(&AdminServerMessage::SendPlayerList {
            players: self.roster(),
        });
    }

    /// Send `msg` to every registered player.  Each delivery is independent.
    pub fn broadcast(&self, msg: &ServerMessage) {
        if !self.players.is_empty() {
            tracing::trace!(?msg, "Broadcast to players");
        }
        for player in self.players.values() {
            player.deliver(msg);
        }
    }

    pub fn broadcast_admins(&self, msg: &AdminServerMessage) {
        for (&admin, tx) in &self.admins {
            if tx.send(msg.clone()).is_err() {
                tracing::warn!(admin, "Could not deliver message to admin");
            }
        }
    }
}
