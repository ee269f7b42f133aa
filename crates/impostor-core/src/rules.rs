//! Game rules: tunable constants, role assignment, win evaluation, and the
//! meeting cooldown.
//!
//! Everything here is pure.  Randomness is injected by the caller so the
//! rules can be tested without a real RNG.

use std::time::Duration;

use crate::protocol::{GameOverReason, Role};

/// Seconds between roster pushes to admins.
pub const PLAYER_LIST_BROADCAST_INTERVAL_SECONDS: u64 = 10;
/// Seconds between timer/cooldown/task resyncs to clients.
pub const TIMER_BROADCAST_INTERVAL_SECONDS: u64 = 10;
/// How long an emergency meeting stays open for voting.
pub const EMERGENCY_MEETING_LENGTH: u64 = 20;
/// Tasks handed to each crewmate on connect.
pub const STARTING_TASK_COUNT: u32 = 5;
/// Length of one game in seconds.
pub const GAME_TOTAL_LENGTH: u32 = 60 * 10;
/// Soft upper bound on the impostor share, also the draw probability.
pub const IMPOSTOR_AMOUNT: f64 = 0.3;
/// Minimum seconds between two meetings (and from game start to the first).
pub const MEETING_COOLDOWN: u64 = 45;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Runtime game configuration.  [`Default`] yields the standard constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    pub player_list_broadcast_interval_secs: u64,
    pub timer_broadcast_interval_secs: u64,
    pub emergency_meeting_length_secs: u64,
    pub starting_task_count: u32,
    pub game_total_length_secs: u32,
    pub impostor_amount: f64,
    pub meeting_cooldown_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_list_broadcast_interval_secs: PLAYER_LIST_BROADCAST_INTERVAL_SECONDS,
            timer_broadcast_interval_secs: TIMER_BROADCAST_INTERVAL_SECONDS,
            emergency_meeting_length_secs: EMERGENCY_MEETING_LENGTH,
            starting_task_count: STARTING_TASK_COUNT,
            game_total_length_secs: GAME_TOTAL_LENGTH,
            impostor_amount: IMPOSTOR_AMOUNT,
            meeting_cooldown_secs: MEETING_COOLDOWN,
        }
    }
}

impl GameConfig {
    pub fn player_list_broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.player_list_broadcast_interval_secs)
    }

    pub fn timer_broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.timer_broadcast_interval_secs)
    }

    pub fn emergency_meeting_length(&self) -> Duration {
        Duration::from_secs(self.emergency_meeting_length_secs)
    }

    /// Tasks a freshly connected player of `role` starts with.
    pub fn starting_tasks(&self, role: Role) -> u32 {
        match role {
            Role::Crewmate => self.starting_task_count,
            Role::Impostor => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Role assignment
// ---------------------------------------------------------------------------

/// Pick the role of a newly connecting player.
///
/// `player_count` is the number of players already registered and
/// `impostor_count` the number of living impostors among them.  While the
/// lobby is small (three or fewer) or the impostor share is at most
/// `impostor_amount`, the player becomes an impostor with probability
/// `impostor_amount`; otherwise they are always a crewmate.
///
/// This is a soft cap: consecutive lucky draws can push the share above
/// `impostor_amount` until the next over-quota join.  `draw` must yield a
/// uniform sample in `[0, 1)` and is only called on the probabilistic branch.
pub fn assign_role(
    player_count: usize,
    impostor_count: usize,
    impostor_amount: f64,
    mut draw: impl FnMut() -> f64,
) -> Role {
    let under_quota =
        player_count <= 3 || (impostor_count as f64 / player_count as f64) <= impostor_amount;
    if under_quota && draw() <= impostor_amount {
        Role::Impostor
    } else {
        Role::Crewmate
    }
}

// ---------------------------------------------------------------------------
// Win conditions
// ---------------------------------------------------------------------------

/// Decide whether the game is over after a kill or a meeting.
///
/// Impostors win once they match or outnumber the crew; this check runs
/// first, so an empty board counts as an impostor win.
pub fn evaluate_win(crewmates_left: u32, impostors_left: u32) -> Option<GameOverReason> {
    if crewmates_left <= impostors_left {
        Some(GameOverReason::ImpostorsWin)
    } else if impostors_left == 0 {
        Some(GameOverReason::CrewmatesWin)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Meeting cooldown
// ---------------------------------------------------------------------------

/// Whole seconds until another meeting may be called, floored at zero.
///
/// Before the first meeting the cooldown runs from the start of the game,
/// measured through the global countdown.  Afterwards it runs from the end
/// of the last meeting (`since_last_meeting`).
pub fn meeting_cooldown_left(
    config: &GameConfig,
    global_timer: u32,
    since_last_meeting: Option<Duration>,
) -> u64 {
    let cooldown = config.meeting_cooldown_secs;
    match since_last_meeting {
        None => {
            let elapsed = config.game_total_length_secs.saturating_sub(global_timer);
            cooldown.saturating_sub(u64::from(elapsed))
        }
        Some(elapsed) => cooldown.saturating_sub(elapsed.as_secs()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_lobby_always_draws() {
        // Three players, all impostors: still under the small-lobby rule.
        assert_eq!(assign_role(3, 3, IMPOSTOR_AMOUNT, || 0.1), Role::Impostor);
        assert_eq!(assign_role(0, 0, IMPOSTOR_AMOUNT, || 0.9), Role::Crewmate);
    }

    #[test]
    fn draw_boundary_is_inclusive() {
        assert_eq!(assign_role(1, 0, IMPOSTOR_AMOUNT, || 0.3), Role::Impostor);
        assert_eq!(assign_role(1, 0, IMPOSTOR_AMOUNT, || 0.300_001), Role::Crewmate);
    }

    #[test]
    fn over_quota_is_always_crewmate_without_drawing() {
        for player_count in 4..200 {
            // Smallest impostor count strictly above 30 %.
            let impostors = (player_count * 3) / 10 + 1;
            for _ in 0..10 {
                let role = assign_role(player_count, impostors, IMPOSTOR_AMOUNT, || {
                    panic!("over-quota assignment must not consume randomness")
                });
                assert_eq!(role, Role::Crewmate);
            }
        }
    }

    #[test]
    fn exactly_at_quota_still_draws() {
        // 3 / 10 == 0.3, which is still allowed.
        assert_eq!(assign_role(10, 3, IMPOSTOR_AMOUNT, || 0.0), Role::Impostor);
    }

    #[test]
    fn impostors_win_takes_precedence() {
        assert_eq!(evaluate_win(0, 0), Some(GameOverReason::ImpostorsWin));
        assert_eq!(evaluate_win(1, 1), Some(GameOverReason::ImpostorsWin));
        assert_eq!(evaluate_win(2, 3), Some(GameOverReason::ImpostorsWin));
    }

    #[test]
    fn crewmates_win_when_no_impostors_left() {
        assert_eq!(evaluate_win(1, 0), Some(GameOverReason::CrewmatesWin));
        assert_eq!(evaluate_win(3, 1), None);
    }

    #[test]
    fn cooldown_before_first_meeting_counts_from_game_start() {
        let cfg = GameConfig::default();
        assert_eq!(meeting_cooldown_left(&cfg, GAME_TOTAL_LENGTH, None), 45);
        assert_eq!(meeting_cooldown_left(&cfg, GAME_TOTAL_LENGTH - 30, None), 15);
        assert_eq!(meeting_cooldown_left(&cfg, GAME_TOTAL_LENGTH - 45, None), 0);
        assert_eq!(meeting_cooldown_left(&cfg, 10, None), 0);
    }

    #[test]
    fn cooldown_after_meeting_counts_from_last_meeting() {
        let cfg = GameConfig::default();
        let left = meeting_cooldown_left(&cfg, 0, Some(Duration::from_millis(10_900)));
        assert_eq!(left, 35);
        assert_eq!(meeting_cooldown_left(&cfg, 0, Some(Duration::from_secs(90))), 0);
    }

    #[test]
    fn impostors_start_without_tasks() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.starting_tasks(Role::Crewmate), 5);
        assert_eq!(cfg.starting_tasks(Role::Impostor), 0);
    }
}
