//! Background tasks driving the orchestrator: the one-second countdown, the
//! periodic client and admin broadcasts, and per-meeting resolution timers.
//!
//! Each task sleeps without holding the lock and then runs a single
//! orchestrator transition.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::orchestrator::{MeetingId, Orchestrator, SharedOrchestrator};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Spawn the countdown and both periodic broadcasts.
pub async fn spawn_background_tasks(orchestrator: &SharedOrchestrator) -> Vec<JoinHandle<()>> {
    let (status_every, roster_every) = {
        let orch = orchestrator.lock().await;
        (
            orch.config().timer_broadcast_interval(),
            orch.config().player_list_broadcast_interval(),
        )
    };

    vec![
        tokio::spawn(run_countdown(orchestrator.clone())),
        tokio::spawn(run_status_broadcast(orchestrator.clone(), status_every)),
        tokio::spawn(run_roster_broadcast(orchestrator.clone(), roster_every)),
    ]
}

/// Call `step` once per `period`, starting one period from now.
async fn every<F>(orchestrator: SharedOrchestrator, period: Duration, mut step: F)
where
    F: FnMut(&mut Orchestrator),
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let mut orch = orchestrator.lock().await;
        step(&mut *orch);
    }
}

pub async fn run_countdown(orchestrator: SharedOrchestrator) {
    every(orchestrator, COUNTDOWN_STEP, |orch| orch.tick()).await;
}

pub async fn run_status_broadcast(orchestrator: SharedOrchestrator, period: Duration) {
    every(orchestrator, period, |orch| orch.broadcast_status()).await;
}

pub async fn run_roster_broadcast(orchestrator: SharedOrchestrator, period: Duration) {
    every(orchestrator, period, |orch| orch.broadcast_roster()).await;
}

/// Resolve `meeting` once the voting window has passed.
///
/// The timer is never cancelled; [`resolve_meeting`] ignores it if the
/// meeting is no longer the open one by then.
///
/// [`resolve_meeting`]: crate::orchestrator::Orchestrator::resolve_meeting
pub fn schedule_meeting_resolution(
    orchestrator: &SharedOrchestrator,
    meeting: MeetingId,
    delay: Duration,
) -> JoinHandle<()> {
    let orchestrator = orchestrator.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        orchestrator.lock().await.resolve_meeting(meeting);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerRx;
    use impostor_core::protocol::{
        AdminServerMessage, ClientMessage, PlayerVotes, Role, RosterEntry, ServerMessage,
    };
    use impostor_core::rules::GameConfig;
    use tokio::sync::mpsc;

    fn drain(rx: &mut PlayerRx) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    async fn join(orchestrator: &SharedOrchestrator, role: Role) -> (String, u64, PlayerRx) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (id, conn) = orchestrator.lock().await.register_player(tx, role);
        (id, conn, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_once_per_second_while_running() {
        let orch = Orchestrator::shared(GameConfig::default());
        let countdown = tokio::spawn(run_countdown(orch.clone()));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(orch.lock().await.global_timer(), 600, "stopped game is frozen");

        orch.lock().await.start_game();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(orch.lock().await.global_timer(), 595);

        countdown.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_freezes_during_meeting() {
        let orch = Orchestrator::shared(GameConfig::default());
        let (p1, c1, _rx1) = join(&orch, Role::Crewmate).await;
        let (_p2, _c2, _rx2) = join(&orch, Role::Crewmate).await;
        let (_p3, _c3, _rx3) = join(&orch, Role::Impostor).await;
        orch.lock().await.start_game();
        let countdown = tokio::spawn(run_countdown(orch.clone()));

        tokio::time::sleep(Duration::from_millis(45_500)).await;
        assert_eq!(orch.lock().await.global_timer(), 555);

        let meeting = orch
            .lock()
            .await
            .handle_client_message(&p1, c1, ClientMessage::CallMeeting)
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(orch.lock().await.global_timer(), 555);

        orch.lock().await.resolve_meeting(meeting);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(orch.lock().await.global_timer(), 552);

        countdown.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn tied_meeting_resolves_after_voting_window() {
        let orch = Orchestrator::shared(GameConfig::default());
        let (p1, c1, mut rx1) = join(&orch, Role::Crewmate).await;
        let (p2, c2, _rx2) = join(&orch, Role::Crewmate).await;
        let (p3, _c3, _rx3) = join(&orch, Role::Impostor).await;

        let meeting = {
            let mut o = orch.lock().await;
            o.start_game();
            for _ in 0..45 {
                o.tick();
            }
            o.handle_client_message(&p1, c1, ClientMessage::CallMeeting)
                .unwrap()
        };
        schedule_meeting_resolution(&orch, meeting, Duration::from_secs(20));
        {
            let mut o = orch.lock().await;
            o.handle_client_message(&p2, c2, ClientMessage::VoteMeeting {
                player_id: p1.clone(),
            });
            o.handle_client_message(&p1, c1, ClientMessage::VoteMeeting {
                player_id: p2.clone(),
            });
        }
        drain(&mut rx1);

        tokio::time::sleep(Duration::from_secs(19)).await;
        assert!(orch.lock().await.has_active_meeting());
        assert!(drain(&mut rx1).is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!orch.lock().await.has_active_meeting());
        assert_eq!(
            drain(&mut rx1),
            vec![ServerMessage::EmergencyMeetingEnd {
                player_votes: vec![
                    PlayerVotes { id: p1, votes: 1 },
                    PlayerVotes { id: p2, votes: 1 },
                    PlayerVotes { id: p3, votes: 0 },
                ],
                highest_voted_id: None,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_timer_tolerates_reset() {
        let orch = Orchestrator::shared(GameConfig::default());
        let (p1, c1, _rx1) = join(&orch, Role::Crewmate).await;
        join(&orch, Role::Crewmate).await;
        join(&orch, Role::Impostor).await;
        let meeting = {
            let mut o = orch.lock().await;
            o.start_game();
            for _ in 0..45 {
                o.tick();
            }
            o.handle_client_message(&p1, c1, ClientMessage::CallMeeting)
                .unwrap()
        };
        let timer = schedule_meeting_resolution(&orch, meeting, Duration::from_secs(20));
        orch.lock().await.reset();

        timer.await.unwrap();
        let o = orch.lock().await;
        assert!(!o.has_active_meeting());
        assert_eq!(o.player_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn status_broadcast_runs_every_interval() {
        let orch = Orchestrator::shared(GameConfig::default());
        let (_p1, _c1, mut rx) = join(&orch, Role::Crewmate).await;
        drain(&mut rx);
        let handles = spawn_background_tasks(&orch).await;

        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert!(drain(&mut rx).is_empty());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                ServerMessage::UpdateTimer { timer: 600 },
                ServerMessage::MeetingCooldown { seconds_left: 45 },
                ServerMessage::UpdateTasksCount { count: 5 },
            ]
        );

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn roster_broadcast_reaches_admins_every_interval() {
        let orch = Orchestrator::shared(GameConfig::default());
        let (p1, _c1, _rx) = join(&orch, Role::Impostor).await;
        let (admin_tx, mut admin_rx) = mpsc::unbounded_channel();
        orch.lock().await.connect_admin(admin_tx);
        let roster = tokio::spawn(run_roster_broadcast(orch.clone(), Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert!(admin_rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            admin_rx.try_recv().unwrap(),
            AdminServerMessage::SendPlayerList {
                players: vec![RosterEntry {
                    id: p1,
                    is_impostor: true,
                    is_alive: true,
                    tasks_left: 0,
                }],
            }
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(admin_rx.try_recv().is_ok());
        assert!(admin_rx.try_recv().is_err());

        roster.abort();
    }
}
