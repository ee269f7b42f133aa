//! Wire protocol shared by the server, player clients, and admin tools.
//!
//! Every message is a flat JSON object carrying a mandatory `type`
//! discriminator, e.g. `{"type":"S2C_UPDATE_TIMER","timer":590}`.  Messages
//! without parameters still carry their `type`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Player identifier as it appears on the wire (`"1"`, `"2"`, ...).
pub type PlayerId = String;

/// Secret role assigned to a player when they connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Crewmate,
    Impostor,
}

impl Role {
    pub fn is_impostor(self) -> bool {
        self == Role::Impostor
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Crewmate => "crewmate",
            Role::Impostor => "impostor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    #[serde(rename = "Force Stopped")]
    ForceStopped,
    #[serde(rename = "Crewmates Win")]
    CrewmatesWin,
    #[serde(rename = "Imposters Win")]
    ImpostorsWin,
}

impl GameOverReason {
    pub fn label(self) -> &'static str {
        match self {
            GameOverReason::ForceStopped => "Force Stopped",
            GameOverReason::CrewmatesWin => "Crewmates Win",
            GameOverReason::ImpostorsWin => "Imposters Win",
        }
    }
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Vote tally for a single meeting participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerVotes {
    pub id: PlayerId,
    pub votes: u32,
}

/// One roster row pushed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    #[serde(rename = "isImposter")]
    pub is_impostor: bool,
    #[serde(rename = "isAlive")]
    pub is_alive: bool,
    #[serde(rename = "tasksLeft")]
    pub tasks_left: u32,
}

/// Messages sent from a player client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// The sender finished one of their tasks.
    #[serde(rename = "C2S_TASK_DONE")]
    TaskDone,

    /// Vote for a player during an emergency meeting.
    #[serde(rename = "C2S_VOTE_MEETING")]
    VoteMeeting {
        #[serde(rename = "playerID")]
        player_id: PlayerId,
    },

    /// An impostor eliminates a crewmate.
    #[serde(rename = "C2S_IMPOSTER_KILL")]
    ImpostorKill {
        #[serde(rename = "playerID")]
        player_id: PlayerId,
    },

    /// Call an emergency meeting.
    #[serde(rename = "C2S_CALL_MEETING")]
    CallMeeting,

    /// Ask to resume a previous session.  Accepted but no state is restored.
    #[serde(rename = "C2S_TRY_RECONNECT")]
    TryReconnect {
        #[serde(rename = "playerID")]
        player_id: PlayerId,
    },
}

/// Messages sent from the server to player clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent privately to a player who has just died.
    #[serde(rename = "S2C_DEATH")]
    Death,

    /// Periodic resync of the global countdown.
    #[serde(rename = "S2C_UPDATE_TIMER")]
    UpdateTimer { timer: u32 },

    /// Seconds until another meeting may be called.
    #[serde(rename = "S2C_MEETING_COOLDOWN")]
    MeetingCooldown {
        #[serde(rename = "secondsLeft")]
        seconds_left: u64,
    },

    #[serde(rename = "S2C_UPDATE_IMPOSTER_COUNT")]
    UpdateImpostorCount { count: u32 },

    #[serde(rename = "S2C_UPDATE_CREWMATE_COUNT")]
    UpdateCrewmateCount { count: u32 },

    #[serde(rename = "S2C_UPDATE_TASKS_COUNT")]
    UpdateTasksCount { count: u32 },

    /// An emergency meeting has started.
    #[serde(rename = "S2C_EMERGENCY_MEETING")]
    EmergencyMeeting,

    /// An emergency meeting has ended.  `highest_voted_id` is `null` on a tie.
    #[serde(rename = "S2C_EMERGENCY_MEETING_END")]
    EmergencyMeetingEnd {
        #[serde(rename = "playerVotes")]
        player_votes: Vec<PlayerVotes>,
        #[serde(rename = "highestVotedID")]
        highest_voted_id: Option<PlayerId>,
    },

    /// Role, id and starting task count, sent once on connect.
    #[serde(rename = "S2C_ASSIGN_PLAYER")]
    AssignPlayer {
        role: Role,
        id: PlayerId,
        #[serde(rename = "numberOfTasksLeft")]
        number_of_tasks_left: u32,
    },

    #[serde(rename = "S2C_GAME_STARTED")]
    GameStarted,

    #[serde(rename = "S2C_GAME_OVER")]
    GameOver { reason: GameOverReason },
}

/// Messages sent from an admin client to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AdminMessage {
    #[serde(rename = "A2S_FORCE_START_GAME")]
    ForceStartGame,
    #[serde(rename = "A2S_FORCE_STOP_GAME")]
    ForceStopGame,
    #[serde(rename = "A2S_RESET_GAME")]
    ResetGame,
}

/// Messages sent from the server to admin clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AdminServerMessage {
    /// Full roster snapshot.
    #[serde(rename = "S2A_SEND_PLAYER_LIST")]
    SendPlayerList { players: Vec<RosterEntry> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_messages_carry_only_type() {
        let v = serde_json::to_value(ServerMessage::Death).unwrap();
        assert_eq!(v, json!({ "type": "S2C_DEATH" }));

        let v = serde_json::to_value(ServerMessage::GameStarted).unwrap();
        assert_eq!(v, json!({ "type": "S2C_GAME_STARTED" }));
    }

    #[test]
    fn assign_player_field_names() {
        let msg = ServerMessage::AssignPlayer {
            role: Role::Impostor,
            id: "3".to_string(),
            number_of_tasks_left: 0,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "S2C_ASSIGN_PLAYER",
                "role": "impostor",
                "id": "3",
                "numberOfTasksLeft": 0,
            })
        );
    }

    #[test]
    fn meeting_end_encodes_tie_as_null() {
        let msg = ServerMessage::EmergencyMeetingEnd {
            player_votes: vec![
                PlayerVotes {
                    id: "1".to_string(),
                    votes: 1,
                },
                PlayerVotes {
                    id: "2".to_string(),
                    votes: 1,
                },
            ],
            highest_voted_id: None,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "S2C_EMERGENCY_MEETING_END",
                "playerVotes": [{ "id": "1", "votes": 1 }, { "id": "2", "votes": 1 }],
                "highestVotedID": null,
            })
        );
    }

    #[test]
    fn game_over_reasons_use_wire_strings() {
        let v = serde_json::to_value(ServerMessage::GameOver {
            reason: GameOverReason::ImpostorsWin,
        })
        .unwrap();
        assert_eq!(v, json!({ "type": "S2C_GAME_OVER", "reason": "Imposters Win" }));
        assert_eq!(GameOverReason::ForceStopped.to_string(), "Force Stopped");
    }

    #[test]
    fn cooldown_uses_seconds_left() {
        let v = serde_json::to_value(ServerMessage::MeetingCooldown { seconds_left: 12 }).unwrap();
        assert_eq!(v, json!({ "type": "S2C_MEETING_COOLDOWN", "secondsLeft": 12 }));
    }

    #[test]
    fn parses_client_messages() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"C2S_VOTE_MEETING","playerID":"2"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::VoteMeeting {
                player_id: "2".to_string()
            }
        );

        // Extra fields on parameterless messages are tolerated.
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"C2S_TASK_DONE","taskName":"wires"}"#).unwrap();
        assert_eq!(msg, ClientMessage::TaskDone);
    }

    #[test]
    fn rejects_unknown_type_and_missing_fields() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"C2S_DANCE"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"C2S_IMPOSTER_KILL"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"playerID":"1"}"#).is_err());
    }

    #[test]
    fn roster_field_names() {
        let msg = AdminServerMessage::SendPlayerList {
            players: vec![RosterEntry {
                id: "1".to_string(),
                is_impostor: false,
                is_alive: true,
                tasks_left: 5,
            }],
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "S2A_SEND_PLAYER_LIST",
                "players": [{ "id": "1", "isImposter": false, "isAlive": true, "tasksLeft": 5 }],
            })
        );
    }

    #[test]
    fn parses_admin_messages() {
        let msg: AdminMessage = serde_json::from_str(r#"{"type":"A2S_RESET_GAME"}"#).unwrap();
        assert_eq!(msg, AdminMessage::ResetGame);
    }
}
