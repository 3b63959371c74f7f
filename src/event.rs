// Wire events. Every message is one JSON object tagged with `type`.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Outcome, TurnError};
use crate::color::Color;
use crate::coord::Coord;
use crate::participant::{ParticipantId, ParticipantInfo};
use crate::session::{MoveRejection, SessionId};


#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Join { display_name: String },
    // The session is implied by the connection.
    Move { from: Coord, to: Coord },
}

// Sent only to the participant whose request was refused. Never changes any state.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Rejection {
    AlreadyJoined,
    InvalidDisplayName { message: String },
    NotSeated,
    NotYourTurn,
    GameNotInProgress,
    NoPieceAtSource,
    ForeignPiece,
    IllegalDestination,
    // Nobody joined the session in time. The participant may join again.
    JoinTimedOut,
    ShuttingDown,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Joined {
        session_id: SessionId,
        assigned_color: Color,
    },
    GameStart {
        board: Board,
        turn_color: Color,
        participants: Vec<ParticipantInfo>,
    },
    GameUpdate {
        board: Board,
        turn_color: Color,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outcome: Option<Outcome>,
    },
    ParticipantLeft {
        participant_id: ParticipantId,
    },
    Rejection {
        reason: Rejection,
    },
}

impl From<MoveRejection> for Rejection {
    fn from(rejection: MoveRejection) -> Self {
        match rejection {
            MoveRejection::NotSeated => Rejection::NotSeated,
            MoveRejection::NotYourTurn => Rejection::NotYourTurn,
            MoveRejection::GameNotInProgress => Rejection::GameNotInProgress,
            MoveRejection::Turn(TurnError::NoPieceAtSource) => Rejection::NoPieceAtSource,
            MoveRejection::Turn(TurnError::ForeignPiece) => Rejection::ForeignPiece,
            MoveRejection::Turn(TurnError::IllegalDestination) => Rejection::IllegalDestination,
        }
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::board::VictoryReason;

    #[test]
    fn parse_client_events() {
        let join: ClientEvent =
            serde_json::from_value(json!({"type": "join", "displayName": "alice"})).unwrap();
        assert_eq!(join, ClientEvent::Join { display_name: "alice".to_owned() });

        let mv: ClientEvent = serde_json::from_value(json!({
            "type": "move",
            "from": {"row": 2, "col": 0},
            "to": {"row": 2, "col": 1},
        }))
        .unwrap();
        assert_eq!(mv, ClientEvent::Move { from: Coord::at(2, 0), to: Coord::at(2, 1) });
    }

    #[test]
    fn malformed_client_events() {
        for value in [
            json!({"type": "dance"}),
            json!({"type": "join"}),
            json!({"displayName": "alice"}),
            json!({"type": "move", "from": {"row": 9, "col": 0}, "to": {"row": 0, "col": 0}}),
        ] {
            assert!(serde_json::from_value::<ClientEvent>(value).is_err());
        }
    }

    #[test]
    fn game_update_outcome_is_optional() {
        let running = ServerEvent::GameUpdate {
            board: Board::new(),
            turn_color: Color::Blue,
            outcome: None,
        };
        let value = serde_json::to_value(&running).unwrap();
        assert_eq!(value["type"], "gameUpdate");
        assert_eq!(value["turnColor"], "blue");
        assert!(value.get("outcome").is_none());

        let finished = ServerEvent::GameUpdate {
            board: Board::new(),
            turn_color: Color::Blue,
            outcome: Some(Outcome { winner: Color::Red, reason: VictoryReason::ReachedGoal }),
        };
        let value = serde_json::to_value(&finished).unwrap();
        assert_eq!(value["outcome"], json!({"winner": "red", "reason": "reachedGoal"}));
    }

    #[test]
    fn rejection_shape() {
        let event = ServerEvent::Rejection { reason: Rejection::NotYourTurn };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "rejection", "reason": {"kind": "notYourTurn"}})
        );
        let event = ServerEvent::Rejection {
            reason: Rejection::InvalidDisplayName { message: "too long".to_owned() },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "rejection",
                "reason": {"kind": "invalidDisplayName", "message": "too long"},
            })
        );
    }
}
