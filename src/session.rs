// A session pairs two participants around one board.
//
// Lifecycle: `WaitingForOpponent` -> `InProgress` -> `Finished`. The transition to
// `InProgress` happens exactly when the second participant is seated. A session does not do
// any I/O: it returns the events to broadcast and `ServerState` delivers them.

use std::fmt;

use instant::Instant;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, Outcome, TurnError};
use crate::color::Color;
use crate::coord::Coord;
use crate::event::ServerEvent;
use crate::participant::{ParticipantId, ParticipantInfo};
use crate::starter::{FIRST_SEAT, FIRST_TO_MOVE};


pub const MAX_PARTICIPANTS: usize = 2;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new_random() -> Self { SessionId(Uuid::new_v4().to_string()) }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionPhase {
    WaitingForOpponent,
    InProgress,
    Finished,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveRejection {
    NotSeated,
    NotYourTurn,
    GameNotInProgress,
    Turn(TurnError),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SessionFull;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Seated {
    pub color: Color,
    // The session has just switched to `InProgress`.
    pub game_started: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Departure {
    NotSeated,
    SessionEmpty,
    // The session keeps its phase; the remaining participant should be told.
    OpponentRemains(ParticipantId),
}

#[derive(Clone, Debug)]
pub struct Session {
    id: SessionId,
    // Seat order: the first entry joined first. Never more than `MAX_PARTICIPANTS`.
    seats: Vec<ParticipantInfo>,
    board: Board,
    turn: Color,
    outcome: Option<Outcome>,
    phase: SessionPhase,
    created_at: Instant,
    moves_accepted: usize,
}

impl Session {
    pub fn new(id: SessionId, now: Instant) -> Self {
        Session {
            id,
            seats: Vec::new(),
            board: Board::new(),
            turn: FIRST_TO_MOVE,
            outcome: None,
            phase: SessionPhase::WaitingForOpponent,
            created_at: now,
            moves_accepted: 0,
        }
    }

    pub fn id(&self) -> &SessionId { &self.id }
    pub fn phase(&self) -> SessionPhase { self.phase }
    pub fn board(&self) -> &Board { &self.board }
    pub fn turn(&self) -> Color { self.turn }
    pub fn outcome(&self) -> Option<Outcome> { self.outcome }
    pub fn seats(&self) -> &[ParticipantInfo] { &self.seats }
    pub fn created_at(&self) -> Instant { self.created_at }
    pub fn moves_accepted(&self) -> usize { self.moves_accepted }
    pub fn is_empty(&self) -> bool { self.seats.is_empty() }

    // Whether the matchmaker may seat a newcomer here. Sessions that lost a participant
    // mid-game are never reopened.
    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::WaitingForOpponent && self.seats.len() == 1
    }

    pub fn participant_ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.seats.iter().map(|seat| &seat.id)
    }

    pub fn color_of(&self, participant_id: &ParticipantId) -> Option<Color> {
        self.seats.iter().find(|seat| &seat.id == participant_id).map(|seat| seat.color)
    }

    pub fn seat(
        &mut self, participant_id: ParticipantId, display_name: String,
    ) -> Result<Seated, SessionFull> {
        if self.phase != SessionPhase::WaitingForOpponent || self.seats.len() >= MAX_PARTICIPANTS {
            return Err(SessionFull);
        }
        let color = match self.seats.first() {
            None => FIRST_SEAT,
            Some(first) => first.color.opponent(),
        };
        self.seats.push(ParticipantInfo { id: participant_id, display_name, color });
        let game_started = self.seats.len() == MAX_PARTICIPANTS;
        if game_started {
            self.phase = SessionPhase::InProgress;
        }
        Ok(Seated { color, game_started })
    }

    // Applies the move if the participant owns the turn. Capture and victory are derived from
    // the board here, never taken from the client. On rejection nothing changes.
    pub fn submit_move(
        &mut self, participant_id: &ParticipantId, from: Coord, to: Coord,
    ) -> Result<(), MoveRejection> {
        let color = self.color_of(participant_id).ok_or(MoveRejection::NotSeated)?;
        if self.phase != SessionPhase::InProgress {
            return Err(MoveRejection::GameNotInProgress);
        }
        if color != self.turn {
            return Err(MoveRejection::NotYourTurn);
        }
        self.board.try_move(color, from, to).map_err(MoveRejection::Turn)?;
        self.moves_accepted += 1;
        self.turn = self.turn.opponent();
        if let Some(outcome) = self.board.winner() {
            self.outcome = Some(outcome);
            self.phase = SessionPhase::Finished;
        }
        Ok(())
    }

    pub fn remove(&mut self, participant_id: &ParticipantId) -> Departure {
        let seats_before = self.seats.len();
        self.seats.retain(|seat| &seat.id != participant_id);
        if self.seats.len() == seats_before {
            return Departure::NotSeated;
        }
        match self.seats.first() {
            None => Departure::SessionEmpty,
            Some(remaining) => Departure::OpponentRemains(remaining.id.clone()),
        }
    }

    pub fn game_start_event(&self) -> ServerEvent {
        ServerEvent::GameStart {
            board: self.board.clone(),
            turn_color: self.turn,
            participants: self.seats.clone(),
        }
    }

    pub fn game_update_event(&self) -> ServerEvent {
        ServerEvent::GameUpdate {
            board: self.board.clone(),
            turn_color: self.turn,
            outcome: self.outcome,
        }
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::board::VictoryReason;
    use crate::grid::Grid;
    use crate::piece::{Piece, PieceKind};

    fn pid(s: &str) -> ParticipantId { serde_json::from_value(serde_json::json!(s)).unwrap() }

    fn started_session() -> (Session, ParticipantId, ParticipantId) {
        let mut session = Session::new(SessionId::new_random(), Instant::now());
        let (alice, bob) = (pid("alice"), pid("bob"));
        session.seat(alice.clone(), "Alice".to_owned()).unwrap();
        session.seat(bob.clone(), "Bob".to_owned()).unwrap();
        (session, alice, bob)
    }

    #[test]
    fn seating_assigns_opposite_colors() {
        let mut session = Session::new(SessionId::new_random(), Instant::now());
        let first = session.seat(pid("a"), "A".to_owned()).unwrap();
        assert_eq!(first, Seated { color: FIRST_SEAT, game_started: false });
        assert!(session.is_open());
        let second = session.seat(pid("b"), "B".to_owned()).unwrap();
        assert_eq!(second, Seated { color: FIRST_SEAT.opponent(), game_started: true });
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert!(!session.is_open());
        assert_eq!(session.seat(pid("c"), "C".to_owned()), Err(SessionFull));
        assert_eq!(session.seats().len(), MAX_PARTICIPANTS);
    }

    #[test]
    fn no_moves_while_waiting() {
        let mut session = Session::new(SessionId::new_random(), Instant::now());
        session.seat(pid("a"), "A".to_owned()).unwrap();
        assert_eq!(
            session.submit_move(&pid("a"), Coord::at(0, 0), Coord::at(0, 1)),
            Err(MoveRejection::GameNotInProgress)
        );
    }

    #[test]
    fn rejects_out_of_turn_and_strangers() {
        let (mut session, _alice, bob) = started_session();
        assert_eq!(
            session.submit_move(&bob, Coord::at(0, 5), Coord::at(0, 4)),
            Err(MoveRejection::NotYourTurn)
        );
        assert_eq!(
            session.submit_move(&pid("mallory"), Coord::at(0, 0), Coord::at(0, 1)),
            Err(MoveRejection::NotSeated)
        );
        assert_eq!(session.board(), &Board::new());
        assert_eq!(session.turn(), FIRST_TO_MOVE);
    }

    #[test]
    fn rejects_foreign_and_empty_sources() {
        let (mut session, alice, _bob) = started_session();
        assert_eq!(
            session.submit_move(&alice, Coord::at(0, 5), Coord::at(0, 4)),
            Err(MoveRejection::Turn(TurnError::ForeignPiece))
        );
        assert_eq!(
            session.submit_move(&alice, Coord::at(2, 2), Coord::at(2, 3)),
            Err(MoveRejection::Turn(TurnError::NoPieceAtSource))
        );
    }

    #[test]
    fn turn_alternates() {
        let (mut session, alice, bob) = started_session();
        session.submit_move(&alice, Coord::at(0, 0), Coord::at(0, 1)).unwrap();
        assert_eq!(session.turn(), FIRST_TO_MOVE.opponent());
        session.submit_move(&bob, Coord::at(0, 5), Coord::at(0, 4)).unwrap();
        assert_eq!(session.turn(), FIRST_TO_MOVE);
        assert_eq!(session.moves_accepted(), 2);
        assert_eq!(
            session.submit_move(&bob, Coord::at(0, 4), Coord::at(0, 3)),
            Err(MoveRejection::NotYourTurn)
        );
    }

    #[test]
    fn finished_session_is_frozen() {
        let (mut session, alice, bob) = started_session();
        let mut grid = Grid::new();
        grid[Coord::at(1, 1)] = Some(Piece::new(PieceKind::Circle, Color::Red));
        grid[Coord::at(1, 2)] = Some(Piece::new(PieceKind::Person, Color::Blue));
        session.board = Board::new_from_grid(grid);

        session.submit_move(&alice, Coord::at(1, 1), Coord::at(1, 2)).unwrap();
        let expected = Outcome { winner: Color::Red, reason: VictoryReason::Annihilation };
        assert_eq!(session.outcome(), Some(expected));
        assert_eq!(session.phase(), SessionPhase::Finished);

        let board = session.board().clone();
        let turn = session.turn();
        for (who, from, to) in [
            (&bob, Coord::at(1, 2), Coord::at(1, 3)),
            (&alice, Coord::at(1, 2), Coord::at(1, 3)),
        ] {
            assert_eq!(
                session.submit_move(who, from, to),
                Err(MoveRejection::GameNotInProgress)
            );
        }
        assert_eq!(session.board(), &board);
        assert_eq!(session.turn(), turn);
        assert_eq!(session.outcome(), Some(expected));
    }

    #[test]
    fn departures() {
        let (mut session, alice, bob) = started_session();
        assert_eq!(session.remove(&pid("nobody")), Departure::NotSeated);
        assert_eq!(session.remove(&alice), Departure::OpponentRemains(bob.clone()));
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert!(!session.is_open());
        assert_eq!(session.remove(&bob), Departure::SessionEmpty);
        assert!(session.is_empty());
    }
}
