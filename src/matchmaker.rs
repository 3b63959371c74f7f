// Pairs arriving participants into sessions.
//
// Runs on the single thread that owns the `Registry`, so a join is atomic with respect to other
// joins: at most two participants ever enter one session.

use instant::Instant;
use log::info;

use crate::color::Color;
use crate::participant::ParticipantId;
use crate::registry::Registry;
use crate::session::{Session, SessionId};


#[derive(Clone, PartialEq, Eq, Debug)]
pub enum JoinRejection {
    UnknownParticipant,
    AlreadyJoined,
    // The chosen session could not take the participant. Indicates a registry inconsistency.
    SessionUnavailable,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct JoinResult {
    pub session_id: SessionId,
    pub color: Color,
    pub created_session: bool,
    pub game_started: bool,
}

// Seats the participant in the oldest open session, or in a new one if none is open.
pub fn join_queue(
    registry: &mut Registry, participant_id: &ParticipantId, display_name: String, now: Instant,
) -> Result<JoinResult, JoinRejection> {
    let participant =
        registry.participant(participant_id).ok_or(JoinRejection::UnknownParticipant)?;
    if participant.session_id.is_some() {
        return Err(JoinRejection::AlreadyJoined);
    }

    let open_session_id = registry
        .sessions_in_creation_order()
        .find(|session| session.is_open())
        .map(|session| session.id().clone());
    let (session_id, created_session) = match open_session_id {
        Some(id) => (id, false),
        None => {
            let session = registry.insert_session(Session::new(SessionId::new_random(), now));
            info!("Session {} created", session.id());
            (session.id().clone(), true)
        }
    };
    let seated = registry
        .session_mut(&session_id)
        .ok_or(JoinRejection::SessionUnavailable)?
        .seat(participant_id.clone(), display_name.clone())
        .map_err(|_| JoinRejection::SessionUnavailable)?;

    if let Some(participant) = registry.participant_mut(participant_id) {
        participant.display_name = Some(display_name);
        participant.color = Some(seated.color);
        participant.session_id = Some(session_id.clone());
    }
    Ok(JoinResult {
        session_id,
        color: seated.color,
        created_session,
        game_started: seated.game_started,
    })
}
