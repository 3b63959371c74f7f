// Process-wide registry of participants and sessions.
//
// Created when the relay starts and owned by `ServerState`; entries are added on connect/join
// and removed on disconnect. Nothing is persisted. Sessions own their boards; a participant's
// `session_id` is only a back-reference for lookup.

use std::collections::{HashMap, hash_map};

use crate::color::Color;
use crate::participant::ParticipantId;
use crate::session::{Session, SessionId, SessionPhase};


#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Participant {
    pub id: ParticipantId,
    // Set on `join`.
    pub display_name: Option<String>,
    pub color: Option<Color>,
    pub session_id: Option<SessionId>,
}

impl Participant {
    pub fn new(id: ParticipantId) -> Self {
        Participant {
            id,
            display_name: None,
            color: None,
            session_id: None,
        }
    }

    pub fn unseat(&mut self) {
        self.color = None;
        self.session_id = None;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RegistryStats {
    pub participants: usize,
    pub sessions_waiting: usize,
    pub sessions_in_progress: usize,
    pub sessions_finished: usize,
}

pub struct Registry {
    participants: HashMap<ParticipantId, Participant>,
    sessions: HashMap<SessionId, Session>,
    // Creation order, oldest first. Gives matchmaking a deterministic scan order.
    session_order: Vec<SessionId>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            participants: HashMap::new(),
            sessions: HashMap::new(),
            session_order: Vec::new(),
        }
    }

    pub fn add_participant(&mut self, id: ParticipantId) -> &mut Participant {
        self.participants.entry(id.clone()).or_insert_with(|| Participant::new(id))
    }
    pub fn remove_participant(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.participants.remove(id)
    }
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }
    pub fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.get_mut(id)
    }
    pub fn participant_ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.participants.keys()
    }
    pub fn num_participants(&self) -> usize { self.participants.len() }

    pub fn insert_session(&mut self, session: Session) -> &mut Session {
        match self.sessions.entry(session.id().clone()) {
            hash_map::Entry::Vacant(e) => {
                self.session_order.push(e.key().clone());
                e.insert(session)
            }
            hash_map::Entry::Occupied(mut e) => {
                e.insert(session);
                e.into_mut()
            }
        }
    }
    pub fn remove_session(&mut self, id: &SessionId) -> Option<Session> {
        self.session_order.retain(|s| s != id);
        self.sessions.remove(id)
    }
    pub fn session(&self, id: &SessionId) -> Option<&Session> { self.sessions.get(id) }
    pub fn session_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }
    pub fn num_sessions(&self) -> usize { self.sessions.len() }

    pub fn sessions_in_creation_order(&self) -> impl Iterator<Item = &Session> {
        self.session_order.iter().filter_map(|id| self.sessions.get(id))
    }

    // Session of the participant, if both the participant and the session still exist.
    pub fn session_of(&self, participant_id: &ParticipantId) -> Option<&Session> {
        let session_id = self.participant(participant_id)?.session_id.as_ref()?;
        self.session(session_id)
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            participants: self.participants.len(),
            ..RegistryStats::default()
        };
        for session in self.sessions.values() {
            match session.phase() {
                SessionPhase::WaitingForOpponent => stats.sessions_waiting += 1,
                SessionPhase::InProgress => stats.sessions_in_progress += 1,
                SessionPhase::Finished => stats.sessions_finished += 1,
            }
        }
        stats
    }
}
