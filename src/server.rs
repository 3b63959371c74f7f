// The relay core. All state changes happen in `ServerState::apply_event`, which runs on a single
// thread fed by a channel: network tasks only translate socket traffic into `IncomingEvent`s and
// drain per-client outbound queues.

use std::collections::{HashMap, hash_map};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use instant::Instant;
use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use prometheus::{
    IntCounter, IntCounterVec, IntGauge, IntGaugeVec, register_int_counter,
    register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
};

use crate::coord::Coord;
use crate::event::{ClientEvent, Rejection, ServerEvent};
use crate::matchmaker::{JoinRejection, join_queue};
use crate::participant::ParticipantId;
use crate::registry::{Registry, RegistryStats};
use crate::report_internal_error;
use crate::server_helpers::ServerHelpers;
use crate::session::{Departure, SessionId, SessionPhase};


pub const MAX_DISPLAY_NAME_LENGTH: usize = 32;

lazy_static! {
    static ref SESSIONS_GAUGE: IntGaugeVec = register_int_gauge_vec!(
        "circle_duel_sessions",
        "Number of live sessions by phase.",
        &["phase"]
    )
    .unwrap();
    static ref PARTICIPANTS_GAUGE: IntGauge =
        register_int_gauge!("circle_duel_participants", "Number of connected participants.")
            .unwrap();
    static ref MOVES_COUNTER: IntCounterVec = register_int_counter_vec!(
        "circle_duel_moves_total",
        "Move requests by result.",
        &["result"]
    )
    .unwrap();
    static ref GAMES_FINISHED_COUNTER: IntCounter =
        register_int_counter!("circle_duel_games_finished_total", "Games that reached a victory.")
            .unwrap();
    static ref JOIN_TIMEOUTS_COUNTER: IntCounter = register_int_counter!(
        "circle_duel_join_timeouts_total",
        "Waiting sessions closed because nobody joined in time."
    )
    .unwrap();
}

#[derive(Debug)]
pub enum IncomingEvent {
    Connected(ParticipantId),
    Network(ParticipantId, ClientEvent),
    Disconnected(ParticipantId),
    Tick,
    Terminate,
}

#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    // A session that waits for an opponent longer than this is closed. `None` means forever.
    pub join_timeout: Option<Duration>,
}

// Snapshot for the status page. Updated after every event.
#[derive(Clone, Debug, Default)]
pub struct ServerInfo {
    pub stats: RegistryStats,
    pub moves_accepted: u64,
    pub moves_rejected: u64,
}

impl ServerInfo {
    pub fn new() -> Self { Self::default() }
}


struct Client {
    events_tx: async_std::channel::Sender<ServerEvent>,
    // Used only for logging. Not guaranteed to be unique.
    logging_id: String,
}

// Outbound queues of all open connections. Shared between the network tasks, which add and remove
// clients, and `ServerState`, which sends events.
pub struct Clients {
    map: Mutex<HashMap<ParticipantId, Client>>,
}

impl Clients {
    pub fn new() -> Self { Clients { map: Mutex::new(HashMap::new()) } }

    pub fn add_client(
        &self, events_tx: async_std::channel::Sender<ServerEvent>, logging_id: String,
    ) -> ParticipantId {
        let mut map = self.map.lock().unwrap();
        loop {
            let id = ParticipantId::new_random();
            match map.entry(id.clone()) {
                hash_map::Entry::Occupied(_) => {}
                hash_map::Entry::Vacant(e) => {
                    e.insert(Client { events_tx, logging_id });
                    return id;
                }
            }
        }
    }

    // Returns the client's logging ID if the client was present. Whoever gets `Some` is
    // responsible for reporting the disconnect.
    pub fn remove_client(&self, id: &ParticipantId) -> Option<String> {
        self.map.lock().unwrap().remove(id).map(|client| client.logging_id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool { self.map.lock().unwrap().contains_key(id) }

    // Best effort: a failed delivery means the connection is going away and will be reported as
    // a disconnect by its network task.
    pub fn send(&self, id: &ParticipantId, event: ServerEvent) {
        let map = self.map.lock().unwrap();
        let Some(client) = map.get(id) else {
            debug!("Dropping {:?} for gone client {}", event, id);
            return;
        };
        if let Err(err) = client.events_tx.try_send(event) {
            debug!("Cannot deliver to client {}: {}", client.logging_id, err);
        }
    }

    pub fn send_rejection(&self, id: &ParticipantId, reason: Rejection) {
        self.send(id, ServerEvent::Rejection { reason });
    }
}


pub struct ServerState {
    options: ServerOptions,
    clients: Arc<Clients>,
    registry: Registry,
    server_info: Arc<Mutex<ServerInfo>>,
    helpers: Box<dyn ServerHelpers + Send>,
    terminated: bool,
}

impl ServerState {
    pub fn new(
        options: ServerOptions, clients: Arc<Clients>, server_info: Arc<Mutex<ServerInfo>>,
        helpers: Box<dyn ServerHelpers + Send>,
    ) -> Self {
        ServerState {
            options,
            clients,
            registry: Registry::new(),
            server_info,
            helpers,
            terminated: false,
        }
    }

    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn is_terminated(&self) -> bool { self.terminated }

    pub fn apply_event(&mut self, event: IncomingEvent, now: Instant) {
        if self.terminated {
            debug!("Ignoring {:?}: shutting down", event);
            return;
        }
        match event {
            IncomingEvent::Connected(participant_id) => self.on_connected(participant_id),
            IncomingEvent::Network(participant_id, event) => match event {
                ClientEvent::Join { display_name } => {
                    self.on_join(&participant_id, display_name, now)
                }
                ClientEvent::Move { from, to } => self.on_move(&participant_id, from, to),
            },
            IncomingEvent::Disconnected(participant_id) => self.on_disconnected(&participant_id),
            IncomingEvent::Tick => self.close_expired_sessions(now),
            IncomingEvent::Terminate => self.on_terminate(),
        }
        self.update_server_info();
    }

    fn on_connected(&mut self, participant_id: ParticipantId) {
        debug!("Participant {} connected", participant_id);
        self.registry.add_participant(participant_id);
    }

    fn on_join(&mut self, participant_id: &ParticipantId, display_name: String, now: Instant) {
        let Some(participant) = self.registry.participant(participant_id) else {
            debug!("Join from unknown participant {}", participant_id);
            return;
        };
        if participant.session_id.is_some() {
            self.clients.send_rejection(participant_id, Rejection::AlreadyJoined);
            return;
        }
        let display_name = match self.check_display_name(&display_name) {
            Ok(name) => name,
            Err(message) => {
                self.clients
                    .send_rejection(participant_id, Rejection::InvalidDisplayName { message });
                return;
            }
        };

        match join_queue(&mut self.registry, participant_id, display_name, now) {
            Ok(joined) => {
                info!(
                    "Participant {} joined session {} as {:?}",
                    participant_id, joined.session_id, joined.color
                );
                self.clients.send(participant_id, ServerEvent::Joined {
                    session_id: joined.session_id.clone(),
                    assigned_color: joined.color,
                });
                if joined.game_started {
                    info!("Session {} started", joined.session_id);
                    self.broadcast_game_start(&joined.session_id);
                }
            }
            Err(JoinRejection::AlreadyJoined) => {
                self.clients.send_rejection(participant_id, Rejection::AlreadyJoined);
            }
            Err(JoinRejection::UnknownParticipant) => {
                debug!("Join from unknown participant {}", participant_id);
            }
            Err(JoinRejection::SessionUnavailable) => {
                report_internal_error!("no seat for participant {}", participant_id);
            }
        }
    }

    fn check_display_name(&self, name: &str) -> Result<String, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Display name cannot be empty.".to_owned());
        }
        if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
            return Err(format!("Maximum display name length is {MAX_DISPLAY_NAME_LENGTH}."));
        }
        self.helpers.validate_display_name(name)?;
        Ok(name.to_owned())
    }

    fn on_move(&mut self, participant_id: &ParticipantId, from: Coord, to: Coord) {
        let Some(participant) = self.registry.participant(participant_id) else {
            debug!("Move from unknown participant {}", participant_id);
            return;
        };
        let Some(session_id) = participant.session_id.clone() else {
            self.reject_move(participant_id, Rejection::NotSeated);
            return;
        };
        let Some(session) = self.registry.session_mut(&session_id) else {
            report_internal_error!("participant {} points to missing session", participant_id);
            return;
        };
        match session.submit_move(participant_id, from, to) {
            Ok(()) => {
                MOVES_COUNTER.with_label_values(&["accepted"]).inc();
                self.server_info.lock().unwrap().moves_accepted += 1;
                let update = session.game_update_event();
                if let Some(outcome) = session.outcome() {
                    info!(
                        "Session {} finished: {:?} won by {:?}",
                        session_id, outcome.winner, outcome.reason
                    );
                    GAMES_FINISHED_COUNTER.inc();
                }
                self.broadcast(&session_id, update);
            }
            Err(rejection) => {
                debug!(
                    "Move {:?} -> {:?} by {} rejected: {:?}",
                    from, to, participant_id, rejection
                );
                self.reject_move(participant_id, rejection.into());
            }
        }
    }

    fn reject_move(&self, participant_id: &ParticipantId, reason: Rejection) {
        MOVES_COUNTER.with_label_values(&["rejected"]).inc();
        self.server_info.lock().unwrap().moves_rejected += 1;
        self.clients.send_rejection(participant_id, reason);
    }

    fn on_disconnected(&mut self, participant_id: &ParticipantId) {
        // The network task normally removes the client first; this covers the other order.
        self.clients.remove_client(participant_id);
        let Some(participant) = self.registry.remove_participant(participant_id) else {
            debug!("Disconnect of unknown participant {}", participant_id);
            return;
        };
        debug!("Participant {} removed", participant_id);
        let Some(session_id) = participant.session_id else {
            return;
        };
        let Some(session) = self.registry.session_mut(&session_id) else {
            report_internal_error!("participant {} points to missing session", participant_id);
            return;
        };
        match session.remove(participant_id) {
            Departure::NotSeated => {
                report_internal_error!(
                    "participant {} not seated in session {}",
                    participant_id,
                    session_id
                );
            }
            Departure::SessionEmpty => {
                self.registry.remove_session(&session_id);
                info!("Session {} closed: no participants left", session_id);
            }
            Departure::OpponentRemains(opponent_id) => {
                info!("Participant {} left session {}", participant_id, session_id);
                self.clients.send(&opponent_id, ServerEvent::ParticipantLeft {
                    participant_id: participant_id.clone(),
                });
            }
        }
    }

    fn close_expired_sessions(&mut self, now: Instant) {
        let Some(join_timeout) = self.options.join_timeout else {
            return;
        };
        let expired = self
            .registry
            .sessions_in_creation_order()
            .filter(|session| {
                session.phase() == SessionPhase::WaitingForOpponent
                    && now.duration_since(session.created_at()) >= join_timeout
            })
            .map(|session| session.id().clone())
            .collect_vec();
        for session_id in expired {
            self.close_waiting_session(&session_id);
        }
    }

    fn close_waiting_session(&mut self, session_id: &SessionId) {
        let Some(session) = self.registry.remove_session(session_id) else {
            return;
        };
        info!("Session {} closed: nobody joined in time", session_id);
        JOIN_TIMEOUTS_COUNTER.inc();
        for participant_id in session.participant_ids() {
            if let Some(participant) = self.registry.participant_mut(participant_id) {
                participant.unseat();
            }
            self.clients.send_rejection(participant_id, Rejection::JoinTimedOut);
        }
    }

    fn on_terminate(&mut self) {
        info!("Shutting down, notifying {} participants", self.registry.num_participants());
        for participant_id in self.registry.participant_ids() {
            self.clients.send_rejection(participant_id, Rejection::ShuttingDown);
        }
        self.terminated = true;
    }

    fn broadcast_game_start(&self, session_id: &SessionId) {
        let Some(session) = self.registry.session(session_id) else {
            return;
        };
        self.broadcast(session_id, session.game_start_event());
    }

    fn broadcast(&self, session_id: &SessionId, event: ServerEvent) {
        let Some(session) = self.registry.session(session_id) else {
            warn!("Cannot broadcast to missing session {}", session_id);
            return;
        };
        for participant_id in session.participant_ids() {
            self.clients.send(participant_id, event.clone());
        }
    }

    fn update_server_info(&self) {
        let stats = self.registry.stats();
        PARTICIPANTS_GAUGE.set(stats.participants as i64);
        for (phase, count) in [
            ("waiting", stats.sessions_waiting),
            ("in_progress", stats.sessions_in_progress),
            ("finished", stats.sessions_finished),
        ] {
            SESSIONS_GAUGE.with_label_values(&[phase]).set(count as i64);
        }
        self.server_info.lock().unwrap().stats = stats;
    }
}
