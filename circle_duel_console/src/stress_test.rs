// Feeds random input into the game model or into the whole relay and checks that nothing panics
// and the invariants hold. Runs batches until interrupted.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::{io, panic};

use circle_duel::board::Board;
use circle_duel::color::Color;
use circle_duel::coord::{Coord, NUM_COLS, NUM_ROWS};
use circle_duel::event::{ClientEvent, ServerEvent};
use circle_duel::participant::ParticipantId;
use circle_duel::server::{Clients, IncomingEvent, ServerInfo, ServerOptions, ServerState};
use circle_duel::server_helpers::TestServerHelpers;
use circle_duel::session::MAX_PARTICIPANTS;
use circle_duel::test_util::random_legal_move;
use instant::Instant;
use rand::prelude::*;


const BOARD_GAMES_PER_BATCH: usize = 1000;
const RELAY_ROUNDS_PER_BATCH: usize = 10;
const MOVES_PER_GAME: usize = 1000;
const EVENTS_PER_ROUND: usize = 10_000;
const MAX_CLIENTS: usize = 16;
const LEGAL_MOVE_RATIO: f64 = 0.7;

pub struct StressTestConfig {
    pub target: String,
}

fn random_coord(rng: &mut impl Rng) -> Coord {
    Coord::at(rng.random_range(0..NUM_ROWS), rng.random_range(0..NUM_COLS))
}

// Improvement potential: Bias random moves towards the pieces of the side to move.
fn random_move(board: &Board, color: Color, rng: &mut impl Rng) -> (Coord, Coord) {
    if rng.random_bool(LEGAL_MOVE_RATIO) {
        if let Some(m) = random_legal_move(board, color, rng) {
            return m;
        }
    }
    (random_coord(rng), random_coord(rng))
}

fn board_test() -> io::Result<()> {
    let rng = &mut rand::rng();
    loop {
        let t0 = Instant::now();
        let mut finished_games = 0;
        let mut total_moves = 0;
        let mut successful_moves = 0;
        for _ in 0..BOARD_GAMES_PER_BATCH {
            let mut board = Board::new();
            let mut color = Color::Red;
            for _ in 0..MOVES_PER_GAME {
                let (from, to) = random_move(&board, color, rng);
                let before = board.clone();
                total_moves += 1;
                match board.try_move(color, from, to) {
                    Ok(_) => {
                        successful_moves += 1;
                        color = color.opponent();
                    }
                    Err(err) => assert_eq!(board, before, "{:?} changed the board", err),
                }
                if board.winner().is_some() {
                    finished_games += 1;
                    break;
                }
            }
        }
        let elapsed = t0.elapsed();
        println!(
            "Ran: {} games ({} finished), {} moves ({} successful) in {:.2}s",
            BOARD_GAMES_PER_BATCH,
            finished_games,
            total_moves,
            successful_moves,
            elapsed.as_secs_f64(),
        );
    }
}

struct TestClient {
    id: ParticipantId,
    rx: async_std::channel::Receiver<ServerEvent>,
}

fn relay_test() -> io::Result<()> {
    let rng = &mut rand::rng();
    loop {
        let t0 = Instant::now();
        let mut total_events = 0;
        let mut games_started = 0;
        for _ in 0..RELAY_ROUNDS_PER_BATCH {
            let clients = Arc::new(Clients::new());
            let options = ServerOptions { join_timeout: Some(Duration::from_secs(30)) };
            let mut state = ServerState::new(
                options,
                Arc::clone(&clients),
                Arc::new(Mutex::new(ServerInfo::new())),
                Box::new(TestServerHelpers),
            );
            let start = Instant::now();
            let mut connected: Vec<TestClient> = Vec::new();
            for step in 0..EVENTS_PER_ROUND {
                let now = start + Duration::from_millis(step as u64 * 10);
                let event = match rng.random_range(0..10) {
                    0 | 1 if connected.len() < MAX_CLIENTS => {
                        let (tx, rx) = async_std::channel::unbounded();
                        let id = clients.add_client(tx, format!("client-{step}"));
                        connected.push(TestClient { id: id.clone(), rx });
                        IncomingEvent::Connected(id)
                    }
                    2 if !connected.is_empty() => {
                        let client = connected.swap_remove(rng.random_range(0..connected.len()));
                        clients.remove_client(&client.id);
                        IncomingEvent::Disconnected(client.id)
                    }
                    3 => IncomingEvent::Tick,
                    4 | 5 if !connected.is_empty() => {
                        let client = &connected[rng.random_range(0..connected.len())];
                        let display_name = format!("player {}", rng.random_range(0..100));
                        let event = ClientEvent::Join { display_name };
                        IncomingEvent::Network(client.id.clone(), event)
                    }
                    _ => {
                        let Some(client) = connected.choose(rng) else {
                            continue;
                        };
                        let session = state.registry().session_of(&client.id);
                        let (from, to) = match session {
                            Some(session) => {
                                random_move(session.board(), session.turn(), rng)
                            }
                            None => (random_coord(rng), random_coord(rng)),
                        };
                        IncomingEvent::Network(client.id.clone(), ClientEvent::Move { from, to })
                    }
                };
                total_events += 1;
                state.apply_event(event, now);
                check_registry(&state);
                for client in &connected {
                    while let Ok(ev) = client.rx.try_recv() {
                        if matches!(ev, ServerEvent::GameStart { .. }) {
                            games_started += 1;
                        }
                    }
                }
            }
        }
        let elapsed = t0.elapsed();
        println!(
            "Ran: {} rounds, {} events ({} game starts seen) in {:.2}s",
            RELAY_ROUNDS_PER_BATCH,
            total_events,
            games_started,
            elapsed.as_secs_f64(),
        );
    }
}

fn check_registry(state: &ServerState) {
    let registry = state.registry();
    for session in registry.sessions_in_creation_order() {
        assert!(session.seats().len() <= MAX_PARTICIPANTS, "{:?}", session);
        assert!(!session.is_empty(), "Empty session {} kept", session.id());
        for participant_id in session.participant_ids() {
            let participant = registry.participant(participant_id).unwrap();
            assert_eq!(participant.session_id.as_ref(), Some(session.id()));
        }
    }
}

pub fn run(config: StressTestConfig) -> io::Result<()> {
    let target = config.target.clone();
    let std_panic_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        println!("Stress test target {:?} failed", target);
        std_panic_hook(panic_info);
    }));
    match config.target.as_str() {
        "board" => board_test(),
        "relay" => relay_test(),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid stress test target: {}", config.target),
        )),
    }
}
