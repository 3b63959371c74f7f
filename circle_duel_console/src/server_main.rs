// Websocket front-end of the relay. Network tasks are async; `ServerState` lives on a dedicated
// thread and receives everything through one channel, so sessions never see concurrent updates.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use async_tungstenite::WebSocketStream;
use circle_duel::event::ClientEvent;
use circle_duel::server::*;
use futures_io::{AsyncRead, AsyncWrite};
use futures_util::StreamExt;
use instant::Instant;
use log::{error, info, warn};
use prometheus::Encoder;
use tide::StatusCode;
use tide_jsx::html;
use tungstenite::protocol;

use crate::network::{self, CommunicationError};
use crate::prod_server_helpers::ProdServerHelpers;
use crate::server_config::{AllowedOrigin, ServerConfig};


const TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
struct HttpServerState {
    server_info: Arc<Mutex<ServerInfo>>,
}

async fn handle_connection<S: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static>(
    peer_addr: String, stream: WebSocketStream<S>, tx: mpsc::SyncSender<IncomingEvent>,
    clients: Arc<Clients>,
) -> tide::Result<()> {
    let (mut stream_tx, mut stream_rx) = stream.split();
    info!("Client connected: {}", peer_addr);

    let (client_tx, client_rx) = async_std::channel::unbounded();
    let participant_id = clients.add_client(client_tx, peer_addr);
    // Must reach `ServerState` before any network event from this client.
    tx.send(IncomingEvent::Connected(participant_id.clone()))?;

    let clients_remover = Arc::clone(&clients);
    let tx_remover = tx.clone();
    let remover_id = participant_id.clone();
    // Returns the logging ID only to the first caller, so the disconnect is reported once.
    let remove_client1 = move || {
        let logging_id = clients_remover.remove_client(&remover_id)?;
        if tx_remover.send(IncomingEvent::Disconnected(remover_id.clone())).is_err() {
            warn!("Relay is gone, cannot report disconnect of {}", logging_id);
        }
        Some(logging_id)
    };
    let remove_client2 = remove_client1.clone();

    // Client -> Server
    let reader_id = participant_id.clone();
    async_std::task::spawn(async move {
        loop {
            match network::read_obj_async::<ClientEvent, _>(&mut stream_rx).await {
                Ok(_) if !clients.contains(&reader_id) => {
                    // The writer has already reported the disconnect.
                    break;
                }
                Ok(ev) => {
                    if tx.send(IncomingEvent::Network(reader_id.clone(), ev)).is_err() {
                        break;
                    }
                }
                Err(err) if err.is_recoverable() => {
                    warn!("Dropping malformed message from {}: {:?}", reader_id, err);
                }
                Err(err) => {
                    if let Some(logging_id) = remove_client1() {
                        match err {
                            CommunicationError::ConnectionClosed => {
                                info!("Client {} disconnected", logging_id)
                            }
                            err => warn!(
                                "Client {} disconnected due to read error: {:?}",
                                logging_id, err
                            ),
                        }
                    }
                    break;
                }
            }
        }
    });

    // Server -> Client
    while let Ok(ev) = client_rx.recv().await {
        match network::write_obj_async(&mut stream_tx, &ev).await {
            Ok(()) => {}
            Err(err) => {
                if let Some(logging_id) = remove_client2() {
                    warn!("Client {} disconnected due to write error: {:?}", logging_id, err);
                }
                break;
            }
        }
    }

    Ok(())
}

fn check_origin<T>(req: &tide::Request<T>, allowed_origin: &AllowedOrigin) -> tide::Result<()> {
    let AllowedOrigin::ThisSite(allowed) = allowed_origin else {
        return Ok(());
    };
    let origin = req.header(http_types::headers::ORIGIN).map_or(
        Err(tide::Error::from_str(
            StatusCode::Forbidden,
            "Failed to get Origin header of the websocket request.",
        )),
        |origins| Ok(origins.last().as_str()),
    )?;
    if origin != allowed.as_str() {
        return Err(tide::Error::from_str(
            StatusCode::Forbidden,
            format!("Origin {origin} is not allowed."),
        ));
    }
    Ok(())
}

fn run_tide(
    config: ServerConfig, clients: Arc<Clients>, server_info: Arc<Mutex<ServerInfo>>,
    tx: mpsc::SyncSender<IncomingEvent>,
) -> anyhow::Result<()> {
    let mut app = tide::with_state(HttpServerState { server_info });

    app.with(tide::utils::After(|mut res: tide::Response| async {
        if let Some(err) = res.error() {
            let msg = format!("Error: {:#?}", err);
            res.set_status(err.status());
            res.set_body(msg);
        }
        Ok(res)
    }));

    app.at("/dyn/metrics").get(handle_metrics);
    app.at("/dyn/server").get(handle_server_info);

    let allowed_origin = config.allowed_origin;

    app.at("/").get(move |req: tide::Request<HttpServerState>| {
        let mytx = tx.clone();
        let myclients = clients.clone();
        let allowed_origin = allowed_origin.clone();
        async move {
            check_origin(&req, &allowed_origin)?;
            let peer_addr = req.peer_addr().map_or_else(
                || Err(tide::Error::from_str(StatusCode::Forbidden, "Peer address missing")),
                |x| Ok(x.to_owned()),
            )?;

            // tide::Request -> http_types::Request -> http::Request<Body> -> http::Request<()>.
            let http_types_req: http_types::Request = req.into();
            let http_req_with_body: http::Request<http_types::Body> = http_types_req.into();
            let http_req = http_req_with_body.map(|_| ());

            let http_resp = tungstenite::handshake::server::create_response(&http_req)
                .map_err(|e| tide::Error::new(StatusCode::BadRequest, e))?;

            // http::Response<()> -> http::Response<Body> -> http_types::Response
            let http_resp_with_body = http_resp.map(|_| http_types::Body::empty());
            let mut http_types_resp: http_types::Response = http_resp_with_body.into();

            // Gives the stream back once the connection is upgraded.
            let upgrade_receiver = http_types_resp.recv_upgrade().await;

            async_std::task::spawn(async move {
                if let Some(stream) = upgrade_receiver.await {
                    let stream =
                        WebSocketStream::from_raw_socket(stream, protocol::Role::Server, None)
                            .await;
                    if let Err(err) = handle_connection(peer_addr, stream, mytx, myclients).await
                    {
                        error!("{}", err);
                    }
                } else {
                    error!("Never received an upgrade for client {}", peer_addr);
                }
            });
            Ok(http_types_resp)
        }
    });
    async_std::task::block_on(async { app.listen(format!("0.0.0.0:{}", config.port)).await })?;
    Ok(())
}

pub fn run(config: ServerConfig) -> anyhow::Result<()> {
    let options = ServerOptions { join_timeout: config.join_timeout };
    info!("Starting relay on port {} with {:?}", config.port, options);

    // Limited buffer for data streaming from clients into the relay. When it is full because
    // `ServerState::apply_event` isn't coping with the load, websocket readers block.
    let (tx, rx) = mpsc::sync_channel(100000);
    let tx_tick = tx.clone();
    let tx_terminate = tx.clone();
    let server_info = Arc::new(Mutex::new(ServerInfo::new()));
    let server_info_copy = Arc::clone(&server_info);
    let clients = Arc::new(Clients::new());
    let clients_copy = Arc::clone(&clients);

    ctrlc::set_handler(move || {
        if tx_terminate.send(IncomingEvent::Terminate).is_err() {
            std::process::exit(1);
        }
    })?;

    thread::spawn(move || {
        loop {
            thread::sleep(TICK_INTERVAL);
            if tx_tick.send(IncomingEvent::Tick).is_err() {
                break;
            }
        }
    });

    thread::spawn(move || {
        let mut server_state = ServerState::new(
            options,
            clients_copy,
            server_info_copy,
            Box::new(ProdServerHelpers),
        );
        for event in rx {
            server_state.apply_event(event, Instant::now());
            if server_state.is_terminated() {
                // Let the writers flush `ShuttingDown` to the clients.
                thread::sleep(Duration::from_millis(500));
                info!("Relay stopped");
                std::process::exit(0);
            }
        }
        error!("Unexpected end of events stream");
    });

    run_tide(config, clients, server_info, tx)
}

async fn handle_metrics(_req: tide::Request<HttpServerState>) -> tide::Result {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| tide::Error::from_str(StatusCode::InternalServerError, e.to_string()))?;
    let body = String::from_utf8(buffer)?;
    let mut resp = tide::Response::new(StatusCode::Ok);
    resp.set_body(body);
    Ok(resp)
}

async fn handle_server_info(req: tide::Request<HttpServerState>) -> tide::Result {
    let info = req.state().server_info.lock().unwrap().clone();
    let h: String = html! {
        <html>
        <head>
        </head>
        <body>
            <p>{"Participants: "}{info.stats.participants}</p>
            <p>{"Sessions waiting: "}{info.stats.sessions_waiting}</p>
            <p>{"Sessions in progress: "}{info.stats.sessions_in_progress}</p>
            <p>{"Sessions finished: "}{info.stats.sessions_finished}</p>
            <p>{"Moves accepted: "}{info.moves_accepted}</p>
            <p>{"Moves rejected: "}{info.moves_rejected}</p>
        </body>
        </html>
    };
    let mut resp = tide::Response::new(StatusCode::Ok);
    resp.set_content_type(http_types::Mime::from("text/html; charset=UTF-8"));
    resp.set_body(h);
    Ok(resp)
}
