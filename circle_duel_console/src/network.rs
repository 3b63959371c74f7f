// Improvement potential: Switch from JSON to a binary format once there is a non-browser client.

use async_tungstenite::WebSocketStream;
use futures_io::{AsyncRead, AsyncWrite};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Serialize, de};
use tungstenite::Message;


pub const PORT: u16 = 38617;

#[derive(Debug)]
pub enum CommunicationError {
    Socket(tungstenite::Error),
    Serde(serde_json::Error),
    // A well-formed websocket message the relay does not understand, e.g. a binary frame.
    UnexpectedMessage(String),
    ConnectionClosed,
}

impl CommunicationError {
    // Whether the connection can keep going after this error. Garbage input is dropped, the
    // connection stays open.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CommunicationError::Serde(_) | CommunicationError::UnexpectedMessage(_))
    }
}

pub async fn write_obj_async<T, S>(
    sink: &mut SplitSink<WebSocketStream<S>, Message>, obj: &T,
) -> Result<(), CommunicationError>
where
    T: Serialize,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let serialized = serde_json::to_string(obj).map_err(CommunicationError::Serde)?;
    sink.send(Message::Text(serialized.into())).await.map_err(CommunicationError::Socket)
}

pub async fn read_obj_async<T, S>(
    stream: &mut SplitStream<WebSocketStream<S>>,
) -> Result<T, CommunicationError>
where
    T: de::DeserializeOwned,
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let msg = match stream.next().await {
            None => return Err(CommunicationError::ConnectionClosed),
            Some(Err(tungstenite::Error::ConnectionClosed)) => {
                return Err(CommunicationError::ConnectionClosed);
            }
            Some(Err(err)) => return Err(CommunicationError::Socket(err)),
            Some(Ok(msg)) => msg,
        };
        match msg {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).map_err(CommunicationError::Serde);
            }
            Message::Close(_) => return Err(CommunicationError::ConnectionClosed),
            // Answered by tungstenite itself.
            Message::Ping(_) | Message::Pong(_) => {}
            msg => {
                return Err(CommunicationError::UnexpectedMessage(format!(
                    "Expected text, got {:?}",
                    msg
                )));
            }
        }
    }
}
