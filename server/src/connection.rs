use std::sync::atomic::{AtomicU64, Ordering};

use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_http::ws::Item;
use actix_web::http::{header, StatusCode};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use actix_web_actors::ws::{CloseCode, CloseReason};

use protocol::{ConnectionId, Envelope};

use crate::config::Config;
use crate::connection_tx_storage::ConnectionTx;
use crate::server::{ServerCommand, ServerTx};

/// Sent as the close reason and as the body of plain HTTP requests.
pub const BANNER: &str = "390: Chart editor not found.  This is a MercuryMultiMapperServer!";

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect {
        connection_id: ConnectionId,
        tx: ConnectionTx,
    },
    Disconnect {
        from: ConnectionId,
    },
    Frame {
        from: ConnectionId,
        frame: Frame,
    },
}

/// A complete websocket message as received. Binary payloads are never
/// accepted, so only their size is kept for the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Message(Envelope),
    Close { code: u16 },
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

/// Hands out connection ids from 1. Ids are never reused while the process
/// runs.
#[derive(Debug)]
pub struct ConnectionIdSource(AtomicU64);

impl Default for ConnectionIdSource {
    fn default() -> Self {
        Self(AtomicU64::new(1))
    }
}

impl ConnectionIdSource {
    pub fn next_id(&self) -> ConnectionId {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

struct Fragments {
    text: bool,
    buf: Vec<u8>,
}

impl Fragments {
    fn new(text: bool) -> Self {
        Self {
            text,
            buf: Vec::new(),
        }
    }

    fn into_frame(self) -> Frame {
        if !self.text {
            return Frame::Binary(self.buf.len());
        }
        match String::from_utf8(self.buf) {
            Ok(text) => Frame::Text(text),
            Err(e) => Frame::Binary(e.into_bytes().len()),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Reassembly {
    Pending,
    Complete(Frame),
    /// Continuation with no message started.
    Orphan,
    TooLarge,
}

/// Folds one continuation item into the message being assembled.
fn reassemble(
    fragments: &mut Option<Fragments>,
    item: Item,
    max_frame_size: usize,
) -> Reassembly {
    let (bytes, last) = match item {
        Item::FirstText(bytes) => {
            *fragments = Some(Fragments::new(true));
            (bytes, false)
        }
        Item::FirstBinary(bytes) => {
            *fragments = Some(Fragments::new(false));
            (bytes, false)
        }
        Item::Continue(bytes) => (bytes, false),
        Item::Last(bytes) => (bytes, true),
    };

    let partial = match fragments.as_mut() {
        Some(partial) => partial,
        None => return Reassembly::Orphan,
    };
    partial.buf.extend_from_slice(&bytes);
    if partial.buf.len() > max_frame_size {
        *fragments = None;
        return Reassembly::TooLarge;
    }
    if !last {
        return Reassembly::Pending;
    }
    match fragments.take() {
        Some(partial) => Reassembly::Complete(partial.into_frame()),
        None => Reassembly::Orphan,
    }
}

struct ConnectionActor {
    connection_id: ConnectionId,
    srv_tx: ServerTx,
    max_frame_size: usize,
    fragments: Option<Fragments>,
}

impl ConnectionActor {
    fn forward(&self, command: ConnectionCommand) {
        if self.srv_tx.send(ServerCommand::Connection(command)).is_err() {
            log::error!(
                "Server task is gone, dropping input of connection {}",
                self.connection_id
            );
        }
    }

    fn forward_frame(&self, frame: Frame) {
        self.forward(ConnectionCommand::Frame {
            from: self.connection_id,
            frame,
        });
    }

    fn continuation(&mut self, item: Item, ctx: &mut ws::WebsocketContext<Self>) {
        let code = match reassemble(&mut self.fragments, item, self.max_frame_size) {
            Reassembly::Pending => return,
            Reassembly::Complete(frame) => return self.forward_frame(frame),
            Reassembly::Orphan => {
                log::warn!(
                    "Connection {} sent a continuation without a first fragment",
                    self.connection_id
                );
                CloseCode::Protocol
            }
            Reassembly::TooLarge => {
                log::warn!(
                    "Connection {} sent a message over {} bytes",
                    self.connection_id,
                    self.max_frame_size
                );
                CloseCode::Size
            }
        };
        ctx.close(Some(CloseReason {
            code,
            description: None,
        }));
        ctx.stop();
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ConnectionEvent>();

        if self
            .srv_tx
            .send(ServerCommand::Connection(ConnectionCommand::Connect {
                connection_id: self.connection_id,
                tx,
            }))
            .is_err()
        {
            log::error!(
                "Server task is gone, refusing connection {}",
                self.connection_id
            );
            ctx.stop();
            return;
        }

        let addr: Addr<Self> = ctx.address();
        let connection_id = self.connection_id;

        tokio::spawn(async move {
            log::debug!("connection {} egress - started", connection_id);
            while let Some(event) = rx.recv().await {
                if !addr.connected() {
                    break;
                }
                addr.do_send(ConnectionActorMessage(event));
            }
            log::debug!("connection {} egress - terminated", connection_id);
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.forward(ConnectionCommand::Disconnect {
            from: self.connection_id,
        });
        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Pong(_)) | Ok(ws::Message::Nop) => (),
            Ok(ws::Message::Text(text)) => {
                let text: &str = &text;
                self.forward_frame(Frame::Text(text.to_owned()));
            }
            Ok(ws::Message::Binary(bin)) => {
                log::debug!("Ingress binary size: {}", bin.len());
                self.forward_frame(Frame::Binary(bin.len()));
            }
            Ok(ws::Message::Continuation(item)) => self.continuation(item, ctx),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                log::warn!(
                    "Connection {} broke the websocket protocol: {}",
                    self.connection_id,
                    e
                );
                ctx.stop();
            }
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        match msg.0 {
            ConnectionEvent::Message(envelope) => match protocol::encode(&envelope) {
                Ok(text) => ctx.text(text),
                Err(e) => log::error!(
                    "Could not encode message for connection {}: {}",
                    self.connection_id,
                    e
                ),
            },
            ConnectionEvent::Close { code } => {
                ctx.close(Some(CloseReason {
                    code: CloseCode::from(code),
                    description: Some(BANNER.to_owned()),
                }));
                ctx.stop();
            }
        }
    }
}

pub fn is_websocket_upgrade(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.eq_ignore_ascii_case("websocket"))
}

/// The Sec-WebSocket-Protocol header may list several names.
pub fn requests_subprotocol(requested: Option<&str>, expected: &str) -> bool {
    requested.map_or(false, |v| v.split(',').any(|p| p.trim() == expected))
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
    ids: web::Data<ConnectionIdSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    let peer = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_owned();

    if !is_websocket_upgrade(&req) {
        log::info!(
            "Client with address '{}' sent a plain HTTP request, replied with 418",
            peer
        );
        return Ok(HttpResponse::build(StatusCode::IM_A_TEAPOT)
            .content_type("text/plain")
            .body(BANNER));
    }

    let requested = req
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok());
    if !requests_subprotocol(requested, &config.subprotocol) {
        log::info!(
            "Client with address '{}' rejected, requested subprotocol {:?}",
            peer,
            requested
        );
        return Ok(HttpResponse::Forbidden().finish());
    }

    let connection_id = ids.next_id();
    let protocols = [config.subprotocol.as_str()];
    let response = ws::WsResponseBuilder::new(
        ConnectionActor {
            connection_id,
            srv_tx: srv_tx.get_ref().clone(),
            max_frame_size: config.max_frame_size,
            fragments: None,
        },
        &req,
        stream,
    )
    .protocols(&protocols)
    .frame_size(config.max_frame_size)
    .start()?;

    log::info!(
        "Client with address '{}' connected as connection {}",
        peer,
        connection_id
    );
    Ok(response)
}
