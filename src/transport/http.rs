//! HTTP transport
//!
//! | route             | success        | failure              |
//! |-------------------|----------------|----------------------|
//! | `/`               | 200 liveness   | -                    |
//! | `/pub/{topic}/`   | 202, no body   | 400 with error text  |
//! | `/sub/{topic}/`   | 202, no body   | 400 with error text  |
//!
//! Every method is accepted on every route. A subscription made through
//! `/sub/{topic}/` is drained by a background task that logs and prints
//! each message; nothing is streamed back to the HTTP caller.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::broker::{Broker, Subscription};
use crate::config::Settings;
use crate::utils::error::ServerError;

pub const LIVENESS_BODY: &str = "senkyou is up!\n";

/// Where subscribers started by `/sub/{topic}/` print their messages.
pub type MessageSink = Arc<Mutex<dyn Write + Send>>;

#[derive(Clone)]
struct AppState {
    broker: Arc<dyn Broker>,
    span: Span,
    sink: MessageSink,
    max_body_bytes: usize,
}

/// HTTP front-end of a [`Broker`].
///
/// All log output of the handlers is recorded inside the span passed to
/// [`SenkyouServer::new`].
pub struct SenkyouServer {
    settings: Settings,
    broker: Arc<dyn Broker>,
    span: Span,
    sink: MessageSink,
}

impl SenkyouServer {
    /// Messages received by subscribers are printed to stdout.
    pub fn new(settings: Settings, broker: Arc<dyn Broker>, span: Span) -> Self {
        Self {
            settings,
            broker,
            span,
            sink: Arc::new(Mutex::new(io::stdout())),
        }
    }

    pub fn with_sink(mut self, sink: MessageSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            broker: self.broker.clone(),
            span: self.span.clone(),
            sink: self.sink.clone(),
            max_body_bytes: self.settings.server.max_body_bytes,
        };

        Router::new()
            .route("/", any(home))
            .route("/pub/{topic}/", any(publish))
            .route("/sub/{topic}/", any(subscribe))
            .with_state(state)
    }

    /// Prints the configuration, binds the configured listen address and
    /// serves until the listener fails.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = self.settings.listen_addr();
        self.span.in_scope(|| info!("starting senkyou http server"));
        println!("{}", self.settings);

        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.span
                    .in_scope(|| error!(%addr, error = %source, "cannot start senkyou server"));
                return Err(ServerError::Bind { addr, source });
            }
        };
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let span = self.span.clone();
        if let Ok(local) = listener.local_addr() {
            span.in_scope(|| info!(addr = %local, "listening"));
        }

        axum::serve(listener, self.router()).await.map_err(|e| {
            span.in_scope(|| error!(error = %e, "cannot start senkyou server"));
            ServerError::Serve(e)
        })
    }
}

fn bad_request(err: impl Display) -> Response {
    (StatusCode::BAD_REQUEST, err.to_string()).into_response()
}

async fn home() -> &'static str {
    LIVENESS_BODY
}

async fn publish(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    body: Body,
) -> Response {
    let span = state.span.clone();
    async move {
        let payload = match axum::body::to_bytes(body, state.max_body_bytes).await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                error!(%topic, error = %e, "failed to read request body");
                return bad_request(e);
            }
        };

        if let Err(e) = state.broker.publish(&topic, payload) {
            error!(%topic, error = %e, "failed to publish message");
            return bad_request(e);
        }
        StatusCode::ACCEPTED.into_response()
    }
    .instrument(span)
    .await
}

async fn subscribe(State(state): State<AppState>, Path(topic): Path<String>) -> Response {
    state.span.in_scope(|| match state.broker.subscribe(&topic) {
        Ok(subscription) => {
            debug!(%topic, subscriber = %subscription.id(), "subscription registered");
            tokio::spawn(
                print_messages(subscription, state.sink.clone()).instrument(state.span.clone()),
            );
            StatusCode::ACCEPTED.into_response()
        }
        Err(e) => {
            error!(%topic, error = %e, "failed to subscribe to topic");
            bad_request(e)
        }
    })
}

async fn print_messages(mut subscription: Subscription, sink: MessageSink) {
    while let Some(message) = subscription.next().await {
        info!(
            topic = subscription.topic(),
            message_id = %message.message_id,
            "received message"
        );
        if let Err(e) = write_message(&sink, &message.payload_lossy()) {
            warn!(error = %e, "failed to print message");
        }
    }
    debug!(subscriber = %subscription.id(), "subscription closed");
}

fn write_message(sink: &MessageSink, text: &str) -> io::Result<()> {
    let mut out = sink
        .lock()
        .map_err(|_| io::Error::other("message sink poisoned"))?;
    writeln!(out, "{text}")?;
    out.flush()
}
