//! Webhook update source: a bound HTTP endpoint that accepts one update per
//! POST and feeds it into the same [`UpdateSource`] contract long polling
//! satisfies. The binding is scoped to the value; dropping it stops the
//! server and frees the port.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use scenbot_core::types::Update;
use scenbot_core::{Result, UpdateSource};

pub struct WebhookServer {
    local_addr: SocketAddr,
    receiver: mpsc::UnboundedReceiver<Update>,
    server: JoinHandle<()>,
}

impl WebhookServer {
    /// Binds `addr` and starts accepting update posts. Use port 0 to let
    /// the OS pick one; see [`local_addr`](WebhookServer::local_addr).
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let app = Router::new()
            .route("/", post(receive_update))
            .with_state(sender);
        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(error = %err, "webhook server stopped unexpectedly");
            }
        });

        info!(addr = %local_addr, "webhook endpoint bound");
        Ok(Self {
            local_addr,
            receiver,
            server,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl UpdateSource for WebhookServer {
    fn updates(&mut self) -> BoxStream<'_, Update> {
        stream::unfold(&mut self.receiver, |receiver| async move {
            receiver.recv().await.map(|update| (update, receiver))
        })
        .boxed()
    }
}

impl Drop for WebhookServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// One update per POST; replies 200 with an empty body. Malformed payloads
/// are dropped with a 400.
async fn receive_update(
    State(sender): State<mpsc::UnboundedSender<Update>>,
    payload: std::result::Result<Json<Update>, JsonRejection>,
) -> StatusCode {
    let Json(update) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            warn!(error = %rejection, "dropping malformed webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    if sender.send(update).is_err() {
        warn!("webhook consumer is gone, dropping update");
    }
    StatusCode::OK
}
