// src/server/mod.rs

//! Development server: static files from the destination tree plus a
//! live-reload channel.
//!
//! - `GET /__reload` is a Server-Sent-Events stream emitting a `reload` event
//!   per [`ReloadSignal`].
//! - `GET /__reload.js` is a small client that subscribes and refreshes the
//!   page.
//! - Everything else is served from the root directory; directory requests
//!   serve their `index.html`.

pub mod reload;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::{Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub use reload::{ReloadHandle, ReloadSignal};

const RELOAD_CLIENT: &str = r#"(function () {
  var source = new EventSource("/__reload");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
})();
"#;

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    /// `None` binds an ephemeral port.
    pub port: Option<u16>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
        }
    }
}

/// Running server. Dropping the handle leaves the server running; call
/// [`ServerHandle::shutdown`] to stop it.
#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub reload: ReloadHandle,
    closing: watch::Sender<bool>,
    join: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Close live-reload streams, stop accepting connections and wait for
    /// in-flight requests.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.closing.send(true);
        self.join
            .await
            .context("dev server task panicked")?
            .context("dev server failed")?;
        info!("dev server stopped");
        Ok(())
    }
}

#[derive(Clone)]
struct ServerState {
    reload: ReloadHandle,
    closing: watch::Receiver<bool>,
}

/// Bind and start serving `root_dir` in the background.
pub async fn start(
    root_dir: impl Into<PathBuf>,
    options: ServeOptions,
    reload: ReloadHandle,
) -> Result<ServerHandle> {
    let root_dir = root_dir.into();
    let bind = format!("{}:{}", options.host, options.port.unwrap_or(0));
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding dev server to {bind}"))?;
    let addr = listener.local_addr().context("reading dev server address")?;

    let (closing_tx, closing_rx) = watch::channel(false);
    let state = ServerState {
        reload: reload.clone(),
        closing: closing_rx.clone(),
    };

    let app = Router::new()
        .route("/__reload", get(reload_events))
        .route("/__reload.js", get(reload_client))
        .fallback_service(ServeDir::new(&root_dir).append_index_html_on_directories(true))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let mut shutdown_rx = closing_rx;
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|closing| *closing).await;
                debug!("dev server received shutdown signal");
            })
            .await
    });

    info!(root = %root_dir.display(), "dev server listening on http://{addr}");
    Ok(ServerHandle {
        addr,
        reload,
        closing: closing_tx,
        join,
    })
}

async fn reload_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.reload.subscribe();
    let mut closing = state.closing;
    debug!(sessions = state.reload.sessions(), "live-reload session connected");

    let events = futures::stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            // A lagging session missed signals; one reload covers them all.
            Ok(ReloadSignal) | Err(RecvError::Lagged(_)) => {
                Some((Ok(Event::default().event("reload").data("reload")), rx))
            }
            Err(RecvError::Closed) => None,
        }
    })
    .take_until(async move {
        let _ = closing.wait_for(|closing| *closing).await;
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn reload_client() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        RELOAD_CLIENT,
    )
}
