use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Path, State,
    },
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use gnssviz_core::PlotSnapshot;
use log::{debug, info, trace, warn};
use serde::Deserialize;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use thiserror::Error;
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc, watch},
};
use tokio_graceful_shutdown::SubsystemHandle;

use crate::plots::PlotBoard;
use crate::scheduler::Control;
use crate::status::StatusReceiver;

const STATUS_URI: &str = "/v1/api/status";
const PLOTS_URI: &str = "/v1/api/plots";
const PLOT_URI: &str = "/v1/api/plots/{plot_id}";
const PLOT_STREAM_URI: &str = "/v1/api/plots/{plot_id}/stream";
const REWIND_URI: &str = "/v1/api/playback/rewind";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
    #[error("No such plot '{0}'")]
    NoSuchPlot(String),
    #[error("Live source {0} cannot be rewound")]
    RewindUnsupported(String),
    #[error("Ingestion is no longer running")]
    IngestionStopped,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match self {
            WebError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::NoSuchPlot(_) => StatusCode::NOT_FOUND,
            WebError::RewindUnsupported(_) => StatusCode::CONFLICT,
            WebError::IngestionStopped => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Clone)]
pub struct Web {
    port: u16,
    plots: PlotBoard,
    status: StatusReceiver,
    control: mpsc::Sender<Control>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Web {
    pub fn new(
        port: u16,
        plots: PlotBoard,
        status: StatusReceiver,
        control: mpsc::Sender<Control>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Web {
            port,
            plots,
            status,
            control,
            shutdown_tx,
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(STATUS_URI, get(get_status))
            .route(PLOTS_URI, get(get_plots))
            .route(PLOT_URI, get(get_plot))
            .route(PLOT_STREAM_URI, get(plot_stream_handler))
            .route(REWIND_URI, post(rewind))
            .layer(middleware::from_fn(no_cache_middleware))
            .with_state(self)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let port = self.port;
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port))
                .await
                .map_err(WebError::Io)?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone();

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        info!("Starting HTTP web server on port {}", port);

        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                let _ = shutdown_tx.send(());
            },
            r = axum::serve(listener, app)
                    .with_graceful_shutdown(
                        async move {
                            _ = shutdown_rx.recv().await;
                        }
                    ) => {
                return r.map_err(WebError::Io);
            }
        }
        Ok(())
    }
}

/// Middleware to add no-cache headers to API responses
async fn no_cache_middleware(request: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

#[derive(Deserialize)]
struct PlotIdParam {
    plot_id: String,
}

#[debug_handler]
async fn get_status(State(state): State<Web>) -> Response {
    let status = state.status.borrow().clone();
    Json(status).into_response()
}

#[debug_handler]
async fn get_plots(State(state): State<Web>) -> Response {
    Json(state.plots.list()).into_response()
}

#[debug_handler]
async fn get_plot(State(state): State<Web>, Path(params): Path<PlotIdParam>) -> Response {
    match state.plots.snapshot(&params.plot_id) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => WebError::NoSuchPlot(params.plot_id).into_response(),
    }
}

#[debug_handler]
async fn plot_stream_handler(
    State(state): State<Web>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(params): Path<PlotIdParam>,
    ws: WebSocketUpgrade,
) -> Response {
    debug!("plot stream request from {} for {}", addr, params.plot_id);

    match state.plots.subscribe(&params.plot_id) {
        Some(plot_rx) => {
            let shutdown_rx = state.shutdown_tx.subscribe();
            ws.on_upgrade(move |socket| plot_stream(socket, plot_rx, shutdown_rx))
        }
        None => WebError::NoSuchPlot(params.plot_id).into_response(),
    }
}

/// Sends the current snapshot, then one message per change
async fn plot_stream(
    mut socket: WebSocket,
    mut plot_rx: watch::Receiver<PlotSnapshot>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let message = match serde_json::to_string(&*plot_rx.borrow_and_update()) {
            Ok(json) => json,
            Err(e) => {
                warn!("Cannot serialize plot snapshot: {}", e);
                break;
            }
        };
        let len = message.len();
        if let Err(e) = socket.send(Message::Text(message.into())).await {
            debug!("Error on send to websocket: {}", e);
            break;
        }
        trace!("Sent plot snapshot {} bytes", len);

        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Shutdown of websocket");
                break;
            },
            r = plot_rx.changed() => {
                if r.is_err() {
                    debug!("Plot channel closed");
                    break;
                }
            }
        }
    }
}

#[debug_handler]
async fn rewind(
    State(state): State<Web>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let (kind, source) = {
        let status = state.status.borrow();
        (status.source_kind, status.source.clone())
    };
    debug!("rewind request from {} for {}", addr, source);

    if kind.is_live() {
        return WebError::RewindUnsupported(source).into_response();
    }
    match state.control.send(Control::Rewind).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => WebError::IngestionStopped.into_response(),
    }
}
