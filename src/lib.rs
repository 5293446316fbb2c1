//! Documentation of a read-only university catalog API.
//!
//! Serves courses, sections, professors and course evaluations out of MongoDB,
//! plus the autocomplete tree used by the course search frontend.
//!
//!
//!
//! # Routes
//!
//! | Method  | Path                       | Notes                                  |
//! |---------|----------------------------|----------------------------------------|
//! | GET     | `/course`                  | filter by query params, `offset` pages |
//! | GET     | `/course/all`              | every course                           |
//! | GET     | `/course/{id}`             |                                        |
//! | GET     | `/section`                 | filter by query params, `offset` pages |
//! | GET     | `/section/{id}`            |                                        |
//! | GET     | `/section/{id}/evaluation` | evaluation attached to the section     |
//! | GET     | `/professor`               | filter by query params, `offset` pages |
//! | GET     | `/professor/all`           | every professor                        |
//! | GET     | `/professor/{id}`          |                                        |
//! | GET     | `/autocomplete/dag`        | subject → course → session → section   |
//! | OPTIONS | any                        | CORS preflight, answered by the layer  |
//!
//! Every response is wrapped in `{status, message, data}`, see [`responses`].
//!
//!
//!
//! # Configuration
//!
//! Read from the environment, with a `.env` file loaded first when present.
//!
//! - `PORT`: listen port, default 8080
//! - `MONGODB_URI`: required, falls back to `/run/secrets/MONGODB_URI`
//! - `MONGODB_DATABASE`: default `combinedDB`
//! - `LIMIT`: page size for search endpoints, default 20
//! - `REQUEST_TIMEOUT_SECS`: per store call, default 30
//! - `RUST_LOG`: tracing filter, e.g. `course_api=debug`
//!
//!
//!
//! # Notes
//!
//! ## Autocomplete
//! The source data is relational in shape: courses point at sections by id and
//! sections point at professors by id. MongoDB does the two joins, the API does
//! the regrouping. Grouping in process keeps the pipeline to the parts MongoDB
//! is good at and lets the tree logic be tested without a database.
//!
//! ## Store handle
//! There is no global client. `main` builds one [`database::MongoStore`],
//! wraps it in [`state::State`] and hands it to the router. Tests swap in
//! their own [`database::DocumentStore`].
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run locally.
//! ```sh
//! MONGODB_URI=mongodb://localhost:27017 RUST_LOG=course_api=debug cargo run
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::Request,
    http::{
        HeaderName, Method,
        header::{ACCEPT, HOST},
    },
    middleware::{self, Next},
    response::Response,
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod autocomplete;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod responses;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    autocomplete_dag, course_all, course_by_id, course_search, professor_all,
    professor_by_id, professor_search, section_by_id, section_evaluation, section_search,
};
use state::State;

pub async fn start_server() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Connecting to MongoDB...");
    let state = State::new(config).await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

pub fn build_router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, HeaderName::from_static("x-api-key")])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/course", get(course_search))
        .route("/course/all", get(course_all))
        .route("/course/{id}", get(course_by_id))
        .route("/section", get(section_search))
        .route("/section/{id}", get(section_by_id))
        .route("/section/{id}/evaluation", get(section_evaluation))
        .route("/professor", get(professor_search))
        .route("/professor/all", get(professor_all))
        .route("/professor/{id}", get(professor_by_id))
        .route("/autocomplete/dag", get(autocomplete_dag))
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    info!(
        method = %request.method(),
        path = request.uri().path(),
        host = %host,
        "Request"
    );

    next.run(request).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
