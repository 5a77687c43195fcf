//! HTTP query server
//!
//! Serves the stats service read accessor over HTTP:
//!
//! - `GET /` GraphiQL exploration page
//! - `GET|POST /query` GraphQL endpoint (`networkInterfaces(name)`, `sampledAt`)
//! - `GET /health` liveness and refresh-thread status

pub mod api;
pub mod state;

use async_graphql::http::GraphiQLSource;
use axum::{response::Html, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::error::{Error, Result};
use crate::service::StatsService;
use state::AppState;

/// Bind the query listener
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| Error::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Serve queries on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, stats: Arc<StatsService>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(AppState::new(stats));

    log::info!("Query endpoint on http://{}/query", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(playground))
        .route("/query", get(api::graphql_handler).post(api::graphql_handler))
        .route("/health", get(api::health_check))
        .with_state(state)
}

/// GraphiQL page pointed at `/query`
async fn playground() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/query").finish())
}
