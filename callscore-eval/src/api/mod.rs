//! HTTP API handlers for callscore-eval

pub mod evaluation;
pub mod health;
pub mod personas;

pub use evaluation::evaluation_routes;
pub use health::health_routes;
pub use personas::persona_routes;

use crate::ApiResult;

/// Run store work on the blocking pool
pub(crate) async fn run_blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> callscore_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}
