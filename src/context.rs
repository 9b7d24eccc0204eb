//! Correlation id scope for outbound calls.
//!
//! The host application generates the id (usually from the inbound
//! `x-request-id` header) and runs the rate query inside
//! [`with_request_id`]. Every upstream attempt made within that scope
//! carries the same id.

use std::future::Future;

/// Header used to propagate the correlation id upstream.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Run `fut` with `id` as the ambient correlation id.
pub async fn with_request_id<F>(id: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_ID.scope(id.into(), fut).await
}

/// Correlation id of the current task, if one was set.
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}
