//! Transport interface used by the request pipeline.
use async_trait::async_trait;

use crate::error::ClientError;
use crate::request::{RawResponse, RequestDescriptor};

/// Sends one already-authorized request.
///
/// Any status is returned as `Ok`; judging success is the pipeline's job.
/// `Err` is reserved for requests that never produced a response (connect
/// failure, timeout, unencodable body) and must carry the request.
///
/// Implementations must be cheap to clone (typically `Arc<...>` inside).
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    // Returns the transport backend name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, ClientError>;
}
