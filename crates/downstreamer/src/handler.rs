use crate::context::QueryContext;
use async_trait::async_trait;
use downstreamer_core::{
    Result,
    model::{DownstreamRequest, DownstreamResponse},
};

/// The backend that executes one translated request.
///
/// Implementations must observe cancellation of `ctx` and return promptly
/// once it is cancelled; the dispatcher relies on this to wind down in-flight
/// work after a failure.
#[async_trait]
pub trait Handler: Send + Sync {
    /// # Errors
    ///
    /// Transport or decoding failures should be wrapped with
    /// [`Error::handler`](downstreamer_core::Error::handler) so they reach the
    /// caller verbatim.
    async fn execute(
        &self,
        ctx: &QueryContext,
        req: DownstreamRequest,
    ) -> Result<DownstreamResponse>;

    /// Identifies the handler in logs.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

