// Prober seam: each upstream source reports either a usable status or
// an explicit no-result. Probers apply their own timeout and never
// return an error to the caller.

pub mod api;
pub mod console;
pub mod ping;

use async_trait::async_trait;

use crate::status::ServerStatus;

/// Outcome of a single prober attempt.
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// A status worth short-circuiting on.
    Usable(ServerStatus),
    /// No usable signal. The reason is for logs and diagnostics only,
    /// never shown to end users.
    Unusable(String),
}

impl ProbeOutcome {
    pub fn unusable(reason: impl Into<String>) -> Self {
        ProbeOutcome::Unusable(reason.into())
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, ProbeOutcome::Usable(_))
    }
}

/// One upstream source of server status.
///
/// Contract: best effort, never fails. Timeouts, connection errors, and
/// malformed responses are folded into [`ProbeOutcome::Unusable`] with a
/// diagnostic reason.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Query the upstream source once.
    async fn probe(&self) -> ProbeOutcome;
}
