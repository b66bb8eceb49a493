use crate::LoadTicket;

/// Load-contract violations reported by [`crate::LoadOrchestrator::complete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("no load request is in flight")]
    NotLoading,
    #[error("completion for {ticket:?} does not match the in-flight request {current:?}")]
    StaleTicket {
        ticket: LoadTicket,
        current: LoadTicket,
    },
    #[error("the orchestrator has been torn down")]
    TornDown,
}
