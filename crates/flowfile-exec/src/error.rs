use flowfile_settings::FlowId;
use thiserror::Error;

/// Fatal to the triggering `run()` call itself, as opposed to a per-node
/// failure, which is recorded on the `RunInformation` instead of raised
/// here — a run always produces a `RunInformation`, never a silent
/// failure or a propagated exception. A node missing a required input is
/// not represented here: it is recorded as a skipped `NodeResult` on the
/// `RunInformation` instead, per the "filter node without input" behavior.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("flow {0} is already running")]
    AlreadyRunning(FlowId),
}
