//! Pipeline context threaded through every stage

use gauntlet_core::Platform;
use gauntlet_core::gate::GatePolicy;
use gauntlet_core::wait::WaitOptions;

/// Everything a stage needs besides its own arguments
pub struct PipelineContext {
    pub platform: Box<dyn Platform>,
    pub experiment: String,
    /// Polling behaviour for long-running platform operations
    pub wait: WaitOptions,
    pub policy: GatePolicy,
}

impl PipelineContext {
    pub fn new(platform: Box<dyn Platform>, experiment: impl Into<String>) -> Self {
        Self {
            platform,
            experiment: experiment.into(),
            wait: WaitOptions::default(),
            policy: GatePolicy::default(),
        }
    }

    /// Same context with a different polling behaviour
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }
}
