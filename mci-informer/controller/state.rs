use std::fmt::Display;

/// Lifecycle of the [`MultiClusterInformer`](crate::MultiClusterInformer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformerState {
    Constructed,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl InformerState {
    /// Returns `true` if the informer is stopping or already stopped.
    pub fn is_stopped(self) -> bool {
        matches!(self, InformerState::Stopping | InformerState::Stopped)
    }
}

impl Display for InformerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InformerState::Constructed => "constructed",
            InformerState::Starting => "starting",
            InformerState::Running => "running",
            InformerState::Stopping => "stopping",
            InformerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

impl From<u8> for InformerState {
    fn from(value: u8) -> Self {
        match value {
            0 => InformerState::Constructed,
            1 => InformerState::Starting,
            2 => InformerState::Running,
            3 => InformerState::Stopping,
            _ => InformerState::Stopped,
        }
    }
}

impl From<InformerState> for u8 {
    fn from(value: InformerState) -> Self {
        match value {
            InformerState::Constructed => 0,
            InformerState::Starting => 1,
            InformerState::Running => 2,
            InformerState::Stopping => 3,
            InformerState::Stopped => 4,
        }
    }
}
