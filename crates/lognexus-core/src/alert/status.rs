use serde::{Deserialize, Serialize};

/// Lifecycle status of an alert instance.
///
/// `New → Acknowledged → Resolved`, or `New | Acknowledged → Suppressed`.
/// `Resolved` and `Suppressed` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceStatus {
    New,
    Acknowledged,
    Resolved,
    Suppressed,
}

impl InstanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Suppressed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Acknowledged => "Acknowledged",
            Self::Resolved => "Resolved",
            Self::Suppressed => "Suppressed",
        }
    }
}
