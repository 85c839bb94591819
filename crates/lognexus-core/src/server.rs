use serde::{Deserialize, Serialize};

/// Server status as computed by the data store from heartbeat age.
/// The engine only reads it; the agent heartbeat pipeline is elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Unknown,
    Online,
    Offline,
    Maintenance,
}
