//! Boundary traits between the engine and its collaborators: the data
//! store, the notification channels, and the API/scheduler layer above.

pub mod error;
pub mod inbound;
pub mod outbound;
pub mod types;
