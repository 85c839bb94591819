//! SQLite adapters implementing the outbound ports of `lognexus-ports`.

pub mod persistence;
