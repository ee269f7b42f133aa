//! Shared building blocks of the impostor party game: the JSON wire
//! protocol, the pure game rules, emergency-meeting voting, and a client
//! transport for talking to the server.

pub mod meeting;
pub mod protocol;
pub mod rules;
pub mod transport;

#[cfg(feature = "native")]
pub mod ws_transport;
