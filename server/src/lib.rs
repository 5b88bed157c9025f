//! Library half of the `cellar-server` crate: everything `main.rs` wires
//! together, exposed so the integration tests can build a real `Router`
//! against an in-memory database without binding a socket.

pub mod config;
pub mod http;
pub mod state;
