//! Peer-to-peer networking
//!
//! JSON messages streamed over TCP, one thread per connection. The node side
//! lives in `server`, the one-shot light client in `client`.

pub mod client;
pub mod discovery;
pub mod message;
pub mod peers;
pub mod server;

pub use client::Client;
pub use discovery::{PeerDiscovery, DEFAULT_PORT};
pub use message::Message;
pub use peers::Peers;
pub use server::Server;
