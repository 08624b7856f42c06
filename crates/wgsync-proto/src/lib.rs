//! Shared data model for wgsync
//!
//! This crate defines the peer records exchanged between the directory and
//! the reconciler, the parser for the tunnel's fixed-column status dump, the
//! liveness rule applied to handshake timestamps, and the JSON types served
//! by the directory API.

pub mod api;
pub mod dump;
pub mod liveness;
pub mod peer;

pub use api::{ApiPeer, ErrorResponse, HealthResponse, PeersResponse, PEERS_PATH};
pub use dump::{format_peer_line, parse_dump, parse_peer_line, MIN_PEER_FIELDS};
pub use liveness::is_online;
pub use peer::{PeerRecord, PeerSet};
