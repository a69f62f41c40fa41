//! Trust Ledger Node
//!
//! Hosts the trust registry and the governance ledger behind one
//! sequential service queue, and bridges domain challenges to HTTP.

pub mod config;
pub mod errors;
pub mod oracle;
pub mod service;

pub use config::{NodeConfig, OracleSection, TokenSection};
pub use errors::{NodeError, NodeResult};
pub use oracle::{spawn_oracle_bridge, ChannelOracle, Fetcher, HttpFetcher};
pub use service::{LedgerService, Node, Reply, Request, Response, ServiceHandle, ServiceMessage};
