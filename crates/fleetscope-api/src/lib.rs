// fleetscope-api: async HTTP clients for the cluster ownership and
// group-membership backends.

pub mod access;
pub mod client;
pub mod error;
pub mod groups;
pub mod transport;

pub use access::ClusterOwners;
pub use client::BackendClient;
pub use error::Error;
pub use transport::TransportConfig;
