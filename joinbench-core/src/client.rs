//! Store client seam
//!
//! The harness never talks to a cluster directly. It goes through a
//! [`Connector`] that hands out one [`StoreClient`] per endpoint. Dropping the
//! client releases the connection.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Stable identifier of a cluster member
pub type MemberId = u64;

/// Reported leader id meaning "no leader known"
pub const NO_LEADER: MemberId = 0;

/// Answer of a status query on one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberStatus {
    /// Leader as seen by this endpoint ([`NO_LEADER`] if unknown)
    pub leader_id: MemberId,
    /// Member id of the endpoint itself
    pub member_id: MemberId,
}

impl MemberStatus {
    /// Whether the endpoint reports itself as the leader
    pub fn is_leader(&self) -> bool {
        self.leader_id != NO_LEADER && self.leader_id == self.member_id
    }
}

/// Errors raised by a store client
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Opens connections to cluster endpoints
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn StoreClient>, ClientError>;
}

/// Operations the harness needs from the distributed store
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Endpoint this client is bound to
    fn endpoint(&self) -> &str;

    async fn status(&self) -> Result<MemberStatus, ClientError>;

    async fn write(&self, key: &str, value: &str, timeout: Duration) -> Result<(), ClientError>;

    /// Read a key; `Ok(None)` when the key does not exist
    async fn read(&self, key: &str, timeout: Duration) -> Result<Option<Vec<u8>>, ClientError>;

    /// Add voting members to the cluster this endpoint leads
    async fn reconfigure(
        &self,
        add_members: &[MemberId],
        timeout: Duration,
    ) -> Result<(), ClientError>;
}
