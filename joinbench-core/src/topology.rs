//! Topology discovery
//!
//! Every endpoint is probed once, strictly one after the other: connect, ask
//! for status, drop the connection. The scan must agree on a single leader,
//! otherwise the run is aborted before any load is generated.

use log::info;
use std::collections::BTreeSet;

use crate::client::{Connector, MemberId, NO_LEADER};
use crate::{BenchError, Result};

/// One probed endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub endpoint: String,
    pub member_id: MemberId,
}

/// One cluster as seen at discovery time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Endpoints in configuration order
    pub endpoints: Vec<EndpointInfo>,
    /// Authoritative member set used to attribute future leaders
    pub members: BTreeSet<MemberId>,
}

impl ClusterInfo {
    pub fn contains(&self, member_id: MemberId) -> bool {
        self.members.contains(&member_id)
    }
}

/// Result of a successful discovery. Read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTopology {
    pub clusters: Vec<ClusterInfo>,
    pub leader_id: MemberId,
    pub leader_endpoint: String,
    /// Index of the cluster owning the leader
    pub leader_cluster: usize,
}

impl ClusterTopology {
    /// Clusters that do not own the leader, with their index
    pub fn secondary_clusters(&self) -> impl Iterator<Item = (usize, &ClusterInfo)> {
        let leader_cluster = self.leader_cluster;
        self.clusters.iter().enumerate().filter(move |(idx, _)| *idx != leader_cluster)
    }

    /// Member ids passed to the reconfiguration: every secondary member, in topology order
    pub fn members_to_add(&self) -> Vec<MemberId> {
        self.secondary_clusters()
            .flat_map(|(_, cluster)| cluster.endpoints.iter().map(|ep| ep.member_id))
            .collect()
    }

    pub fn endpoint_count(&self) -> usize {
        self.clusters.iter().map(|c| c.endpoints.len()).sum()
    }
}

/// Probe every endpoint and agree on the current leader.
///
/// A zero leader id means the endpoint does not know a leader yet and does
/// not conflict with others.
pub async fn discover(connector: &dyn Connector, clusters: &[Vec<String>]) -> Result<ClusterTopology> {
    if clusters.is_empty() {
        return Err(BenchError::EmptyTopology);
    }

    let mut infos = Vec::with_capacity(clusters.len());
    let mut leader_id = NO_LEADER;
    let mut leader: Option<(usize, String)> = None;

    for (idx, endpoints) in clusters.iter().enumerate() {
        if endpoints.is_empty() {
            return Err(BenchError::EmptyCluster(idx));
        }

        let mut info = ClusterInfo {
            endpoints: Vec::with_capacity(endpoints.len()),
            members: BTreeSet::new(),
        };

        for endpoint in endpoints {
            let status = {
                let client = connector.connect(endpoint).await.map_err(|source| {
                    BenchError::Connect { endpoint: endpoint.clone(), source }
                })?;
                client.status().await.map_err(|source| BenchError::Status {
                    endpoint: endpoint.clone(),
                    source,
                })?
            };

            if status.leader_id != NO_LEADER {
                if leader_id != NO_LEADER && leader_id != status.leader_id {
                    return Err(BenchError::LeaderConflict {
                        first: leader_id,
                        second: status.leader_id,
                        endpoint: endpoint.clone(),
                    });
                }
                leader_id = status.leader_id;
            }
            if status.is_leader() {
                leader = Some((idx, endpoint.clone()));
            }

            info.members.insert(status.member_id);
            info.endpoints.push(EndpointInfo { endpoint: endpoint.clone(), member_id: status.member_id });
        }

        infos.push(info);
    }

    let (leader_cluster, leader_endpoint) = leader.ok_or(BenchError::LeaderNotFound)?;
    info!("found leader {} at endpoint {}", leader_id, leader_endpoint);

    Ok(ClusterTopology { clusters: infos, leader_id, leader_endpoint, leader_cluster })
}
