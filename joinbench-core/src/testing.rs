//! In-memory cluster double for tests
//!
//! Endpoint `fake://c{c}-n{n}` has member id `(c + 1) * 100 + n + 1`. Every
//! node starts out reporting the configured leader. Writes take 1ms of
//! (tokio) time so paused-clock tests advance naturally.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::{ClientError, Connector, MemberId, MemberStatus, StoreClient};
use crate::report::MEASUREMENT_KEY;

const WRITE_LATENCY: Duration = Duration::from_millis(1);
const RECONFIGURE_LATENCY: Duration = Duration::from_millis(5);

#[derive(Default)]
struct FakeNode {
    member_id: MemberId,
    leader_id: MemberId,
    refuse_connections: bool,
    failing_writes: usize,
    failing_statuses: usize,
    writes: usize,
    status_calls: usize,
    kv: HashMap<String, String>,
}

#[derive(Default)]
struct FakeState {
    layout: Vec<Vec<String>>,
    nodes: HashMap<String, FakeNode>,
    elections: Vec<(usize, MemberId)>,
    reconfigure_error: Option<ClientError>,
    hang_reconfigure: bool,
    reconfigure_calls: Vec<Vec<MemberId>>,
    measurement: Option<Vec<u8>>,
    live_connections: usize,
    max_live_connections: usize,
}

#[derive(Clone)]
pub(crate) struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    /// Clusters of the given sizes; `leader` is `(cluster, node)`
    pub fn new(sizes: &[usize], leader: (usize, usize)) -> Self {
        let leader_id = member_id_of(leader.0, leader.1);
        let mut state = FakeState::default();

        for (c, &size) in sizes.iter().enumerate() {
            let mut endpoints = Vec::with_capacity(size);
            for n in 0..size {
                let endpoint = endpoint_of(c, n);
                state.nodes.insert(
                    endpoint.clone(),
                    FakeNode { member_id: member_id_of(c, n), leader_id, ..Default::default() },
                );
                endpoints.push(endpoint);
            }
            state.layout.push(endpoints);
        }

        Self { state: Arc::new(Mutex::new(state)) }
    }

    pub fn endpoints(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().layout.clone()
    }

    pub fn endpoint(&self, cluster: usize, node: usize) -> String {
        endpoint_of(cluster, node)
    }

    pub fn member_id(&self, cluster: usize, node: usize) -> MemberId {
        member_id_of(cluster, node)
    }

    pub fn members(&self, cluster: usize) -> Vec<MemberId> {
        let state = self.state.lock().unwrap();
        state.layout[cluster].iter().map(|ep| state.nodes[ep].member_id).collect()
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }

    /// A connected client, bypassing failure scripting
    pub fn client(&self, endpoint: &str) -> Arc<dyn StoreClient> {
        self.open(endpoint)
    }

    /// After a successful reconfiguration every node of `cluster` reports `node` as leader
    pub fn elect_on_reconfigure(&self, cluster: usize, node: usize) {
        self.state.lock().unwrap().elections.push((cluster, member_id_of(cluster, node)));
    }

    pub fn set_leader(&self, endpoint: &str, leader_id: MemberId) {
        self.with_node(endpoint, |node| node.leader_id = leader_id);
    }

    pub fn fail_next_writes(&self, endpoint: &str, count: usize) {
        self.with_node(endpoint, |node| node.failing_writes = count);
    }

    pub fn fail_next_statuses(&self, endpoint: &str, count: usize) {
        self.with_node(endpoint, |node| node.failing_statuses = count);
    }

    pub fn refuse_connections(&self, endpoint: &str) {
        self.with_node(endpoint, |node| node.refuse_connections = true);
    }

    pub fn fail_reconfigure(&self, error: ClientError) {
        self.state.lock().unwrap().reconfigure_error = Some(error);
    }

    /// Reconfiguration calls never return
    pub fn hang_reconfigure(&self) {
        self.state.lock().unwrap().hang_reconfigure = true;
    }

    pub fn set_measurement(&self, raw: &[u8]) {
        self.state.lock().unwrap().measurement = Some(raw.to_vec());
    }

    pub fn writes_to(&self, endpoint: &str) -> usize {
        self.with_node(endpoint, |node| node.writes)
    }

    pub fn total_writes(&self) -> usize {
        self.state.lock().unwrap().nodes.values().map(|node| node.writes).sum()
    }

    pub fn status_calls(&self, endpoint: &str) -> usize {
        self.with_node(endpoint, |node| node.status_calls)
    }

    pub fn reconfigure_calls(&self) -> Vec<Vec<MemberId>> {
        self.state.lock().unwrap().reconfigure_calls.clone()
    }

    pub fn live_connections(&self) -> usize {
        self.state.lock().unwrap().live_connections
    }

    pub fn max_live_connections(&self) -> usize {
        self.state.lock().unwrap().max_live_connections
    }

    fn with_node<R>(&self, endpoint: &str, f: impl FnOnce(&mut FakeNode) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        let node = state.nodes.get_mut(endpoint).expect("unknown fake endpoint");
        f(node)
    }

    fn open(&self, endpoint: &str) -> Arc<dyn StoreClient> {
        let mut state = self.state.lock().unwrap();
        state.live_connections += 1;
        state.max_live_connections = state.max_live_connections.max(state.live_connections);
        Arc::new(FakeClient { endpoint: endpoint.to_string(), state: self.state.clone() })
    }
}

#[async_trait]
impl Connector for FakeCluster {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn StoreClient>, ClientError> {
        let refused = {
            let state = self.state.lock().unwrap();
            match state.nodes.get(endpoint) {
                Some(node) => node.refuse_connections,
                None => return Err(ClientError::InvalidEndpoint(endpoint.to_string())),
            }
        };
        if refused {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        Ok(self.open(endpoint))
    }
}

struct FakeClient {
    endpoint: String,
    state: Arc<Mutex<FakeState>>,
}

impl Drop for FakeClient {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.live_connections -= 1;
        }
    }
}

#[async_trait]
impl StoreClient for FakeClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn status(&self) -> Result<MemberStatus, ClientError> {
        let mut state = self.state.lock().unwrap();
        let node = state.nodes.get_mut(&self.endpoint).expect("unknown fake endpoint");
        node.status_calls += 1;
        if node.failing_statuses > 0 {
            node.failing_statuses -= 1;
            return Err(ClientError::Transport("status unavailable".to_string()));
        }
        Ok(MemberStatus { leader_id: node.leader_id, member_id: node.member_id })
    }

    async fn write(&self, key: &str, value: &str, _timeout: Duration) -> Result<(), ClientError> {
        tokio::time::sleep(WRITE_LATENCY).await;

        let mut state = self.state.lock().unwrap();
        let node = state.nodes.get_mut(&self.endpoint).expect("unknown fake endpoint");
        if node.failing_writes > 0 {
            node.failing_writes -= 1;
            return Err(ClientError::Timeout);
        }
        node.writes += 1;
        node.kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn read(&self, key: &str, _timeout: Duration) -> Result<Option<Vec<u8>>, ClientError> {
        let state = self.state.lock().unwrap();
        if key == MEASUREMENT_KEY {
            return Ok(state.measurement.clone());
        }
        Ok(state.nodes[&self.endpoint].kv.get(key).map(|v| v.as_bytes().to_vec()))
    }

    async fn reconfigure(
        &self,
        add_members: &[MemberId],
        _timeout: Duration,
    ) -> Result<(), ClientError> {
        tokio::time::sleep(RECONFIGURE_LATENCY).await;

        let hang = {
            let mut state = self.state.lock().unwrap();
            state.reconfigure_calls.push(add_members.to_vec());
            state.hang_reconfigure
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.reconfigure_error.clone() {
            return Err(error);
        }

        let elections = state.elections.clone();
        for (cluster, leader_id) in elections {
            let endpoints = state.layout[cluster].clone();
            for endpoint in endpoints {
                if let Some(node) = state.nodes.get_mut(&endpoint) {
                    node.leader_id = leader_id;
                }
            }
        }
        Ok(())
    }
}

fn endpoint_of(cluster: usize, node: usize) -> String {
    format!("fake://c{}-n{}", cluster, node)
}

fn member_id_of(cluster: usize, node: usize) -> MemberId {
    ((cluster + 1) * 100 + node + 1) as MemberId
}
