use anyhow::{Context, Result};
use std::path::Path;

use joinbench_core::http::HttpConnector;
use joinbench_core::topology;

use super::{init_logging, load_config, ClusterArgs};

/// Print every cluster with its members and mark the leader.
pub async fn run(config_path: Option<&Path>, args: ClusterArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);
    init_logging(&config.logging);
    config.validate().context("Invalid configuration")?;

    let connector = HttpConnector::new(config.client.clone());
    let topology = topology::discover(&connector, &config.clusters)
        .await
        .context("Discovery failed")?;

    println!(
        "{} clusters, {} endpoints, leader {} at {}\n",
        topology.clusters.len(),
        topology.endpoint_count(),
        topology.leader_id,
        topology.leader_endpoint
    );
    for (idx, cluster) in topology.clusters.iter().enumerate() {
        let role = if idx == topology.leader_cluster { "leader cluster" } else { "secondary" };
        println!("Cluster {} ({})", idx, role);
        for endpoint in &cluster.endpoints {
            let marker = if endpoint.member_id == topology.leader_id { " *" } else { "" };
            println!("   {:<32} member {}{}", endpoint.endpoint, endpoint.member_id, marker);
        }
    }
    println!("\nMembers to add: {:?}", topology.members_to_add());

    Ok(())
}
