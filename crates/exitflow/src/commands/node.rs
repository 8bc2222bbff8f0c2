//! Exit-node commands — thin calls to the deployed control API

use colored::Colorize;

use exitflow_core::region;

use crate::client::{ApiClient, StartOutcome};

pub async fn start(region: &str) -> anyhow::Result<()> {
    let region = exitflow_core::Region::from_friendly(region)?;
    let client = ApiClient::from_env()?;

    match client.start(region.friendly_name()).await? {
        StartOutcome::AlreadyRunning(message) => {
            println!("{} {message}", "ℹ".cyan());
        }
        StartOutcome::Started(response) => {
            println!("{} {}", "✓".green(), response.message);
            if let Some(node) = response.node {
                println!("Instance ID: {}", node.instance_id);
                println!("Instance Type: {}", node.instance_type);
                if let Some(hostname) = &node.tailscale_hostname {
                    println!("Tailscale Hostname: {hostname}");
                }
                println!("State: {}", node.state);
                println!();
                println!(
                    "{}",
                    "Note: it may take 1-2 minutes for the exit node to appear in Tailscale."
                        .dimmed()
                );
            }
        }
    }

    Ok(())
}

pub async fn stop(region: &str) -> anyhow::Result<()> {
    let region = exitflow_core::Region::from_friendly(region)?;
    let client = ApiClient::from_env()?;

    let response = client.stop(region.friendly_name()).await?;
    println!("{} {}", "✓".green(), response.message);
    if response.terminated_count > 0 {
        println!("Terminated instances: {:?}", response.terminated_ids);
    }

    Ok(())
}

pub async fn instances(region: &str) -> anyhow::Result<()> {
    let region = exitflow_core::Region::from_friendly(region)?;
    let client = ApiClient::from_env()?;

    let response = client.instances(region.friendly_name()).await?;
    println!(
        "Instances in {} region: {}",
        region.friendly_name().cyan(),
        response.count
    );

    if response.count == 0 {
        println!("{}", "No instances found.".dimmed());
        return Ok(());
    }

    println!();
    for node in &response.nodes {
        println!("Instance ID: {}", node.instance_id);
        println!("  State: {}", node.state);
        println!("  Type: {}", node.instance_type);
        println!("  Launch Time: {}", node.launch_time.to_rfc3339());
        if let Some(ip) = &node.public_ip {
            println!("  Public IP: {ip}");
        }
        if let Some(hostname) = &node.tailscale_hostname {
            println!("  Tailscale Hostname: {hostname}");
        }
        println!();
    }

    Ok(())
}

pub async fn cleanup(region: &str) -> anyhow::Result<()> {
    let region = exitflow_core::Region::from_friendly(region)?;
    let client = ApiClient::from_env()?;

    let response = client.cleanup(region.friendly_name()).await?;
    println!("{} {}", "✓".green(), response.message);
    if response.terminated_count > 0 {
        println!("Cleaned up resources: {:?}", response.terminated_ids);
    } else {
        println!("{}", "No orphaned resources found.".dimmed());
    }

    Ok(())
}

/// Stop exit nodes in every region, tolerating per-region failures.
pub async fn shutdown() -> anyhow::Result<()> {
    let client = ApiClient::from_env()?;

    println!("Stopping exit nodes in all regions...");
    println!();

    let mut total_terminated = 0;
    let mut regions_with_nodes = 0;

    for region in region::all_friendly_names() {
        let response = match client.stop(region).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(region, error = %err, "stop failed, skipping region");
                continue;
            }
        };

        if response.terminated_count > 0 {
            println!(
                "{} {}: terminated {} instance(s)",
                "✓".green(),
                region,
                response.terminated_count
            );
            total_terminated += response.terminated_count;
            regions_with_nodes += 1;
        }
    }

    println!();
    if total_terminated == 0 {
        println!("No running exit nodes found in any region.");
    } else {
        println!(
            "{} Shutdown complete: terminated {} instance(s) across {} region(s)",
            "✓".green(),
            total_terminated,
            regions_with_nodes
        );
    }

    Ok(())
}

pub async fn health() -> anyhow::Result<()> {
    let client = ApiClient::from_env()?;
    let health = client.health().await?;

    println!("Status: {}", health.status.green());
    println!("Version: {}", health.version);
    println!("Timestamp: {}", health.timestamp);

    Ok(())
}
