//! Endpoint lifecycle operations: thin request/response mapping over the
//! agent runtime control plane. Service errors become one-line diagnostics
//! and a non-zero exit; nothing is retried here.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use aws_config::Region;
use aws_sdk_bedrockagentcorecontrol::Client;
use console::style;

/// Build a control-plane client for the given region.
pub async fn client(region: &str) -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;
    Client::new(&config)
}

/// Parse repeatable KEY=VALUE pairs into a tag map.
pub fn parse_tags(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut tags = HashMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid tag format '{}'. Use KEY=VALUE", pair))?;
        tags.insert(key.to_string(), value.to_string());
    }
    Ok(tags)
}

pub async fn create(
    client: &Client,
    agent_runtime_id: &str,
    name: &str,
    version: Option<&str>,
    description: Option<&str>,
    tag_pairs: &[String],
) -> Result<()> {
    let tags = parse_tags(tag_pairs)?;

    println!("Creating endpoint '{}'...", name);
    match version {
        Some(version) => println!("  Target Version: {}", version),
        None => println!("  Target Version: Latest"),
    }

    let mut request = client
        .create_agent_runtime_endpoint()
        .agent_runtime_id(agent_runtime_id)
        .name(name);
    if let Some(version) = version {
        request = request.agent_runtime_version(version);
    }
    if let Some(description) = description {
        request = request.description(description);
    }
    for (key, value) in tags {
        request = request.tags(key, value);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            let err = err.into_service_error();
            if err.is_conflict_exception() {
                bail!("Endpoint '{}' already exists", name);
            }
            if err.is_resource_not_found_exception() {
                bail!("Agent runtime not found");
            }
            if err.is_validation_exception() {
                bail!("Validation error: {}", err);
            }
            bail!(err);
        }
    };

    println!("\n{} Endpoint created successfully!", style("✓").green());
    println!("  Endpoint Name: {}", name);
    println!("  Status: {}", response.status().as_str());
    println!(
        "  Target Version: {}",
        response.target_version()
    );
    println!("  Endpoint ARN: {}", response.agent_runtime_endpoint_arn());
    println!("  Created At: {}", response.created_at());
    Ok(())
}

pub async fn update(
    client: &Client,
    agent_runtime_id: &str,
    endpoint_name: &str,
    version: &str,
) -> Result<()> {
    println!(
        "Updating endpoint '{}' to version {}...",
        endpoint_name, version
    );

    let response = match client
        .update_agent_runtime_endpoint()
        .agent_runtime_id(agent_runtime_id)
        .endpoint_name(endpoint_name)
        .agent_runtime_version(version)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            let err = err.into_service_error();
            if err.is_resource_not_found_exception() {
                bail!("Agent runtime or endpoint not found");
            }
            if err.is_validation_exception() {
                bail!("Validation error: {}", err);
            }
            bail!(err);
        }
    };

    println!(
        "\n{} Endpoint update initiated successfully!",
        style("✓").green()
    );
    println!("  Status: {}", response.status().as_str());
    println!(
        "  Live Version: {}",
        response.live_version().unwrap_or("N/A")
    );
    println!(
        "  Target Version: {}",
        response.target_version().unwrap_or("N/A")
    );
    println!("  Last Updated: {}", response.last_updated_at());
    Ok(())
}

pub async fn get(client: &Client, agent_runtime_id: &str, endpoint_name: &str) -> Result<()> {
    let response = match client
        .get_agent_runtime_endpoint()
        .agent_runtime_id(agent_runtime_id)
        .endpoint_name(endpoint_name)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            let err = err.into_service_error();
            if err.is_resource_not_found_exception() {
                bail!("Endpoint not found");
            }
            bail!(err);
        }
    };

    println!("\nEndpoint Details:");
    println!("{}", "-".repeat(80));
    println!("  Name: {}", response.name());
    println!("  Status: {}", response.status().as_str());
    println!(
        "  Live Version: {}",
        response.live_version().unwrap_or("N/A")
    );
    println!(
        "  Target Version: {}",
        response.target_version().unwrap_or("N/A")
    );
    println!(
        "  Description: {}",
        response.description().unwrap_or("N/A")
    );
    println!("  Created At: {}", response.created_at());
    println!("  Last Updated: {}", response.last_updated_at());
    println!(
        "  Endpoint ARN: {}",
        response.agent_runtime_endpoint_arn()
    );
    println!("{}", "-".repeat(80));
    Ok(())
}

pub async fn list(client: &Client, agent_runtime_id: &str) -> Result<()> {
    let response = match client
        .list_agent_runtime_endpoints()
        .agent_runtime_id(agent_runtime_id)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => bail!("Error listing endpoints: {}", err.into_service_error()),
    };

    let endpoints = response.runtime_endpoints();
    if endpoints.is_empty() {
        // An empty listing is success, not failure
        println!("\nNo endpoints found for {}", agent_runtime_id);
        return Ok(());
    }

    println!("\nEndpoints for {}:", agent_runtime_id);
    println!("{}", "=".repeat(80));
    for endpoint in endpoints {
        println!("  Name: {}", endpoint.name());
        println!("  Status: {}", endpoint.status().as_str());
        println!(
            "  Live Version: {}",
            endpoint.live_version().unwrap_or("N/A")
        );
        println!(
            "  Target Version: {}",
            endpoint.target_version().unwrap_or("N/A")
        );
        if let Some(description) = endpoint.description() {
            println!("  Description: {}", description);
        }
        println!("{}", "-".repeat(80));
    }
    Ok(())
}

pub async fn delete(client: &Client, agent_runtime_id: &str, endpoint_name: &str) -> Result<()> {
    println!("Deleting endpoint '{}'...", endpoint_name);

    let response = match client
        .delete_agent_runtime_endpoint()
        .agent_runtime_id(agent_runtime_id)
        .endpoint_name(endpoint_name)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            let err = err.into_service_error();
            if err.is_resource_not_found_exception() {
                bail!("Endpoint not found");
            }
            bail!(err);
        }
    };

    println!("{} Endpoint deletion initiated", style("✓").green());
    println!("  Status: {}", response.status().as_str());
    Ok(())
}
