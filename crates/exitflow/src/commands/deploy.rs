//! `exitflow deploy` — converge the control plane

use colored::Colorize;

use exitflow_cloud::{ENV_AUTH_TOKEN, ENV_TAILSCALE_AUTH_KEY, RetryPolicy, SetupOptions, run_setup};
use exitflow_cloud_aws::AwsControlPlane;
use exitflow_core::Region;

use crate::package;
use crate::ui::CliProgress;

pub async fn handle(region: &str) -> anyhow::Result<()> {
    let region = Region::from_friendly(region)?;

    println!("{}", "Deploying ExitFlow infrastructure".bold());
    println!("{} {}", "Region:".bold(), region.friendly_name().cyan());
    println!();

    let provider = AwsControlPlane::new(region.aws_code()).await;
    let options = SetupOptions {
        tailscale_auth_key: std::env::var(ENV_TAILSCALE_AUTH_KEY).ok(),
        auth_token: std::env::var(ENV_AUTH_TOKEN).ok(),
        retry: RetryPolicy::default(),
    };

    let progress = CliProgress::new();
    let outcome = run_setup(&provider, options, package::build_agent_archive, &progress).await?;

    println!();
    println!("{}", "✓ Infrastructure deployment complete".green().bold());
    println!();
    println!("{}", "Deployment Summary".bold());
    println!("{}", "------------------".dimmed());

    let state = &outcome.state;
    if let Some(url) = &state.function_url {
        println!("{} {}", "Function URL:".bold(), url.cyan());
    }
    if let Some(role) = &state.role {
        println!("{} {}", "Role ARN:".bold(), role.arn.dimmed());
    }
    if let Some(function) = &state.function {
        println!("{} {}", "Function ARN:".bold(), function.arn.dimmed());
    }

    println!();
    if outcome.was_generated {
        println!("{}", "⚠ IMPORTANT: new auth token generated!".yellow().bold());
        println!("{}", "Save this token — you won't see it again:".yellow());
        println!("  export {ENV_AUTH_TOKEN}={}", outcome.auth_token);
    } else if !outcome.auth_token.is_empty() {
        println!("{}", "Using existing auth token".dimmed());
    }

    if let Some(url) = &state.function_url {
        println!();
        println!("Next: export {}={url}", crate::client::ENV_URL);
        println!("Then: exitflow start ohio  (or any region)");
    }

    Ok(())
}
