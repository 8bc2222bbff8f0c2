//! `exitflow setup` — configure the tailnet for exit nodes
//!
//! One-time account configuration: make `tag:exitnode` usable (tag owners
//! + auto-approval in the ACL) and mint the reusable ephemeral auth key
//! the control function deploys with.

use colored::Colorize;

use exitflow_cloud::ENV_TAILSCALE_AUTH_KEY;
use exitflow_tailscale::{
    Client, configure_for_exit_nodes, exit_node_auth_key_request, preview_changes,
    validate_exit_node_config,
};

const ENV_API_TOKEN: &str = "TAILSCALE_API_TOKEN";

pub struct SetupArgs {
    pub tailnet: String,
    pub status: bool,
    pub show_acl_changes: bool,
    pub skip_acl: bool,
    pub skip_auth_key: bool,
}

pub async fn handle(args: SetupArgs) -> anyhow::Result<()> {
    let api_token = std::env::var(ENV_API_TOKEN).map_err(|_| {
        anyhow::anyhow!(
            "{ENV_API_TOKEN} environment variable not set\n\n\
             To create an API token:\n\
             1. Visit: https://login.tailscale.com/admin/settings/keys\n\
             2. Generate an API key (you must be an Owner or Admin)\n\
             3. export {ENV_API_TOKEN}=tskey-api-..."
        )
    })?;

    println!("{}", "ExitFlow Setup — configuring Tailscale for exit nodes".bold());
    println!("{}", "=".repeat(56).dimmed());
    println!();

    let client = Client::new(api_token, &args.tailnet)?;
    println!("{} Using tailnet: {}", "✓".green(), client.tailnet().cyan());
    println!();

    if args.status {
        return status_check(&client).await;
    }

    if args.skip_acl {
        println!("{}", "Skipping ACL configuration (--skip-acl)".dimmed());
    } else {
        configure_acl(&client, args.show_acl_changes).await?;
        if args.show_acl_changes {
            return Ok(());
        }
    }
    println!();

    if args.skip_auth_key {
        println!("{}", "Skipping auth key creation (--skip-auth-key)".dimmed());
    } else {
        create_auth_key(&client).await?;
    }

    println!();
    println!("{}", "Setup complete! 🎉".green().bold());
    println!();
    println!("Next steps:");
    println!("1. export {ENV_TAILSCALE_AUTH_KEY}=<the key above>");
    println!("2. Deploy the control plane: exitflow deploy");
    println!("3. Test: exitflow start ohio");

    Ok(())
}

async fn status_check(client: &Client) -> anyhow::Result<()> {
    println!("Checking current configuration...");

    let acl = client.get_acl().await?;
    match validate_exit_node_config(&acl.policy) {
        Ok(()) => {
            println!("{} ACL properly configured for exit nodes", "✓".green());
        }
        Err(err) => {
            println!("{} ACL not configured for exit nodes", "✗".red());
            println!("  {err}");
            println!();
            println!("Run 'exitflow setup' (without --status) to configure");
        }
    }

    Ok(())
}

async fn configure_acl(client: &Client, preview_only: bool) -> anyhow::Result<()> {
    println!("{}", "Step 1/2: Configuring ACL policy".bold());

    let mut acl = client.get_acl().await?;
    let owner = client.current_user();

    if preview_only {
        println!();
        println!("ACL changes that would be applied:");
        for line in preview_changes(&acl.policy, owner) {
            println!("  {line}");
        }
        println!();
        println!("Run without --show-acl-changes to apply these changes");
        return Ok(());
    }

    let (changes, modified) = configure_for_exit_nodes(&mut acl.policy, owner);
    for change in &changes {
        println!("{} {change}", "✓".green());
    }

    if !modified {
        println!("{}", "  ACL already configured — no changes needed".dimmed());
        return Ok(());
    }

    // Validate server-side before writing; the write carries the ETag so a
    // concurrent admin edit fails as a conflict instead of being clobbered.
    client.validate_acl(&acl.policy).await?;
    client.update_acl(&acl.policy, &acl.etag).await?;
    println!("{} ACL policy updated", "✓".green());

    Ok(())
}

async fn create_auth_key(client: &Client) -> anyhow::Result<()> {
    println!("{}", "Step 2/2: Creating auth key".bold());

    let response = client.create_auth_key(&exit_node_auth_key_request()).await?;

    println!("{} Auth key created (id: {})", "✓".green(), response.id);
    println!();
    println!("{}", "⚠ Save this key — you won't see it again:".yellow().bold());
    println!("  export {ENV_TAILSCALE_AUTH_KEY}={}", response.key);

    Ok(())
}
