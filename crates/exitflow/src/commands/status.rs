//! `exitflow status` — discover and display the control plane

use colored::Colorize;

use exitflow_cloud::{ResourceKind, discover};
use exitflow_cloud_aws::AwsControlPlane;
use exitflow_core::Region;

pub async fn handle(region: &str) -> anyhow::Result<()> {
    let region = Region::from_friendly(region)?;

    println!(
        "Discovering ExitFlow infrastructure in {}...",
        region.friendly_name().cyan()
    );
    println!();

    let provider = AwsControlPlane::new(region.aws_code()).await;
    let state = discover(&provider).await?;

    if !state.exists() {
        println!("{}", "No ExitFlow infrastructure found".dimmed());
        println!();
        println!("→ Run 'exitflow deploy' to create infrastructure");
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<35}  {:<9}  Details", "Resource", "Status").bold()
    );
    println!("{}", "-".repeat(80).dimmed());

    print_row(
        ResourceKind::LogGroup,
        &state,
        state.log_group.as_ref().map(|r| r.name.clone()),
    );
    print_row(
        ResourceKind::Role,
        &state,
        state.role.as_ref().map(|r| r.name.clone()),
    );
    print_row(
        ResourceKind::ManagedPolicyAttachment,
        &state,
        state
            .policies
            .managed_attached
            .then(|| "AWSLambdaBasicExecutionRole".to_string()),
    );
    print_row(
        ResourceKind::InlinePolicy,
        &state,
        state.policies.inline_name.clone(),
    );
    print_row(
        ResourceKind::Function,
        &state,
        state.function.as_ref().map(|r| r.name.clone()),
    );
    print_row(ResourceKind::FunctionUrl, &state, state.function_url.clone());

    println!();
    if state.is_complete() {
        println!("{}", "✓ Infrastructure is complete".green());
        return Ok(());
    }

    let missing = state.missing();
    println!(
        "{} Infrastructure is incomplete ({} missing)",
        "✗".red(),
        missing.len().to_string().bold()
    );
    println!();
    println!("{}", "Missing resources:".bold());
    for kind in &missing {
        println!("  {} {kind}", "-".red());
    }

    if state.has_only_global_resources() {
        println!();
        println!(
            "{}",
            "Only global (IAM) resources were found — you may be querying the wrong region."
                .yellow()
        );
    }

    println!();
    println!("→ Run 'exitflow deploy' to create missing resources");
    Ok(())
}

fn print_row(kind: ResourceKind, state: &exitflow_cloud::ControlPlaneState, details: Option<String>) {
    // Pad before coloring so the escape codes don't skew the columns.
    let (status, details) = if state.has(kind) {
        (format!("{:<9}", "✓ Found").green(), details.unwrap_or_default())
    } else {
        (format!("{:<9}", "✗ Missing").red(), String::new())
    };

    println!("{:<35}  {}  {}", kind.label(), status, details.dimmed());
}
