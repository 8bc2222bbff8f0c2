//! `exitflow teardown` — confirm and destroy the control plane

use std::io::Write as _;

use colored::Colorize;

use exitflow_cloud::{CONFIRMATION_TOKEN, deletion_plan, discover, is_legacy_deployment, run_teardown};
use exitflow_cloud_aws::AwsControlPlane;
use exitflow_core::Region;

use crate::ui::{self, CliProgress};

pub async fn handle(region: &str, yes: bool) -> anyhow::Result<()> {
    let region = Region::from_friendly(region)?;
    println!("{} {}", "Region:".bold(), region.friendly_name().cyan());
    println!();

    let provider = AwsControlPlane::new(region.aws_code()).await;

    // Discover up front so the user sees exactly what will go away.
    let state = discover(&provider).await?;
    if !state.exists() {
        println!("{}", "No ExitFlow infrastructure found".dimmed());
        return Ok(());
    }

    if is_legacy_deployment(&state) {
        println!("{}", "⚠ Legacy infrastructure detected!".yellow().bold());
        println!("  Resources found without the 'ManagedBy=exitflow' tag.");
        println!("  This looks like a deployment from some other tool.");
        println!();
    }

    let plan: Vec<String> = deletion_plan(&state)
        .into_iter()
        .map(|(kind, detail)| format!("{kind}: {detail}"))
        .collect();

    let confirmation = if yes {
        CONFIRMATION_TOKEN.to_string()
    } else {
        println!(
            "{}",
            ui::danger_box(
                "DANGER - PERMANENT DELETION",
                &plan,
                &format!("Type '{CONFIRMATION_TOKEN}' to confirm (anything else cancels):"),
            )
        );
        println!();
        print!("→ ");
        std::io::stdout().flush()?;

        let mut response = String::new();
        std::io::stdin().read_line(&mut response)?;
        response.trim().to_string()
    };

    if confirmation != CONFIRMATION_TOKEN {
        println!();
        println!("{}", "✓ Teardown cancelled — nothing was deleted".green());
        return Ok(());
    }

    println!();
    let progress = CliProgress::new();
    let outcome = run_teardown(&provider, &confirmation, &progress).await?;

    println!();
    if outcome.failures.is_empty() {
        println!("{}", "✓ Teardown complete".green().bold());
    } else {
        println!(
            "{}",
            format!(
                "⚠ Teardown finished with {} warning(s) — some resources may remain",
                outcome.failures.len()
            )
            .yellow()
            .bold()
        );
        for failure in &outcome.failures {
            println!("  {} {}: {}", "⚠".yellow(), failure.kind, failure.message);
        }
    }

    if outcome.legacy {
        println!();
        println!("  Legacy infrastructure has been removed.");
        println!("  You can now deploy with: exitflow deploy");
    }

    Ok(())
}
