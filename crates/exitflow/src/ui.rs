//! Terminal presentation
//!
//! Everything the engine reports comes through [`CliProgress`]; the engine
//! itself never touches the terminal. Spinners for ordinary steps, a
//! rotating message while IAM propagation is being waited out, and the
//! red box before anything destructive.

use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use exitflow_cloud::Progress;

/// Rotating messages for the propagation wait. The first one is the plain
/// statement; the rest keep the user company.
const PROPAGATION_MESSAGES: &[&str] = &[
    "Waiting for IAM to propagate (retrying function creation)",
    "AWS is eventually consistent... eventually",
    "IAM propagation: like waiting for DNS, but for permissions",
    "Still cheaper than a commercial VPN subscription",
    "Distributed systems are great, they said. It'll be fun, they said",
    "Somewhere, an AWS engineer is muttering 'it's fine, it's eventual'",
    "IAM propagation: the buffering icon of cloud infrastructure",
];

/// How many retry attempts each rotating message is shown for.
const ROTATION_ATTEMPTS: u32 = 5;

fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message(message.to_string());
    pb
}

/// Spinner-backed [`Progress`] implementation.
#[derive(Default)]
pub struct CliProgress {
    current: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear_current(&self) {
        if let Some(pb) = self.current.lock().unwrap().take() {
            pb.finish_and_clear();
        }
    }
}

impl Progress for CliProgress {
    fn step_started(&self, label: &str) {
        self.clear_current();
        *self.current.lock().unwrap() = Some(new_spinner(label));
    }

    fn step_done(&self, label: &str) {
        self.clear_current();
        println!("{} {}", "✓".green(), label);
    }

    fn step_failed(&self, label: &str) {
        self.clear_current();
        println!("{} {}", "✗".red(), label);
    }

    fn warn(&self, label: &str, message: &str) {
        self.clear_current();
        println!("{} {}: {}", "⚠".yellow(), label, message.yellow());
    }

    fn note(&self, message: &str) {
        self.clear_current();
        println!("{}", message.dimmed());
    }

    fn propagation_wait(&self, attempt: u32) {
        let index = (attempt / ROTATION_ATTEMPTS) as usize % PROPAGATION_MESSAGES.len();
        if let Some(pb) = self.current.lock().unwrap().as_ref() {
            pb.set_message(PROPAGATION_MESSAGES[index].to_string());
        }
    }
}

/// Red double-bordered warning box listing what a destructive action will
/// remove.
pub fn danger_box(title: &str, items: &[String], confirm_text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("🔥 {title} 🔥"));
    lines.push(String::new());
    for item in items {
        lines.push(format!("• {item}"));
    }
    lines.push(String::new());
    lines.push(confirm_text.to_string());

    let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0) + 4;

    let mut boxed = String::new();
    boxed.push_str(&format!("╔{}╗\n", "═".repeat(width)).red().to_string());
    for line in &lines {
        let padding = width - 2 - line.chars().count();
        boxed.push_str(&"║".red().to_string());
        boxed.push(' ');
        boxed.push_str(line);
        boxed.push_str(&" ".repeat(padding + 1));
        boxed.push_str(&"║".red().to_string());
        boxed.push('\n');
    }
    boxed.push_str(&format!("╚{}╝", "═".repeat(width)).red().to_string());
    boxed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn danger_box_contains_every_line() {
        let rendered = danger_box(
            "DANGER",
            &["Lambda function".to_string(), "IAM role".to_string()],
            "Type 'DELETE' to confirm:",
        );
        assert!(rendered.contains("DANGER"));
        assert!(rendered.contains("Lambda function"));
        assert!(rendered.contains("IAM role"));
        assert!(rendered.contains("DELETE"));
    }

    #[test]
    fn propagation_messages_rotate_in_bounds() {
        for attempt in 0..100 {
            let index = (attempt / ROTATION_ATTEMPTS) as usize % PROPAGATION_MESSAGES.len();
            assert!(index < PROPAGATION_MESSAGES.len());
        }
    }
}
