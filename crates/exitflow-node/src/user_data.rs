//! Instance boot script
//!
//! Renders the user-data script that turns a stock instance into a tagged
//! Tailscale exit node, base64-encoded the way the provider expects it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tera::{Context, Tera};

use crate::error::Result;

const USER_DATA_TEMPLATE: &str = r#"#!/bin/bash
set -e

# Install Tailscale
curl -fsSL https://tailscale.com/install.sh | sh

# Join the tailnet advertising this node as an exit node
tailscale up --authkey={{ auth_key }} --advertise-exit-node --hostname=exit-{{ region }}

# Enable IP forwarding
echo 'net.ipv4.ip_forward = 1' >> /etc/sysctl.conf
echo 'net.ipv6.conf.all.forwarding = 1' >> /etc/sysctl.conf
sysctl -p

echo "Exit node setup complete for region: {{ region }}" | logger -t exitflow-setup
"#;

/// Render the boot script for a region and return it base64-encoded.
pub fn render(auth_key: &str, region: &str) -> Result<String> {
    let mut context = Context::new();
    context.insert("auth_key", auth_key);
    context.insert("region", region);

    let script = Tera::one_off(USER_DATA_TEMPLATE, &context, false)?;
    Ok(STANDARD.encode(script))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(encoded: &str) -> String {
        String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap()
    }

    #[test]
    fn embeds_key_and_hostname() {
        let script = decode(&render("tskey-auth-abc123", "frankfurt").unwrap());
        assert!(script.starts_with("#!/bin/bash"));
        assert!(script.contains("--authkey=tskey-auth-abc123"));
        assert!(script.contains("--advertise-exit-node"));
        assert!(script.contains("--hostname=exit-frankfurt"));
    }

    #[test]
    fn enables_forwarding_for_both_families() {
        let script = decode(&render("k", "ohio").unwrap());
        assert!(script.contains("net.ipv4.ip_forward = 1"));
        assert!(script.contains("net.ipv6.conf.all.forwarding = 1"));
    }
}
