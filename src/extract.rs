// src/extract.rs

//! Recovering structured fields from provider-CLI text output.

use std::sync::LazyLock;

use regex::Regex;

/// `externalIp: <ipv4>` at the end of a line in `describe` output.
static EXTERNAL_IP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"externalIp:\s*((?:[0-9]{1,3}\.){3}[0-9]{1,3})\s*$")
        .expect("external IP pattern is a valid regex")
});

/// External IPs of all workers, in the order `describe` lists them.
///
/// Returns an empty list when nothing matches.
pub fn extract_ips(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| EXTERNAL_IP.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
