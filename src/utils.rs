//! WiFi adapter control via nmcli

use anyhow::Result;
use std::process::Command;

/// SSID of the currently active WiFi connection, if any.
pub fn current_ssid() -> Result<Option<String>> {
    let output = Command::new("nmcli")
        .args(["-t", "-f", "active,ssid", "dev", "wifi"])
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(ssid) = line.strip_prefix("yes:") {
            if !ssid.is_empty() {
                return Ok(Some(ssid.to_string()));
            }
        }
    }

    Ok(None)
}

/// Join the named SSID if not already on it. Returns whether the adapter
/// reports the connection up; failures are for the caller to log, never
/// retried here.
pub fn connect_wifi(ssid: &str) -> Result<bool> {
    if current_ssid()?.as_deref() == Some(ssid) {
        tracing::debug!("already connected to '{ssid}'");
        return Ok(true);
    }

    let output = Command::new("nmcli")
        .args(["device", "wifi", "connect", ssid])
        .output()?;

    if !output.status.success() {
        tracing::warn!(
            "nmcli could not connect to '{ssid}': {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(output.status.success())
}
