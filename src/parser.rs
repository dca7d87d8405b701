//! HTML scraping and JSONP unwrapping for the portal's legacy endpoints

use crate::error::PortalError;
use crate::models::PortalParams;
use regex::Regex;

/// ac_id used when the login page does not carry one.
pub const FALLBACK_AC_ID: &str = "76";

/// Extract the `user_ip` and `ac_id` hidden inputs from the portal login
/// page. The page renders them as `name="x" id="x" value="..."`, in that
/// attribute order. A missing ac_id falls back to [`FALLBACK_AC_ID`]
/// (degraded mode, not an error); a missing IP is left to the caller.
pub fn parse_portal_params(html: &str) -> PortalParams {
    fn hidden_input(html: &str, name: &str) -> Option<String> {
        let pattern = format!(r#"name="{name}"\s+id="{name}"\s+value="([^"]+)""#);
        Regex::new(&pattern)
            .ok()?
            .captures(html)?
            .get(1)
            .map(|m| m.as_str().to_string())
    }

    let ip = hidden_input(html, "user_ip");
    let ac_id = match hidden_input(html, "ac_id") {
        Some(id) => id,
        None => {
            tracing::warn!(
                "ac_id not found on login page, falling back to {}",
                FALLBACK_AC_ID
            );
            FALLBACK_AC_ID.to_string()
        }
    };

    PortalParams { ip, ac_id }
}

/// Strip a JSONP envelope `callback(...)` and parse the JSON body.
pub fn unwrap_jsonp(body: &str, callback: &str) -> Result<serde_json::Value, PortalError> {
    let inner = body
        .trim()
        .strip_prefix(callback)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| PortalError::Jsonp(format!("body is not wrapped in {callback}(...)")))?;
    serde_json::from_str(inner).map_err(|e| PortalError::Jsonp(e.to_string()))
}
