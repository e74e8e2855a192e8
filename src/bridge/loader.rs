use std::fs;
use std::time::Duration;

use tracing::debug;

use crate::error::BridgeError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch the HTML behind `url`: `http(s)://` over the network, `file://`
/// or a bare path from disk.
pub fn load_page(url: &str) -> Result<String, BridgeError> {
    let load_err = |error: String| BridgeError::Load {
        url: url.to_string(),
        error,
    };

    if url.starts_with("http://") || url.starts_with("https://") {
        debug!(url, "Fetching page");
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| load_err(e.to_string()))?;
        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| load_err(e.to_string()))?;
        return response.text().map_err(|e| load_err(e.to_string()));
    }

    let path = url.strip_prefix("file://").unwrap_or(url);
    debug!(path, "Reading page from disk");
    fs::read_to_string(path).map_err(|e| load_err(e.to_string()))
}
