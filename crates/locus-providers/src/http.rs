use std::time::Duration;

use locus_core::{LocusError, ProviderError};
use reqwest::{Client, Response, Url};

/// Per-attempt ceiling; the overall budget is enforced by the guard.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_client() -> Result<Client, LocusError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LocusError::HttpClient(e.to_string()))
}

pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url, LocusError> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| LocusError::Config(format!("invalid provider url '{}': {}", raw, e)))
}

pub(crate) fn transport(err: reqwest::Error) -> ProviderError {
    if err.is_decode() {
        ProviderError::Decode(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}

pub(crate) fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Status(status.as_u16()))
    }
}

/// Lowercases and trims labels, dropping empties and duplicates while keeping order.
pub fn normalize_categories<I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut categories: Vec<String> = Vec::new();
    for label in labels {
        let label = label.trim().to_lowercase();
        if !label.is_empty() && !categories.contains(&label) {
            categories.push(label);
        }
    }
    categories
}
