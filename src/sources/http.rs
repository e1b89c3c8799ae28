use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::FetchError;

/// GET `url` with `query` and decode the JSON body.
///
/// The URL is stripped from errors since some providers take API keys as
/// query parameters.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> Result<T, FetchError> {
    let response = client
        .get(url)
        .query(query)
        .timeout(timeout)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| e.without_url())?;

    let body = response.json::<T>().await.map_err(|e| e.without_url())?;
    Ok(body)
}
