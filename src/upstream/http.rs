use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::UpstreamError;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

pub fn user_agent() -> String {
    format!("kubescout/{}", env!("CARGO_PKG_VERSION"))
}

pub fn build_client(timeout: Duration) -> Result<Client, UpstreamError> {
    Ok(Client::builder()
        .user_agent(user_agent())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS).min(timeout))
        .build()?)
}

pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, UpstreamError> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response.text().await?;
    decode(url, &body)
}

pub fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, UpstreamError> {
    serde_json::from_str(body).map_err(|error| {
        let preview: String = body.chars().take(180).collect();
        UpstreamError::Parse {
            url: url.to_string(),
            message: format!("{error}: {preview}"),
        }
    })
}
