use std::time::Duration;

use reqwest::Client;

use crate::error::FetchError;
use crate::model::ComparisonResult;
use crate::upstream::http::user_agent;

const ERROR_PREVIEW_CHARS: usize = 180;

/// Fetches `GET {api_base}/releases`.
#[derive(Clone)]
pub struct ReleasesClient {
    client: Client,
    url: String,
}

impl ReleasesClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(FetchError::from_transport)?;
        Ok(Self {
            client,
            url: releases_url(api_base),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<ComparisonResult>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(FetchError::from_transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                message: body.chars().take(ERROR_PREVIEW_CHARS).collect(),
            });
        }
        let body = response.text().await.map_err(FetchError::from_transport)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

pub fn releases_url(api_base: &str) -> String {
    format!("{}/releases", api_base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::dashboard::client::{releases_url, ReleasesClient};
    use crate::error::FetchError;
    use crate::model::fixtures::release;
    use crate::scout::fakes::StaticSource;
    use crate::scout::Scout;
    use crate::server::testing::spawn_api;
    use crate::upstream::fakes::StaticResolver;

    #[test]
    fn joins_base_and_path() {
        assert_eq!(
            releases_url("http://localhost:8080/api/v1/"),
            "http://localhost:8080/api/v1/releases"
        );
        assert_eq!(releases_url("/api/v1"), "/api/v1/releases");
    }

    #[tokio::test]
    async fn fetches_results_from_running_api() {
        let scout = Scout::new(
            Arc::new(StaticSource(Ok(vec![release("default", "web")]))),
            Arc::new(StaticResolver::default().with("web", "1.1.0", "1.1.0")),
        );
        let base = spawn_api(scout).await;
        let client = ReleasesClient::new(&format!("{base}/api/v1"), Duration::from_secs(5))
            .expect("client build failed");
        let results = client.fetch().await.expect("fetch failed");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].release.key(), "default/web");
    }

    #[tokio::test]
    async fn server_errors_are_http_errors() {
        let scout = Scout::new(
            Arc::new(StaticSource(Err("kube api down".to_string()))),
            Arc::new(StaticResolver::default()),
        );
        let base = spawn_api(scout).await;
        let client = ReleasesClient::new(&format!("{base}/api/v1"), Duration::from_secs(5))
            .expect("client build failed");
        match client.fetch().await {
            Err(FetchError::Http { status, message }) => {
                assert_eq!(status, 500);
                assert!(message.contains("kube api down"));
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind failed");
        let addr = listener.local_addr().expect("no local addr");
        drop(listener);

        let client = ReleasesClient::new(&format!("http://{addr}/api/v1"), Duration::from_secs(2))
            .expect("client build failed");
        assert!(matches!(client.fetch().await, Err(FetchError::Network(_))));
    }
}
