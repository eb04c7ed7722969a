use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use crate::upstream::http::{build_client, get_json};
use crate::upstream::{default_presets, PackageRef, UpstreamResolver, UpstreamVersion};

const SEARCH_LIMIT: &str = "20";
const HELM_KIND: &str = "0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub packages: Vec<PackageSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageSummary {
    #[serde(default)]
    pub package_id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub repository: Repository,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub logo_image_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub official: bool,
    #[serde(default)]
    pub verified_publisher: bool,
}

/// Resolves chart versions on Artifact Hub: pinned presets first, then a
/// name search ranked by trust signals.
pub struct ArtifactHub {
    client: Client,
    api_base: String,
    web_base: String,
    presets: BTreeMap<String, PackageRef>,
}

impl ArtifactHub {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut presets = default_presets();
        presets.extend(config.presets.clone());
        Ok(Self {
            client: build_client(Duration::from_secs(config.timeout_secs.max(1)))?,
            api_base: config.base_url.trim_end_matches('/').to_string(),
            web_base: config.web_url.trim_end_matches('/').to_string(),
            presets,
        })
    }

    pub fn preset(&self, chart_name: &str) -> Option<&PackageRef> {
        self.presets.get(chart_name)
    }

    fn package_url(&self, repo: &str, name: &str) -> String {
        format!("{}/packages/helm/{repo}/{name}", self.web_base)
    }

    fn logo_url(&self, package: &PackageSummary) -> Option<String> {
        package
            .logo_image_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}/image/{id}", self.web_base))
    }

    async fn package_detail(&self, package: &PackageRef) -> Result<UpstreamVersion, UpstreamError> {
        let url = format!(
            "{}/packages/helm/{}/{}",
            self.api_base, package.repo, package.name
        );
        let detail: PackageSummary = get_json(&self.client, &url, &[]).await?;
        Ok(UpstreamVersion {
            icon: self.logo_url(&detail),
            latest_version: detail.version,
            latest_app_version: detail.app_version,
            upstream_url: self.package_url(&package.repo, &package.name),
            checked_at: Utc::now(),
        })
    }

    async fn search(&self, chart_name: &str) -> Result<UpstreamVersion, UpstreamError> {
        let url = format!("{}/packages/search", self.api_base);
        let response: SearchResponse = get_json(
            &self.client,
            &url,
            &[
                ("ts_query_web", chart_name),
                ("kind", HELM_KIND),
                ("limit", SEARCH_LIMIT),
            ],
        )
        .await?;

        let best = select_best_match(&response.packages, chart_name)
            .ok_or_else(|| UpstreamError::NotFound(chart_name.to_string()))?;
        debug!(
            chart = chart_name,
            repo = %best.repository.name,
            "selected upstream package from search"
        );
        Ok(UpstreamVersion {
            latest_version: best.version.clone(),
            latest_app_version: best.app_version.clone(),
            upstream_url: self.package_url(&best.repository.name, &best.name),
            icon: self.logo_url(best),
            checked_at: Utc::now(),
        })
    }
}

#[async_trait]
impl UpstreamResolver for ArtifactHub {
    fn name(&self) -> &str {
        "artifacthub"
    }

    async fn latest(&self, chart_name: &str) -> Result<UpstreamVersion, UpstreamError> {
        match self.preset(chart_name) {
            Some(package) => self.package_detail(package).await,
            None => self.search(chart_name).await,
        }
    }
}

/// Picks the most trustworthy exact-name match. Earlier candidates win
/// full ties.
pub fn select_best_match<'a>(
    packages: &'a [PackageSummary],
    chart_name: &str,
) -> Option<&'a PackageSummary> {
    let mut best: Option<&PackageSummary> = None;
    for candidate in packages.iter().filter(|p| p.name == chart_name) {
        best = match best {
            Some(current) if !outranks(candidate, current) => Some(current),
            _ => Some(candidate),
        };
    }
    best
}

fn outranks(candidate: &PackageSummary, current: &PackageSummary) -> bool {
    if candidate.repository.official != current.repository.official {
        return candidate.repository.official;
    }
    if candidate.deprecated != current.deprecated {
        return !candidate.deprecated;
    }
    if candidate.stars != current.stars {
        return candidate.stars > current.stars;
    }
    candidate.repository.verified_publisher && !current.repository.verified_publisher
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::config::UpstreamConfig;
    use crate::upstream::artifacthub::{select_best_match, ArtifactHub, SearchResponse};
    use crate::upstream::PackageRef;

    fn search_fixture() -> SearchResponse {
        serde_json::from_value(json!({
            "packages": [
                {
                    "package_id": "1",
                    "name": "redis",
                    "version": "18.0.0",
                    "app_version": "7.2.0",
                    "stars": 40,
                    "deprecated": false,
                    "repository": { "name": "community", "official": false, "verified_publisher": true }
                },
                {
                    "package_id": "2",
                    "name": "redis",
                    "version": "19.5.2",
                    "app_version": "7.2.5",
                    "stars": 900,
                    "deprecated": false,
                    "repository": { "name": "bitnami", "official": false, "verified_publisher": true }
                },
                {
                    "package_id": "3",
                    "name": "redis-ha",
                    "version": "4.26.1",
                    "stars": 5000,
                    "repository": { "name": "dandydev", "official": true }
                },
                {
                    "package_id": "4",
                    "name": "redis",
                    "version": "1.0.0",
                    "stars": 2000,
                    "deprecated": true,
                    "repository": { "name": "stale", "official": false }
                }
            ]
        }))
        .expect("fixture decode failed")
    }

    #[test]
    fn exact_name_and_stars_decide_without_official_repo() {
        let response = search_fixture();
        let best = select_best_match(&response.packages, "redis").expect("no match");
        assert_eq!(best.repository.name, "bitnami");
        assert_eq!(best.version, "19.5.2");
    }

    #[test]
    fn official_beats_stars_and_deprecation() {
        let mut response = search_fixture();
        response.packages[0].repository.official = true;
        response.packages[0].deprecated = true;
        let best = select_best_match(&response.packages, "redis").expect("no match");
        assert_eq!(best.package_id, "1");
    }

    #[test]
    fn verified_publisher_breaks_star_ties() {
        let mut response = search_fixture();
        response.packages[0].stars = 900;
        response.packages[0].repository.verified_publisher = false;
        let best = select_best_match(&response.packages, "redis").expect("no match");
        assert_eq!(best.package_id, "2");

        response.packages[1].repository.verified_publisher = false;
        let best = select_best_match(&response.packages, "redis").expect("no match");
        assert_eq!(best.package_id, "1");
    }

    #[test]
    fn no_exact_match_is_none() {
        let response = search_fixture();
        assert!(select_best_match(&response.packages, "memcached").is_none());
        assert!(select_best_match(&[], "redis").is_none());
    }

    #[test]
    fn configured_presets_extend_defaults() {
        let mut config = UpstreamConfig::default();
        config
            .presets
            .insert("redis".to_string(), PackageRef::new("bitnami", "redis"));
        let hub = ArtifactHub::new(&config).expect("client build failed");
        assert_eq!(hub.preset("redis").map(|p| p.repo.as_str()), Some("bitnami"));
        assert_eq!(hub.preset("argo-cd").map(|p| p.repo.as_str()), Some("argo"));
        assert!(hub.preset("memcached").is_none());
        assert_eq!(
            hub.package_url("argo", "argo-cd"),
            "https://artifacthub.io/packages/helm/argo/argo-cd"
        );
    }

    #[test]
    fn logo_id_becomes_image_url() {
        let hub = ArtifactHub::new(&UpstreamConfig::default()).expect("client build failed");
        let mut response = search_fixture();
        assert_eq!(hub.logo_url(&response.packages[0]), None);

        response.packages[0].logo_image_id =
            Some("0503add5-3fce-4b63-bbf3-b9f649512a86".to_string());
        assert_eq!(
            hub.logo_url(&response.packages[0]).as_deref(),
            Some("https://artifacthub.io/image/0503add5-3fce-4b63-bbf3-b9f649512a86")
        );
        response.packages[1].logo_image_id = Some(" ".to_string());
        assert_eq!(hub.logo_url(&response.packages[1]), None);
    }
}
