pub mod artifacthub;
pub mod cache;
pub mod http;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

/// What upstream currently publishes for one chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamVersion {
    pub latest_version: String,
    pub latest_app_version: String,
    pub upstream_url: String,
    /// Chart logo, when upstream publishes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    fn name(&self) -> &str;
    async fn latest(&self, chart_name: &str) -> Result<UpstreamVersion, UpstreamError>;
}

/// Repository coordinates of a chart on Artifact Hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageRef {
    pub repo: String,
    pub name: String,
}

impl PackageRef {
    pub fn new(repo: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            name: name.into(),
        }
    }
}

/// Popular charts whose search results are ambiguous, pinned to the
/// repository that publishes the canonical chart.
pub fn default_presets() -> BTreeMap<String, PackageRef> {
    [
        ("argo-cd", "argo", "argo-cd"),
        (
            "aws-load-balancer-controller",
            "aws",
            "aws-load-balancer-controller",
        ),
        ("karpenter", "aws-karpenter", "karpenter"),
        ("keda", "kedacore", "keda"),
        ("cert-manager", "cert-manager", "cert-manager"),
        ("ingress-nginx", "ingress-nginx", "ingress-nginx"),
        ("prometheus", "prometheus-community", "prometheus"),
        (
            "kube-prometheus-stack",
            "prometheus-community",
            "kube-prometheus-stack",
        ),
        ("external-dns", "external-dns", "external-dns"),
        ("n8n", "community-charts", "n8n"),
    ]
    .into_iter()
    .map(|(chart, repo, name)| (chart.to_string(), PackageRef::new(repo, name)))
    .collect()
}
