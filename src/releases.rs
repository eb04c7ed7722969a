//! Release discovery: deployed Helm releases across all namespaces.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::HelmConfig;
use crate::model::Release;
use crate::version::parse_lenient;

#[async_trait]
pub trait ReleaseSource: Send + Sync {
    fn describe(&self) -> String;
    async fn list_releases(&self) -> Result<Vec<Release>>;
}

/// Shells out to `helm list`, which already knows how to reach the
/// cluster through the user's kubeconfig and storage driver.
pub struct HelmCli {
    binary: String,
    kube_context: Option<String>,
    driver: Option<String>,
}

impl HelmCli {
    pub fn new(config: &HelmConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            kube_context: non_empty(&config.kube_context),
            driver: non_empty(&config.driver),
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = [
            "list",
            "--all-namespaces",
            "--deployed",
            "--max",
            "0",
            "--output",
            "json",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
        if let Some(context) = &self.kube_context {
            args.push("--kube-context".to_string());
            args.push(context.clone());
        }
        args
    }
}

#[async_trait]
impl ReleaseSource for HelmCli {
    fn describe(&self) -> String {
        match &self.kube_context {
            Some(context) => format!("helm ({context})"),
            None => "helm".to_string(),
        }
    }

    async fn list_releases(&self) -> Result<Vec<Release>> {
        let mut command = Command::new(&self.binary);
        command.args(self.args());
        if let Some(driver) = &self.driver {
            command.env("HELM_DRIVER", driver);
        }
        debug!(binary = %self.binary, "listing helm releases");
        let output = command
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.binary))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "helm list exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        let releases = parse_helm_list(&String::from_utf8_lossy(&output.stdout))?;
        info!("found {} deployed releases", releases.len());
        Ok(releases)
    }
}

/// Reads a JSON array of releases from disk. Useful offline and in demos.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReleaseSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn list_releases(&self) -> Result<Vec<Release>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed reading releases: {}", self.path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid releases JSON: {}", self.path.display()))
    }
}

#[derive(Debug, Deserialize)]
struct HelmListEntry {
    name: String,
    namespace: String,
    #[serde(default)]
    revision: Value,
    #[serde(default)]
    updated: String,
    #[serde(default)]
    chart: String,
    #[serde(default)]
    app_version: String,
}

pub fn parse_helm_list(stdout: &str) -> Result<Vec<Release>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<HelmListEntry> =
        serde_json::from_str(trimmed).context("invalid JSON from helm list")?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let (chart_name, chart_version) = split_chart(&entry.chart);
            Release {
                name: entry.name,
                namespace: entry.namespace,
                chart_name,
                chart_version,
                app_version: entry.app_version,
                revision: parse_revision(&entry.revision),
                updated: entry.updated,
                icon: None,
            }
        })
        .collect())
}

/// `helm list` reports `<chart>-<version>` and chart names may contain
/// dashes, so the version starts at the first dash whose remainder parses
/// as a version. Unparseable versions fall back to the first dash followed
/// by a digit.
pub fn split_chart(chart: &str) -> (String, String) {
    let split_at = |idx: usize| (chart[..idx].to_string(), chart[idx + 1..].to_string());
    if let Some((idx, _)) = chart
        .match_indices('-')
        .find(|(idx, _)| parse_lenient(&chart[idx + 1..]).is_some())
    {
        return split_at(idx);
    }
    for (idx, _) in chart.match_indices('-') {
        let rest = &chart[idx + 1..];
        let digits = rest.strip_prefix('v').unwrap_or(rest);
        if digits.starts_with(|c: char| c.is_ascii_digit()) {
            return split_at(idx);
        }
    }
    (chart.to_string(), String::new())
}

fn parse_revision(value: &Value) -> u32 {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.unwrap_or(1).max(1)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
