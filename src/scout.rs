//! Joins deployed releases with upstream knowledge.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::UpstreamError;
use crate::model::{ComparisonResult, DriftStatus, Release};
use crate::releases::{FileSource, HelmCli, ReleaseSource};
use crate::upstream::artifacthub::ArtifactHub;
use crate::upstream::cache::Cached;
use crate::upstream::{UpstreamResolver, UpstreamVersion};
use crate::version::classify;

#[derive(Clone)]
pub struct Scout {
    releases: Arc<dyn ReleaseSource>,
    upstream: Arc<dyn UpstreamResolver>,
}

impl Scout {
    pub fn new(releases: Arc<dyn ReleaseSource>, upstream: Arc<dyn UpstreamResolver>) -> Self {
        Self { releases, upstream }
    }

    /// Helm (or a release snapshot file) against a cached Artifact Hub.
    pub fn from_config(config: &Config, releases_file: Option<PathBuf>) -> Result<Self> {
        let releases: Arc<dyn ReleaseSource> = match releases_file {
            Some(path) => Arc::new(FileSource::new(path)),
            None => Arc::new(HelmCli::new(&config.helm)),
        };
        let ttl = chrono::Duration::seconds(config.upstream.cache_ttl_secs as i64);
        let upstream = Cached::new(ArtifactHub::new(&config.upstream)?, ttl);
        Ok(Self::new(releases, Arc::new(upstream)))
    }

    pub fn describe(&self) -> String {
        format!("{} -> {}", self.releases.describe(), self.upstream.name())
    }

    /// Lists releases and resolves every chart concurrently. Output order
    /// follows the release listing.
    pub async fn check_all(&self) -> Result<Vec<ComparisonResult>> {
        let releases = self.releases.list_releases().await?;

        let mut set = JoinSet::new();
        for (idx, release) in releases.iter().cloned().enumerate() {
            let upstream = Arc::clone(&self.upstream);
            set.spawn(async move {
                let outcome = upstream.latest(&release.chart_name).await;
                (idx, compare_release(release, outcome))
            });
        }

        let mut slots: Vec<Option<ComparisonResult>> = vec![None; releases.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => warn!(%e, "upstream lookup task failed"),
            }
        }

        let results = slots
            .into_iter()
            .zip(releases)
            .map(|(slot, release)| slot.unwrap_or_else(|| ComparisonResult::unknown(release)))
            .collect::<Vec<_>>();
        let summary = DriftSummary::from_results(&results);
        info!(
            total = summary.total,
            drifted = summary.drifted(),
            unknown = summary.unknown,
            "release check complete"
        );
        Ok(results)
    }
}

/// Per-release failures degrade to `UNKNOWN` instead of failing the batch.
pub fn compare_release(
    release: Release,
    outcome: Result<UpstreamVersion, UpstreamError>,
) -> ComparisonResult {
    match outcome {
        Ok(latest) => ComparisonResult {
            status: classify(&release.chart_version, &latest.latest_version),
            release: Release {
                icon: release.icon.or(latest.icon),
                ..release
            },
            latest_version: latest.latest_version,
            latest_app_version: latest.latest_app_version,
            upstream_url: latest.upstream_url,
            checked_at: latest.checked_at,
        },
        Err(err) => {
            warn!(chart = %release.chart_name, "failed to check upstream: {err}");
            ComparisonResult::unknown(release)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriftSummary {
    pub total: usize,
    pub sync: usize,
    pub patch: usize,
    pub minor: usize,
    pub major: usize,
    pub unknown: usize,
}

impl DriftSummary {
    pub fn from_results(results: &[ComparisonResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                DriftStatus::Sync => summary.sync += 1,
                DriftStatus::PatchDrift => summary.patch += 1,
                DriftStatus::MinorDrift => summary.minor += 1,
                DriftStatus::MajorDrift => summary.major += 1,
                DriftStatus::Unknown | DriftStatus::Unrecognized(_) => summary.unknown += 1,
            }
        }
        summary
    }

    pub fn drifted(&self) -> usize {
        self.patch + self.minor + self.major
    }
}
