use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One deployed Helm release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub name: String,
    pub namespace: String,
    pub chart_name: String,
    pub chart_version: String,
    pub app_version: String,
    pub revision: u32,
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Release {
    /// Row identity across fetches: `namespace/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// How far a release's chart version trails the upstream one.
///
/// Statuses outside the closed set are kept verbatim in `Unrecognized` so
/// they survive a JSON round trip and can be ranked last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DriftStatus {
    Sync,
    PatchDrift,
    MinorDrift,
    MajorDrift,
    Unknown,
    Unrecognized(String),
}

impl DriftStatus {
    pub const KNOWN: [DriftStatus; 5] = [
        DriftStatus::MajorDrift,
        DriftStatus::MinorDrift,
        DriftStatus::PatchDrift,
        DriftStatus::Sync,
        DriftStatus::Unknown,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Sync => "SYNC",
            Self::PatchDrift => "PATCH_DRIFT",
            Self::MinorDrift => "MINOR_DRIFT",
            Self::MajorDrift => "MAJOR_DRIFT",
            Self::Unknown => "UNKNOWN",
            Self::Unrecognized(raw) => raw.as_str(),
        }
    }
}

impl From<String> for DriftStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SYNC" => Self::Sync,
            "PATCH_DRIFT" => Self::PatchDrift,
            "MINOR_DRIFT" => Self::MinorDrift,
            "MAJOR_DRIFT" => Self::MajorDrift,
            "UNKNOWN" => Self::Unknown,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<DriftStatus> for String {
    fn from(value: DriftStatus) -> Self {
        match value {
            DriftStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for DriftStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A release paired with what upstream currently publishes for its chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub release: Release,
    pub latest_version: String,
    pub latest_app_version: String,
    pub status: DriftStatus,
    pub upstream_url: String,
    pub checked_at: DateTime<Utc>,
}

impl ComparisonResult {
    pub fn unknown(release: Release) -> Self {
        Self {
            release,
            latest_version: String::new(),
            latest_app_version: String::new(),
            status: DriftStatus::Unknown,
            upstream_url: String::new(),
            checked_at: Utc::now(),
        }
    }
}
