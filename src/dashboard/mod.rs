//! Client side of the releases API: the last known-good snapshot, the
//! current sort choice, and the rows handed to the renderer.

pub mod client;
pub mod watch;

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::model::{ComparisonResult, DriftStatus};
use crate::ranking::{rank_by_state, toggle_sort, SortKey, SortState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BadgeColor {
    Green,
    Blue,
    Yellow,
    Red,
    Gray,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusBadge {
    Sync,
    PatchDrift,
    MinorDrift,
    MajorDrift,
    Unknown,
}

impl StatusBadge {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sync => "Sync",
            Self::PatchDrift => "Patch Drift",
            Self::MinorDrift => "Minor Drift",
            Self::MajorDrift => "Major Drift",
            Self::Unknown => "Unknown",
        }
    }

    pub fn color(&self) -> BadgeColor {
        match self {
            Self::Sync => BadgeColor::Green,
            Self::PatchDrift => BadgeColor::Blue,
            Self::MinorDrift => BadgeColor::Yellow,
            Self::MajorDrift => BadgeColor::Red,
            Self::Unknown => BadgeColor::Gray,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Sync => "🟢",
            Self::PatchDrift => "🔵",
            Self::MinorDrift => "🟡",
            Self::MajorDrift => "🔴",
            Self::Unknown => "⚪",
        }
    }
}

impl From<&DriftStatus> for StatusBadge {
    fn from(status: &DriftStatus) -> Self {
        match status {
            DriftStatus::Sync => Self::Sync,
            DriftStatus::PatchDrift => Self::PatchDrift,
            DriftStatus::MinorDrift => Self::MinorDrift,
            DriftStatus::MajorDrift => Self::MajorDrift,
            DriftStatus::Unknown | DriftStatus::Unrecognized(_) => Self::Unknown,
        }
    }
}

impl Display for StatusBadge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One rendered table row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardRow {
    pub key: String,
    pub badge: StatusBadge,
    pub release_name: String,
    pub chart_name: String,
    pub icon: Option<String>,
    pub namespace: String,
    pub current_version: String,
    pub current_app_version: String,
    pub latest_version: String,
    pub latest_app_version: String,
    pub upstream_url: Option<String>,
}

impl From<&ComparisonResult> for DashboardRow {
    fn from(result: &ComparisonResult) -> Self {
        let release = &result.release;
        Self {
            key: release.key(),
            badge: StatusBadge::from(&result.status),
            release_name: release.name.clone(),
            chart_name: release.chart_name.clone(),
            icon: release.icon.clone(),
            namespace: release.namespace.clone(),
            current_version: release.chart_version.clone(),
            current_app_version: release.app_version.clone(),
            latest_version: result.latest_version.clone(),
            latest_app_version: result.latest_app_version.clone(),
            upstream_url: Some(result.upstream_url.clone()).filter(|u| !u.is_empty()),
        }
    }
}

pub fn rows_for(results: &[ComparisonResult], sort: Option<SortState>) -> Vec<DashboardRow> {
    rank_by_state(results, sort)
        .iter()
        .map(DashboardRow::from)
        .collect()
}

#[derive(Debug, Default)]
pub struct DashboardState {
    last_good: Option<Vec<ComparisonResult>>,
    sort: Option<SortState>,
    last_error: Option<FetchError>,
    fetched_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new(sort: Option<SortState>) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    /// A success replaces the snapshot wholesale; a failure only records
    /// the error and leaves the previous snapshot on screen.
    pub fn apply_fetch(&mut self, outcome: Result<Vec<ComparisonResult>, FetchError>) {
        match outcome {
            Ok(results) => {
                self.last_good = Some(results);
                self.last_error = None;
                self.fetched_at = Some(Utc::now());
            }
            Err(err) => {
                self.last_error = Some(err);
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.last_good.is_none() && self.last_error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn sort(&self) -> Option<SortState> {
        self.sort
    }

    pub fn toggle(&mut self, key: SortKey) -> SortState {
        let next = toggle_sort(self.sort, key);
        self.sort = Some(next);
        next
    }

    pub fn results(&self) -> &[ComparisonResult] {
        self.last_good.as_deref().unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.results().len()
    }

    pub fn rows(&self) -> Vec<DashboardRow> {
        rows_for(self.results(), self.sort)
    }
}
