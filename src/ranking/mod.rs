//! Display ordering for comparison results.
//!
//! `rank` is a pure, stable sort keyed by drift severity, release name or
//! namespace. Descending order negates the comparator instead of reversing
//! the ascending output, so ties keep their input order either way.

pub mod collation;

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ComparisonResult, DriftStatus};
use crate::ranking::collation::compare_text;

/// Priority given to statuses outside the closed set. Always sorts last.
pub const UNRANKED_PRIORITY: u8 = 99;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Status,
    Release,
    Namespace,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Status, SortKey::Release, SortKey::Namespace];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Release => "release",
            Self::Namespace => "namespace",
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Ties stay ties under both directions.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseSortError {
    #[error("unknown sort key: {0} (expected status, release or namespace)")]
    Key(String),
    #[error("unknown sort direction: {0} (expected asc or desc)")]
    Direction(String),
}

impl FromStr for SortKey {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(Self::Status),
            "release" | "name" => Ok(Self::Release),
            "namespace" | "ns" => Ok(Self::Namespace),
            _ => Err(ParseSortError::Key(s.to_string())),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(ParseSortError::Direction(s.to_string())),
        }
    }
}

/// The caller's current sort choice. `None` at the call sites means no
/// column has been picked yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }
}

/// Severity rank: lower is more severe.
pub fn priority(status: &DriftStatus) -> u8 {
    match status {
        DriftStatus::MajorDrift => 1,
        DriftStatus::MinorDrift => 2,
        DriftStatus::PatchDrift => 3,
        DriftStatus::Sync => 4,
        DriftStatus::Unknown => 5,
        DriftStatus::Unrecognized(_) => UNRANKED_PRIORITY,
    }
}

pub fn compare(
    a: &ComparisonResult,
    b: &ComparisonResult,
    key: SortKey,
    direction: SortDirection,
) -> Ordering {
    match key {
        SortKey::Status => {
            let (pa, pb) = (priority(&a.status), priority(&b.status));
            // unranked statuses sink to the bottom in both directions
            match (pa == UNRANKED_PRIORITY, pb == UNRANKED_PRIORITY) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => direction.apply(pa.cmp(&pb)),
            }
        }
        SortKey::Release => direction.apply(compare_text(&a.release.name, &b.release.name)),
        SortKey::Namespace => {
            direction.apply(compare_text(&a.release.namespace, &b.release.namespace))
        }
    }
}

/// Returns a stably sorted copy of `results`; the input is left untouched.
pub fn rank(
    results: &[ComparisonResult],
    key: SortKey,
    direction: SortDirection,
) -> Vec<ComparisonResult> {
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| compare(a, b, key, direction));
    ranked
}

/// Like [`rank`], but keeps backend order until a sort has been chosen.
pub fn rank_by_state(
    results: &[ComparisonResult],
    state: Option<SortState>,
) -> Vec<ComparisonResult> {
    match state {
        Some(state) => rank(results, state.key, state.direction),
        None => results.to_vec(),
    }
}

/// Clicking the active column flips its direction; any other column starts
/// ascending.
pub fn toggle_sort(current: Option<SortState>, key: SortKey) -> SortState {
    match current {
        Some(state) if state.key == key => SortState::new(key, state.direction.flip()),
        _ => SortState::new(key, SortDirection::Asc),
    }
}
