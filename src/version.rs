use semver::{BuildMetadata, Version};

use crate::model::DriftStatus;

/// Parses chart versions the way chart authors write them: an optional
/// `v` prefix and missing minor or patch components are accepted.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(version) = Version::parse(trimmed) {
        return Some(strip_build(version));
    }

    let split = trimmed.find(|c| c == '-' || c == '+').unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(split);
    let components = core.split('.').count();
    if components >= 3 {
        return None;
    }
    let padded = format!("{core}{}{rest}", ".0".repeat(3 - components));
    Version::parse(&padded).ok().map(strip_build)
}

/// Build metadata carries no precedence.
fn strip_build(mut version: Version) -> Version {
    version.build = BuildMetadata::EMPTY;
    version
}

pub fn classify(current: &str, latest: &str) -> DriftStatus {
    let (Some(current), Some(latest)) = (parse_lenient(current), parse_lenient(latest)) else {
        return DriftStatus::Unknown;
    };

    // a deployment ahead of upstream counts as in sync
    if latest <= current {
        return DriftStatus::Sync;
    }
    if latest.major > current.major {
        DriftStatus::MajorDrift
    } else if latest.minor > current.minor {
        DriftStatus::MinorDrift
    } else {
        DriftStatus::PatchDrift
    }
}
