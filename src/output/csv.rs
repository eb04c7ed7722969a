use anyhow::Result;

use crate::model::ComparisonResult;

pub fn releases_to_csv(results: &[ComparisonResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "namespace",
        "release",
        "chart",
        "chart_version",
        "app_version",
        "latest_version",
        "latest_app_version",
        "status",
        "upstream_url",
        "icon",
        "checked_at",
    ])?;
    for result in results {
        let release = &result.release;
        writer.write_record([
            release.namespace.as_str(),
            release.name.as_str(),
            release.chart_name.as_str(),
            release.chart_version.as_str(),
            release.app_version.as_str(),
            result.latest_version.as_str(),
            result.latest_app_version.as_str(),
            result.status.as_str(),
            result.upstream_url.as_str(),
            release.icon.as_deref().unwrap_or(""),
            &result.checked_at.to_rfc3339(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
