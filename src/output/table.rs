use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::dashboard::{BadgeColor, DashboardRow, DashboardState};
use crate::ranking::{SortDirection, SortKey, SortState};
use crate::scout::DriftSummary;

const LOADING_MESSAGE: &str = "Loading releases...";
const ERROR_MESSAGE: &str = "Failed to load releases. Is the backend running?";

fn badge_color(color: BadgeColor) -> Color {
    match color {
        BadgeColor::Green => Color::Green,
        BadgeColor::Blue => Color::Blue,
        BadgeColor::Yellow => Color::Yellow,
        BadgeColor::Red => Color::Red,
        BadgeColor::Gray => Color::Grey,
    }
}

/// Arrow shown next to the active sort column header.
fn header(label: &str, key: SortKey, sort: Option<SortState>) -> String {
    match sort {
        Some(state) if state.key == key => {
            let arrow = match state.direction {
                SortDirection::Asc => "▲",
                SortDirection::Desc => "▼",
            };
            format!("{label} {arrow}")
        }
        _ => label.to_string(),
    }
}

fn dash_if_empty(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

pub fn render_releases_table(rows: &[DashboardRow], sort: Option<SortState>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        header("Status", SortKey::Status, sort),
        header("Release", SortKey::Release, sort),
        header("Namespace", SortKey::Namespace, sort),
        "Current".to_string(),
        "Latest".to_string(),
        "Upstream".to_string(),
        "Icon".to_string(),
    ]);

    for row in rows {
        let status = Cell::new(format!("{} {}", row.badge.symbol(), row.badge.label()))
            .fg(badge_color(row.badge.color()));
        let release = if row.chart_name == row.release_name {
            row.release_name.clone()
        } else {
            format!("{} ({})", row.release_name, row.chart_name)
        };
        table.add_row(Row::from(vec![
            status,
            Cell::new(release),
            Cell::new(&row.namespace),
            Cell::new(format!(
                "{} / app {}",
                dash_if_empty(&row.current_version),
                dash_if_empty(&row.current_app_version)
            )),
            Cell::new(format!(
                "{} / app {}",
                dash_if_empty(&row.latest_version),
                dash_if_empty(&row.latest_app_version)
            )),
            Cell::new(row.upstream_url.as_deref().unwrap_or("-")),
            Cell::new(row.icon.as_deref().unwrap_or("-")),
        ]));
    }
    table.to_string()
}

pub fn render_summary(summary: &DriftSummary) -> String {
    format!(
        "{} releases: {} in sync, {} patch, {} minor, {} major, {} unknown",
        summary.total, summary.sync, summary.patch, summary.minor, summary.major, summary.unknown
    )
}

/// Full watch screen: heading, then either the loading line, the error
/// banner above the last known-good table, or the table alone.
pub fn render_dashboard(state: &DashboardState) -> String {
    let mut out = String::from("Helm Release Dashboard\n");
    let sort = match state.sort() {
        Some(sort) => format!("sorted by {} {}", sort.key, sort.direction),
        None => "unsorted".to_string(),
    };
    match state.fetched_at() {
        Some(at) => out.push_str(&format!(
            "{} releases, {sort}, updated {}\n",
            state.total(),
            at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        None => out.push_str(&format!("{sort}\n")),
    }

    if state.is_loading() {
        out.push_str(LOADING_MESSAGE);
        return out;
    }
    if let Some(err) = state.last_error() {
        out.push_str(&format!("{ERROR_MESSAGE} ({err})\n"));
        if state.fetched_at().is_none() {
            return out;
        }
    }
    out.push_str(&render_releases_table(&state.rows(), state.sort()));
    out.push_str("\n[s] status  [n] release  [ns] namespace  [r] refresh  [q] quit");
    out
}

#[cfg(test)]
mod tests {
    use crate::dashboard::{rows_for, DashboardState};
    use crate::error::FetchError;
    use crate::model::fixtures::result;
    use crate::model::DriftStatus;
    use crate::output::table::{render_dashboard, render_releases_table, render_summary};
    use crate::ranking::{SortDirection, SortKey, SortState};
    use crate::scout::DriftSummary;

    #[test]
    fn marks_active_sort_column() {
        let results = vec![result("argo", "argocd", DriftStatus::MajorDrift)];
        let sort = Some(SortState::new(SortKey::Namespace, SortDirection::Desc));
        let table = render_releases_table(&rows_for(&results, sort), sort);
        assert!(table.contains("Namespace ▼"));
        assert!(!table.contains("Status ▲"));
        assert!(table.contains("Major Drift"));
        assert!(table.contains("argocd"));
    }

    #[test]
    fn shows_icon_link_when_known() {
        let mut item = result("keda", "keda", DriftStatus::Sync);
        item.release.icon = Some("https://ah.io/image/k1".to_string());
        let table = render_releases_table(&rows_for(&[item], None), None);
        assert!(table.contains("Icon"));
        assert!(table.contains("https://ah.io/image/k1"));
    }

    #[test]
    fn summary_lists_every_bucket() {
        let summary = DriftSummary::from_results(&[
            result("a", "x", DriftStatus::Sync),
            result("a", "y", DriftStatus::MinorDrift),
        ]);
        assert_eq!(
            render_summary(&summary),
            "2 releases: 1 in sync, 0 patch, 1 minor, 0 major, 0 unknown"
        );
    }

    #[test]
    fn dashboard_reports_loading_then_error() {
        let mut state = DashboardState::default();
        assert!(render_dashboard(&state).contains("Loading releases..."));

        state.apply_fetch(Err(FetchError::Network("connection refused".to_string())));
        let screen = render_dashboard(&state);
        assert!(screen.contains("Failed to load releases. Is the backend running?"));
        assert!(!screen.contains("Namespace"));
    }

    #[test]
    fn dashboard_keeps_table_under_error_banner() {
        let mut state = DashboardState::default();
        state.apply_fetch(Ok(vec![result("default", "web", DriftStatus::Sync)]));
        state.apply_fetch(Err(FetchError::Http {
            status: 500,
            message: "boom".to_string(),
        }));
        let screen = render_dashboard(&state);
        assert!(screen.contains("Failed to load releases"));
        assert!(screen.contains("web"));
        assert!(screen.contains("unsorted"));
    }
}
