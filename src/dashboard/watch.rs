use std::str::FromStr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::dashboard::client::ReleasesClient;
use crate::dashboard::DashboardState;
use crate::ranking::SortKey;

/// Keyboard input while watching, one command per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardCommand {
    Refresh,
    Toggle(SortKey),
    Quit,
}

impl FromStr for DashboardCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "r" | "refresh" => Ok(Self::Refresh),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "s" => Ok(Self::Toggle(SortKey::Status)),
            "n" => Ok(Self::Toggle(SortKey::Release)),
            "ns" => Ok(Self::Toggle(SortKey::Namespace)),
            other => SortKey::from_str(other)
                .map(Self::Toggle)
                .map_err(|e| e.to_string()),
        }
    }
}

/// Polls the releases API every `interval` and on demand. Each fetch or
/// sort change triggers `render`. `max_fetches == 0` runs until `Quit`.
pub async fn run_watch<F>(
    client: &ReleasesClient,
    state: &mut DashboardState,
    interval: Duration,
    max_fetches: u32,
    mut commands: mpsc::Receiver<DashboardCommand>,
    mut render: F,
) where
    F: FnMut(&DashboardState),
{
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut commands_open = true;
    let mut fetches = 0u32;

    loop {
        let refresh = tokio::select! {
            _ = ticker.tick() => true,
            command = commands.recv(), if commands_open => match command {
                Some(DashboardCommand::Refresh) => {
                    ticker.reset();
                    true
                }
                Some(DashboardCommand::Toggle(key)) => {
                    let next = state.toggle(key);
                    debug!(key = %next.key, direction = %next.direction, "sort changed");
                    render(state);
                    false
                }
                Some(DashboardCommand::Quit) => break,
                None => {
                    commands_open = false;
                    false
                }
            },
        };
        if !refresh {
            continue;
        }

        let outcome = client.fetch().await;
        if let Err(err) = &outcome {
            warn!("failed to load releases from {}: {err}", client.url());
        }
        state.apply_fetch(outcome);
        render(state);

        fetches += 1;
        if max_fetches > 0 && fetches >= max_fetches {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use crate::dashboard::client::ReleasesClient;
    use crate::dashboard::watch::{run_watch, DashboardCommand};
    use crate::dashboard::DashboardState;
    use crate::model::fixtures::release;
    use crate::ranking::{SortDirection, SortKey};
    use crate::scout::fakes::StaticSource;
    use crate::scout::Scout;
    use crate::server::testing::spawn_api;
    use crate::upstream::fakes::StaticResolver;

    async fn client() -> ReleasesClient {
        let scout = Scout::new(
            Arc::new(StaticSource(Ok(vec![
                release("default", "web"),
                release("argo", "api"),
            ]))),
            Arc::new(StaticResolver::default().with("web", "2.0.0", "2.0.0")),
        );
        let base = spawn_api(scout).await;
        ReleasesClient::new(&format!("{base}/api/v1"), Duration::from_secs(5))
            .expect("client build failed")
    }

    #[test]
    fn parses_commands() {
        assert_eq!(DashboardCommand::from_str(""), Ok(DashboardCommand::Refresh));
        assert_eq!(DashboardCommand::from_str("q"), Ok(DashboardCommand::Quit));
        assert_eq!(
            DashboardCommand::from_str("ns"),
            Ok(DashboardCommand::Toggle(SortKey::Namespace))
        );
        assert_eq!(
            DashboardCommand::from_str("release"),
            Ok(DashboardCommand::Toggle(SortKey::Release))
        );
        assert!(DashboardCommand::from_str("chart").is_err());
    }

    #[tokio::test]
    async fn stops_after_requested_fetches() {
        let client = client().await;
        let (_tx, rx) = mpsc::channel(4);
        let mut state = DashboardState::default();
        let mut renders = 0;
        run_watch(&client, &mut state, Duration::from_millis(10), 2, rx, |_| {
            renders += 1
        })
        .await;
        assert_eq!(renders, 2);
        assert_eq!(state.total(), 2);
        assert!(!state.is_error());
    }

    #[tokio::test]
    async fn applies_commands_until_quit() {
        let client = client().await;
        let (tx, rx) = mpsc::channel(4);
        tx.send(DashboardCommand::Toggle(SortKey::Status)).await.unwrap();
        tx.send(DashboardCommand::Toggle(SortKey::Status)).await.unwrap();
        tx.send(DashboardCommand::Quit).await.unwrap();

        let mut state = DashboardState::default();
        run_watch(&client, &mut state, Duration::from_secs(3600), 0, rx, |_| {}).await;
        let sort = state.sort().expect("sort not set");
        assert_eq!(sort.key, SortKey::Status);
        assert_eq!(sort.direction, SortDirection::Desc);
    }
}
