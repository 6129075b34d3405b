use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use ws_core::descriptors::{self, RenderedOutput};
use ws_core::models::RawReading;
use ws_core::quality::HealthStatus;
use ws_core::weather::{ForecastProvider, OpenMeteoClient, RefreshOutcome};
use ws_core::{ResetTarget, StateSeed, StationRegistry, TickOutcome, WsCoreConfig, logging};

const FORECAST_POLL: Duration = Duration::from_secs(60);

/// One request per stdin line
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum Command {
    Tick {
        station: String,
        readings: Vec<RawReading>,
        /// Defaults to the time the line was read
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    ResetRainBaseline {
        target: ResetTarget,
    },
    ExportState {
        station: String,
    },
}

/// One response per stdout line
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum Response {
    Snapshot {
        station: String,
        health: HealthStatus,
        outputs: BTreeMap<&'static str, RenderedOutput>,
    },
    Skipped {
        station: String,
    },
    Reset {
        stations: usize,
    },
    State {
        station: String,
        seed: StateSeed,
    },
    Error {
        message: String,
    },
}

fn handle(registry: &StationRegistry, command: Command) -> ws_core::Result<Response> {
    match command {
        Command::Tick {
            station,
            readings,
            at,
        } => {
            let now = at.unwrap_or_else(Utc::now);
            Ok(match registry.try_tick(&station, &readings, now)? {
                TickOutcome::Completed(snapshot) => Response::Snapshot {
                    station,
                    health: snapshot.health,
                    outputs: descriptors::render(&snapshot),
                },
                TickOutcome::Skipped => Response::Skipped { station },
            })
        }
        Command::ResetRainBaseline { target } => Ok(Response::Reset {
            stations: registry.reset_rain_baseline(&target)?,
        }),
        Command::ExportState { station } => {
            let handle = registry.get(&station).ok_or_else(|| {
                ws_core::WsCoreError::validation(format!("Unknown station '{station}'"))
            })?;
            Ok(Response::State {
                seed: handle.export_state(),
                station,
            })
        }
    }
}

/// Parse one line and run it off the reactor; ticks take the engine lock
async fn respond(registry: &Arc<StationRegistry>, line: &str) -> Response {
    let command = match serde_json::from_str::<Command>(line) {
        Ok(command) => command,
        Err(e) => {
            return Response::Error {
                message: format!("Invalid command: {e}"),
            };
        }
    };

    let registry = Arc::clone(registry);
    let result = match tokio::task::spawn_blocking(move || handle(&registry, command)).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Command task panicked");
            return Response::Error {
                message: "Internal error".to_string(),
            };
        }
    };

    result.unwrap_or_else(|e| {
        error!(error = %e, "Command failed");
        Response::Error {
            message: e.user_message(),
        }
    })
}

fn spawn_forecast_refresh(registry: Arc<StationRegistry>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(FORECAST_POLL);
        loop {
            ticker.tick().await;
            for (station, outcome) in registry.refresh_forecasts(Utc::now()).await {
                match outcome {
                    RefreshOutcome::NotDue | RefreshOutcome::InFlight => {}
                    other => debug!(%station, outcome = ?other, "Forecast refresh finished"),
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = WsCoreConfig::load_from_path(config_path).context("Failed to load configuration")?;
    logging::init(&config.logging)?;

    let provider: Option<Arc<dyn ForecastProvider>> = if config.forecast.enabled {
        Some(Arc::new(OpenMeteoClient::new(&config.forecast)?))
    } else {
        None
    };
    let registry = Arc::new(StationRegistry::from_config(&config, provider)?);
    if registry.is_empty() {
        warn!("No stations configured");
    }
    info!(stations = registry.len(), "Station registry ready");

    if config.forecast.enabled {
        spawn_forecast_refresh(Arc::clone(&registry));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = respond(&registry, &line).await;

        let mut out = serde_json::to_vec(&response).context("Failed to encode response")?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    info!("Input closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ws_core::StationConfig;

    fn registry() -> Arc<StationRegistry> {
        let config = WsCoreConfig {
            stations: vec![StationConfig::new("roof")],
            ..WsCoreConfig::default()
        };
        Arc::new(StationRegistry::from_config(&config, None).unwrap())
    }

    #[tokio::test]
    async fn test_tick_line_renders_snapshot() {
        let registry = registry();
        let line = r#"{"command":"tick","station":"roof","at":"2026-05-01T12:00:00Z","readings":[{"kind":"temperature","value":21.5,"unit":"°C","timestamp":"2026-05-01T12:00:00Z"}]}"#;
        match respond(&registry, line).await {
            Response::Snapshot { station, outputs, .. } => {
                assert_eq!(station, "roof");
                assert!(outputs.contains_key("temperature"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(registry.get("roof").unwrap().latest().is_some());
    }

    #[tokio::test]
    async fn test_bad_lines_become_error_responses() {
        let registry = registry();
        assert!(matches!(
            respond(&registry, "not json").await,
            Response::Error { .. }
        ));
        let unknown = r#"{"command":"export_state","station":"cellar"}"#;
        match respond(&registry, unknown).await {
            Response::Error { message } => assert!(message.contains("cellar"), "{message}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
