// Draftboard entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr)
// 2. Load config
// 3. Build the session manager over the player CSV and the Sleeper client
// 4. Spawn the idle-session reaper
// 5. Run the live assistant when `live.draft_id` is set, self-play otherwise
// 6. Stop the reaper on exit or Ctrl-C

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use draftboard_app::config::{self, Config};
use draftboard_app::live::SleeperClient;
use draftboard_app::protocol::StartRequest;
use draftboard_app::{SessionError, SessionManager, WaitOutcome};
use draftboard_core::pool::CsvPoolProvider;
use draftboard_core::DraftError;
use tokio::sync::watch;
use tracing::{info, warn};

/// Recommendations logged at each live turn.
const TOP_RECOMMENDATIONS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Draftboard starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} teams, {} rounds, {} {}, pick slot {}",
        config.league.teams,
        config.league.rounds,
        config.league.format,
        config.league.order,
        config.league.pick_slot
    );

    let sleeper = SleeperClient::new(
        &config.sleeper.base_url,
        Duration::from_secs(config.sleeper.timeout_secs),
    )
    .context("failed to build live draft client")?;
    let manager = Arc::new(SessionManager::new(
        config.clone(),
        Arc::new(CsvPoolProvider::new(&config.data_paths.players)),
        Arc::new(sleeper),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = manager.spawn_reaper(shutdown_rx);

    let result = tokio::select! {
        res = run(&manager, &config) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            Ok(())
        }
    };

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper).await;
    info!("Draftboard shut down cleanly");
    result
}

async fn run(manager: &SessionManager, config: &Config) -> anyhow::Result<()> {
    match config.live.draft_id.as_deref() {
        Some(draft_id) => run_live(manager, config, draft_id).await,
        None => run_self_play(manager, config).await,
    }
}

/// Draft every team, the user's included, until the board is exhausted.
async fn run_self_play(manager: &SessionManager, config: &Config) -> anyhow::Result<()> {
    let session_id = manager
        .start(StartRequest {
            pick_slot: config.league.pick_slot,
            non_interactive: true,
            ..StartRequest::default()
        })
        .await
        .context("failed to start self-play session")?
        .session_id;
    info!("Self-play session {}", session_id);

    loop {
        match manager.apply_cpu_pick(&session_id).await {
            Ok(pick) => info!(
                "Pick {:>3}: team {:>2} takes {} ({})",
                pick.new_pick_number - 1,
                pick.team,
                pick.player_name,
                pick.position
            ),
            Err(SessionError::Draft(DraftError::DraftComplete)) => break,
            Err(e) => return Err(e).context("self-play pick failed"),
        }
    }

    info!("Draft complete. Your roster:");
    for slot in manager.user_roster(&session_id).await? {
        match (slot.player_name, slot.position) {
            (Some(name), Some(position)) => info!("  {:<5} {} ({})", slot.slot, name, position),
            _ => info!("  {:<5} (empty)", slot.slot),
        }
    }
    manager.close(&session_id).await?;
    Ok(())
}

/// Follow a live draft room, logging recommendations whenever the user is
/// on the clock.
async fn run_live(manager: &SessionManager, config: &Config, draft_id: &str) -> anyhow::Result<()> {
    let session_id = manager
        .start(StartRequest {
            pick_slot: config.league.pick_slot,
            live_draft_id: Some(draft_id.to_string()),
            ..StartRequest::default()
        })
        .await
        .with_context(|| format!("failed to join live draft {draft_id}"))?
        .session_id;
    info!("Following live draft {} as session {}", draft_id, session_id);

    loop {
        match manager.wait_for_user_turn(&session_id).await? {
            WaitOutcome::UserTurn => {}
            WaitOutcome::DraftComplete => {
                info!("Live draft complete");
                break;
            }
            WaitOutcome::Cancelled => break,
        }

        let state = manager.get_state(&session_id, None, Some("VONA")).await?;
        info!("You are on the clock at pick {}", state.pick_number);
        for (rank, player) in state.available_players.iter().take(TOP_RECOMMENDATIONS).enumerate() {
            info!(
                "  {}. {} ({}) VONA {:.1}, VORP {:.1}, ADP {}",
                rank + 1,
                player.name,
                player.position,
                player.vona.unwrap_or(0.0),
                player.vorp,
                player.adp.map_or_else(|| "-".to_string(), |a| format!("{a:.1}"))
            );
        }

        wait_for_pick_after(manager, config, &session_id, state.pick_number).await?;
    }

    manager.close(&session_id).await?;
    Ok(())
}

/// Poll until the room reports a pick at or beyond `pick`.
async fn wait_for_pick_after(
    manager: &SessionManager,
    config: &Config,
    session_id: &str,
    pick: u32,
) -> anyhow::Result<()> {
    let mut interval =
        tokio::time::interval(Duration::from_secs(config.strategy.session.poll_interval_secs));
    interval.tick().await;
    loop {
        interval.tick().await;
        match manager.poll_live(session_id).await {
            Ok(result) if result.new_pick_number > pick => return Ok(()),
            Ok(_) => {}
            Err(SessionError::UpstreamUnavailable(e)) => warn!("Live poll failed, retrying: {}", e),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Initialize tracing to stderr.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draftboard=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
