//! # Game Server - Core Application Controller
//!
//! The [`GameServer`] owns the TCP listener, the persistent
//! [`GameStore`](crate::storage::GameStore), and the maintenance schedule.
//! Clients speak a JSON-lines protocol: one request object per line in, one
//! response object per line out (see [`dispatch`]).
//!
//! ## Responsibilities
//!
//! - **Connections**: accepts TCP clients up to the configured cap; each
//!   connection runs in its own task with its own [`session::Session`]
//! - **Maintenance**: a periodic tick refreshes the quest pool and applies
//!   due boss respawns so the world moves even while nobody is playing
//! - **Shutdown**: Ctrl-C stops the accept loop and flushes the store

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use argon2::Params;
use chrono::Utc;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::game;
use crate::server::session::Session;
use crate::storage::{GameStore, GameStoreBuilder};

pub mod dispatch;
pub mod session;

macro_rules! sec_log {
    ($($arg:tt)*) => { log::warn!(target: "security", $($arg)*); };
}
#[allow(unused_imports)]
pub(crate) use sec_log;

pub struct GameServer {
    config: Config,
    store: Arc<GameStore>,
    connection_limiter: Arc<Semaphore>,
}

impl GameServer {
    /// Open the store and prepare the server. Does not bind the listener;
    /// that happens in [`run`](Self::run) so `status` and `admin-passwd`
    /// can reuse this constructor without touching the port.
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = GameStoreBuilder::new(config.storage.data_dir.as_str());
        if let Some(argon2) = config.security.as_ref().and_then(|s| s.argon2.as_ref()) {
            builder = builder.with_argon2_params(
                argon2.memory_kib.unwrap_or(Params::DEFAULT_M_COST),
                argon2.time_cost.unwrap_or(Params::DEFAULT_T_COST),
                argon2.parallelism.unwrap_or(Params::DEFAULT_P_COST),
            );
        }
        let store = builder
            .open()
            .with_context(|| format!("opening data directory {}", config.storage.data_dir))?;

        // The respawn delay rides on the persisted boss record so the engine
        // never reads the config; pick up config changes at startup.
        let mut boss = store.boss()?;
        if boss.respawn_delay_secs != config.game.boss_respawn_secs {
            boss.respawn_delay_secs = config.game.boss_respawn_secs;
            store.put_boss(&boss)?;
        }

        let connection_limiter = Arc::new(Semaphore::new(config.server.max_connections));
        Ok(Self {
            config,
            store: Arc::new(store),
            connection_limiter,
        })
    }

    pub fn store(&self) -> &Arc<GameStore> {
        &self.store
    }

    /// Bind the listener and serve until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.server.bind_addr)
            .await
            .with_context(|| format!("binding {}", self.config.server.bind_addr))?;
        info!(
            "gowork listening on {} ({} accounts on file)",
            self.config.server.bind_addr,
            self.store.account_count()
        );

        let mut maintenance = tokio::time::interval(Duration::from_secs(
            self.config.game.maintenance_interval_secs.max(1),
        ));
        maintenance.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Take a permit before accept() so over-cap clients wait in
                // the listen backlog instead of being greeted and dropped.
                accepted = async {
                    let permit = self
                        .connection_limiter
                        .clone()
                        .acquire_owned()
                        .await
                        .context("connection limiter closed")?;
                    let conn = listener.accept().await.context("accept failed")?;
                    Ok::<_, anyhow::Error>((permit, conn))
                } => {
                    match accepted {
                        Ok((permit, (stream, peer))) => {
                            debug!("accepted connection from {}", peer);
                            let store = Arc::clone(&self.store);
                            let config = self.config.clone();
                            tokio::spawn(async move {
                                let _permit = permit;
                                if let Err(e) = drive_connection(stream, peer, store, config).await {
                                    debug!("connection {} ended with error: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("accept error: {}", e);
                        }
                    }
                }

                _ = maintenance.tick() => {
                    self.run_maintenance();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown()
    }

    /// Background housekeeping: top up the quest pool and let the boss
    /// respawn if its timer has run out. Players trigger both on their own
    /// requests too, so a failed tick only delays the same work.
    fn run_maintenance(&self) {
        let now = Utc::now();
        match game::refresh_quest_pool(&self.store, now, &mut rand::thread_rng()) {
            Ok(0) => {}
            Ok(drawn) => info!("maintenance: drew {} quests onto the board", drawn),
            Err(e) => warn!("maintenance: quest refresh failed: {}", e),
        }
        if let Err(e) = game::boss_state(&self.store, now) {
            warn!("maintenance: boss respawn check failed: {}", e);
        }
    }

    /// One-shot status report for the `status` subcommand.
    pub fn show_status(&self) -> Result<()> {
        let now = Utc::now();
        let world = game::world_snapshot(&self.store, now)?;
        let pending = self.store.list_pending_submissions()?.len();

        println!("gowork data directory: {}", self.config.storage.data_dir);
        println!("  accounts:            {}", self.store.account_count());
        println!("  quests on the board: {}", world.quests.len());
        println!("  pending submissions: {}", pending);
        println!("  audit entries:       {}", self.store.audit_count());
        println!("  weather:             {}", world.weather.name());
        match &world.modifiers.active_event {
            Some(label) => println!("  global event:        {}", label),
            None => println!("  global event:        none"),
        }
        println!(
            "  overdrive:           {}",
            if world.overdrive { "ON" } else { "off" }
        );
        println!(
            "  boss:                {} ({}/{} HP{})",
            world.boss.name,
            world.boss.current_hp,
            world.boss.max_hp,
            if world.boss.active { "" } else { ", down" }
        );
        println!("  motd:                {}", world.motd);
        Ok(())
    }

    pub fn shutdown(&self) -> Result<()> {
        self.store.flush()?;
        info!("store flushed, shutting down");
        Ok(())
    }
}

/// Read lines, dispatch them, write responses. Runs in its own task; the
/// connection permit is held by the caller for as long as this future lives.
async fn drive_connection(
    stream: TcpStream,
    peer: SocketAddr,
    store: Arc<GameStore>,
    config: Config,
) -> Result<()> {
    let idle = Duration::from_secs(config.server.session_timeout_minutes.max(1) * 60);
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut session = Session::new(peer.to_string());
    debug!("session {} opened from {}", &session.id[..8], peer);

    loop {
        let line = match tokio::time::timeout(idle, lines.next_line()).await {
            Ok(Ok(Some(line))) => line,
            // Client hung up.
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                debug!("session {}: read error: {}", &session.id[..8], e);
                break;
            }
            Err(_) => {
                let farewell =
                    dispatch::Response::failure("timeout", "session closed after inactivity");
                let _ = send(&mut writer, &farewell).await;
                info!(
                    "session {} idled out ({})",
                    &session.id[..8],
                    session.display_name()
                );
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        session.update_activity();
        let response = dispatch::handle_line(&store, &config, &mut session, line);
        send(&mut writer, &response).await?;
        if session.close_requested() {
            break;
        }
    }

    info!(
        "session {} closed after {}s ({})",
        &session.id[..8],
        session.duration().num_seconds(),
        session.display_name()
    );
    Ok(())
}

async fn send(writer: &mut OwnedWriteHalf, response: &dispatch::Response) -> Result<()> {
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
