//! # gowork - Gamified Attendance and Progression Server
//!
//! gowork turns a small team's attendance tracking into a persistent game.
//! Clocking in and out earns XP, gold, and streaks; the rest of the loop is
//! built on top: a skill tree, a shop with pets and avatar gear, a daily
//! prize wheel, quests with manager approval, and a shared boss the whole
//! team chips away at.
//!
//! ## Features
//!
//! - **Attendance**: Clock-in classification (early bird, critical hit,
//!   on-time, late), consecutive-day streaks, and CSV export for payroll.
//! - **Progression**: Leveling with XP rollover, skill points, a fixed skill
//!   tree of passive bonuses, and achievements.
//! - **Economy**: Work and break actions, a shop, an inventory, pets that
//!   feed on gold, a daily wheel, a mystery box, and an arcade.
//! - **Cooperation**: Quests with a submit-approve-reject lifecycle, kudos,
//!   a leaderboard, team statistics, and a shared boss with lazy respawn.
//! - **World State**: Weather, global events (2x XP / 2x gold), overdrive,
//!   and a message of the day, all manager-controlled and server-side.
//! - **Security**: Argon2id password hashing, role-based access control
//!   (Employee, Moderator, Manager), bans that cut live sessions, and an
//!   append-only audit log.
//! - **Async Design**: A Tokio TCP server speaking one JSON object per line.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gowork::config::Config;
//! use gowork::server::GameServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load("config.toml").await?;
//!
//!     // Open the store and serve until Ctrl-C
//!     let server = GameServer::new(config)?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`server`] - TCP listener, sessions, and the JSON-lines protocol
//! - [`game`] - All game rules: attendance, rewards, quests, the boss
//! - [`storage`] - Persistence layer over sled (accounts, records, globals)
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Input validation and sanitization utilities
//! - [`logutil`] - Log-escaping helpers for player-supplied text
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Game Server   │ ← Connections, sessions, dispatch
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Game Engine   │ ← Rules, rewards, invariants
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Storage       │ ← sled trees, locks, audit
//! │   Layer         │
//! └─────────────────┘
//! ```

pub mod config;
pub mod game;
pub mod logutil;
pub mod server;
pub mod storage;
pub mod validation;
