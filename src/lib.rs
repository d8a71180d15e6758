//! # Timeup - per-domain browsing time tracking
//!
//! A session and activity-state engine for browser hosts. It follows the
//! focused tab, decides whether the user is actually there, and credits the
//! elapsed time to daily, weekly and total counters per domain.
//!
//! ## Features
//!
//! - **Sessions**: One live session bound to the active tab and its domain
//! - **Idle Detection**: Host idle/lock state, page activity probes and media playback
//! - **Accounting**: Periodic flushes into daily, weekly and lifetime buckets
//! - **Limits**: Throttled notifications when daily or weekly limits are exceeded
//! - **Rollover**: Midnight and Monday pruning of old buckets
//!
//! ## Usage
//!
//! ```rust,no_run
//! use timeup::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod commands;
pub mod db;
pub mod libs;
