//! Core library modules for timeup.
//!
//! ## Features
//!
//! - **Core Infrastructure**: Configuration, data storage, messaging, clock
//! - **Signals**: Resource parsing, page probes, host idle state, the bridge protocol
//! - **Tracking**: Idle state machine, sessions, accumulation, rollover, the engine loop
//! - **Limits**: Threshold checks and throttled notifications
//! - **User Interface**: Console tables and duration formatting
//!
//! ## Usage
//!
//! ```rust,no_run
//! use timeup::libs::resource::Resource;
//!
//! let resource = Resource::parse(Some("https://www.youtube.com/watch?v=1"))?;
//! assert_eq!(resource.domain, "youtube.com");
//! # Ok::<(), timeup::libs::resource::ResourceError>(())
//! ```

pub mod accumulator;
pub mod activity;
pub mod bridge;
pub mod clock;
pub mod config;
pub mod data_storage;
pub mod domain;
pub mod engine;
pub mod formatter;
pub mod idle;
pub mod messages;
pub mod notifier;
pub mod resource;
pub mod rollover;
pub mod session;
pub mod view;
