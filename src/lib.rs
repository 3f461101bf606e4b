//! # Settlerbot - a scavenging and theft game bot for chat platforms
//!
//! Settlerbot manages a per-user item inventory with scavenging, trading,
//! gifting, and theft mechanics, backed by a local SQLite store. The heart
//! of the crate is the transaction engine: every command that mutates shared
//! inventory state runs as one serializable SQL transaction, so items move
//! between owners without ever being duplicated or silently lost.
//!
//! ## Features
//!
//! - **Scavenging**: five locations with fixed loot tables, a 1-in-20 secret
//!   roll, and one location that provokes a theft attempt on every visit.
//! - **Theft mechanics**: random-item theft with protective gadgets that
//!   block (and are consumed by) one attempt, a ledger of stolen items, and
//!   a unique retrieval item that reverses the most recent theft.
//! - **Trading and gifting**: one-instance-at-a-time trades, plus a
//!   privileged mint-style give command.
//! - **Mini-games**: a stateless slot machine.
//! - **Async design**: built with Tokio; platform adapters drain an outgoing
//!   message queue and feed parsed commands in.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use settlerbot::bot::{Bot, Command, StaticRoster};
//! use settlerbot::engine::Engine;
//! use settlerbot::store::Store;
//! use tokio::sync::mpsc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = Arc::new(Store::open("data/inventory.db")?);
//! let engine = Arc::new(Engine::new(store, 1234));
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let bot = Bot::new(engine, vec![1234], Arc::new(StaticRoster(vec![])), tx);
//!
//! bot.handle(42, Command::Scavenge { location: "eden".into() });
//! while let Ok(msg) = rx.try_recv() {
//!     println!("{:?}", msg);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`bot`] - Command surface, response routing, and the outgoing queue
//! - [`engine`] - The inventory/theft transaction engine and the slot machine
//! - [`store`] - SQLite persistence for inventories and the theft ledger
//! - [`catalog`] - Static locations, loot tables, and special items
//! - [`config`] - Configuration management

pub mod bot;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod store;
