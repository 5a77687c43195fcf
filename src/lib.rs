//! # ifwatch
//!
//! Periodic per-interface network traffic sampling with a live query endpoint.
//!
//! ifwatch reads cumulative traffic counters for every network interface on a
//! fixed interval, derives send/receive rates from consecutive samples, and
//! publishes each sample as an immutable snapshot that any number of readers
//! can query while the next one is being collected.
//!
//! ## Features
//!
//! - **Interface Snapshot Source**: counters, MAC, MTU, flags, addresses and
//!   link state from sysfs and `getifaddrs(3)` on Linux, `getifaddrs(3)` on
//!   macOS, and `GetIfTable2` on Windows
//! - **Stats Service**: background refresh with torn-read-free publication
//! - **Query Server** (`server` feature): GraphQL endpoint plus a GraphiQL
//!   exploration page
//!
//! ## Quick Start
//!
//! ```no_run
//! use ifwatch::{StatsConfig, StatsService, SystemSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = StatsService::new(SystemSource::new(), &StatsConfig::default())?;
//!
//! for iface in service.interfaces() {
//!     println!("{} ({}): {} bytes received, {:.1} B/s",
//!         iface.name,
//!         if iface.link_up { "UP" } else { "DOWN" },
//!         iface.bytes_received,
//!         iface.speed_received
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Command-line parsing and logging setup for the binary
//! - `server` - HTTP query server (default)

pub mod config; // Configuration management with TOML persistence
pub mod error;
pub mod service; // Background sampling and snapshot publication
pub mod source; // OS interface enumeration and counters

#[cfg(feature = "server")]
pub mod web; // GraphQL query endpoint

pub use config::{Config, ServerConfig, StatsConfig};
pub use error::{Error, Result};
pub use service::{InterfaceStats, Snapshot, StatsService, DEFAULT_REFRESH_INTERVAL};
pub use source::{
    config_or_default, link_up_or_default, InterfaceConfig, InterfaceCounters, InterfaceFlag,
    InterfaceSource, SystemSource,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
