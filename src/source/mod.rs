//! Interface Snapshot Source
//!
//! The source is the OS-facing side of ifwatch: it enumerates network
//! interfaces and reports their cumulative traffic counters, static
//! configuration, and link state. It keeps no state between calls.
//!
//! The [`InterfaceSource`] trait is the seam the stats service samples through.
//! [`SystemSource`] is the OS-backed implementation:
//!
//! | Platform | Counters     | Config (MAC/MTU/flags)  | Addresses   | Link state   |
//! |----------|--------------|-------------------------|-------------|--------------|
//! | Linux    | sysfs        | sysfs                   | getifaddrs  | sysfs        |
//! | macOS    | getifaddrs   | getifaddrs (`AF_LINK`)  | getifaddrs  | `IFF_UP`     |
//! | Windows  | GetIfTable2  | GetIfTable2             | ❌          | OperStatus   |
//! | Other    | ❌           | ❌                      | ❌          | ❌           |
//!
//! Counters on macOS come from the 32-bit `if_data` record and wrap at 4 GiB;
//! the stats service treats a wrap as a counter reset.
//!
//! # Failure policy
//!
//! A failing [`InterfaceSource::list_counters`] means the whole sample is
//! unusable. Per-interface lookups fail in isolation; callers go through
//! [`config_or_default`] and [`link_up_or_default`], which log and degrade to
//! an empty config and `false`.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(any(target_os = "linux", target_os = "macos"))]
mod unix;
#[cfg(target_os = "windows")]
mod windows;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(target_os = "linux")]
pub use linux::SystemSource;
#[cfg(target_os = "macos")]
pub use macos::SystemSource;
#[cfg(target_os = "windows")]
pub use windows::SystemSource;

/// Named interface flag, as reported in [`InterfaceConfig::flags`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceFlag {
    /// Administratively up
    Up,
    /// Supports broadcast
    Broadcast,
    /// Loopback interface
    Loopback,
    /// Point-to-point link
    PointToPoint,
    /// Supports multicast
    Multicast,
}

impl InterfaceFlag {
    /// All flags, in reporting order
    pub const ALL: [InterfaceFlag; 5] = [
        InterfaceFlag::Up,
        InterfaceFlag::Broadcast,
        InterfaceFlag::Loopback,
        InterfaceFlag::PointToPoint,
        InterfaceFlag::Multicast,
    ];

    /// Lowercase name of the flag
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceFlag::Up => "up",
            InterfaceFlag::Broadcast => "broadcast",
            InterfaceFlag::Loopback => "loopback",
            InterfaceFlag::PointToPoint => "pointtopoint",
            InterfaceFlag::Multicast => "multicast",
        }
    }
}

impl fmt::Display for InterfaceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static configuration of an interface, captured once per refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Hardware (MAC) address, empty if unknown
    pub hardware_addr: String,
    /// Maximum Transmission Unit, 0 if unknown
    pub mtu: u32,
    /// Flags set on the interface
    pub flags: Vec<InterfaceFlag>,
    /// Assigned addresses in `ip/prefix` form
    pub addrs: Vec<String>,
}

impl InterfaceConfig {
    /// Check whether `flag` is set
    pub fn has_flag(&self, flag: InterfaceFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Raw cumulative counters for one interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    /// Interface name (e.g., "eth0", "wlan0")
    pub name: String,
    /// Bytes transmitted
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_recv: u64,
    /// Packets transmitted
    pub packets_sent: u64,
    /// Packets received
    pub packets_recv: u64,
}

/// Provider of interface counters and details
///
/// Implementations must be read-only and idempotent: calling any method has no
/// effect beyond querying the OS.
pub trait InterfaceSource: Send + Sync {
    /// Cumulative counters for every interface currently present
    ///
    /// Fails with [`Error::SourceUnavailable`](crate::Error::SourceUnavailable)
    /// when the OS cannot be queried at all.
    fn list_counters(&self) -> Result<Vec<InterfaceCounters>>;

    /// Static configuration of interface `name`
    fn config(&self, name: &str) -> Result<InterfaceConfig>;

    /// Whether interface `name` is up
    fn is_link_up(&self, name: &str) -> Result<bool>;
}

impl<S: InterfaceSource + ?Sized> InterfaceSource for Box<S> {
    fn list_counters(&self) -> Result<Vec<InterfaceCounters>> {
        (**self).list_counters()
    }

    fn config(&self, name: &str) -> Result<InterfaceConfig> {
        (**self).config(name)
    }

    fn is_link_up(&self, name: &str) -> Result<bool> {
        (**self).is_link_up(name)
    }
}

/// Fetch the configuration of `name`, logging and returning the empty config on failure
pub fn config_or_default<S: InterfaceSource + ?Sized>(source: &S, name: &str) -> InterfaceConfig {
    source.config(name).unwrap_or_else(|e| {
        log::warn!("Error getting config for interface {}: {}", name, e);
        InterfaceConfig::default()
    })
}

/// Fetch the link state of `name`, logging and returning `false` on failure
pub fn link_up_or_default<S: InterfaceSource + ?Sized>(source: &S, name: &str) -> bool {
    source.is_link_up(name).unwrap_or_else(|e| {
        log::warn!("Error getting link state for interface {}: {}", name, e);
        false
    })
}

/// Colon-separated lowercase hex; empty when there is no link-layer address
#[cfg_attr(
    not(any(target_os = "linux", target_os = "macos", target_os = "windows")),
    allow(dead_code)
)]
pub(crate) fn format_hardware_addr(bytes: &[u8]) -> String {
    if bytes.iter().all(|&b| b == 0) {
        return String::new();
    }
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

// Platforms without an OS backend report every query as unavailable
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod unsupported {
    use super::*;
    use crate::error::Error;

    /// OS-backed interface source (unsupported on this platform)
    #[derive(Debug, Clone, Default)]
    pub struct SystemSource;

    impl SystemSource {
        /// Create a new system source
        pub fn new() -> Self {
            Self
        }
    }

    impl InterfaceSource for SystemSource {
        fn list_counters(&self) -> Result<Vec<InterfaceCounters>> {
            Err(Error::SourceUnavailable(
                "Interface monitoring not supported on this platform".to_string(),
            ))
        }

        fn config(&self, name: &str) -> Result<InterfaceConfig> {
            Err(Error::detail(name, "unsupported platform"))
        }

        fn is_link_up(&self, name: &str) -> Result<bool> {
            Err(Error::detail(name, "unsupported platform"))
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub use unsupported::SystemSource;
