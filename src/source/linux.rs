//! Linux interface source backed by sysfs and getifaddrs(3)
//!
//! - **statistics/**: RX/TX bytes and packets
//! - **flags**: `IFF_*` bitmask (hex), used for flags and link state
//! - **mtu**: Maximum Transmission Unit
//! - **address**: MAC address

use super::unix::{flags_from_bits, read_addresses};
use super::{format_hardware_addr, InterfaceConfig, InterfaceCounters, InterfaceSource};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default sysfs network class directory
pub const SYS_CLASS_NET: &str = "/sys/class/net";

/// OS-backed interface source
#[derive(Debug, Clone)]
pub struct SystemSource {
    root: PathBuf,
}

impl SystemSource {
    /// Create a source reading from `/sys/class/net`
    pub fn new() -> Self {
        Self::with_root(SYS_CLASS_NET)
    }

    /// Create a source reading from an alternate sysfs network directory
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn iface_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        if name.is_empty() || name.contains('/') || !dir.is_dir() {
            return Err(Error::detail(name, "no such interface"));
        }
        Ok(dir)
    }

    fn read_counters(&self, name: &str) -> Result<InterfaceCounters> {
        let stats_path = self.root.join(name).join("statistics");
        Ok(InterfaceCounters {
            name: name.to_string(),
            bytes_sent: read_stat(&stats_path, "tx_bytes")?,
            bytes_recv: read_stat(&stats_path, "rx_bytes")?,
            packets_sent: read_stat(&stats_path, "tx_packets")?,
            packets_recv: read_stat(&stats_path, "rx_packets")?,
        })
    }

    fn read_flags(&self, name: &str) -> Result<libc::c_int> {
        let dir = self.iface_dir(name)?;
        let raw = fs::read_to_string(dir.join("flags")).map_err(|e| Error::detail(name, e))?;
        parse_flags(&raw).map_err(|e| Error::detail(name, e))
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceSource for SystemSource {
    fn list_counters(&self) -> Result<Vec<InterfaceCounters>> {
        if !self.root.exists() {
            return Err(Error::SourceUnavailable(format!(
                "{} not available",
                self.root.display()
            )));
        }

        let entries = fs::read_dir(&self.root).map_err(|e| {
            Error::SourceUnavailable(format!("Failed to read {}: {}", self.root.display(), e))
        })?;

        let mut counters = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::SourceUnavailable(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();

            // Interfaces can vanish between readdir and the statistics reads
            match self.read_counters(&name) {
                Ok(c) => counters.push(c),
                Err(e) => log::debug!("Skipping interface {}: {}", name, e),
            }
        }

        Ok(counters)
    }

    fn config(&self, name: &str) -> Result<InterfaceConfig> {
        let dir = self.iface_dir(name)?;
        let bits = self.read_flags(name)?;

        let mtu = fs::read_to_string(dir.join("mtu"))
            .map_err(|e| Error::detail(name, e))?
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::detail(name, format!("Failed to parse mtu: {}", e)))?;

        Ok(InterfaceConfig {
            hardware_addr: read_hardware_addr(&dir),
            mtu,
            flags: flags_from_bits(bits),
            addrs: read_addresses(name)?,
        })
    }

    fn is_link_up(&self, name: &str) -> Result<bool> {
        Ok(self.read_flags(name)? & libc::IFF_UP != 0)
    }
}

fn read_stat(stats_path: &Path, stat_name: &str) -> Result<u64> {
    let content = fs::read_to_string(stats_path.join(stat_name))?;
    content
        .trim()
        .parse()
        .map_err(|e| Error::Parse(format!("Failed to parse {}: {}", stat_name, e)))
}

fn parse_flags(raw: &str) -> std::result::Result<libc::c_int, String> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    libc::c_int::from_str_radix(hex, 16).map_err(|e| format!("Failed to parse flags: {}", e))
}

/// Hardware address from `address`; absent, unparsable or all-zero reads as empty
fn read_hardware_addr(dir: &Path) -> String {
    let raw = fs::read_to_string(dir.join("address")).unwrap_or_default();
    raw.trim()
        .split(':')
        .map(|b| u8::from_str_radix(b, 16).ok())
        .collect::<Option<Vec<u8>>>()
        .map(|bytes| format_hardware_addr(&bytes))
        .unwrap_or_default()
}
