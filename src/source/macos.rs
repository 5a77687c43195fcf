//! macOS interface source backed by getifaddrs(3)
//!
//! Each interface has one `AF_LINK` entry. Its `ifa_data` points at an
//! `if_data` record (traffic counters, MTU) and its address is a `sockaddr_dl`
//! holding the hardware address.

use super::unix::{flags_from_bits, read_addresses};
use super::{format_hardware_addr, InterfaceConfig, InterfaceCounters, InterfaceSource};
use crate::error::{Error, Result};
use std::ffi::CStr;
use std::{io, mem, ptr, slice};

// Leading fields of `struct if_data` (net/if_var.h)
#[repr(C)]
#[allow(dead_code)]
struct IfData {
    ifi_type: u8,
    ifi_typelen: u8,
    ifi_physical: u8,
    ifi_addrlen: u8,
    ifi_hdrlen: u8,
    ifi_recvquota: u8,
    ifi_xmitquota: u8,
    ifi_unused1: u8,
    ifi_mtu: u32,
    ifi_metric: u32,
    ifi_baudrate: u32,
    ifi_ipackets: u32,
    ifi_ierrors: u32,
    ifi_opackets: u32,
    ifi_oerrors: u32,
    ifi_collisions: u32,
    ifi_ibytes: u32,
    ifi_obytes: u32,
}

/// Link-level view of one interface
struct Link {
    flags: libc::c_int,
    mtu: u32,
    hardware_addr: String,
    counters: InterfaceCounters,
}

/// Owned getifaddrs(3) list
struct IfAddrs(*mut libc::ifaddrs);

impl IfAddrs {
    fn new() -> io::Result<Self> {
        let mut head = ptr::null_mut();
        // SAFETY: on success the list is owned by us and freed in Drop
        if unsafe { libc::getifaddrs(&mut head) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self(head))
    }

    fn iter(&self) -> impl Iterator<Item = &libc::ifaddrs> + '_ {
        let mut cur = self.0 as *const libc::ifaddrs;
        std::iter::from_fn(move || {
            // SAFETY: nodes stay valid until the list is freed
            let ifa = unsafe { cur.as_ref()? };
            cur = ifa.ifa_next;
            Some(ifa)
        })
    }
}

impl Drop for IfAddrs {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: allocated by getifaddrs and freed once
            unsafe { libc::freeifaddrs(self.0) };
        }
    }
}

/// OS-backed interface source
#[derive(Debug, Clone, Default)]
pub struct SystemSource;

impl SystemSource {
    /// Create a source reading from getifaddrs(3)
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceSource for SystemSource {
    fn list_counters(&self) -> Result<Vec<InterfaceCounters>> {
        let links = links()
            .map_err(|e| Error::SourceUnavailable(format!("getifaddrs failed: {}", e)))?;
        Ok(links.into_iter().map(|link| link.counters).collect())
    }

    fn config(&self, name: &str) -> Result<InterfaceConfig> {
        let link = find_link(name)?;
        Ok(InterfaceConfig {
            hardware_addr: link.hardware_addr,
            mtu: link.mtu,
            flags: flags_from_bits(link.flags),
            addrs: read_addresses(name)?,
        })
    }

    fn is_link_up(&self, name: &str) -> Result<bool> {
        Ok(find_link(name)?.flags & libc::IFF_UP != 0)
    }
}

fn links() -> io::Result<Vec<Link>> {
    let list = IfAddrs::new()?;
    Ok(list.iter().filter_map(link_of).collect())
}

fn find_link(name: &str) -> Result<Link> {
    links()
        .map_err(|e| Error::detail(name, format!("getifaddrs failed: {}", e)))?
        .into_iter()
        .find(|link| link.counters.name == name)
        .ok_or_else(|| Error::detail(name, "no such interface"))
}

fn link_of(ifa: &libc::ifaddrs) -> Option<Link> {
    // SAFETY: ifa_addr is null or points at a sockaddr
    let addr = unsafe { ifa.ifa_addr.as_ref()? };
    if i32::from(addr.sa_family) != libc::AF_LINK || ifa.ifa_name.is_null() || ifa.ifa_data.is_null()
    {
        return None;
    }

    // SAFETY: non-null, NUL-terminated
    let name = unsafe { CStr::from_ptr(ifa.ifa_name) }
        .to_string_lossy()
        .into_owned();
    // SAFETY: AF_LINK entries carry an if_data record
    let data = unsafe { &*(ifa.ifa_data as *const IfData) };
    // SAFETY: AF_LINK addresses are sockaddr_dl
    let hardware_addr = unsafe { link_address(ifa.ifa_addr as *const libc::sockaddr_dl) };

    Some(Link {
        flags: ifa.ifa_flags as libc::c_int,
        mtu: data.ifi_mtu,
        hardware_addr,
        counters: InterfaceCounters {
            name,
            bytes_sent: u64::from(data.ifi_obytes),
            bytes_recv: u64::from(data.ifi_ibytes),
            packets_sent: u64::from(data.ifi_opackets),
            packets_recv: u64::from(data.ifi_ipackets),
        },
    })
}

/// Hardware address stored after the name in `sdl_data`
///
/// # Safety
///
/// `sdl` must point at a `sockaddr_dl` that is `sdl_len` bytes long.
unsafe fn link_address(sdl: *const libc::sockaddr_dl) -> String {
    let header = &*sdl;
    let start = mem::offset_of!(libc::sockaddr_dl, sdl_data) + usize::from(header.sdl_nlen);
    let len = usize::from(header.sdl_alen);
    if len == 0 || start + len > usize::from(header.sdl_len) {
        return String::new();
    }
    format_hardware_addr(slice::from_raw_parts((sdl as *const u8).add(start), len))
}
