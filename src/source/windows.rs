//! Windows interface source backed by `GetIfTable2` (iphlpapi)
//!
//! Interfaces are keyed by alias, the name shown in Network Connections.
//! Filter-driver layers are skipped so each adapter appears once.

use super::{
    format_hardware_addr, InterfaceConfig, InterfaceCounters, InterfaceFlag, InterfaceSource,
};
use crate::error::{Error, Result};
use std::ptr;

// MIB_IF_ROW2 (netioapi.h), 64-bit counters
#[repr(C)]
#[allow(non_camel_case_types, dead_code)]
struct MIB_IF_ROW2 {
    interface_luid: u64,
    interface_index: u32,
    interface_guid: [u8; 16],
    alias: [u16; 257],
    description: [u16; 257],
    phys_addr_length: u32,
    phys_addr: [u8; 32],
    permanent_phys_addr: [u8; 32],
    mtu: u32,
    if_type: u32,
    tunnel_type: u32,
    media_type: u32,
    phys_medium_type: u32,
    access_type: u32,
    direction_type: u32,
    interface_and_oper_status_flags: u8,
    oper_status: u32,
    admin_status: u32,
    media_connect_state: u32,
    network_guid: [u8; 16],
    connection_type: u32,
    transmit_link_speed: u64,
    receive_link_speed: u64,
    in_octets: u64,
    in_ucast_pkts: u64,
    in_nucast_pkts: u64,
    in_discards: u64,
    in_errors: u64,
    in_unknown_protos: u64,
    in_ucast_octets: u64,
    in_mcast_octets: u64,
    in_bcast_octets: u64,
    out_octets: u64,
    out_ucast_pkts: u64,
    out_nucast_pkts: u64,
    out_discards: u64,
    out_errors: u64,
    out_ucast_octets: u64,
    out_mcast_octets: u64,
    out_bcast_octets: u64,
    out_qlen: u64,
}

#[repr(C)]
#[allow(non_camel_case_types)]
struct MIB_IF_TABLE2 {
    num_entries: u32,
    table: [MIB_IF_ROW2; 1],
}

#[link(name = "iphlpapi")]
extern "system" {
    fn GetIfTable2(table: *mut *mut MIB_IF_TABLE2) -> u32;
    fn FreeMibTable(memory: *mut std::ffi::c_void);
}

const NO_ERROR: u32 = 0;
const IF_OPER_STATUS_UP: u32 = 1;
// InterfaceAndOperStatusFlags.FilterInterface
const FILTER_INTERFACE: u8 = 0x02;

// IANA ifType values
const IF_TYPE_ETHERNET_CSMACD: u32 = 6;
const IF_TYPE_ISO88025_TOKENRING: u32 = 9;
const IF_TYPE_PPP: u32 = 23;
const IF_TYPE_SOFTWARE_LOOPBACK: u32 = 24;
const IF_TYPE_ATM: u32 = 37;
const IF_TYPE_IEEE80211: u32 = 71;
const IF_TYPE_TUNNEL: u32 = 131;
const IF_TYPE_IEEE1394: u32 = 144;

/// Owned copy of the reported fields of one row
struct Row {
    mtu: u32,
    if_type: u32,
    up: bool,
    hardware_addr: String,
    counters: InterfaceCounters,
}

impl Row {
    fn from_raw(row: &MIB_IF_ROW2) -> Self {
        let name = match wide_to_string(&row.alias) {
            alias if !alias.is_empty() => alias,
            _ => match wide_to_string(&row.description) {
                desc if !desc.is_empty() => desc,
                _ => format!("Interface {}", row.interface_index),
            },
        };
        let addr_len = (row.phys_addr_length as usize).min(row.phys_addr.len());

        Self {
            mtu: row.mtu,
            if_type: row.if_type,
            up: row.oper_status == IF_OPER_STATUS_UP,
            hardware_addr: format_hardware_addr(&row.phys_addr[..addr_len]),
            counters: InterfaceCounters {
                name,
                bytes_sent: row.out_octets,
                bytes_recv: row.in_octets,
                packets_sent: row.out_ucast_pkts + row.out_nucast_pkts,
                packets_recv: row.in_ucast_pkts + row.in_nucast_pkts,
            },
        }
    }
}

/// OS-backed interface source
#[derive(Debug, Clone, Default)]
pub struct SystemSource;

impl SystemSource {
    /// Create a source reading from `GetIfTable2`
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceSource for SystemSource {
    fn list_counters(&self) -> Result<Vec<InterfaceCounters>> {
        let rows = rows()
            .map_err(|code| Error::SourceUnavailable(format!("GetIfTable2 failed: {}", code)))?;
        Ok(rows.into_iter().map(|row| row.counters).collect())
    }

    fn config(&self, name: &str) -> Result<InterfaceConfig> {
        let row = find_row(name)?;
        Ok(InterfaceConfig {
            hardware_addr: row.hardware_addr,
            mtu: row.mtu,
            flags: flags_for(row.if_type, row.up),
            addrs: Vec::new(),
        })
    }

    fn is_link_up(&self, name: &str) -> Result<bool> {
        Ok(find_row(name)?.up)
    }
}

fn rows() -> std::result::Result<Vec<Row>, u32> {
    let mut table: *mut MIB_IF_TABLE2 = ptr::null_mut();
    // SAFETY: on success the table is released with FreeMibTable below
    let status = unsafe { GetIfTable2(&mut table) };
    if status != NO_ERROR {
        return Err(status);
    }
    if table.is_null() {
        return Ok(Vec::new());
    }

    // SAFETY: the table holds num_entries contiguous rows
    let rows = unsafe {
        let count = (*table).num_entries as usize;
        let first = ptr::addr_of!((*table).table) as *const MIB_IF_ROW2;
        std::slice::from_raw_parts(first, count)
            .iter()
            .filter(|row| row.interface_and_oper_status_flags & FILTER_INTERFACE == 0)
            .map(Row::from_raw)
            .collect()
    };
    // SAFETY: allocated by GetIfTable2, freed once
    unsafe { FreeMibTable(table.cast()) };

    Ok(rows)
}

fn find_row(name: &str) -> Result<Row> {
    rows()
        .map_err(|code| Error::detail(name, format!("GetIfTable2 failed: {}", code)))?
        .into_iter()
        .find(|row| row.counters.name == name)
        .ok_or_else(|| Error::detail(name, "no such interface"))
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

/// Flags implied by the interface type, in reporting order
fn flags_for(if_type: u32, up: bool) -> Vec<InterfaceFlag> {
    let (broadcast, loopback, point_to_point) = match if_type {
        IF_TYPE_ETHERNET_CSMACD
        | IF_TYPE_ISO88025_TOKENRING
        | IF_TYPE_IEEE80211
        | IF_TYPE_IEEE1394 => (true, false, false),
        IF_TYPE_PPP | IF_TYPE_TUNNEL => (false, false, true),
        IF_TYPE_SOFTWARE_LOOPBACK => (false, true, false),
        IF_TYPE_ATM => (true, false, true),
        _ => (false, false, false),
    };
    let multicast = broadcast || loopback || point_to_point;

    [
        (up, InterfaceFlag::Up),
        (broadcast, InterfaceFlag::Broadcast),
        (loopback, InterfaceFlag::Loopback),
        (point_to_point, InterfaceFlag::PointToPoint),
        (multicast, InterfaceFlag::Multicast),
    ]
    .into_iter()
    .filter(|(set, _)| *set)
    .map(|(_, flag)| flag)
    .collect()
}
