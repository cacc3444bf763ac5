//! MAC address lookups across lease tables
//!
//! Any MAC shown in a table can be resolved against the DHCP lease tables of
//! every connected router. [`mac_unknown`] is the live gate for that action: it
//! stays true while no lease table knows the address.

use crate::binding::{logic, SharedBool};
use crate::table::DataTable;

const MAC_PROPERTY: &str = "mac-address";
const HOST_PROPERTY: &str = "host-name";
const ADDRESS_PROPERTY: &str = "active-address";

/// A lease matching a looked-up MAC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseMatch {
    pub host_name: String,
    pub address: String,
}

impl std::fmt::Display for LeaseMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.host_name.is_empty(), self.address.is_empty()) {
            (false, false) => write!(f, "{} ({})", self.host_name, self.address),
            (false, true) => write!(f, "{} (-)", self.host_name),
            _ => f.write_str(&self.address),
        }
    }
}

/// Leases of `mac` in every table, in table then row order
///
/// Leases with neither a host name nor an active address are skipped.
pub fn lookup_mac(tables: &[DataTable], mac: &str) -> Vec<LeaseMatch> {
    tables
        .iter()
        .flat_map(|table| table.search(MAC_PROPERTY, mac).rows())
        .filter_map(|row| {
            let found = LeaseMatch {
                host_name: row.value(HOST_PROPERTY).unwrap_or_default(),
                address: row.value(ADDRESS_PROPERTY).unwrap_or_default(),
            };
            if found.host_name.is_empty() && found.address.is_empty() {
                None
            } else {
                Some(found)
            }
        })
        .collect()
}

/// One line per match, or `None` when nothing matched
pub fn describe(matches: &[LeaseMatch]) -> Option<String> {
    if matches.is_empty() {
        return None;
    }
    Some(
        matches
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// True while no table has a lease for `mac`
pub fn mac_unknown(tables: &[DataTable], mac: &str) -> SharedBool {
    logic::not(logic::or(
        tables
            .iter()
            .map(|table| table.exists(MAC_PROPERTY, mac))
            .collect(),
    ))
}
