//! Catalog of browsable device resources
//!
//! The catalog is a static two-level tree. Top-level sections (and their
//! subsections) own a list of [`TableView`]s, each naming a resource path and
//! the columns worth showing for it. Columns flagged [`Column::is_mac`] hold
//! hardware addresses and are candidates for a lease lookup; columns flagged
//! [`Column::is_copy`] hold addresses worth copying.

use serde::Serialize;

/// Root of the section tree
pub const ROOT: &str = "";

/// Resource path of DHCP leases, the source of MAC lookups
pub const LEASE_PATH: &str = "/ip/dhcp-server/lease";

/// One displayed column of a table view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub title: &'static str,
    pub property: &'static str,
    mac: bool,
    copy: bool,
}

impl Column {
    /// Plain text column
    pub const fn text(title: &'static str, property: &'static str) -> Self {
        Self {
            title,
            property,
            mac: false,
            copy: false,
        }
    }

    /// Column holding a MAC address
    pub const fn mac(title: &'static str, property: &'static str) -> Self {
        Self {
            title,
            property,
            mac: true,
            copy: false,
        }
    }

    /// Column holding a copyable address
    pub const fn copyable(title: &'static str, property: &'static str) -> Self {
        Self {
            title,
            property,
            mac: false,
            copy: true,
        }
    }

    pub fn is_mac(&self) -> bool {
        self.mac
    }

    pub fn is_copy(&self) -> bool {
        self.copy
    }
}

/// A table of one resource path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub title: &'static str,
    pub path: &'static str,
    pub columns: &'static [Column],
}

impl TableView {
    pub const fn new(title: &'static str, path: &'static str, columns: &'static [Column]) -> Self {
        Self {
            title,
            path,
            columns,
        }
    }

    /// Column showing `property`
    pub fn column(&self, property: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// Columns holding MAC addresses
    pub fn mac_columns(&self) -> impl Iterator<Item = &'static Column> {
        self.columns.iter().filter(|c| c.mac)
    }
}

/// Subsections of `section`; [`ROOT`] lists the top level
pub fn children(section: &str) -> &'static [&'static str] {
    match section {
        ROOT => &["CAPsMAN", "Wireless", "Interfaces", "Bridge", "IP", "System"],
        "IP" => &["ARP", "DHCP Server"],
        "System" => &["Certificates", "Health"],
        _ => &[],
    }
}

/// Table views of `section`; sections without tables yield none
pub fn views(section: &str) -> &'static [TableView] {
    match section {
        "CAPsMAN" => CAPSMAN,
        "Wireless" => WIRELESS,
        "Interfaces" => INTERFACES,
        "Bridge" => BRIDGE,
        "ARP" => ARP,
        "DHCP Server" => DHCP_SERVER,
        _ => &[],
    }
}

/// Every section of the tree, depth first
pub fn sections() -> Vec<&'static str> {
    fn walk(section: &'static str, out: &mut Vec<&'static str>) {
        for &child in children(section) {
            out.push(child);
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    walk(ROOT, &mut out);
    out
}

/// Table view of `path` with the section it belongs to
pub fn find_view(path: &str) -> Option<(&'static str, &'static TableView)> {
    sections()
        .into_iter()
        .find_map(|section| views(section).iter().find(|v| v.path == path).map(|v| (section, v)))
}

const CAPSMAN: &[TableView] = &[
    TableView::new(
        "Interfaces",
        "/caps-man/interface",
        &[
            Column::text("Disabled", "disabled"),
            Column::text("Inactive", "inactive"),
            Column::text("State", "current-state"),
            Column::text("Name", "name"),
            Column::text("Channel", "current-channel"),
            Column::text("Current Authorized Clients", "current-authorized-clients"),
            Column::text("L2 MTU", "l2mtu"),
            Column::text("Radio MAC", "radio-mac"),
            Column::text("Radio Name", "radio-name"),
        ],
    ),
    TableView::new("Provisioning", "/caps-man/provisioning", &[]),
    TableView::new(
        "Configuration",
        "/caps-man/configuration",
        &[
            Column::text("Name", "name"),
            Column::text("Mode", "mode"),
            Column::text("SSID", "ssid"),
            Column::text("TX Chains", "tx-chains"),
            Column::text("RX Chains", "rx-chains"),
            Column::text("Country", "country"),
            Column::text("Installation", "installation"),
            Column::text("Security", "security"),
            Column::text("Datapath", "datapath"),
            Column::text("Channel", "channel"),
        ],
    ),
    TableView::new(
        "Channel",
        "/caps-man/channel",
        &[
            Column::text("Name", "name"),
            Column::text("Frequency", "frequency"),
            Column::text("Control Channel Width", "control-channel-width"),
            Column::text("TX Power", "tx-power"),
        ],
    ),
    TableView::new(
        "Datapath",
        "/caps-man/datapath",
        &[
            Column::text("Name", "name"),
            Column::text("Client to Client forwarding", "client-to-client-forwarding"),
            Column::text("Bridge", "bridge"),
            Column::text("Local forwarding", "local-forwarding"),
        ],
    ),
    TableView::new(
        "Security configuration",
        "/caps-man/security",
        &[
            Column::text("Name", "name"),
            Column::text("Authentication Types", "authentication-types"),
            Column::text("Encryption", "encryption"),
            Column::text("Group Encryption", "group-encryption"),
            Column::text("Group Key Update", "group-key-update"),
        ],
    ),
    TableView::new(
        "Access List",
        "/caps-man/access-list",
        &[
            Column::text("Interface", "interface"),
            Column::text("Signal Range", "signal-range"),
            Column::text("Client To Client Forwarding", "client-to-client-forwarding"),
        ],
    ),
    TableView::new(
        "Remote Cap",
        "/caps-man/remote-cap",
        &[
            Column::mac("Address", "address"),
            Column::text("Name", "name"),
            Column::text("Board", "board"),
            Column::text("Serial", "serial"),
            Column::text("Version", "version"),
            Column::text("Identity", "identity"),
            Column::mac("Base Mac", "base-mac"),
            Column::text("State", "state"),
            Column::text("Radios", "radios"),
        ],
    ),
    TableView::new(
        "Radio",
        "/caps-man/radio",
        &[
            Column::text("Radio MAC", "radio-mac"),
            Column::text("Remote Cap Name", "remote-cap-name"),
            Column::text("Remote Cap Identity", "remote-cap-identity"),
            Column::text("Interface", "interface"),
        ],
    ),
    TableView::new(
        "Registration Table",
        "/caps-man/registration-table",
        &[
            Column::text("Interface", "interface"),
            Column::text("SSID", "ssid"),
            Column::mac("Mac-Address", "mac-address"),
            Column::text("EAP Identity", "eap-identity"),
            Column::text("Tx Rate", "tx-rate"),
            Column::text("Tx signal", "tx-rate-set"),
            Column::text("Rx Rate", "rx-rate"),
            Column::text("Rx signal", "rx-signal"),
            Column::text("Uptime", "uptime"),
            Column::text("Tx/Rx Packets", "packets"),
            Column::text("Tx/Rx Bytes", "bytes"),
        ],
    ),
];

const INTERFACES: &[TableView] = &[
    TableView::new(
        "Interface",
        "/interface/ethernet",
        &[
            Column::text("Name", "name"),
            Column::text("Actual MTU", "mtu"),
            Column::text("L2 MTU", "l2mtu"),
            Column::text("TX", "tx-bytes"),
            Column::text("RX", "rx-bytes"),
        ],
    ),
];

const WIRELESS: &[TableView] = &[
    TableView::new(
        "WiFi Interfaces",
        "/interface/wireless",
        &[
            Column::text("Name", "name"),
            Column::text("Actual MTU", "mtu"),
            Column::mac("MAC Address", "mac-address"),
            Column::text("ARP", "arp"),
            Column::text("Mode", "mode"),
            Column::text("Band", "band"),
            Column::text("Channel Width", "channel-width"),
            Column::text("Frequency", "frequency"),
            Column::text("SSID", "ssid"),
        ],
    ),
];

const BRIDGE: &[TableView] = &[
    TableView::new(
        "Host",
        "/interface/bridge/host",
        &[
            Column::mac("MAC Address", "mac-address"),
            Column::text("On Interface", "on-interface"),
            Column::text("Bridge", "bridge"),
        ],
    ),
];

const ARP: &[TableView] = &[
    TableView::new(
        "ARP Table",
        "/ip/arp",
        &[
            Column::copyable("IP Address", "address"),
            Column::mac("MAC Address", "mac-address"),
            Column::text("Interface", "interface"),
        ],
    ),
];

const DHCP_SERVER: &[TableView] = &[
    TableView::new(
        "Leases",
        "/ip/dhcp-server/lease",
        &[
            Column::copyable("Address", "address"),
            Column::mac("MAC Address", "mac-address"),
            Column::text("Client ID", "active-client-id"),
            Column::text("Server", "server"),
            Column::copyable("Active Address", "active-address"),
            Column::mac("Active MAC Address", "active-mac-address"),
            Column::text("Host Name", "host-name"),
            Column::text("Expires After", "expires-after"),
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tree_shape() {
        assert_eq!(children(ROOT).len(), 6);
        assert_eq!(children("IP"), &["ARP", "DHCP Server"]);
        assert!(children("ARP").is_empty());
        assert!(views("Health").is_empty());
        assert_eq!(sections().len(), 10);
    }

    #[test]
    fn test_lease_view() {
        let (section, view) = find_view(LEASE_PATH).unwrap();
        assert_eq!(section, "DHCP Server");
        assert_eq!(view.title, "Leases");
        let macs: Vec<_> = view.mac_columns().map(|c| c.property).collect();
        assert_eq!(macs, vec!["mac-address", "active-mac-address"]);
        assert!(view.column("active-address").unwrap().is_copy());
        assert!(find_view("/nope").is_none());
    }

    #[test]
    fn test_paths_are_unique() {
        let mut seen = HashSet::new();
        for section in sections() {
            for view in views(section) {
                assert!(view.path.starts_with('/'));
                assert!(seen.insert(view.path), "duplicate {}", view.path);
            }
        }
        assert_eq!(seen.len(), 15);
    }
}
