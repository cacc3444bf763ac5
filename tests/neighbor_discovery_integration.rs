//! Integration tests for neighbor discovery over a loopback socket

mod common;

use common::wait_until;
use routerview_rs::binding::{DataItem, DataList, Dispatcher};
use routerview_rs::config::DiscoveryConfig;
use routerview_rs::neighbor::{DiscoveryMessage, NeighborList, Tag};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

fn loopback_config() -> DiscoveryConfig {
    DiscoveryConfig {
        enabled: true,
        bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        poll_interval_ms: 20,
    }
}

fn announcement(sender: &UdpSocket, identity: &str, ip: [u8; 4]) -> Vec<u8> {
    DiscoveryMessage::new(sender.local_addr().unwrap(), 1)
        .with(Tag::Identity, identity)
        .with(Tag::MacAddress, vec![0x48, 0x8f, 0x5a, 0x01, 0x02, 0x03])
        .with(Tag::Ipv4Address, ip.to_vec())
        .with(Tag::Platform, "MikroTik")
        .with(Tag::Version, "7.15.3 (stable)")
        .with(Tag::Uptime, 3725u32.to_le_bytes().to_vec())
        .encode()
        .unwrap()
}

#[test]
fn test_announcements_become_neighbors() {
    let list = NeighborList::listen(&loopback_config(), Dispatcher::inline()).unwrap();
    let addr = list.local_addr().unwrap();

    let router = UdpSocket::bind("127.0.0.1:0").unwrap();
    router.send_to(&[0xff], addr).unwrap();
    router
        .send_to(&announcement(&router, "core-sw", [10, 0, 0, 2]), addr)
        .unwrap();
    assert!(wait_until(|| list.len() == 1));

    let item = list.get_item(0).unwrap();
    assert_eq!(item.key(), router.local_addr().unwrap().to_string());
    assert_eq!(item.value("uptime").unwrap(), "1h2m5s");
    assert_eq!(item.value("mac-address").unwrap(), "48:8f:5a:01:02:03");

    router
        .send_to(&announcement(&router, "core-sw-2", [10, 0, 0, 2]), addr)
        .unwrap();
    assert!(wait_until(|| list.get(0).unwrap().field(Tag::Identity) == "core-sw-2"));
    assert_eq!(list.len(), 1);
    assert_eq!(
        list.get(0).unwrap().display(),
        "core-sw-2 (48:8f:5a:01:02:03, 10.0.0.2) MikroTik - 7.15.3 (stable)"
    );

    list.close();
    assert!(list.local_addr().is_none());
}
