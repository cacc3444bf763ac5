//! Mock construction helpers

use super::wait_until;
use routerview_rs::binding::Dispatcher;
use routerview_rs::device::mock::MockDevice;
use routerview_rs::device::ConnectionTarget;
use routerview_rs::table::{DataTable, Record};

pub fn test_target() -> ConnectionTarget {
    ConnectionTarget::new("192.168.88.1", false, "admin", "")
}

/// Device serving `records` under `path`
pub fn device_with(path: &str, records: Vec<Record>) -> MockDevice {
    MockDevice::new().with_snapshot(path, records)
}

/// Open `path` with inline notifications and wait until it streams
///
/// Static tables are returned right away.
pub fn open_table(device: &MockDevice, path: &str) -> DataTable {
    let table = DataTable::open(device, &test_target(), path, Dispatcher::inline())
        .expect("table should open");
    if table.is_streaming() {
        assert!(
            wait_until(|| device.subscriber_count(path) > 0),
            "reconciler never subscribed to {}",
            path
        );
    }
    table
}
