//! Test data builders for creating test objects

use routerview_rs::table::{Record, ID_KEY};

/// Builder for device records
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Record addressed by `id`
    pub fn new(id: &str) -> Self {
        Self {
            record: Record::new().with(ID_KEY, id),
        }
    }

    /// Record without an identifier
    pub fn unaddressed() -> Self {
        Self {
            record: Record::new(),
        }
    }

    pub fn prop(mut self, key: &str, value: &str) -> Self {
        self.record.push(key, value);
        self
    }

    pub fn build(self) -> Record {
        self.record
    }
}

/// A DHCP lease record
pub fn lease(id: &str, mac: &str, host: &str, address: &str) -> Record {
    RecordBuilder::new(id)
        .prop("mac-address", mac)
        .prop("host-name", host)
        .prop("active-address", address)
        .build()
}

/// `{id, mac}` rows as used by the reconciliation scenarios
pub fn mac_row(id: &str, mac: &str) -> Record {
    RecordBuilder::new(id).prop("mac", mac).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let rec = RecordBuilder::new("*1").prop("mac", "aa:bb").build();
        assert_eq!(rec.id(), "*1");
        assert_eq!(rec.get("mac"), Some("aa:bb"));
        assert_eq!(RecordBuilder::unaddressed().build().id(), "");
    }
}
