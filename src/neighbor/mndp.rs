//! Neighbor discovery datagram codec
//!
//! # Wire Format
//!
//! ```text
//! +--------+--------+----------------+
//! | header (2)      | sequence (BE)  |
//! +--------+--------+----------------+
//! | type (BE)       | length (BE)    |  repeated
//! +-----------------+----------------+
//! | value (length bytes)             |
//! +----------------------------------+
//! ```
//!
//! Values are raw bytes; how a value is displayed depends on its [`Tag`].

use crate::error::{Result, RouterViewError};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

const HEADER_LEN: usize = 4;
const TLV_HEADER_LEN: usize = 4;

/// Field type of a discovery datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    MacAddress,
    Identity,
    Version,
    Platform,
    Uptime,
    SoftwareId,
    Board,
    Unpack,
    Ipv6Address,
    InterfaceName,
    Ipv4Address,
    Other(u16),
}

impl Tag {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Tag::MacAddress,
            5 => Tag::Identity,
            7 => Tag::Version,
            8 => Tag::Platform,
            10 => Tag::Uptime,
            11 => Tag::SoftwareId,
            12 => Tag::Board,
            14 => Tag::Unpack,
            15 => Tag::Ipv6Address,
            16 => Tag::InterfaceName,
            17 => Tag::Ipv4Address,
            other => Tag::Other(other),
        }
    }

    /// The named variant for this tag's wire code, e.g. `Other(1)` is `MacAddress`
    pub fn normalized(self) -> Self {
        Tag::from_code(self.code())
    }

    pub fn code(self) -> u16 {
        match self {
            Tag::MacAddress => 1,
            Tag::Identity => 5,
            Tag::Version => 7,
            Tag::Platform => 8,
            Tag::Uptime => 10,
            Tag::SoftwareId => 11,
            Tag::Board => 12,
            Tag::Unpack => 14,
            Tag::Ipv6Address => 15,
            Tag::InterfaceName => 16,
            Tag::Ipv4Address => 17,
            Tag::Other(code) => code,
        }
    }

    /// Property name a neighbor exposes this field under
    pub fn property(self) -> Option<&'static str> {
        Some(match self {
            Tag::MacAddress => "mac-address",
            Tag::Identity => "identity",
            Tag::Version => "version",
            Tag::Platform => "platform",
            Tag::Uptime => "uptime",
            Tag::SoftwareId => "software-id",
            Tag::Board => "board",
            Tag::Ipv6Address => "address6",
            Tag::InterfaceName => "interface",
            Tag::Ipv4Address => "address",
            Tag::Unpack | Tag::Other(_) => return None,
        })
    }

    pub fn from_property(property: &str) -> Option<Self> {
        PROPERTY_TAGS.iter().copied().find(|t| t.property() == Some(property))
    }
}

/// Tags exposed as neighbor properties
pub const PROPERTY_TAGS: [Tag; 10] = [
    Tag::Identity,
    Tag::MacAddress,
    Tag::Ipv4Address,
    Tag::Ipv6Address,
    Tag::Platform,
    Tag::Version,
    Tag::Board,
    Tag::SoftwareId,
    Tag::InterfaceName,
    Tag::Uptime,
];

/// One typed value of a datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub tag: Tag,
    pub value: Vec<u8>,
}

impl Field {
    pub fn new(tag: Tag, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag: tag.normalized(),
            value: value.into(),
        }
    }

    /// Human readable value
    ///
    /// Values whose length does not fit their tag fall back to hex.
    pub fn display(&self) -> String {
        match self.tag {
            Tag::MacAddress => self
                .value
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(":"),
            Tag::Identity
            | Tag::Version
            | Tag::Platform
            | Tag::SoftwareId
            | Tag::Board
            | Tag::InterfaceName => String::from_utf8_lossy(&self.value).into_owned(),
            Tag::Uptime => match <[u8; 4]>::try_from(self.value.as_slice()) {
                Ok(raw) => format_uptime(u32::from_le_bytes(raw)),
                Err(_) => hex(&self.value),
            },
            Tag::Ipv4Address => match <[u8; 4]>::try_from(self.value.as_slice()) {
                Ok(raw) => Ipv4Addr::from(raw).to_string(),
                Err(_) => hex(&self.value),
            },
            Tag::Ipv6Address => match <[u8; 16]>::try_from(self.value.as_slice()) {
                Ok(raw) => Ipv6Addr::from(raw).to_string(),
                Err(_) => hex(&self.value),
            },
            Tag::Unpack | Tag::Other(_) => hex(&self.value),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}

/// Uptime as hours, minutes and seconds, e.g. `26h3m0s`
pub fn format_uptime(seconds: u32) -> String {
    let (h, m, s) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// A decoded discovery datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    /// Sender of the datagram
    pub src: SocketAddr,
    pub sequence: u16,
    pub fields: BTreeMap<Tag, Field>,
}

impl DiscoveryMessage {
    pub fn new(src: SocketAddr, sequence: u16) -> Self {
        Self {
            src,
            sequence,
            fields: BTreeMap::new(),
        }
    }

    /// Add a field (builder style); a later field replaces an earlier one
    pub fn with(mut self, tag: Tag, value: impl Into<Vec<u8>>) -> Self {
        let field = Field::new(tag, value);
        self.fields.insert(field.tag, field);
        self
    }

    /// Decode a datagram received from `src`
    pub fn decode(src: SocketAddr, datagram: &[u8]) -> Result<Self> {
        if datagram.len() < HEADER_LEN {
            return Err(RouterViewError::Decode(format!(
                "datagram of {} bytes has no header",
                datagram.len()
            )));
        }
        let sequence = u16::from_be_bytes([datagram[2], datagram[3]]);
        let mut message = Self::new(src, sequence);

        let mut rest = &datagram[HEADER_LEN..];
        while !rest.is_empty() {
            if rest.len() < TLV_HEADER_LEN {
                return Err(RouterViewError::Decode(format!(
                    "truncated field header at offset {}",
                    datagram.len() - rest.len()
                )));
            }
            let tag = Tag::from_code(u16::from_be_bytes([rest[0], rest[1]]));
            let len = usize::from(u16::from_be_bytes([rest[2], rest[3]]));
            let end = TLV_HEADER_LEN + len;
            if rest.len() < end {
                return Err(RouterViewError::Decode(format!(
                    "field {} claims {} bytes, {} left",
                    tag.code(),
                    len,
                    rest.len() - TLV_HEADER_LEN
                )));
            }
            message
                .fields
                .insert(tag, Field::new(tag, &rest[TLV_HEADER_LEN..end]));
            rest = &rest[end..];
        }
        Ok(message)
    }

    /// Encode as a datagram, fields in tag order
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = vec![0, 0];
        out.extend_from_slice(&self.sequence.to_be_bytes());
        for field in self.fields.values() {
            let len = u16::try_from(field.value.len()).map_err(|_| {
                RouterViewError::Decode(format!(
                    "field {} too long: {} bytes",
                    field.tag.code(),
                    field.value.len()
                ))
            })?;
            out.extend_from_slice(&field.tag.code().to_be_bytes());
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(&field.value);
        }
        Ok(out)
    }

    /// Display value of `tag`, empty when absent
    pub fn value(&self, tag: Tag) -> String {
        self.fields
            .get(&tag.normalized())
            .map(Field::display)
            .unwrap_or_default()
    }

    /// Whether the datagram announces an IPv4 or IPv6 address
    pub fn has_address(&self) -> bool {
        self.fields.contains_key(&Tag::Ipv4Address) || self.fields.contains_key(&Tag::Ipv6Address)
    }
}
