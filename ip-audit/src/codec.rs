//! Conversion between the textual and the fixed-width binary form of an ip address.
//!
//! [`encode`] and [`decode`] never fail: malformed input is logged and turned into `None`,
//! so a bad audit value can't stop a record from being saved. Use [`try_encode`] and
//! [`try_decode`] when the reason matters.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::error;

use crate::errors::CodecError;

pub fn try_encode(text: &str) -> Result<Vec<u8>, CodecError> {
    let ip = text.parse::<IpAddr>()?;
    Ok(match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    })
}

pub fn try_decode(blob: &[u8]) -> Result<String, CodecError> {
    if let Ok(octets) = <[u8; 4]>::try_from(blob) {
        return Ok(Ipv4Addr::from(octets).to_string());
    }
    if let Ok(octets) = <[u8; 16]>::try_from(blob) {
        return Ok(Ipv6Addr::from(octets).to_string());
    }
    Err(CodecError::InvalidLength(blob.len()))
}

/// Textual address to 4 (IPv4) or 16 (IPv6) bytes.
pub fn encode(text: Option<&str>) -> Option<Vec<u8>> {
    let text = text.filter(|t| !t.is_empty())?;
    match try_encode(text) {
        Ok(blob) => Some(blob),
        Err(e) => {
            error!("Failed to encode ip '{text}': {e}");
            None
        }
    }
}

/// Binary address back to its canonical textual form.
pub fn decode(blob: Option<&[u8]>) -> Option<String> {
    let blob = blob.filter(|b| !b.is_empty())?;
    match try_decode(blob) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to decode ip blob '{}': {e}", hex::encode(blob));
            None
        }
    }
}
