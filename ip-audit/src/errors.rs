use std::net::AddrParseError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid ip address: {0}")]
    InvalidAddress(#[from] AddrParseError),
    #[error("Invalid binary address length {0}, expected 4 or 16 bytes")]
    InvalidLength(usize),
}
