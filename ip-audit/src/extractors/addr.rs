use axum::extract::connect_info::Connected;
use hyper::server::conn::AddrStream;
use std::net::IpAddr;

/// Peer address of the connection a request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientAddr(IpAddr);

impl ClientAddr {
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl Connected<&AddrStream> for ClientAddr {
    fn connect_info(target: &AddrStream) -> Self {
        Self(target.remote_addr().ip())
    }
}
