pub mod addr;

use axum::{
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::context::with_actor_ip;
use addr::ClientAddr;

/// Runs the rest of the stack with the peer address as the current actor ip.
///
/// Use with `axum::middleware::from_fn(actor_scope)` on a router served through
/// `into_make_service_with_connect_info::<ClientAddr>()`.
pub async fn actor_scope<B>(
    connect_info: Option<ConnectInfo<ClientAddr>>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    match connect_info {
        Some(ConnectInfo(addr)) => with_actor_ip(addr.ip(), next.run(req)).await,
        None => {
            debug!("No client address on {} {}, stamping without actor ip", req.method(), req.uri());
            next.run(req).await
        }
    }
}
