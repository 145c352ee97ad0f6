//! Ambient "who is making this request" context.
//!
//! The actor ip lives in a tokio task-local, so every request handled on a shared runtime
//! sees only its own address. Code running outside any scope (background jobs, console
//! commands) gets `None` and stamping falls back to the configured default.

use std::fmt::Debug;
use std::future::Future;
use std::net::IpAddr;

tokio::task_local! {
    static ACTOR_IP: IpAddr;
}

/// Runs `f` with `ip` as the current actor ip.
pub async fn with_actor_ip<F>(ip: IpAddr, f: F) -> F::Output
where
    F: Future,
{
    ACTOR_IP.scope(ip, f).await
}

pub fn sync_with_actor_ip<R>(ip: IpAddr, f: impl FnOnce() -> R) -> R {
    ACTOR_IP.sync_scope(ip, f)
}

pub fn current_actor_ip() -> Option<IpAddr> {
    ACTOR_IP.try_with(|ip| *ip).ok()
}

pub trait ActorIpSource: Send + Sync + Debug {
    fn actor_ip(&self) -> Option<IpAddr>;
}

/// Reads the task-local set by [`with_actor_ip`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientActorIp;

impl ActorIpSource for AmbientActorIp {
    fn actor_ip(&self) -> Option<IpAddr> {
        current_actor_ip()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FixedActorIp(pub Option<IpAddr>);

impl ActorIpSource for FixedActorIp {
    fn actor_ip(&self) -> Option<IpAddr> {
        self.0
    }
}
