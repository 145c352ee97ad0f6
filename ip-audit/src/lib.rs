//! Stamps records with the ip address of the request that created or updated them.
//!
//! Attach an [`IpStamper`] (or wrap the record in [`Stamped`]) and call it around the
//! record's insert, update and refresh. Addresses are stored either as 4/16 raw bytes or
//! as text, see [`Format`].

extern crate self as ip_audit;

pub mod codec;
pub mod configuration;
pub mod context;
pub mod errors;
pub mod event;
pub mod extractors;
pub mod record;
pub mod stamper;
pub mod value;

pub use configuration::{get_settings, Format, StampSettings};
pub use context::{current_actor_ip, with_actor_ip, ActorIpSource, AmbientActorIp, FixedActorIp};
pub use errors::CodecError;
pub use event::{LifecycleEvent, LifecycleHook, StampField};
pub use extractors::{actor_scope, addr::ClientAddr};
pub use ip_audit_macros::AttributeStore;
pub use record::{AttributeField, AttributeStore, AttributeValue};
pub use stamper::{IpStamper, StampConfig, Stamped};
pub use value::ValueSource;
