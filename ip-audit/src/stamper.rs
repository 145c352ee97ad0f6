//! The stamping policy attached to a record.
//!
//! A [`StampConfig`] is built once per record type and shared; every loaded or new record
//! instance gets its own [`IpStamper`] holding the decoded-value cache for that instance.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::codec;
use crate::configuration::{Format, StampSettings};
use crate::context::{ActorIpSource, AmbientActorIp};
use crate::event::{LifecycleEvent, LifecycleHook, StampField};
use crate::record::{AttributeStore, AttributeValue};
use crate::value::ValueSource;

#[derive(Debug, Clone)]
pub struct StampConfig {
    created_from_attribute: Option<String>,
    updated_from_attribute: Option<String>,
    value: Option<ValueSource>,
    default_value: Option<ValueSource>,
    format: Format,
    preserve_non_empty_values: bool,
    actor: Arc<dyn ActorIpSource>,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            created_from_attribute: Some("created_from".into()),
            updated_from_attribute: Some("updated_from".into()),
            value: None,
            default_value: None,
            format: Format::Binary,
            preserve_non_empty_values: false,
            actor: Arc::new(AmbientActorIp),
        }
    }
}

impl StampConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty name disables the created stamp.
    pub fn with_created_from_attribute(mut self, name: impl Into<String>) -> Self {
        self.created_from_attribute = Some(name.into()).filter(|n: &String| !n.is_empty());
        self
    }

    /// An empty name disables the updated stamp.
    pub fn with_updated_from_attribute(mut self, name: impl Into<String>) -> Self {
        self.updated_from_attribute = Some(name.into()).filter(|n: &String| !n.is_empty());
        self
    }

    pub fn without_created_from(mut self) -> Self {
        self.created_from_attribute = None;
        self
    }

    pub fn without_updated_from(mut self) -> Self {
        self.updated_from_attribute = None;
        self
    }

    /// Takes precedence over the live actor ip.
    pub fn with_value(mut self, value: impl Into<ValueSource>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Used when there is no live actor ip.
    pub fn with_default_value(mut self, value: impl Into<ValueSource>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_preserve_non_empty_values(mut self, preserve: bool) -> Self {
        self.preserve_non_empty_values = preserve;
        self
    }

    pub fn with_actor_source(mut self, actor: impl ActorIpSource + 'static) -> Self {
        self.actor = Arc::new(actor);
        self
    }

    pub fn attribute(&self, field: StampField) -> Option<&str> {
        match field {
            StampField::CreatedFrom => self.created_from_attribute.as_deref(),
            StampField::UpdatedFrom => self.updated_from_attribute.as_deref(),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn preserves_non_empty_values(&self) -> bool {
        self.preserve_non_empty_values
    }

    /// Raw textual ip for `event`: explicit value, else live actor ip, else default value.
    pub fn resolve_ip(&self, event: &LifecycleEvent) -> Option<String> {
        if let Some(value) = &self.value {
            return value.resolve(event);
        }
        if let Some(ip) = self.actor.actor_ip() {
            return Some(ip.to_string());
        }
        debug!("No actor ip available on {event}, using default value");
        self.default_value
            .as_ref()
            .and_then(|default| default.resolve(event))
    }

    /// Converts a textual ip to what gets written into the record.
    pub fn encode(&self, text: Option<&str>) -> Option<AttributeValue> {
        let text = text.filter(|t| !t.is_empty())?;
        match self.format {
            Format::Binary => codec::encode(Some(text)).map(AttributeValue::Blob),
            Format::Text => Some(AttributeValue::Text(text.to_string())),
        }
    }

    /// Converts a stored value back to its textual ip.
    pub fn decode(&self, raw: Option<&AttributeValue>) -> Option<String> {
        let raw = raw.filter(|r| !r.is_empty())?;
        match self.format {
            Format::Binary => codec::decode(Some(raw.as_bytes())),
            Format::Text => raw.clone().into_text(),
        }
    }

    pub fn resolve_value(&self, event: &LifecycleEvent) -> Option<AttributeValue> {
        self.encode(self.resolve_ip(event).as_deref())
    }
}

impl From<StampSettings> for StampConfig {
    fn from(settings: StampSettings) -> Self {
        let mut config = Self::new()
            .with_created_from_attribute(settings.created_from_attribute)
            .with_updated_from_attribute(settings.updated_from_attribute)
            .with_format(settings.format)
            .with_preserve_non_empty_values(settings.preserve_non_empty_values);
        if let Some(value) = settings.value {
            config = config.with_value(value);
        }
        if let Some(default_value) = settings.default_value {
            config = config.with_default_value(default_value);
        }
        config
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Decoded {
    #[default]
    Empty,
    Cached(Option<String>),
}

#[derive(Debug, Clone, Default)]
struct FieldState {
    decoded: Decoded,
    overridden: bool,
}

/// Per-record stamping state.
#[derive(Debug, Clone)]
pub struct IpStamper {
    config: Arc<StampConfig>,
    created_from: FieldState,
    updated_from: FieldState,
}

impl IpStamper {
    pub fn new(config: Arc<StampConfig>) -> Self {
        Self {
            config,
            created_from: FieldState::default(),
            updated_from: FieldState::default(),
        }
    }

    pub fn config(&self) -> &StampConfig {
        &self.config
    }

    fn state(&mut self, field: StampField) -> &mut FieldState {
        match field {
            StampField::CreatedFrom => &mut self.created_from,
            StampField::UpdatedFrom => &mut self.updated_from,
        }
    }

    pub fn handle<R>(&mut self, event: LifecycleEvent, record: &mut R)
    where
        R: AttributeStore + ?Sized,
    {
        match event {
            LifecycleEvent::BeforeInsert => self.on_before_insert(record),
            LifecycleEvent::BeforeUpdate => self.on_before_update(record),
            LifecycleEvent::AfterRefresh => self.on_after_refresh(),
        }
    }

    pub fn on_before_insert<R>(&mut self, record: &mut R)
    where
        R: AttributeStore + ?Sized,
    {
        self.stamp(LifecycleEvent::BeforeInsert, record);
    }

    pub fn on_before_update<R>(&mut self, record: &mut R)
    where
        R: AttributeStore + ?Sized,
    {
        self.stamp(LifecycleEvent::BeforeUpdate, record);
    }

    /// The record was reloaded; cached decodes and pending overrides no longer apply.
    pub fn on_after_refresh(&mut self) {
        self.created_from = FieldState::default();
        self.updated_from = FieldState::default();
    }

    fn stamp<R>(&mut self, event: LifecycleEvent, record: &mut R)
    where
        R: AttributeStore + ?Sized,
    {
        let config = Arc::clone(&self.config);
        let mut targets = Vec::new();

        for &field in StampField::stamped_on(event) {
            let Some(name) = config.attribute(field) else {
                continue;
            };
            let state = self.state(field);
            if std::mem::take(&mut state.overridden) {
                debug!("Keeping manually set {name} on {event}");
                continue;
            }
            if config.preserves_non_empty_values()
                && record.attribute(name).is_some_and(|v| !v.is_empty())
            {
                debug!("Keeping non-empty {name} on {event}");
                continue;
            }
            targets.push((field, name));
        }

        if targets.is_empty() {
            return;
        }

        let value = config.resolve_value(&event);
        for (field, name) in targets {
            debug!("Stamping {name} on {event}");
            record.set_attribute(name, value.clone());
            self.state(field).decoded = Decoded::Empty;
        }
    }

    fn read<R>(&mut self, field: StampField, record: &R) -> Option<&str>
    where
        R: AttributeStore + ?Sized,
    {
        let config = Arc::clone(&self.config);
        let name = config.attribute(field)?;
        let state = self.state(field);
        if state.decoded == Decoded::Empty {
            trace!("Decoding {name}");
            state.decoded = Decoded::Cached(config.decode(record.attribute(name).as_ref()));
        }
        match &self.state(field).decoded {
            Decoded::Cached(text) => text.as_deref(),
            Decoded::Empty => None,
        }
    }

    fn write<R>(&mut self, field: StampField, record: &mut R, text: Option<&str>)
    where
        R: AttributeStore + ?Sized,
    {
        let config = Arc::clone(&self.config);
        let Some(name) = config.attribute(field) else {
            return;
        };
        let raw = config.encode(text);
        let decoded = config.decode(raw.as_ref());
        record.set_attribute(name, raw);

        let state = self.state(field);
        state.decoded = Decoded::Cached(decoded);
        state.overridden = true;
    }

    pub fn created_from<R>(&mut self, record: &R) -> Option<&str>
    where
        R: AttributeStore + ?Sized,
    {
        self.read(StampField::CreatedFrom, record)
    }

    pub fn updated_from<R>(&mut self, record: &R) -> Option<&str>
    where
        R: AttributeStore + ?Sized,
    {
        self.read(StampField::UpdatedFrom, record)
    }

    /// Writes `text` straight into the record; the next insert/update leaves it alone.
    pub fn set_created_from<R>(&mut self, record: &mut R, text: Option<&str>)
    where
        R: AttributeStore + ?Sized,
    {
        self.write(StampField::CreatedFrom, record, text);
    }

    pub fn set_updated_from<R>(&mut self, record: &mut R, text: Option<&str>)
    where
        R: AttributeStore + ?Sized,
    {
        self.write(StampField::UpdatedFrom, record, text);
    }
}

impl<R> LifecycleHook<R> for IpStamper
where
    R: AttributeStore + ?Sized,
{
    fn on_event(&mut self, event: LifecycleEvent, record: &mut R) {
        self.handle(event, record);
    }
}

/// A record with its stamper attached.
#[derive(Debug, Clone)]
pub struct Stamped<R> {
    record: R,
    stamper: IpStamper,
}

impl<R: AttributeStore> Stamped<R> {
    pub fn attach(record: R, config: Arc<StampConfig>) -> Self {
        Self {
            record,
            stamper: IpStamper::new(config),
        }
    }

    pub fn notify(&mut self, event: LifecycleEvent) {
        self.stamper.handle(event, &mut self.record);
    }

    pub fn created_from(&mut self) -> Option<&str> {
        self.stamper.created_from(&self.record)
    }

    pub fn updated_from(&mut self) -> Option<&str> {
        self.stamper.updated_from(&self.record)
    }

    pub fn set_created_from(&mut self, text: Option<&str>) {
        self.stamper.set_created_from(&mut self.record, text);
    }

    pub fn set_updated_from(&mut self, text: Option<&str>) {
        self.stamper.set_updated_from(&mut self.record, text);
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    /// Direct changes to stamped attributes are not seen by already cached reads.
    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn into_inner(self) -> R {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{sync_with_actor_ip, FixedActorIp};
    use std::collections::HashMap;
    use std::net::IpAddr;

    type Attrs = HashMap<String, AttributeValue>;

    fn ip(text: &str) -> IpAddr {
        text.parse().unwrap()
    }

    fn blob(attrs: &Attrs, name: &str) -> Option<Vec<u8>> {
        attrs.attribute(name).map(AttributeValue::into_bytes)
    }

    fn live(addr: &str) -> Arc<StampConfig> {
        Arc::new(
            StampConfig::new()
                .with_actor_source(FixedActorIp(Some(ip(addr))))
                .with_default_value("127.0.0.99"),
        )
    }

    #[test]
    fn insert_stamps_both_fields() {
        let mut stamped = Stamped::attach(Attrs::new(), live("127.0.0.25"));
        stamped.notify(LifecycleEvent::BeforeInsert);

        assert_eq!(blob(stamped.record(), "created_from"), Some(vec![0x7f, 0, 0, 0x19]));
        assert_eq!(blob(stamped.record(), "updated_from"), Some(vec![0x7f, 0, 0, 0x19]));
        assert_eq!(stamped.created_from(), Some("127.0.0.25"));
        assert_eq!(stamped.updated_from(), Some("127.0.0.25"));
    }

    #[test]
    fn update_stamps_only_updated_field() {
        let mut attrs = Attrs::new();
        attrs.set_attribute("created_from", Some(AttributeValue::Blob(vec![127, 0, 0, 1])));
        attrs.set_attribute("updated_from", Some(AttributeValue::Blob(vec![127, 0, 0, 2])));

        let mut stamped = Stamped::attach(attrs, live("10.1.2.3"));
        stamped.notify(LifecycleEvent::BeforeUpdate);

        assert_eq!(stamped.created_from(), Some("127.0.0.1"));
        assert_eq!(stamped.updated_from(), Some("10.1.2.3"));
    }

    #[test]
    fn explicit_value_beats_live_ip() {
        let config = StampConfig::new()
            .with_actor_source(FixedActorIp(Some(ip("127.0.0.5"))))
            .with_value(ValueSource::computed(|_| Some("192.168.0.7".into())));
        let mut stamped = Stamped::attach(Attrs::new(), Arc::new(config));
        stamped.notify(LifecycleEvent::BeforeInsert);

        assert_eq!(stamped.created_from(), Some("192.168.0.7"));
    }

    #[test]
    fn explicit_empty_value_stores_nothing() {
        let config = StampConfig::new()
            .with_actor_source(FixedActorIp(Some(ip("127.0.0.5"))))
            .with_value("");
        let mut attrs = Attrs::new();
        attrs.set_attribute("updated_from", Some(AttributeValue::Blob(vec![127, 0, 0, 2])));

        let mut stamped = Stamped::attach(attrs, Arc::new(config));
        stamped.notify(LifecycleEvent::BeforeUpdate);

        assert_eq!(blob(stamped.record(), "updated_from"), None);
        assert_eq!(stamped.updated_from(), None);
    }

    #[test]
    fn default_value_without_live_ip() {
        let config = StampConfig::new()
            .with_actor_source(FixedActorIp(None))
            .with_default_value(ValueSource::computed(|event| match event {
                LifecycleEvent::BeforeInsert => Some("127.0.0.99".into()),
                _ => Some("127.0.0.98".into()),
            }));
        let mut stamped = Stamped::attach(Attrs::new(), Arc::new(config));

        stamped.notify(LifecycleEvent::BeforeInsert);
        assert_eq!(stamped.created_from(), Some("127.0.0.99"));

        stamped.notify(LifecycleEvent::BeforeUpdate);
        assert_eq!(stamped.created_from(), Some("127.0.0.99"));
        assert_eq!(stamped.updated_from(), Some("127.0.0.98"));
    }

    #[test]
    fn no_source_stamps_none() {
        let config = StampConfig::new().with_actor_source(FixedActorIp(None));
        let mut stamped = Stamped::attach(Attrs::new(), Arc::new(config));
        stamped.notify(LifecycleEvent::BeforeInsert);

        assert!(stamped.record().is_empty());
        assert_eq!(stamped.created_from(), None);
    }

    #[test]
    fn ambient_actor_ip_is_default_source() {
        let mut stamped = Stamped::attach(Attrs::new(), Arc::new(StampConfig::new()));
        sync_with_actor_ip(ip("2001:db8::5"), || stamped.notify(LifecycleEvent::BeforeInsert));

        assert_eq!(stamped.created_from(), Some("2001:db8::5"));
        assert_eq!(blob(stamped.record(), "created_from").map(|b| b.len()), Some(16));
    }

    #[test]
    fn refresh_invalidates_cache() {
        let mut stamped = Stamped::attach(Attrs::new(), live("127.0.0.5"));
        stamped.notify(LifecycleEvent::BeforeInsert);
        assert_eq!(stamped.created_from(), Some("127.0.0.5"));

        stamped
            .record_mut()
            .set_attribute("created_from", Some(AttributeValue::Blob(vec![10, 0, 0, 9])));
        assert_eq!(stamped.created_from(), Some("127.0.0.5"));

        stamped.notify(LifecycleEvent::AfterRefresh);
        assert_eq!(stamped.created_from(), Some("10.0.0.9"));
    }

    #[test]
    fn disabled_fields_are_untouched() {
        let config = StampConfig::new()
            .with_actor_source(FixedActorIp(Some(ip("127.0.0.5"))))
            .without_created_from()
            .with_updated_from_attribute("");
        let mut attrs = Attrs::new();
        attrs.set_attribute("created_from", Some(AttributeValue::Blob(vec![1, 1, 1, 1])));

        let mut stamped = Stamped::attach(attrs, Arc::new(config));
        stamped.notify(LifecycleEvent::BeforeInsert);
        stamped.notify(LifecycleEvent::BeforeUpdate);
        stamped.set_created_from(Some("8.8.8.8"));

        assert_eq!(stamped.created_from(), None);
        assert_eq!(stamped.updated_from(), None);
        assert_eq!(stamped.record().len(), 1);
        assert_eq!(blob(stamped.record(), "created_from"), Some(vec![1, 1, 1, 1]));
    }

    #[test]
    fn value_is_resolved_once_per_event() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let config = StampConfig::new().with_value(ValueSource::computed(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some("10.0.0.1".into())
        }));
        let mut stamped = Stamped::attach(Attrs::new(), Arc::new(config));

        stamped.notify(LifecycleEvent::BeforeInsert);
        stamped.notify(LifecycleEvent::AfterRefresh);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_value_survives_next_stamp() {
        let mut stamped = Stamped::attach(Attrs::new(), live("127.0.0.5"));
        stamped.set_created_from(Some("78de:d961:7af9:2bf1:4dd2:d676:00b6:0ea2"));
        stamped.set_updated_from(Some(""));
        assert_eq!(stamped.created_from(), Some("78de:d961:7af9:2bf1:4dd2:d676:b6:ea2"));

        stamped.notify(LifecycleEvent::BeforeInsert);
        assert_eq!(stamped.created_from(), Some("78de:d961:7af9:2bf1:4dd2:d676:b6:ea2"));
        assert_eq!(stamped.updated_from(), None);
        assert_eq!(blob(stamped.record(), "updated_from"), None);

        stamped.notify(LifecycleEvent::BeforeUpdate);
        assert_eq!(stamped.updated_from(), Some("127.0.0.5"));
    }

    #[test]
    fn preserve_keeps_existing_values() {
        let config = StampConfig::new()
            .with_actor_source(FixedActorIp(Some(ip("127.0.0.5"))))
            .with_preserve_non_empty_values(true);
        let mut attrs = Attrs::new();
        attrs.set_attribute("created_from", Some(AttributeValue::Blob(vec![127, 0, 0, 25])));

        let mut stamped = Stamped::attach(attrs, Arc::new(config));
        stamped.notify(LifecycleEvent::BeforeInsert);

        assert_eq!(stamped.created_from(), Some("127.0.0.25"));
        assert_eq!(stamped.updated_from(), Some("127.0.0.5"));
    }

    #[test]
    fn text_format_stores_as_is() {
        let config = StampConfig::new()
            .with_actor_source(FixedActorIp(Some(ip("127.0.0.5"))))
            .with_format(Format::Text)
            .with_created_from_attribute("created_ip")
            .with_updated_from_attribute("updated_ip");
        let mut stamped = Stamped::attach(Attrs::new(), Arc::new(config));
        stamped.notify(LifecycleEvent::BeforeInsert);

        assert_eq!(
            stamped.record().attribute("created_ip"),
            Some(AttributeValue::Text("127.0.0.5".into()))
        );
        assert_eq!(stamped.updated_from(), Some("127.0.0.5"));
    }

    #[test]
    fn settings_convert_to_config() {
        let settings = StampSettings {
            created_from_attribute: String::new(),
            default_value: Some("127.0.0.99".into()),
            format: Format::Text,
            ..StampSettings::default()
        };
        let config = StampConfig::from(settings).with_actor_source(FixedActorIp(None));

        assert_eq!(config.attribute(StampField::CreatedFrom), None);
        assert_eq!(config.attribute(StampField::UpdatedFrom), Some("updated_from"));
        assert_eq!(config.format(), Format::Text);
        assert_eq!(
            config.resolve_value(&LifecycleEvent::BeforeUpdate),
            Some(AttributeValue::Text("127.0.0.99".into()))
        );
    }
}
