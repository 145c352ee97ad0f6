use std::fmt::Debug;
use std::sync::Arc;

use crate::event::LifecycleEvent;

type ValueFn = dyn Fn(&LifecycleEvent) -> Option<String> + Send + Sync;

/// Where a stamp's raw textual ip comes from: a constant or a function of the event.
#[derive(Clone)]
pub enum ValueSource {
    Static(Option<String>),
    Computed(Arc<ValueFn>),
}

impl ValueSource {
    pub fn fixed(value: impl Into<String>) -> Self {
        Self::Static(Some(value.into()))
    }

    pub fn empty() -> Self {
        Self::Static(None)
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&LifecycleEvent) -> Option<String> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Empty strings resolve to `None`.
    pub fn resolve(&self, event: &LifecycleEvent) -> Option<String> {
        let value = match self {
            Self::Static(value) => value.clone(),
            Self::Computed(f) => f(event),
        };
        value.filter(|v| !v.is_empty())
    }
}

impl Debug for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Computed(_) => f.debug_tuple("Computed").field(&"<fn>").finish(),
        }
    }
}

impl From<&str> for ValueSource {
    fn from(value: &str) -> Self {
        Self::fixed(value)
    }
}

impl From<String> for ValueSource {
    fn from(value: String) -> Self {
        Self::Static(Some(value))
    }
}
