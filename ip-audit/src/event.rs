use std::fmt::Display;

/// Record lifecycle points the stamper reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    BeforeInsert,
    BeforeUpdate,
    AfterRefresh,
}

impl Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BeforeInsert => "before_insert",
            Self::BeforeUpdate => "before_update",
            Self::AfterRefresh => "after_refresh",
        };
        write!(f, "{name}")
    }
}

/// Which of the two audit stamps an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StampField {
    CreatedFrom,
    UpdatedFrom,
}

impl StampField {
    /// Fields written when `event` fires.
    pub fn stamped_on(event: LifecycleEvent) -> &'static [StampField] {
        match event {
            LifecycleEvent::BeforeInsert => &[Self::CreatedFrom, Self::UpdatedFrom],
            LifecycleEvent::BeforeUpdate => &[Self::UpdatedFrom],
            LifecycleEvent::AfterRefresh => &[],
        }
    }
}

/// Explicit callback a repository invokes around its save and load operations.
pub trait LifecycleHook<R: ?Sized> {
    fn on_event(&mut self, event: LifecycleEvent, record: &mut R);
}
