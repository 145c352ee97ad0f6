use std::collections::HashMap;

/// Raw value of a stamped attribute as the record stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Blob(Vec<u8>),
    Text(String),
}

impl AttributeValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Blob(b) => b,
            Self::Text(t) => t.as_bytes(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Blob(b) => b,
            Self::Text(t) => t.into_bytes(),
        }
    }

    /// `None` when a blob isn't valid utf-8.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Blob(b) => String::from_utf8(b).ok(),
            Self::Text(t) => Some(t),
        }
    }
}

/// Named, mutable attributes of a persistable record.
pub trait AttributeStore {
    fn attribute(&self, name: &str) -> Option<AttributeValue>;
    fn set_attribute(&mut self, name: &str, value: Option<AttributeValue>);
}

impl AttributeStore for HashMap<String, AttributeValue> {
    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.get(name).cloned()
    }

    fn set_attribute(&mut self, name: &str, value: Option<AttributeValue>) {
        match value {
            Some(value) => {
                self.insert(name.to_string(), value);
            }
            None => {
                self.remove(name);
            }
        }
    }
}

/// A struct field that `#[derive(AttributeStore)]` can expose as an attribute.
pub trait AttributeField {
    fn to_attribute(&self) -> Option<AttributeValue>;
    fn assign(&mut self, value: Option<AttributeValue>);
}

impl AttributeField for Option<Vec<u8>> {
    fn to_attribute(&self) -> Option<AttributeValue> {
        self.clone().map(AttributeValue::Blob)
    }

    fn assign(&mut self, value: Option<AttributeValue>) {
        *self = value.map(AttributeValue::into_bytes);
    }
}

impl AttributeField for Option<String> {
    fn to_attribute(&self) -> Option<AttributeValue> {
        self.clone().map(AttributeValue::Text)
    }

    fn assign(&mut self, value: Option<AttributeValue>) {
        *self = value.and_then(AttributeValue::into_text);
    }
}
