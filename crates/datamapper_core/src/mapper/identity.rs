//! Identity and domain-object capabilities required by the mapper.

use crate::store::StoreValue;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use uuid::Uuid;

/// Key that uniquely identifies one logical row.
///
/// Fixed per concrete mapping; equal identities denote the same entity.
pub trait Identity: Clone + Eq + Hash + Debug + Display {
    /// Whether this value counts as "no identity" (empty key, nil uuid, ...).
    fn is_blank(&self) -> bool;
    fn to_store_value(&self) -> StoreValue;
    /// Reads an identity back from a fetched column; `None` on shape mismatch.
    fn from_store_value(value: &StoreValue) -> Option<Self>;
}

impl Identity for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }

    fn to_store_value(&self) -> StoreValue {
        StoreValue::Text(self.clone())
    }

    fn from_store_value(value: &StoreValue) -> Option<Self> {
        match value {
            StoreValue::Text(text) => Some(text.clone()),
            _ => None,
        }
    }
}

impl Identity for i64 {
    fn is_blank(&self) -> bool {
        false
    }

    fn to_store_value(&self) -> StoreValue {
        StoreValue::Integer(*self)
    }

    fn from_store_value(value: &StoreValue) -> Option<Self> {
        match value {
            StoreValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl Identity for Uuid {
    fn is_blank(&self) -> bool {
        self.is_nil()
    }

    fn to_store_value(&self) -> StoreValue {
        StoreValue::from(*self)
    }

    fn from_store_value(value: &StoreValue) -> Option<Self> {
        match value {
            StoreValue::Text(text) => Uuid::parse_str(text).ok(),
            _ => None,
        }
    }
}

/// In-memory object mapped to exactly one row.
pub trait DomainObject {
    type Id: Identity;

    /// Returns the identity, or `None` while the object has not been keyed.
    fn id(&self) -> Option<&Self::Id>;
    fn set_id(&mut self, id: Self::Id);
}
