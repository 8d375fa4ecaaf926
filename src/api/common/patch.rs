//
//  bkt-cli
//  api/common/patch.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Tri-state field carrier for partial update bodies.
//!
//! Bitbucket update endpoints distinguish between a field that is absent
//! (leave it alone) and a field that is present with `null` (clear it).
//! `Option<T>` cannot express both, so update request types use [`Patch`]:
//!
//! | Variant | JSON body |
//! |---------|-----------|
//! | `Patch::Unset` | field omitted |
//! | `Patch::Null` | `"field": null` |
//! | `Patch::Value(v)` | `"field": v` |
//!
//! Fields must be declared with
//! `#[serde(default, skip_serializing_if = "Patch::is_unset")]` so that unset
//! fields never reach the wire.
//!
//! ```rust
//! use bkt::api::common::Patch;
//! use serde::Serialize;
//!
//! #[derive(Serialize, Default)]
//! struct Update {
//!     #[serde(skip_serializing_if = "Patch::is_unset")]
//!     title: Patch<String>,
//!     #[serde(skip_serializing_if = "Patch::is_unset")]
//!     assignee: Patch<String>,
//! }
//!
//! let body = Update { title: Patch::Value("New".into()), assignee: Patch::Null };
//! assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"title":"New","assignee":null}"#);
//! ```

use serde::{Serialize, Serializer};

/// A partially-updatable field: unset, explicitly cleared, or set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Not part of the update; omitted from the body.
    Unset,
    /// Explicit clear; encoded as JSON `null`.
    Null,
    /// Explicit new value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Patch<T> {
    /// `true` when the field should be left out of the body.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// `true` when the field is present (as a value or as null).
    pub fn is_set(&self) -> bool {
        !self.is_unset()
    }

    /// Borrow the value, if one was supplied.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Maps `Some(v)` to `Value(v)` and `None` to `Unset`.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Self::Value)
    }
}

impl Patch<String> {
    /// CLI convenience: an empty string means "clear the field".
    pub fn from_flag(value: Option<String>) -> Self {
        match value {
            None => Self::Unset,
            Some(v) if v.trim().is_empty() => Self::Null,
            Some(v) => Self::Value(v),
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unset | Self::Null => serializer.serialize_none(),
            Self::Value(v) => v.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Default)]
    struct Body {
        #[serde(skip_serializing_if = "Patch::is_unset")]
        title: Patch<String>,
        #[serde(skip_serializing_if = "Patch::is_unset")]
        milestone: Patch<String>,
        #[serde(skip_serializing_if = "Patch::is_unset")]
        votes: Patch<u32>,
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let body = Body::default();
        assert_eq!(serde_json::to_string(&body).unwrap(), "{}");
    }

    #[test]
    fn test_null_and_value_are_distinct() {
        let body = Body {
            title: Patch::Value("Fix login".to_string()),
            milestone: Patch::Null,
            votes: Patch::Unset,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"title":"Fix login","milestone":null}"#
        );
    }

    #[test]
    fn test_from_flag() {
        assert_eq!(Patch::from_flag(None), Patch::Unset);
        assert_eq!(Patch::from_flag(Some("  ".to_string())), Patch::Null);
        assert_eq!(
            Patch::from_flag(Some("v2".to_string())),
            Patch::Value("v2".to_string())
        );
    }
}
