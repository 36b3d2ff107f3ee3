//! Type-safe identifier wrappers around compact string slugs.
//!
//! Every entity in the simulation has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. World content is
//! hand-authored (locations, lords, companions) or minted by the content
//! provider (quests), so the payload is a short lowercase slug rather
//! than a UUID.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a string slug with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(slug: impl Into<String>) -> Self {
                Self(slug.into())
            }

            /// Borrow the inner slug.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner slug.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(slug: &str) -> Self {
                Self(slug.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(slug: String) -> Self {
                Self(slug)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a settlement on the world map.
    LocationId
}

define_id! {
    /// Unique identifier for an AI-controlled lord.
    LordId
}

define_id! {
    /// Unique identifier for a recruitable companion.
    CompanionId
}

define_id! {
    /// Unique identifier for a quest (minted by the content provider).
    QuestId
}
