use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a random UUID-backed identifier for runtime records.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.0.to_string()[..8])
            }
        }
    };
}

/// Declares a human-readable string key for catalog entries.
macro_rules! key_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from any string-like value.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// The key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// The user account that owns one or more characters.
    UserId
);
uuid_id!(
    /// Unique identifier of a character.
    ///
    /// Ordered, so that two characters' exclusive sections can always be
    /// acquired in the same order.
    CharacterId
);
uuid_id!(
    /// Unique identifier of an inventory entry (an item instance or stack).
    EntryId
);
uuid_id!(
    /// Unique identifier of a recorded dice roll.
    RollId
);
uuid_id!(
    /// Unique identifier of one attempt at a quest.
    ProgressId
);

key_id!(
    /// Catalog key of an item definition (e.g. `healing_potion`).
    ItemId
);
key_id!(
    /// Catalog key of a quest definition.
    QuestId
);
key_id!(
    /// Catalog key of a faction.
    FactionId
);
key_id!(
    /// Key of an objective within a quest.
    ObjectiveId
);
key_id!(
    /// Key of an objective group (branch) within a quest.
    GroupId
);
