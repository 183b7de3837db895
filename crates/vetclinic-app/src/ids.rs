// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// The directory service may hand ids back as JSON strings or integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Uint(u64),
}

impl From<RawId> for String {
    fn from(value: RawId) -> Self {
        match value {
            RawId::Text(text) => text,
            RawId::Int(value) => value.to_string(),
            RawId::Uint(value) => value.to_string(),
        }
    }
}

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Blank ids mean the service did not assign one.
            pub fn is_assigned(&self) -> bool {
                !self.0.trim().is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = Option::<RawId>::deserialize(deserializer)?;
                Ok(Self(raw.map(String::from).unwrap_or_default()))
            }
        }
    };
}

entity_id!(ClientId);
entity_id!(PetId);
entity_id!(HistoryId);

#[cfg(test)]
mod tests {
    use super::{ClientId, PetId};

    #[test]
    fn ids_accept_strings_and_integers() {
        let text: ClientId = serde_json::from_str("\"c1\"").expect("string id");
        assert_eq!(text, ClientId::new("c1"));

        let number: PetId = serde_json::from_str("42").expect("integer id");
        assert_eq!(number.as_str(), "42");
    }

    #[test]
    fn null_and_blank_ids_are_unassigned() {
        let null: ClientId = serde_json::from_str("null").expect("null id");
        assert!(!null.is_assigned());
        assert!(!ClientId::new("  ").is_assigned());
        assert!(ClientId::new("c1").is_assigned());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let encoded = serde_json::to_string(&PetId::new("p7")).expect("encode id");
        assert_eq!(encoded, "\"p7\"");
    }
}
