use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a newtype wrapper around a `String` identifier.
///
/// Every resource in the model is keyed by one of these rather than a bare
/// `String`, so a volume id can never be passed where a host id is expected.
macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Serialize, Deserialize, Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Default,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generates a new random identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
            /// Borrows the identifier as a plain string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_type!(SystemId);
id_type!(HostId);
id_type!(VolumeId);
id_type!(SettingId);
id_type!(SnapshotId);
