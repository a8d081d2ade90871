use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque string identifiers exchanged with the server. They are never
/// parsed or compared structurally; the newtypes only keep one kind of id
/// from being handed where another belongs.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id! {
    /// A playable catalog item (movie or episode).
    ItemId
}

string_id! {
    /// The series an episode belongs to; anchors neighbor queries.
    SeriesId
}

string_id! {
    /// Server-issued identity of one playback session, carried on every
    /// playstate report.
    PlaySessionId
}

string_id! {
    /// A discoverable remote playback device.
    DeviceId
}

string_id! {
    /// The authenticated user on whose behalf reports are sent.
    UserId
}

string_id! {
    /// The server a cast command should act against.
    ServerId
}
