use std::fmt;

use serde::Serialize;

// Shared shape for every counter wrapper.
macro_rules! define_counter_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns the successor value.
            pub const fn next(self) -> Self {
                Self(self.0.wrapping_add(1))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }
    };
}

define_counter_id!(
    /// Supersede counter. Bumped on every new image selection or chat close so that
    /// completions issued under an older value can be rejected.
    Generation
);
define_counter_id!(
    /// Identifier of one outgoing network request.
    RequestId
);
define_counter_id!(
    /// Position of a message in the chat transcript.
    MessageSeq
);
