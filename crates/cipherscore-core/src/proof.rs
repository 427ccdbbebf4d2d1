//! Opaque byte payloads exchanged with the confidential engine.
//!
//! The ledger never looks inside these. They only travel between the caller
//! and the engine.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_bytes {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Bytes);

        impl $name {
            pub fn new(bytes: impl Into<Bytes>) -> Self {
                Self(bytes.into())
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({} bytes)"), self.0.len())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(Bytes::from(bytes))
            }
        }
    };
}

opaque_bytes!(
    /// A ciphertext as submitted by a caller, before the engine ingests it.
    ExternalCiphertext
);

opaque_bytes!(
    /// Evidence that an [`ExternalCiphertext`] is well-formed.
    ValidityProof
);

opaque_bytes!(
    /// Evidence that a plaintext is the true decryption of a set of handles.
    DecryptionProof
);
