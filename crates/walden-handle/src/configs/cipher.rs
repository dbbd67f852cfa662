// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keys an encrypted database as soon as the connection opens.

use walden_core::WaldenError;
use zeroize::Zeroizing;

use super::HandleConfig;
use crate::handle::Handle;

/// Holds key bytes until dropped, then wipes them.
pub struct CipherConfig {
    key: Zeroizing<Vec<u8>>,
}

impl CipherConfig {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Zeroizing::new(key.into()),
        }
    }
}

impl std::fmt::Debug for CipherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherConfig")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl HandleConfig for CipherConfig {
    fn name(&self) -> &str {
        "walden.cipher"
    }

    fn invoke(&self, handle: &mut Handle) -> Result<(), WaldenError> {
        handle.set_cipher_key(&self.key)
    }
}
