// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reusable units of per-connection setup.
//!
//! A config is installed on an opened [`Handle`] and may register observers,
//! run pragmas or key the database. Configs that register observers must
//! remove exactly what they added in [`HandleConfig::uninvoke`].

pub mod basic;
pub mod cipher;
pub mod trace;

pub use basic::BasicConfig;
pub use cipher::CipherConfig;
pub use trace::TraceConfig;

use walden_core::WaldenError;

use crate::handle::Handle;

/// The base trait for all connection configs.
pub trait HandleConfig: Send + Sync {
    /// Returns the name this config registers its observers under.
    fn name(&self) -> &str;

    /// Applies the config to an opened handle.
    fn invoke(&self, handle: &mut Handle) -> Result<(), WaldenError>;

    /// Reverts whatever `invoke` registered. Pragmas are left in place.
    fn uninvoke(&self, handle: &mut Handle) -> Result<(), WaldenError> {
        let _ = handle;
        Ok(())
    }
}
