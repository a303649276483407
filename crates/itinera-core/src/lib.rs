// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

pub mod auth;
pub mod config;
pub mod provider;
pub mod reconcile;
pub mod request;
pub mod response;
pub mod session;
pub mod store;

pub use itinera_codec as codec;

use std::path::PathBuf;

/// Platform config directory (`~/.config/itinera` on Linux). Falls back to a
/// local `.itinera` directory when no home directory can be resolved.
pub fn get_config_root() -> PathBuf {
    directories::ProjectDirs::from("org", "itinera", "Itinera")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".itinera"))
}
