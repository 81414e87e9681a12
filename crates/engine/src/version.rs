// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit baked in at build time through `RK_COMMIT`, if any
pub fn commit() -> Option<&'static str> {
    option_env!("RK_COMMIT").filter(|commit| !commit.is_empty())
}

/// Version string for logs and `--version` output
pub fn version() -> String {
    match commit() {
        Some(commit) => format!("{} ({})", PKG_VERSION, commit),
        None => PKG_VERSION.to_string(),
    }
}
