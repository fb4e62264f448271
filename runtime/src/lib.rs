// Copyright 2026 serp-harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! serp-harvest: keyword search results from a live search page, with a
//! structured search API as fallback, persisted to an append-only store.
//!
//! The library exposes every layer so the binary and the integration tests
//! wire the same pieces.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod renderer;
pub mod rest;
pub mod store;

#[cfg(test)]
mod tests {
    const HEADER: &str = "// Copyright 2026 serp-harvest Contributors\n// SPDX-License-Identifier: Apache-2.0\n";

    #[test]
    fn test_license_header_names_this_project() {
        for source in [
            include_str!("lib.rs"),
            include_str!("main.rs"),
            include_str!("rest.rs"),
        ] {
            assert!(source.starts_with(HEADER));
        }
    }
}
