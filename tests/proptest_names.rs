// SPDX-License-Identifier: MIT
//! Property-based tests for workspace display names.
//!
//! Run with: cargo test --test proptest_names

use hintd::workspace::switcher::display_name;
use proptest::prelude::*;
use std::path::PathBuf;

/// Workspace bundle names: no path separators, no dots.
fn bundle_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ -]{1,24}"
}

proptest! {
    /// Stripping is exact: `<name>.xcworkspace` and `<name>.xcodeproj`
    /// always display as `<name>`, regardless of parent directories.
    #[test]
    fn known_suffixes_are_stripped(name in bundle_name(), parent in "[a-z]{1,8}") {
        for suffix in [".xcworkspace", ".xcodeproj"] {
            let path = PathBuf::from(format!("/Users/{parent}/{name}{suffix}"));
            prop_assert_eq!(display_name(&path), name.clone());
        }
    }

    /// A final component without a known suffix passes through unchanged.
    #[test]
    fn unknown_names_pass_through(name in bundle_name()) {
        let path = PathBuf::from(format!("/tmp/{name}"));
        prop_assert_eq!(display_name(&path), name);
    }

    /// Parent directories never leak into the display name, even when a
    /// parent itself carries a workspace suffix.
    #[test]
    fn only_final_component_matters(outer in bundle_name(), inner in bundle_name()) {
        let path = PathBuf::from(format!("/w/{outer}.xcworkspace/{inner}.xcodeproj"));
        prop_assert_eq!(display_name(&path), inner);
    }
}
