// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{ArgKind, FailureClass, Recipe, RecipeArg};

// ── Proptest strategies ─────────────────────────────────────────────────

pub mod strategies {
    use crate::{FailureClass, KeepFlags};
    use proptest::prelude::*;

    pub fn arb_keep_flags() -> impl Strategy<Value = KeepFlags> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(keep, on_connect_fail, on_track_fail, on_build_fail)| KeepFlags {
                keep,
                on_connect_fail,
                on_track_fail,
                on_build_fail,
            },
        )
    }

    pub fn arb_failure_class() -> impl Strategy<Value = FailureClass> {
        prop_oneof![
            Just(FailureClass::Transport),
            Just(FailureClass::Session),
            Just(FailureClass::Shell),
            Just(FailureClass::MalformedStatus),
            Just(FailureClass::BuildFailed),
            Just(FailureClass::Other),
        ]
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────

/// Recipe with the given content hash and no arguments.
pub fn bare_recipe(content_hash: &str) -> Recipe {
    Recipe::builder().content_hash(content_hash).build()
}

/// Recipe with one argument of each kind: `device` (required value),
/// `token` (optional secret), `key` (optional file).
pub fn recipe_with_args(content_hash: &str) -> Recipe {
    Recipe::builder()
        .content_hash(content_hash)
        .args(vec![
            RecipeArg::new("device", ArgKind::Value).prompt("Device codename").required(true),
            RecipeArg::new("token", ArgKind::Secret).prompt("Upload token"),
            RecipeArg::new("key", ArgKind::File).prompt("Signing key"),
        ])
        .build()
}

/// Every connection-level failure class.
pub const CONNECTION_CLASSES: [FailureClass; 3] =
    [FailureClass::Transport, FailureClass::Session, FailureClass::Shell];
