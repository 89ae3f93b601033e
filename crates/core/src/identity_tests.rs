// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn identity_has_prefix_and_fixed_length() {
    let id = BuildIdentity::for_hash("abc");
    assert!(id.as_str().starts_with("ham-"));
    assert_eq!(id.as_str().len(), 44);
    assert!(BuildIdentity::is_build_name(id.as_str()));
}

#[test]
fn identity_is_lowercase_hex_of_the_digest() {
    // sha256("abc") = ba7816bf8f01cfea414140de5dae2223b00361a3 96177a9c...
    assert_eq!(
        BuildIdentity::for_hash("abc").as_str(),
        "ham-ba7816bf8f01cfea414140de5dae2223b00361a3"
    );
}

#[test]
fn volume_name_fits_provider_limit() {
    let id = BuildIdentity::for_hash("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    assert_eq!(id.volume_name(), format!("{}-vol", id));
    assert!(id.volume_name().len() <= 63);
}

#[yare::parameterized(
    foreign_server   = { "web-1", false },
    prefix_only      = { "ham-", false },
    uppercase_hex    = { "ham-ABCDEF0123456789ABCDEF0123456789ABCDEF01", false },
    too_short        = { "ham-abcdef", false },
    valid            = { "ham-abcdef0123456789abcdef0123456789abcdef01", true },
)]
fn build_name_detection(name: &str, expected: bool) {
    assert_eq!(BuildIdentity::is_build_name(name), expected);
}

proptest! {
    #[test]
    fn same_hash_same_identity(hash in "[0-9a-f]{64}") {
        prop_assert_eq!(BuildIdentity::for_hash(&hash), BuildIdentity::for_hash(&hash));
    }

    #[test]
    fn different_hashes_different_identities(a in "[0-9a-f]{64}", b in "[0-9a-f]{64}") {
        prop_assume!(a != b);
        prop_assert_ne!(BuildIdentity::for_hash(&a), BuildIdentity::for_hash(&b));
    }
}
