// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build identity derived from recipe content.
//!
//! The identity is the one name every cloud-side artifact of a build hangs
//! off: the server name, the volume name prefix and the status label key.
//! Two invocations with the same recipe content always land on the same name.

use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};

/// Number of digest bytes kept in the name (160 bits).
const DIGEST_BYTES: usize = 20;

/// Deterministic name of a build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct BuildIdentity(String);

impl BuildIdentity {
    pub const PREFIX: &'static str = "ham-";

    /// Derive the identity for a recipe content hash.
    pub fn for_hash(content_hash: &str) -> Self {
        let digest = Sha256::digest(content_hash.as_bytes());
        let mut name = String::with_capacity(Self::PREFIX.len() + DIGEST_BYTES * 2);
        name.push_str(Self::PREFIX);
        for byte in &digest[..DIGEST_BYTES] {
            let _ = write!(name, "{byte:02x}");
        }
        Self(name)
    }

    /// Wrap a name that is already an identity (e.g. read back from the provider).
    pub fn from_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the data volume attached to this build's server.
    pub fn volume_name(&self) -> String {
        format!("{}-vol", self.0)
    }

    /// File name of the local variables document for this build.
    pub fn vars_file_name(&self) -> String {
        format!("{}-vars.json", self.0)
    }

    /// Whether a server name looks like one we created.
    pub fn is_build_name(name: &str) -> bool {
        name.strip_prefix(Self::PREFIX).is_some_and(|rest| {
            rest.len() == DIGEST_BYTES * 2
                && rest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        })
    }
}

impl fmt::Display for BuildIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BuildIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
