// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classes for remote operations.

/// Why a remote operation failed.
///
/// Upstream policy (retry, keep, destroy) is chosen per class, so errors
/// carry one of these rather than a bare message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Cannot connect at the transport level (TCP, handshake).
    Transport,
    /// Cannot establish or authenticate an SSH session.
    Session,
    /// Session is up but a shell/exec channel cannot be opened.
    Shell,
    /// The remote agent emitted a status payload we cannot parse.
    MalformedStatus,
    /// The remote agent reported that the build failed.
    BuildFailed,
    /// Anything else.
    Other,
}

crate::simple_display! {
    FailureClass {
        Transport => "cannot connect",
        Session => "cannot establish session",
        Shell => "cannot open shell",
        MalformedStatus => "malformed status",
        BuildFailed => "build failed",
        Other => "unknown error",
    }
}

impl FailureClass {
    /// Connection-level failures: the session should be dropped and reopened.
    pub fn is_connection(&self) -> bool {
        matches!(self, FailureClass::Transport | FailureClass::Session | FailureClass::Shell)
    }
}

/// What happened to the server when an orchestration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerFate {
    /// Kept running on purpose (keep flag or not yet decided).
    Kept,
    /// Deleted.
    Destroyed,
    /// Deletion was decided but failed; the server may still be billed.
    DestroyFailed,
}

crate::simple_display! {
    ServerFate {
        Kept => "server kept and still running",
        Destroyed => "server destroyed",
        DestroyFailed => "server destroy failed, it may still be running",
    }
}
