// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn error_display_names_the_class() {
    let err = RemoteError::transport("connection refused");
    assert_eq!(err.to_string(), "cannot connect: connection refused");
    assert_eq!(RemoteError::other("x").class, FailureClass::Other);
}

#[yare::parameterized(
    empty          = { "",             &[],             "" },
    one_line       = { "a\n",          &["a"],          "" },
    partial        = { "a\nbc",        &["a"],          "bc" },
    crlf           = { "a\r\nb\r\n",   &["a", "b"],     "" },
    blank_between  = { "a\n\nb\n",     &["a", "", "b"], "" },
)]
fn drains_complete_lines(input: &str, expected: &[&str], rest: &str) {
    let mut buffer = input.to_string();
    assert_eq!(drain_lines(&mut buffer), expected);
    assert_eq!(buffer, rest);
}

#[test]
fn command_output_success() {
    assert!(CommandOutput::default().success());
    assert!(!CommandOutput { exit_code: 1, ..Default::default() }.success());
}
