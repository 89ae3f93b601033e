// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain        = { "main",        "'main'" },
    with_space   = { "a b",         "'a b'" },
    single_quote = { "it's",        r"'it'\''s'" },
    dollar       = { "$HOME",       "'$HOME'" },
)]
fn shell_quote_cases(input: &str, expected: &str) {
    assert_eq!(shell_quote(input), expected);
}

#[test]
fn build_command_carries_keep_hint_and_hash() {
    let cmd = build_command("abc123", true);
    assert!(cmd.contains("ham build --keep-server --sum 'abc123'"));
    assert!(cmd.contains("--recipe /ham-recipe --vars /ham-files/vars.json"));
    assert!(cmd.ends_with('&'));

    let cmd = build_command("abc123", false);
    assert!(!cmd.contains("--keep-server"));
}

#[test]
fn clone_commands_checkout_branch_only_when_given() {
    assert_eq!(clone_commands("https://x/r.git", None).len(), 2);
    let cmds = clone_commands("https://x/r.git", Some("dev"));
    assert_eq!(cmds.last().map(String::as_str), Some("git -C /ham-recipe checkout 'dev'"));
}

#[test]
fn file_slots_are_one_based() {
    assert_eq!(file_slot(1), "/ham-files/1");
}
