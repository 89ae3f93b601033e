// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    with_progress = { r#"{"status":"running","message":"syncing","progress":7}"#, "[  7%] running: syncing" },
    no_progress   = { r#"{"status":"successful"}"#,                               "[----] successful" },
    empty_message = { r#"{"status":"failed","message":""}"#,                      "[----] failed" },
)]
fn status_formatting(line: &str, expected: &str) {
    let status = RemoteStatus::parse(line).unwrap();
    assert_eq!(format_status(&status), expected);
}

#[test]
fn fake_records_events_in_order() {
    let display = FakeDisplay::new();
    display.notice("creating server");
    display.log_line("step 1");
    assert_eq!(display.notices(), vec!["creating server"]);
    assert_eq!(display.log_lines(), vec!["step 1"]);
    assert_eq!(display.events().len(), 2);
}
