// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lifecycle::ServerLifecycle;
use ham_adapters::{
    DisplayEvent, FakeCloudProvider, FakeDisplay, FakeLabelStore, FakeRemote, ServerStatus,
};
use std::time::Duration;
use tokio::time::Instant;
use yare::parameterized;

struct Harness {
    tracker: Tracker<FakeRemote, FakeLabelStore, FakeDisplay>,
    guard: CleanupGuard<FakeCloudProvider>,
    remote: FakeRemote,
    labels: FakeLabelStore,
    display: FakeDisplay,
    cloud: FakeCloudProvider,
}

fn harness(keep: KeepFlags) -> Harness {
    let identity = BuildIdentity::for_hash("abc");
    let cloud = FakeCloudProvider::new();
    cloud.add_server(identity.as_str(), ServerStatus::Running);
    let guard = CleanupGuard::new(ServerLifecycle::new(cloud.clone()), identity.clone());
    guard.arm();
    let remote = FakeRemote::new();
    let labels = FakeLabelStore::new();
    let display = FakeDisplay::new();
    let tracker = Tracker::new(
        remote.clone(),
        "10.0.0.1:22",
        labels.clone(),
        display.clone(),
        identity,
        keep,
    );
    Harness { tracker, guard, remote, labels, display, cloud }
}

impl Harness {
    fn record(&self, value: &str) {
        self.labels.insert(self.guard.identity().as_str(), value);
    }
}

#[tokio::test(start_paused = true)]
async fn clean_probe_and_success_label() {
    let h = harness(KeepFlags::default());
    h.remote.script_probe(
        [r#"{"status":"running","message":"syncing","progress":7}"#, r#"{"status":"successful"}"#],
        0,
    );
    h.record("successful");

    let outcome = h.tracker.track(&h.guard).await.unwrap();

    assert_eq!(outcome, TrackOutcome::Succeeded);
    assert!(!h.guard.is_armed());
    assert_eq!(h.cloud.servers().len(), 1);
    let statuses =
        h.display.events().into_iter().filter(|e| matches!(e, DisplayEvent::Status(_))).count();
    assert_eq!(statuses, 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_status_exhaustion_destroys() {
    let h = harness(KeepFlags::default());
    for _ in 0..11 {
        h.remote.script_probe(["<html>502 Bad Gateway</html>"], 0);
    }
    let start = Instant::now();

    let err = h.tracker.track(&h.guard).await.unwrap_err();

    assert_eq!(err.class(), FailureClass::MalformedStatus);
    assert_eq!(err.fate(), ServerFate::Destroyed);
    assert!(err.to_string().contains("malformed status"));
    assert!(h.cloud.servers().is_empty());
    assert!(start.elapsed() >= Duration::from_secs(9 * 600));
}

#[tokio::test(start_paused = true)]
async fn malformed_status_recovers_before_exhaustion() {
    let h = harness(KeepFlags::default());
    for _ in 0..9 {
        h.remote.script_probe(["garbage"], 0);
    }
    h.record("successful");

    assert_eq!(h.tracker.track(&h.guard).await.unwrap(), TrackOutcome::Succeeded);
    assert_eq!(h.cloud.servers().len(), 1);
}

#[parameterized(
    no_flags = { KeepFlags::default(), ServerFate::Destroyed },
    keep = { KeepFlags { keep: true, ..Default::default() }, ServerFate::Kept },
    keep_on_build_fail = { KeepFlags { on_build_fail: true, ..Default::default() }, ServerFate::Kept },
    other_flag = { KeepFlags { on_track_fail: true, ..Default::default() }, ServerFate::Destroyed },
)]
#[test_macro(tokio::test(start_paused = true))]
async fn reported_build_failure_is_terminal(keep: KeepFlags, fate: ServerFate) {
    let h = harness(keep);
    h.remote.script_probe([r#"{"status":"failed","message":"lunch: unknown target"}"#], 0);

    let err = h.tracker.track(&h.guard).await.unwrap_err();

    assert_eq!(err.class(), FailureClass::BuildFailed);
    assert_eq!(err.fate(), fate);
    assert!(err.to_string().contains("lunch: unknown target"));
    assert_eq!(h.cloud.servers().is_empty(), fate == ServerFate::Destroyed);
    assert!(!h.guard.is_armed());
}

#[tokio::test(start_paused = true)]
async fn connection_failures_retry_three_times() {
    let h = harness(KeepFlags::default());
    h.remote.script_probe_error(RemoteError::transport("connection refused"));
    h.remote.script_probe_error(RemoteError::session("handshake failed"));
    h.record("successful");

    assert_eq!(h.tracker.track(&h.guard).await.unwrap(), TrackOutcome::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn connection_failure_exhaustion_honours_keep_flag() {
    let h = harness(KeepFlags { on_connect_fail: true, ..Default::default() });
    for _ in 0..3 {
        h.remote.script_probe_error(RemoteError::shell("channel open failed"));
    }

    let err = h.tracker.track(&h.guard).await.unwrap_err();

    assert_eq!(err.class(), FailureClass::Shell);
    assert_eq!(err.fate(), ServerFate::Kept);
    assert!(!h.guard.is_armed());
    assert_eq!(h.cloud.servers().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unclassified_failure_only_honours_generic_keep() {
    let h = harness(KeepFlags {
        on_connect_fail: true,
        on_track_fail: true,
        on_build_fail: true,
        keep: false,
    });
    for _ in 0..3 {
        h.remote.script_probe(std::iter::empty(), 127);
    }

    let err = h.tracker.track(&h.guard).await.unwrap_err();

    assert_eq!(err.class(), FailureClass::Other);
    assert_eq!(err.fate(), ServerFate::Destroyed);
    assert!(err.to_string().contains("status 127"));
}

#[tokio::test(start_paused = true)]
async fn label_wins_over_clean_probe() {
    let h = harness(KeepFlags::default());
    h.record("failed");

    let err = h.tracker.track(&h.guard).await.unwrap_err();

    assert_eq!(err.class(), FailureClass::BuildFailed);
    assert_eq!(err.fate(), ServerFate::Destroyed);
}

#[tokio::test(start_paused = true)]
async fn failed_label_destroy_leaves_the_exit_hook_armed() {
    let h = harness(KeepFlags::default());
    h.labels.script_reads([None, Some("failed")]);
    h.cloud.fail_server_deletes(20);

    let err = h.tracker.track(&h.guard).await.unwrap_err();

    assert_eq!(err.class(), FailureClass::BuildFailed);
    assert_eq!(err.fate(), ServerFate::DestroyFailed);
    assert!(h.guard.is_armed());
    assert_eq!(h.guard.run().await, Some(ServerFate::Destroyed));
    assert!(h.cloud.servers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unexpected_label_value_counts_as_failed() {
    let h = harness(KeepFlags { on_build_fail: true, ..Default::default() });
    h.record("exploded");

    let err = h.tracker.track(&h.guard).await.unwrap_err();

    assert_eq!(err.fate(), ServerFate::Kept);
    assert!(err.to_string().contains("exploded"));
}

#[tokio::test(start_paused = true)]
async fn in_progress_label_leaves_server_running() {
    let h = harness(KeepFlags::default());
    h.record("inprogress");

    assert_eq!(h.tracker.track(&h.guard).await.unwrap(), TrackOutcome::InProgress);

    assert!(!h.guard.is_armed());
    assert_eq!(h.cloud.servers().len(), 1);
    assert_eq!(h.display.notices().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn label_poll_waits_for_a_value() {
    let h = harness(KeepFlags::default());
    h.labels.script_reads([None, None, Some("successful")]);
    let start = Instant::now();

    assert_eq!(h.tracker.track(&h.guard).await.unwrap(), TrackOutcome::Succeeded);

    assert_eq!(h.labels.get_count(), 3);
    assert!(start.elapsed() >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn missing_label_is_undetermined() {
    let h = harness(KeepFlags::default());

    let err = h.tracker.track(&h.guard).await.unwrap_err();

    assert!(matches!(err, TrackError::Undetermined { fate: ServerFate::Kept }));
    assert_eq!(h.labels.get_count(), 20);
    assert_eq!(h.cloud.servers().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn log_tail_streams_until_stopped() {
    let remote = FakeRemote::new();
    remote.set_tail_lines(["lunch aosp_bacon", "make -j16"]);
    let display = FakeDisplay::new();

    let tail = LogTail::start(remote.clone(), "10.0.0.1:22".into(), display.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;
    tail.stop().await;

    assert_eq!(display.log_lines(), vec!["lunch aosp_bacon", "make -j16"]);
    assert!(remote.calls().contains(&ham_adapters::RemoteCall::Stream(guest::tail_command())));
    assert!(remote.calls().contains(&ham_adapters::RemoteCall::CloseShell));
}

#[tokio::test(start_paused = true)]
async fn log_tail_failure_does_not_abort_tracking() {
    let h = harness(KeepFlags::default());
    h.remote.fail_connects((0..3).map(|_| RemoteError::transport("refused")));
    h.record("successful");

    // Whichever of tail and probe hits the refused connects, the probe
    // budget covers it.
    assert_eq!(h.tracker.track(&h.guard).await.unwrap(), TrackOutcome::Succeeded);
}
