// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ham_adapters::{CloudCall, FakeCloudProvider, ServerStatus};

fn setup() -> (CleanupGuard<FakeCloudProvider>, FakeCloudProvider) {
    let cloud = FakeCloudProvider::new();
    let identity = BuildIdentity::for_hash("abc");
    cloud.add_server(identity.as_str(), ServerStatus::Running);
    cloud.add_volume(&identity.volume_name());
    (CleanupGuard::new(ServerLifecycle::new(cloud.clone()), identity), cloud)
}

fn deletes(cloud: &FakeCloudProvider) -> usize {
    cloud.count_calls(|c| matches!(c, CloudCall::DeleteServer(_)))
}

#[tokio::test(start_paused = true)]
async fn run_destroys_armed_server_once() {
    let (guard, cloud) = setup();
    guard.arm();

    assert_eq!(guard.run().await, Some(ServerFate::Destroyed));
    assert_eq!(guard.run().await, None);

    assert!(cloud.servers().is_empty());
    assert!(cloud.volumes().is_empty());
    assert_eq!(deletes(&cloud), 1);
}

#[tokio::test]
async fn run_leaves_disarmed_server() {
    let (guard, cloud) = setup();
    guard.arm();
    guard.disarm("build finished");

    assert_eq!(guard.run().await, None);

    assert_eq!(cloud.servers().len(), 1);
    assert_eq!(guard.fate(), ServerFate::Kept);
}

#[tokio::test]
async fn never_armed_guard_does_nothing() {
    let (guard, cloud) = setup();
    assert_eq!(guard.run().await, None);
    assert_eq!(deletes(&cloud), 0);
}

#[tokio::test(start_paused = true)]
async fn destroy_now_disarms_on_success() {
    let (guard, cloud) = setup();
    guard.arm();

    assert_eq!(guard.destroy_now().await, ServerFate::Destroyed);

    assert!(!guard.is_armed());
    assert_eq!(guard.run().await, None);
    assert_eq!(deletes(&cloud), 1);
    assert_eq!(guard.fate(), ServerFate::Destroyed);
}

#[tokio::test(start_paused = true)]
async fn destroy_now_retries_twenty_times_then_stays_armed() {
    let (guard, cloud) = setup();
    guard.arm();
    cloud.fail_server_deletes(20);
    let start = tokio::time::Instant::now();

    assert_eq!(guard.destroy_now().await, ServerFate::DestroyFailed);

    assert_eq!(start.elapsed(), std::time::Duration::from_secs(19 * 5));
    assert_eq!(deletes(&cloud), 20);
    assert!(guard.is_armed());
    assert_eq!(guard.fate(), ServerFate::DestroyFailed);

    // Exit hook gets another go.
    assert_eq!(guard.run().await, Some(ServerFate::Destroyed));
    assert_eq!(guard.fate(), ServerFate::Destroyed);
}

#[tokio::test(start_paused = true)]
async fn exit_hook_gives_up_after_five_attempts() {
    let (guard, cloud) = setup();
    guard.arm();
    cloud.fail_server_deletes(5);

    assert_eq!(guard.run().await, Some(ServerFate::DestroyFailed));
    assert_eq!(deletes(&cloud), 5);
    assert_eq!(cloud.servers().len(), 1);
}

#[tokio::test]
async fn protected_guard_never_deletes() {
    let (guard, cloud) = setup();
    let guard = guard.protected();
    guard.arm();

    assert!(!guard.is_armed());
    assert_eq!(guard.destroy_now().await, ServerFate::Kept);
    assert_eq!(guard.run().await, None);
    assert_eq!(deletes(&cloud), 0);
}
