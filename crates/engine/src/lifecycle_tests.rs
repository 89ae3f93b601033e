// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ham_adapters::{CloudCall, FakeCloudProvider, Price};
use std::time::Duration;
use tokio::time::Instant;

const PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 me@laptop";

fn setup() -> (ServerLifecycle<FakeCloudProvider>, FakeCloudProvider, BuildIdentity) {
    let cloud = FakeCloudProvider::new();
    cloud.add_ssh_key(SSH_KEY_NAME, PUBLIC_KEY);
    (ServerLifecycle::new(cloud.clone()), cloud, BuildIdentity::for_hash("abc"))
}

fn server_type(name: &str, cores: u32, memory_gb: f64, disk_gb: u32, hourly: f64) -> ServerType {
    ServerType {
        name: name.into(),
        cores,
        memory_gb,
        disk_gb,
        deprecated: false,
        prices: vec![Price {
            location: LOCATION.into(),
            hourly_gross: hourly,
            monthly_gross: hourly * 720.0,
        }],
    }
}

#[tokio::test(start_paused = true)]
async fn create_makes_volume_first_and_attaches_it() {
    let (lifecycle, cloud, identity) = setup();
    let default_key = cloud.add_ssh_key(DEFAULT_KEY_NAME, "ssh-rsa BBBB other");

    let server = lifecycle.create_server(&identity, "cpx51").await.unwrap();

    let calls = cloud.calls();
    let volume_pos = calls.iter().position(|c| matches!(c, CloudCall::CreateVolume(_))).unwrap();
    let server_pos = calls.iter().position(|c| matches!(c, CloudCall::CreateServer(_))).unwrap();
    assert!(volume_pos < server_pos);

    let volumes = cloud.volumes();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].name, identity.volume_name());
    assert_eq!(volumes[0].server, Some(server.id));

    let request = calls
        .iter()
        .find_map(|c| match c {
            CloudCall::CreateServer(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.name, identity.as_str());
    assert_eq!(request.image, IMAGE);
    assert_eq!(request.location, LOCATION);
    assert_eq!(request.ssh_keys.len(), 2);
    assert_eq!(request.ssh_keys[1], default_key);
    assert_eq!(request.volumes, vec![volumes[0].id]);

    let volume_request = calls
        .iter()
        .find_map(|c| match c {
            CloudCall::CreateVolume(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(volume_request.size_gb, VOLUME_SIZE_GB);
    assert!(!volume_request.automount);
    assert!(server.address.ends_with(":22"));
}

#[tokio::test(start_paused = true)]
async fn create_without_default_key_uses_designated_only() {
    let (lifecycle, cloud, identity) = setup();
    lifecycle.create_server(&identity, "cpx51").await.unwrap();
    let request = cloud
        .calls()
        .into_iter()
        .find_map(|c| match c {
            CloudCall::CreateServer(r) => Some(r),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.ssh_keys.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_server_create_leaves_no_volume() {
    let (lifecycle, cloud, identity) = setup();
    cloud.fail_server_create("server type unavailable");

    let err = lifecycle.create_server(&identity, "cpx51").await.unwrap_err();

    assert!(err.to_string().contains("server type unavailable"));
    assert!(cloud.volumes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_server_action_leaves_no_volume() {
    let (lifecycle, cloud, identity) = setup();
    cloud.fail_server_action("boot failed");

    let err = lifecycle.create_server(&identity, "cpx51").await.unwrap_err();

    assert!(matches!(err, LifecycleError::ActionFailed { ref message, .. } if message == "boot failed"));
    assert!(cloud.volumes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_volume_create_creates_nothing() {
    let (lifecycle, cloud, identity) = setup();
    cloud.fail_volume_create("quota exceeded");

    assert!(lifecycle.create_server(&identity, "cpx51").await.is_err());
    assert_eq!(cloud.count_calls(|c| matches!(c, CloudCall::CreateServer(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn create_requires_designated_key_and_image() {
    let cloud = FakeCloudProvider::new();
    let lifecycle = ServerLifecycle::new(cloud.clone());
    let identity = BuildIdentity::for_hash("abc");
    assert!(matches!(
        lifecycle.create_server(&identity, "cpx51").await,
        Err(LifecycleError::SshKeyMissing(_))
    ));

    cloud.add_ssh_key(SSH_KEY_NAME, PUBLIC_KEY);
    cloud.remove_image(IMAGE);
    assert!(matches!(
        lifecycle.create_server(&identity, "cpx51").await,
        Err(LifecycleError::ImageMissing(_))
    ));
    assert!(cloud.volumes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn find_existing_matches_exact_name() {
    let (lifecycle, cloud, identity) = setup();
    cloud.add_server(&format!("{identity}x"), ServerStatus::Running);
    assert_eq!(lifecycle.find_existing(&identity).await.unwrap(), None);

    let server = cloud.add_server(identity.as_str(), ServerStatus::Running);
    let found = lifecycle.find_existing(&identity).await.unwrap().unwrap();
    assert_eq!(found.id, server.id);
    assert_eq!(found.address, format!("10.0.0.{}:22", server.id));
}

#[tokio::test(start_paused = true)]
async fn wait_for_action_polls_every_two_seconds() {
    let (lifecycle, cloud, _) = setup();
    cloud.set_action_polls(3);
    let volume = cloud
        .create_volume(&VolumeRequest {
            name: "v".into(),
            size_gb: 10,
            location: LOCATION.into(),
            automount: false,
        })
        .await
        .unwrap();
    let start = Instant::now();

    lifecycle.wait_for_action(volume.action.as_ref()).await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(8));
    assert_eq!(cloud.count_calls(|c| matches!(c, CloudCall::GetAction(_))), 4);
}

#[tokio::test]
async fn wait_for_no_action_is_immediate() {
    let (lifecycle, cloud, _) = setup();
    lifecycle.wait_for_action(None).await.unwrap();
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn select_prefers_cores_then_memory_then_disk() {
    let (lifecycle, cloud, _) = setup();
    cloud.set_server_types(vec![
        server_type("small", 2, 4.0, 40, 0.01),
        server_type("wide", 16, 32.0, 360, 0.10),
        server_type("wide-disk", 16, 32.0, 600, 0.12),
        server_type("wide-mem", 16, 64.0, 360, 0.15),
    ]);

    let (price, chosen) = lifecycle.select_server_type(None).await.unwrap();
    assert_eq!(chosen.name, "wide-mem");
    assert!((price - 0.15).abs() < 1e-9);

    let (_, chosen) = lifecycle.select_server_type(Some(0.12)).await.unwrap();
    assert_eq!(chosen.name, "wide-disk");
}

#[tokio::test]
async fn select_skips_deprecated_and_unpriced_types() {
    let (lifecycle, cloud, _) = setup();
    let mut deprecated = server_type("old", 32, 128.0, 600, 0.05);
    deprecated.deprecated = true;
    let mut elsewhere = server_type("far", 32, 128.0, 600, 0.05);
    elsewhere.prices[0].location = "ash".into();
    cloud.set_server_types(vec![deprecated, elsewhere, server_type("ok", 4, 8.0, 80, 0.02)]);

    let (_, chosen) = lifecycle.select_server_type(None).await.unwrap();
    assert_eq!(chosen.name, "ok");

    assert!(matches!(
        lifecycle.select_server_type(Some(0.01)).await,
        Err(LifecycleError::NoServerType { ceiling: Some(_) })
    ));
}

#[tokio::test(start_paused = true)]
async fn destroy_removes_server_and_volume() {
    let (lifecycle, cloud, identity) = setup();
    lifecycle.create_server(&identity, "cpx51").await.unwrap();

    assert!(lifecycle.destroy(&identity).await.unwrap());

    assert!(cloud.servers().is_empty());
    assert!(cloud.volumes().is_empty());
    assert!(!lifecycle.destroy(&identity).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn reap_deletes_only_powered_off_build_servers() {
    let (lifecycle, cloud, identity) = setup();
    cloud.add_server(identity.as_str(), ServerStatus::Off);
    cloud.add_volume(&identity.volume_name());
    let running = BuildIdentity::for_hash("other");
    cloud.add_server(running.as_str(), ServerStatus::Running);
    cloud.add_server("web-01", ServerStatus::Off);

    assert_eq!(lifecycle.reap_dead_servers().await.unwrap(), 1);

    let names: Vec<_> = cloud.servers().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec![running.to_string(), "web-01".to_string()]);
    assert!(cloud.volumes().is_empty());
}

#[tokio::test]
async fn volume_device_lookup() {
    let (lifecycle, cloud, identity) = setup();
    assert_eq!(lifecycle.volume_device_for(&identity).await.unwrap(), None);
    let volume = cloud.add_volume(&identity.volume_name());
    assert_eq!(lifecycle.volume_device_for(&identity).await.unwrap(), volume.linux_device);
}

#[tokio::test]
async fn ssh_key_verification() {
    let (lifecycle, _, _) = setup();
    assert!(lifecycle.verify_ssh_key("ssh-ed25519 AAAAC3NzaC1lZDI1NTE5").await.is_ok());
    assert!(matches!(
        lifecycle.verify_ssh_key("ssh-ed25519 OTHER").await,
        Err(LifecycleError::SshKeyMismatch(_))
    ));
}
