// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn server(ipv4: Option<&str>, ipv6: Option<&str>) -> Server {
    Server {
        id: 1,
        name: "ham-x".into(),
        status: ServerStatus::Running,
        ipv4: ipv4.map(Into::into),
        ipv6_net: ipv6.map(Into::into),
    }
}

#[yare::parameterized(
    ipv4_preferred = { Some("1.2.3.4"), Some("2001:db8::/64"), Some("1.2.3.4:22") },
    ipv6_network   = { None,            Some("2001:db8::/64"), Some("[2001:db8::1]:22") },
    ipv6_host      = { None,            Some("2001:db8::5"),   Some("[2001:db8::5]:22") },
    no_address     = { None,            None,                  None },
)]
fn ssh_address(ipv4: Option<&str>, ipv6: Option<&str>, expected: Option<&str>) {
    assert_eq!(server(ipv4, ipv6).ssh_address().as_deref(), expected);
}

#[yare::parameterized(
    valid      = { "ham-a-vol", 400,   "nbg1", true },
    empty_name = { "",          400,   "nbg1", false },
    too_small  = { "v",         5,     "nbg1", false },
    too_large  = { "v",         20000, "nbg1", false },
    no_region  = { "v",         400,   "",     false },
)]
fn volume_request_validation(name: &str, size_gb: u32, location: &str, ok: bool) {
    let request =
        VolumeRequest { name: name.into(), size_gb, location: location.into(), automount: false };
    assert_eq!(request.validate().is_ok(), ok);
}

#[test]
fn ssh_key_match_ignores_comment() {
    let key = SshKey {
        id: 1,
        name: "ham-ssh-key".into(),
        fingerprint: "aa:bb".into(),
        public_key: "ssh-ed25519 AAAAC3Nza me@laptop".into(),
        labels: BTreeMap::new(),
    };
    assert!(key.matches_public_key("ssh-ed25519 AAAAC3Nza other-comment\n"));
    assert!(!key.matches_public_key("ssh-ed25519 AAAAdifferent"));
    assert!(!key.matches_public_key(""));
}

#[test]
fn server_status_parse() {
    assert_eq!(ServerStatus::parse("off"), ServerStatus::Off);
    assert_eq!(ServerStatus::parse("rebuilding"), ServerStatus::Other);
}
