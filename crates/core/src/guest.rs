// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guest-side bootstrap protocol: fixed paths and the commands the build
//! server is expected to honour.

/// Scratch space for the build; the data volume is mounted here.
pub const BUILD_DIR: &str = "/ham-build";
/// Recipe checkout or mirror.
pub const RECIPE_DIR: &str = "/ham-recipe";
/// Uploaded file arguments and the vars document.
pub const FILES_DIR: &str = "/ham-files";
/// Build artifacts.
pub const OUTPUT_DIR: &str = "/ham-output";
/// Written last by bootstrap; its presence means the guest is initialized.
pub const INIT_SENTINEL: &str = "/tmp/ham.init.finished";
/// Mirror of the local credential file.
pub const CREDENTIAL_PATH: &str = "/root/.ham.json";
/// Serialized build variables.
pub const VARS_PATH: &str = "/ham-files/vars.json";
/// Build agent binary.
pub const AGENT_PATH: &str = "/usr/bin/ham";
/// Output of the detached build agent.
pub const BUILD_LOG: &str = "/ham-build/ham.log";

/// Mount options for the build volume.
pub const MOUNT_OPTIONS: &str = "discard,defaults,noatime,data=writeback";

/// Emits one JSON status object per line until the remote build terminates.
pub const PROGRESS_COMMAND: &str = "ham progress --json";

/// Every working directory bootstrap creates.
pub const WORK_DIRS: [&str; 4] = [BUILD_DIR, RECIPE_DIR, FILES_DIR, OUTPUT_DIR];

/// Destination of the Nth (1-based) file argument.
pub fn file_slot(n: usize) -> String {
    format!("{FILES_DIR}/{n}")
}

/// Quote a string for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Command that starts the build agent detached from the SSH session.
pub fn build_command(content_hash: &str, keep_server: bool) -> String {
    let keep = if keep_server { " --keep-server" } else { "" };
    format!(
        "nohup ham build{keep} --sum {} --recipe {RECIPE_DIR} --vars {VARS_PATH} > {BUILD_LOG} 2>&1 &",
        shell_quote(content_hash)
    )
}

/// Command that streams the build log, waiting for it to appear.
pub fn tail_command() -> String {
    format!("tail -n +1 -F {BUILD_LOG}")
}

/// Commands that clone a recipe remote into the recipe directory.
pub fn clone_commands(url: &str, branch: Option<&str>) -> Vec<String> {
    let mut cmds = vec![
        format!("rm -rf {RECIPE_DIR}"),
        format!("git clone {} {RECIPE_DIR}", shell_quote(url)),
    ];
    if let Some(branch) = branch {
        cmds.push(format!("git -C {RECIPE_DIR} checkout {}", shell_quote(branch)));
    }
    cmds
}

/// Command that exits 0 when the build directory is already a mountpoint.
pub fn mountpoint_probe() -> String {
    format!("mountpoint -q {BUILD_DIR}")
}

/// Commands that format and mount the data volume.
pub fn mount_commands(device: &str) -> Vec<String> {
    let device = shell_quote(device);
    vec![
        format!("mkfs.ext4 -F {device}"),
        format!("mount -o {MOUNT_OPTIONS} {device} {BUILD_DIR}"),
    ]
}

/// Command that exits 0 when bootstrap already completed.
pub fn sentinel_probe() -> String {
    format!("test -f {INIT_SENTINEL}")
}

#[cfg(test)]
#[path = "guest_tests.rs"]
mod tests;
