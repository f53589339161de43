//! Helpers shared by the command-line tests.
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const DESCRIPTION: &str = r##"
software = {
    version = "1.2.3";
    description = "Smoke test image";

    myboard = {
        hardware-compatibility = [ "1.0", "#RE:^2\\.[0-9]$" ];
        stable = {
            copy1 = {
                images = (
                    {
                        filename = "rootfs.ext4";
                        device = "/dev/mmcblk0p2";
                        type = "raw";
                    }
                );
            };
        };
    };

    images = (
        { filename = "rootfs.ext4"; device = "/dev/mmcblk0p1"; },
        { filename = "kernel"; path = "/boot/zImage"; type = "rawfile"; }
    );
};
"##;

/// The fixture image: the description and the rootfs, but not the kernel.
pub fn image_bytes() -> Vec<u8> {
    newc(&[
        ("sw-description", DESCRIPTION.as_bytes()),
        ("rootfs.ext4", b"rootfs contents"),
    ])
}

/// A cpio "newc" archive holding `members` in order.
pub fn newc(members: &[(&str, &[u8])]) -> Vec<u8> {
    fn pad(out: &mut Vec<u8>) {
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }

    let trailer: (&str, &[u8]) = ("TRAILER!!!", b"");
    let mut out = Vec::new();
    for (ino, (name, data)) in members.iter().chain(std::iter::once(&trailer)).enumerate() {
        out.extend_from_slice(b"070701");
        let fields = [
            ino as u32,
            0o100644,
            0,
            0,
            1,
            0,
            data.len() as u32,
            0,
            0,
            0,
            0,
            name.len() as u32 + 1,
            0,
        ];
        for f in fields {
            out.extend_from_slice(format!("{:08X}", f).as_bytes());
        }
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        pad(&mut out);
        out.extend_from_slice(data);
        pad(&mut out);
    }
    out
}

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config("")
    }

    pub fn with_config(config: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        fs::write(dir.path().join("config.toml"), config).expect("failed to write config");
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// An image holding the rootfs but not the kernel.
    pub fn image(&self) -> PathBuf {
        let path = self.path("update.swu");
        fs::write(&path, image_bytes()).expect("failed to write fixture");
        path
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("swupdateclient").expect("binary not built");
        cmd.env_remove("SWUPDATE_SOCKET")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.path("config.toml"));
        cmd
    }
}
