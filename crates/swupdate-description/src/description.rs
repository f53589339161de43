//! The update description model extracted from `sw-description`.
//!
//! Content lives under the `software` group. Boards, software sets and
//! running modes select a sub-node; any of them may be a `ref` link.

use crate::libconfig::{join_path, Config, Setting};
use crate::{find_root, DescriptionError, MAX_LINKS_DEPTH};
use serde::Serialize;
use std::collections::BTreeMap;

const SOFTWARE: &str = "software";

/// Which part of the description applies to the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Board name, as reported in the hardware revision
    pub board: Option<String>,
    /// Software set (e.g. "stable")
    pub software_set: Option<String>,
    /// Running mode within the set (e.g. "copy1")
    pub running_mode: Option<String>,
}

impl Selection {
    pub fn new(
        board: Option<String>,
        software_set: Option<String>,
        running_mode: Option<String>,
    ) -> Self {
        Self {
            board,
            software_set,
            running_mode,
        }
    }

    /// Candidate node paths in lookup order.
    pub fn candidates(&self) -> Result<Vec<Vec<String>>, DescriptionError> {
        let mut candidates = Vec::new();
        let prefix = |extra: &[&str]| -> Vec<String> {
            std::iter::once(SOFTWARE)
                .chain(extra.iter().copied())
                .map(String::from)
                .collect()
        };

        match (&self.software_set, &self.running_mode) {
            (Some(set), Some(mode)) => {
                if let Some(board) = &self.board {
                    candidates.push(prefix(&[board.as_str(), set.as_str(), mode.as_str()]));
                }
                candidates.push(prefix(&[set.as_str(), mode.as_str()]));
            }
            (None, None) => {
                if let Some(board) = &self.board {
                    candidates.push(prefix(&[board.as_str()]));
                }
                candidates.push(prefix(&[]));
            }
            _ => return Err(DescriptionError::IncompleteSelection),
        }
        Ok(candidates)
    }
}

/// An image, file or script entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Artifact {
    pub filename: Option<String>,
    /// Handler name (`type`)
    pub handler: Option<String>,
    pub device: Option<String>,
    pub volume: Option<String>,
    pub path: Option<String>,
    pub sha256: Option<String>,
    pub version: Option<String>,
    pub install_if_different: bool,
    pub install_if_higher: bool,
    pub installed_directly: bool,
    pub encrypted: bool,
    /// Compression algorithm; legacy `compressed = true` means zlib
    pub compressed: Option<String>,
    pub properties: BTreeMap<String, Vec<String>>,
}

impl Artifact {
    fn from_setting(setting: &Setting, section: &str, index: usize) -> Result<Self, DescriptionError> {
        if !setting.is_group() {
            return Err(DescriptionError::InvalidEntry {
                section: section.to_string(),
                index,
                message: "entry must be a group".to_string(),
            });
        }

        let text = |field: &str| setting.field_str(Some(field)).map(String::from);

        let compressed = match setting.member("compressed") {
            Some(c) if c.as_bool() == Some(true) => Some("zlib".to_string()),
            Some(c) => c.as_str().map(String::from),
            None => None,
        };

        let mut properties: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(props) = setting.member("properties") {
            props.iterate_fields(|name, value| {
                if let Some(value) = value {
                    properties
                        .entry(name.to_string())
                        .or_default()
                        .push(value.to_string());
                }
            });
        }

        Ok(Self {
            filename: text("filename"),
            handler: text("type"),
            device: text("device"),
            volume: text("volume"),
            path: text("path"),
            sha256: text("sha256"),
            version: text("version"),
            install_if_different: setting.field_bool("install-if-different", false),
            install_if_higher: setting.field_bool("install-if-higher", false),
            installed_directly: setting.field_bool("installed-directly", false),
            encrypted: setting.field_bool("encrypted", false),
            compressed,
            properties,
        })
    }
}

/// A bootloader variable to set after installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootVar {
    pub name: String,
    pub value: String,
}

/// The parsed update description.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SwDescription {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub reboot_required: bool,
    pub bootloader_transaction_marker: bool,
    pub bootloader_state_marker: bool,
    pub hardware_compatibility: Vec<String>,
    pub images: Vec<Artifact>,
    pub files: Vec<Artifact>,
    pub scripts: Vec<Artifact>,
    pub bootenv: Vec<BootVar>,
    /// Node path the artifacts were read from
    pub root_path: Vec<String>,
}

impl SwDescription {
    /// Parse `sw-description` text.
    pub fn parse(text: &str, selection: &Selection) -> Result<Self, DescriptionError> {
        let cfg = Config::parse(text)?;
        Self::from_config(&cfg, selection)
    }

    /// Extract the description for `selection` from a parsed document.
    pub fn from_config(cfg: &Config, selection: &Selection) -> Result<Self, DescriptionError> {
        let software = cfg
            .lookup(SOFTWARE)
            .ok_or_else(|| DescriptionError::NoRoot {
                tried: vec![SOFTWARE.to_string()],
            })?;

        let candidates = selection.candidates()?;
        let (root_path, root) = candidates
            .iter()
            .find_map(|nodes| find_root(cfg, nodes, MAX_LINKS_DEPTH))
            .ok_or_else(|| DescriptionError::NoRoot {
                tried: candidates.iter().map(|c| join_path(c)).collect(),
            })?;

        let version = software
            .field_str(Some("version"))
            .ok_or_else(|| DescriptionError::MissingField {
                path: SOFTWARE.to_string(),
                field: "version".to_string(),
            })?
            .to_string();

        let hw_node = selection
            .board
            .as_deref()
            .and_then(|board| find_root(cfg, &[SOFTWARE, board], MAX_LINKS_DEPTH))
            .map(|(_, node)| node)
            .filter(|node| node.member("hardware-compatibility").is_some())
            .unwrap_or(software);
        let hardware_compatibility = hw_node
            .member("hardware-compatibility")
            .map(|list| {
                list.elements()
                    .iter()
                    .filter_map(Setting::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name: software
                .field_str(Some("name"))
                .unwrap_or(SOFTWARE)
                .to_string(),
            version,
            description: software.field_str(Some("description")).map(String::from),
            reboot_required: root.field_bool("reboot", software.field_bool("reboot", true)),
            bootloader_transaction_marker: software.field_bool("bootloader_transaction_marker", true),
            bootloader_state_marker: software.field_bool("bootloader_state_marker", true),
            hardware_compatibility,
            images: artifacts(root, "images")?,
            files: artifacts(root, "files")?,
            scripts: artifacts(root, "scripts")?,
            bootenv: bootenv(root)?,
            root_path,
        })
    }

    /// All images, files and scripts.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.images
            .iter()
            .chain(self.files.iter())
            .chain(self.scripts.iter())
    }
}

fn artifacts(root: &Setting, section: &str) -> Result<Vec<Artifact>, DescriptionError> {
    let Some(list) = root.member(section) else {
        return Ok(Vec::new());
    };
    list.elements()
        .iter()
        .enumerate()
        .map(|(index, entry)| Artifact::from_setting(entry, section, index))
        .collect()
}

fn bootenv(root: &Setting) -> Result<Vec<BootVar>, DescriptionError> {
    let Some(list) = root.member("bootenv") else {
        return Ok(Vec::new());
    };
    list.elements()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let name = entry.field_str(Some("name"));
            let value = entry.field_str(Some("value"));
            match (name, value) {
                (Some(name), value) => Ok(BootVar {
                    name: name.to_string(),
                    value: value.unwrap_or_default().to_string(),
                }),
                (None, _) => Err(DescriptionError::InvalidEntry {
                    section: "bootenv".to_string(),
                    index,
                    message: "missing 'name'".to_string(),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DESCRIPTION: &str = r##"
        software =
        {
            version = "2.0.1";
            description = "Firmware update for XXXX Project";
            hardware-compatibility: [ "1.0", "#RE:^1\\.[0-9]" ];

            images: (
                {
                    filename = "rootfs.ext4.gz";
                    type = "raw";
                    device = "/dev/mmcblk0p1";
                    compressed = "zlib";
                    sha256 = "abc123";
                }
            );

            myboard = {
                hardware-compatibility: [ "rev-b" ];
                stable = {
                    copy1 = {
                        images: (
                            {
                                filename = "rootfs.ext4";
                                device = "/dev/mmcblk0p2";
                                install-if-different = true;
                                version = "2.0";
                                properties = { mode = [ "a", "b" ]; size = "16M"; };
                            }
                        );
                        bootenv: (
                            { name = "rootpart"; value = "2"; }
                        );
                        reboot = false;
                    };
                    copy2 = { ref = "#./../copy1"; };
                };
            };

            stable = {
                alt = {
                    scripts: ( { filename = "update.lua"; type = "lua"; } );
                    files: ( { filename = "app.tar"; path = "/opt"; compressed = true; } );
                };
            };
        }
    "##;

    #[test]
    fn test_default_selection_reads_software() {
        let desc = SwDescription::parse(DESCRIPTION, &Selection::default()).unwrap();
        assert_eq!(desc.version, "2.0.1");
        assert_eq!(desc.description.as_deref(), Some("Firmware update for XXXX Project"));
        assert_eq!(desc.root_path, vec!["software"]);
        assert_eq!(desc.images.len(), 1);
        assert_eq!(desc.images[0].handler.as_deref(), Some("raw"));
        assert_eq!(desc.images[0].compressed.as_deref(), Some("zlib"));
        assert_eq!(desc.hardware_compatibility, vec!["1.0", "#RE:^1\\.[0-9]"]);
        assert!(desc.reboot_required);
    }

    #[test]
    fn test_board_set_mode_with_link() {
        let selection = Selection::new(
            Some("myboard".into()),
            Some("stable".into()),
            Some("copy2".into()),
        );
        let desc = SwDescription::parse(DESCRIPTION, &selection).unwrap();
        assert_eq!(desc.root_path, vec!["software", "myboard", "stable", "copy1"]);
        assert_eq!(desc.hardware_compatibility, vec!["rev-b"]);
        let image = &desc.images[0];
        assert_eq!(image.filename.as_deref(), Some("rootfs.ext4"));
        assert!(image.install_if_different);
        assert_eq!(image.properties["mode"], vec!["a", "b"]);
        assert_eq!(image.properties["size"], vec!["16M"]);
        assert_eq!(
            desc.bootenv,
            vec![BootVar {
                name: "rootpart".into(),
                value: "2".into()
            }]
        );
        assert!(!desc.reboot_required);
    }

    #[test]
    fn test_set_mode_without_board_falls_back() {
        let selection = Selection::new(
            Some("otherboard".into()),
            Some("stable".into()),
            Some("alt".into()),
        );
        let desc = SwDescription::parse(DESCRIPTION, &selection).unwrap();
        assert_eq!(desc.root_path, vec!["software", "stable", "alt"]);
        assert_eq!(desc.scripts[0].handler.as_deref(), Some("lua"));
        assert_eq!(desc.files[0].compressed.as_deref(), Some("zlib"));
        assert_eq!(desc.artifacts().count(), 2);
    }

    #[test]
    fn test_missing_root_lists_candidates() {
        let selection = Selection::new(None, Some("beta".into()), Some("x".into()));
        let err = SwDescription::parse(DESCRIPTION, &selection).unwrap_err();
        match err {
            DescriptionError::NoRoot { tried } => assert_eq!(tried, vec!["software.beta.x"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_incomplete_selection() {
        let selection = Selection::new(None, Some("stable".into()), None);
        assert!(matches!(
            SwDescription::parse(DESCRIPTION, &selection),
            Err(DescriptionError::IncompleteSelection)
        ));
    }

    #[test]
    fn test_version_required() {
        let err = SwDescription::parse("software = { images: (); };", &Selection::default())
            .unwrap_err();
        assert!(matches!(err, DescriptionError::MissingField { .. }));
    }

    #[test]
    fn test_invalid_artifact_entry() {
        let err = SwDescription::parse(
            r#"software = { version = "1"; images: ( "not-a-group" ); };"#,
            &Selection::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DescriptionError::InvalidEntry { index: 0, .. }
        ));
    }

    #[test]
    fn test_hardware_compatibility_follows_board_link() {
        let text = r##"
            software = {
                version = "3.0";
                hardware-compatibility = [ "generic" ];
                boardb = { ref = "#./../boarda"; };
                boarda = {
                    hardware-compatibility = [ "rev-a", "rev-c" ];
                    images = ( { filename = "rootfs-a.ext4"; } );
                };
            };
        "##;
        let selection = Selection::new(Some("boardb".into()), None, None);
        let desc = SwDescription::parse(text, &selection).unwrap();
        assert_eq!(desc.root_path, vec!["software", "boarda"]);
        assert_eq!(desc.hardware_compatibility, vec!["rev-a", "rev-c"]);
    }
}
