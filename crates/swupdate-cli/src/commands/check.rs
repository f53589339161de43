//! Check command - Validate an update image without a daemon.

use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;
use swupdate_description::{is_compatible, Selection, SwDescription, SwuImage};

use super::{SelectionArgs, Source};
use crate::config::Settings;

/// A description resolved from either an image or a bare file.
struct Checked {
    description: SwDescription,
    /// Referenced files absent from the archive
    missing: Vec<String>,
    /// `None` for a bare description
    signed: Option<bool>,
}

fn resolve(source: Source, selection: &Selection) -> swupdate_description::Result<Checked> {
    match source {
        Source::Image(archive) => {
            let image = SwuImage::from_archive(archive, selection)?;
            let missing = image
                .missing_artifacts()
                .iter()
                .filter_map(|a| a.filename.clone())
                .collect();
            Ok(Checked {
                signed: Some(image.archive.is_signed()),
                description: image.description,
                missing,
            })
        }
        Source::Description(text) => Ok(Checked {
            description: SwDescription::parse(&text, selection)?,
            missing: Vec::new(),
            signed: None,
        }),
    }
}

/// Problems with a resolved description. Empty means valid.
fn problems(checked: &Checked, revision: Option<&str>) -> Vec<String> {
    let mut problems: Vec<String> = checked
        .missing
        .iter()
        .map(|name| format!("{} is referenced but not in the image", name))
        .collect();

    if let Some(revision) = revision {
        let desc = &checked.description;
        match is_compatible(&desc.hardware_compatibility, revision) {
            Ok(true) => {}
            Ok(false) => problems.push(format!(
                "revision {} is not in hardware-compatibility [{}]",
                revision,
                desc.hardware_compatibility.join(", ")
            )),
            Err(e) => problems.push(e.to_string()),
        }
    }

    problems
}

pub fn run(
    settings: &Settings,
    path: &Path,
    board: Option<String>,
    revision: Option<&str>,
    selection: &SelectionArgs,
) -> Result<ExitCode> {
    println!("Checking: {:?}\n", path);

    let source = Source::open(path)?;
    let selection = selection.selection(settings, board)?;

    let errors = match resolve(source, &selection) {
        Ok(checked) => {
            let errors = problems(&checked, revision);
            if errors.is_empty() {
                let desc = &checked.description;
                println!("✅ Image is valid!");
                println!("   Name:      {}", desc.name);
                println!("   Version:   {}", desc.version);
                println!("   Selected:  {}", desc.root_path.join("."));
                println!("   Artifacts: {}", desc.artifacts().count());
                if checked.signed == Some(false) {
                    println!("   (unsigned)");
                }
                return Ok(ExitCode::SUCCESS);
            }
            errors
        }
        Err(e) => vec![e.to_string()],
    };

    println!("❌ Errors ({}):", errors.len());
    for error in &errors {
        println!("   • {}", error);
    }
    Ok(ExitCode::FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DESCRIPTION: &str = r##"
        software = {
            version = "2.0";
            hardware-compatibility = [ "1.0", "#RE:^2\\.[0-9]$" ];
            images = ( { filename = "rootfs.ext4"; device = "/dev/mmcblk0p2"; } );
        };
    "##;

    fn checked() -> Checked {
        resolve(
            Source::Description(DESCRIPTION.to_string()),
            &Selection::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_bare_description_has_no_archive_checks() {
        let checked = checked();
        assert!(checked.missing.is_empty());
        assert_eq!(checked.signed, None);
        assert_eq!(checked.description.version, "2.0");
    }

    #[test]
    fn test_compatible_revisions() {
        let checked = checked();
        assert!(problems(&checked, Some("1.0")).is_empty());
        assert!(problems(&checked, Some("2.4")).is_empty());
        assert!(problems(&checked, None).is_empty());
    }

    #[test]
    fn test_incompatible_revision() {
        let found = problems(&checked(), Some("3.1"));
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("3.1"));
    }

    #[test]
    fn test_missing_files_listed() {
        let mut checked = checked();
        checked.missing = vec!["kernel".into()];
        assert_eq!(
            problems(&checked, None),
            vec!["kernel is referenced but not in the image".to_string()]
        );
    }
}
