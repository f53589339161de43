//! Info command - Describe an update image (non-interactive).

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use swupdate_description::{ArchiveEntry, Artifact, SwDescription};

use super::{yes_no, SelectionArgs, Source};
use crate::config::Settings;

#[derive(Serialize)]
struct ImageInfo<'a> {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    signed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<&'a [ArchiveEntry]>,
    description: &'a SwDescription,
}

pub fn run(
    settings: &Settings,
    path: &Path,
    json: bool,
    board: Option<String>,
    selection: &SelectionArgs,
) -> Result<ExitCode> {
    let source = Source::open(path)?;
    let selection = selection.selection(settings, board)?;
    let desc = SwDescription::parse(source.description_text(), &selection)
        .with_context(|| format!("Invalid sw-description in {:?}", path))?;
    let archive = source.archive();

    if json {
        let info = ImageInfo {
            file: path.display().to_string(),
            signed: archive.map(|a| a.is_signed()),
            payload_size: archive.map(|a| a.payload_size()),
            entries: archive.map(|a| a.entries.as_slice()),
            description: &desc,
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Name:         {}", desc.name);
    println!("Version:      {}", desc.version);
    if let Some(ref text) = desc.description {
        println!("Description:  {}", text);
    }
    println!("Selected:     {}", desc.root_path.join("."));
    println!("Reboot:       {}", yes_no(desc.reboot_required));
    if !desc.hardware_compatibility.is_empty() {
        println!("Hardware:     {}", desc.hardware_compatibility.join(", "));
    }
    if let Some(archive) = archive {
        println!("Signed:       {}", yes_no(archive.is_signed()));
        println!("Payload:      {} bytes in {} files", archive.payload_size(), archive.entries.len());
    }

    print_artifacts("Images", &desc.images);
    print_artifacts("Files", &desc.files);
    print_artifacts("Scripts", &desc.scripts);

    if !desc.bootenv.is_empty() {
        println!("\nBootloader environment:");
        for var in &desc.bootenv {
            println!("  {} = {}", var.name, var.value);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_artifacts(title: &str, artifacts: &[Artifact]) {
    if artifacts.is_empty() {
        return;
    }
    println!("\n{} ({}):", title, artifacts.len());
    for artifact in artifacts {
        let name = artifact.filename.as_deref().unwrap_or("<none>");
        let target = artifact
            .device
            .as_deref()
            .or(artifact.volume.as_deref())
            .or(artifact.path.as_deref());
        match target {
            Some(target) => print!("  {} -> {}", name, target),
            None => print!("  {}", name),
        }
        if let Some(ref handler) = artifact.handler {
            print!(" [{}]", handler);
        }
        if let Some(ref version) = artifact.version {
            print!(" v{}", version);
        }
        println!();
    }
}
