//! # swupdate-description
//!
//! Offline inspection of SWUpdate images.
//!
//! An update image (`.swu`) is a cpio archive whose first member is
//! `sw-description`, a libconfig document describing the artifacts to
//! install. This crate provides:
//! - A libconfig parser with path lookup and typed field access
//! - Resolution of `ref` links between description nodes
//! - The [`SwDescription`] model (images, files, scripts, bootenv)
//! - Reading `.swu` archives ([`SwuArchive`], [`SwuImage`])
//! - Hardware-compatibility matching against a board revision
//!
//! ## Example
//!
//! ```rust,no_run
//! use swupdate_description::{Selection, SwuImage};
//!
//! let image = SwuImage::load("update.swu", &Selection::default())?;
//! println!("{} {}", image.description.name, image.description.version);
//!
//! for image in &image.description.images {
//!     println!("  {:?} -> {:?}", image.filename, image.device);
//! }
//! # Ok::<(), swupdate_description::Error>(())
//! ```

mod archive;
mod description;
mod error;
mod hwcompat;
pub mod libconfig;
mod links;

pub use archive::*;
pub use description::*;
pub use error::*;
pub use hwcompat::*;
pub use links::*;

/// Name of the archive member holding the update description.
pub const DESCRIPTION_FILENAME: &str = "sw-description";

/// Name of the optional detached signature of the description.
pub const SIGNATURE_FILENAME: &str = "sw-description.sig";

/// File extension for update images.
pub const FILE_EXTENSION: &str = "swu";
