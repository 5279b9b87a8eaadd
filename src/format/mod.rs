//! Format handling for uploaded images.
//!
//! Contains the container sniffing used for diagnostics and the tag-based
//! TIFF reader that backs the second decode tier.

pub mod detect;
pub mod tiff;

pub use detect::{detect_container, ContainerKind};
