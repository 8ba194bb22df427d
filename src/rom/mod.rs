//! SNES ROM images: loading, header discovery and address translation.

mod error;
mod image;
mod mapping;

pub use error::{Error, Result};
pub use image::Rom;
pub use mapping::RomType;
