//! Filesystem side of a batch: finding sources and preparing the destination

pub mod destination;
pub mod discovery;

pub use destination::{clean, prepare};
pub use discovery::find_images;
