//! Product image uploads: content-type filter and local disk storage.

mod filter;
mod storage;

pub use filter::{image_extension, IMAGE_EXTENSIONS};
pub use storage::{FileError, ImageStorage, StoredImage};
