pub mod extract;
pub mod loader;
pub mod overlay;

pub use extract::ImageExtractor;
pub use loader::{load_oriented, DEFAULT_JPEG_QUALITY};
pub use overlay::{overlay_polygons, LINE_COLOR};
