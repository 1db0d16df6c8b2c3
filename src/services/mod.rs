//! Image services used by the removal strategies and the export step

pub mod compositing;
pub mod export;
pub mod io;

pub use compositing::Compositor;
pub use export::ExportService;
pub use io::{ImageIOService, TempUpload};
