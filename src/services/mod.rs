//! Side-effecting services kept apart from the processing logic
//!
//! - Snapshot persistence of images before they are transformed
//! - Image file loading and saving for the command line front-end

pub mod io;
pub mod snapshot;

pub use io::ImageIOService;
pub use snapshot::SnapshotService;
