pub mod live;
pub mod manifest;
pub mod store;

pub use live::LiveIndex;
pub use manifest::{ArtifactChecksums, Manifest};
pub use store::{ArtifactStore, Generation};
