//! Built-in lifecycle stages.

mod cropper;
mod reaper;
mod thumbnailer;

pub use cropper::CenteredCropper;
pub use reaper::StaleFileReaper;
pub use thumbnailer::BoundedThumbnailer;
