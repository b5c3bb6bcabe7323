//! Command handlers grouped by concern.

pub(crate) mod detections;
pub(crate) mod playground;
pub(crate) mod profiles;
pub(crate) mod subreddits;
