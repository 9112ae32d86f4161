use std::ops::BitOr;
use std::path::PathBuf;

use frame_hooks_common::frame::VideoFrame;
use futures_util::future::BoxFuture;

use super::formats::FormatList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Video,
}

/// A named connection point on a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pad {
    pub name: &'static str,
    pub media_type: MediaType,
}

/// The single `default` video pad both hook filters use on each side.
pub const VIDEO_PADS: &[Pad] = &[Pad {
    name: "default",
    media_type: MediaType::Video,
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterFlags(u32);

impl FilterFlags {
    pub const NONE: Self = Self(0);
    /// The chain may bypass the filter outside its enable window; the filter
    /// itself never looks at the timeline.
    pub const SUPPORT_TIMELINE_GENERIC: Self = Self(1 << 0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FilterFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Registration record of a filter.
#[derive(Debug)]
pub struct FilterDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub inputs: &'static [Pad],
    pub outputs: &'static [Pad],
    pub flags: FilterFlags,
}

/// Per-frame filter interface.
///
/// The chain calls `filter_frame` serially for a given instance. Returning
/// `Ok(frame)` forwards that frame to the single output; returning an error
/// aborts the frame.
pub trait VideoFilter: Send {
    fn descriptor(&self) -> &'static FilterDescriptor;

    /// Pixel formats this filter accepts on its input pad.
    fn query_formats(&self) -> FormatList;

    fn filter_frame(&mut self, frame: VideoFrame) -> BoxFuture<'_, Result<VideoFrame, FilterError>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        self.descriptor().name
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("failed to query free space of {path}: {source}")]
    SpaceQuery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid option for {filter}: {reason}")]
    InvalidOption {
        filter: &'static str,
        reason: String,
    },
    #[error("{0} does not support timeline editing")]
    TimelineUnsupported(String),
}
