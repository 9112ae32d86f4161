use frame_hooks_common::config::FilterConfig;
use frame_hooks_common::frame::VideoFrame;
use frame_hooks_common::pixfmt::PixelFormat;
use tracing::{info, trace};

use crate::filter::{
    FilterError, FilterFlags, FormatList, NegotiationError, SlackMsgFilter, StorageFilter,
    VideoFilter,
};

/// Enable window for a timeline-capable filter, in stream seconds.
/// Start is inclusive, end exclusive; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimelineWindow {
    pub from_secs: Option<f64>,
    pub until_secs: Option<f64>,
}

impl TimelineWindow {
    pub const ALWAYS: Self = Self {
        from_secs: None,
        until_secs: None,
    };

    pub fn is_enabled(&self, pts_secs: f64) -> bool {
        self.from_secs.map_or(true, |from| pts_secs >= from)
            && self.until_secs.map_or(true, |until| pts_secs < until)
    }
}

struct Slot {
    filter: Box<dyn VideoFilter>,
    window: TimelineWindow,
}

/// Linear chain of single-input, single-output filters driven one frame at
/// a time.
#[derive(Default)]
pub struct FilterChain {
    slots: Vec<Slot>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build filters in configuration order.
    pub fn from_config(filters: &[FilterConfig]) -> Result<Self, FilterError> {
        let mut chain = Self::new();
        for config in filters {
            let filter: Box<dyn VideoFilter> = match config {
                FilterConfig::SlackMsg(c) => Box::new(SlackMsgFilter::from_config(c)?),
                FilterConfig::Storage(c) => Box::new(StorageFilter::from_config(c)?),
            };
            let (from_secs, until_secs) = config.timeline();
            chain.push_with_timeline(
                filter,
                TimelineWindow {
                    from_secs,
                    until_secs,
                },
            )?;
        }
        info!(filters = ?chain.names(), "filter chain built");
        Ok(chain)
    }

    pub fn push(&mut self, filter: Box<dyn VideoFilter>) {
        self.slots.push(Slot {
            filter,
            window: TimelineWindow::ALWAYS,
        });
    }

    pub fn push_with_timeline(
        &mut self,
        filter: Box<dyn VideoFilter>,
        window: TimelineWindow,
    ) -> Result<(), FilterError> {
        if window != TimelineWindow::ALWAYS
            && !filter
                .descriptor()
                .flags
                .contains(FilterFlags::SUPPORT_TIMELINE_GENERIC)
        {
            return Err(FilterError::TimelineUnsupported(filter.name().to_string()));
        }
        self.slots.push(Slot { filter, window });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.filter.name()).collect()
    }

    /// Formats every filter in the chain accepts.
    pub fn query_formats(&self) -> FormatList {
        self.slots
            .iter()
            .fold(FormatList::software(), |acc, slot| {
                acc.intersect(&slot.filter.query_formats())
            })
    }

    pub fn negotiate(&self, offered: &[PixelFormat]) -> Result<PixelFormat, NegotiationError> {
        self.query_formats().negotiate(offered)
    }

    /// Push one frame through every filter. Filters outside their enable
    /// window are bypassed without being called.
    pub async fn process(&mut self, mut frame: VideoFrame) -> Result<VideoFrame, FilterError> {
        let pts_secs = frame.pts_secs();
        for slot in &mut self.slots {
            if !slot.window.is_enabled(pts_secs) {
                trace!(filter = slot.filter.name(), seq = frame.seq, "outside enable window");
                continue;
            }
            frame = slot.filter.filter_frame(frame).await?;
        }
        Ok(frame)
    }
}
