use std::num::NonZeroU32;
use std::path::PathBuf;

use frame_hooks_common::config::StorageConfig;
use frame_hooks_common::frame::VideoFrame;
use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};

use super::counter::FrameCounter;
use super::formats::FormatList;
use super::traits::{FilterDescriptor, FilterError, FilterFlags, VideoFilter, VIDEO_PADS};
use crate::probe::{probe_for, SpaceProbe};

const BYTES_PER_GIB: f64 = 1_073_741_824.0;

static DESCRIPTOR: FilterDescriptor = FilterDescriptor {
    name: "storage",
    description: "Check if we still have enough disk space to continue.",
    inputs: VIDEO_PADS,
    outputs: VIDEO_PADS,
    flags: FilterFlags::SUPPORT_TIMELINE_GENERIC,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceLevel {
    /// Below the low-space threshold, logged at WARN.
    Low,
    /// At or above the threshold, logged at INFO.
    Ok,
}

impl SpaceLevel {
    pub fn classify(free_gb: f64, threshold_gb: f64) -> Self {
        if free_gb < threshold_gb {
            SpaceLevel::Low
        } else {
            SpaceLevel::Ok
        }
    }
}

/// Pass-through filter that checks free space of the filesystem holding
/// `path` every `trigger_interval` frames, starting with the first one.
///
/// A failed check aborts the frame that triggered it.
pub struct StorageFilter {
    /// Source of the free-space figure.
    probe: Box<dyn SpaceProbe>,
    /// Any path on the watched filesystem.
    path: PathBuf,
    /// Free GiB below which a check logs at WARN.
    low_space_threshold_gb: f64,
    /// Gates checks to the first frame and every `trigger_interval` after.
    counter: FrameCounter,
}

impl StorageFilter {
    pub fn new(
        probe: Box<dyn SpaceProbe>,
        path: impl Into<PathBuf>,
        low_space_threshold_gb: f64,
        trigger_interval: NonZeroU32,
    ) -> Self {
        Self {
            probe,
            path: path.into(),
            low_space_threshold_gb,
            counter: FrameCounter::new(trigger_interval),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, FilterError> {
        let interval = NonZeroU32::new(config.trigger_interval).ok_or(FilterError::InvalidOption {
            filter: DESCRIPTOR.name,
            reason: "trigger_interval must be at least 1".into(),
        })?;
        let probe = probe_for(config.backend)?;
        info!(
            path = %config.path.display(),
            backend = ?config.backend,
            threshold_gb = config.low_space_threshold_gb,
            trigger_interval = interval.get(),
            "storage filter configured"
        );
        Ok(Self::new(
            probe,
            config.path.clone(),
            config.low_space_threshold_gb,
            interval,
        ))
    }

    /// Query free space, log it and return the available bytes.
    fn check_space(&self) -> Result<u64, FilterError> {
        let available_bytes = self
            .probe
            .available_bytes(&self.path)
            .map_err(|source| FilterError::SpaceQuery {
                path: self.path.clone(),
                source,
            })?;
        let free_gb = available_bytes as f64 / BYTES_PER_GIB;

        match SpaceLevel::classify(free_gb, self.low_space_threshold_gb) {
            SpaceLevel::Low => warn!(
                path = %self.path.display(),
                threshold_gb = self.low_space_threshold_gb,
                "remaining space is below the low-space threshold"
            ),
            SpaceLevel::Ok => info!(
                path = %self.path.display(),
                "remaining space: {free_gb:.4}G"
            ),
        }
        Ok(available_bytes)
    }
}

impl VideoFilter for StorageFilter {
    fn descriptor(&self) -> &'static FilterDescriptor {
        &DESCRIPTOR
    }

    fn query_formats(&self) -> FormatList {
        FormatList::software()
    }

    fn filter_frame(
        &mut self,
        frame: VideoFrame,
    ) -> BoxFuture<'_, Result<VideoFrame, FilterError>> {
        Box::pin(async move {
            if self.counter.tick() {
                let available_bytes = self.check_space()?;
                debug!(seq = frame.seq, available_bytes, "space checked");
            }
            Ok(frame)
        })
    }
}
