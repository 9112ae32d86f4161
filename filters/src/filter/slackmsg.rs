use std::num::NonZeroU32;
use std::time::Duration;

use frame_hooks_common::config::SlackMsgConfig;
use frame_hooks_common::frame::VideoFrame;
use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};

use super::counter::FrameCounter;
use super::formats::FormatList;
use super::traits::{FilterDescriptor, FilterError, FilterFlags, VideoFilter, VIDEO_PADS};
use crate::notify::{Notifier, WebhookMessage, WebhookNotifier};

static DESCRIPTOR: FilterDescriptor = FilterDescriptor {
    name: "slackmsg",
    description: "Send slack message after processing specific number of frame.",
    inputs: VIDEO_PADS,
    outputs: VIDEO_PADS,
    flags: FilterFlags::SUPPORT_TIMELINE_GENERIC,
};

/// Pass-through filter that posts a webhook message every `trigger_interval`
/// frames, starting with the first one.
///
/// Delivery failures are logged and otherwise ignored: the frame always goes
/// downstream.
pub struct SlackMsgFilter {
    notifier: Box<dyn Notifier>,
    message_body: String,
    counter: FrameCounter,
}

impl SlackMsgFilter {
    pub fn new(
        notifier: Box<dyn Notifier>,
        message_body: impl Into<String>,
        trigger_interval: NonZeroU32,
    ) -> Self {
        Self {
            notifier,
            message_body: message_body.into(),
            counter: FrameCounter::new(trigger_interval),
        }
    }

    pub fn from_config(config: &SlackMsgConfig) -> Result<Self, FilterError> {
        let interval = NonZeroU32::new(config.trigger_interval).ok_or(FilterError::InvalidOption {
            filter: DESCRIPTOR.name,
            reason: "trigger_interval must be at least 1".into(),
        })?;
        let notifier = WebhookNotifier::new(
            &config.webhook_url,
            Duration::from_secs(config.request_timeout_secs),
        )
        .map_err(|e| FilterError::InvalidOption {
            filter: DESCRIPTOR.name,
            reason: e.to_string(),
        })?;
        info!(
            host = notifier.url().host_str(),
            trigger_interval = interval.get(),
            "slackmsg filter configured"
        );
        Ok(Self::new(
            Box::new(notifier),
            config.message_body.clone(),
            interval,
        ))
    }
}

impl VideoFilter for SlackMsgFilter {
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
                let message =
                    WebhookMessage::render(&self.message_body, frame.seq, chrono::Utc::now());
                match self.notifier.send(&message).await {
                    Ok(()) => debug!(seq = frame.seq, "webhook notification sent"),
                    Err(e) => warn!(error = %e, seq = frame.seq, "webhook notification failed"),
                }
            }
            Ok(frame)
        })
    }
}
