use bytes::BytesMut;
use frame_hooks_common::frame::VideoFrame;
use frame_hooks_common::pixfmt::PixelFormat;
use frame_hooks_filters::FilterChain;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::RunnerError;

/// Splits a headerless rawvideo byte stream into fixed-size frames.
pub struct FrameReader<R> {
    reader: R,
    width: u32,
    height: u32,
    format: PixelFormat,
    fps: f64,
    frame_size: usize,
    seq: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(
        reader: R,
        width: u32,
        height: u32,
        format: PixelFormat,
        fps: f64,
    ) -> Result<Self, RunnerError> {
        if format.is_hwaccel() {
            return Err(RunnerError::HardwareFormat(format));
        }
        let frame_size = format
            .frame_size(width, height)
            .ok_or(RunnerError::FrameTooLarge {
                width,
                height,
                format,
            })?;
        Ok(Self {
            reader,
            width,
            height,
            format,
            fps,
            frame_size,
            seq: 0,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Read the next whole frame. Returns `None` at end of stream; a
    /// truncated trailing frame is discarded.
    pub async fn next_frame(&mut self) -> Result<Option<VideoFrame>, RunnerError> {
        let mut buf = BytesMut::zeroed(self.frame_size);
        let mut filled = 0;
        while filled < self.frame_size {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                if filled > 0 {
                    warn!(
                        seq = self.seq,
                        got = filled,
                        expected = self.frame_size,
                        "truncated trailing frame, discarding"
                    );
                }
                return Ok(None);
            }
            filled += n;
        }

        let pts_ms = (self.seq as f64 * 1000.0 / self.fps).round() as i64;
        let frame = VideoFrame::new(
            buf.freeze(),
            self.width,
            self.height,
            self.format,
            self.seq,
            pts_ms,
        )?;
        self.seq += 1;
        Ok(Some(frame))
    }
}

/// Drive every frame from `reader` through `chain` into `writer`.
/// Returns the number of frames forwarded.
pub async fn pump<R, W>(
    reader: &mut FrameReader<R>,
    chain: &mut FilterChain,
    writer: &mut W,
) -> Result<u64, RunnerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut forwarded: u64 = 0;
    while let Some(frame) = reader.next_frame().await? {
        let frame = chain.process(frame).await?;
        writer.write_all(frame.data()).await?;
        forwarded += 1;
        if forwarded % 100 == 0 {
            debug!(forwarded, "frames forwarded");
        }
    }
    writer.flush().await?;
    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_hooks_filters::filter::StorageFilter;
    use frame_hooks_filters::FilterError;
    use std::io;
    use std::num::NonZeroU32;
    use std::path::Path;

    fn stream(frames: u8, frame_size: usize) -> Vec<u8> {
        (0..frames)
            .flat_map(|i| std::iter::repeat(i).take(frame_size))
            .collect()
    }

    #[tokio::test]
    async fn splits_stream_into_frames() {
        let data = stream(3, 6);
        let mut reader = FrameReader::new(&data[..], 2, 2, PixelFormat::Yuv420p, 25.0).unwrap();
        assert_eq!(reader.frame_size(), 6);

        let mut pts = Vec::new();
        while let Some(frame) = reader.next_frame().await.unwrap() {
            assert_eq!(frame.data()[0], frame.seq as u8);
            pts.push(frame.pts_ms);
        }
        assert_eq!(pts, vec![0, 40, 80]);
    }

    #[tokio::test]
    async fn discards_truncated_tail() {
        let mut data = stream(2, 4);
        data.extend_from_slice(&[9, 9]);
        let mut reader = FrameReader::new(&data[..], 2, 2, PixelFormat::Gray8, 30.0).unwrap();
        assert!(reader.next_frame().await.unwrap().is_some());
        assert!(reader.next_frame().await.unwrap().is_some());
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[test]
    fn hardware_format_cannot_be_read() {
        let data: &[u8] = &[];
        assert!(matches!(
            FrameReader::new(data, 2, 2, PixelFormat::Cuda, 25.0),
            Err(RunnerError::HardwareFormat(PixelFormat::Cuda))
        ));
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let data: &[u8] = &[];
        assert!(matches!(
            FrameReader::new(data, u32::MAX, u32::MAX, PixelFormat::Rgba, 25.0),
            Err(RunnerError::FrameTooLarge { format: PixelFormat::Rgba, .. })
        ));
    }

    #[tokio::test]
    async fn pump_forwards_every_byte() {
        let data = stream(250, 4);
        let probe = |_: &Path| -> io::Result<u64> { Ok(1 << 40) };
        let mut chain = FilterChain::new();
        chain.push(Box::new(StorageFilter::new(
            Box::new(probe),
            ".",
            0.01,
            NonZeroU32::new(100).unwrap(),
        )));

        let mut reader = FrameReader::new(&data[..], 2, 2, PixelFormat::Gray8, 25.0).unwrap();
        let mut out = Vec::new();
        let forwarded = pump(&mut reader, &mut chain, &mut out).await.unwrap();
        assert_eq!(forwarded, 250);
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn pump_stops_on_fatal_filter_error() {
        let data = stream(5, 4);
        let probe = |_: &Path| -> io::Result<u64> { Err(io::Error::other("statvfs failed")) };
        let mut chain = FilterChain::new();
        chain.push(Box::new(StorageFilter::new(
            Box::new(probe),
            ".",
            0.01,
            NonZeroU32::new(100).unwrap(),
        )));

        let mut reader = FrameReader::new(&data[..], 2, 2, PixelFormat::Gray8, 25.0).unwrap();
        let mut out = Vec::new();
        let err = pump(&mut reader, &mut chain, &mut out).await.unwrap_err();
        assert!(matches!(err, RunnerError::Filter(FilterError::SpaceQuery { .. })));
        // The very first frame triggers the check, so nothing got through.
        assert!(out.is_empty());
    }
}
