use bytes::Bytes;

use crate::pixfmt::PixelFormat;

/// A decoded video frame travelling through a filter chain.
///
/// The pixel payload is opaque to filters: they observe the frame and hand
/// the same buffer downstream. Cloning is cheap, the payload is refcounted.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Zero-based position of the frame in its stream.
    pub seq: u64,
    /// Presentation time in milliseconds.
    pub pts_ms: i64,
}

impl VideoFrame {
    /// Wrap a tightly packed rawvideo payload.
    ///
    /// The payload length must match `format.frame_size(width, height)`.
    /// Hardware surface formats cannot be carried in host memory.
    pub fn new(
        data: Bytes,
        width: u32,
        height: u32,
        format: PixelFormat,
        seq: u64,
        pts_ms: i64,
    ) -> Result<Self, FrameError> {
        if format.is_hwaccel() {
            return Err(FrameError::HardwareFormat(format));
        }
        let expected = format
            .frame_size(width, height)
            .ok_or(FrameError::TooLarge {
                format,
                width,
                height,
            })?;
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                format,
                got: data.len(),
                expected,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            seq,
            pts_ms,
        })
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn pts_secs(&self) -> f64 {
        self.pts_ms as f64 / 1000.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("{format} frame payload has {got} bytes, expected {expected}")]
    SizeMismatch {
        format: PixelFormat,
        got: usize,
        expected: usize,
    },
    #[error("{0} is a hardware surface format and cannot carry host memory")]
    HardwareFormat(PixelFormat),
    #[error("{format} frame of {width}x{height} does not fit in memory")]
    TooLarge {
        format: PixelFormat,
        width: u32,
        height: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_payload() {
        let frame =
            VideoFrame::new(Bytes::from(vec![0u8; 12]), 2, 2, PixelFormat::Rgb24, 3, 120).unwrap();
        assert_eq!(frame.data().len(), 12);
        assert_eq!(frame.seq, 3);
        assert!((frame.pts_secs() - 0.12).abs() < 1e-9);
    }

    #[test]
    fn rejects_short_payload() {
        let err = VideoFrame::new(Bytes::from(vec![0u8; 5]), 2, 2, PixelFormat::Rgb24, 0, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch {
                got: 5,
                expected: 12,
                ..
            }
        ));
    }

    #[test]
    fn rejects_hardware_format() {
        let err =
            VideoFrame::new(Bytes::new(), 2, 2, PixelFormat::Vaapi, 0, 0).unwrap_err();
        assert!(matches!(err, FrameError::HardwareFormat(PixelFormat::Vaapi)));
    }

    #[test]
    fn rejects_oversized_dimensions() {
        let err = VideoFrame::new(Bytes::new(), u32::MAX, u32::MAX, PixelFormat::Rgba, 0, 0)
            .unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { width: u32::MAX, .. }));
    }

    #[test]
    fn clone_shares_payload() {
        let frame =
            VideoFrame::new(Bytes::from(vec![7u8; 4]), 2, 2, PixelFormat::Gray8, 0, 0).unwrap();
        let copy = frame.clone();
        assert_eq!(frame.data().as_ptr(), copy.data().as_ptr());
    }
}
