use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Property bits of a pixel format descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u32);

impl FormatFlags {
    pub const NONE: Self = Self(0);
    /// Components live in separate planes (NV12-style interleaved chroma counts as planar).
    pub const PLANAR: Self = Self(1 << 0);
    pub const RGB: Self = Self(1 << 1);
    pub const ALPHA: Self = Self(1 << 2);
    /// Opaque hardware surface; frame memory is not addressable from the host.
    pub const HWACCEL: Self = Self(1 << 3);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FormatFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Static description of a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixFmtDescriptor {
    pub name: &'static str,
    pub nb_components: u8,
    /// Horizontal chroma subsampling as a power of two.
    pub log2_chroma_w: u8,
    /// Vertical chroma subsampling as a power of two.
    pub log2_chroma_h: u8,
    pub flags: FormatFlags,
}

/// Pixel formats known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Yuv420p,
    Yuyv422,
    Uyvy422,
    Rgb24,
    Bgr24,
    Yuv422p,
    Yuv444p,
    Yuv410p,
    Yuv411p,
    Yuvj420p,
    Gray8,
    Gray16le,
    Nv12,
    Nv21,
    Argb,
    Rgba,
    Abgr,
    Bgra,
    Yuv420p10le,
    P010le,
    Vaapi,
    Cuda,
    Qsv,
    VideoToolbox,
    D3d11,
    Vulkan,
    DrmPrime,
}

impl PixelFormat {
    /// Every format in the registry, in registry order.
    pub const ALL: &'static [PixelFormat] = &[
        PixelFormat::Yuv420p,
        PixelFormat::Yuyv422,
        PixelFormat::Uyvy422,
        PixelFormat::Rgb24,
        PixelFormat::Bgr24,
        PixelFormat::Yuv422p,
        PixelFormat::Yuv444p,
        PixelFormat::Yuv410p,
        PixelFormat::Yuv411p,
        PixelFormat::Yuvj420p,
        PixelFormat::Gray8,
        PixelFormat::Gray16le,
        PixelFormat::Nv12,
        PixelFormat::Nv21,
        PixelFormat::Argb,
        PixelFormat::Rgba,
        PixelFormat::Abgr,
        PixelFormat::Bgra,
        PixelFormat::Yuv420p10le,
        PixelFormat::P010le,
        PixelFormat::Vaapi,
        PixelFormat::Cuda,
        PixelFormat::Qsv,
        PixelFormat::VideoToolbox,
        PixelFormat::D3d11,
        PixelFormat::Vulkan,
        PixelFormat::DrmPrime,
    ];

    pub const fn descriptor(self) -> PixFmtDescriptor {
        use PixelFormat::*;

        const fn desc(
            name: &'static str,
            nb_components: u8,
            log2_chroma_w: u8,
            log2_chroma_h: u8,
            flags: FormatFlags,
        ) -> PixFmtDescriptor {
            PixFmtDescriptor {
                name,
                nb_components,
                log2_chroma_w,
                log2_chroma_h,
                flags,
            }
        }

        const PLANAR: FormatFlags = FormatFlags::PLANAR;
        const RGB: FormatFlags = FormatFlags::RGB;
        const RGBA: FormatFlags = FormatFlags(FormatFlags::RGB.0 | FormatFlags::ALPHA.0);
        const HW: FormatFlags = FormatFlags::HWACCEL;

        match self {
            Yuv420p => desc("yuv420p", 3, 1, 1, PLANAR),
            Yuyv422 => desc("yuyv422", 3, 1, 0, FormatFlags::NONE),
            Uyvy422 => desc("uyvy422", 3, 1, 0, FormatFlags::NONE),
            Rgb24 => desc("rgb24", 3, 0, 0, RGB),
            Bgr24 => desc("bgr24", 3, 0, 0, RGB),
            Yuv422p => desc("yuv422p", 3, 1, 0, PLANAR),
            Yuv444p => desc("yuv444p", 3, 0, 0, PLANAR),
            Yuv410p => desc("yuv410p", 3, 2, 2, PLANAR),
            Yuv411p => desc("yuv411p", 3, 2, 0, PLANAR),
            Yuvj420p => desc("yuvj420p", 3, 1, 1, PLANAR),
            Gray8 => desc("gray", 1, 0, 0, FormatFlags::NONE),
            Gray16le => desc("gray16le", 1, 0, 0, FormatFlags::NONE),
            Nv12 => desc("nv12", 3, 1, 1, PLANAR),
            Nv21 => desc("nv21", 3, 1, 1, PLANAR),
            Argb => desc("argb", 4, 0, 0, RGBA),
            Rgba => desc("rgba", 4, 0, 0, RGBA),
            Abgr => desc("abgr", 4, 0, 0, RGBA),
            Bgra => desc("bgra", 4, 0, 0, RGBA),
            Yuv420p10le => desc("yuv420p10le", 3, 1, 1, PLANAR),
            P010le => desc("p010le", 3, 1, 1, PLANAR),
            Vaapi => desc("vaapi", 0, 0, 0, HW),
            Cuda => desc("cuda", 0, 0, 0, HW),
            Qsv => desc("qsv", 0, 0, 0, HW),
            VideoToolbox => desc("videotoolbox_vld", 0, 0, 0, HW),
            D3d11 => desc("d3d11", 0, 0, 0, HW),
            Vulkan => desc("vulkan", 0, 0, 0, HW),
            DrmPrime => desc("drm_prime", 0, 0, 0, HW),
        }
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn is_hwaccel(self) -> bool {
        self.descriptor().flags.contains(FormatFlags::HWACCEL)
    }

    /// Size in bytes of one tightly packed rawvideo frame. `None` for
    /// hardware surfaces and for dimensions whose size overflows `usize`.
    pub fn frame_size(self, width: u32, height: u32) -> Option<usize> {
        use PixelFormat::*;

        if self.is_hwaccel() {
            return None;
        }
        let (w, h) = (width as usize, height as usize);
        let d = self.descriptor();
        let luma = w.checked_mul(h)?;
        // Two chroma planes (or one interleaved plane of twice the width).
        let chroma = |bytes_per_sample: usize| {
            w.div_ceil(1 << d.log2_chroma_w)
                .checked_mul(h.div_ceil(1 << d.log2_chroma_h))?
                .checked_mul(2 * bytes_per_sample)
        };

        match self {
            Gray8 => Some(luma),
            Gray16le => luma.checked_mul(2),
            Yuv420p | Yuvj420p | Yuv422p | Yuv444p | Yuv410p | Yuv411p | Nv12 | Nv21 => {
                luma.checked_add(chroma(1)?)
            }
            Yuv420p10le | P010le => luma.checked_mul(2)?.checked_add(chroma(2)?),
            Yuyv422 | Uyvy422 => w.div_ceil(2).checked_mul(4)?.checked_mul(h),
            Rgb24 | Bgr24 => luma.checked_mul(3),
            Argb | Rgba | Abgr | Bgra => luma.checked_mul(4),
            Vaapi | Cuda | Qsv | VideoToolbox | D3d11 | Vulkan | DrmPrime => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = UnknownPixelFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PixelFormat::ALL
            .iter()
            .copied()
            .find(|fmt| fmt.name() == s)
            .ok_or_else(|| UnknownPixelFormat(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown pixel format: {0}")]
pub struct UnknownPixelFormat(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_parse_back() {
        for fmt in PixelFormat::ALL {
            assert_eq!(fmt.name().parse::<PixelFormat>().unwrap(), *fmt);
        }
        let mut names: Vec<_> = PixelFormat::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PixelFormat::ALL.len());
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "yuv999p".parse::<PixelFormat>().unwrap_err();
        assert_eq!(err.0, "yuv999p");
    }

    #[test]
    fn hardware_formats_have_no_frame_size() {
        for fmt in PixelFormat::ALL {
            assert_eq!(fmt.is_hwaccel(), fmt.frame_size(64, 64).is_none(), "{fmt}");
        }
    }

    #[test]
    fn oversized_dimensions_have_no_frame_size() {
        assert_eq!(PixelFormat::Rgba.frame_size(u32::MAX, u32::MAX), None);
        assert_eq!(PixelFormat::Yuv420p.frame_size(u32::MAX, u32::MAX), None);
        assert_eq!(PixelFormat::P010le.frame_size(u32::MAX, u32::MAX), None);
        assert_eq!(PixelFormat::Uyvy422.frame_size(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn frame_sizes() {
        assert_eq!(PixelFormat::Yuv420p.frame_size(1280, 720), Some(1_382_400));
        assert_eq!(PixelFormat::Nv12.frame_size(1280, 720), Some(1_382_400));
        assert_eq!(PixelFormat::Rgb24.frame_size(2, 2), Some(12));
        assert_eq!(PixelFormat::Rgba.frame_size(2, 2), Some(16));
        assert_eq!(PixelFormat::Yuyv422.frame_size(4, 2), Some(16));
        assert_eq!(PixelFormat::Yuv444p.frame_size(4, 4), Some(48));
        assert_eq!(PixelFormat::P010le.frame_size(4, 4), Some(48));
        assert_eq!(PixelFormat::Gray8.frame_size(3, 3), Some(9));
    }

    #[test]
    fn odd_dimensions_round_chroma_up() {
        // 3x3 luma + two 2x2 chroma planes
        assert_eq!(PixelFormat::Yuv420p.frame_size(3, 3), Some(9 + 8));
        assert_eq!(PixelFormat::Yuyv422.frame_size(3, 1), Some(8));
    }

    #[test]
    fn flags_contain() {
        let flags = FormatFlags::RGB | FormatFlags::ALPHA;
        assert!(flags.contains(FormatFlags::RGB));
        assert!(flags.contains(FormatFlags::ALPHA));
        assert!(!flags.contains(FormatFlags::HWACCEL));
        assert!(PixelFormat::Bgra.descriptor().flags.contains(FormatFlags::ALPHA));
    }
}
