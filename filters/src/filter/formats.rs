use frame_hooks_common::pixfmt::PixelFormat;

/// Set of pixel formats a filter accepts, kept in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatList {
    formats: Vec<PixelFormat>,
}

impl FormatList {
    /// Every format in the registry that is not a hardware surface.
    pub fn software() -> Self {
        Self {
            formats: PixelFormat::ALL
                .iter()
                .copied()
                .filter(|fmt| !fmt.is_hwaccel())
                .collect(),
        }
    }

    pub fn contains(&self, format: PixelFormat) -> bool {
        self.formats.contains(&format)
    }

    pub fn intersect(&self, other: &FormatList) -> FormatList {
        FormatList {
            formats: self
                .formats
                .iter()
                .copied()
                .filter(|fmt| other.contains(*fmt))
                .collect(),
        }
    }

    /// Pick the first format offered upstream that this list accepts.
    pub fn negotiate(&self, offered: &[PixelFormat]) -> Result<PixelFormat, NegotiationError> {
        offered
            .iter()
            .copied()
            .find(|fmt| self.contains(*fmt))
            .ok_or_else(|| NegotiationError::NoCommonFormat {
                offered: offered.iter().map(|f| f.name()).collect::<Vec<_>>().join(","),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = PixelFormat> + '_ {
        self.formats.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl FromIterator<PixelFormat> for FormatList {
    fn from_iter<I: IntoIterator<Item = PixelFormat>>(iter: I) -> Self {
        let mut formats = Vec::new();
        for fmt in iter {
            if !formats.contains(&fmt) {
                formats.push(fmt);
            }
        }
        Self { formats }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("no accepted pixel format among [{offered}]")]
    NoCommonFormat { offered: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_is_all_minus_hwaccel() {
        let list = FormatList::software();
        for fmt in PixelFormat::ALL {
            assert_eq!(list.contains(*fmt), !fmt.is_hwaccel(), "{fmt}");
        }
        let hw = PixelFormat::ALL.iter().filter(|f| f.is_hwaccel()).count();
        assert_eq!(list.len(), PixelFormat::ALL.len() - hw);
        assert!(list.iter().all(|f| !f.is_hwaccel()));
    }

    #[test]
    fn negotiation_skips_hardware_formats() {
        let list = FormatList::software();
        let picked = list
            .negotiate(&[PixelFormat::Cuda, PixelFormat::Vaapi, PixelFormat::Nv12])
            .unwrap();
        assert_eq!(picked, PixelFormat::Nv12);
    }

    #[test]
    fn negotiation_fails_for_hardware_only_offer() {
        let err = FormatList::software()
            .negotiate(&[PixelFormat::Qsv, PixelFormat::DrmPrime])
            .unwrap_err();
        assert!(err.to_string().contains("qsv,drm_prime"));
    }

    #[test]
    fn intersect_keeps_common_formats() {
        let only_rgb: FormatList = [PixelFormat::Rgb24, PixelFormat::Cuda, PixelFormat::Rgb24]
            .into_iter()
            .collect();
        assert_eq!(only_rgb.len(), 2);
        let common = FormatList::software().intersect(&only_rgb);
        assert_eq!(common.iter().collect::<Vec<_>>(), vec![PixelFormat::Rgb24]);
    }
}
