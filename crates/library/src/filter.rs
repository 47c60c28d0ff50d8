//! Resolution and format constraints.

use wallrand_fetch::{CandidateImage, ImageFormat};

/// Minimum size and allowed formats for a wallpaper.
///
/// # Examples
///
/// ```
/// use wallrand_fetch::ImageFormat;
/// use wallrand_library::Filter;
///
/// let filter = Filter::new(1920, 1080, [ImageFormat::Jpeg, ImageFormat::Png]);
/// assert!(filter.accepts(2560, 1440, ImageFormat::Png));
/// assert!(!filter.accepts(1280, 720, ImageFormat::Png));
/// assert!(!filter.accepts(3840, 2160, ImageFormat::Gif));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    min_width: u32,
    min_height: u32,
    formats: Vec<ImageFormat>,
}

impl Filter {
    pub fn new(min_width: u32, min_height: u32, formats: impl IntoIterator<Item = ImageFormat>) -> Self {
        Self { min_width, min_height, formats: formats.into_iter().collect() }
    }

    /// Zero-sized images are never accepted, whatever the minimum.
    pub fn accepts(&self, width: u32, height: u32, format: ImageFormat) -> bool {
        width > 0
            && height > 0
            && width >= self.min_width
            && height >= self.min_height
            && self.formats.contains(&format)
    }

    /// Check a candidate against its listing metadata, before downloading.
    ///
    /// Only candidates that advertise both dimensions are judged; without a
    /// format hint the format is left for post-download validation.
    pub fn prefilter(&self, candidate: &CandidateImage) -> bool {
        let Some((width, height)) = candidate.dimensions() else {
            return true;
        };
        match candidate.format_hint {
            Some(format) => self.accepts(width, height, format),
            None => width > 0 && height > 0 && width >= self.min_width && height >= self.min_height,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(1920, 1080, [ImageFormat::Jpeg, ImageFormat::Png])
    }
}
