//! Image element properties and the decoded pixel source handle.

use super::HexColor;
use crate::error::{CanvasError, CanvasResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Largest accepted image border radius (percent of the box).
pub const MAX_IMAGE_BORDER_RADIUS: f64 = 50.0;
/// Largest accepted image border width in pixels.
pub const MAX_IMAGE_BORDER_WIDTH: f64 = 10.0;
/// Blur radius used when a filter is given as a bare `blur`.
pub const DEFAULT_BLUR_RADIUS: f64 = 2.0;
/// Largest blur radius in canvas pixels; larger radii are clamped to it.
pub const MAX_BLUR_RADIUS: f64 = 100.0;

/// Color filter applied to an image's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFilter {
    #[default]
    None,
    Grayscale,
    Sepia,
    /// Gaussian blur with the given radius in canvas pixels.
    Blur(f64),
}

impl FromStr for ImageFilter {
    type Err = CanvasError;

    /// Accepts `none`, `grayscale`, `sepia`, `blur` and CSS-ish forms such as
    /// `grayscale(100%)` or `blur(4px)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let (name, arg) = match raw.split_once('(') {
            Some((name, rest)) => (name.trim(), rest.strip_suffix(')').map(str::trim)),
            None => (raw.as_str(), None),
        };

        match name {
            "" | "none" => Ok(ImageFilter::None),
            "grayscale" => Ok(ImageFilter::Grayscale),
            "sepia" => Ok(ImageFilter::Sepia),
            "blur" => {
                let radius = match arg {
                    None | Some("") => DEFAULT_BLUR_RADIUS,
                    Some(arg) => arg
                        .trim_end_matches("px")
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|r| r.is_finite() && *r >= 0.0)
                        .ok_or_else(|| CanvasError::InvalidFilter(s.to_string()))?
                        .min(MAX_BLUR_RADIUS),
                };
                Ok(ImageFilter::Blur(radius))
            }
            _ => Err(CanvasError::InvalidFilter(s.to_string())),
        }
    }
}

impl ImageFilter {
    /// This filter with a usable blur radius: clamped to `MAX_BLUR_RADIUS`,
    /// or no filter at all when the radius is negative or not finite.
    pub fn clamped(self) -> Self {
        match self {
            ImageFilter::Blur(radius) if !radius.is_finite() || radius < 0.0 => ImageFilter::None,
            ImageFilter::Blur(radius) => ImageFilter::Blur(radius.min(MAX_BLUR_RADIUS)),
            other => other,
        }
    }
}

impl fmt::Display for ImageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFilter::None => write!(f, "none"),
            ImageFilter::Grayscale => write!(f, "grayscale"),
            ImageFilter::Sepia => write!(f, "sepia"),
            ImageFilter::Blur(radius) => write!(f, "blur({radius}px)"),
        }
    }
}

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// An already-decoded, immutable raster handed to the engine by the host.
///
/// Pixels are stored row-major as premultiplied RGBA8. Clones share the same
/// buffer and id, so the handle is cheap to copy between elements.
#[derive(Clone)]
pub struct PixelSource {
    id: u64,
    width: u32,
    height: u32,
    rgba8_premul: Arc<[u8]>,
}

impl PixelSource {
    /// Build a source from straight (non-premultiplied) RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, rgba8: &[u8]) -> CanvasResult<Self> {
        Self::check_len(width, height, rgba8.len())?;
        let premul: Vec<u8> = rgba8
            .chunks_exact(4)
            .flat_map(|px| premul_rgba8(px[0], px[1], px[2], px[3]))
            .collect();
        Ok(Self::from_parts(width, height, premul))
    }

    /// Build a source from pixels that are already premultiplied.
    pub fn from_premul_rgba8(width: u32, height: u32, rgba8_premul: Vec<u8>) -> CanvasResult<Self> {
        Self::check_len(width, height, rgba8_premul.len())?;
        Ok(Self::from_parts(width, height, rgba8_premul))
    }

    fn from_parts(width: u32, height: u32, rgba8_premul: Vec<u8>) -> Self {
        Self {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            rgba8_premul: rgba8_premul.into(),
        }
    }

    fn check_len(width: u32, height: u32, len: usize) -> CanvasResult<()> {
        if width == 0 || height == 0 {
            return Err(CanvasError::InvalidPixelSource(format!(
                "empty image ({width}x{height})"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| CanvasError::InvalidPixelSource("image size overflow".into()))?;
        if len != expected {
            return Err(CanvasError::InvalidPixelSource(format!(
                "expected {expected} bytes for {width}x{height}, got {len}"
            )));
        }
        Ok(())
    }

    /// Stable identity of the underlying buffer (shared by clones).
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied RGBA8 bytes, row-major.
    pub fn premul_bytes(&self) -> &[u8] {
        &self.rgba8_premul
    }
}

impl PartialEq for PixelSource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for PixelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelSource")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

fn premul_rgba8(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    let premul = |c: u8| -> u8 { ((u16::from(c) * u16::from(a) + 127) / 255) as u8 };
    [premul(r), premul(g), premul(b), a]
}

/// Styling of an image element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageProps {
    /// Decoded pixels; `None` renders as an empty box.
    #[serde(skip)]
    pub source: Option<PixelSource>,
    /// Corner rounding in percent of the box, `0..=50`.
    pub border_radius: f64,
    pub filter: ImageFilter,
    /// Border width in pixels, `0..=10`.
    pub border_width: f64,
    pub border_color: HexColor,
}

impl Default for ImageProps {
    fn default() -> Self {
        Self {
            source: None,
            border_radius: 0.0,
            filter: ImageFilter::None,
            border_width: 0.0,
            border_color: HexColor::black(),
        }
    }
}

impl ImageProps {
    /// Image properties showing `source` with default styling.
    pub fn new(source: Option<PixelSource>) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        assert_eq!("none".parse::<ImageFilter>().unwrap(), ImageFilter::None);
        assert_eq!(
            "Grayscale(100%)".parse::<ImageFilter>().unwrap(),
            ImageFilter::Grayscale
        );
        assert_eq!("sepia".parse::<ImageFilter>().unwrap(), ImageFilter::Sepia);
        assert_eq!(
            "blur(4px)".parse::<ImageFilter>().unwrap(),
            ImageFilter::Blur(4.0)
        );
        assert_eq!(
            "blur".parse::<ImageFilter>().unwrap(),
            ImageFilter::Blur(DEFAULT_BLUR_RADIUS)
        );
        assert_eq!(
            "blur(1000000000px)".parse::<ImageFilter>().unwrap(),
            ImageFilter::Blur(MAX_BLUR_RADIUS)
        );
        assert!("hue-rotate(90deg)".parse::<ImageFilter>().is_err());
        assert!("blur(-1px)".parse::<ImageFilter>().is_err());
    }

    #[test]
    fn test_clamped_filter() {
        assert_eq!(ImageFilter::Blur(1e12).clamped(), ImageFilter::Blur(MAX_BLUR_RADIUS));
        assert_eq!(ImageFilter::Blur(4.0).clamped(), ImageFilter::Blur(4.0));
        assert_eq!(ImageFilter::Blur(-1.0).clamped(), ImageFilter::None);
        assert_eq!(ImageFilter::Blur(f64::INFINITY).clamped(), ImageFilter::None);
        assert_eq!(ImageFilter::Sepia.clamped(), ImageFilter::Sepia);
    }

    #[test]
    fn test_filter_serde() {
        assert_eq!(
            serde_json::to_string(&ImageFilter::Sepia).unwrap(),
            "\"sepia\""
        );
        let blur: ImageFilter = serde_json::from_str("{\"blur\": 3.0}").unwrap();
        assert_eq!(blur, ImageFilter::Blur(3.0));
    }

    #[test]
    fn test_pixel_source_premultiplies() {
        let src = PixelSource::from_rgba8(1, 1, &[255, 128, 0, 128]).unwrap();
        assert_eq!(src.premul_bytes(), &[128, 64, 0, 128]);
        assert_eq!((src.width(), src.height()), (1, 1));
    }

    #[test]
    fn test_pixel_source_rejects_bad_sizes() {
        assert!(PixelSource::from_rgba8(0, 1, &[]).is_err());
        assert!(PixelSource::from_rgba8(2, 2, &[0; 12]).is_err());
        assert!(PixelSource::from_premul_rgba8(1, 1, vec![0; 4]).is_ok());
    }

    #[test]
    fn test_pixel_source_identity_shared_by_clones() {
        let a = PixelSource::from_rgba8(1, 1, &[0, 0, 0, 255]).unwrap();
        let b = a.clone();
        let c = PixelSource::from_rgba8(1, 1, &[0, 0, 0, 255]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
