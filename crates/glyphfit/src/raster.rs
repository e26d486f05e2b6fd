//! Raster segmentation: one glyph on a uniform background → binary mask and
//! the outer contour of its largest connected component.
//!
//! Steps: composite alpha over the background, grayscale, Otsu level with a
//! contrast floor, crop to the foreground with padding, morphological
//! closing, 8-connected labelling, then trace the outer border of the
//! largest component. Contour points are pixel centers in full-raster
//! coordinates.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::{Deserialize, Serialize};

/// Segmentation tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Minimum gray-level spread between darkest and lightest pixel.
    pub min_contrast: u8,
    /// Components smaller than this are anti-aliasing speckle.
    pub min_component_area_px: u32,
    /// Closing radius (L∞); 1 gives a 3×3 structuring element.
    pub close_radius_px: u8,
    /// Margin kept around the foreground bounding box before morphology.
    pub crop_padding_px: u32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_contrast: 24,
            min_component_area_px: 16,
            close_radius_px: 1,
            crop_padding_px: 20,
        }
    }
}

/// Why a raster held no usable glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The raster is (nearly) uniform.
    NoContrast,
    /// Thresholding selected no pixel.
    NoForeground,
    /// Every component fell below the area floor.
    SpecklesOnly,
}

impl EmptyReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoContrast => "no_contrast",
            Self::NoForeground => "no_foreground",
            Self::SpecklesOnly => "speckles_only",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentError {
    EmptyRaster(EmptyReason),
    /// The selected component produced no outer border.
    NoContour,
}

impl std::fmt::Display for SegmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRaster(reason) => write!(f, "empty raster ({})", reason.code()),
            Self::NoContour => write!(f, "largest component has no outer contour"),
        }
    }
}

impl std::error::Error for SegmentError {}

/// Mask of the selected component inside the cropped window.
#[derive(Debug, Clone)]
pub struct BinaryMask {
    /// 255 = selected component, 0 = background.
    pub image: GrayImage,
    /// Top-left of the window in full-raster pixels.
    pub offset: [u32; 2],
}

/// Output of [`segment`].
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub mask: BinaryMask,
    /// Outer border of the component, pixel centers, full-raster coordinates.
    pub contour: Vec<[f64; 2]>,
    /// Otsu level used for the split.
    pub threshold: u8,
    /// Foreground pixels in the whole raster after thresholding.
    pub foreground_px: usize,
    /// Pixels of the selected component after closing.
    pub component_area_px: usize,
    /// Components above the area floor.
    pub components: usize,
}

fn luma(rgb: [f64; 3]) -> u8 {
    (0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2])
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Composite `raster` over `background` and convert to gray.
pub fn to_gray(raster: &RgbaImage, background: [u8; 3]) -> GrayImage {
    GrayImage::from_fn(raster.width(), raster.height(), |x, y| {
        let p = raster.get_pixel(x, y).0;
        let a = p[3] as f64 / 255.0;
        let mix = |c: u8, b: u8| c as f64 * a + b as f64 * (1.0 - a);
        Luma([luma([
            mix(p[0], background[0]),
            mix(p[1], background[1]),
            mix(p[2], background[2]),
        ])])
    })
}

/// Threshold `gray` into a foreground mask (255 = ink).
///
/// Ink is whichever side of the Otsu level the background is not on.
pub fn threshold(
    gray: &GrayImage,
    background: [u8; 3],
    cfg: &SegmentConfig,
) -> Result<(GrayImage, u8, usize), SegmentError> {
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if gray.width() == 0 || gray.height() == 0 || hi.saturating_sub(lo) < cfg.min_contrast {
        return Err(SegmentError::EmptyRaster(EmptyReason::NoContrast));
    }

    let level = imageproc::contrast::otsu_level(gray);
    let dark_ink = luma(background.map(f64::from)) >= 128;
    let mut count = 0usize;
    let mask = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        let ink = if dark_ink { v <= level } else { v > level };
        if ink {
            count += 1;
            Luma([255])
        } else {
            Luma([0])
        }
    });
    if count == 0 {
        return Err(SegmentError::EmptyRaster(EmptyReason::NoForeground));
    }
    Ok((mask, level, count))
}

fn foreground_bbox(mask: &GrayImage) -> Option<[u32; 4]> {
    let mut b: Option<[u32; 4]> = None;
    for (x, y, p) in mask.enumerate_pixels() {
        if p.0[0] == 0 {
            continue;
        }
        b = Some(match b {
            None => [x, y, x, y],
            Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
        });
    }
    b
}

/// Segment a rendered glyph raster.
pub fn segment(
    raster: &RgbaImage,
    background: [u8; 3],
    cfg: &SegmentConfig,
) -> Result<Segmentation, SegmentError> {
    let gray = to_gray(raster, background);
    let (mask, level, foreground_px) = threshold(&gray, background, cfg)?;

    let [bx0, by0, bx1, by1] =
        foreground_bbox(&mask).ok_or(SegmentError::EmptyRaster(EmptyReason::NoForeground))?;
    let pad = cfg.crop_padding_px;
    let x0 = bx0.saturating_sub(pad);
    let y0 = by0.saturating_sub(pad);
    let x1 = (bx1 + pad).min(mask.width() - 1);
    let y1 = (by1 + pad).min(mask.height() - 1);
    let window = image::imageops::crop_imm(&mask, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image();

    let closed = if cfg.close_radius_px > 0 {
        imageproc::morphology::close(&window, Norm::LInf, cfg.close_radius_px)
    } else {
        window
    };

    let labels = connected_components(&closed, Connectivity::Eight, Luma([0u8]));
    let mut areas: Vec<usize> = Vec::new();
    for p in labels.pixels() {
        let l = p.0[0] as usize;
        if l == 0 {
            continue;
        }
        if areas.len() <= l {
            areas.resize(l + 1, 0);
        }
        areas[l] += 1;
    }
    let floor = cfg.min_component_area_px as usize;
    let components = areas.iter().filter(|&&a| a > 0 && a >= floor).count();
    // Largest area wins; ties go to the lowest label.
    let best = areas
        .iter()
        .enumerate()
        .filter(|(_, a)| **a > 0 && **a >= floor)
        .max_by(|(la, a), (lb, b)| a.cmp(b).then(lb.cmp(la)))
        .map(|(l, &a)| (l as u32, a));
    let Some((label, component_area_px)) = best else {
        return Err(SegmentError::EmptyRaster(EmptyReason::SpecklesOnly));
    };

    let component = GrayImage::from_fn(closed.width(), closed.height(), |x, y| {
        if labels.get_pixel(x, y).0[0] == label {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    let outer = find_contours::<i32>(&component)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .max_by_key(|c| c.points.len())
        .ok_or(SegmentError::NoContour)?;
    let contour: Vec<[f64; 2]> = outer
        .points
        .iter()
        .map(|p| [(p.x + x0 as i32) as f64 + 0.5, (p.y + y0 as i32) as f64 + 0.5])
        .collect();

    tracing::trace!(
        level,
        foreground_px,
        component_area_px,
        components,
        contour_points = contour.len(),
        "raster segmented"
    );
    Ok(Segmentation {
        mask: BinaryMask {
            image: component,
            offset: [x0, y0],
        },
        contour,
        threshold: level,
        foreground_px,
        component_area_px,
        components,
    })
}
