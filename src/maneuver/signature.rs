use image::{imageops, imageops::FilterType, RgbaImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeParams {
    /// Square size reference icons are rendered at.
    pub render_size: u32,
    /// Square size every mask is rescaled to before comparison.
    pub norm_size: u32,
    /// Pixels with alpha above this value count as icon content.
    pub alpha_threshold: u8,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            render_size: 128,
            norm_size: 64,
            alpha_threshold: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManeuverSignature {
    pub name: String,
    pub mask: Vec<u8>,
}

/// Crop `image` to the bounding box of its visible pixels, rescale it to
/// `norm_size` square and return the alpha channel row by row.
///
/// An image without visible pixels is used uncropped.
pub fn normalize_to_alpha_mask(image: &RgbaImage, params: &NormalizeParams) -> Vec<u8> {
    let norm = params.norm_size;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return vec![0; (norm * norm) as usize];
    }

    let cropped = match visible_bounds(image, params.alpha_threshold) {
        Some((min_x, min_y, max_x, max_y)) if (min_x, min_y, max_x, max_y) != (0, 0, width - 1, height - 1) => {
            imageops::crop_imm(image, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
        }
        _ => image.clone(),
    };

    let scaled = if cropped.dimensions() != (norm, norm) {
        imageops::resize(&cropped, norm, norm, FilterType::Triangle)
    } else {
        cropped
    };

    scaled.pixels().map(|pixel| pixel[3]).collect()
}

fn visible_bounds(image: &RgbaImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] <= threshold {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)),
        });
    }
    bounds
}

/// Sum of absolute alpha differences. Lower is closer; 0 is identical.
pub fn alpha_distance(lhs: &[u8], rhs: &[u8]) -> u64 {
    lhs.iter()
        .zip(rhs)
        .map(|(a, b)| u64::from(a.abs_diff(*b)))
        .sum()
}
