use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Dark-ink threshold (luma below this counts as "ink" for the covariance
/// computation); matches the default Otsu-ish midpoint used elsewhere.
const DARK_THRESHOLD: u8 = 128;

/// Rotate the image to align the principal axis of its dark-pixel
/// distribution with the horizontal, expanding the canvas and filling the
/// background with white (§4.2).
#[must_use]
pub fn deskew(img: &DynamicImage) -> DynamicImage {
    let angle_degrees = skew_angle_degrees(img);
    if angle_degrees.abs() < f64::EPSILON {
        return img.clone();
    }
    rotate_expand(img, -angle_degrees)
}

/// Angle (degrees) of the principal axis of dark pixels relative to the
/// x-axis, via eigendecomposition of the 2x2 covariance matrix.
fn skew_angle_degrees(img: &DynamicImage) -> f64 {
    let gray = img.to_luma8();

    let mut count = 0u64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < DARK_THRESHOLD {
            count += 1;
            sum_x += x as f64;
            sum_y += y as f64;
        }
    }
    if count == 0 {
        return 0.0;
    }
    let mean_x = sum_x / count as f64;
    let mean_y = sum_y / count as f64;

    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    let mut syy = 0.0f64;
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < DARK_THRESHOLD {
            let dx = x as f64 - mean_x;
            let dy = y as f64 - mean_y;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }
    }
    // Angle of the dominant eigenvector of [[sxx, sxy], [sxy, syy]].
    0.5 * (2.0 * sxy).atan2(sxx - syy) * 180.0 / std::f64::consts::PI
}

/// Rotate `img` by `angle_degrees` counter-clockwise, expanding the canvas
/// to fit the rotated content and filling uncovered area with white.
/// Nearest-neighbor inverse-mapped sampling.
fn rotate_expand(img: &DynamicImage, angle_degrees: f64) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (src_w, src_h) = rgba.dimensions();
    let theta = angle_degrees.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();

    let new_w = (src_w as f64 * cos_t.abs() + src_h as f64 * sin_t.abs()).ceil() as u32;
    let new_h = (src_w as f64 * sin_t.abs() + src_h as f64 * cos_t.abs()).ceil() as u32;
    let new_w = new_w.max(1);
    let new_h = new_h.max(1);

    let src_cx = src_w as f64 / 2.0;
    let src_cy = src_h as f64 / 2.0;
    let dst_cx = new_w as f64 / 2.0;
    let dst_cy = new_h as f64 / 2.0;

    let mut out = RgbaImage::from_pixel(new_w, new_h, Rgba([255, 255, 255, 255]));

    // Inverse mapping: rotate by -theta to find the source pixel for each
    // destination pixel.
    let inv_sin = (-theta).sin();
    let inv_cos = (-theta).cos();

    for y in 0..new_h {
        for x in 0..new_w {
            let dx = x as f64 - dst_cx;
            let dy = y as f64 - dst_cy;
            let sx = dx * inv_cos - dy * inv_sin + src_cx;
            let sy = dx * inv_sin + dy * inv_cos + src_cy;

            if sx >= 0.0 && sy >= 0.0 && sx < src_w as f64 && sy < src_h as f64 {
                let pixel = rgba.get_pixel(sx as u32, sy as u32);
                out.put_pixel(x, y, *pixel);
            }
        }
    }

    DynamicImage::ImageRgba8(out)
}
