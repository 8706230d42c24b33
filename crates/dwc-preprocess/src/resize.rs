use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Scale the longest side to `max_dim_px`, preserving aspect ratio (§4.2).
/// A no-op if the image is already within bounds.
#[must_use]
pub fn resize(img: &DynamicImage, max_dim_px: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if longest <= max_dim_px || longest == 0 {
        return img.clone();
    }

    let scale = max_dim_px as f64 / longest as f64;
    let new_width = ((width as f64) * scale).round().max(1.0) as u32;
    let new_height = ((height as f64) * scale).round().max(1.0) as u32;

    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn scales_longest_side_down() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(400, 200, Luma([128])));
        let out = resize(&img, 100);
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn leaves_already_small_images_untouched() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 30, Luma([10])));
        let out = resize(&img, 100);
        assert_eq!(out.dimensions(), (50, 30));
    }
}
