use image::{DynamicImage, GrayImage};

/// Standard luminance conversion (§4.2).
#[must_use]
pub fn grayscale(img: &DynamicImage) -> DynamicImage {
    let gray: GrayImage = img.to_luma8();
    DynamicImage::ImageLuma8(gray)
}
