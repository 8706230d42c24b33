use image::{DynamicImage, Rgba, RgbaImage};

/// Linear contrast scaling around the mid-grey point (§4.2):
/// `out = clamp((in - 128) * factor + 128)`.
#[must_use]
pub fn contrast(img: &DynamicImage, factor: f32) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbaImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let scale = |c: u8| -> u8 {
            let v = (c as f32 - 128.0) * factor + 128.0;
            v.round().clamp(0.0, 255.0) as u8
        };
        out.put_pixel(x, y, Rgba([scale(r), scale(g), scale(b), a]));
    }

    DynamicImage::ImageRgba8(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_one_is_identity() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([10, 200, 50, 255]));
        let dyn_img = DynamicImage::ImageRgba8(img);
        let out = contrast(&dyn_img, 1.0).to_rgba8();
        assert_eq!(*out.get_pixel(0, 0), Rgba([10, 200, 50, 255]));
    }

    #[test]
    fn factor_zero_flattens_to_mid_grey() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([10, 200, 50, 255]));
        let dyn_img = DynamicImage::ImageRgba8(img);
        let out = contrast(&dyn_img, 0.0).to_rgba8();
        assert_eq!(*out.get_pixel(0, 0), Rgba([128, 128, 128, 255]));
    }
}
