use image::{DynamicImage, GrayImage, Luma};

/// Binarization method selector (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarizeMethod {
    Otsu,
    Adaptive,
}

impl BinarizeMethod {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "otsu" => Some(Self::Otsu),
            "adaptive_threshold" => Some(Self::Adaptive),
            _ => None,
        }
    }
}

/// Global Otsu threshold maximizing between-class variance over 256 bins.
#[must_use]
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_background = 0.0f64;
    let mut weight_background = 0u64;
    let mut best_threshold = 0u8;
    let mut best_variance = -1.0f64;

    for t in 0..256 {
        weight_background += histogram[t];
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * histogram[t] as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_class_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_class_variance > best_variance {
            best_variance = between_class_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

#[must_use]
pub fn binarize_otsu(img: &DynamicImage) -> DynamicImage {
    let gray = img.to_luma8();
    let threshold = otsu_threshold(&gray);
    apply_threshold_map(&gray, |_, _| threshold)
}

/// Integral image (summed-area table) over `u64`, one pixel larger on each
/// side than the source so region sums never need bounds checks.
struct IntegralImage {
    width: u32,
    height: u32,
    sums: Vec<f64>,
    sums_sq: Vec<f64>,
}

impl IntegralImage {
    fn build(gray: &GrayImage) -> Self {
        let width = gray.width();
        let height = gray.height();
        let stride = (width + 1) as usize;
        let mut sums = vec![0.0f64; stride * (height as usize + 1)];
        let mut sums_sq = vec![0.0f64; stride * (height as usize + 1)];

        for y in 0..height {
            for x in 0..width {
                let v = gray.get_pixel(x, y).0[0] as f64;
                let idx = (y as usize + 1) * stride + (x as usize + 1);
                let left = sums[idx - 1];
                let up = sums[idx - stride];
                let up_left = sums[idx - stride - 1];
                sums[idx] = v + left + up - up_left;

                let left_sq = sums_sq[idx - 1];
                let up_sq = sums_sq[idx - stride];
                let up_left_sq = sums_sq[idx - stride - 1];
                sums_sq[idx] = v * v + left_sq + up_sq - up_left_sq;
            }
        }

        Self {
            width,
            height,
            sums,
            sums_sq,
        }
    }

    /// Mean and population variance over the inclusive window
    /// `[x0, x1] x [y0, y1]`, clamped to image bounds.
    fn mean_and_variance(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> (f64, f64) {
        let x0 = x0.clamp(0, self.width as i64 - 1);
        let y0 = y0.clamp(0, self.height as i64 - 1);
        let x1 = x1.clamp(0, self.width as i64 - 1);
        let y1 = y1.clamp(0, self.height as i64 - 1);
        let stride = (self.width + 1) as usize;

        let region_sum = |table: &[f64]| -> f64 {
            let a = table[(y1 as usize + 1) * stride + (x1 as usize + 1)];
            let b = table[(y0 as usize) * stride + (x1 as usize + 1)];
            let c = table[(y1 as usize + 1) * stride + (x0 as usize)];
            let d = table[(y0 as usize) * stride + (x0 as usize)];
            a - b - c + d
        };

        let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
        if count <= 0.0 {
            return (0.0, 0.0);
        }

        let sum = region_sum(&self.sums);
        let sum_sq = region_sum(&self.sums_sq);
        let mean = sum / count;
        let variance = (sum_sq / count - mean * mean).max(0.0);
        (mean, variance)
    }
}

/// Windowed Sauvola threshold: `mean * (1 + k * (stddev / r - 1))`, computed
/// in O(n) via integral images (§4.2).
#[must_use]
pub fn binarize_sauvola(img: &DynamicImage, window_size: u32, k: f32, r: f32) -> DynamicImage {
    let gray = img.to_luma8();
    let half = (odd_window(window_size, gray.width().max(gray.height())) / 2) as i64;
    let integral = IntegralImage::build(&gray);

    apply_threshold_map(&gray, move |x, y| {
        let (mean, variance) = integral.mean_and_variance(
            x as i64 - half,
            y as i64 - half,
            x as i64 + half,
            y as i64 + half,
        );
        let stddev = variance.sqrt();
        let threshold = mean * (1.0 + (k as f64) * (stddev / r as f64 - 1.0));
        threshold.round().clamp(0.0, 255.0) as u8
    })
}

/// Clamp `window_size` to an odd value `>= 3` and `<= dim`.
fn odd_window(window_size: u32, dim: u32) -> u32 {
    let mut w = window_size.max(3).min(dim.max(3));
    if w % 2 == 0 {
        w -= 1;
    }
    w.max(3)
}

fn apply_threshold_map(gray: &GrayImage, threshold_at: impl Fn(u32, u32) -> u8) -> DynamicImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let t = threshold_at(x, y);
        let v = if pixel.0[0] >= t { 255 } else { 0 };
        out.put_pixel(x, y, Luma([v]));
    }
    DynamicImage::ImageLuma8(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_separates_bimodal_histogram() {
        let mut gray = GrayImage::new(4, 2);
        for x in 0..2 {
            for y in 0..2 {
                gray.put_pixel(x, y, Luma([10]));
            }
        }
        for x in 2..4 {
            for y in 0..2 {
                gray.put_pixel(x, y, Luma([250]));
            }
        }
        let threshold = otsu_threshold(&gray);
        assert!(threshold > 10 && threshold < 250);
    }

    #[test]
    fn odd_window_is_always_odd_and_at_least_three() {
        assert_eq!(odd_window(25, 1000), 25);
        assert_eq!(odd_window(24, 1000), 23);
        assert_eq!(odd_window(1, 1000), 3);
        assert_eq!(odd_window(25, 4), 3);
    }

    #[test]
    fn sauvola_binarizes_without_panicking_at_edges() {
        let gray = GrayImage::from_fn(5, 5, |x, y| Luma([((x + y) * 20) as u8]));
        let img = DynamicImage::ImageLuma8(gray);
        let out = binarize_sauvola(&img, 25, 0.2, 128.0).to_luma8();
        assert_eq!(out.dimensions(), (5, 5));
    }
}
