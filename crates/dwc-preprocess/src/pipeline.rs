use camino::{Utf8Path, Utf8PathBuf};
use image::{DynamicImage, ImageFormat};
use tempfile::Builder;

use crate::binarize::{binarize_otsu, binarize_sauvola, BinarizeMethod};
use crate::contrast::contrast;
use crate::deskew::deskew;
use crate::error::PreprocessError;
use crate::grayscale::grayscale;
use crate::resize::resize;

/// Parameters threaded through a preprocessing pipeline run (§4.2, mirrors
/// `dwc_config::PreprocessConfig`).
#[derive(Debug, Clone)]
pub struct PreprocessParams {
    pub contrast_factor: f32,
    pub max_dim_px: u32,
    pub binarize_method: String,
    pub adaptive_window_size: u32,
    pub adaptive_k: f32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            contrast_factor: 1.0,
            max_dim_px: 3000,
            binarize_method: "otsu".to_string(),
            adaptive_window_size: 25,
            adaptive_k: 0.2,
        }
    }
}

const SAUVOLA_R: f32 = 128.0;

/// Run the named, ordered pipeline of steps over `image_path`, writing the
/// result to a fresh temp file whose path is returned — the caller owns
/// deletion (§4.2).
pub fn run_pipeline(
    image_path: &Utf8Path,
    steps: &[String],
    params: &PreprocessParams,
) -> Result<Utf8PathBuf, PreprocessError> {
    let mut image = image::open(image_path.as_std_path())?;

    for step in steps {
        image = apply_step(image, step, params)?;
    }

    write_temp(&image)
}

fn apply_step(
    image: DynamicImage,
    step: &str,
    params: &PreprocessParams,
) -> Result<DynamicImage, PreprocessError> {
    match step {
        "grayscale" => Ok(grayscale(&image)),
        "deskew" => Ok(deskew(&image)),
        "binarize" => Ok(binarize_otsu(&image)),
        "adaptive_threshold" => Ok(binarize_sauvola(
            &image,
            params.adaptive_window_size,
            params.adaptive_k,
            SAUVOLA_R,
        )),
        "contrast" => Ok(contrast(&image, params.contrast_factor)),
        "resize" => Ok(resize(&image, params.max_dim_px)),
        other => Err(PreprocessError::UnknownStep(other.to_string())),
    }
}

/// `binarize` reads `params.binarize_method` to pick Otsu vs. Sauvola when
/// the step name alone (`"binarize"`) doesn't disambiguate — callers that
/// configure the method via `binarize_method` rather than the distinct
/// `adaptive_threshold` step name should route through this instead of
/// `apply_step` directly.
pub fn binarize_with_method(
    image: DynamicImage,
    params: &PreprocessParams,
) -> Result<DynamicImage, PreprocessError> {
    match BinarizeMethod::parse(&params.binarize_method) {
        Some(BinarizeMethod::Otsu) | None => Ok(binarize_otsu(&image)),
        Some(BinarizeMethod::Adaptive) => Ok(binarize_sauvola(
            &image,
            params.adaptive_window_size,
            params.adaptive_k,
            SAUVOLA_R,
        )),
    }
}

fn write_temp(image: &DynamicImage) -> Result<Utf8PathBuf, PreprocessError> {
    let file = Builder::new()
        .prefix("dwc-preprocess-")
        .suffix(".png")
        .tempfile()?;
    let (_file, path) = file.keep().map_err(|e| e.error)?;
    let utf8_path =
        Utf8PathBuf::from_path_buf(path).expect("tempfile path is always valid UTF-8 here");
    image.save_with_format(utf8_path.as_std_path(), ImageFormat::Png)?;
    Ok(utf8_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, GrayImage, Luma};

    fn write_test_png(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
        let gray = GrayImage::from_pixel(20, 20, Luma([200]));
        let path = dir.path().join(name);
        DynamicImage::ImageLuma8(gray)
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        Utf8PathBuf::from_path_buf(path).unwrap()
    }

    #[test]
    fn unknown_step_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_test_png(&dir, "in.png");
        let err = run_pipeline(
            &input,
            &["not_a_real_step".to_string()],
            &PreprocessParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PreprocessError::UnknownStep(_)));
    }

    #[test]
    fn full_pipeline_produces_a_readable_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_test_png(&dir, "in.png");
        let steps = vec![
            "grayscale".to_string(),
            "contrast".to_string(),
            "binarize".to_string(),
            "resize".to_string(),
        ];
        let output = run_pipeline(&input, &steps, &PreprocessParams::default()).unwrap();
        assert!(output.exists());
        let decoded = image::open(output.as_std_path()).unwrap();
        assert_eq!(decoded.dimensions(), (20, 20));
    }
}
