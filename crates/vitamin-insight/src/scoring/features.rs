use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;

/// Side length the image is resampled to before features are measured.
pub const MODEL_INPUT_SIZE: u32 = 224;

pub const FEATURE_COUNT: usize = 7;

/// Summary statistics of a normalised image, each scaled into [0, 1]:
/// per-channel means, per-channel standard deviations, then edge energy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageFeatures {
    values: [f64; FEATURE_COUNT],
}

impl ImageFeatures {
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image
            .resize_exact(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, FilterType::Triangle)
            .to_rgb8();
        let pixel_count = f64::from(MODEL_INPUT_SIZE * MODEL_INPUT_SIZE);

        let mut sums = [0.0_f64; 3];
        let mut squares = [0.0_f64; 3];
        for pixel in rgb.pixels() {
            for channel in 0..3 {
                let value = f64::from(pixel[channel]) / 255.0;
                sums[channel] += value;
                squares[channel] += value * value;
            }
        }

        let mut values = [0.0_f64; FEATURE_COUNT];
        for channel in 0..3 {
            let mean = sums[channel] / pixel_count;
            let variance = (squares[channel] / pixel_count - mean * mean).max(0.0);
            values[channel] = mean;
            // std of values in [0, 1] never exceeds 0.5
            values[3 + channel] = (variance.sqrt() * 2.0).min(1.0);
        }
        values[6] = edge_energy(&rgb);

        Self { values }
    }

    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Option<Self> {
        values
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
            .then_some(Self { values })
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }
}

fn edge_energy(rgb: &image::RgbImage) -> f64 {
    let (width, height) = rgb.dimensions();
    let luma = |x: u32, y: u32| {
        let p = rgb.get_pixel(x, y);
        (0.299 * f64::from(p[0]) + 0.587 * f64::from(p[1]) + 0.114 * f64::from(p[2])) / 255.0
    };

    let mut total = 0.0;
    let mut samples = 0.0;
    for y in 0..height {
        for x in 0..width {
            let here = luma(x, y);
            if x + 1 < width {
                total += (luma(x + 1, y) - here).abs();
                samples += 1.0;
            }
            if y + 1 < height {
                total += (luma(x, y + 1) - here).abs();
                samples += 1.0;
            }
        }
    }

    if samples == 0.0 {
        0.0
    } else {
        (total / samples).clamp(0.0, 1.0)
    }
}
