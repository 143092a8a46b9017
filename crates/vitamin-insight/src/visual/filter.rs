use image::{GrayImage, Luma, Rgb, RgbImage};

/// Laplacian-style edge kernel (centre 8, neighbours -1).
const FIND_EDGES: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 8, -1], [-1, -1, -1]];

/// Convolves each channel with [`FIND_EDGES`]. The one-pixel border has no
/// full neighbourhood and is copied from the source.
pub(crate) fn find_edges(source: &RgbImage) -> RgbImage {
    let (width, height) = source.dimensions();
    let mut output = source.clone();
    if width < 3 || height < 3 {
        return output;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sums = [0_i32; 3];
            for (ky, row) in FIND_EDGES.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let pixel = source.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for (channel, sum) in sums.iter_mut().enumerate() {
                        *sum += weight * i32::from(pixel[channel]);
                    }
                }
            }
            output.put_pixel(x, y, Rgb(sums.map(|sum| sum.clamp(0, 255) as u8)));
        }
    }

    output
}

/// ITU-R 601-2 luma in 16.16 fixed point, matching PIL's `convert("L")`.
pub(crate) fn to_intensity(source: &RgbImage) -> GrayImage {
    GrayImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b] = source.get_pixel(x, y).0.map(u32::from);
        Luma([((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8])
    })
}

/// Linear blend from `low` at intensity 0 to `high` at intensity 255.
pub(crate) fn colorize(intensity: &GrayImage, low: Rgb<u8>, high: Rgb<u8>) -> RgbImage {
    let lut: Vec<Rgb<u8>> = (0..=255_u16)
        .map(|level| {
            let mut channels = [0_u8; 3];
            for (channel, value) in channels.iter_mut().enumerate() {
                let from = u32::from(low[channel]);
                let to = u32::from(high[channel]);
                let level = u32::from(level);
                *value = ((from * (255 - level) + to * level + 127) / 255) as u8;
            }
            Rgb(channels)
        })
        .collect();

    RgbImage::from_fn(intensity.width(), intensity.height(), |x, y| {
        lut[usize::from(intensity.get_pixel(x, y)[0])]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_regions_have_no_edges() {
        let source = RgbImage::from_pixel(6, 5, Rgb([90, 120, 200]));
        let edges = find_edges(&source);
        assert_eq!(edges.get_pixel(2, 2), &Rgb([0, 0, 0]));
        assert_eq!(edges.get_pixel(0, 0), &Rgb([90, 120, 200]));
        assert_eq!(edges.get_pixel(5, 4), &Rgb([90, 120, 200]));
    }

    #[test]
    fn isolated_bright_pixel_saturates() {
        let mut source = RgbImage::from_pixel(5, 5, Rgb([0, 0, 0]));
        source.put_pixel(2, 2, Rgb([40, 40, 40]));
        let edges = find_edges(&source);
        assert_eq!(edges.get_pixel(2, 2), &Rgb([255, 255, 255]));
        // neighbours see -40 and clamp at zero
        assert_eq!(edges.get_pixel(1, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn tiny_images_pass_through() {
        let source = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        assert_eq!(find_edges(&source), source);
    }

    #[test]
    fn intensity_uses_weighted_luma() {
        let source = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([255, 255, 255]),
        });
        let gray = to_intensity(&source);
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn intensity_rounds_like_fixed_point_luma() {
        // decimal weights would round this pixel down to 131
        let source = RgbImage::from_pixel(1, 1, Rgb([2, 223, 0]));
        assert_eq!(to_intensity(&source).get_pixel(0, 0)[0], 132);
    }

    #[test]
    fn colorize_hits_both_anchors() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[0, 128, 255][x as usize]]));
        let colored = colorize(&gray, Rgb([0, 0, 255]), Rgb([255, 0, 0]));
        assert_eq!(colored.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(colored.get_pixel(2, 0), &Rgb([255, 0, 0]));
        let mid = colored.get_pixel(1, 0);
        assert_eq!(mid[1], 0);
        assert_eq!(u16::from(mid[0]) + u16::from(mid[2]), 255);
    }
}
