use image::{DynamicImage, GrayImage, imageops::FilterType};

/// Longest side a frame is shrunk to before searching it for a face.
const SCAN_SIDE: u32 = 96;

/// Window sizes tried when searching, as fractions of the shorter side.
const WINDOW_SCALES: [f32; 3] = [0.75, 0.5, 0.35];

/// Pixels in a `side`×`side` thumbnail, rejecting sizes that would overflow.
pub fn pixel_count(side: u32) -> Result<usize, String> {
    let pixels = side
        .checked_mul(side)
        .ok_or_else(|| format!("input_size {side} too large"))?;
    if pixels == 0 {
        return Err("input_size must be positive".into());
    }
    usize::try_from(pixels).map_err(|_| format!("input_size {side} too large"))
}

/// Shrink `image` to a `side`×`side` grayscale thumbnail with values in `[0, 1]`.
///
/// Row-major, one value per pixel. This is the input every dense model here
/// expects.
pub fn thumbnail(image: &DynamicImage, side: u32) -> Vec<f32> {
    luma_thumbnail(&image.to_luma8(), side)
}

/// [`thumbnail`] for an image that is already grayscale.
pub fn luma_thumbnail(gray: &GrayImage, side: u32) -> Vec<f32> {
    image::imageops::resize(gray, side, side, FilterType::Triangle)
        .into_raw()
        .into_iter()
        .map(|b| b as f32 / 255.0)
        .collect()
}

/// Grayscale copy of `image`, shrunk so its longest side is at most the scan size.
pub fn scan_image(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let (w, h) = gray.dimensions();
    let longest = w.max(h);
    if longest <= SCAN_SIDE {
        return gray;
    }
    let nw = (w as u64 * SCAN_SIDE as u64 / longest as u64).max(1) as u32;
    let nh = (h as u64 * SCAN_SIDE as u64 / longest as u64).max(1) as u32;
    image::imageops::resize(&gray, nw, nh, FilterType::Triangle)
}

/// Candidate face regions in `gray`: the whole frame first, then square
/// windows at several scales slid across it with a quarter-window stride.
pub fn candidate_windows(gray: &GrayImage) -> Vec<GrayImage> {
    let (w, h) = gray.dimensions();
    let mut windows = vec![gray.clone()];
    let short = w.min(h);
    for scale in WINDOW_SCALES {
        let side = ((short as f32 * scale) as u32).max(1);
        if side >= short {
            continue;
        }
        let stride = (side / 4).max(1) as usize;
        for y in (0..=h - side).step_by(stride) {
            for x in (0..=w - side).step_by(stride) {
                windows.push(image::imageops::crop_imm(gray, x, y, side, side).to_image());
            }
        }
    }
    windows
}
