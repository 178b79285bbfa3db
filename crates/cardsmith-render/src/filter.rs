//! Pixel filters applied to image tiles before compositing.
//!
//! All filters work in place on premultiplied RGBA8 and keep every color
//! channel at or below its alpha, so the output stays valid premultiplied data.

use cardsmith_core::ImageFilter;

/// Apply `filter` to a premultiplied RGBA8 buffer of `width x height` pixels.
/// `scale` converts blur radii from canvas pixels into buffer pixels.
pub fn apply_filter(filter: ImageFilter, data: &mut [u8], width: u32, height: u32, scale: f64) {
    match filter {
        ImageFilter::None => {}
        ImageFilter::Grayscale => color_matrix(data, &GRAYSCALE),
        ImageFilter::Sepia => color_matrix(data, &SEPIA),
        ImageFilter::Blur(radius) => blur(data, width, height, radius * scale),
    }
}

/// Largest gaussian kernel radius in buffer pixels.
const MAX_KERNEL_RADIUS: u32 = 1024;

type Matrix = [[f32; 3]; 3];

/// Rec. 709 luma weights.
const GRAYSCALE: Matrix = [
    [0.2126, 0.7152, 0.0722],
    [0.2126, 0.7152, 0.0722],
    [0.2126, 0.7152, 0.0722],
];

const SEPIA: Matrix = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

fn color_matrix(data: &mut [u8], m: &Matrix) {
    for px in data.chunks_exact_mut(4) {
        let rgb = [f32::from(px[0]), f32::from(px[1]), f32::from(px[2])];
        let alpha = f32::from(px[3]);
        for (out, row) in px[..3].iter_mut().zip(m) {
            let v = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
            *out = v.round().clamp(0.0, alpha) as u8;
        }
    }
}

/// Gaussian blur with standard deviation `sigma`, in two separable passes.
fn blur(data: &mut [u8], width: u32, height: u32, sigma: f64) {
    if !sigma.is_finite() || sigma <= 0.0 || width == 0 || height == 0 {
        return;
    }
    let radius = kernel_radius(sigma);
    let kernel = gaussian_kernel_q16(radius, sigma);
    if kernel.len() == 1 {
        return;
    }
    let mut tmp = vec![0u8; data.len()];
    horizontal_blur_q16(data, &mut tmp, width, height, &kernel);
    vertical_blur_q16(&tmp, data, width, height, &kernel);
}

/// `ceil(3 sigma)`, capped at `MAX_KERNEL_RADIUS`.
fn kernel_radius(sigma: f64) -> u32 {
    let radius = (sigma * 3.0).ceil();
    if radius >= f64::from(MAX_KERNEL_RADIUS) {
        MAX_KERNEL_RADIUS
    } else {
        radius.max(0.0) as u32
    }
}

/// Normalized kernel in Q16 fixed point; weights always sum to exactly 65536.
fn gaussian_kernel_q16(radius: u32, sigma: f64) -> Vec<u32> {
    let Ok(r) = i32::try_from(radius.min(MAX_KERNEL_RADIUS)) else {
        return vec![1 << 16];
    };
    if r == 0 {
        return vec![1 << 16];
    }
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|w| ((w / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    weights
}

fn horizontal_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            write_premul(&mut dst[((y * w + x) as usize) * 4..][..4], acc);
        }
    }
}

fn vertical_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            write_premul(&mut dst[((y * w + x) as usize) * 4..][..4], acc);
        }
    }
}

fn write_premul(px: &mut [u8], acc: [u64; 4]) {
    let alpha = q16_to_u8(acc[3]);
    for c in 0..3 {
        px[c] = q16_to_u8(acc[c]).min(alpha);
    }
    px[3] = alpha;
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_sums_to_one() {
        for (radius, sigma) in [(1, 0.5), (6, 2.0), (12, 4.0)] {
            let k = gaussian_kernel_q16(radius, sigma);
            assert_eq!(k.len(), (radius * 2 + 1) as usize);
            assert_eq!(k.iter().map(|&w| u64::from(w)).sum::<u64>(), 65536);
        }
    }

    #[test]
    fn test_grayscale_equalizes_channels() {
        let mut px = vec![255, 0, 0, 255, 0, 255, 0, 255];
        apply_filter(ImageFilter::Grayscale, &mut px, 2, 1, 1.0);
        assert_eq!(&px[..4], &[54, 54, 54, 255]);
        assert_eq!(&px[4..], &[182, 182, 182, 255]);
    }

    #[test]
    fn test_sepia_stays_premultiplied() {
        let mut px = vec![100, 100, 100, 100];
        apply_filter(ImageFilter::Sepia, &mut px, 1, 1, 1.0);
        assert!(px[..3].iter().all(|&c| c <= px[3]));
        assert!(px[0] >= px[1] && px[1] >= px[2]);
    }

    #[test]
    fn test_blur_constant_image_is_identity() {
        let mut px: Vec<u8> = [10u8, 20, 30, 40].repeat(25);
        let before = px.clone();
        apply_filter(ImageFilter::Blur(1.0), &mut px, 5, 5, 1.0);
        assert_eq!(px, before);
    }

    #[test]
    fn test_blur_spreads_a_point() {
        let mut px = vec![0u8; 5 * 5 * 4];
        let center = (2 * 5 + 2) * 4;
        px[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);
        apply_filter(ImageFilter::Blur(1.0), &mut px, 5, 5, 1.0);
        assert!(px[center + 3] < 255);
        assert!(px[(2 * 5 + 3) * 4 + 3] > 0);
    }

    #[test]
    fn test_kernel_radius_is_bounded() {
        assert_eq!(kernel_radius(2.0), 6);
        assert_eq!(kernel_radius(1e9), MAX_KERNEL_RADIUS);
        assert_eq!(kernel_radius(f64::MAX), MAX_KERNEL_RADIUS);
        let k = gaussian_kernel_q16(u32::MAX, 1e9);
        assert_eq!(k.len(), (MAX_KERNEL_RADIUS * 2 + 1) as usize);
        assert_eq!(k.iter().map(|&w| u64::from(w)).sum::<u64>(), 65536);
    }

    #[test]
    fn test_huge_blur_does_not_panic() {
        let mut px = [255u8; 64];
        apply_filter(ImageFilter::Blur(1e9), &mut px, 4, 4, 1.0);
        assert!(px.chunks_exact(4).all(|p| p[..3].iter().all(|&c| c <= p[3])));

        let parsed: ImageFilter = "blur(1000000000px)".parse().unwrap();
        let mut px = [255u8; 64];
        apply_filter(parsed, &mut px, 4, 4, 1.0);
        assert_eq!(px, [255u8; 64]);
    }

    #[test]
    fn test_zero_blur_is_noop() {
        let mut px = vec![1, 2, 3, 4];
        apply_filter(ImageFilter::Blur(0.0), &mut px, 1, 1, 1.0);
        assert_eq!(px, vec![1, 2, 3, 4]);
    }
}
