//! Numeric helpers behind the procedural textures: Hermite interpolation,
//! HLS color conversion, random unit vectors, and gaussian sampling.

use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

/// `1 / sqrt(2 * pi)`, the normal-distribution normalization factor.
const INV_SQRT_OF_2PI: f32 = 0.398_942_28;

/// Evaluate the cubic Hermite basis for endpoints `pa`/`pb` with tangents
/// `va`/`vb` at parameter `u` in `[0, 1]`.
#[must_use]
pub fn eval_hermite(pa: f32, pb: f32, va: f32, vb: f32, u: f32) -> f32 {
    let u2 = u * u;
    let u3 = u2 * u;
    let b0 = 2.0 * u3 - 3.0 * u2 + 1.0;
    let b1 = -2.0 * u3 + 3.0 * u2;
    let b2 = u3 - 2.0 * u2 + u;
    let b3 = u3 - u;
    b0 * pa + b1 * pb + b2 * va + b3 * vb
}

/// Convert an HLS color (`x` = hue, `y` = lightness, `z` = saturation, all
/// nominally in `[0, 1]`) to RGB.
///
/// Zero saturation returns the gray `(l, l, l)`. The hue is wrapped once
/// into `[0, 1]`. Hue sextants below 1/6 and above 2/3 extrapolate the
/// neighboring ramp instead of wrapping, so those channels can leave
/// `[0, 1]`; the ramp textures store the result as float data unclamped.
#[must_use]
pub fn hls_to_rgb(hls: Vec3) -> Vec3 {
    const SIXTH: f32 = 1.0 / 6.0;
    const THIRD: f32 = 1.0 / 3.0;
    const TWO_THIRDS: f32 = 2.0 / 3.0;

    let (mut h, l, s) = (hls.x, hls.y, hls.z);
    if s == 0.0 {
        return Vec3::splat(l);
    }

    if h < 0.0 {
        h += 1.0;
    }
    if h > 1.0 {
        h -= 1.0;
    }

    let v2 = if l <= 0.5 { l * (1.0 + s) } else { (l + s) - l * s };
    let v1 = 2.0 * l - v2;
    let dv = (v2 - v1) * 6.0;

    if h < SIXTH {
        Vec3::new(v2, v1 + dv * h, v1 + dv * (h - THIRD))
    } else if h < 0.5 {
        Vec3::new(v1 + dv * (THIRD - h), v2, v1 + dv * (h - THIRD))
    } else if h < TWO_THIRDS {
        Vec3::new(v1, v1 + dv * (TWO_THIRDS - h), v2)
    } else {
        Vec3::new(v1, v1, v1 + dv * (THIRD - h))
    }
}

/// Generate a random vector uniformly distributed on the unit sphere.
///
/// Z is drawn uniformly from `[-1, 1]`, then a random angle picks a point
/// on the circle of radius `sqrt(1 - z^2)` for X and Y.
pub fn random_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.random_range(-1.0..=1.0);
    let radius = (1.0 - z * z).sqrt();
    let t: f32 = rng.random_range(-PI..=PI);
    Vec3::new(t.cos() * radius, t.sin() * radius, z)
}

/// Build an `n` by `n` point-sprite falloff map with `components` floats
/// per texel.
///
/// Every component of a texel holds the Hermite falloff
/// `eval_hermite(0.7, 0.0, 0.3, 0.0, dist)`, where `dist` is the texel's
/// distance from the map center over `[-1, 1]^2`, clamped to 1 so the
/// corners settle at the endpoint value.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn gaussian_map(n: usize, components: usize) -> Vec<f32> {
    let mut out = vec![0.0_f32; n * n * components];
    let incr = 2.0 / n as f32;

    let mut i = 0;
    let mut y = -1.0_f32;
    for _ in 0..n {
        let y2 = y * y;
        let mut x = -1.0_f32;
        for _ in 0..n {
            let dist = (x * x + y2).sqrt().min(1.0);
            let value = eval_hermite(0.7, 0.0, 0.3, 0.0, dist);
            out[i..i + components].fill(value);
            i += components;
            x += incr;
        }
        y += incr;
    }
    out
}

/// Sample a normal density into a buffer of `size` floats, as used by the
/// gaussian-kernel texture.
///
/// The kernel covers `[-radius, radius]` with `radius = 3 * sigma - 1`,
/// its zero sample landing on index `size / 2`. The written span is
/// `size - 1` samples for even sizes; any trailing texel is left at zero.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let mut out = vec![0.0_f32; size];
    if size < 2 {
        return out;
    }

    let half = (size >> 1) - 1;
    let radius = 3.0 * sigma - 1.0;
    let step = radius / (half + 1) as f32;

    let inv_sigma = 1.0 / sigma;
    let inv_sigma_sq_x2 = 0.5 * inv_sigma * inv_sigma;
    let norm = INV_SQRT_OF_2PI * inv_sigma;

    let mut f = -radius;
    for texel in out.iter_mut().take(2 * half + 1) {
        *texel = (-(f * f) * inv_sigma_sq_x2).exp() * norm;
        f += step;
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn assert_f32_eq(actual: f32, expected: f32, eps: f32) {
        assert!(
            (actual - expected).abs() < eps,
            "expected {expected}, got {actual}",
        );
    }

    #[test]
    fn hermite_hits_endpoints() {
        assert_f32_eq(eval_hermite(0.7, 0.0, 0.3, 0.0, 0.0), 0.7, f32::EPSILON);
        assert_f32_eq(eval_hermite(0.7, 0.0, 0.3, 0.0, 1.0), 0.0, f32::EPSILON);
    }

    #[test]
    fn hermite_midpoint_known_value() {
        // B0(0.5) = B1(0.5) = 0.5, B2(0.5) = 0.125, B3(0.5) = -0.375
        assert_f32_eq(eval_hermite(0.7, 0.0, 0.3, 0.0, 0.5), 0.3875, 1e-6);
    }

    #[test]
    fn hls_zero_saturation_is_gray() {
        let rgb = hls_to_rgb(Vec3::new(0.25, 0.6, 0.0));
        assert_f32_eq(rgb.x, 0.6, f32::EPSILON);
        assert_f32_eq(rgb.y, 0.6, f32::EPSILON);
        assert_f32_eq(rgb.z, 0.6, f32::EPSILON);
    }

    #[test]
    fn hls_pure_green_at_one_third() {
        let rgb = hls_to_rgb(Vec3::new(1.0 / 3.0, 0.5, 1.0));
        assert_f32_eq(rgb.x, 0.0, 1e-6);
        assert_f32_eq(rgb.y, 1.0, 1e-6);
        assert_f32_eq(rgb.z, 0.0, 1e-6);
    }

    #[test]
    fn hls_red_sextant_extrapolates_blue() {
        // At hue 0 the first sextant extrapolates the blue channel to
        // v1 - 2 * (v2 - v1) rather than wrapping it back to v1.
        let rgb = hls_to_rgb(Vec3::new(0.0, 0.5, 1.0));
        assert_f32_eq(rgb.x, 1.0, 1e-6);
        assert_f32_eq(rgb.y, 0.0, 1e-6);
        assert_f32_eq(rgb.z, -2.0, 1e-5);
    }

    #[test]
    fn hls_hue_wraps_once() {
        let a = hls_to_rgb(Vec3::new(1.2, 0.5, 0.99));
        let b = hls_to_rgb(Vec3::new(0.2, 0.5, 0.99));
        assert_f32_eq(a.x, b.x, 1e-6);
        assert_f32_eq(a.y, b.y, 1e-6);
        assert_f32_eq(a.z, b.z, 1e-6);
    }

    #[test]
    fn random_vectors_lie_on_unit_sphere() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            let v = random_vector(&mut rng);
            assert_f32_eq(v.length(), 1.0, 1e-5);
            assert!((-1.0..=1.0).contains(&v.z));
        }
    }

    #[test]
    fn gaussian_map_center_and_corner() {
        let n = 8;
        let components = 2;
        let map = gaussian_map(n, components);
        assert_eq!(map.len(), n * n * components);

        // Texel (4, 4) sits at (0, 0): distance 0, the Hermite start value.
        let center = (4 * n + 4) * components;
        assert_f32_eq(map[center], 0.7, 1e-5);
        assert_f32_eq(map[center + 1], map[center], f32::EPSILON);

        // Texel (0, 0) sits at (-1, -1): distance clamps to 1, endpoint 0.
        assert_f32_eq(map[0], 0.0, 1e-6);
    }

    #[test]
    fn gaussian_map_is_radially_symmetric() {
        let n = 8;
        let map = gaussian_map(n, 1);
        // Mirror texels around the (0, 0) sample at index 4.
        assert_f32_eq(map[4 * n + 2], map[4 * n + 6], 1e-6);
        assert_f32_eq(map[2 * n + 4], map[6 * n + 4], 1e-6);
    }

    #[test]
    fn gaussian_kernel_peak_and_symmetry() {
        let size = 16;
        let kernel = gaussian_kernel(size, 1.0);
        assert_eq!(kernel.len(), size);

        // The sample point is 0 at index size / 2.
        let center = size / 2;
        assert_f32_eq(kernel[center], INV_SQRT_OF_2PI, 1e-4);

        // Symmetric tails around the center.
        assert_f32_eq(kernel[center - 6], kernel[center + 6], 1e-4);
        assert!(kernel[0] < kernel[center]);

        // Even sizes leave the last texel unwritten.
        assert_f32_eq(kernel[size - 1], 0.0, f32::EPSILON);
    }

    #[test]
    fn gaussian_kernel_degenerate_sizes() {
        assert!(gaussian_kernel(0, 1.0).is_empty());
        assert_eq!(gaussian_kernel(1, 1.0), vec![0.0]);
    }
}
