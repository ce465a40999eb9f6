use crate::Real;
use noisepipe_util::math::LerpExt;
use std::fmt::{self, Display, Formatter};

const X_NOISE_GEN: i32 = 1619;
const Y_NOISE_GEN: i32 = 31337;
const Z_NOISE_GEN: i32 = 6971;
const SEED_NOISE_GEN: i32 = 1013;
const SHIFT_NOISE_GEN: i32 = 8;

/// Default amplitude scale of the gradient noise primitive.
pub const DEFAULT_GRADIENT_SCALE: Real = 2.12;

const SQRT_3: Real = 1.732_050_807_568_877_2;

#[rustfmt::skip]
const GRADIENTS_1D: [Real; 16] = [
    -1.0, -0.875, -0.75, -0.625, -0.5, -0.375, -0.25, -0.125,
    0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 0.875, 1.0,
];

#[rustfmt::skip]
const GRADIENTS_2D: [[Real; 2]; 16] = [
    [1.0, 0.0], [0.923_879_5, 0.382_683_43], [0.707_106_77, 0.707_106_77], [0.382_683_43, 0.923_879_5],
    [0.0, 1.0], [-0.382_683_43, 0.923_879_5], [-0.707_106_77, 0.707_106_77], [-0.923_879_5, 0.382_683_43],
    [-1.0, 0.0], [-0.923_879_5, -0.382_683_43], [-0.707_106_77, -0.707_106_77], [-0.382_683_43, -0.923_879_5],
    [0.0, -1.0], [0.382_683_43, -0.923_879_5], [0.707_106_77, -0.707_106_77], [0.923_879_5, -0.382_683_43],
];

// The twelve cube edge directions, padded to sixteen entries
#[rustfmt::skip]
const GRADIENTS_3D: [[Real; 3]; 16] = [
    [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [1.0, 0.0, -1.0], [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0], [0.0, -1.0, 1.0], [0.0, 1.0, -1.0], [0.0, -1.0, -1.0],
    [1.0, 1.0, 0.0], [0.0, -1.0, 1.0], [-1.0, 1.0, 0.0], [0.0, -1.0, -1.0],
];

/// The interpolation kernel used between lattice points by gradient noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Quality {
    /// Linear interpolation, fastest but with visible lattice artifacts
    Low = 0,
    /// Cubic s-curve interpolation
    Standard = 1,
    /// Quintic s-curve interpolation, continuous second derivative
    High = 2,
}

impl Quality {
    /// Maps the distance from the lower lattice point onto the interpolation weight.
    #[inline]
    pub fn curve(self, t: Real) -> Real {
        match self {
            Quality::Low => t,
            Quality::Standard => Real::s_curve3(t),
            Quality::High => Real::s_curve5(t),
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Standard
    }
}

impl TryFrom<i32> for Quality {
    type Error = InvalidQuality;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quality::Low),
            1 => Ok(Quality::Standard),
            2 => Ok(Quality::High),
            _ => Err(InvalidQuality(value)),
        }
    }
}

/// Returned when an integer does not name a [`Quality`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidQuality(pub i32);

impl Display for InvalidQuality {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "invalid noise quality {}", self.0)
    }
}

impl std::error::Error for InvalidQuality {}

/// Returns the lattice cell containing `value`.
#[inline]
pub fn lattice(value: Real) -> i32 {
    value.floor() as i32
}

#[inline]
fn lattice_hash(x: i32, y: i32, z: i32, seed: i32) -> usize {
    let hash = X_NOISE_GEN
        .wrapping_mul(x)
        .wrapping_add(Y_NOISE_GEN.wrapping_mul(y))
        .wrapping_add(Z_NOISE_GEN.wrapping_mul(z))
        .wrapping_add(SEED_NOISE_GEN.wrapping_mul(seed));
    ((hash ^ (hash >> SHIFT_NOISE_GEN)) & 0xff) as usize
}

#[inline]
fn gradient_1d(fx: Real, ix: i32, seed: i32) -> Real {
    GRADIENTS_1D[lattice_hash(ix, 0, 0, seed) & 15] * (fx - ix as Real)
}

#[inline]
fn gradient_2d(fx: Real, fy: Real, ix: i32, iy: i32, seed: i32) -> Real {
    let [gx, gy] = GRADIENTS_2D[lattice_hash(ix, iy, 0, seed) & 15];
    gx * (fx - ix as Real) + gy * (fy - iy as Real)
}

#[inline]
fn gradient_3d(fx: Real, fy: Real, fz: Real, ix: i32, iy: i32, iz: i32, seed: i32) -> Real {
    let [gx, gy, gz] = GRADIENTS_3D[lattice_hash(ix, iy, iz, seed) & 15];
    gx * (fx - ix as Real) + gy * (fy - iy as Real) + gz * (fz - iz as Real)
}

/// One dimensional gradient coherent noise at `x`, multiplied by `scale`.
pub fn gradient_coherent_noise_1d(x: Real, seed: i32, quality: Quality, scale: Real) -> Real {
    let x0 = lattice(x);
    let xs = quality.curve(x - x0 as Real);

    let n0 = gradient_1d(x, x0, seed);
    let n1 = gradient_1d(x, x0 + 1, seed);
    Real::lerp(xs, n0, n1) * scale
}

/// Two dimensional gradient coherent noise at `(x, y)`, multiplied by `scale`.
pub fn gradient_coherent_noise_2d(x: Real, y: Real, seed: i32, quality: Quality, scale: Real) -> Real {
    let (x0, y0) = (lattice(x), lattice(y));
    let xs = quality.curve(x - x0 as Real);
    let ys = quality.curve(y - y0 as Real);

    let ix0 = Real::lerp(
        xs,
        gradient_2d(x, y, x0, y0, seed),
        gradient_2d(x, y, x0 + 1, y0, seed),
    );
    let ix1 = Real::lerp(
        xs,
        gradient_2d(x, y, x0, y0 + 1, seed),
        gradient_2d(x, y, x0 + 1, y0 + 1, seed),
    );
    Real::lerp(ys, ix0, ix1) * scale
}

/// Three dimensional gradient coherent noise at `(x, y, z)`, multiplied by `scale`.
pub fn gradient_coherent_noise_3d(
    x: Real,
    y: Real,
    z: Real,
    seed: i32,
    quality: Quality,
    scale: Real,
) -> Real {
    let (x0, y0, z0) = (lattice(x), lattice(y), lattice(z));
    let xs = quality.curve(x - x0 as Real);
    let ys = quality.curve(y - y0 as Real);
    let zs = quality.curve(z - z0 as Real);

    let layer = |iz: i32| {
        let ix0 = Real::lerp(
            xs,
            gradient_3d(x, y, z, x0, y0, iz, seed),
            gradient_3d(x, y, z, x0 + 1, y0, iz, seed),
        );
        let ix1 = Real::lerp(
            xs,
            gradient_3d(x, y, z, x0, y0 + 1, iz, seed),
            gradient_3d(x, y, z, x0 + 1, y0 + 1, iz, seed),
        );
        Real::lerp(ys, ix0, ix1)
    };

    Real::lerp(zs, layer(z0), layer(z0 + 1)) * scale
}

/// Integer noise in `[0, 2^31)` for a lattice point.
pub fn int_value_noise(x: i32, y: i32, z: i32, seed: i32) -> i32 {
    let mut n = X_NOISE_GEN
        .wrapping_mul(x)
        .wrapping_add(Y_NOISE_GEN.wrapping_mul(y))
        .wrapping_add(Z_NOISE_GEN.wrapping_mul(z))
        .wrapping_add(SEED_NOISE_GEN.wrapping_mul(seed))
        & 0x7fffffff;
    n ^= n >> 13;
    n.wrapping_mul(
        n.wrapping_mul(n)
            .wrapping_mul(60493)
            .wrapping_add(19990303),
    )
    .wrapping_add(1376312589)
        & 0x7fffffff
}

/// Value noise in `[-1, 1]` for a lattice point.
#[inline]
pub fn value_noise(x: i32, y: i32, z: i32, seed: i32) -> Real {
    1.0 - int_value_noise(x, y, z, seed) as Real / 1073741824.0
}

/// Cell noise over up to three axes. Unused axes must be zero.
///
/// Every lattice cell holds one feature point, jittered by value noise. The result is the
/// displaced value of the cell whose feature point is closest to `point`, plus the distance to that
/// feature point when `enable_distance` is set.
pub fn voronoi(point: [Real; 3], axes: usize, seed: i32, displacement: Real, enable_distance: bool) -> Real {
    let point = point.map(Real::make_int32_range);
    let cell = [lattice(point[0]), lattice(point[1]), lattice(point[2])];
    let reach = |axis: usize| if axis < axes { -2 ..= 2 } else { 0 ..= 0 };

    let mut min_distance = Real::MAX;
    let mut candidate = point;

    for dz in reach(2) {
        for dy in reach(1) {
            for dx in reach(0) {
                let (cx, cy, cz) = (cell[0] + dx, cell[1] + dy, cell[2] + dz);
                let mut feature = [cx as Real, cy as Real, cz as Real];
                let mut distance = 0.0;
                for axis in 0 .. axes {
                    feature[axis] += value_noise(cx, cy, cz, seed.wrapping_add(axis as i32));
                    let delta = feature[axis] - point[axis];
                    distance += delta * delta;
                }

                if distance < min_distance {
                    min_distance = distance;
                    candidate = feature;
                }
            }
        }
    }

    let value = if enable_distance {
        min_distance.sqrt() * SQRT_3 - 1.0
    } else {
        0.0
    };

    let [fx, fy, fz] = candidate;
    let (fx, fy, fz) = (
        lattice(fx),
        if axes > 1 { lattice(fy) } else { 0 },
        if axes > 2 { lattice(fz) } else { 0 },
    );
    value + displacement * value_noise(fx, fy, fz, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_noise_vanishes_on_lattice() {
        for quality in [Quality::Low, Quality::Standard, Quality::High] {
            assert_eq!(gradient_coherent_noise_1d(3.0, 7, quality, 2.12), 0.0);
            assert_eq!(gradient_coherent_noise_2d(-2.0, 5.0, 7, quality, 2.12), 0.0);
            assert_eq!(
                gradient_coherent_noise_3d(1.0, 0.0, -4.0, 7, quality, 2.12),
                0.0
            );
        }
    }

    #[test]
    fn gradient_noise_is_deterministic_and_seeded() {
        let a = gradient_coherent_noise_3d(0.3, 1.7, -2.2, 0, Quality::Standard, 2.12);
        let b = gradient_coherent_noise_3d(0.3, 1.7, -2.2, 0, Quality::Standard, 2.12);
        assert_eq!(a.to_bits(), b.to_bits());

        let differs = (1 .. 8).any(|seed| {
            gradient_coherent_noise_3d(0.3, 1.7, -2.2, seed, Quality::Standard, 2.12) != a
        });
        assert!(differs);
    }

    #[test]
    fn gradient_noise_scales_linearly() {
        let unit = gradient_coherent_noise_2d(0.4, 0.6, 3, Quality::High, 1.0);
        let scaled = gradient_coherent_noise_2d(0.4, 0.6, 3, Quality::High, 2.0);
        assert!((scaled - 2.0 * unit).abs() < 1e-6);
    }

    #[test]
    fn value_noise_range() {
        for x in -20 .. 20 {
            for y in -3 .. 3 {
                let v = value_noise(x, y, x ^ y, 42);
                assert!((-1.0 ..= 1.0).contains(&v), "{} out of range", v);
            }
        }
    }

    #[test]
    fn voronoi_distance_term() {
        let point = [0.25, 0.75, 0.0];
        let flat = voronoi(point, 2, 0, 1.0, false);
        assert!((-1.0 ..= 1.0).contains(&flat));
        assert_eq!(flat, voronoi(point, 2, 0, 1.0, false));

        let distance = voronoi(point, 2, 0, 1.0, true) - flat;
        assert!(distance >= -1.0 - 1e-9);
        assert_eq!(voronoi(point, 2, 0, 0.0, false), 0.0);
    }

    #[test]
    fn voronoi_folds_far_coordinates() {
        for x in [3.0e9, -3.0e9, 1.0e15] {
            let value = voronoi([x, 0.5, 0.0], 2, 0, 1.0, true);
            assert!(value.is_finite());
            assert_eq!(
                value,
                voronoi([Real::make_int32_range(x), 0.5, 0.0], 2, 0, 1.0, true)
            );
        }
    }

    #[test]
    fn quality_from_int() {
        assert_eq!(Quality::try_from(2), Ok(Quality::High));
        assert_eq!(Quality::try_from(3), Err(InvalidQuality(3)));
    }
}
