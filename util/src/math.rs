use std::ops::{Add, Mul, Neg, Rem, Sub};

/// Trait to provide methods to preform linear interpolation and the smoothing curves used by
/// coherent noise.
pub trait LerpExt:
    Add<Self, Output = Self>
    + Sub<Self, Output = Self>
    + Mul<Self, Output = Self>
    + Rem<Self, Output = Self>
    + Neg<Output = Self>
    + PartialOrd
    + Sized
    + Copy
{
    /// The value two
    const TWO: Self;
    /// The value three
    const THREE: Self;
    /// Magnitude past which coordinates are folded back by [`make_int32_range`]
    ///
    /// [`make_int32_range`]: LerpExt::make_int32_range
    const INT32_FOLD: Self;

    /// Preforms linear interpolation
    fn lerp(delta: Self, start: Self, end: Self) -> Self {
        start + delta * (end - start)
    }

    /// Cubic s-curve `3t^2 - 2t^3`, flat at both ends of [0, 1]
    fn s_curve3(t: Self) -> Self {
        t * t * (Self::THREE - Self::TWO * t)
    }

    /// Quintic s-curve `6t^5 - 15t^4 + 10t^3`, flat first and second derivatives at both ends
    fn s_curve5(t: Self) -> Self {
        let six = Self::THREE * Self::TWO;
        let fifteen = six * Self::TWO + Self::THREE;
        let ten = six + Self::TWO * Self::TWO;
        t * t * t * (t * (t * six - fifteen) + ten)
    }

    /// Cubic interpolation between `n1` and `n2`, using `n0` and `n3` as the outer neighbours
    fn cubic(n0: Self, n1: Self, n2: Self, n3: Self, delta: Self) -> Self {
        let p = (n3 - n2) - (n0 - n1);
        let q = (n0 - n1) - p;
        let r = n2 - n0;
        p * delta * delta * delta + q * delta * delta + r * delta + n1
    }

    /// Folds a coordinate into the range a 32 bit integer lattice can address. Values with a
    /// magnitude below 2^30 are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// # use noisepipe_util::math::LerpExt;
    /// assert_eq!(f64::make_int32_range(12.5), 12.5);
    /// assert_eq!(f64::make_int32_range(1073741825.0), -1073741822.0);
    /// ```
    fn make_int32_range(value: Self) -> Self {
        if value >= Self::INT32_FOLD {
            Self::TWO * (value % Self::INT32_FOLD) - Self::INT32_FOLD
        } else if value <= -Self::INT32_FOLD {
            Self::TWO * (value % Self::INT32_FOLD) + Self::INT32_FOLD
        } else {
            value
        }
    }
}

impl LerpExt for f32 {
    const INT32_FOLD: Self = 1073741824.0;
    const THREE: Self = 3.0;
    const TWO: Self = 2.0;
}

impl LerpExt for f64 {
    const INT32_FOLD: Self = 1073741824.0;
    const THREE: Self = 3.0;
    const TWO: Self = 2.0;
}
