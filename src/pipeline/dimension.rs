use crate::{
    generator::{self, Quality},
    Real,
};
use std::fmt::Debug;

/// The dimensionality a pipeline evaluates in.
///
/// Implemented by the zero-sized markers [`Dim1`], [`Dim2`] and [`Dim3`]. A point has one
/// coordinate per axis, in x, y, z order.
pub trait Dimension: Copy + Debug + Default + Send + Sync + 'static {
    /// A coordinate in this dimension.
    type Point: Copy + Debug + PartialEq + Send + Sync + AsRef<[Real]> + AsMut<[Real]> + 'static;

    /// The number of axes.
    const AXES: usize;

    /// Gradient coherent noise at `point`.
    fn gradient_noise(point: &Self::Point, seed: i32, quality: Quality, scale: Real) -> Real;

    /// Pads `point` with zeros up to three axes.
    fn to_xyz(point: &Self::Point) -> [Real; 3] {
        let mut xyz = [0.0; 3];
        xyz[.. Self::AXES].copy_from_slice(point.as_ref());
        xyz
    }
}

/// One dimensional evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dim1;

/// Two dimensional evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dim2;

/// Three dimensional evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dim3;

impl Dimension for Dim1 {
    type Point = [Real; 1];

    const AXES: usize = 1;

    #[inline]
    fn gradient_noise(point: &Self::Point, seed: i32, quality: Quality, scale: Real) -> Real {
        generator::gradient_coherent_noise_1d(point[0], seed, quality, scale)
    }
}

impl Dimension for Dim2 {
    type Point = [Real; 2];

    const AXES: usize = 2;

    #[inline]
    fn gradient_noise(point: &Self::Point, seed: i32, quality: Quality, scale: Real) -> Real {
        generator::gradient_coherent_noise_2d(point[0], point[1], seed, quality, scale)
    }
}

impl Dimension for Dim3 {
    type Point = [Real; 3];

    const AXES: usize = 3;

    #[inline]
    fn gradient_noise(point: &Self::Point, seed: i32, quality: Quality, scale: Real) -> Real {
        generator::gradient_coherent_noise_3d(point[0], point[1], point[2], seed, quality, scale)
    }
}
