use super::ElementId;
use crate::{
    generator::Quality,
    module::{CurvePoint, ModuleKind},
    ParamError,
    Real,
};
use std::slice;

/// Baked parameters of one octave of a fractal generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Octave {
    /// Seed of the gradient noise of this octave
    pub seed: i32,
    /// Frequency of this octave
    pub scale: Real,
    /// Amplitude of this octave: the persistence power for Perlin and Billow, the spectral weight
    /// for ridged multifractals
    pub weight: Real,
}

/// Builds the octave table of a Perlin or Billow generator.
pub fn fractal_octaves(
    frequency: Real,
    lacunarity: Real,
    persistence: Real,
    seed: i32,
    count: i32,
) -> Vec<Octave> {
    let mut scale = frequency;
    let mut weight = 1.0;
    (0 .. count)
        .map(|o| {
            let octave = Octave {
                seed: seed.wrapping_add(o),
                scale,
                weight,
            };
            scale *= lacunarity;
            weight *= persistence;
            octave
        })
        .collect()
}

/// Builds the octave table of a ridged multifractal generator.
pub fn ridged_octaves(
    frequency: Real,
    lacunarity: Real,
    exponent: Real,
    seed: i32,
    count: i32,
) -> Vec<Octave> {
    let mut scale = frequency;
    (0 .. count)
        .map(|o| {
            let octave = Octave {
                seed: seed.wrapping_add(o) & 0x7fffffff,
                scale,
                weight: scale.powf(-exponent),
            };
            scale *= lacunarity;
            octave
        })
        .collect()
}

/// The compiled form of a module.
///
/// Sources are referenced by the [`ElementId`] their modules compiled to in the same pipeline, so
/// evaluating an element never touches the module graph.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Element {
    Perlin {
        octaves: Vec<Octave>,
        quality: Quality,
        scale: Real,
    },
    Billow {
        octaves: Vec<Octave>,
        quality: Quality,
        scale: Real,
    },
    RidgedMulti {
        octaves: Vec<Octave>,
        quality: Quality,
        scale: Real,
        offset: Real,
        gain: Real,
    },
    Voronoi {
        frequency: Real,
        seed: i32,
        displacement: Real,
        enable_distance: bool,
    },
    Checkerboard,
    Constant(Real),
    Abs(ElementId),
    Invert(ElementId),
    Clamp {
        source: ElementId,
        lower: Real,
        upper: Real,
    },
    Exponent {
        source: ElementId,
        exponent: Real,
    },
    ScaleBias {
        source: ElementId,
        scale: Real,
        bias: Real,
    },
    Curve {
        source: ElementId,
        points: Vec<CurvePoint>,
    },
    Terrace {
        source: ElementId,
        points: Vec<Real>,
        invert: bool,
    },
    ScalePoint {
        source: ElementId,
        factors: [Real; 3],
    },
    TranslatePoint {
        source: ElementId,
        offsets: [Real; 3],
    },
    /// Displacement octave tables for the x, y and z axes, seeded `seed`, `seed + 1` and
    /// `seed + 2`.
    Turbulence {
        source: ElementId,
        power: Real,
        displacement: [Vec<Octave>; 3],
    },
    Addition([ElementId; 2]),
    Multiply([ElementId; 2]),
    Minimum([ElementId; 2]),
    Maximum([ElementId; 2]),
    Power([ElementId; 2]),
    Select {
        sources: [ElementId; 3],
        lower: Real,
        upper: Real,
        edge_falloff: Real,
    },
    Blend([ElementId; 3]),
}

impl Element {
    /// Compiles a module kind whose sources compiled to `sources`, in slot order.
    ///
    /// # Panics
    ///
    /// Panics if `sources` holds fewer ids than the kind has source slots.
    pub fn compile(kind: &ModuleKind, sources: &[ElementId]) -> Result<Self, ParamError> {
        kind.check_params()?;

        let element = match kind {
            ModuleKind::Perlin(params) => Element::Perlin {
                octaves: fractal_octaves(
                    params.frequency,
                    params.lacunarity,
                    params.persistence,
                    params.seed,
                    params.octave_count,
                ),
                quality: params.quality,
                scale: params.scale,
            },
            ModuleKind::Billow(params) => Element::Billow {
                octaves: fractal_octaves(
                    params.frequency,
                    params.lacunarity,
                    params.persistence,
                    params.seed,
                    params.octave_count,
                ),
                quality: params.quality,
                scale: params.scale,
            },
            ModuleKind::RidgedMulti(params) => Element::RidgedMulti {
                octaves: ridged_octaves(
                    params.frequency,
                    params.lacunarity,
                    params.exponent,
                    params.seed,
                    params.octave_count,
                ),
                quality: params.quality,
                scale: params.scale,
                offset: params.offset,
                gain: params.gain,
            },
            ModuleKind::Voronoi(params) => Element::Voronoi {
                frequency: params.frequency,
                seed: params.seed,
                displacement: params.displacement,
                enable_distance: params.enable_distance,
            },
            ModuleKind::Checkerboard => Element::Checkerboard,
            ModuleKind::Constant { value } => Element::Constant(*value),
            ModuleKind::Abs => Element::Abs(sources[0]),
            ModuleKind::Invert => Element::Invert(sources[0]),
            ModuleKind::Clamp { lower, upper } => Element::Clamp {
                source: sources[0],
                lower: *lower,
                upper: *upper,
            },
            ModuleKind::Exponent { exponent } => Element::Exponent {
                source: sources[0],
                exponent: *exponent,
            },
            ModuleKind::ScaleBias { scale, bias } => Element::ScaleBias {
                source: sources[0],
                scale: *scale,
                bias: *bias,
            },
            ModuleKind::Curve(curve) => Element::Curve {
                source: sources[0],
                points: curve.control_points().to_vec(),
            },
            ModuleKind::Terrace(terrace) => Element::Terrace {
                source: sources[0],
                points: terrace.control_points().to_vec(),
                invert: terrace.invert,
            },
            ModuleKind::ScalePoint { x, y, z } => Element::ScalePoint {
                source: sources[0],
                factors: [*x, *y, *z],
            },
            ModuleKind::TranslatePoint { x, y, z } => Element::TranslatePoint {
                source: sources[0],
                offsets: [*x, *y, *z],
            },
            ModuleKind::Turbulence(params) => {
                let axis = |n: i32| {
                    fractal_octaves(
                        params.frequency,
                        2.0,
                        0.5,
                        params.seed.wrapping_add(n),
                        params.roughness,
                    )
                };
                Element::Turbulence {
                    source: sources[0],
                    power: params.power,
                    displacement: [axis(0), axis(1), axis(2)],
                }
            }
            ModuleKind::Addition => Element::Addition([sources[0], sources[1]]),
            ModuleKind::Multiply => Element::Multiply([sources[0], sources[1]]),
            ModuleKind::Minimum => Element::Minimum([sources[0], sources[1]]),
            ModuleKind::Maximum => Element::Maximum([sources[0], sources[1]]),
            ModuleKind::Power => Element::Power([sources[0], sources[1]]),
            ModuleKind::Select(params) => Element::Select {
                sources: [sources[0], sources[1], sources[2]],
                lower: params.lower,
                upper: params.upper,
                edge_falloff: params.edge_falloff,
            },
            ModuleKind::Blend => Element::Blend([sources[0], sources[1], sources[2]]),
        };

        Ok(element)
    }

    /// The elements this element reads from, in slot order.
    pub fn sources(&self) -> &[ElementId] {
        match self {
            Element::Perlin { .. }
            | Element::Billow { .. }
            | Element::RidgedMulti { .. }
            | Element::Voronoi { .. }
            | Element::Checkerboard
            | Element::Constant(_) => &[],
            Element::Abs(source) | Element::Invert(source) => slice::from_ref(source),
            Element::Clamp { source, .. }
            | Element::Exponent { source, .. }
            | Element::ScaleBias { source, .. }
            | Element::Curve { source, .. }
            | Element::Terrace { source, .. }
            | Element::ScalePoint { source, .. }
            | Element::TranslatePoint { source, .. }
            | Element::Turbulence { source, .. } => slice::from_ref(source),
            Element::Addition(sources)
            | Element::Multiply(sources)
            | Element::Minimum(sources)
            | Element::Maximum(sources)
            | Element::Power(sources) => &sources[..],
            Element::Select { sources, .. } | Element::Blend(sources) => &sources[..],
        }
    }

    /// A short name for log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Element::Perlin { .. } => "Perlin",
            Element::Billow { .. } => "Billow",
            Element::RidgedMulti { .. } => "RidgedMulti",
            Element::Voronoi { .. } => "Voronoi",
            Element::Checkerboard => "Checkerboard",
            Element::Constant(_) => "Constant",
            Element::Abs(_) => "Abs",
            Element::Invert(_) => "Invert",
            Element::Clamp { .. } => "Clamp",
            Element::Exponent { .. } => "Exponent",
            Element::ScaleBias { .. } => "ScaleBias",
            Element::Curve { .. } => "Curve",
            Element::Terrace { .. } => "Terrace",
            Element::ScalePoint { .. } => "ScalePoint",
            Element::TranslatePoint { .. } => "TranslatePoint",
            Element::Turbulence { .. } => "Turbulence",
            Element::Addition(_) => "Addition",
            Element::Multiply(_) => "Multiply",
            Element::Minimum(_) => "Minimum",
            Element::Maximum(_) => "Maximum",
            Element::Power(_) => "Power",
            Element::Select { .. } => "Select",
            Element::Blend(_) => "Blend",
        }
    }
}

/// Maps `value` through the cubic spline of a curve. Needs at least four points.
pub(crate) fn curve_value(points: &[CurvePoint], value: Real) -> Real {
    use noisepipe_util::math::LerpExt;

    let last = points.len() as isize - 1;
    let position = points.partition_point(|point| point.input <= value) as isize;
    let index = |offset: isize| (position + offset).clamp(0, last) as usize;
    let (i0, i1, i2, i3) = (index(-2), index(-1), index(0), index(1));

    if i1 == i2 {
        return points[i1].output;
    }

    let alpha = (value - points[i1].input) / (points[i2].input - points[i1].input);
    Real::cubic(
        points[i0].output,
        points[i1].output,
        points[i2].output,
        points[i3].output,
        alpha,
    )
}

/// Maps `value` onto the terraces at `points`. Needs at least two points.
pub(crate) fn terrace_value(points: &[Real], invert: bool, value: Real) -> Real {
    use noisepipe_util::math::LerpExt;

    let last = points.len() as isize - 1;
    let position = points.partition_point(|point| *point <= value) as isize;
    let i0 = (position - 1).clamp(0, last) as usize;
    let i1 = position.clamp(0, last) as usize;

    if i0 == i1 {
        return points[i1];
    }

    let (mut low, mut high) = (points[i0], points[i1]);
    let mut alpha = (value - low) / (high - low);
    if invert {
        alpha = 1.0 - alpha;
        std::mem::swap(&mut low, &mut high);
    }

    Real::lerp(alpha * alpha, low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{CurveParams, FractalParams, TerraceParams};

    #[test]
    fn octave_tables_are_baked() {
        let octaves = fractal_octaves(1.5, 2.0, 0.5, 10, 3);
        assert_eq!(
            octaves,
            vec![
                Octave {
                    seed: 10,
                    scale: 1.5,
                    weight: 1.0
                },
                Octave {
                    seed: 11,
                    scale: 3.0,
                    weight: 0.5
                },
                Octave {
                    seed: 12,
                    scale: 6.0,
                    weight: 0.25
                },
            ]
        );

        let ridged = ridged_octaves(1.0, 2.0, 1.0, -1, 2);
        assert_eq!(ridged[0].seed, 0x7fffffff);
        assert_eq!(ridged[1].weight, 0.5);
    }

    #[test]
    fn compile_rejects_bad_params() {
        let mut params = FractalParams::default();
        params.octave_count = 31;
        assert_eq!(
            Element::compile(&ModuleKind::Perlin(params), &[]),
            Err(ParamError::OctaveCount(31))
        );

        let terrace = TerraceParams::new();
        assert!(Element::compile(&ModuleKind::Terrace(terrace), &[ElementId::new(0)]).is_err());
    }

    #[test]
    fn sources_in_slot_order() {
        let ids = [ElementId::new(4), ElementId::new(2), ElementId::new(9)];
        let select = Element::compile(&ModuleKind::select(), &ids).unwrap();
        assert_eq!(select.sources(), &ids);

        let abs = Element::compile(&ModuleKind::Abs, &ids[.. 1]).unwrap();
        assert_eq!(abs.sources(), &ids[.. 1]);
    }

    #[test]
    fn curve_hits_control_points() {
        let mut curve = CurveParams::new();
        for (input, output) in [(-1.0, -1.0), (-0.5, 0.5), (0.5, -0.5), (1.0, 1.0)] {
            curve.add_control_point(input, output).unwrap();
        }
        let points = curve.control_points();

        assert!((curve_value(points, -0.5) - 0.5).abs() < 1e-12);
        assert!((curve_value(points, 0.5) + 0.5).abs() < 1e-12);
        assert_eq!(curve_value(points, -3.0), -1.0);
        assert_eq!(curve_value(points, 3.0), 1.0);
    }

    #[test]
    fn terrace_flattens_near_lower_point() {
        let points = [-1.0, 0.0, 1.0];
        assert_eq!(terrace_value(&points, false, 0.0), 0.0);
        assert_eq!(terrace_value(&points, false, 0.5), 0.25);
        assert_eq!(terrace_value(&points, true, 0.5), 0.75);
        assert_eq!(terrace_value(&points, false, 2.0), 1.0);
        assert_eq!(terrace_value(&points, false, -2.0), -1.0);
    }
}
