use crate::{
    generator::{Quality, DEFAULT_GRADIENT_SCALE},
    ParamError,
    Real,
};
use std::fmt::{self, Display, Formatter};

/// The largest octave count fractal generators accept.
pub const MAX_OCTAVES: i32 = 30;

/// Parameters shared by the Perlin and Billow generators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractalParams {
    /// Frequency of the first octave
    pub frequency: Real,
    /// Number of octaves summed together
    pub octave_count: i32,
    /// Seed of the first octave, octave `n` uses `seed + n`
    pub seed: i32,
    /// Interpolation quality of the underlying gradient noise
    pub quality: Quality,
    /// Frequency multiplier between successive octaves
    pub lacunarity: Real,
    /// Amplitude multiplier between successive octaves
    pub persistence: Real,
    /// Amplitude of the gradient noise primitive
    pub scale: Real,
}

impl Default for FractalParams {
    fn default() -> Self {
        FractalParams {
            frequency: 1.0,
            octave_count: 6,
            seed: 0,
            quality: Quality::Standard,
            lacunarity: 2.0,
            persistence: 0.5,
            scale: DEFAULT_GRADIENT_SCALE,
        }
    }
}

/// Parameters of the ridged multifractal generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RidgedMultiParams {
    /// Frequency of the first octave
    pub frequency: Real,
    /// Number of octaves
    pub octave_count: i32,
    /// Seed of the first octave
    pub seed: i32,
    /// Interpolation quality of the underlying gradient noise
    pub quality: Quality,
    /// Frequency multiplier between successive octaves
    pub lacunarity: Real,
    /// Controls how quickly the spectral weights fall off
    pub exponent: Real,
    /// Value the absolute octave signal is subtracted from
    pub offset: Real,
    /// Feedback factor of each octave's signal into the next octave's weight
    pub gain: Real,
    /// Amplitude of the gradient noise primitive
    pub scale: Real,
}

impl Default for RidgedMultiParams {
    fn default() -> Self {
        RidgedMultiParams {
            frequency: 1.0,
            octave_count: 6,
            seed: 0,
            quality: Quality::Standard,
            lacunarity: 2.0,
            exponent: 1.0,
            offset: 1.0,
            gain: 2.0,
            scale: DEFAULT_GRADIENT_SCALE,
        }
    }
}

/// Parameters of the cell noise generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoronoiParams {
    /// Frequency of the cell lattice
    pub frequency: Real,
    /// Seed of the feature point jitter
    pub seed: i32,
    /// Scale of the random value assigned to each cell
    pub displacement: Real,
    /// Adds the distance to the nearest feature point to the output
    pub enable_distance: bool,
}

impl Default for VoronoiParams {
    fn default() -> Self {
        VoronoiParams {
            frequency: 1.0,
            seed: 0,
            displacement: 1.0,
            enable_distance: false,
        }
    }
}

/// Parameters of the turbulence transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurbulenceParams {
    /// How far coordinates are displaced
    pub power: Real,
    /// Octave count of the displacement noise
    pub roughness: i32,
    /// Seed of the first displacement axis
    pub seed: i32,
    /// Frequency of the displacement noise
    pub frequency: Real,
}

impl Default for TurbulenceParams {
    fn default() -> Self {
        TurbulenceParams {
            power: 1.0,
            roughness: 3,
            seed: 0,
            frequency: 1.0,
        }
    }
}

/// Parameters of the select combinator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectParams {
    /// Control values below this select the first source
    pub lower: Real,
    /// Control values above this select the second source
    pub upper: Real,
    /// Width of the transition band on both sides of the selection range
    pub edge_falloff: Real,
}

impl Default for SelectParams {
    fn default() -> Self {
        SelectParams {
            lower: -1.0,
            upper: 1.0,
            edge_falloff: 0.0,
        }
    }
}

/// A mapping from an input value to an output value on a curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurvePoint {
    /// Source value
    pub input: Real,
    /// Value the source is mapped to
    pub output: Real,
}

/// The control points of a curve, kept sorted by input value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurveParams {
    points: Vec<CurvePoint>,
}

impl CurveParams {
    /// The minimum number of points a curve needs to be evaluated.
    pub const MIN_POINTS: usize = 4;

    /// Creates an empty curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a control point, keeping the points sorted.
    pub fn add_control_point(&mut self, input: Real, output: Real) -> Result<(), ParamError> {
        let index = insertion_index(&self.points, input, |point| point.input)?;
        self.points.insert(index, CurvePoint { input, output });
        Ok(())
    }

    /// The control points in ascending input order.
    pub fn control_points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Removes every control point.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// The terrace positions, kept sorted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerraceParams {
    points: Vec<Real>,
    /// Flips the curvature of every terrace
    pub invert: bool,
}

impl TerraceParams {
    /// The minimum number of points a terrace needs to be evaluated.
    pub const MIN_POINTS: usize = 2;

    /// Creates a terrace without control points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a terrace position, keeping the points sorted.
    pub fn add_control_point(&mut self, value: Real) -> Result<(), ParamError> {
        let index = insertion_index(&self.points, value, |point| *point)?;
        self.points.insert(index, value);
        Ok(())
    }

    /// Adds `count` terraces spread evenly over `[-1, 1]`.
    pub fn make_control_points(&mut self, count: usize) -> Result<(), ParamError> {
        if count < Self::MIN_POINTS {
            return Err(ParamError::TooFewControlPoints {
                required: Self::MIN_POINTS,
                found: count,
            });
        }

        self.points.clear();
        let step = 2.0 / (count - 1) as Real;
        for i in 0 .. count {
            self.add_control_point(-1.0 + i as Real * step)?;
        }
        Ok(())
    }

    /// The terrace positions in ascending order.
    pub fn control_points(&self) -> &[Real] {
        &self.points
    }

    /// Removes every control point.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}

fn insertion_index<T>(points: &[T], position: Real, key: impl Fn(&T) -> Real) -> Result<usize, ParamError> {
    let index = points.partition_point(|point| key(point) < position);
    match points.get(index) {
        Some(point) if key(point) == position => Err(ParamError::DuplicateControlPoint(position)),
        _ => Ok(index),
    }
}

/// Every kind of module together with its parameters.
///
/// Generators have no sources, transforms have one, `Addition`, `Multiply`, `Minimum`, `Maximum` and
/// `Power` combine two sources, `Select` and `Blend` take two value sources followed by a control
/// source.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleKind {
    /// Fractal gradient noise
    Perlin(FractalParams),
    /// Fractal noise built from the absolute value of each octave
    Billow(FractalParams),
    /// Ridged multifractal noise
    RidgedMulti(RidgedMultiParams),
    /// Cell noise
    Voronoi(VoronoiParams),
    /// Alternating unit cubes of -1 and 1
    Checkerboard,
    /// The same value everywhere
    Constant {
        /// The output value
        value: Real,
    },
    /// Absolute value of the source
    Abs,
    /// Negated source
    Invert,
    /// Source clamped to `[lower, upper]`
    Clamp {
        /// Lower bound
        lower: Real,
        /// Upper bound
        upper: Real,
    },
    /// Source mapped into `[0, 1]`, raised to `exponent` and mapped back to `[-1, 1]`
    Exponent {
        /// The power applied
        exponent: Real,
    },
    /// `source * scale + bias`
    ScaleBias {
        /// Multiplier
        scale: Real,
        /// Offset added after scaling
        bias: Real,
    },
    /// Source remapped through a cubic spline
    Curve(CurveParams),
    /// Source remapped onto terraces
    Terrace(TerraceParams),
    /// Source evaluated at scaled coordinates
    ScalePoint {
        /// Factor applied to x
        x: Real,
        /// Factor applied to y
        y: Real,
        /// Factor applied to z
        z: Real,
    },
    /// Source evaluated at translated coordinates
    TranslatePoint {
        /// Offset added to x
        x: Real,
        /// Offset added to y
        y: Real,
        /// Offset added to z
        z: Real,
    },
    /// Source evaluated at coordinates displaced by Perlin noise
    Turbulence(TurbulenceParams),
    /// Sum of two sources
    Addition,
    /// Product of two sources
    Multiply,
    /// Smaller of two sources
    Minimum,
    /// Larger of two sources
    Maximum,
    /// First source raised to the power of the second
    Power,
    /// Chooses between two sources depending on the control source
    Select(SelectParams),
    /// Interpolates between two sources weighted by the control source
    Blend,
}

impl ModuleKind {
    /// Perlin noise with default parameters.
    pub fn perlin() -> Self {
        ModuleKind::Perlin(FractalParams::default())
    }

    /// Billow noise with default parameters.
    pub fn billow() -> Self {
        ModuleKind::Billow(FractalParams::default())
    }

    /// Ridged multifractal noise with default parameters.
    pub fn ridged_multi() -> Self {
        ModuleKind::RidgedMulti(RidgedMultiParams::default())
    }

    /// Cell noise with default parameters.
    pub fn voronoi() -> Self {
        ModuleKind::Voronoi(VoronoiParams::default())
    }

    /// Turbulence with default parameters.
    pub fn turbulence() -> Self {
        ModuleKind::Turbulence(TurbulenceParams::default())
    }

    /// Select with default bounds and no falloff.
    pub fn select() -> Self {
        ModuleKind::Select(SelectParams::default())
    }

    /// Creates the default instance of the given module type.
    pub fn default_for(module_type: ModuleType) -> Self {
        match module_type {
            ModuleType::Perlin => Self::perlin(),
            ModuleType::Billow => Self::billow(),
            ModuleType::Addition => ModuleKind::Addition,
            ModuleType::Absolute => ModuleKind::Abs,
            ModuleType::Blend => ModuleKind::Blend,
            ModuleType::Checkerboard => ModuleKind::Checkerboard,
            ModuleType::Clamp => ModuleKind::Clamp {
                lower: -1.0,
                upper: 1.0,
            },
            ModuleType::Constant => ModuleKind::Constant { value: 0.0 },
            ModuleType::Curve => ModuleKind::Curve(CurveParams::new()),
            ModuleType::Exponent => ModuleKind::Exponent { exponent: 1.0 },
            ModuleType::Invert => ModuleKind::Invert,
            ModuleType::Maximum => ModuleKind::Maximum,
            ModuleType::Minimum => ModuleKind::Minimum,
            ModuleType::Multiply => ModuleKind::Multiply,
            ModuleType::Power => ModuleKind::Power,
            ModuleType::RidgedMulti => Self::ridged_multi(),
            ModuleType::ScaleBias => ModuleKind::ScaleBias {
                scale: 1.0,
                bias: 0.0,
            },
            ModuleType::Select => Self::select(),
            ModuleType::ScalePoint => ModuleKind::ScalePoint {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
            ModuleType::Turbulence => Self::turbulence(),
            ModuleType::Terrace => ModuleKind::Terrace(TerraceParams::new()),
            ModuleType::TranslatePoint => ModuleKind::TranslatePoint {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            ModuleType::Voronoi => Self::voronoi(),
        }
    }

    /// The stable type tag of this kind.
    pub fn module_type(&self) -> ModuleType {
        match self {
            ModuleKind::Perlin(_) => ModuleType::Perlin,
            ModuleKind::Billow(_) => ModuleType::Billow,
            ModuleKind::RidgedMulti(_) => ModuleType::RidgedMulti,
            ModuleKind::Voronoi(_) => ModuleType::Voronoi,
            ModuleKind::Checkerboard => ModuleType::Checkerboard,
            ModuleKind::Constant { .. } => ModuleType::Constant,
            ModuleKind::Abs => ModuleType::Absolute,
            ModuleKind::Invert => ModuleType::Invert,
            ModuleKind::Clamp { .. } => ModuleType::Clamp,
            ModuleKind::Exponent { .. } => ModuleType::Exponent,
            ModuleKind::ScaleBias { .. } => ModuleType::ScaleBias,
            ModuleKind::Curve(_) => ModuleType::Curve,
            ModuleKind::Terrace(_) => ModuleType::Terrace,
            ModuleKind::ScalePoint { .. } => ModuleType::ScalePoint,
            ModuleKind::TranslatePoint { .. } => ModuleType::TranslatePoint,
            ModuleKind::Turbulence(_) => ModuleType::Turbulence,
            ModuleKind::Addition => ModuleType::Addition,
            ModuleKind::Multiply => ModuleType::Multiply,
            ModuleKind::Minimum => ModuleType::Minimum,
            ModuleKind::Maximum => ModuleType::Maximum,
            ModuleKind::Power => ModuleType::Power,
            ModuleKind::Select(_) => ModuleType::Select,
            ModuleKind::Blend => ModuleType::Blend,
        }
    }

    /// The number of source modules this kind reads from.
    pub fn source_count(&self) -> usize {
        match self {
            ModuleKind::Perlin(_)
            | ModuleKind::Billow(_)
            | ModuleKind::RidgedMulti(_)
            | ModuleKind::Voronoi(_)
            | ModuleKind::Checkerboard
            | ModuleKind::Constant { .. } => 0,
            ModuleKind::Abs
            | ModuleKind::Invert
            | ModuleKind::Clamp { .. }
            | ModuleKind::Exponent { .. }
            | ModuleKind::ScaleBias { .. }
            | ModuleKind::Curve(_)
            | ModuleKind::Terrace(_)
            | ModuleKind::ScalePoint { .. }
            | ModuleKind::TranslatePoint { .. }
            | ModuleKind::Turbulence(_) => 1,
            ModuleKind::Addition
            | ModuleKind::Multiply
            | ModuleKind::Minimum
            | ModuleKind::Maximum
            | ModuleKind::Power => 2,
            ModuleKind::Select(_) | ModuleKind::Blend => 3,
        }
    }

    /// Checks the parameter constraints that must hold before this kind can be compiled.
    pub fn check_params(&self) -> Result<(), ParamError> {
        match self {
            ModuleKind::Perlin(params) | ModuleKind::Billow(params) =>
                check_octaves(params.octave_count),
            ModuleKind::RidgedMulti(params) => check_octaves(params.octave_count),
            ModuleKind::Voronoi(params) => check_positive("frequency", params.frequency),
            ModuleKind::Clamp { lower, upper } => check_bounds(*lower, *upper),
            ModuleKind::Curve(curve) =>
                check_point_count(curve.points.len(), CurveParams::MIN_POINTS),
            ModuleKind::Terrace(terrace) =>
                check_point_count(terrace.points.len(), TerraceParams::MIN_POINTS),
            ModuleKind::Turbulence(params) => {
                check_octaves(params.roughness)?;
                check_positive("frequency", params.frequency)?;
                if params.power < 0.0 {
                    return Err(ParamError::OutOfRange {
                        name: "power",
                        value: params.power,
                    });
                }
                Ok(())
            }
            ModuleKind::Select(params) => {
                check_bounds(params.lower, params.upper)?;
                if params.edge_falloff < 0.0 {
                    return Err(ParamError::OutOfRange {
                        name: "edge_falloff",
                        value: params.edge_falloff,
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn check_octaves(count: i32) -> Result<(), ParamError> {
    if (1 ..= MAX_OCTAVES).contains(&count) {
        Ok(())
    } else {
        Err(ParamError::OctaveCount(count))
    }
}

fn check_positive(name: &'static str, value: Real) -> Result<(), ParamError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ParamError::OutOfRange { name, value })
    }
}

fn check_bounds(lower: Real, upper: Real) -> Result<(), ParamError> {
    if lower < upper {
        Ok(())
    } else {
        Err(ParamError::InvertedBounds { lower, upper })
    }
}

fn check_point_count(found: usize, required: usize) -> Result<(), ParamError> {
    if found < required {
        Err(ParamError::TooFewControlPoints { required, found })
    } else {
        Ok(())
    }
}

/// The stable type tag written to pipeline streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum ModuleType {
    Perlin = 0,
    Billow,
    Addition,
    Absolute,
    Blend,
    Checkerboard,
    Clamp,
    Constant,
    Curve,
    Exponent,
    Invert,
    Maximum,
    Minimum,
    Multiply,
    Power,
    RidgedMulti,
    ScaleBias,
    Select,
    ScalePoint,
    Turbulence,
    Terrace,
    TranslatePoint,
    Voronoi,
}

impl ModuleType {
    /// Every module type, in tag order.
    pub const ALL: [ModuleType; 23] = [
        ModuleType::Perlin,
        ModuleType::Billow,
        ModuleType::Addition,
        ModuleType::Absolute,
        ModuleType::Blend,
        ModuleType::Checkerboard,
        ModuleType::Clamp,
        ModuleType::Constant,
        ModuleType::Curve,
        ModuleType::Exponent,
        ModuleType::Invert,
        ModuleType::Maximum,
        ModuleType::Minimum,
        ModuleType::Multiply,
        ModuleType::Power,
        ModuleType::RidgedMulti,
        ModuleType::ScaleBias,
        ModuleType::Select,
        ModuleType::ScalePoint,
        ModuleType::Turbulence,
        ModuleType::Terrace,
        ModuleType::TranslatePoint,
        ModuleType::Voronoi,
    ];

    /// The numeric tag of this type.
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Looks up the type with the given numeric tag.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }
}

impl Display for ModuleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
