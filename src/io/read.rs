use super::{ModuleRegistry, STREAM_VERSION};
use crate::{
    generator::Quality,
    module::{ModuleGraph, ModuleId, ModuleKind, ModuleType},
    ParamError,
    Real,
    StreamError,
};
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::Read;

/// Reads a pipeline stream into a new graph, returning the graph and its root module.
///
/// Modules are created through `registry`, so a stream can only contain registered types. The
/// stream must be complete: reading fails on the first invalid byte and never returns a partially
/// wired graph.
pub fn read_pipeline<R>(
    reader: &mut R,
    registry: &ModuleRegistry,
) -> Result<(ModuleGraph, ModuleId), StreamError>
where
    R: Read
{
    let version = reader.read_u8()?;
    if version != STREAM_VERSION {
        return Err(StreamError::WrongVersion {
            expected: STREAM_VERSION,
            found: version,
        });
    }

    let count = reader.read_u16::<LittleEndian>()?;
    if count == 0 {
        return Err(StreamError::Empty);
    }

    let mut graph = ModuleGraph::new();
    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0 .. count {
        let tag = reader.read_u16::<LittleEndian>()?;
        let mut kind = ModuleType::from_id(tag)
            .and_then(|module_type| registry.create(module_type))
            .ok_or(StreamError::UnknownModuleType(tag))?;
        kind.read_params(reader)?;
        ids.push(graph.add(kind));
    }

    for (module, id) in ids.iter().enumerate() {
        let source_count = graph
            .module(*id)
            .map(|module| module.kind().source_count())
            .unwrap_or(0);

        for slot in 0 .. source_count {
            let child = reader.read_u16::<LittleEndian>()?;
            let source = *ids.get(child as usize).ok_or(StreamError::DanglingReference {
                module: module as u16,
                slot,
                child,
            })?;
            graph.set_source_module(*id, slot, source)?;
        }
    }

    debug!("Read pipeline stream with {} modules", count);
    Ok((graph, ids[0]))
}

impl ModuleKind {
    /// Replaces the parameters of this kind with ones read from `reader`.
    ///
    /// This is the inverse of [`write_params`](ModuleKind::write_params). The kind itself is not
    /// read; it determines which parameters follow.
    pub fn read_params<R>(&mut self, reader: &mut R) -> Result<(), StreamError>
    where
        R: Read
    {
        match self {
            ModuleKind::Perlin(params) | ModuleKind::Billow(params) => {
                params.frequency = read_real(reader)?;
                params.octave_count = reader.read_i32::<LittleEndian>()?;
                params.seed = reader.read_i32::<LittleEndian>()?;
                params.quality = read_quality(reader)?;
                params.lacunarity = read_real(reader)?;
                params.persistence = read_real(reader)?;
                params.scale = read_real(reader)?;
            }
            ModuleKind::RidgedMulti(params) => {
                params.frequency = read_real(reader)?;
                params.octave_count = reader.read_i32::<LittleEndian>()?;
                params.seed = reader.read_i32::<LittleEndian>()?;
                params.quality = read_quality(reader)?;
                params.lacunarity = read_real(reader)?;
                params.exponent = read_real(reader)?;
                params.offset = read_real(reader)?;
                params.gain = read_real(reader)?;
                params.scale = read_real(reader)?;
            }
            ModuleKind::Voronoi(params) => {
                params.frequency = read_real(reader)?;
                params.seed = reader.read_i32::<LittleEndian>()?;
                params.displacement = read_real(reader)?;
                params.enable_distance = read_bool(reader)?;
            }
            ModuleKind::Constant { value } => *value = read_real(reader)?,
            ModuleKind::Clamp { lower, upper } => {
                *lower = read_real(reader)?;
                *upper = read_real(reader)?;
            }
            ModuleKind::Exponent { exponent } => *exponent = read_real(reader)?,
            ModuleKind::ScaleBias { scale, bias } => {
                *scale = read_real(reader)?;
                *bias = read_real(reader)?;
            }
            ModuleKind::Curve(curve) => {
                let len = read_len(reader)?;
                curve.clear();
                for _ in 0 .. len {
                    let input = read_real(reader)?;
                    let output = read_real(reader)?;
                    curve.add_control_point(input, output)?;
                }
            }
            ModuleKind::Terrace(terrace) => {
                terrace.invert = read_bool(reader)?;
                let len = read_len(reader)?;
                terrace.clear();
                for _ in 0 .. len {
                    terrace.add_control_point(read_real(reader)?)?;
                }
            }
            ModuleKind::ScalePoint { x, y, z } | ModuleKind::TranslatePoint { x, y, z } => {
                *x = read_real(reader)?;
                *y = read_real(reader)?;
                *z = read_real(reader)?;
            }
            ModuleKind::Turbulence(params) => {
                params.power = read_real(reader)?;
                params.roughness = reader.read_i32::<LittleEndian>()?;
                params.seed = reader.read_i32::<LittleEndian>()?;
                params.frequency = read_real(reader)?;
            }
            ModuleKind::Select(params) => {
                params.lower = read_real(reader)?;
                params.upper = read_real(reader)?;
                params.edge_falloff = read_real(reader)?;
            }
            ModuleKind::Checkerboard
            | ModuleKind::Abs
            | ModuleKind::Invert
            | ModuleKind::Addition
            | ModuleKind::Multiply
            | ModuleKind::Minimum
            | ModuleKind::Maximum
            | ModuleKind::Power
            | ModuleKind::Blend => {}
        }

        Ok(())
    }
}

#[inline]
fn read_real<R: Read>(reader: &mut R) -> Result<Real, StreamError> {
    Ok(reader.read_f64::<LittleEndian>()? as Real)
}

#[inline]
fn read_bool<R: Read>(reader: &mut R) -> Result<bool, StreamError> {
    Ok(reader.read_i32::<LittleEndian>()? != 0)
}

fn read_quality<R: Read>(reader: &mut R) -> Result<Quality, StreamError> {
    let quality = reader.read_i32::<LittleEndian>()?;
    Ok(Quality::try_from(quality).map_err(ParamError::from)?)
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize, StreamError> {
    let len = reader.read_i32::<LittleEndian>()?;
    usize::try_from(len).map_err(|_| {
        StreamError::InvalidParameter(ParamError::OutOfRange {
            name: "control point count",
            value: len as Real,
        })
    })
}
