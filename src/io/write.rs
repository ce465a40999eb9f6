use super::STREAM_VERSION;
use crate::{
    module::{ModuleGraph, ModuleId, ModuleKind},
    GraphError,
    ParamError,
    Real,
    StreamError,
};
use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use std::{collections::HashMap, io::Write};

/// Writes the module `root` and everything it reads from to a pipeline stream.
///
/// Every reachable module must have all of its sources set.
pub fn write_pipeline<W>(graph: &ModuleGraph, root: ModuleId, writer: &mut W) -> Result<(), StreamError>
where
    W: Write
{
    let order = stream_order(graph, root)?;
    if order.len() > u16::MAX as usize {
        return Err(StreamError::TooManyModules(order.len()));
    }

    let stream_ids: HashMap<ModuleId, u16> = order
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as u16))
        .collect();

    writer.write_u8(STREAM_VERSION)?;
    writer.write_u16::<LittleEndian>(order.len() as u16)?;

    for id in &order {
        let kind = graph
            .module(*id)
            .ok_or(GraphError::UnknownModule(*id))?
            .kind();
        writer.write_u16::<LittleEndian>(kind.module_type().id())?;
        kind.write_params(writer)?;
    }

    for id in &order {
        let module = graph.module(*id).ok_or(GraphError::UnknownModule(*id))?;
        for source in module.sources().iter().take(module.kind().source_count()) {
            // Sources were checked while ordering the modules
            let stream_id = source.and_then(|source| stream_ids.get(&source));
            writer.write_u16::<LittleEndian>(stream_id.copied().unwrap_or_default())?;
        }
    }

    debug!("Wrote pipeline stream with {} modules", order.len());
    Ok(())
}

// Depth-first pre-order from the root, each module listed once
fn stream_order(graph: &ModuleGraph, root: ModuleId) -> Result<Vec<ModuleId>, GraphError> {
    let mut order = Vec::new();
    let mut seen = vec![false; graph.len()];
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        let module = graph.module(id).ok_or(GraphError::UnknownModule(id))?;
        if seen[id.index()] {
            continue;
        }
        seen[id.index()] = true;
        order.push(id);

        let source_count = module.kind().source_count();
        let mut sources = Vec::with_capacity(source_count);
        for slot in 0 .. source_count {
            sources.push(
                module
                    .source(slot)
                    .ok_or(GraphError::MissingSource { module: id, slot })?,
            );
        }
        stack.extend(sources.into_iter().rev());
    }

    Ok(order)
}

impl ModuleKind {
    /// Writes the parameters of this kind, without its type tag or sources.
    pub fn write_params<W>(&self, writer: &mut W) -> Result<(), StreamError>
    where
        W: Write
    {
        match self {
            ModuleKind::Perlin(params) | ModuleKind::Billow(params) => {
                write_real(writer, params.frequency)?;
                writer.write_i32::<LittleEndian>(params.octave_count)?;
                writer.write_i32::<LittleEndian>(params.seed)?;
                writer.write_i32::<LittleEndian>(params.quality as i32)?;
                write_real(writer, params.lacunarity)?;
                write_real(writer, params.persistence)?;
                write_real(writer, params.scale)?;
            }
            ModuleKind::RidgedMulti(params) => {
                write_real(writer, params.frequency)?;
                writer.write_i32::<LittleEndian>(params.octave_count)?;
                writer.write_i32::<LittleEndian>(params.seed)?;
                writer.write_i32::<LittleEndian>(params.quality as i32)?;
                write_real(writer, params.lacunarity)?;
                write_real(writer, params.exponent)?;
                write_real(writer, params.offset)?;
                write_real(writer, params.gain)?;
                write_real(writer, params.scale)?;
            }
            ModuleKind::Voronoi(params) => {
                write_real(writer, params.frequency)?;
                writer.write_i32::<LittleEndian>(params.seed)?;
                write_real(writer, params.displacement)?;
                write_bool(writer, params.enable_distance)?;
            }
            ModuleKind::Constant { value } => write_real(writer, *value)?,
            ModuleKind::Clamp { lower, upper } => {
                write_real(writer, *lower)?;
                write_real(writer, *upper)?;
            }
            ModuleKind::Exponent { exponent } => write_real(writer, *exponent)?,
            ModuleKind::ScaleBias { scale, bias } => {
                write_real(writer, *scale)?;
                write_real(writer, *bias)?;
            }
            ModuleKind::Curve(curve) => {
                write_len(writer, curve.control_points().len())?;
                for point in curve.control_points() {
                    write_real(writer, point.input)?;
                    write_real(writer, point.output)?;
                }
            }
            ModuleKind::Terrace(terrace) => {
                write_bool(writer, terrace.invert)?;
                write_len(writer, terrace.control_points().len())?;
                for point in terrace.control_points() {
                    write_real(writer, *point)?;
                }
            }
            ModuleKind::ScalePoint { x, y, z } | ModuleKind::TranslatePoint { x, y, z } => {
                write_real(writer, *x)?;
                write_real(writer, *y)?;
                write_real(writer, *z)?;
            }
            ModuleKind::Turbulence(params) => {
                write_real(writer, params.power)?;
                writer.write_i32::<LittleEndian>(params.roughness)?;
                writer.write_i32::<LittleEndian>(params.seed)?;
                write_real(writer, params.frequency)?;
            }
            ModuleKind::Select(params) => {
                write_real(writer, params.lower)?;
                write_real(writer, params.upper)?;
                write_real(writer, params.edge_falloff)?;
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
fn write_real<W: Write>(writer: &mut W, value: Real) -> Result<(), StreamError> {
    writer.write_f64::<LittleEndian>(value.into())?;
    Ok(())
}

#[inline]
fn write_bool<W: Write>(writer: &mut W, value: bool) -> Result<(), StreamError> {
    writer.write_i32::<LittleEndian>(value as i32)?;
    Ok(())
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<(), StreamError> {
    let len = i32::try_from(len).map_err(|_| ParamError::OutOfRange {
        name: "control point count",
        value: len as Real,
    })?;
    writer.write_i32::<LittleEndian>(len)?;
    Ok(())
}
