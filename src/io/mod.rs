//! Pipeline streams store a module graph in a compact little-endian binary form:
//!
//! * the format version as one byte, followed by the module count as `u16`
//! * per module its type tag as `u16` and its parameters, reals as `f64`, integers and flags as `i32`,
//!   control point lists prefixed with their length as `i32`
//! * per module, one `u16` stream id for each of its source slots in slot order
//!
//! Stream ids are assigned in the order a depth-first walk from the root first reaches each module,
//! so the root always has id zero and a module shared by several parents is stored once.

mod read;
mod registry;
mod write;

pub use read::read_pipeline;
pub use registry::{ModuleConstructor, ModuleRegistry};
pub use write::write_pipeline;

/// The format version written to and expected from pipeline streams.
pub const STREAM_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        module::{ModuleGraph, ModuleKind, ModuleType},
        GraphError,
        StreamError,
    };
    use std::io::Cursor;

    fn read(bytes: &[u8]) -> Result<(ModuleGraph, crate::ModuleId), StreamError> {
        read_pipeline(&mut Cursor::new(bytes), &ModuleRegistry::with_defaults())
    }

    #[test]
    fn shared_modules_are_written_once() {
        let mut graph = ModuleGraph::new();
        let half = graph.add(ModuleKind::Constant { value: 0.5 });
        let sum = graph.add(ModuleKind::Addition);
        graph.set_source_module(sum, 0, half).unwrap();
        graph.set_source_module(sum, 1, half).unwrap();

        let mut bytes = Vec::new();
        write_pipeline(&graph, sum, &mut bytes).unwrap();

        let mut expected = vec![STREAM_VERSION, 2, 0, 2, 0, 7, 0];
        expected.extend_from_slice(&0.5f64.to_le_bytes());
        expected.extend_from_slice(&[1, 0, 1, 0]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn ids_follow_depth_first_order() {
        let mut graph = ModuleGraph::new();
        let right = graph.add(ModuleKind::Constant { value: 2.0 });
        let inner = graph.add(ModuleKind::Constant { value: 1.0 });
        let left = graph.add(ModuleKind::Abs);
        let root = graph.add(ModuleKind::Multiply);
        graph.set_source_module(left, 0, inner).unwrap();
        graph.set_source_module(root, 0, left).unwrap();
        graph.set_source_module(root, 1, right).unwrap();

        let mut bytes = Vec::new();
        write_pipeline(&graph, root, &mut bytes).unwrap();
        let (read_graph, read_root) = read(&bytes).unwrap();

        let order: Vec<ModuleType> = read_graph
            .ids()
            .map(|id| read_graph.module(id).unwrap().kind().module_type())
            .collect();
        assert_eq!(
            order,
            vec![
                ModuleType::Multiply,
                ModuleType::Absolute,
                ModuleType::Constant,
                ModuleType::Constant
            ]
        );
        assert_eq!(read_root.index(), 0);
        assert_eq!(
            read_graph.module(read_graph.ids().nth(3).unwrap()).unwrap().kind(),
            &ModuleKind::Constant { value: 2.0 }
        );
    }

    #[test]
    fn writing_requires_every_source() {
        let mut graph = ModuleGraph::new();
        let blend = graph.add(ModuleKind::Blend);
        let mut bytes = Vec::new();
        assert!(matches!(
            write_pipeline(&graph, blend, &mut bytes),
            Err(StreamError::Graph(GraphError::MissingSource { slot: 0, .. }))
        ));
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(matches!(
            read(&[STREAM_VERSION + 1, 1, 0, 7, 0]),
            Err(StreamError::WrongVersion { found, .. }) if found == STREAM_VERSION + 1
        ));
    }

    #[test]
    fn rejects_empty_streams() {
        assert!(matches!(read(&[STREAM_VERSION, 0, 0]), Err(StreamError::Empty)));
        assert!(matches!(read(&[]), Err(StreamError::StdIo(_))));
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(matches!(
            read(&[STREAM_VERSION, 1, 0, 99, 0]),
            Err(StreamError::UnknownModuleType(99))
        ));

        let mut registry = ModuleRegistry::new();
        registry.register(ModuleType::Absolute, || ModuleKind::Abs);
        let bytes = [STREAM_VERSION, 1, 0, ModuleType::Checkerboard.id() as u8, 0];
        assert!(matches!(
            read_pipeline(&mut Cursor::new(&bytes[..]), &registry),
            Err(StreamError::UnknownModuleType(5))
        ));
    }

    #[test]
    fn rejects_dangling_and_cyclic_references() {
        let abs = ModuleType::Absolute.id() as u8;

        assert!(matches!(
            read(&[STREAM_VERSION, 1, 0, abs, 0, 3, 0]),
            Err(StreamError::DanglingReference { module: 0, slot: 0, child: 3 })
        ));
        assert!(matches!(
            read(&[STREAM_VERSION, 2, 0, abs, 0, abs, 0, 1, 0, 0, 0]),
            Err(StreamError::Graph(GraphError::Cycle { .. }))
        ));
    }

    #[test]
    fn rejects_duplicate_control_points() {
        let mut bytes = vec![STREAM_VERSION, 1, 0, ModuleType::Curve.id() as u8, 0];
        bytes.extend_from_slice(&2i32.to_le_bytes());
        for value in [0.5f64, 0.0, 0.5, 1.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);

        assert!(matches!(
            read(&bytes),
            Err(StreamError::InvalidParameter(_))
        ));
    }
}
