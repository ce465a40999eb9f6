mod kind;

pub use kind::*;

use crate::GraphError;
use log::debug;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_GRAPH_TOKEN: AtomicU64 = AtomicU64::new(0);

/// A handle to a module inside a [`ModuleGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

impl ModuleId {
    /// Wraps a raw module index.
    pub const fn new(index: usize) -> Self {
        ModuleId(index)
    }

    /// The index of the module in its graph.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for ModuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one module across every graph of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleKey {
    graph: u64,
    module: ModuleId,
}

/// A module and the modules it reads from.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    kind: ModuleKind,
    sources: Vec<Option<ModuleId>>,
}

impl Module {
    fn new(kind: ModuleKind) -> Self {
        let sources = vec![None; kind.source_count()];
        Module { kind, sources }
    }

    /// The kind and parameters of this module.
    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    /// Mutable access to the kind and parameters of this module.
    ///
    /// When the returned guard is dropped the source slots are resized to the source count of the
    /// kind. Slots kept by the new kind keep their sources, new slots start empty.
    pub fn kind_mut(&mut self) -> KindMut<'_> {
        KindMut { module: self }
    }

    /// The source module in `slot`, if one is set.
    pub fn source(&self, slot: usize) -> Option<ModuleId> {
        self.sources.get(slot).copied().flatten()
    }

    /// All source slots in order.
    pub fn sources(&self) -> &[Option<ModuleId>] {
        &self.sources
    }
}

/// A mutable borrow of a module's kind, returned by [`Module::kind_mut`].
pub struct KindMut<'a> {
    module: &'a mut Module,
}

impl Deref for KindMut<'_> {
    type Target = ModuleKind;

    fn deref(&self) -> &ModuleKind {
        &self.module.kind
    }
}

impl DerefMut for KindMut<'_> {
    fn deref_mut(&mut self) -> &mut ModuleKind {
        &mut self.module.kind
    }
}

impl Drop for KindMut<'_> {
    fn drop(&mut self) {
        let source_count = self.module.kind.source_count();
        self.module.sources.resize(source_count, None);
    }
}

/// An arena of modules wired into a directed acyclic graph.
///
/// Modules never own their sources, so one module may feed any number of parents. The graph rejects
/// every edit that would introduce a cycle.
#[derive(Debug)]
pub struct ModuleGraph {
    token: u64,
    modules: Vec<Module>,
}

impl ModuleGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        ModuleGraph {
            token: NEXT_GRAPH_TOKEN.fetch_add(1, Ordering::Relaxed),
            modules: Vec::new(),
        }
    }

    /// Adds a module without sources and returns its id.
    pub fn add(&mut self, kind: ModuleKind) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(Module::new(kind));
        id
    }

    /// The number of modules in this graph.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether this graph has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Returns the module with the given id.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    /// Returns the module with the given id for editing its parameters.
    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.0)
    }

    /// Iterates over every module id of this graph.
    pub fn ids(&self) -> impl Iterator<Item = ModuleId> {
        (0 .. self.modules.len()).map(ModuleId)
    }

    /// The process-wide identity of the given module.
    pub fn key(&self, id: ModuleId) -> ModuleKey {
        ModuleKey {
            graph: self.token,
            module: id,
        }
    }

    /// Sets the source module of `id` in `slot`.
    ///
    /// Fails without modifying the graph if either module is unknown, the slot does not exist for
    /// the module's kind, or the assignment would make the module its own transitive source.
    pub fn set_source_module(
        &mut self,
        id: ModuleId,
        slot: usize,
        source: ModuleId,
    ) -> Result<(), GraphError> {
        if self.module(source).is_none() {
            return Err(GraphError::UnknownModule(source));
        }

        let source_count = self
            .module(id)
            .ok_or(GraphError::UnknownModule(id))?
            .sources
            .len();
        if slot >= source_count {
            return Err(GraphError::InvalidSlot {
                module: id,
                slot,
                source_count,
            });
        }

        if id == source {
            return Err(GraphError::SelfReference(id));
        }

        if self.walk_tree(source, id) {
            return Err(GraphError::Cycle { module: id, source });
        }

        self.modules[id.0].sources[slot] = Some(source);
        Ok(())
    }

    /// Sets the control module of a select or blend module.
    pub fn set_control_module(&mut self, id: ModuleId, control: ModuleId) -> Result<(), GraphError> {
        self.set_source_module(id, 2, control)
    }

    /// Clears the source module of `id` in `slot`.
    pub fn clear_source_module(&mut self, id: ModuleId, slot: usize) -> Result<(), GraphError> {
        let module = self
            .modules
            .get_mut(id.0)
            .ok_or(GraphError::UnknownModule(id))?;
        let source_count = module.sources.len();
        match module.sources.get_mut(slot) {
            Some(source) => {
                *source = None;
                Ok(())
            }
            None => Err(GraphError::InvalidSlot {
                module: id,
                slot,
                source_count,
            }),
        }
    }

    /// Returns whether `target` is reachable through the sources of `from`.
    pub fn walk_tree(&self, from: ModuleId, target: ModuleId) -> bool {
        let mut visited = vec![false; self.modules.len()];
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            let module = match self.module(id) {
                Some(module) => module,
                None => continue,
            };

            for source in module.sources.iter().flatten() {
                if *source == target {
                    return true;
                }

                if !visited[source.0] {
                    visited[source.0] = true;
                    stack.push(*source);
                }
            }
        }

        false
    }

    /// Checks that every module reachable from `root` has all of its sources set and valid
    /// parameters.
    pub fn validate(&self, root: ModuleId) -> Result<(), GraphError> {
        if self.module(root).is_none() {
            return Err(GraphError::UnknownModule(root));
        }

        let mut visited = vec![false; self.modules.len()];
        let mut stack = vec![root];
        visited[root.0] = true;

        while let Some(id) = stack.pop() {
            let module = &self.modules[id.0];
            module
                .kind
                .check_params()
                .map_err(|error| GraphError::Param { module: id, error })?;

            for slot in 0 .. module.kind.source_count() {
                let source = module
                    .source(slot)
                    .ok_or(GraphError::MissingSource { module: id, slot })?;
                if !visited[source.0] {
                    visited[source.0] = true;
                    stack.push(source);
                }
            }
        }

        debug!("Validated module graph from root {}", root);
        Ok(())
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changing_the_kind_resizes_source_slots() {
        let (mut graph, a, b, c) = chain();

        *graph.module_mut(a).unwrap().kind_mut() = ModuleKind::select();
        assert_eq!(graph.module(a).unwrap().sources(), &[Some(b), None, None]);
        graph.set_source_module(a, 1, c).unwrap();
        graph.set_control_module(a, c).unwrap();

        *graph.module_mut(a).unwrap().kind_mut() = ModuleKind::Constant { value: 1.0 };
        assert!(graph.module(a).unwrap().sources().is_empty());
        assert!(matches!(
            graph.set_source_module(a, 0, b),
            Err(GraphError::InvalidSlot { source_count: 0, .. })
        ));
    }

    #[test]
    fn parameter_edits_keep_sources() {
        let (mut graph, a, b, _) = chain();
        let clamp = graph.add(ModuleKind::Clamp {
            lower: -1.0,
            upper: 1.0,
        });
        graph.set_source_module(clamp, 0, a).unwrap();

        if let ModuleKind::Clamp { upper, .. } = &mut *graph.module_mut(clamp).unwrap().kind_mut() {
            *upper = 0.5;
        }
        let module = graph.module(clamp).unwrap();
        assert_eq!(module.kind(), &ModuleKind::Clamp {
            lower: -1.0,
            upper: 0.5,
        });
        assert_eq!(module.source(0), Some(a));
        assert_eq!(graph.module(a).unwrap().source(0), Some(b));
    }

    fn chain() -> (ModuleGraph, ModuleId, ModuleId, ModuleId) {
        let mut graph = ModuleGraph::new();
        let a = graph.add(ModuleKind::Abs);
        let b = graph.add(ModuleKind::Invert);
        let c = graph.add(ModuleKind::perlin());
        graph.set_source_module(a, 0, b).unwrap();
        graph.set_source_module(b, 0, c).unwrap();
        (graph, a, b, c)
    }

    #[test]
    fn rejects_cycles_and_keeps_graph() {
        let (mut graph, a, b, _) = chain();
        let before: Vec<Module> = graph.ids().map(|id| graph.module(id).unwrap().clone()).collect();

        assert_eq!(
            graph.set_source_module(b, 0, a),
            Err(GraphError::Cycle {
                module: b,
                source: a
            })
        );
        assert_eq!(
            graph.set_source_module(a, 0, a),
            Err(GraphError::SelfReference(a))
        );

        let after: Vec<Module> = graph.ids().map(|id| graph.module(id).unwrap().clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn rejects_bad_slots_and_ids() {
        let (mut graph, a, _, c) = chain();
        assert!(matches!(
            graph.set_source_module(a, 1, c),
            Err(GraphError::InvalidSlot { slot: 1, .. })
        ));
        assert_eq!(
            graph.set_source_module(a, 0, ModuleId::new(99)),
            Err(GraphError::UnknownModule(ModuleId::new(99)))
        );
        assert!(graph.set_source_module(c, 0, a).is_err());
    }

    #[test]
    fn walk_tree_follows_sources() {
        let (graph, a, b, c) = chain();
        assert!(graph.walk_tree(a, c));
        assert!(graph.walk_tree(a, b));
        assert!(!graph.walk_tree(c, a));
    }

    #[test]
    fn validate_reports_missing_sources() {
        let mut graph = ModuleGraph::new();
        let select = graph.add(ModuleKind::select());
        let a = graph.add(ModuleKind::Constant { value: -1.0 });
        let b = graph.add(ModuleKind::Constant { value: 1.0 });
        graph.set_source_module(select, 0, a).unwrap();
        graph.set_source_module(select, 1, b).unwrap();

        assert_eq!(
            graph.validate(select),
            Err(GraphError::MissingSource {
                module: select,
                slot: 2
            })
        );

        graph.set_control_module(select, a).unwrap();
        assert_eq!(graph.validate(select), Ok(()));

        graph.clear_source_module(select, 0).unwrap();
        assert!(graph.validate(select).is_err());
    }

    #[test]
    fn graphs_have_distinct_keys() {
        let first = ModuleGraph::new();
        let second = ModuleGraph::new();
        assert_ne!(first.key(ModuleId::new(0)), second.key(ModuleId::new(0)));
        assert_eq!(first.key(ModuleId::new(0)), first.key(ModuleId::new(0)));
    }
}
