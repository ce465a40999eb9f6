use crate::module::{ModuleKind, ModuleType};
use std::collections::HashMap;

/// Creates a module with default parameters.
pub type ModuleConstructor = fn() -> ModuleKind;

/// The table of module types a stream reader knows how to create.
///
/// A reader creates every module of a stream with the constructor registered for its type tag and
/// then reads the parameters into it. A constructor must return a kind of the type it is registered
/// for, since the kind decides which parameters are read.
#[derive(Clone, Debug, Default)]
pub struct ModuleRegistry {
    constructors: HashMap<ModuleType, ModuleConstructor>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that knows every built-in module type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ModuleType::Perlin, ModuleKind::perlin);
        registry.register(ModuleType::Billow, ModuleKind::billow);
        registry.register(ModuleType::Addition, || ModuleKind::Addition);
        registry.register(ModuleType::Absolute, || ModuleKind::Abs);
        registry.register(ModuleType::Blend, || ModuleKind::Blend);
        registry.register(ModuleType::Checkerboard, || ModuleKind::Checkerboard);
        registry.register(ModuleType::Clamp, || {
            ModuleKind::default_for(ModuleType::Clamp)
        });
        registry.register(ModuleType::Constant, || {
            ModuleKind::default_for(ModuleType::Constant)
        });
        registry.register(ModuleType::Curve, || ModuleKind::default_for(ModuleType::Curve));
        registry.register(ModuleType::Exponent, || {
            ModuleKind::default_for(ModuleType::Exponent)
        });
        registry.register(ModuleType::Invert, || ModuleKind::Invert);
        registry.register(ModuleType::Maximum, || ModuleKind::Maximum);
        registry.register(ModuleType::Minimum, || ModuleKind::Minimum);
        registry.register(ModuleType::Multiply, || ModuleKind::Multiply);
        registry.register(ModuleType::Power, || ModuleKind::Power);
        registry.register(ModuleType::RidgedMulti, ModuleKind::ridged_multi);
        registry.register(ModuleType::ScaleBias, || {
            ModuleKind::default_for(ModuleType::ScaleBias)
        });
        registry.register(ModuleType::Select, ModuleKind::select);
        registry.register(ModuleType::ScalePoint, || {
            ModuleKind::default_for(ModuleType::ScalePoint)
        });
        registry.register(ModuleType::Turbulence, ModuleKind::turbulence);
        registry.register(ModuleType::Terrace, || {
            ModuleKind::default_for(ModuleType::Terrace)
        });
        registry.register(ModuleType::TranslatePoint, || {
            ModuleKind::default_for(ModuleType::TranslatePoint)
        });
        registry.register(ModuleType::Voronoi, ModuleKind::voronoi);
        registry
    }

    /// Registers the constructor of a module type, returning the constructor it replaces.
    pub fn register(
        &mut self,
        module_type: ModuleType,
        constructor: ModuleConstructor,
    ) -> Option<ModuleConstructor> {
        self.constructors.insert(module_type, constructor)
    }

    /// Whether a constructor is registered for the type.
    pub fn contains(&self, module_type: ModuleType) -> bool {
        self.constructors.contains_key(&module_type)
    }

    /// Creates a module of the given type, if the type is registered.
    pub fn create(&self, module_type: ModuleType) -> Option<ModuleKind> {
        self.constructors
            .get(&module_type)
            .map(|constructor| constructor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_type() {
        let registry = ModuleRegistry::with_defaults();
        for module_type in ModuleType::ALL {
            let kind = registry.create(module_type).unwrap();
            assert_eq!(kind.module_type(), module_type);
            assert_eq!(kind, ModuleKind::default_for(module_type));
        }
    }

    #[test]
    fn register_replaces_constructors() {
        let mut registry = ModuleRegistry::new();
        assert!(!registry.contains(ModuleType::Constant));
        assert!(registry.create(ModuleType::Constant).is_none());

        registry.register(ModuleType::Constant, || ModuleKind::Constant { value: 1.0 });
        let previous = registry.register(ModuleType::Constant, || ModuleKind::Constant {
            value: 2.0,
        });
        assert!(previous.is_some());
        assert_eq!(
            registry.create(ModuleType::Constant),
            Some(ModuleKind::Constant { value: 2.0 })
        );
    }
}
