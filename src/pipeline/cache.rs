use super::ElementId;
use crate::Real;

/// One memoized element value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CacheSlot {
    /// The value computed for the current coordinate
    pub value: Real,
    /// Whether `value` belongs to the current coordinate
    pub calculated: bool,
}

/// Per-coordinate memo table of a pipeline, one slot per element.
///
/// A cache belongs to exactly one evaluation stream at a time. It must be cleaned before every
/// independent coordinate, which marks every slot stale without releasing the storage. Slots are
/// grown on demand, so a cache stays usable when elements are added to its pipeline after it was
/// created.
///
/// Elements that move the point evaluate their sources in a nested frame owned by this cache, so
/// shared elements below a moved point are still computed once per coordinate.
#[derive(Clone, Debug, Default)]
pub struct Cache {
    slots: Vec<CacheSlot>,
    touched: Vec<usize>,
    computations: u64,
    frame: Option<Box<Cache>>,
}

impl Cache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with `len` slots.
    pub fn with_len(len: usize) -> Self {
        Cache {
            slots: vec![CacheSlot::default(); len],
            touched: Vec::with_capacity(len),
            computations: 0,
            frame: None,
        }
    }

    /// The number of slots currently allocated.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slots are allocated.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Marks every slot stale. Only slots written since the last clean are visited.
    pub fn clean(&mut self) {
        for index in self.touched.drain(..) {
            self.slots[index].calculated = false;
        }
    }

    /// The slot of the given element, if it has been allocated.
    pub fn slot(&self, id: ElementId) -> Option<&CacheSlot> {
        self.slots.get(id.index())
    }

    /// Whether the element has been computed since the last clean.
    pub fn is_calculated(&self, id: ElementId) -> bool {
        self.slot(id).map(|slot| slot.calculated).unwrap_or(false)
    }

    /// The number of element values computed into this cache and its nested frames since it was
    /// created.
    pub fn computations(&self) -> u64 {
        self.computations + self.frame.as_ref().map_or(0, |frame| frame.computations())
    }

    #[inline]
    pub(crate) fn get(&self, id: ElementId) -> Option<Real> {
        match self.slots.get(id.index()) {
            Some(slot) if slot.calculated => Some(slot.value),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn store(&mut self, id: ElementId, value: Real) {
        let index = id.index();
        if index >= self.slots.len() {
            self.slots.resize(index + 1, CacheSlot::default());
        }

        let slot = &mut self.slots[index];
        if !slot.calculated {
            self.touched.push(index);
        }
        *slot = CacheSlot {
            value,
            calculated: true,
        };
        self.computations += 1;
    }

    pub(crate) fn reserve_slots(&mut self, len: usize) {
        if len > self.slots.len() {
            self.slots.resize(len, CacheSlot::default());
        }
    }

    /// Takes the nested frame for a moved point, cleaned and sized for `len` elements. It must be
    /// handed back with [`restore_frame`](Cache::restore_frame) once the moved evaluation is done.
    pub(crate) fn take_frame(&mut self, len: usize) -> Cache {
        let mut frame = self.frame.take().map(|frame| *frame).unwrap_or_default();
        frame.clean();
        frame.reserve_slots(len);
        frame
    }

    pub(crate) fn restore_frame(&mut self, frame: Cache) {
        self.frame = Some(Box::new(frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_resets_touched_slots() {
        let mut cache = Cache::with_len(4);
        cache.store(ElementId::new(1), 0.5);
        cache.store(ElementId::new(3), -0.25);

        assert_eq!(cache.get(ElementId::new(1)), Some(0.5));
        assert_eq!(cache.get(ElementId::new(0)), None);
        assert!(cache.is_calculated(ElementId::new(3)));

        cache.clean();
        for index in 0 .. 4 {
            assert!(!cache.is_calculated(ElementId::new(index)));
        }
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn frames_are_reused_and_cleaned() {
        let mut cache = Cache::with_len(2);
        cache.store(ElementId::new(0), 1.0);

        let mut frame = cache.take_frame(2);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(ElementId::new(0)), None);
        frame.store(ElementId::new(1), 2.0);
        cache.restore_frame(frame);
        assert_eq!(cache.computations(), 2);

        let frame = cache.take_frame(3);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_calculated(ElementId::new(1)));
        cache.restore_frame(frame);

        // The main slots are untouched by the frame
        assert_eq!(cache.get(ElementId::new(0)), Some(1.0));
    }

    #[test]
    fn grows_for_new_elements() {
        let mut cache = Cache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get(ElementId::new(7)), None);

        cache.store(ElementId::new(7), 1.0);
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.get(ElementId::new(7)), Some(1.0));
    }
}
