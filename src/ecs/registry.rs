//! Entity registry: owns every component store and the entity lifecycle.
//!
//! Storage is arena-and-index: entities are indices into parallel sparse
//! stores, never pointers with independent lifetimes. Destruction is
//! deferred — `destroy_entity` marks the entity, getters and queries stop
//! matching it immediately, and the slots are physically cleared once per
//! tick at the reclaim point. Reclaimed ids pass through a one-snapshot
//! cooling stage before they can be reissued, so an id referenced by an
//! in-flight snapshot never names a new entity.

use std::any::TypeId;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;

use super::entity::{Entity, EntityAllocator};
use super::store::{ComponentStore, ErasedStore};

/// Marker bound for anything storable as a component.
pub trait Component: Send + 'static {}
impl<T: Send + 'static> Component for T {}

#[derive(Default)]
pub struct Registry {
    allocator: EntityAllocator,
    alive: Vec<bool>,
    doomed: Vec<bool>,
    pending: Vec<Entity>,
    cooling: Vec<Entity>,
    stores: HashMap<TypeId, Box<dyn ErasedStore>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new entity, reusing the lowest cooled-off id first.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        let index = entity.index();
        if index >= self.alive.len() {
            self.alive.resize(index + 1, false);
            self.doomed.resize(index + 1, false);
        }
        self.alive[index] = true;
        self.doomed[index] = false;
        entity
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.index_live(entity.index())
    }

    #[inline]
    fn index_live(&self, index: usize) -> bool {
        self.alive.get(index).copied().unwrap_or(false)
            && !self.doomed.get(index).copied().unwrap_or(true)
    }

    fn store_cell<T: Component>(&self) -> Option<&RefCell<ComponentStore<T>>> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.as_any().downcast_ref())
    }

    /// Attaches `value` to `entity`, overwriting any existing component of
    /// that kind (last write wins). No-op for a dead entity.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) {
        if !self.is_alive(entity) {
            return;
        }
        let boxed = self
            .stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(RefCell::new(ComponentStore::<T>::new())));
        let cell = boxed
            .as_any_mut()
            .downcast_mut::<RefCell<ComponentStore<T>>>()
            .expect("component store type mismatch");
        cell.get_mut().insert(entity.index(), value);
    }

    /// Absent if the entity lacks the component or the id is invalid/dead.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<Ref<'_, T>> {
        if !self.is_alive(entity) {
            return None;
        }
        let cell = self.store_cell::<T>()?;
        Ref::filter_map(cell.borrow(), |store| store.get(entity.index())).ok()
    }

    pub fn get_mut<T: Component>(&self, entity: Entity) -> Option<RefMut<'_, T>> {
        if !self.is_alive(entity) {
            return None;
        }
        let cell = self.store_cell::<T>()?;
        RefMut::filter_map(cell.borrow_mut(), |store| store.get_mut(entity.index())).ok()
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.is_alive(entity)
            && self
                .store_cell::<T>()
                .map(|cell| cell.borrow().contains(entity.index()))
                .unwrap_or(false)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let boxed = self.stores.get_mut(&TypeId::of::<T>())?;
        boxed
            .as_any_mut()
            .downcast_mut::<RefCell<ComponentStore<T>>>()?
            .get_mut()
            .remove(entity.index())
    }

    /// Marks the entity for destruction. It stops matching queries and
    /// getters immediately; slots are cleared at the next reclaim point.
    pub fn destroy_entity(&mut self, entity: Entity) {
        if self.is_alive(entity) {
            self.doomed[entity.index()] = true;
            self.pending.push(entity);
        }
    }

    /// Iterates live entities holding `A`, skipping absent slots.
    pub fn for_each<A: Component>(&self, mut f: impl FnMut(Entity, &mut A)) {
        let Some(cell) = self.store_cell::<A>() else {
            return;
        };
        let mut store = cell.borrow_mut();
        for (index, a) in store.iter_mut() {
            if self.index_live(index) {
                f(Entity::from_raw(index as u32), a);
            }
        }
    }

    /// Iterates live entities holding both `A` and `B`. The listed kinds
    /// must be distinct.
    pub fn for_each2<A: Component, B: Component>(&self, mut f: impl FnMut(Entity, &mut A, &mut B)) {
        assert_ne!(
            TypeId::of::<A>(),
            TypeId::of::<B>(),
            "for_each2 requires distinct component kinds"
        );
        let (Some(cell_a), Some(cell_b)) = (self.store_cell::<A>(), self.store_cell::<B>()) else {
            return;
        };
        let mut store_a = cell_a.borrow_mut();
        let mut store_b = cell_b.borrow_mut();
        for (index, a) in store_a.iter_mut() {
            if !self.index_live(index) {
                continue;
            }
            if let Some(b) = store_b.get_mut(index) {
                f(Entity::from_raw(index as u32), a, b);
            }
        }
    }

    /// Iterates live entities holding `A`, `B` and `C` (all distinct).
    pub fn for_each3<A: Component, B: Component, C: Component>(
        &self,
        mut f: impl FnMut(Entity, &mut A, &mut B, &mut C),
    ) {
        assert!(
            TypeId::of::<A>() != TypeId::of::<B>()
                && TypeId::of::<B>() != TypeId::of::<C>()
                && TypeId::of::<A>() != TypeId::of::<C>(),
            "for_each3 requires distinct component kinds"
        );
        let (Some(cell_a), Some(cell_b), Some(cell_c)) = (
            self.store_cell::<A>(),
            self.store_cell::<B>(),
            self.store_cell::<C>(),
        ) else {
            return;
        };
        let mut store_a = cell_a.borrow_mut();
        let mut store_b = cell_b.borrow_mut();
        let mut store_c = cell_c.borrow_mut();
        for (index, a) in store_a.iter_mut() {
            if !self.index_live(index) {
                continue;
            }
            let Some(b) = store_b.get_mut(index) else {
                continue;
            };
            if let Some(c) = store_c.get_mut(index) {
                f(Entity::from_raw(index as u32), a, b, c);
            }
        }
    }

    /// Clears every store's slot for the entities marked dead this tick.
    /// Their ids move to the cooling stage. Returns the number reclaimed.
    pub fn reclaim_dead(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let reclaimed = pending.len();
        for entity in &pending {
            for store in self.stores.values_mut() {
                store.clear_slot(entity.index());
            }
            self.alive[entity.index()] = false;
            self.doomed[entity.index()] = false;
        }
        self.cooling.extend(pending);
        reclaimed
    }

    /// Makes cooled ids reusable. Called after the tick's snapshot has been
    /// built, so an id leaves cooling only once no in-flight snapshot can
    /// still reference the entity it used to name.
    pub fn release_cooled(&mut self) {
        for entity in self.cooling.drain(..) {
            self.allocator.release(entity);
        }
    }

    pub fn alive_count(&self) -> usize {
        self.alive
            .iter()
            .zip(self.doomed.iter())
            .filter(|(alive, doomed)| **alive && !**doomed)
            .count()
    }
}
