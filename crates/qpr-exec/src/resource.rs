//! The resource pool shared by every activation of a run.
//!
//! Slots are handed out from a LIFO free list; every reuse bumps the slot's
//! generation, so a [`ResourceRef`] kept across a free is rejected instead of
//! silently naming the next occupant. All operations take the pool lock for
//! their whole duration.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use qpr_ir::{Catalog, ResourceRef, Type, TypeKind};

use crate::config::ResourceLimits;
use crate::error::{ResourceError, ResourceKind, ResourceResult};
use crate::quantum;

/// Contents of a live slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    /// A classical cell.
    Classical(u64),
    /// A quantum resource's state vector.
    Quantum(Vec<Complex64>),
}

impl SlotState {
    fn kind(&self) -> ResourceKind {
        match self {
            SlotState::Classical(_) => ResourceKind::Classical,
            SlotState::Quantum(_) => ResourceKind::Quantum,
        }
    }
}

#[derive(Debug)]
struct Resident {
    ty: String,
    state: SlotState,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    resident: Option<Resident>,
}

#[derive(Debug, Default)]
struct Pool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live_classical: usize,
    live_quantum: usize,
    peak_live: usize,
    allocations: u64,
}

impl Pool {
    fn live(&self) -> usize {
        self.live_classical + self.live_quantum
    }

    fn resident(&self, r: ResourceRef) -> ResourceResult<&Resident> {
        self.slots
            .get(r.slot as usize)
            .filter(|s| s.generation == r.generation)
            .and_then(|s| s.resident.as_ref())
            .ok_or(ResourceError::InvalidReference(r))
    }

    fn resident_mut(&mut self, r: ResourceRef) -> ResourceResult<&mut Resident> {
        self.slots
            .get_mut(r.slot as usize)
            .filter(|s| s.generation == r.generation)
            .and_then(|s| s.resident.as_mut())
            .ok_or(ResourceError::InvalidReference(r))
    }
}

/// Pool usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStats {
    /// Live classical cells.
    pub live_classical: usize,
    /// Live quantum resources.
    pub live_quantum: usize,
    /// Highest number of simultaneously live resources.
    pub peak_live: usize,
    /// Successful allocations since creation.
    pub allocations: u64,
    /// Classical capacity.
    pub max_classical: usize,
    /// Quantum capacity.
    pub max_quantum: usize,
}

/// Capacity-bounded pool of classical cells and quantum resources.
#[derive(Debug)]
pub struct ResourceManager {
    catalog: Arc<Catalog>,
    limits: ResourceLimits,
    pool: Mutex<Pool>,
}

impl ResourceManager {
    /// Create an empty pool.
    pub fn new(catalog: Arc<Catalog>, limits: ResourceLimits) -> Self {
        Self {
            catalog,
            limits,
            pool: Mutex::new(Pool::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pool> {
        // Every operation leaves the pool consistent before it can panic.
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a resource of `ty` in the type's default state.
    pub fn allocate(&self, ty: &str) -> ResourceResult<ResourceRef> {
        let state = self.default_state(self.storage_type(ty)?);
        self.insert(ty, state)
    }

    /// Allocate a resource of `ty` holding `state`.
    pub fn allocate_with(&self, ty: &str, state: SlotState) -> ResourceResult<ResourceRef> {
        let ty_def = self.storage_type(ty)?;
        check_state(ty_def, &state)?;
        self.insert(ty, state)
    }

    /// Release a resource. Every alias of it becomes stale.
    pub fn deallocate(&self, r: ResourceRef) -> ResourceResult<()> {
        let mut pool = self.lock();
        let resident = pool.resident(r)?;
        let kind = resident.state.kind();
        let slot = &mut pool.slots[r.slot as usize];
        slot.resident = None;
        slot.generation = slot.generation.wrapping_add(1);
        match kind {
            ResourceKind::Classical => pool.live_classical -= 1,
            _ => pool.live_quantum -= 1,
        }
        pool.free.push(r.slot);
        trace!("Freed {r}");
        Ok(())
    }

    /// A second handle to the same resource. Consumes no capacity.
    pub fn copy(&self, r: ResourceRef) -> ResourceResult<ResourceRef> {
        self.lock().resident(r)?;
        Ok(r)
    }

    /// Check that a handle names a live resource.
    pub fn contains(&self, r: ResourceRef) -> bool {
        self.lock().resident(r).is_ok()
    }

    /// Read a classical cell.
    pub fn read(&self, r: ResourceRef) -> ResourceResult<u64> {
        match self.lock().resident(r)?.state {
            SlotState::Classical(v) => Ok(v),
            SlotState::Quantum(_) => Err(ResourceError::WrongKind {
                reference: r,
                expected: ResourceKind::Classical,
            }),
        }
    }

    /// Overwrite a classical cell. The value must lie in the cell's type.
    pub fn write(&self, r: ResourceRef, value: u64) -> ResourceResult<()> {
        let mut pool = self.lock();
        let resident = pool.resident_mut(r)?;
        let SlotState::Classical(cell) = &mut resident.state else {
            return Err(ResourceError::WrongKind {
                reference: r,
                expected: ResourceKind::Classical,
            });
        };
        let fits = self
            .catalog
            .ty(&resident.ty)
            .ok()
            .and_then(Type::as_classical)
            .is_some_and(|c| c.contains(value));
        if !fits {
            return Err(ResourceError::InvalidState {
                ty: resident.ty.clone(),
                reason: format!("{value} is outside the type"),
            });
        }
        *cell = value;
        Ok(())
    }

    /// Run `f` on a quantum resource's state vector under the pool lock.
    pub fn with_quantum<R>(
        &self,
        r: ResourceRef,
        f: impl FnOnce(&mut Vec<Complex64>) -> R,
    ) -> ResourceResult<R> {
        let mut pool = self.lock();
        match &mut pool.resident_mut(r)?.state {
            SlotState::Quantum(amps) => Ok(f(amps)),
            SlotState::Classical(_) => Err(ResourceError::WrongKind {
                reference: r,
                expected: ResourceKind::Quantum,
            }),
        }
    }

    /// Copy out a quantum resource's state vector.
    pub fn quantum_state(&self, r: ResourceRef) -> ResourceResult<Vec<Complex64>> {
        self.with_quantum(r, |amps| amps.clone())
    }

    /// Number of live resources.
    pub fn live(&self) -> usize {
        self.lock().live()
    }

    /// Usage counters.
    pub fn stats(&self) -> ResourceStats {
        let pool = self.lock();
        ResourceStats {
            live_classical: pool.live_classical,
            live_quantum: pool.live_quantum,
            peak_live: pool.peak_live,
            allocations: pool.allocations,
            max_classical: self.limits.max_classical,
            max_quantum: self.limits.max_quantum,
        }
    }

    /// Free everything still live. Returns how many resources were released.
    pub fn release_all(&self) -> usize {
        let mut pool = self.lock();
        let mut released = 0;
        let mut freed = Vec::new();
        for (idx, slot) in pool.slots.iter_mut().enumerate() {
            if slot.resident.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                freed.push(idx as u32);
                released += 1;
            }
        }
        pool.free.extend(freed);
        pool.live_classical = 0;
        pool.live_quantum = 0;
        if released > 0 {
            debug!("Released {released} live resources");
        }
        released
    }

    fn storage_type(&self, ty: &str) -> ResourceResult<&Type> {
        let def = self
            .catalog
            .ty(ty)
            .map_err(|_| ResourceError::UnknownType(ty.to_string()))?;
        if def.is_reference() {
            return Err(ResourceError::NotAllocatable(ty.to_string()));
        }
        Ok(def)
    }

    fn default_state(&self, ty: &Type) -> SlotState {
        match &ty.kind {
            TypeKind::Quantum(q) => SlotState::Quantum(q.initial_state()),
            TypeKind::Classical(c) => SlotState::Classical(c.default.unwrap_or(0)),
            TypeKind::Reference { .. } => SlotState::Classical(0),
        }
    }

    fn insert(&self, ty: &str, state: SlotState) -> ResourceResult<ResourceRef> {
        let kind = state.kind();
        let mut pool = self.lock();
        let (live, capacity) = match kind {
            ResourceKind::Classical => (pool.live_classical, self.limits.max_classical),
            _ => (pool.live_quantum, self.limits.max_quantum),
        };
        if live >= capacity {
            return Err(ResourceError::Exhausted { kind, capacity });
        }

        let slot = match pool.free.pop() {
            Some(slot) => slot,
            None => {
                pool.slots.push(Slot::default());
                (pool.slots.len() - 1) as u32
            }
        };
        let entry = &mut pool.slots[slot as usize];
        entry.resident = Some(Resident {
            ty: ty.to_string(),
            state,
        });
        let r = ResourceRef {
            slot,
            generation: entry.generation,
        };

        match kind {
            ResourceKind::Classical => pool.live_classical += 1,
            _ => pool.live_quantum += 1,
        }
        pool.allocations += 1;
        pool.peak_live = pool.peak_live.max(pool.live());
        trace!("Allocated {ty} as {r}");
        Ok(r)
    }
}

fn check_state(ty: &Type, state: &SlotState) -> ResourceResult<()> {
    let invalid = |reason: String| ResourceError::InvalidState {
        ty: ty.name.clone(),
        reason,
    };
    match (&ty.kind, state) {
        (TypeKind::Classical(c), SlotState::Classical(v)) => {
            if c.contains(*v) {
                Ok(())
            } else {
                Err(invalid(format!("{v} is outside the type")))
            }
        }
        (TypeKind::Quantum(q), SlotState::Quantum(amps)) => {
            quantum::validate_state(amps, q.dimension).map_err(|e| invalid(e.0))
        }
        _ => Err(invalid("wrong kind of state".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qpr_ir::{BIT, QUBIT};

    fn manager(max_classical: usize, max_quantum: usize) -> ResourceManager {
        ResourceManager::new(
            Arc::new(Catalog::standard().unwrap()),
            ResourceLimits {
                max_classical,
                max_quantum,
                max_activations: 8,
            },
        )
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        let rm = manager(4, 2);
        let a = rm.allocate(QUBIT).unwrap();
        let _b = rm.allocate(QUBIT).unwrap();
        assert_eq!(
            rm.allocate(QUBIT),
            Err(ResourceError::Exhausted {
                kind: ResourceKind::Quantum,
                capacity: 2
            })
        );

        rm.deallocate(a).unwrap();
        let c = rm.allocate(QUBIT).unwrap();
        assert_eq!(c.slot, a.slot);
        assert_ne!(c.generation, a.generation);
        assert_eq!(rm.stats().peak_live, 2);
        assert_eq!(rm.stats().allocations, 3);
    }

    #[test]
    fn test_kinds_have_separate_capacity() {
        let rm = manager(1, 1);
        rm.allocate(QUBIT).unwrap();
        rm.allocate(BIT).unwrap();
        assert!(rm.allocate(BIT).is_err());
        assert_eq!(rm.live(), 2);
    }

    #[test]
    fn test_double_free_and_stale_alias() {
        let rm = manager(4, 4);
        let r = rm.allocate(BIT).unwrap();
        let alias = rm.copy(r).unwrap();
        assert_eq!(rm.stats().live_classical, 1);

        rm.deallocate(r).unwrap();
        assert_eq!(rm.deallocate(alias), Err(ResourceError::InvalidReference(alias)));
        assert_eq!(rm.copy(r), Err(ResourceError::InvalidReference(r)));
        assert!(!rm.contains(r));
    }

    #[test]
    fn test_cell_read_write() {
        let rm = manager(4, 4);
        let r = rm.allocate(BIT).unwrap();
        assert_eq!(rm.read(r), Ok(0));
        rm.write(r, 1).unwrap();
        assert_eq!(rm.read(r), Ok(1));
        assert!(matches!(rm.write(r, 2), Err(ResourceError::InvalidState { .. })));

        let q = rm.allocate(QUBIT).unwrap();
        assert!(matches!(rm.read(q), Err(ResourceError::WrongKind { .. })));
    }

    #[test]
    fn test_qubit_default_state() {
        let rm = manager(4, 4);
        let q = rm.allocate(QUBIT).unwrap();
        let state = rm.quantum_state(q).unwrap();
        assert_eq!(state, vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)]);
    }

    #[test]
    fn test_allocate_rejects_references_and_unknown_types() {
        let mut catalog = Catalog::standard().unwrap();
        let ref_ty = catalog.register_allocator(BIT).unwrap();
        let rm = ResourceManager::new(Arc::new(catalog), ResourceLimits::default());
        assert_eq!(rm.allocate(&ref_ty), Err(ResourceError::NotAllocatable(ref_ty)));
        assert_eq!(
            rm.allocate("u99"),
            Err(ResourceError::UnknownType("u99".into()))
        );
    }

    #[test]
    fn test_allocate_with_checks_state() {
        let rm = manager(4, 4);
        let bad = SlotState::Quantum(vec![Complex64::new(1.0, 0.0); 2]);
        assert!(matches!(
            rm.allocate_with(QUBIT, bad),
            Err(ResourceError::InvalidState { .. })
        ));
        assert!(rm.allocate_with(BIT, SlotState::Classical(3)).is_err());
        assert!(rm.allocate_with(BIT, SlotState::Classical(1)).is_ok());
    }

    #[test]
    fn test_release_all() {
        let rm = manager(4, 4);
        let a = rm.allocate(BIT).unwrap();
        rm.allocate(QUBIT).unwrap();
        assert_eq!(rm.release_all(), 2);
        assert_eq!(rm.live(), 0);
        assert!(!rm.contains(a));
        assert_eq!(rm.release_all(), 0);
        rm.allocate(QUBIT).unwrap();
    }

    #[test]
    fn test_concurrent_alloc_free() {
        const WORKERS: u64 = 4;
        const ROUNDS: u64 = 500;
        let rm = Arc::new(manager(WORKERS as usize, WORKERS as usize));

        std::thread::scope(|s| {
            for worker in 0..WORKERS {
                let rm = Arc::clone(&rm);
                s.spawn(move || {
                    for _ in 0..ROUNDS {
                        // Each worker holds at most one resource of each kind.
                        let cell = rm.allocate(BIT).unwrap();
                        let q = rm.allocate(QUBIT).unwrap();
                        rm.write(cell, worker % 2).unwrap();
                        assert_eq!(rm.read(cell), Ok(worker % 2));

                        let alias = rm.copy(cell).unwrap();
                        rm.deallocate(cell).unwrap();
                        assert_eq!(
                            rm.deallocate(alias),
                            Err(ResourceError::InvalidReference(alias))
                        );
                        rm.deallocate(q).unwrap();
                        assert!(!rm.contains(q));
                    }
                });
            }
        });

        let stats = rm.stats();
        assert_eq!(rm.live(), 0);
        assert_eq!(stats.allocations, 2 * WORKERS * ROUNDS);
        assert!(stats.peak_live <= 2 * WORKERS as usize);
    }
}
