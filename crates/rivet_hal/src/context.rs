//! Explicit owner of one handle registry per resource type.
//!
//! Rather than a process-wide static per resource type, the application
//! constructs a single [`HalContext`] at startup and passes it (or the
//! registries it hands out) to whatever needs them. The context preserves the
//! "one registry per resource type, process lifetime" rule and adds a single
//! place to reset everything when a simulation restarts.

use core::any::Any;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::error::HalError;
use crate::handle::HandleType;
use crate::registry::HandleRegistry;

/// Internal storage for a single registry.
struct RegistryEntry {
    /// Type-erased view used for resets and counts.
    registry: Arc<dyn HandleRegistry>,
    /// The same allocation, kept for typed lookups.
    typed: Arc<dyn Any + Send + Sync>,
}

/// Container mapping each [`HandleType`] to the registry that mints it.
///
/// # Thread Safety
///
/// Registration takes a write lock; lookups and resets take a read lock. The
/// registries themselves carry their own locking, so a reset only blocks new
/// registrations, not concurrent handle traffic on other registries.
///
/// # Example
///
/// ```
/// use rivet_hal::context::HalContext;
/// use rivet_hal::handle::HandleType;
/// use rivet_hal::limited::LimitedHandleResource;
///
/// #[derive(Default)]
/// struct Interrupt;
///
/// let hal = HalContext::new();
/// hal.register(LimitedHandleResource::<Interrupt, 8>::new(HandleType::Interrupt))
///     .unwrap();
///
/// let interrupts = hal
///     .registry::<LimitedHandleResource<Interrupt, 8>>(HandleType::Interrupt)
///     .unwrap();
/// let handle = interrupts.allocate();
///
/// hal.reset_all();
/// assert!(interrupts.get(handle).is_none());
/// ```
#[derive(Default)]
pub struct HalContext {
    registries: RwLock<HashMap<HandleType, RegistryEntry>>,
}

impl HalContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `registry` under its [`HandleType`] and returns a shared handle to it.
    ///
    /// # Errors
    ///
    /// [`HalError::DuplicateRegistry`] if a registry for the same type exists.
    pub fn register<R: HandleRegistry>(&self, registry: R) -> Result<Arc<R>, HalError> {
        let kind = registry.kind();
        let mut registries = self.registries.write();
        if registries.contains_key(&kind) {
            return Err(HalError::DuplicateRegistry(kind));
        }

        let registry = Arc::new(registry);
        registries.insert(
            kind,
            RegistryEntry {
                registry: registry.clone(),
                typed: registry.clone(),
            },
        );
        tracing::debug!(%kind, registry = core::any::type_name::<R>(), "registered handle registry");
        Ok(registry)
    }

    /// Returns the registry for `kind` if it exists and has type `R`.
    #[must_use]
    pub fn registry<R: HandleRegistry>(&self, kind: HandleType) -> Option<Arc<R>> {
        let registries = self.registries.read();
        let entry = registries.get(&kind)?;
        entry.typed.clone().downcast::<R>().ok()
    }

    /// Returns `true` if a registry for `kind` exists.
    #[must_use]
    pub fn contains(&self, kind: HandleType) -> bool {
        self.registries.read().contains_key(&kind)
    }

    /// Resets every registry, making every outstanding handle stale.
    ///
    /// Registries stay registered; only their contents are dropped.
    pub fn reset_all(&self) {
        let registries = self.registries.read();
        for entry in registries.values() {
            entry.registry.reset_handles();
        }
        tracing::info!(registries = registries.len(), "reset all handle registries");
    }

    /// Returns the number of occupied slots across every registry.
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.registries
            .read()
            .values()
            .map(|entry| entry.registry.allocated_count())
            .sum()
    }

    /// Returns the number of registries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registries.read().len()
    }

    /// Returns `true` if no registries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registries.read().is_empty()
    }
}

impl core::fmt::Debug for HalContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut kinds: Vec<_> = self.registries.read().keys().copied().collect();
        kinds.sort();
        f.debug_struct("HalContext").field("registries", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexed::IndexedHandleResource;
    use crate::limited::LimitedHandleResource;
    use crate::unlimited::UnlimitedHandleResource;

    #[derive(Default)]
    struct Encoder;

    #[derive(Default)]
    struct DigitalPort;

    #[test]
    fn register_and_lookup() {
        let hal = HalContext::new();
        let registered = hal
            .register(LimitedHandleResource::<Encoder, 4>::new(HandleType::Encoder))
            .unwrap();

        let looked_up = hal
            .registry::<LimitedHandleResource<Encoder, 4>>(HandleType::Encoder)
            .unwrap();
        assert!(Arc::ptr_eq(&registered, &looked_up));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let hal = HalContext::new();
        hal.register(LimitedHandleResource::<Encoder, 4>::new(HandleType::Encoder))
            .unwrap();

        let result = hal.register(LimitedHandleResource::<Encoder, 8>::new(HandleType::Encoder));
        assert!(matches!(
            result,
            Err(HalError::DuplicateRegistry(HandleType::Encoder))
        ));
    }

    #[test]
    fn lookup_with_wrong_type_fails() {
        let hal = HalContext::new();
        hal.register(LimitedHandleResource::<Encoder, 4>::new(HandleType::Encoder))
            .unwrap();

        assert!(
            hal.registry::<LimitedHandleResource<Encoder, 8>>(HandleType::Encoder)
                .is_none()
        );
        assert!(
            hal.registry::<LimitedHandleResource<Encoder, 4>>(HandleType::Counter)
                .is_none()
        );
    }

    #[test]
    fn reset_all_clears_every_registry() {
        let hal = HalContext::new();
        let encoders = hal
            .register(LimitedHandleResource::<Encoder, 4>::new(HandleType::Encoder))
            .unwrap();
        let dio = hal
            .register(IndexedHandleResource::<DigitalPort, 4>::new(HandleType::Dio))
            .unwrap();
        let vendor = hal
            .register(UnlimitedHandleResource::<u32>::new(HandleType::Vendor))
            .unwrap();

        let encoder = encoders.allocate();
        let port = dio.allocate(2).unwrap();
        let callback = vendor.allocate(Arc::new(5));
        assert_eq!(hal.allocated_count(), 3);

        hal.reset_all();

        assert_eq!(hal.allocated_count(), 0);
        assert!(encoders.get(encoder).is_none());
        assert!(dio.get(port).is_none());
        assert!(vendor.get(callback).is_none());
        assert_eq!(hal.len(), 3);
    }

    #[test]
    fn empty_context() {
        let hal = HalContext::new();
        assert!(hal.is_empty());
        assert!(!hal.contains(HandleType::Dio));
        hal.reset_all();
    }
}
