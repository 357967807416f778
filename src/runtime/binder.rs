//! Binder boundary
//!
//! Binders are host components that push live scene values into an instance's
//! exposed properties once per frame. They get a property-only view, so they
//! can never touch parameters or the transition graph. The engine does not
//! schedule binders; the host decides whether `update_bindings` runs before
//! or after the tick.

use parking_lot::RwLock;
use std::sync::Arc;

use super::ids::{BinderId, NameHash};
use super::instance::Instance;
use super::registry::{PropertyRegistry, SetOutcome};
use super::value::{PropertyKind, PropertyValue, Transform};

/// Write access to an instance's exposed properties
pub struct BindingContext<'a> {
    properties: &'a mut PropertyRegistry,
}

impl<'a> BindingContext<'a> {
    pub(crate) fn new(properties: &'a mut PropertyRegistry) -> Self {
        Self { properties }
    }

    /// Current property value
    pub fn get(&self, hash: NameHash) -> Option<&PropertyValue> {
        self.properties.get(hash)
    }

    /// Write a property through its hash; the kind must match
    pub fn set(&mut self, hash: NameHash, value: PropertyValue) -> SetOutcome {
        self.properties.set(hash, value)
    }

    /// Write a property by name
    pub fn set_named(&mut self, name: &str, value: PropertyValue) -> SetOutcome {
        self.set(NameHash::of(name), value)
    }
}

/// External component feeding exposed properties
pub trait PropertyBinder: Send {
    /// Whether the binder can run against this instance right now
    fn is_valid(&self, _instance: &Instance) -> bool {
        true
    }

    /// Push the binder's values into the instance's properties
    fn update_binding(&mut self, ctx: &mut BindingContext<'_>);
}

/// Copies a host-shared transform into a Transform property every frame
#[derive(Debug, Clone)]
pub struct TransformBinder {
    property: NameHash,
    source: Arc<RwLock<Transform>>,
}

impl TransformBinder {
    /// Bind `source` to the Transform property `property`
    pub fn new(property: &str, source: Arc<RwLock<Transform>>) -> Self {
        Self {
            property: NameHash::of(property),
            source,
        }
    }
}

impl PropertyBinder for TransformBinder {
    fn is_valid(&self, instance: &Instance) -> bool {
        instance
            .properties()
            .get_kind(PropertyKind::Transform, self.property)
            .is_some()
    }

    fn update_binding(&mut self, ctx: &mut BindingContext<'_>) {
        let transform = *self.source.read();
        ctx.set(self.property, PropertyValue::Transform(transform));
    }
}

/// Adapts a closure into a binder
pub struct FnBinder<F> {
    requires: Option<NameHash>,
    update: F,
}

impl<F> FnBinder<F>
where
    F: FnMut(&mut BindingContext<'_>) + Send,
{
    /// Binder that is always valid
    pub fn new(update: F) -> Self {
        Self { requires: None, update }
    }

    /// Binder that is valid only while the instance has the named property
    pub fn requiring(property: &str, update: F) -> Self {
        Self {
            requires: Some(NameHash::of(property)),
            update,
        }
    }
}

impl<F> PropertyBinder for FnBinder<F>
where
    F: FnMut(&mut BindingContext<'_>) + Send,
{
    fn is_valid(&self, instance: &Instance) -> bool {
        self.requires
            .is_none_or(|hash| instance.properties().get(hash).is_some())
    }

    fn update_binding(&mut self, ctx: &mut BindingContext<'_>) {
        (self.update)(ctx)
    }
}

impl Instance {
    /// Register a binder; returns a handle for removal
    pub fn add_property_binder(&mut self, binder: impl PropertyBinder + 'static) -> BinderId {
        let id = BinderId::new();
        self.binders.push((id, Box::new(binder)));
        id
    }

    /// Unregister a binder; returns whether it was registered
    pub fn remove_property_binder(&mut self, id: BinderId) -> bool {
        let before = self.binders.len();
        self.binders.retain(|(b, _)| *b != id);
        before != self.binders.len()
    }

    /// Number of registered binders
    pub fn binder_count(&self) -> usize {
        self.binders.len()
    }

    /// Run every valid binder once, in registration order
    ///
    /// Returns how many binders ran.
    pub fn update_bindings(&mut self) -> usize {
        let mut binders = std::mem::take(&mut self.binders);
        let mut ran = 0;
        for (id, binder) in binders.iter_mut() {
            if !binder.is_valid(self) {
                tracing::debug!(binder = ?id, "Skipping invalid binder");
                continue;
            }
            binder.update_binding(&mut BindingContext::new(&mut self.properties));
            ran += 1;
        }
        self.binders = binders;
        ran
    }
}
