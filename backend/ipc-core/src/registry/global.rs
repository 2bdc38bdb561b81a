//! Process-wide binding storage.
//!
//! Each contract-bearing type declares its bindings once, the first time they
//! are asked for. The result is cached per `TypeId` and read-only afterwards;
//! there is no teardown.

use crate::error::ContractError;
use crate::registry::ClassBindings;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};
use once_cell::sync::Lazy;

type Registry = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// A type that exposes members over a channel.
///
/// `declare_bindings` is the explicit registration step: it runs at most once
/// per type per process (see [`bindings_for`]). A derived type typically
/// starts from its base:
///
/// ```ignore
/// fn declare_bindings() -> Result<ClassBindings<Self>, ContractError> {
///     let base = bindings_for::<Base>()?;
///     ClassBindings::extending("Derived", &base, derived_base)
///         .with(Declaration::sync_method("ch", "extra", |d: &Derived, _| Ok(d.extra())))
/// }
/// ```
pub trait Contracted: Send + Sync + Sized + 'static {
    fn declare_bindings() -> Result<ClassBindings<Self>, ContractError>;
}

/// Bindings of `T`, declaring them on first use.
///
/// # Errors
///
/// Returns whatever [`Contracted::declare_bindings`] fails with. A failed
/// declaration is not cached; it is a defect and will fail the same way again.
pub fn bindings_for<T: Contracted>() -> Result<Arc<ClassBindings<T>>, ContractError> {
    if let Some(bindings) = lookup::<T>() {
        return Ok(bindings);
    }

    // Declared without holding the lock: a derived type's declaration asks
    // for its base's bindings.
    let declared = Arc::new(T::declare_bindings()?);

    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    let stored = registry
        .entry(TypeId::of::<T>())
        .or_insert_with(|| {
            info!("Registered bindings for {}", declared.class_name());
            Arc::clone(&declared) as Arc<dyn Any + Send + Sync>
        })
        .clone();
    drop(registry);

    match stored.downcast::<ClassBindings<T>>() {
        Ok(bindings) => Ok(bindings),
        Err(_) => Ok(declared),
    }
}

pub fn is_registered<T: 'static>() -> bool {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&TypeId::of::<T>())
}

fn lookup<T: Contracted>() -> Option<Arc<ClassBindings<T>>> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    let stored = registry.get(&TypeId::of::<T>())?.clone();
    drop(registry);

    let bindings = stored.downcast::<ClassBindings<T>>().ok();
    if bindings.is_some() {
        debug!("Bindings for {} served from registry", std::any::type_name::<T>());
    }
    bindings
}
