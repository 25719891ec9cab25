//! Continuation registry.
//!
//! Lets a component hand a callback to whoever completes a pending
//! interaction later (a dialog result, a navigation reply). Callbacks are
//! identified by the declaring type and the argument type they receive.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::trace;

// Fixed seeds keep keys stable across registries in one process.
static KEY_HASHER: Lazy<RandomState> =
    Lazy::new(|| RandomState::with_seeds(0x243f_6a88, 0x85a3_08d3, 0x1319_8a2e, 0x0370_7344));

/// Identity of a continuation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContinuationKey(u64);

impl ContinuationKey {
    /// Key for callbacks declared by `D` receiving `A`.
    pub fn of<D: ?Sized + 'static, A: ?Sized + 'static>() -> Self {
        ContinuationKey(KEY_HASHER.hash_one((TypeId::of::<D>(), TypeId::of::<A>())))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Concurrent map of pending continuations.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::ContinuationRegistry;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct SaveDialog;
/// struct Confirmed(bool);
///
/// let registry = ContinuationRegistry::new();
/// let saved = Arc::new(AtomicBool::new(false));
/// let flag = saved.clone();
/// registry.register::<SaveDialog, Confirmed, _>(move |answer| flag.store(answer.0, Ordering::SeqCst));
///
/// assert!(registry.continue_with::<SaveDialog, Confirmed>(&Confirmed(true)));
/// assert!(saved.load(Ordering::SeqCst));
/// assert!(!registry.continue_with::<SaveDialog, u32>(&7));
/// ```
#[derive(Default)]
pub struct ContinuationRegistry {
    callbacks: DashMap<ContinuationKey, Callback, RandomState>,
}

impl ContinuationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the callback for `(D, A)`. Returns `true` if it replaced one.
    pub fn register<D, A, F>(&self, callback: F) -> bool
    where
        D: ?Sized + 'static,
        A: 'static,
        F: Fn(&A) + Send + Sync + 'static,
    {
        let erased: Callback = Arc::new(move |args: &dyn Any| {
            if let Some(args) = args.downcast_ref::<A>() {
                callback(args);
            }
        });
        let key = ContinuationKey::of::<D, A>();
        trace!(key = key.value(), declaring = std::any::type_name::<D>(), "registering continuation");
        self.callbacks.insert(key, erased).is_some()
    }

    /// Invokes the callback for `(D, A)`. Returns `false` if none is registered.
    ///
    /// The callback stays registered and runs outside the map's locks, so it
    /// may itself register or remove continuations.
    pub fn continue_with<D, A>(&self, args: &A) -> bool
    where
        D: ?Sized + 'static,
        A: 'static,
    {
        let callback = self
            .callbacks
            .get(&ContinuationKey::of::<D, A>())
            .map(|entry| entry.value().clone());
        match callback {
            Some(callback) => {
                callback(args);
                true
            }
            None => false,
        }
    }

    pub fn remove<D: ?Sized + 'static, A: 'static>(&self) -> bool {
        self.callbacks.remove(&ContinuationKey::of::<D, A>()).is_some()
    }

    pub fn contains<D: ?Sized + 'static, A: 'static>(&self) -> bool {
        self.callbacks.contains_key(&ContinuationKey::of::<D, A>())
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for ContinuationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationRegistry")
            .field("pending", &self.callbacks.len())
            .finish()
    }
}
