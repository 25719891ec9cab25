//! Process-wide ambient service provider.
//!
//! The first root host to run installs itself here. Later hosts never
//! replace it. The slot holds a weak reference, so an installed host that
//! has been dropped simply stops being current.

use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use super::{Host, HostInner};

static AMBIENT: OnceCell<Weak<HostInner>> = OnceCell::new();

/// The installed host, if it is still alive.
pub fn current() -> Option<Host> {
    AMBIENT.get()?.upgrade().map(Host::from_inner)
}

/// Installs `host` unless a host was installed before. Returns whether
/// `host` is now the ambient provider.
pub fn try_install(host: &Host) -> bool {
    let installed = AMBIENT.get_or_init(|| Arc::downgrade(&host.inner));
    Weak::ptr_eq(installed, &Arc::downgrade(&host.inner))
}

pub fn is_installed() -> bool {
    AMBIENT.get().is_some()
}
