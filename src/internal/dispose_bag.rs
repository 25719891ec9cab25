//! Internal disposal bag for managing cleanup hooks.

type Hook = Box<dyn FnOnce() + Send>;

/// Container for disposal hooks with LIFO execution order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<Hook>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, f: Hook) {
        self.hooks.push(f);
    }

    /// Removes every hook, last registered first.
    pub(crate) fn drain_reverse(&mut self) -> Vec<Hook> {
        let mut hooks = std::mem::take(&mut self.hooks);
        hooks.reverse();
        hooks
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}

/// Runs hooks outside of any lock the caller held while draining.
pub(crate) fn run_hooks(hooks: Vec<Hook>) {
    for hook in hooks {
        hook();
    }
}
