//! Recursive composition detection.

use std::cell::RefCell;

use crate::error::{ComposeError, ComposeResult};
use crate::registration::PartId;

const MAX_DEPTH: usize = 256;

// Thread-local composition stack for recursion detection.
// Frames are identified by part; the names only build the error path.
thread_local! {
    static COMPOSITION_STACK: RefCell<Vec<(PartId, &'static str)>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one frame of the thread-local composition stack.
///
/// Entering fails instead of pushing when the part is already being composed
/// further up the stack on this thread. Distinct parts exported under the
/// same contract (a keyed wrapper importing the unkeyed export) nest freely.
pub(crate) struct StackGuard {
    part: PartId,
}

impl StackGuard {
    pub(crate) fn enter(part: PartId, name: &'static str) -> ComposeResult<Self> {
        COMPOSITION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.iter().any(|&(id, _)| id == part) {
                let mut path: Vec<&'static str> = stack.iter().map(|&(_, n)| n).collect();
                path.push(name);
                return Err(ComposeError::Circular(path));
            }

            if stack.len() >= MAX_DEPTH {
                return Err(ComposeError::DepthExceeded(stack.len()));
            }

            stack.push((part, name));
            Ok(())
        })?;

        Ok(Self { part })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        COMPOSITION_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(popped.map(|(id, _)| id), Some(self.part));
        });
    }
}

/// Runs `f` with `part` pushed on the composition stack.
pub(crate) fn with_circular_guard<T, F>(part: PartId, name: &'static str, f: F) -> ComposeResult<T>
where
    F: FnOnce() -> ComposeResult<T>,
{
    let _guard = StackGuard::enter(part, name)?;
    f()
}
