//! Startup activities and their dependency ordering.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::Host;
use crate::error::{ComposeError, ComposeResult};

/// Identity of an activity type.
#[derive(Clone, Copy)]
pub struct ActivityId {
    id: TypeId,
    name: &'static str,
}

impl ActivityId {
    pub fn of<A: Activity>() -> Self {
        Self {
            id: TypeId::of::<A>(),
            name: std::any::type_name::<A>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ActivityId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActivityId {}

impl std::hash::Hash for ActivityId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A unit of startup work run by [`Host::run`].
///
/// An activity runs at most once per host, after every activity it depends
/// on has run, and only while [`can_execute`](Self::can_execute) holds.
///
/// # Examples
///
/// ```rust
/// use ferrous_compose::{Activity, ActivityId, ComposeResult, Host};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct LoadTheme(Arc<AtomicUsize>);
/// struct ShowShell(Arc<AtomicUsize>);
///
/// impl Activity for LoadTheme {
///     fn execute(&self, _host: &Host) -> ComposeResult<()> {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// impl Activity for ShowShell {
///     fn dependencies(&self) -> Vec<ActivityId> {
///         vec![ActivityId::of::<LoadTheme>()]
///     }
///
///     fn execute(&self, _host: &Host) -> ComposeResult<()> {
///         assert_eq!(self.0.load(Ordering::SeqCst), 1);
///         Ok(())
///     }
/// }
///
/// let steps = Arc::new(AtomicUsize::new(0));
/// let host = Host::builder()
///     .activity(ShowShell(steps.clone()))
///     .activity(LoadTheme(steps.clone()))
///     .build();
/// host.run(&[]).unwrap();
/// ```
pub trait Activity: Send + Sync + 'static {
    fn dependencies(&self) -> Vec<ActivityId> {
        Vec::new()
    }

    fn can_execute(&self, _host: &Host) -> bool {
        true
    }

    fn execute(&self, host: &Host) -> ComposeResult<()>;
}

struct ActivityEntry {
    id: ActivityId,
    dependencies: Vec<ActivityId>,
    activity: Arc<dyn Activity>,
    executed: AtomicBool,
}

/// Activities of one host in declaration order.
#[derive(Default)]
pub(crate) struct ActivitySet {
    entries: Vec<ActivityEntry>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl ActivitySet {
    /// Adds an activity; a second activity of the same type is ignored.
    pub(crate) fn push<A: Activity>(&mut self, activity: A) -> bool {
        let id = ActivityId::of::<A>();
        if self.entries.iter().any(|entry| entry.id == id) {
            debug!(activity = id.name(), "activity already registered");
            return false;
        }
        self.entries.push(ActivityEntry {
            id,
            dependencies: activity.dependencies(),
            activity: Arc::new(activity),
            executed: AtomicBool::new(false),
        });
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_executed(&self, id: &ActivityId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.id == *id && entry.executed.load(Ordering::SeqCst))
    }

    /// Indices in dependency order; ties keep declaration order.
    pub(crate) fn execution_order(&self) -> ComposeResult<Vec<usize>> {
        let index: HashMap<ActivityId, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.id, i))
            .collect();

        for entry in &self.entries {
            if let Some(missing) = entry.dependencies.iter().find(|d| !index.contains_key(d)) {
                return Err(ComposeError::MissingActivityDependency {
                    activity: entry.id.name(),
                    dependency: missing.name(),
                });
            }
        }

        let mut marks = vec![Mark::Unvisited; self.entries.len()];
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.entries.len());
        for i in 0..self.entries.len() {
            self.visit(i, &index, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        i: usize,
        index: &HashMap<ActivityId, usize>,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> ComposeResult<()> {
        match marks[i] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                let start = path.iter().position(|&p| p == i).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..]
                    .iter()
                    .map(|&p| self.entries[p].id.name().to_string())
                    .collect();
                cycle.push(self.entries[i].id.name().to_string());
                return Err(ComposeError::ActivityCycle(cycle));
            }
            Mark::Unvisited => {}
        }

        marks[i] = Mark::Visiting;
        path.push(i);
        for dependency in &self.entries[i].dependencies {
            if let Some(&d) = index.get(dependency) {
                self.visit(d, index, marks, path, order)?;
            }
        }
        path.pop();
        marks[i] = Mark::Done;
        order.push(i);
        Ok(())
    }

    /// Runs every pending activity whose dependencies have run.
    pub(crate) fn run(&self, host: &Host) -> ComposeResult<usize> {
        let order = self.execution_order()?;
        debug!(
            order = ?order.iter().map(|&i| self.entries[i].id).collect::<Vec<_>>(),
            "activity order"
        );

        let mut executed = 0;
        for i in order {
            let entry = &self.entries[i];
            if entry.executed.load(Ordering::SeqCst) {
                continue;
            }
            if let Some(pending) = entry.dependencies.iter().find(|d| !self.is_executed(d)) {
                debug!(
                    activity = entry.id.name(),
                    waiting_for = pending.name(),
                    "activity skipped"
                );
                continue;
            }
            if !entry.activity.can_execute(host) {
                debug!(activity = entry.id.name(), "activity cannot execute yet");
                continue;
            }

            entry.activity.execute(host).map_err(|err| match err {
                ComposeError::Activity { .. } => err,
                other => ComposeError::Activity {
                    activity: entry.id.name(),
                    message: other.to_string(),
                },
            })?;
            entry.executed.store(true, Ordering::SeqCst);
            executed += 1;
            info!(activity = entry.id.name(), "activity executed");
        }
        Ok(executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! activity {
        ($name:ident => [$($dep:ident),*]) => {
            struct $name;
            impl Activity for $name {
                fn dependencies(&self) -> Vec<ActivityId> {
                    vec![$(ActivityId::of::<$dep>()),*]
                }
                fn execute(&self, _host: &Host) -> ComposeResult<()> {
                    Ok(())
                }
            }
        };
    }

    activity!(A => [B]);
    activity!(B => [C]);
    activity!(C => []);
    activity!(D => []);
    activity!(Loop1 => [Loop2]);
    activity!(Loop2 => [Loop1]);
    activity!(Orphan => [D]);

    #[test]
    fn dependencies_come_first_and_ties_keep_declaration_order() {
        let mut set = ActivitySet::default();
        set.push(D);
        set.push(A);
        set.push(B);
        set.push(C);
        assert_eq!(set.execution_order().unwrap(), vec![0, 3, 2, 1]);
    }

    #[test]
    fn cycle_reports_the_path() {
        let mut set = ActivitySet::default();
        set.push(Loop1);
        set.push(Loop2);
        match set.execution_order().unwrap_err() {
            ComposeError::ActivityCycle(path) => {
                assert_eq!(path.len(), 3);
                assert!(path[0].ends_with("Loop1"));
                assert!(path[1].ends_with("Loop2"));
                assert!(path[2].ends_with("Loop1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let mut set = ActivitySet::default();
        set.push(Orphan);
        assert!(matches!(
            set.execution_order().unwrap_err(),
            ComposeError::MissingActivityDependency { .. }
        ));
    }

    #[test]
    fn duplicate_types_are_ignored() {
        let mut set = ActivitySet::default();
        assert!(set.push(C));
        assert!(!set.push(C));
        assert_eq!(set.len(), 1);
    }
}
