use ferrous_compose::{
    Activity, ActivityId, ComposeError, ComposeResult, Host, HostState, ServiceProviderExt,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Journal = Arc<Mutex<Vec<&'static str>>>;

// ===== Test Activities =====

struct LoadSettings(Journal);
struct ConnectDatabase(Journal);
struct ShowShell(Journal);

impl Activity for LoadSettings {
    fn execute(&self, _host: &Host) -> ComposeResult<()> {
        self.0.lock().push("settings");
        Ok(())
    }
}

impl Activity for ConnectDatabase {
    fn dependencies(&self) -> Vec<ActivityId> {
        vec![ActivityId::of::<LoadSettings>()]
    }

    fn execute(&self, _host: &Host) -> ComposeResult<()> {
        self.0.lock().push("database");
        Ok(())
    }
}

impl Activity for ShowShell {
    fn dependencies(&self) -> Vec<ActivityId> {
        vec![ActivityId::of::<ConnectDatabase>(), ActivityId::of::<LoadSettings>()]
    }

    fn execute(&self, _host: &Host) -> ComposeResult<()> {
        self.0.lock().push("shell");
        Ok(())
    }
}

/// Runs once the gate opens.
struct Gated {
    gate: Arc<AtomicBool>,
    journal: Journal,
}

impl Activity for Gated {
    fn can_execute(&self, _host: &Host) -> bool {
        self.gate.load(Ordering::SeqCst)
    }

    fn execute(&self, _host: &Host) -> ComposeResult<()> {
        self.journal.lock().push("gated");
        Ok(())
    }
}

struct AfterGated(Journal);

impl Activity for AfterGated {
    fn dependencies(&self) -> Vec<ActivityId> {
        vec![ActivityId::of::<Gated>()]
    }

    fn execute(&self, _host: &Host) -> ComposeResult<()> {
        self.0.lock().push("after-gated");
        Ok(())
    }
}

struct Failing;

impl Activity for Failing {
    fn execute(&self, _host: &Host) -> ComposeResult<()> {
        Err(ComposeError::Configuration("database unreachable".into()))
    }
}

struct ReadsHost(Journal);

impl Activity for ReadsHost {
    fn execute(&self, host: &Host) -> ComposeResult<()> {
        let title = host.get::<String>()?.ok_or(ComposeError::InvalidOperation("no title"))?;
        assert_eq!(title.as_str(), "Inbox");
        self.0.lock().push("reads-host");
        Ok(())
    }
}

struct Ping;
struct Pong;

impl Activity for Ping {
    fn dependencies(&self) -> Vec<ActivityId> {
        vec![ActivityId::of::<Pong>()]
    }
    fn execute(&self, _host: &Host) -> ComposeResult<()> {
        Ok(())
    }
}

impl Activity for Pong {
    fn dependencies(&self) -> Vec<ActivityId> {
        vec![ActivityId::of::<Ping>()]
    }
    fn execute(&self, _host: &Host) -> ComposeResult<()> {
        Ok(())
    }
}

// ===== Tests =====

#[test]
fn activities_run_after_their_dependencies() {
    let journal = Journal::default();
    let host = Host::builder()
        .activity(ShowShell(journal.clone()))
        .activity(ConnectDatabase(journal.clone()))
        .activity(LoadSettings(journal.clone()))
        .build();
    host.run(&[]).unwrap();

    assert_eq!(*journal.lock(), vec!["settings", "database", "shell"]);
    assert!(host.is_activity_executed::<ShowShell>());
}

#[test]
fn activities_run_at_most_once() {
    let journal = Journal::default();
    let host = Host::builder()
        .activity(LoadSettings(journal.clone()))
        .activity(LoadSettings(journal.clone()))
        .build();

    host.run(&[]).unwrap();
    host.run(&[]).unwrap();
    assert_eq!(*journal.lock(), vec!["settings"]);
}

#[test]
fn blocked_activities_wait_for_a_later_run() {
    let journal = Journal::default();
    let gate = Arc::new(AtomicBool::new(false));
    let host = Host::builder()
        .activity(AfterGated(journal.clone()))
        .activity(Gated {
            gate: gate.clone(),
            journal: journal.clone(),
        })
        .build();

    host.run(&[]).unwrap();
    assert!(journal.lock().is_empty());
    assert!(!host.is_activity_executed::<Gated>());
    assert_eq!(host.state(), HostState::Running);

    gate.store(true, Ordering::SeqCst);
    host.run(&[]).unwrap();
    assert_eq!(*journal.lock(), vec!["gated", "after-gated"]);
}

#[test]
fn failing_activity_names_itself() {
    let host = Host::builder().activity(Failing).build();
    match host.run(&[]).unwrap_err() {
        ComposeError::Activity { activity, message } => {
            assert!(activity.ends_with("Failing"));
            assert!(message.contains("database unreachable"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(host.state(), HostState::Configured);
}

#[test]
fn dependency_cycles_fail_the_run() {
    let host = Host::builder().activity(Ping).activity(Pong).build();
    assert!(matches!(
        host.run(&[]).unwrap_err(),
        ComposeError::ActivityCycle(path) if path.len() == 3
    ));
}

#[test]
fn unregistered_dependency_fails_the_run() {
    let journal = Journal::default();
    let host = Host::builder().activity(ConnectDatabase(journal)).build();
    assert!(matches!(
        host.run(&[]).unwrap_err(),
        ComposeError::MissingActivityDependency { .. }
    ));
}

#[test]
fn activities_resolve_through_the_host() {
    let journal = Journal::default();
    let host = Host::builder()
        .service::<String>(Arc::new("Inbox".to_string()))
        .activity(ReadsHost(journal.clone()))
        .build();
    host.run(&[]).unwrap();
    assert_eq!(*journal.lock(), vec!["reads-host"]);
}

#[test]
fn activity_ids_compare_by_type() {
    assert_eq!(ActivityId::of::<Ping>(), ActivityId::of::<Ping>());
    assert_ne!(ActivityId::of::<Ping>(), ActivityId::of::<Pong>());
    assert!(ActivityId::of::<Ping>().name().ends_with("Ping"));
}
