//! Full application flow: settings, conventions and manual exports composed
//! through a running host.

use ferrous_compose::{
    Assembly, ComposeResult, Composable, Environment, Host, HostState, Imports, Lifetime,
    MapSettingLocator, NamespaceSpecification, ServiceProviderExt, SettingMarker, TypeDescriptor,
};
use std::sync::Arc;

// ===== Test Services =====

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct StubObject {
    message: String,
    retry_count: u32,
}

impl Composable for StubObject {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .namespace("N.S")
            .name("StubObject")
            .setting_parameter("message", SettingMarker::new().key("Message"))
            .setting_property("RetryCount", SettingMarker::new())
            .exported(Lifetime::Singleton)
            .build()
    }

    fn compose(imports: &Imports<'_>) -> ComposeResult<Self> {
        Ok(StubObject {
            message: imports.setting("message")?,
            retry_count: imports.property("RetryCount")?,
        })
    }
}

struct FormalGreeter {
    stub: Arc<StubObject>,
}

impl Greeter for FormalGreeter {
    fn greet(&self) -> String {
        format!("{} x{}", self.stub.message, self.stub.retry_count)
    }
}

impl Composable for FormalGreeter {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .namespace("N.S.greeters")
            .name("FormalGreeter")
            .export_as::<dyn Greeter, _>(|g| g as Arc<dyn Greeter>)
            .build()
    }

    fn compose(imports: &Imports<'_>) -> ComposeResult<Self> {
        Ok(FormalGreeter {
            stub: imports.import::<StubObject>()?,
        })
    }
}

struct Deployment(Environment);

fn locator() -> MapSettingLocator {
    MapSettingLocator::new()
        .with("Message", "Test")
        .with("N.S.StubObject:RetryCount", 42)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn assembly() -> Assembly {
    Assembly::new("N.S")
        .with::<StubObject>()
        .with::<FormalGreeter>()
}

#[test]
fn settings_flow_into_composed_parts() {
    init_tracing();
    let host = Host::builder().setting_locator(locator()).build();
    host.run(&[assembly()]).unwrap();
    assert_eq!(host.state(), HostState::Running);

    let stub = host.get::<StubObject>().unwrap().unwrap();
    assert_eq!(stub.message, "Test");
    assert_eq!(stub.retry_count, 42);
}

#[test]
fn conventions_export_interfaces_of_matching_types() {
    init_tracing();
    let host = Host::builder()
        .setting_locator(locator())
        .conventions(|c| {
            c.for_types_matching(NamespaceSpecification::new("N.S.greeters").unwrap())
                .export_interfaces()
                .singleton();
        })
        .build();
    host.run(&[assembly()]).unwrap();

    let greeter = host.get::<dyn Greeter>().unwrap().unwrap();
    assert_eq!(greeter.greet(), "Test x42");

    // The greeter was only exported through its interface.
    assert!(host.get::<FormalGreeter>().unwrap().is_none());

    // Singleton parts are shared by every child host.
    let child = host.create_child().unwrap();
    let again = child.get::<dyn Greeter>().unwrap().unwrap();
    assert!(Arc::ptr_eq(&greeter, &again));
}

#[test]
fn catalog_exports_and_environment_reach_the_engine() {
    let host = Host::builder()
        .setting_locator(locator().with_environment("Message", Environment::Production, "Live"))
        .environment(Environment::Production)
        .catalog(|catalog| {
            catalog.add_instance::<Deployment>(None, Arc::new(Deployment(Environment::Production)));
        })
        .build();
    host.run(&[assembly()]).unwrap();

    assert_eq!(host.engine().environment(), Environment::Production);
    assert_eq!(host.get::<Deployment>().unwrap().unwrap().0, Environment::Production);
    assert_eq!(host.get::<StubObject>().unwrap().unwrap().message, "Live");
}

#[test]
fn disposing_the_host_stops_resolution() {
    let host = Host::builder().setting_locator(locator()).build();
    host.run(&[assembly()]).unwrap();
    host.dispose();

    assert_eq!(host.state(), HostState::Disposed);
    assert!(host.get::<StubObject>().is_err());
    assert!(host.engine().is_disposed());
}
