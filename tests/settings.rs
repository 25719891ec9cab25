use ferrous_compose::conventions::contract_name_for;
use ferrous_compose::{
    Assembly, Catalog, ComposeError, ComposeResult, Composable, CompositionContainer,
    ContainerOptions, ConventionBuilder, Environment, ExportProvider, Imports, Lifetime,
    MapSettingLocator, MemberKind, SettingDefault, SettingKey, SettingMarker, SettingRequest,
    SettingsConventionBuilder, TypeDescriptor,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

struct StubObject {
    enabled: bool,
    limit: u32,
    retry_count: Option<u32>,
}

impl Composable for StubObject {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .namespace("N.S")
            .name("StubObject")
            .setting_parameter_with_default("enabled", SettingMarker::new(), true)
            .setting_parameter_with_default("limit", SettingMarker::new().default_value(10), 5)
            .setting_property("RetryCount", SettingMarker::new().default_value(Value::Null))
            .exported(Lifetime::Transient)
            .build()
    }

    fn compose(imports: &Imports<'_>) -> ComposeResult<Self> {
        Ok(StubObject {
            enabled: imports.setting("enabled")?,
            limit: imports.setting("limit")?,
            retry_count: imports.property("RetryCount")?,
        })
    }
}

struct Required {
    #[allow(dead_code)]
    host: String,
}

impl Composable for Required {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .namespace("app")
            .name("Required")
            .setting_parameter("host", SettingMarker::new().key("mail:host"))
            .exported(Lifetime::Transient)
            .build()
    }

    fn compose(imports: &Imports<'_>) -> ComposeResult<Self> {
        Ok(Required {
            host: imports.setting("host")?,
        })
    }
}

fn container_with(locator: MapSettingLocator) -> CompositionContainer {
    let container = CompositionContainer::with_options(
        Catalog::new(),
        ContainerOptions::new().locator(locator),
    );
    container
        .register_assembly(
            &Assembly::new("stubs").with::<StubObject>().with::<Required>(),
            &ConventionBuilder::new(),
        )
        .unwrap();
    container
}

#[test]
fn derived_contract_name_is_namespace_type_and_member() {
    let builder = SettingsConventionBuilder::new();
    let attribute = builder
        .attribute(&StubObject::describe(), MemberKind::Property, "RetryCount")
        .unwrap();
    assert_eq!(attribute.contract_name(), "N.S.StubObject:RetryCount");
    assert_eq!(attribute.key(), "N.S.StubObject:RetryCount");
}

#[test]
fn literal_default_applies_and_attribute_default_overrides_it() {
    let container = container_with(MapSettingLocator::new());
    let stub = container.get_export::<StubObject>().unwrap().unwrap();
    assert!(stub.enabled);
    assert_eq!(stub.limit, 10);
}

#[test]
fn null_default_is_a_real_default() {
    let container = container_with(MapSettingLocator::new());
    let stub = container.get_export::<StubObject>().unwrap().unwrap();
    assert_eq!(stub.retry_count, None);

    let attribute = container
        .settings()
        .attribute(&StubObject::describe(), MemberKind::Property, "RetryCount")
        .unwrap();
    assert_eq!(attribute.default_value(), &SettingDefault::Value(Value::Null));
}

#[test]
fn located_values_win_over_defaults() {
    let locator = MapSettingLocator::new()
        .with("N.S.StubObject:enabled", false)
        .with("N.S.StubObject:RetryCount", 42);
    let container = container_with(locator);
    let stub = container.get_export::<StubObject>().unwrap().unwrap();
    assert!(!stub.enabled);
    assert_eq!(stub.retry_count, Some(42));
}

#[test]
fn required_setting_without_value_fails() {
    let container = container_with(MapSettingLocator::new());
    match container.get_export::<Required>() {
        Err(ComposeError::MissingSetting { key, member }) => {
            assert_eq!(key, "mail:host[Unspecified]");
            assert_eq!(member, "app.Required.host");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("missing setting should fail"),
    }
}

#[test]
fn wrongly_typed_value_is_reported() {
    let container = container_with(MapSettingLocator::new().with("N.S.StubObject:limit", "many"));
    let err = container.get_export::<StubObject>().err().unwrap();
    assert!(matches!(err, ComposeError::InvalidSettingValue { .. }));
}

#[test]
fn container_environment_qualifies_unspecified_markers() {
    let seen: Arc<Mutex<Vec<SettingKey>>> = Arc::new(Mutex::new(Vec::new()));

    struct Recording(Arc<Mutex<Vec<SettingKey>>>);
    impl ferrous_compose::SettingLocator for Recording {
        fn locate(&self, request: &SettingRequest<'_>) -> Option<Value> {
            self.0.lock().unwrap().push(request.key.clone());
            Some(json!("smtp.prod"))
        }
    }

    let container = CompositionContainer::with_options(
        Catalog::new(),
        ContainerOptions::new()
            .locator(Recording(seen.clone()))
            .environment(Environment::Production),
    );
    container
        .register_assembly(&Assembly::new("required").with::<Required>(), &ConventionBuilder::new())
        .unwrap();
    container.get_export::<Required>().unwrap().unwrap();

    let keys = seen.lock().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0], SettingKey::new("mail:host", Environment::Production).unwrap());
}

#[test]
fn attribute_environment_wins_over_container_environment() {
    struct Staged;
    let descriptor = TypeDescriptor::builder::<Staged>()
        .setting_property("Mode", SettingMarker::new().environment(Environment::Staging))
        .build();
    let attribute = SettingsConventionBuilder::new()
        .attribute(&descriptor, MemberKind::Property, "Mode")
        .unwrap();
    assert_eq!(attribute.environment(), Environment::Staging);
    assert_eq!(attribute.setting_key().environment(), Environment::Staging);
}

#[test]
fn duplicate_contracts_halt_assembly_registration() {
    struct First;
    struct Second;

    impl Composable for First {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::builder::<Self>()
                .setting_property("Port", SettingMarker::new().contract_name("shared:port"))
                .exported(Lifetime::Singleton)
                .build()
        }
        fn compose(_: &Imports<'_>) -> ComposeResult<Self> {
            Ok(First)
        }
    }

    impl Composable for Second {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::builder::<Self>()
                .setting_property("Port", SettingMarker::new().contract_name("shared:port"))
                .exported(Lifetime::Singleton)
                .build()
        }
        fn compose(_: &Imports<'_>) -> ComposeResult<Self> {
            Ok(Second)
        }
    }

    let container = CompositionContainer::new(Catalog::new());
    let err = container
        .register_assembly(
            &Assembly::new("clash").with::<First>().with::<Second>(),
            &ConventionBuilder::new(),
        )
        .unwrap_err();
    assert!(matches!(err, ComposeError::DuplicateSettingContract { .. }));

    // Nothing from the failed assembly was registered.
    assert!(!container.has_assembly("clash"));
    assert!(container.get_export::<First>().unwrap().is_none());
}

#[test]
fn failed_batch_leaves_no_setting_owners_behind() {
    struct Inbox;
    struct Outbox;

    impl Composable for Inbox {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::builder::<Self>()
                .namespace("mail")
                .setting_property("Server", SettingMarker::new().contract_name("mail:server"))
                .exported(Lifetime::Singleton)
                .build()
        }
        fn compose(_: &Imports<'_>) -> ComposeResult<Self> {
            Ok(Inbox)
        }
    }

    impl Composable for Outbox {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::builder::<Self>()
                .namespace("mail")
                .setting_property("Relay", SettingMarker::new().contract_name("mail:server"))
                .exported(Lifetime::Singleton)
                .build()
        }
        fn compose(_: &Imports<'_>) -> ComposeResult<Self> {
            Ok(Outbox)
        }
    }

    let container = CompositionContainer::new(Catalog::new());
    let conventions = ConventionBuilder::new();
    let inbox = Assembly::new("inbox").with::<Inbox>();
    let outbox = Assembly::new("outbox").with::<Outbox>();

    let err = container
        .register_assemblies(&[inbox, outbox.clone()], &conventions)
        .unwrap_err();
    assert!(matches!(err, ComposeError::DuplicateSettingContract { .. }));
    assert!(!container.has_assembly("inbox"));
    assert_eq!(container.settings().owned_contracts(), 0);

    // The contract was never owned, so the second assembly registers alone.
    assert!(container.register_assembly(&outbox, &conventions).unwrap());
    assert!(container.get_export::<Outbox>().unwrap().is_some());
    assert!(container.get_export::<Inbox>().unwrap().is_none());
}

mod determinism {
    use super::*;
    use proptest::prelude::*;

    struct Probe;

    proptest! {
        #[test]
        fn synthesized_names_are_deterministic(
            namespace in "[A-Z][a-z]{0,6}(\\.[A-Z][a-z]{0,6}){0,3}",
            name in "[A-Z][A-Za-z0-9]{0,10}",
            member in "[A-Za-z][A-Za-z0-9]{0,10}",
        ) {
            let descriptor = TypeDescriptor::builder::<Probe>()
                .namespace(namespace.clone())
                .name(name.clone())
                .setting_property(member.clone(), SettingMarker::new())
                .build();

            let first = SettingsConventionBuilder::new()
                .attribute(&descriptor, MemberKind::Property, &member)
                .unwrap();
            let second = SettingsConventionBuilder::new()
                .attribute(&descriptor, MemberKind::Property, &member)
                .unwrap();

            let expected = contract_name_for(&format!("{namespace}.{name}"), &member);
            prop_assert_eq!(first.contract_name(), expected.as_str());
            prop_assert_eq!(first.key(), expected.as_str());
            prop_assert_eq!(&*first, &*second);
        }

        #[test]
        fn explicit_key_is_used_verbatim(key in "[a-z]{1,8}(:[a-z]{1,8}){0,2}") {
            let descriptor = TypeDescriptor::builder::<Probe>()
                .namespace("app")
                .name("Probe")
                .setting_parameter("value", SettingMarker::new().key(key.clone()))
                .build();
            let attribute = SettingsConventionBuilder::new()
                .attribute(&descriptor, MemberKind::Parameter, "value")
                .unwrap();
            prop_assert_eq!(attribute.key(), key.as_str());
            prop_assert_eq!(attribute.contract_name(), "app.Probe:value");
            prop_assert!(!attribute.default_value().is_specified());
        }
    }
}
