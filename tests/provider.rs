use ferrous_compose::{
    Catalog, ComposeError, CompositionContainer, CompositionServiceProvider, ExportProvider,
    KeyedServiceProvider, Lifetime, Resolution, ServiceOverrides, ServiceProvider,
    ServiceProviderExt, ServiceType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ===== Test Services =====

trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

struct Named(&'static str);

impl Plugin for Named {
    fn name(&self) -> &'static str {
        self.0
    }
}

struct Session;

fn provider_over(catalog: Catalog, overrides: ServiceOverrides) -> Arc<CompositionServiceProvider> {
    let engine: Arc<dyn ExportProvider> = Arc::new(CompositionContainer::new(catalog));
    CompositionServiceProvider::with_overrides(engine, Arc::new(overrides))
}

fn plugin_names(plugins: &[Arc<dyn Plugin>]) -> Vec<&'static str> {
    plugins.iter().map(|p| p.name()).collect()
}

#[test]
fn collection_requests_are_never_absent() {
    let provider = provider_over(Catalog::new(), ServiceOverrides::new());

    let resolution = provider.get_service(&ServiceType::many::<dyn Plugin>()).unwrap();
    assert!(matches!(&resolution, Resolution::Collection(values) if values.is_empty()));
    assert!(provider.get_all::<dyn Plugin>().unwrap().is_empty());
    assert!(provider.get_all_keyed::<dyn Plugin>("audit").unwrap().is_empty());
}

#[test]
fn single_miss_is_none() {
    let provider = provider_over(Catalog::new(), ServiceOverrides::new());
    assert!(provider.get::<dyn Plugin>().unwrap().is_none());
    assert!(matches!(
        provider.get_service(&ServiceType::of::<dyn Plugin>()).unwrap(),
        Resolution::Single(None)
    ));
}

#[test]
fn overrides_answer_before_the_engine() {
    let mut catalog = Catalog::new();
    catalog.add_instance::<dyn Plugin>(None, Arc::new(Named("engine")));
    let mut overrides = ServiceOverrides::new();
    overrides.add::<dyn Plugin>(Arc::new(Named("override")));

    let provider = provider_over(catalog, overrides);
    assert_eq!(provider.get::<dyn Plugin>().unwrap().unwrap().name(), "override");

    // Collections gather every strategy in order.
    let all = provider.get_all::<dyn Plugin>().unwrap();
    assert_eq!(plugin_names(&all), vec!["override", "engine"]);
}

#[test]
fn keyed_requests_stay_keyed() {
    let mut catalog = Catalog::new();
    catalog
        .add_instance::<dyn Plugin>(None, Arc::new(Named("default")))
        .add_instance::<dyn Plugin>(Some("audit"), Arc::new(Named("audit-1")))
        .add_instance::<dyn Plugin>(Some("audit"), Arc::new(Named("audit-2")));

    let provider = provider_over(catalog, ServiceOverrides::new());
    assert_eq!(provider.get_keyed::<dyn Plugin>("audit").unwrap().unwrap().name(), "audit-1");
    assert_eq!(
        plugin_names(&provider.get_all_keyed::<dyn Plugin>("audit").unwrap()),
        vec!["audit-1", "audit-2"]
    );
    assert!(provider.get_keyed::<dyn Plugin>("missing").unwrap().is_none());
}

#[test]
fn empty_key_is_an_invalid_argument() {
    let provider = provider_over(Catalog::new(), ServiceOverrides::new());
    let err = provider
        .get_keyed_service(&ServiceType::of::<dyn Plugin>(), "")
        .unwrap_err();
    assert!(matches!(err, ComposeError::InvalidArgument { argument: "key", .. }));
}

#[test]
fn scoped_exports_from_the_root_are_absent() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let mut catalog = Catalog::new();
    catalog.add_factory::<Session, _>(Lifetime::Scoped, None, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Session))
    });

    let provider = provider_over(catalog, ServiceOverrides::new());
    assert!(provider.get::<Session>().unwrap().is_none());
    assert!(provider.get_all::<Session>().unwrap().is_empty());
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

#[test]
fn provider_over_a_scope_composes_scoped_exports() {
    let mut catalog = Catalog::new();
    catalog.add_factory::<Session, _>(Lifetime::Scoped, None, |_| Ok(Arc::new(Session)));
    let container = CompositionContainer::new(catalog);
    let scope = container.create_scope().unwrap();

    let provider = CompositionServiceProvider::new(Arc::new(scope.clone()));
    let first = provider.get::<Session>().unwrap().unwrap();
    let second = scope.get_export::<Session>().unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn provider_exports_itself_only_without_a_key() {
    let provider = provider_over(Catalog::new(), ServiceOverrides::new());

    let me = provider.get::<dyn ServiceProvider>().unwrap().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&me), Arc::as_ptr(&provider)));
    let keyed = provider.get::<dyn KeyedServiceProvider>().unwrap().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&keyed), Arc::as_ptr(&provider)));

    assert!(provider.get_keyed::<dyn ServiceProvider>("other").unwrap().is_none());
}

#[test]
fn self_export_shadows_engine_registrations_for_single_requests() {
    let other = provider_over(Catalog::new(), ServiceOverrides::new());
    let mut catalog = Catalog::new();
    catalog.add_instance::<dyn ServiceProvider>(None, other.clone() as Arc<dyn ServiceProvider>);

    let provider = provider_over(catalog, ServiceOverrides::new());
    let single = provider.get::<dyn ServiceProvider>().unwrap().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&single), Arc::as_ptr(&provider)));

    let all = provider.get_all::<dyn ServiceProvider>().unwrap();
    assert_eq!(all.len(), 2);
    assert!(std::ptr::addr_eq(Arc::as_ptr(&all[0]), Arc::as_ptr(&provider)));
    assert!(std::ptr::addr_eq(Arc::as_ptr(&all[1]), Arc::as_ptr(&other)));
}

#[test]
fn nested_collection_tokens_never_match() {
    let mut catalog = Catalog::new();
    catalog.add_instance::<dyn Plugin>(None, Arc::new(Named("engine")));
    let provider = provider_over(catalog, ServiceOverrides::new());

    let nested = ServiceType::many_of(ServiceType::many::<dyn Plugin>());
    let resolution = provider.get_service(&nested).unwrap();
    assert!(resolution.is_empty());
    assert!(resolution.into_collection().is_empty());
}

// ===== Mixed lifetimes under one contract =====

fn mixed_lifetime_plugins() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add_factory::<dyn Plugin, _>(Lifetime::Scoped, None, |_| {
        Ok(Arc::new(Named("scoped")) as Arc<dyn Plugin>)
    });
    catalog.add_instance::<dyn Plugin>(None, Arc::new(Named("shared")));
    catalog.add_factory::<dyn Plugin, _>(Lifetime::Transient, None, |_| {
        Ok(Arc::new(Named("fresh")) as Arc<dyn Plugin>)
    });
    catalog
}

fn assert_single_matches_first(provider: &CompositionServiceProvider, expected: &[&'static str]) {
    let single = provider.get::<dyn Plugin>().unwrap().map(|p| p.name());
    let all = provider.get_all::<dyn Plugin>().unwrap();
    assert_eq!(plugin_names(&all), expected);
    assert_eq!(single, all.first().map(|p| p.name()));
}

#[test]
fn single_result_matches_first_collection_entry_on_the_root() {
    let container = CompositionContainer::new(mixed_lifetime_plugins());
    let provider = CompositionServiceProvider::new(Arc::new(container));
    assert_single_matches_first(&provider, &["shared", "fresh"]);
}

#[test]
fn single_result_matches_first_collection_entry_in_a_scope() {
    let container = CompositionContainer::new(mixed_lifetime_plugins());
    let scope = container.create_scope().unwrap();
    let provider = CompositionServiceProvider::new(Arc::new(scope));
    assert_single_matches_first(&provider, &["scoped", "shared", "fresh"]);
}

#[test]
fn only_scoped_registrations_are_absent_on_the_root() {
    let mut catalog = Catalog::new();
    catalog.add_factory::<dyn Plugin, _>(Lifetime::Scoped, None, |_| {
        Ok(Arc::new(Named("scoped")) as Arc<dyn Plugin>)
    });
    let provider = CompositionServiceProvider::new(Arc::new(CompositionContainer::new(catalog)));
    assert!(provider.get::<dyn Plugin>().unwrap().is_none());
    assert!(provider.get_all::<dyn Plugin>().unwrap().is_empty());
}
