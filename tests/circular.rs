use ferrous_compose::{
    Assembly, Catalog, ComposeError, ComposeResult, Composable, CompositionContainer,
    ConventionBuilder, ExportProvider, Imports, Lifetime, TypeDescriptor, DECORATOR_KEY,
};
use std::sync::Arc;

/// Helper: assert that `result` failed with a circular path ending in `expected`.
fn assert_circular<T>(result: ComposeResult<T>, expected: &[&str]) {
    match result {
        Err(ComposeError::Circular(path)) => {
            assert_eq!(path.len(), expected.len(), "wrong circular path: {path:?}");
            for (actual, expected) in path.iter().zip(expected) {
                assert!(
                    actual.ends_with(expected),
                    "path element '{actual}' does not end with '{expected}'"
                );
            }
        }
        Err(other) => panic!("Expected circular error, got: {other}"),
        Ok(_) => panic!("Expected circular error, got a value"),
    }
}

#[test]
fn test_self_circular_dependency() {
    struct SelfReferencing;

    let mut catalog = Catalog::new();
    catalog.add_factory::<SelfReferencing, _>(Lifetime::Transient, None, |ctx| {
        ctx.import::<SelfReferencing>()?;
        Ok(Arc::new(SelfReferencing))
    });

    let container = CompositionContainer::new(catalog);
    assert_circular(
        container.get_export::<SelfReferencing>(),
        &["SelfReferencing", "SelfReferencing"],
    );
}

#[test]
fn test_two_part_cycle_between_singletons() {
    struct ServiceA;
    struct ServiceB;

    let mut catalog = Catalog::new();
    catalog.add_factory::<ServiceA, _>(Lifetime::Singleton, None, |ctx| {
        ctx.import::<ServiceB>()?;
        Ok(Arc::new(ServiceA))
    });
    catalog.add_factory::<ServiceB, _>(Lifetime::Singleton, None, |ctx| {
        ctx.import::<ServiceA>()?;
        Ok(Arc::new(ServiceB))
    });

    let container = CompositionContainer::new(catalog);
    assert_circular(
        container.get_export::<ServiceA>(),
        &["ServiceA", "ServiceB", "ServiceA"],
    );

    // A failed composition leaves the singleton slot empty.
    assert_circular(
        container.get_export::<ServiceB>(),
        &["ServiceB", "ServiceA", "ServiceB"],
    );
}

// ===== Composable cycle =====

struct Left;
struct Right;

impl Composable for Left {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .parameter("right")
            .exported(Lifetime::Transient)
            .build()
    }

    fn compose(imports: &Imports<'_>) -> ComposeResult<Self> {
        imports.import::<Right>()?;
        Ok(Left)
    }
}

impl Composable for Right {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .parameter("left")
            .exported(Lifetime::Scoped)
            .build()
    }

    fn compose(imports: &Imports<'_>) -> ComposeResult<Self> {
        imports.import::<Left>()?;
        Ok(Right)
    }
}

#[test]
fn test_composable_cycle_in_a_scope() {
    let container = CompositionContainer::new(Catalog::new());
    container
        .register_assembly(
            &Assembly::new("cycle").with::<Left>().with::<Right>(),
            &ConventionBuilder::new(),
        )
        .unwrap();

    let scope = container.create_scope().unwrap();
    assert_circular(scope.get_export::<Right>(), &["Right", "Left", "Right"]);
}

#[test]
fn test_optional_import_does_not_hide_a_cycle() {
    struct Loop;

    let mut catalog = Catalog::new();
    catalog.add_factory::<Loop, _>(Lifetime::Transient, None, |ctx| {
        ctx.import_optional::<Loop>()?;
        Ok(Arc::new(Loop))
    });

    let container = CompositionContainer::new(catalog);
    assert_circular(container.get_export::<Loop>(), &["Loop", "Loop"]);
}

#[test]
fn test_stack_unwinds_after_a_cycle() {
    struct Cyclic;
    struct Plain;

    let mut catalog = Catalog::new();
    catalog.add_factory::<Cyclic, _>(Lifetime::Transient, None, |ctx| {
        ctx.import::<Cyclic>()?;
        Ok(Arc::new(Cyclic))
    });
    catalog.add_factory::<Plain, _>(Lifetime::Transient, None, |_| Ok(Arc::new(Plain)));

    let container = CompositionContainer::new(catalog);
    assert!(container.get_export::<Cyclic>().is_err());
    // Composition continues to work on the same thread.
    assert!(container.get_export::<Plain>().unwrap().is_some());
    assert!(container.get_export::<Cyclic>().is_err());
}

#[test]
fn test_diamond_is_not_a_cycle() {
    struct Top;
    struct LeftBranch;
    struct RightBranch;
    struct Bottom;

    let mut catalog = Catalog::new();
    catalog.add_factory::<Bottom, _>(Lifetime::Transient, None, |_| Ok(Arc::new(Bottom)));
    catalog.add_factory::<LeftBranch, _>(Lifetime::Transient, None, |ctx| {
        ctx.import::<Bottom>()?;
        Ok(Arc::new(LeftBranch))
    });
    catalog.add_factory::<RightBranch, _>(Lifetime::Transient, None, |ctx| {
        ctx.import::<Bottom>()?;
        Ok(Arc::new(RightBranch))
    });
    catalog.add_factory::<Top, _>(Lifetime::Transient, None, |ctx| {
        ctx.import::<LeftBranch>()?;
        ctx.import::<RightBranch>()?;
        Ok(Arc::new(Top))
    });

    let container = CompositionContainer::new(catalog);
    assert!(container.get_export::<Top>().unwrap().is_some());
}

// ===== Keyed exports of one contract =====

trait Store: Send + Sync {
    fn label(&self) -> String;
}

struct Database;

impl Store for Database {
    fn label(&self) -> String {
        "db".to_string()
    }
}

struct Cached(Arc<dyn Store>);

impl Store for Cached {
    fn label(&self) -> String {
        format!("cached({})", self.0.label())
    }
}

fn store_catalog(wrapper_lifetime: Lifetime) -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add_factory::<dyn Store, _>(Lifetime::Singleton, None, |_| {
        Ok(Arc::new(Database) as Arc<dyn Store>)
    });
    catalog.add_factory::<dyn Store, _>(wrapper_lifetime, Some("cached"), |ctx| {
        Ok(Arc::new(Cached(ctx.import::<dyn Store>()?)) as Arc<dyn Store>)
    });
    catalog
}

#[test]
fn test_keyed_wrapper_imports_the_unkeyed_export() {
    let container = CompositionContainer::new(store_catalog(Lifetime::Transient));
    let store = container
        .get_keyed_export::<dyn Store>("cached")
        .unwrap()
        .unwrap();
    assert_eq!(store.label(), "cached(db)");
}

#[test]
fn test_scoped_keyed_wrapper_imports_the_unkeyed_export() {
    let container = CompositionContainer::new(store_catalog(Lifetime::Scoped));
    let scope = container.create_scope().unwrap();
    let first = scope.get_keyed_export::<dyn Store>("cached").unwrap().unwrap();
    let second = scope.get_keyed_export::<dyn Store>("cached").unwrap().unwrap();
    assert_eq!(first.label(), "cached(db)");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_decorator_export_wraps_the_plain_export() {
    let mut catalog = Catalog::new();
    catalog.add_factory::<dyn Store, _>(Lifetime::Transient, None, |_| {
        Ok(Arc::new(Database) as Arc<dyn Store>)
    });
    catalog.add_factory::<dyn Store, _>(Lifetime::Transient, Some(DECORATOR_KEY), |ctx| {
        Ok(Arc::new(Cached(ctx.import::<dyn Store>()?)) as Arc<dyn Store>)
    });

    let container = CompositionContainer::new(catalog);
    let decorated = container
        .get_keyed_export::<dyn Store>(DECORATOR_KEY)
        .unwrap()
        .unwrap();
    assert_eq!(decorated.label(), "cached(db)");
}

#[test]
fn test_keyed_export_importing_its_own_key_is_a_cycle() {
    let mut catalog = Catalog::new();
    catalog.add_factory::<dyn Store, _>(Lifetime::Transient, Some("loop"), |ctx| {
        Ok(Arc::new(Cached(ctx.import_keyed::<dyn Store>("loop")?)) as Arc<dyn Store>)
    });

    let container = CompositionContainer::new(catalog);
    assert_circular(
        container.get_keyed_export::<dyn Store>("loop"),
        &["Store", "Store"],
    );
}
