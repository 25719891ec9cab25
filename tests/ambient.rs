//! The ambient slot is process-wide, so this binary holds a single test.

use ferrous_compose::{ambient, Host, ServiceProviderExt};
use serial_test::serial;
use std::sync::Arc;

#[test]
#[serial]
fn first_running_host_is_ambient_until_dropped() {
    assert!(!ambient::is_installed());
    assert!(ambient::current().is_none());

    let first = Host::builder()
        .service::<String>(Arc::new("first".to_string()))
        .build();
    let second = Host::new();

    // Configuring alone does not install.
    assert!(!ambient::is_installed());

    first.run(&[]).unwrap();
    second.run(&[]).unwrap();

    let current = ambient::current().unwrap();
    assert!(current.same_host(&first));
    assert!(!ambient::try_install(&second));
    assert_eq!(current.get::<String>().unwrap().unwrap().as_str(), "first");

    // Child hosts never become ambient.
    let child = first.create_child().unwrap();
    assert!(!ambient::try_install(&child));

    drop(current);
    drop(child);
    drop(first);
    assert!(ambient::is_installed());
    assert!(ambient::current().is_none());
    assert!(!ambient::try_install(&second));
}
