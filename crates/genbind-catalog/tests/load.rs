//! Catalog files on disk, loaded and closed end to end.

use std::io::Write;

use genbind_catalog::{Catalog, CatalogError};
use genbind_engine::RegistryBuilder;
use genbind_types::{ClosingError, Ty};

const LAYERED: &str = r#"
[options]
max_depth = 16

[[type]]
name = "User"

[[type]]
name = "Order"

[[type]]
name = "IRepo"
kind = "interface"
params = [{ name = "T" }]

[[type]]
name = "IService"
kind = "interface"
params = [{ name = "T" }]

[[type]]
name = "RepoBase"
abstract = true
params = [{ name = "T" }]
interfaces = ["IRepo<T>"]

[[type]]
name = "Repo"
params = [{ name = "T" }]
base = "RepoBase<T>"

[[type]]
name = "Service"
params = [{ name = "T" }]
interfaces = ["IService<T>"]

[[type]]
name = "UserRepo"
base = "RepoBase<User>"

[[component]]
type = "Repo"
pins = ["User"]

[[component]]
type = "Service"
dependencies = [{ shape = "IRepo<T>", factory = true }]

[[demand]]
component = "Repo"
arguments = ["Order"]

[[demand]]
component = "Repo"
arguments = ["User"]
"#;

fn write_catalog(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_from_file_and_close() {
    let file = write_catalog(LAYERED);
    let mut catalog = Catalog::from_file(file.path()).unwrap();
    assert_eq!(catalog.graph.len(), 2);
    assert_eq!(catalog.options.max_depth, 16);

    let mut sink = RegistryBuilder::new();
    let report = catalog.run(&mut sink).unwrap();
    let closed: Vec<String> = report.closed.iter().map(|t| t.to_string()).collect();
    // `UserRepo` is offered by the universe scan and closes `Service<User>`.
    assert_eq!(closed, vec!["Repo<Order>", "Service<Order>", "Service<User>"]);
    assert_eq!(report.stats.pinned, 1);

    let registry = sink.freeze();
    let repos = registry.implementations(&Ty::generic("IRepo", vec![Ty::named("Order")]));
    assert_eq!(repos, &[Ty::generic("Repo", vec![Ty::named("Order")])]);
    assert!(registry
        .implementations(&Ty::generic("Repo", vec![Ty::named("User")]))
        .is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
    assert_eq!(err.code(), "C0001");
}

#[test]
fn dependency_parameters_must_belong_to_the_component() {
    let broken = LAYERED.replace("shape = \"IRepo<T>\"", "shape = \"IRepo<U>\"");
    let file = write_catalog(&broken);
    let err = Catalog::from_file(file.path()).unwrap_err();
    // `U` is not a parameter of `Service`, so it parses as an unknown type.
    assert!(matches!(
        err,
        CatalogError::Closing {
            source: ClosingError::UnknownType { ref name },
            ..
        } if name == "U"
    ));
}
