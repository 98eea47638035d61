//! Queries against workspaces loaded from disk, with a dependency module
//! loaded next to the workspace.

use std::fs;
use std::path::Path;

use gonav::hir::Snapshot;
use gonav::ide::{AnalysisHost, CallKind};
use gonav::project::WorkspaceLoader;
use tempfile::TempDir;

use crate::helpers::workspace::{position_of, texts};

const LIB: &str = "package store

type Store interface {
	Get(key string) (string, bool)
}

func Must(s Store, key string) string {
	v, _ := s.Get(key)
	return v
}
";

const APP: &str = "package app

import \"example.com/lib/store\"

type Memory map[string]string

func (m Memory) Get(key string) (string, bool) {
	v, ok := m[key]
	return v, ok
}

func Lookup(key string) string {
	return store.Must(Memory{}, key)
}
";

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, text).expect("write file");
}

/// A workspace module `example.com/app` and a dependency `example.com/lib`.
fn setup() -> (TempDir, AnalysisHost) {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "app/go.mod", "module example.com/app\n\nrequire example.com/lib v1.0.0\n");
    write(dir.path(), "app/app.go", APP);
    write(dir.path(), "lib/go.mod", "module example.com/lib // shared helpers\n");
    write(dir.path(), "lib/store/store.go", LIB);

    let mut host = AnalysisHost::new();
    WorkspaceLoader::new()
        .load_directory_into_host(dir.path().join("app"), &mut host)
        .expect("load workspace");
    WorkspaceLoader::dependencies()
        .load_directory_into_host(dir.path().join("lib"), &mut host)
        .expect("load dependency");
    (dir, host)
}

#[test]
fn test_modules_are_registered() {
    let (dir, host) = setup();
    let modules: Vec<(String, bool)> = host
        .modules()
        .iter()
        .map(|m| (m.path.to_string(), m.workspace))
        .collect();
    assert_eq!(
        modules,
        vec![
            ("example.com/app".to_string(), true),
            ("example.com/lib".to_string(), false),
        ]
    );
    assert!(host.has_file(dir.path().join("lib/store/store.go")));
}

#[test]
fn test_dependency_interface_finds_workspace_implementation() {
    let (dir, mut host) = setup();
    let store = host
        .get_file_id(dir.path().join("lib/store/store.go"))
        .expect("store file");
    let analysis = host.analysis();

    let locs = analysis
        .implementation(store, position_of(LIB, "Store interface"))
        .expect("implementations");
    assert_eq!(texts(&analysis, &locs), vec!["Memory"]);
    assert!(locs[0].path.ends_with("app/app.go"));
}

#[test]
fn test_only_workspace_packages_are_workspace_metadata() {
    let (_dir, mut host) = setup();
    let analysis = host.analysis();
    let workspace: Vec<String> = analysis
        .workspace_metadata()
        .iter()
        .map(|m| m.path.to_string())
        .collect();
    assert_eq!(workspace, vec!["example.com/app"]);
    assert_eq!(analysis.all_metadata().len(), 2);
}

#[test]
fn test_calls_cross_module_boundaries() {
    let (dir, mut host) = setup();
    let app = host.get_file_id(dir.path().join("app/app.go")).expect("app file");
    let store = host
        .get_file_id(dir.path().join("lib/store/store.go"))
        .expect("store file");
    let analysis = host.analysis();

    let outgoing = analysis
        .outgoing_calls(app, position_of(APP, "Lookup"))
        .expect("outgoing");
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].to.name, "Must");
    assert_eq!(outgoing[0].to.detail, "example.com/lib/store");

    let incoming = analysis.incoming_calls(store, position_of(LIB, "Must")).expect("incoming");
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].from.name, "Lookup");
    assert_eq!(incoming[0].from.kind, CallKind::Function);
}

#[test]
fn test_edits_replace_loaded_content() {
    let (dir, mut host) = setup();
    let path = dir.path().join("app/app.go");
    let before = host.file_count();
    let edited = APP.replace("func Lookup", "func Find");
    let app = host.set_file_content(&path, &edited);
    assert_eq!(host.file_count(), before);

    let analysis = host.analysis();
    let items = analysis
        .prepare_call_hierarchy(app, position_of(&edited, "Find"))
        .expect("prepare");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Find");
    assert_eq!(analysis.read_file(app).expect("text").as_ref(), edited);
}
