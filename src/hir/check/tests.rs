use std::path::PathBuf;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use super::*;
use crate::hir::objects::VarKind;
use crate::hir::package::PackageId;
use crate::parser::{self, NodeKind};

fn metadata(path: &str, name: &str, files: Vec<FileId>) -> Arc<Metadata> {
    Arc::new(Metadata {
        id: PackageId::new(path),
        path: path.into(),
        name: name.into(),
        dir: PathBuf::from("/src").join(path),
        files,
        imports: IndexMap::new(),
        for_test: None,
    })
}

fn check_with(sources: &[&str], mode: CheckMode, importer: &dyn Importer) -> Package {
    let files: Vec<(FileId, Arc<File>)> = sources
        .iter()
        .enumerate()
        .map(|(i, src)| (FileId::new(i as u32), Arc::new(parser::parse(src))))
        .collect();
    let ids = files.iter().map(|(id, _)| *id).collect();
    check_package(metadata("example.com/p", "p", ids), files, mode, importer)
}

fn check(src: &str) -> Package {
    check_with(&[src], CheckMode::Full, &NoImports)
}

/// The nth identifier spelled `name` in the first file.
fn ident(pkg: &Package, name: &str, nth: usize) -> NodeId {
    let file = &pkg.files()[0].file;
    let mut idents: Vec<NodeId> = file
        .node_ids()
        .filter(|&n| matches!(file.kind(n), NodeKind::Ident(s) if s == name))
        .collect();
    idents.sort_by_key(|&n| file.range(n).start());
    *idents
        .get(nth)
        .unwrap_or_else(|| panic!("no identifier {name} #{nth}"))
}

fn object_at(pkg: &Package, name: &str, nth: usize) -> Option<ObjRef> {
    let id = ident(pkg, name, nth);
    pkg.files()[0].info.object_of(id).cloned()
}

#[test]
fn test_uses_resolve_to_definitions() {
    let pkg = check(
        "package p\n\
         var counter int\n\
         func bump() int { counter++; return counter }\n",
    );
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    let def = object_at(&pkg, "counter", 0).expect("def");
    let use1 = object_at(&pkg, "counter", 1).expect("use");
    let use2 = object_at(&pkg, "counter", 2).expect("use");
    assert!(Object::same(&def, &use1));
    assert!(Object::same(&def, &use2));
    assert_eq!(def.kind(), ObjKind::Var(VarKind::PackageLevel));
}

#[test]
fn test_local_shadows_package_level() {
    let pkg = check(
        "package p\n\
         var x = 1\n\
         func f() int {\n\
         \tx := \"s\"\n\
         \t_ = x\n\
         \treturn 0\n\
         }\n",
    );
    let global = object_at(&pkg, "x", 0).expect("global");
    let local = object_at(&pkg, "x", 1).expect("local");
    let used = object_at(&pkg, "x", 2).expect("use");
    assert!(!Object::same(&global, &local));
    assert!(Object::same(&local, &used));
    assert_eq!(local.ty().map(|t| t.to_string()).as_deref(), Some("string"));
}

#[test]
fn test_define_redeclares_only_new_names() {
    let pkg = check(
        "package p\n\
         func two() (int, error) { return 0, nil }\n\
         func f() {\n\
         \ta, err := two()\n\
         \tb, err := two()\n\
         \t_, _, _ = a, b, err\n\
         }\n",
    );
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    let first = object_at(&pkg, "err", 0).expect("first");
    let second = object_at(&pkg, "err", 1).expect("second");
    assert!(Object::same(&first, &second));
    assert_eq!(first.ty().map(|t| t.to_string()).as_deref(), Some("error"));
}

#[test]
fn test_forward_reference_to_later_type() {
    let pkg = check(
        "package p\n\
         var v T\n\
         type T struct{ n int }\n",
    );
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    let v = object_at(&pkg, "v", 0).expect("v");
    assert_eq!(v.ty().map(|t| t.to_string()).as_deref(), Some("p.T"));
}

#[test]
fn test_embedded_field_defines_field_and_uses_type() {
    let pkg = check(
        "package p\n\
         type Base struct{}\n\
         func (Base) Hello() {}\n\
         type Outer struct{ Base }\n\
         func f(o Outer) { o.Hello() }\n",
    );
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    let id = ident(&pkg, "Base", 2);
    let info = &pkg.files()[0].info;
    let field = info.defs.get(&id).expect("field def");
    assert!(field.is_embedded_field());
    let type_name = info.uses.get(&id).expect("type use");
    assert_eq!(type_name.kind(), ObjKind::TypeName);

    let hello = object_at(&pkg, "Hello", 1).expect("promoted method");
    assert!(hello.is_method());
}

#[test]
fn test_selection_records_embedding_path() {
    let pkg = check(
        "package p\n\
         type Inner struct{ N int }\n\
         type Outer struct{ *Inner }\n\
         func f(o Outer) int { return o.N }\n",
    );
    let info = &pkg.files()[0].info;
    let sel = info.selections.values().next().expect("selection");
    assert_eq!(sel.kind, SelectionKind::FieldVal);
    assert_eq!(sel.index, vec![0, 0]);
    assert!(sel.indirect);
}

#[test]
fn test_type_switch_implicit_objects() {
    let pkg = check(
        "package p\n\
         func f(x any) {\n\
         \tswitch v := x.(type) {\n\
         \tcase int:\n\
         \t\t_ = v\n\
         \tcase string, bool:\n\
         \t\t_ = v\n\
         \t}\n\
         }\n",
    );
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    let info = &pkg.files()[0].info;
    let mut implicits: Vec<_> = info.implicits.values().collect();
    implicits.sort_by_key(|o| o.pos().map(|p| p.offset));
    assert_eq!(implicits.len(), 2);
    let types: Vec<String> = implicits
        .iter()
        .filter_map(|o| o.ty().map(|t| t.to_string()))
        .collect();
    assert!(types.contains(&"int".to_string()), "{types:?}");
    assert!(types.contains(&"any".to_string()), "{types:?}");

    // Each `v` in a clause body resolves to that clause's object.
    let first_use = object_at(&pkg, "v", 1).expect("use");
    assert_eq!(first_use.ty().map(|t| t.to_string()).as_deref(), Some("int"));
    // The symbolic variable itself defines nothing.
    assert!(info.defs.get(&ident(&pkg, "v", 0)).is_none());
}

#[test]
fn test_methods_on_generic_type() {
    let pkg = check(
        "package p\n\
         type List[T any] struct{ items []T }\n\
         func (l *List[T]) Push(v T) { l.items = append(l.items, v) }\n\
         func use() { var l List[int]; l.Push(1) }\n",
    );
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    let list = pkg.lookup("List").expect("List");
    let named = list.ty().and_then(|t| t.as_named().cloned()).expect("named");
    assert_eq!(named.methods().len(), 1);

    let push_use = object_at(&pkg, "Push", 1).expect("Push use");
    let push_def = object_at(&pkg, "Push", 0).expect("Push def");
    assert!(Object::same(&push_def, &push_use));
    let sel = pkg.files()[0]
        .info
        .selections
        .values()
        .find(|s| s.obj.name() == "Push")
        .expect("selection");
    assert_eq!(sel.ty.to_string(), "func(v int)");
}

#[test]
fn test_generic_call_records_instance() {
    let pkg = check(
        "package p\n\
         func Map[T, U any](xs []T, f func(T) U) []U { return nil }\n\
         var out = Map([]int{1}, func(i int) string { return \"\" })\n",
    );
    let info = &pkg.files()[0].info;
    let inst = info.instances.get(&ident(&pkg, "Map", 1)).expect("instance");
    let targs: Vec<String> = inst.targs.iter().map(|t| t.to_string()).collect();
    assert_eq!(targs, ["int", "string"]);
    let out = pkg.lookup("out").expect("out");
    assert_eq!(out.ty().map(|t| t.to_string()).as_deref(), Some("[]string"));
}

#[test]
fn test_labels_resolve() {
    let pkg = check(
        "package p\n\
         func f() {\n\
         outer:\n\
         \tfor {\n\
         \t\tfor {\n\
         \t\t\tbreak outer\n\
         \t\t}\n\
         \t}\n\
         }\n",
    );
    let def = object_at(&pkg, "outer", 0).expect("label");
    let used = object_at(&pkg, "outer", 1).expect("use");
    assert_eq!(def.kind(), ObjKind::Label);
    assert!(Object::same(&def, &used));
}

#[test]
fn test_headers_mode_skips_bodies() {
    let src = "package p\n\
               type T int\n\
               func (T) M() { var hidden T; _ = hidden }\n";
    let pkg = check_with(&[src], CheckMode::Headers, &NoImports);
    assert_eq!(pkg.mode(), CheckMode::Headers);
    assert!(object_at(&pkg, "hidden", 0).is_none());
    let t = pkg.lookup("T").and_then(|o| o.ty()).expect("T");
    assert_eq!(t.as_named().map(|n| n.methods().len()), Some(1));
}

#[test]
fn test_range_over_map_and_func() {
    let pkg = check(
        "package p\n\
         func seq(yield func(int, string) bool) {}\n\
         func f(m map[string]bool) {\n\
         \tfor k, v := range m { _, _ = k, v }\n\
         \tfor i, s := range seq { _, _ = i, s }\n\
         }\n",
    );
    let ty = |name: &str| object_at(&pkg, name, 0).and_then(|o| o.ty()).map(|t| t.to_string());
    assert_eq!(ty("k").as_deref(), Some("string"));
    assert_eq!(ty("v").as_deref(), Some("bool"));
    assert_eq!(ty("i").as_deref(), Some("int"));
    assert_eq!(ty("s").as_deref(), Some("string"));
}

#[test]
fn test_redeclaration_is_reported() {
    let pkg = check("package p\nvar a int\nvar a string\n");
    assert!(
        pkg.errors().iter().any(|e| e.message.contains("redeclared")),
        "{:?}",
        pkg.errors()
    );
}

struct MapImporter(FxHashMap<&'static str, Arc<Package>>);

impl Importer for MapImporter {
    fn import(&self, path: &str) -> Option<Arc<Package>> {
        self.0.get(path).cloned()
    }
}

#[test]
fn test_imported_members_resolve() {
    let dep_file = Arc::new(parser::parse(
        "package dep\ntype Reader interface{ Read() }\nfunc New() Reader { return nil }\n",
    ));
    let dep = Arc::new(check_package(
        metadata("example.com/dep", "dep", vec![FileId::new(10)]),
        vec![(FileId::new(10), dep_file)],
        CheckMode::Headers,
        &NoImports,
    ));
    let mut map = FxHashMap::default();
    map.insert("example.com/dep", dep.clone());
    let importer = MapImporter(map);

    let pkg = check_with(
        &["package p\n\
           import \"example.com/dep\"\n\
           var r dep.Reader = dep.New()\n"],
        CheckMode::Full,
        &importer,
    );
    assert!(pkg.errors().is_empty(), "{:?}", pkg.errors());
    let reader = object_at(&pkg, "Reader", 0).expect("Reader");
    assert!(Object::same(&reader, &dep.lookup("Reader").expect("dep Reader")));

    // The unnamed import's package name is an implicit object on the spec.
    let info = &pkg.files()[0].info;
    let implicit = info.implicits.values().next().expect("implicit");
    assert_eq!(implicit.kind(), ObjKind::PkgName);
    assert_eq!(implicit.name(), "dep");
    assert_eq!(pkg.imports().len(), 1);
}

#[test]
fn test_missing_import_is_an_error() {
    let pkg = check("package p\nimport \"nowhere/x\"\nvar _ = x.Y\n");
    assert!(pkg.errors().iter().any(|e| e.message.contains("could not import")));
}
