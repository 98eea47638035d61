//! Classification of the local objects a selection touches.
//!
//! One pass over the identifiers of the enclosing function records, per
//! object, whether the selection uses it, defines it or assigns it, and
//! whether code after the selection still uses it.

use rustc_hash::FxHashMap;
use text_size::TextRange;

use crate::hir::{CheckedFile, ObjKey, ObjKind, ObjRef};
use crate::parser::walk::inspect;
use crate::parser::{File, NodeId, NodeKind, UnaryOp};

#[derive(Debug, Clone)]
pub(crate) struct VarStatus {
    pub obj: ObjRef,
    /// Declared before the selection and used in it.
    pub free: bool,
    /// Declared inside the selection.
    pub defined: bool,
    /// Assigned (or address taken) inside the selection.
    pub assigned: bool,
    /// Referenced after the selection.
    pub used_after: bool,
}

impl VarStatus {
    /// Whether the extracted code must hand the value back to the caller.
    pub fn is_result(&self) -> bool {
        self.used_after && (self.defined || (self.free && self.assigned))
    }
}

/// Per-object status, in order of first reference.
#[derive(Debug, Default)]
pub(crate) struct FreeVars {
    vars: Vec<VarStatus>,
    index: FxHashMap<ObjKey, usize>,
}

impl FreeVars {
    /// Analyse `selection` within the function whose declaration spans
    /// `function`.
    pub fn analyze(checked: &CheckedFile, function: NodeId, selection: TextRange) -> FreeVars {
        let file = &checked.file;
        let scope = file.range(function);
        let mut out = FreeVars::default();
        inspect(file, function, |node| {
            if !matches!(file.kind(node), NodeKind::Ident(_)) {
                return true;
            }
            let range = file.range(node);
            let (obj, is_def) = match (checked.info.defs.get(&node), checked.info.uses.get(&node)) {
                (Some(obj), _) => (obj, true),
                (None, Some(obj)) => (obj, false),
                (None, None) => return true,
            };
            let Some(pos) = obj.pos() else {
                return true;
            };
            let local = pos.file == checked.file_id && scope.contains(pos.offset);
            if !local || matches!(obj.kind(), ObjKind::Label | ObjKind::PkgName | ObjKind::Func) {
                return true;
            }

            let in_selection = selection.contains_range(range);
            let after = range.start() >= selection.end();
            if !in_selection && !after {
                return true;
            }
            let status = out.entry(obj);
            if after {
                status.used_after = true;
                return true;
            }
            if selection.contains(pos.offset) {
                status.defined = true;
            } else {
                status.free = true;
            }
            if !is_def && is_assigned(file, node) {
                status.assigned = true;
            }
            true
        });
        out.vars.retain(|v| v.free || v.defined);
        out.index.clear();
        out
    }

    fn entry(&mut self, obj: &ObjRef) -> &mut VarStatus {
        let key = obj.key();
        let i = match key.and_then(|k| self.index.get(&k)) {
            Some(i) => *i,
            None => {
                self.vars.push(VarStatus {
                    obj: obj.clone(),
                    free: false,
                    defined: false,
                    assigned: false,
                    used_after: false,
                });
                let i = self.vars.len() - 1;
                if let Some(key) = key {
                    self.index.insert(key, i);
                }
                i
            }
        };
        &mut self.vars[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &VarStatus> {
        self.vars.iter()
    }

    /// Objects declared outside and used inside: the parameters.
    pub fn params(&self) -> impl Iterator<Item = &VarStatus> {
        self.vars.iter().filter(|v| v.free)
    }

    /// Objects the caller needs back, in declaration order.
    pub fn results(&self) -> Vec<&VarStatus> {
        let mut out: Vec<&VarStatus> = self.vars.iter().filter(|v| v.is_result()).collect();
        out.sort_by_key(|v| v.obj.pos());
        out
    }
}

/// Whether the identifier is written to: an assignment target, an
/// increment, a range variable assigned with `=`, or an operand of `&`.
pub(crate) fn is_assigned(file: &File, ident: NodeId) -> bool {
    let Some(parent) = file.parent(ident) else {
        return false;
    };
    match file.kind(parent) {
        // Identifiers on the left of `:=` reach here only when redeclared.
        NodeKind::Assign { lhs, .. } => lhs.contains(&ident),
        NodeKind::IncDec { x, .. } => *x == ident,
        NodeKind::Range { key, value, .. } => *key == Some(ident) || *value == Some(ident),
        NodeKind::Unary { op: UnaryOp::Addr, x } => *x == ident,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use indexmap::IndexMap;
    use text_size::TextSize;

    use super::*;
    use crate::base::FileId;
    use crate::hir::{CheckMode, Metadata, NoImports, Package, PackageId, check_package};
    use crate::parser;

    fn check(src: &str) -> Package {
        let meta = Arc::new(Metadata {
            id: PackageId::new("p"),
            path: "p".into(),
            name: "p".into(),
            dir: PathBuf::from("/p"),
            files: vec![FileId::new(0)],
            imports: IndexMap::new(),
            for_test: None,
        });
        check_package(
            meta,
            vec![(FileId::new(0), Arc::new(parser::parse(src)))],
            CheckMode::Full,
            &NoImports,
        )
    }

    #[test]
    fn test_statuses() {
        let src = "package p
func f(a, b int) int {
	c := a
	b++
	d := c + b
	return d + b
}
";
        let pkg = check(src);
        let checked = &pkg.files()[0];
        let func = checked.file.decls[0];
        let start = TextSize::new(src.find("b++").unwrap() as u32);
        let end = TextSize::new((src.find("c + b").unwrap() + 5) as u32);
        let vars = FreeVars::analyze(checked, func, TextRange::new(start, end));

        let by_name = |name: &str| vars.iter().find(|v| v.obj.name() == name).cloned().unwrap();
        let b = by_name("b");
        assert!(b.free && b.assigned && b.used_after && b.is_result());
        let c = by_name("c");
        assert!(c.free && !c.assigned && !c.is_result());
        let d = by_name("d");
        assert!(d.defined && d.used_after && d.is_result());
        assert!(vars.iter().all(|v| v.obj.name() != "a"));

        let params: Vec<_> = vars.params().map(|v| v.obj.name().to_string()).collect();
        assert_eq!(params, vec!["b", "c"]);
        let results: Vec<_> = vars.results().iter().map(|v| v.obj.name().to_string()).collect();
        assert_eq!(results, vec!["b", "d"]);
    }
}
