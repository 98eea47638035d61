//! Lexical scopes.
//!
//! One tree per checked package: the package scope is the root, each file
//! gets a file scope (imports), and functions, blocks, statements and case
//! clauses nest below. Entries in local scopes carry the offset from which
//! they are visible, so lookups honor declaration order.

use indexmap::IndexMap;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::FileId;
use crate::parser::NodeId;

use super::objects::ObjRef;
use super::universe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const PACKAGE: ScopeId = ScopeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Package,
    File,
    Func,
    Block,
}

#[derive(Debug, Clone)]
struct Entry {
    obj: ObjRef,
    visible_from: TextSize,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub file: Option<FileId>,
    pub range: TextRange,
    /// The syntax node that opened this scope.
    pub node: Option<NodeId>,
    entries: IndexMap<SmolStr, Entry>,
    children: Vec<ScopeId>,
}

impl Scope {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjRef> {
        self.entries.values().map(|e| &e.obj)
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    fn is_local(&self) -> bool {
        matches!(self.kind, ScopeKind::Func | ScopeKind::Block)
    }
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Package,
                parent: None,
                file: None,
                range: TextRange::default(),
                node: None,
                entries: IndexMap::new(),
                children: Vec::new(),
            }],
        }
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn push(
        &mut self,
        kind: ScopeKind,
        parent: ScopeId,
        file: Option<FileId>,
        range: TextRange,
        node: Option<NodeId>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            file,
            range,
            node,
            entries: IndexMap::new(),
            children: Vec::new(),
        });
        self.scopes[parent.index()].children.push(id);
        id
    }

    /// Insert `obj`, returning the object it replaced, if any.
    pub fn insert(&mut self, scope: ScopeId, obj: ObjRef, visible_from: TextSize) -> Option<ObjRef> {
        let name = SmolStr::new(obj.name());
        self.scopes[scope.index()]
            .entries
            .insert(name, Entry { obj, visible_from })
            .map(|e| e.obj)
    }

    /// Look up `name` in `scope` only.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&ObjRef> {
        self.scope(scope).entries.get(name).map(|e| &e.obj)
    }

    /// Look up `name` starting at `scope` and walking outwards, excluding
    /// the universe. Local entries declared after `pos` are skipped.
    pub fn lookup_parent(&self, scope: ScopeId, name: &str, pos: Option<TextSize>) -> Option<(ScopeId, ObjRef)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(entry) = s.entries.get(name) {
                let visible = !s.is_local() || pos.is_none_or(|p| entry.visible_from <= p);
                if visible {
                    return Some((id, entry.obj.clone()));
                }
            }
            current = s.parent;
        }
        None
    }

    /// Resolve `name` as an identifier at `pos` in `scope`, including the universe.
    pub fn resolve(&self, scope: ScopeId, name: &str, pos: Option<TextSize>) -> Option<ObjRef> {
        self.lookup_parent(scope, name, pos)
            .map(|(_, obj)| obj)
            .or_else(|| universe::lookup(name))
    }

    pub fn file_scope(&self, file: FileId) -> Option<ScopeId> {
        self.scope(ScopeId::PACKAGE)
            .children
            .iter()
            .copied()
            .find(|id| self.scope(*id).file == Some(file))
    }

    /// The innermost scope of `file` containing `offset`.
    pub fn innermost(&self, file: FileId, offset: TextSize) -> Option<ScopeId> {
        let mut current = self.file_scope(file)?;
        'descend: loop {
            for child in &self.scope(current).children {
                let range = self.scope(*child).range;
                if range.start() <= offset && offset <= range.end() {
                    current = *child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// The enclosing scopes of `scope`, innermost first.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |s| self.scope(*s).parent)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
