//! Field and method lookup, method sets and interface satisfaction.

use super::objects::{ObjId, ObjKind, ObjRef};
use super::types::{
    BasicKind, Interface, Signature, Ty, Type, deref, identical, identical_signatures, interface_of,
    invalid, is_interface, pointer, under,
};

/// The result of looking up a field or method by name.
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub obj: ObjRef,
    /// Field type or method signature, with type arguments substituted.
    pub ty: Ty,
    /// Path of field indices leading to the object; the last entry indexes
    /// the field or method itself.
    pub index: Vec<usize>,
    /// A pointer indirection was crossed on the way.
    pub indirect: bool,
}

impl LookupResult {
    pub fn is_method(&self) -> bool {
        self.obj.kind() == ObjKind::Func
    }

    /// Reached through at least one embedded field.
    pub fn is_promoted(&self) -> bool {
        self.index.len() > 1
    }
}

struct Embedded {
    ty: Ty,
    index: Vec<usize>,
    indirect: bool,
}

/// Find the field or method `name` of `ty`, following embedded fields
/// breadth first. Returns `None` when absent or ambiguous at the shallowest
/// depth where it occurs.
pub fn lookup_field_or_method(ty: &Ty, pkg: Option<&str>, name: &str) -> Option<LookupResult> {
    if name == "_" {
        return None;
    }
    let id = ObjId::new(pkg, name);
    let (base, is_ptr) = deref(ty);

    if let Type::TypeParam(_) = base.as_ref() {
        let iface = interface_of(&base)?;
        return iface
            .all_methods()
            .into_iter()
            .enumerate()
            .find(|(_, m)| m.obj.id() == id)
            .map(|(i, m)| LookupResult {
                obj: m.obj,
                ty: m.ty,
                index: vec![i],
                indirect: is_ptr,
            });
    }

    let mut current = vec![Embedded {
        ty: base,
        index: Vec::new(),
        indirect: is_ptr,
    }];
    let mut seen: Vec<Ty> = Vec::new();

    while !current.is_empty() {
        let mut next = Vec::new();
        let mut found: Option<LookupResult> = None;
        let mut count = 0;

        for e in current {
            let mut typ = e.ty.clone();
            if let Type::Named(n) = e.ty.as_ref() {
                if seen.iter().any(|s| identical(s, &e.ty)) {
                    continue;
                }
                seen.push(e.ty.clone());
                if let Some((i, m)) = n
                    .methods()
                    .into_iter()
                    .enumerate()
                    .find(|(_, m)| m.id() == id)
                {
                    count += 1;
                    let mut index = e.index.clone();
                    index.push(i);
                    let sig = n.method_type(&m).unwrap_or_else(invalid);
                    found = Some(LookupResult {
                        obj: m,
                        ty: sig,
                        index,
                        indirect: e.indirect,
                    });
                    continue;
                }
                typ = n.underlying();
            }

            match typ.as_ref() {
                Type::Struct(st) => {
                    for (i, field) in st.fields.iter().enumerate() {
                        let mut index = e.index.clone();
                        index.push(i);
                        if field.obj.id() == id {
                            count += 1;
                            found = Some(LookupResult {
                                obj: field.obj.clone(),
                                ty: field.ty.clone(),
                                index: index.clone(),
                                indirect: e.indirect,
                            });
                            continue;
                        }
                        if field.embedded {
                            let (fty, ptr) = deref(&field.ty);
                            next.push(Embedded {
                                ty: fty,
                                index,
                                indirect: e.indirect || ptr,
                            });
                        }
                    }
                }
                Type::Interface(iface) => {
                    if let Some((i, m)) = iface
                        .all_methods()
                        .into_iter()
                        .enumerate()
                        .find(|(_, m)| m.obj.id() == id)
                    {
                        count += 1;
                        let mut index = e.index.clone();
                        index.push(i);
                        found = Some(LookupResult {
                            obj: m.obj,
                            ty: m.ty,
                            index,
                            indirect: e.indirect,
                        });
                    }
                }
                _ => {}
            }
        }

        match count {
            0 => current = next,
            1 => return found,
            _ => return None,
        }
    }
    None
}

/// A method in a method set.
#[derive(Debug, Clone)]
pub struct MethodSetEntry {
    pub obj: ObjRef,
    pub ty: Ty,
    pub index: Vec<usize>,
    pub indirect: bool,
}

/// Whether a method is declared on `*T`.
pub fn has_pointer_receiver(method: &ObjRef) -> bool {
    method
        .signature()
        .and_then(|s| s.recv)
        .is_some_and(|r| matches!(r.ty.as_ref(), Type::Pointer(_)))
}

type Level = Vec<(ObjId, Option<MethodSetEntry>)>;

fn add(id: ObjId, entry: Option<MethodSetEntry>, level: &mut Level) {
    if let Some(slot) = level.iter_mut().find(|(i, _)| *i == id) {
        // Collision at the same depth cancels both.
        slot.1 = None;
    } else {
        level.push((id, entry));
    }
}

/// The method set of `ty`, sorted by method id.
///
/// Methods with pointer receivers belong to the set of `T` only when
/// reached through an embedded pointer; they always belong to `*T`.
pub fn method_set(ty: &Ty) -> Vec<MethodSetEntry> {
    if let Some(iface) = interface_of(ty)
        && (is_interface(ty) || matches!(ty.as_ref(), Type::TypeParam(_)))
    {
        return iface
            .all_methods()
            .into_iter()
            .enumerate()
            .map(|(i, m)| MethodSetEntry {
                obj: m.obj,
                ty: m.ty,
                index: vec![i],
                indirect: false,
            })
            .collect();
    }

    let (base, is_ptr) = deref(ty);
    let mut result: Vec<MethodSetEntry> = Vec::new();
    // Names claimed at a shallower depth shadow deeper ones.
    let mut claimed: Vec<ObjId> = Vec::new();
    let mut current = vec![Embedded {
        ty: base,
        index: Vec::new(),
        indirect: is_ptr,
    }];
    let mut seen: Vec<Ty> = Vec::new();

    while !current.is_empty() {
        let mut next = Vec::new();
        let mut level: Level = Vec::new();

        for e in current {
            if seen.iter().any(|s| identical(s, &e.ty)) {
                continue;
            }
            seen.push(e.ty.clone());
            let mut typ = e.ty.clone();
            if let Type::Named(n) = e.ty.as_ref() {
                for (i, m) in n.methods().into_iter().enumerate() {
                    let mut index = e.index.clone();
                    index.push(i);
                    let usable = e.indirect || !has_pointer_receiver(&m);
                    let ty = n.method_type(&m).unwrap_or_else(invalid);
                    let entry = usable.then(|| MethodSetEntry {
                        obj: m.clone(),
                        ty,
                        index,
                        indirect: e.indirect,
                    });
                    add(m.id(), entry, &mut level);
                }
                typ = n.underlying();
            }
            match typ.as_ref() {
                Type::Struct(st) => {
                    for (i, field) in st.fields.iter().enumerate() {
                        let mut index = e.index.clone();
                        index.push(i);
                        add(field.obj.id(), None, &mut level);
                        if field.embedded {
                            let (fty, ptr) = deref(&field.ty);
                            next.push(Embedded {
                                ty: fty,
                                index,
                                indirect: e.indirect || ptr,
                            });
                        }
                    }
                }
                Type::Interface(iface) => {
                    for (i, m) in iface.all_methods().into_iter().enumerate() {
                        let mut index = e.index.clone();
                        index.push(i);
                        let entry = MethodSetEntry {
                            obj: m.obj.clone(),
                            ty: m.ty,
                            index,
                            indirect: e.indirect,
                        };
                        add(m.obj.id(), Some(entry), &mut level);
                    }
                }
                _ => {}
            }
        }

        for (id, entry) in level {
            if claimed.contains(&id) {
                continue;
            }
            claimed.push(id);
            if let Some(entry) = entry {
                result.push(entry);
            }
        }
        current = next;
    }

    result.sort_by(|a, b| a.obj.id().cmp(&b.obj.id()));
    result
}

/// Why a type fails to implement an interface.
#[derive(Debug, Clone)]
pub struct MissingMethod {
    pub method: ObjRef,
    /// A method of that name exists but its signature differs.
    pub wrong_type: bool,
}

fn strip_recv(ty: &Ty) -> Option<Signature> {
    match ty.as_ref() {
        Type::Signature(sig) => Some(Signature {
            recv: None,
            ..sig.clone()
        }),
        _ => None,
    }
}

/// The first method of `iface` that `ty` lacks, by per-method lookup.
pub fn missing_method(ty: &Ty, iface: &Interface) -> Option<MissingMethod> {
    let v_iface = if is_interface(ty) { interface_of(ty) } else { None };
    for m in iface.all_methods() {
        let want = strip_recv(&m.ty);
        let missing = |wrong_type| {
            Some(MissingMethod {
                method: m.obj.clone(),
                wrong_type,
            })
        };

        if let Some(v) = &v_iface {
            match v.all_methods().into_iter().find(|vm| vm.obj.id() == m.obj.id()) {
                None => return missing(false),
                Some(vm) => {
                    if !sigs_match(&strip_recv(&vm.ty), &want) {
                        return missing(true);
                    }
                }
            }
            continue;
        }

        let Some(found) = lookup_field_or_method(ty, m.obj.pkg_path(), m.obj.name()) else {
            return missing(false);
        };
        if !found.is_method() {
            return missing(false);
        }
        let is_ptr = matches!(ty.as_ref(), Type::Pointer(_));
        if !is_ptr && !found.indirect && has_pointer_receiver(&found.obj) {
            return missing(false);
        }
        if !sigs_match(&strip_recv(&found.ty), &want) {
            return missing(true);
        }
    }
    None
}

fn sigs_match(a: &Option<Signature>, b: &Option<Signature>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => identical_signatures(a, b),
        _ => false,
    }
}

/// Whether `ty` satisfies the interface `target`, including its type set.
pub fn implements(ty: &Ty, target: &Ty) -> bool {
    let Some(iface) = interface_of(target) else {
        return false;
    };
    if missing_method(ty, &iface).is_some() {
        return false;
    }
    satisfies_type_set(ty, &iface)
}

fn satisfies_type_set(ty: &Ty, iface: &Interface) -> bool {
    if iface.comparable && !is_comparable(ty) {
        return false;
    }
    if !iface.terms.is_empty() {
        let u = under(ty);
        let ok = iface.terms.iter().any(|t| {
            if t.tilde {
                identical(&u, &under(&t.ty))
            } else {
                identical(ty, &t.ty)
            }
        });
        if !ok {
            return false;
        }
    }
    iface.embedded.iter().all(|e| match interface_of(e) {
        Some(inner) => satisfies_type_set(ty, &inner),
        None => identical(ty, e),
    })
}

pub fn is_comparable(ty: &Ty) -> bool {
    match under(ty).as_ref() {
        Type::Slice(_) | Type::Map(..) | Type::Signature(_) => false,
        Type::Struct(st) => st.fields.iter().all(|f| is_comparable(&f.ty)),
        Type::Array(_, elem) => is_comparable(elem),
        _ => true,
    }
}

/// Whether `ty` or `*ty` implements `iface`.
pub fn concrete_implements(ty: &Ty, iface: &Ty) -> bool {
    implements(ty, iface) || (!matches!(ty.as_ref(), Type::Pointer(_)) && implements(&pointer(ty.clone()), iface))
}

/// Assignability of a value of type `v` to a variable of type `t`.
pub fn assignable(v: &Ty, t: &Ty) -> bool {
    if identical(v, t) {
        return true;
    }
    let (uv, ut) = (under(v), under(t));
    if let Type::Basic(kind) = v.as_ref()
        && kind.is_untyped()
    {
        return match kind {
            BasicKind::UntypedNil => matches!(
                ut.as_ref(),
                Type::Pointer(_)
                    | Type::Slice(_)
                    | Type::Map(..)
                    | Type::Chan(..)
                    | Type::Signature(_)
                    | Type::Interface(_)
                    | Type::Basic(BasicKind::UnsafePointer)
            ),
            _ => matches!(ut.as_ref(), Type::Basic(_) | Type::Interface(_)),
        };
    }
    if is_interface(t) && !matches!(t.as_ref(), Type::TypeParam(_)) {
        return implements(v, t);
    }
    let v_named = matches!(v.as_ref(), Type::Named(_) | Type::TypeParam(_));
    let t_named = matches!(t.as_ref(), Type::Named(_) | Type::TypeParam(_));
    if identical(&uv, &ut) && (!v_named || !t_named) {
        return true;
    }
    if let (Type::Chan(_, ev), Type::Chan(_, et)) = (uv.as_ref(), ut.as_ref()) {
        return identical(ev, et);
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::base::FileId;
    use crate::hir::objects::{Object, PkgRef, Pos, VarKind};
    use crate::hir::types::{Field, Method, Named, Param, Struct, basic, named};
    use text_size::TextSize;

    fn pos(offset: u32) -> Option<Pos> {
        Some(Pos::new(FileId::new(0), TextSize::new(offset)))
    }

    fn pkg() -> Arc<PkgRef> {
        PkgRef::new("example.com/p", "p")
    }

    fn method(name: &str, offset: u32, recv: Ty) -> ObjRef {
        let sig = Signature {
            recv: Some(Param::new("r", recv)),
            results: vec![Param::new("", basic(BasicKind::String))],
            ..Default::default()
        };
        Object::with_type(ObjKind::Func, name, pos(offset), Some(pkg()), Arc::new(Type::Signature(sig)))
    }

    fn named_type(name: &str, offset: u32) -> Arc<Named> {
        let obj = Object::new(ObjKind::TypeName, name, pos(offset), Some(pkg()));
        let n = Named::new(obj.clone(), Vec::new());
        obj.set_ty(named(n.clone()));
        n
    }

    fn stringer() -> Ty {
        let sig = Signature {
            results: vec![Param::new("", basic(BasicKind::String))],
            ..Default::default()
        };
        let m = Object::with_type(ObjKind::Func, "String", pos(900), Some(pkg()), Arc::new(Type::Signature(sig.clone())));
        Arc::new(Type::Interface(Interface {
            methods: vec![Method {
                obj: m,
                ty: Arc::new(Type::Signature(sig)),
            }],
            ..Default::default()
        }))
    }

    #[test]
    fn test_promoted_method_through_embedding() {
        let inner = named_type("Inner", 10);
        inner.set_underlying(Arc::new(Type::Struct(Struct::default())));
        inner.add_method(method("String", 20, named(inner.clone())));

        let outer = named_type("Outer", 30);
        let field = Object::new(ObjKind::Var(VarKind::Field { embedded: true }), "Inner", pos(40), Some(pkg()));
        outer.set_underlying(Arc::new(Type::Struct(Struct {
            fields: vec![Field {
                obj: field,
                ty: named(inner.clone()),
                embedded: true,
                tag: None,
            }],
        })));

        let found = lookup_field_or_method(&named(outer.clone()), Some("example.com/p"), "String").unwrap();
        assert!(found.is_method());
        assert_eq!(found.index, vec![0, 0]);
        assert!(implements(&named(outer), &stringer()));
    }

    #[test]
    fn test_pointer_receiver_requires_pointer() {
        let t = named_type("T", 10);
        t.set_underlying(Arc::new(Type::Struct(Struct::default())));
        t.add_method(method("String", 20, pointer(named(t.clone()))));
        assert!(!implements(&named(t.clone()), &stringer()));
        assert!(implements(&pointer(named(t.clone())), &stringer()));
        assert!(concrete_implements(&named(t), &stringer()));
    }

    #[test]
    fn test_method_set_excludes_pointer_methods_of_value() {
        let t = named_type("T", 10);
        t.set_underlying(Arc::new(Type::Struct(Struct::default())));
        t.add_method(method("String", 20, pointer(named(t.clone()))));
        assert!(method_set(&named(t.clone())).is_empty());
        assert_eq!(method_set(&pointer(named(t))).len(), 1);
    }
}
