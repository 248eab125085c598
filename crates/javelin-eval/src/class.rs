//! Class registry: descriptors built once per run from the prelude and the
//! program, shared read-only by every execution context.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;

use javelin_types::ast::*;
use javelin_types::library;
use javelin_types::visit::{walk_class, walk_expr, Visitor};
use javelin_types::Span;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

// ══════════════════════════════════════════════════════════════════════════════
// Descriptors
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// An instance field and its position in the object layout.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeRef,
    pub slot: usize,
    pub init: Option<Arc<Expr>>,
}

/// A static field. Storage lives in [`ClassDescriptor::static_values`].
#[derive(Debug, Clone)]
pub struct StaticInfo {
    pub name: String,
    pub ty: TypeRef,
    pub init: Option<Arc<Expr>>,
}

const UNINIT: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

#[derive(Debug)]
pub struct ClassDescriptor {
    pub id: ClassId,
    /// Simple name.
    pub name: String,
    pub kind: ClassKind,
    pub is_abstract: bool,
    pub superclass: Option<ClassId>,
    /// Directly implemented interfaces (user or library), by simple name.
    pub interfaces: Vec<String>,
    /// Lexically enclosing class.
    pub enclosing: Option<ClassId>,
    /// Instances carry a link to an enclosing instance.
    pub needs_outer: bool,
    pub is_anonymous: bool,
    pub is_prelude: bool,
    pub type_params: Vec<String>,
    /// Instance fields declared by this class.
    pub fields: Vec<FieldInfo>,
    /// Total instance fields including inherited ones.
    pub field_count: usize,
    pub statics: Vec<StaticInfo>,
    pub static_values: Mutex<Vec<Value>>,
    init_state: AtomicU8,
    /// Native thread running the static initializer.
    init_owner: Mutex<Option<ThreadId>>,
    init_done: Condvar,
    pub methods: Vec<Arc<MethodDecl>>,
    pub constructors: Vec<Arc<ConstructorDecl>>,
    pub static_blocks: Vec<Arc<Block>>,
    pub enum_constants: Vec<EnumConstant>,
    pub span: Span,
}

impl ClassDescriptor {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    /// Claim static initialization. Returns `true` for the one caller that
    /// must run it.
    pub fn begin_init(&self) -> bool {
        let claimed = self
            .init_state
            .compare_exchange(UNINIT, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if claimed {
            *self.init_owner.lock() = Some(std::thread::current().id());
        }
        claimed
    }

    /// Wait for an initializer running on another thread. The initializing
    /// thread itself sees the class as usable right away.
    pub fn wait_init(&self) {
        let me = std::thread::current().id();
        let mut owner = self.init_owner.lock();
        while !self.is_initialized() {
            if *owner == Some(me) {
                return;
            }
            self.init_done.wait(&mut owner);
        }
    }

    pub fn finish_init(&self) {
        let _owner = self.init_owner.lock();
        self.init_state.store(DONE, Ordering::Release);
        self.init_done.notify_all();
    }

    pub fn is_initialized(&self) -> bool {
        self.init_state.load(Ordering::Acquire) == DONE
    }

    pub fn static_index(&self, name: &str) -> Option<usize> {
        self.statics.iter().position(|s| s.name == name)
    }

    pub fn get_static(&self, index: usize) -> Value {
        self.static_values
            .lock()
            .get(index)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn set_static(&self, index: usize, value: Value) {
        if let Some(slot) = self.static_values.lock().get_mut(index) {
            *slot = value;
        }
    }

    pub fn own_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared methods called `name`, with a body, that accept `argc`
    /// arguments.
    pub fn own_methods<'a>(
        &'a self,
        name: &'a str,
        argc: usize,
    ) -> impl Iterator<Item = &'a Arc<MethodDecl>> + 'a {
        self.methods
            .iter()
            .filter(move |m| m.name.name == name && m.body.is_some() && m.accepts_arity(argc))
    }

    pub fn declares_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name.name == name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Registry
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ClassRegistry {
    classes: Vec<ClassDescriptor>,
    by_name: BTreeMap<String, ClassId>,
}

impl ClassRegistry {
    pub fn get(&self, id: ClassId) -> &ClassDescriptor {
        &self.classes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.iter()
    }

    /// Resolve a class by qualified (`A.B.C`) or simple name.
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        if let Some(id) = self.by_name.get(name) {
            return Some(*id);
        }
        let simple = name.rsplit('.').next()?;
        self.by_name.get(simple).copied()
    }

    pub fn lookup_type(&self, ty: &TypeRef) -> Option<ClassId> {
        match ty {
            TypeRef::Class { name, .. } => self.lookup(name),
            _ => None,
        }
    }

    pub fn name_of(&self, id: ClassId) -> &str {
        &self.get(id).name
    }

    /// The class and its superclasses, most-derived first.
    pub fn chain(&self, id: ClassId) -> Chain<'_> {
        Chain {
            registry: self,
            next: Some(id),
        }
    }

    /// `depth` steps up the superclass chain.
    pub fn ancestor_at(&self, id: ClassId, depth: u32) -> Option<ClassId> {
        self.chain(id).nth(depth as usize)
    }

    pub fn is_subclass(&self, id: ClassId, of: ClassId) -> bool {
        self.chain(id).any(|c| c == of)
    }

    /// Whether instances of `id` are members of the type named `target`.
    pub fn is_a(&self, id: ClassId, target: &str) -> bool {
        let target = target.rsplit('.').next().unwrap_or(target);
        if target == "Object" {
            return true;
        }
        self.chain(id).any(|c| {
            let desc = self.get(c);
            desc.name == target
                || desc
                    .interfaces
                    .iter()
                    .any(|i| self.interface_is_a(i, target, 0))
        })
    }

    fn interface_is_a(&self, iface: &str, target: &str, depth: usize) -> bool {
        if iface == target {
            return true;
        }
        if depth > self.classes.len() {
            return false;
        }
        match self.lookup(iface) {
            Some(id) => self
                .get(id)
                .interfaces
                .iter()
                .any(|i| self.interface_is_a(i, target, depth + 1)),
            None => library::library_is_a(iface, target),
        }
    }

    /// Instance field `name` visible from `id`, searching from the
    /// most-derived class up.
    pub fn find_field(&self, id: ClassId, name: &str) -> Option<&FieldInfo> {
        self.chain(id).find_map(|c| self.get(c).own_field(name))
    }

    /// Static field `name` visible from `id`: own, inherited, or declared by
    /// an implemented interface.
    pub fn find_static(&self, id: ClassId, name: &str) -> Option<(ClassId, usize)> {
        for c in self.chain(id) {
            let desc = self.get(c);
            if let Some(i) = desc.static_index(name) {
                return Some((c, i));
            }
            for iface in &desc.interfaces {
                if let Some(found) = self.lookup(iface).and_then(|i| self.find_static(i, name)) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Method candidates for a call of `name` with `argc` arguments, most
    /// derived first, then interface default methods.
    pub fn methods(&self, id: ClassId, name: &str, argc: usize) -> Vec<(ClassId, Arc<MethodDecl>)> {
        let mut found = Vec::new();
        for c in self.chain(id) {
            for m in self.get(c).own_methods(name, argc) {
                found.push((c, m.clone()));
            }
        }
        let mut seen = Vec::new();
        for c in self.chain(id) {
            for iface in &self.get(c).interfaces {
                self.collect_defaults(iface, name, argc, &mut seen, &mut found);
            }
        }
        found
    }

    fn collect_defaults(
        &self,
        iface: &str,
        name: &str,
        argc: usize,
        seen: &mut Vec<ClassId>,
        found: &mut Vec<(ClassId, Arc<MethodDecl>)>,
    ) {
        let Some(id) = self.lookup(iface) else {
            return;
        };
        if seen.contains(&id) {
            return;
        }
        seen.push(id);
        let desc = self.get(id);
        for m in desc.own_methods(name, argc) {
            found.push((id, m.clone()));
        }
        for parent in &desc.interfaces {
            self.collect_defaults(parent, name, argc, seen, found);
        }
    }

    /// A named class declared directly inside `outer` or one of its
    /// superclasses.
    pub fn nested(&self, outer: ClassId, name: &str) -> Option<ClassId> {
        self.chain(outer).find_map(|o| {
            self.classes
                .iter()
                .find(|c| c.enclosing == Some(o) && !c.is_anonymous && c.name == name)
                .map(|c| c.id)
        })
    }

    /// Resolve a type name as written in code belonging to `scope`: classes
    /// nested in the scope or its enclosing classes win over global names.
    pub fn resolve(&self, scope: Option<ClassId>, name: &str) -> Option<ClassId> {
        if !name.contains('.') {
            let mut current = scope;
            while let Some(c) = current {
                if let Some(found) = self.nested(c, name) {
                    return Some(found);
                }
                current = self.get(c).enclosing;
            }
        }
        self.lookup(name)
    }

    /// Whether any class in the chain declares a method `name` (with or
    /// without a body).
    pub fn declares_method(&self, id: ClassId, name: &str) -> bool {
        self.chain(id).any(|c| self.get(c).declares_method(name))
    }
}

pub struct Chain<'a> {
    registry: &'a ClassRegistry,
    next: Option<ClassId>,
}

impl Iterator for Chain<'_> {
    type Item = ClassId;

    fn next(&mut self) -> Option<ClassId> {
        let current = self.next?;
        self.next = self.registry.get(current).superclass;
        Some(current)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Loading
// ══════════════════════════════════════════════════════════════════════════════

/// A declaration waiting for its descriptor.
struct Pending {
    decl: ClassDecl,
    qualified: String,
    enclosing: Option<usize>,
    is_prelude: bool,
    /// Type named by the `new` expression of an anonymous body.
    anon_base: Option<TypeRef>,
}

/// Collects anonymous class bodies directly inside one class or statement
/// list. Nested classes are skipped; they are collected on their own.
#[derive(Default)]
struct AnonCollector {
    found: Vec<(ClassDecl, TypeRef)>,
}

impl Visitor for AnonCollector {
    fn visit_class(&mut self, _class: &ClassDecl) {}

    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::New(new) = &expr.kind {
            if let Some(body) = &new.body {
                self.found.push((body.clone(), new.class.clone()));
            }
        }
        walk_expr(self, expr);
    }
}

fn collect(
    decl: &ClassDecl,
    qualified: String,
    enclosing: Option<usize>,
    is_prelude: bool,
    anon_base: Option<TypeRef>,
    out: &mut Vec<Pending>,
) {
    let index = out.len();
    out.push(Pending {
        decl: decl.clone(),
        qualified: qualified.clone(),
        enclosing,
        is_prelude,
        anon_base,
    });
    for inner in &decl.inner_classes {
        let name = format!("{qualified}.{}", inner.name.name);
        collect(inner, name, Some(index), is_prelude, None, out);
    }
    let mut anon = AnonCollector::default();
    walk_class(&mut anon, decl);
    for (body, base) in anon.found {
        let name = body.name.name.clone();
        collect(&body, name, Some(index), is_prelude, Some(base), out);
    }
}

impl ClassRegistry {
    /// Build descriptors for the prelude and every class of the program,
    /// including nested and anonymous classes.
    pub fn load(prelude: &[ClassDecl], program: &Program) -> EvalResult<Self> {
        let mut pending = Vec::new();
        for decl in prelude {
            collect(decl, decl.name.name.clone(), None, true, None, &mut pending);
        }
        for decl in &program.classes {
            collect(decl, decl.name.name.clone(), None, false, None, &mut pending);
        }
        let mut anon = AnonCollector::default();
        for stmt in &program.main {
            anon.visit_stmt(stmt);
        }
        for (body, base) in anon.found {
            let name = body.name.name.clone();
            collect(&body, name, None, false, Some(base), &mut pending);
        }

        let mut by_name = BTreeMap::new();
        for (i, p) in pending.iter().enumerate() {
            let id = ClassId(i as u32);
            by_name.insert(p.qualified.clone(), id);
            let simple = p.decl.name.name.clone();
            if p.is_prelude || !by_name.contains_key(&simple) || p.enclosing.is_none() {
                by_name.insert(simple, id);
            }
        }
        let lookup = |name: &str| -> Option<ClassId> {
            by_name
                .get(name)
                .or_else(|| name.rsplit('.').next().and_then(|s| by_name.get(s)))
                .copied()
        };
        let object = lookup("Object");

        // ── Supertypes ──
        let mut supers: Vec<(Option<ClassId>, Vec<String>)> = Vec::with_capacity(pending.len());
        for (i, p) in pending.iter().enumerate() {
            let id = ClassId(i as u32);
            let decl = &p.decl;
            let mut interfaces: Vec<String> = decl
                .interfaces
                .iter()
                .filter_map(|t| t.simple_name().map(str::to_string))
                .collect();
            let mut superclass = None;
            if decl.is_interface() {
                if let Some(name) = decl.superclass.as_ref().and_then(TypeRef::simple_name) {
                    interfaces.push(name.to_string());
                }
            } else if let Some(base) = &p.anon_base {
                match lookup_class(&lookup, base, &pending) {
                    Some(c) => superclass = Some(c),
                    None => interfaces.extend(base.simple_name().map(str::to_string)),
                }
            } else if let Some(sup) = &decl.superclass {
                let name = sup.simple_name().unwrap_or_default();
                superclass = match lookup(name) {
                    Some(c) => Some(c),
                    None if library::is_library_type(name) => None,
                    None => {
                        return Err(EvalError::Load(format!(
                            "class {} extends unknown class {name}",
                            decl.name
                        )))
                    }
                };
            }
            if superclass.is_none() && !decl.is_interface() && Some(id) != object {
                superclass = object;
            }
            supers.push((superclass, interfaces));
        }

        // ── Cycles ──
        for (i, p) in pending.iter().enumerate() {
            let mut current = supers[i].0;
            let mut steps = 0;
            while let Some(c) = current {
                if c.index() == i || steps > pending.len() {
                    return Err(EvalError::Load(format!(
                        "cyclic inheritance involving {}",
                        p.decl.name
                    )));
                }
                current = supers[c.index()].0;
                steps += 1;
            }
        }

        // ── Field layout ──
        let mut field_counts: Vec<Option<usize>> = vec![None; pending.len()];
        for i in 0..pending.len() {
            layout(i, &pending, &supers, &mut field_counts);
        }

        let mut classes = Vec::with_capacity(pending.len());
        for (i, p) in pending.into_iter().enumerate() {
            let decl = p.decl;
            let (superclass, interfaces) = supers[i].clone();
            let base = superclass.map_or(0, |s| field_counts[s.index()].unwrap_or(0));
            let is_interface = decl.is_interface();
            let fields: Vec<FieldInfo> = decl
                .fields
                .iter()
                .filter(|f| !f.is_static && !is_interface)
                .enumerate()
                .map(|(n, f)| FieldInfo {
                    name: f.name.name.clone(),
                    ty: f.ty.clone(),
                    slot: base + n,
                    init: f.init.clone().map(Arc::new),
                })
                .collect();
            let mut statics: Vec<StaticInfo> = decl
                .enum_constants
                .iter()
                .map(|c| StaticInfo {
                    name: c.name.name.clone(),
                    ty: TypeRef::class(decl.name.name.clone()),
                    init: None,
                })
                .collect();
            statics.extend(
                decl.fields
                    .iter()
                    .filter(|f| f.is_static || is_interface)
                    .map(|f| StaticInfo {
                        name: f.name.name.clone(),
                        ty: f.ty.clone(),
                        init: f.init.clone().map(Arc::new),
                    }),
            );
            let static_values = statics.iter().map(|s| Value::default_for(&s.ty)).collect();
            let enclosing = p.enclosing.map(|e| ClassId(e as u32));
            let is_anonymous = p.anon_base.is_some();
            let needs_outer = match enclosing {
                Some(_) if is_anonymous => true,
                Some(_) => decl.kind == ClassKind::Class && !decl.is_static,
                None => false,
            };
            debug!(
                class = %p.qualified,
                fields = base + fields.len(),
                statics = statics.len(),
                "loaded class"
            );
            classes.push(ClassDescriptor {
                id: ClassId(i as u32),
                name: decl.name.name.clone(),
                kind: decl.kind,
                is_abstract: decl.is_abstract || is_interface,
                superclass,
                interfaces,
                enclosing,
                needs_outer,
                is_anonymous,
                is_prelude: p.is_prelude,
                type_params: decl.type_params.clone(),
                field_count: base + fields.len(),
                fields,
                statics,
                static_values: Mutex::new(static_values),
                init_state: AtomicU8::new(UNINIT),
                init_owner: Mutex::new(None),
                init_done: Condvar::new(),
                methods: decl.methods.into_iter().map(Arc::new).collect(),
                constructors: decl.constructors.into_iter().map(Arc::new).collect(),
                static_blocks: decl.static_blocks.into_iter().map(Arc::new).collect(),
                enum_constants: decl.enum_constants,
                span: decl.span,
            });
        }
        Ok(Self { classes, by_name })
    }
}

/// A registered, non-interface class named by `ty`.
fn lookup_class(
    lookup: &impl Fn(&str) -> Option<ClassId>,
    ty: &TypeRef,
    pending: &[Pending],
) -> Option<ClassId> {
    let id = lookup(ty.simple_name()?)?;
    (!pending[id.index()].decl.is_interface()).then_some(id)
}

fn layout(
    i: usize,
    pending: &[Pending],
    supers: &[(Option<ClassId>, Vec<String>)],
    counts: &mut [Option<usize>],
) -> usize {
    if let Some(n) = counts[i] {
        return n;
    }
    let base = supers[i]
        .0
        .map_or(0, |s| layout(s.index(), pending, supers, counts));
    let decl = &pending[i].decl;
    let own = if decl.is_interface() {
        0
    } else {
        decl.fields.iter().filter(|f| !f.is_static).count()
    };
    counts[i] = Some(base + own);
    base + own
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::prelude_classes;
    use javelin_types::build::*;

    fn load(classes: Vec<ClassDecl>) -> ClassRegistry {
        ClassRegistry::load(&prelude_classes(), &program(classes, vec![])).unwrap()
    }

    #[test]
    fn test_field_layout_puts_ancestors_first() {
        let reg = load(vec![
            class("A").field("int", "x").field("int", "y").build(),
            class("B").extends("A").field("int", "z").build(),
        ]);
        let b = reg.lookup("B").unwrap();
        assert_eq!(reg.get(b).field_count, 3);
        assert_eq!(reg.find_field(b, "z").unwrap().slot, 2);
        assert_eq!(reg.find_field(b, "x").unwrap().slot, 0);
    }

    #[test]
    fn test_shadowed_field_resolves_most_derived() {
        let reg = load(vec![
            class("A").field("int", "x").build(),
            class("B").extends("A").field("int", "x").build(),
        ]);
        let b = reg.lookup("B").unwrap();
        assert_eq!(reg.find_field(b, "x").unwrap().slot, 1);
        let a = reg.ancestor_at(b, 1).unwrap();
        assert_eq!(reg.get(a).own_field("x").unwrap().slot, 0);
    }

    #[test]
    fn test_is_a_through_interfaces() {
        let reg = load(vec![
            interface("Shape").build(),
            interface("Round").extends("Shape").build(),
            class("Circle").implements("Round").build(),
            class("Task").implements("Runnable").build(),
        ]);
        let circle = reg.lookup("Circle").unwrap();
        assert!(reg.is_a(circle, "Shape"));
        assert!(reg.is_a(circle, "Object"));
        assert!(!reg.is_a(circle, "Runnable"));
        assert!(reg.is_a(reg.lookup("Task").unwrap(), "Runnable"));
    }

    #[test]
    fn test_nested_classes_by_qualified_name() {
        let reg = load(vec![class("A")
            .inner(class("B").inner(class("C").field("int", "v")))
            .build()]);
        let c = reg.lookup("A.B.C").unwrap();
        assert_eq!(reg.lookup("C"), Some(c));
        assert!(reg.get(c).needs_outer);
        assert_eq!(reg.name_of(reg.get(c).enclosing.unwrap()), "B");
    }

    #[test]
    fn test_resolve_prefers_nested_over_global() {
        let reg = load(vec![
            class("Node").build(),
            class("Tree").inner(class("Node").field("int", "v")).build(),
        ]);
        let tree = reg.lookup("Tree").unwrap();
        let global = reg.lookup("Node").unwrap();
        let nested = reg.resolve(Some(tree), "Node").unwrap();
        assert_ne!(nested, global);
        assert_eq!(reg.get(nested).enclosing, Some(tree));
        assert_eq!(reg.resolve(None, "Node"), Some(global));
    }

    #[test]
    fn test_anonymous_body_extends_class_or_implements_interface() {
        let reg = load(vec![class("Main")
            .method(method(
                "void",
                "go",
                &[],
                vec![
                    stmt(new_anon("Runnable", vec![], anon_body("Runnable"))),
                    stmt(new_anon("Main", vec![], anon_body("Main"))),
                ],
            ))
            .build()]);
        let anons: Vec<_> = reg.iter().filter(|c| c.is_anonymous).collect();
        assert_eq!(anons.len(), 2);
        assert!(anons[0].interfaces.contains(&"Runnable".to_string()));
        assert_eq!(anons[1].superclass, reg.lookup("Main"));
        assert!(anons.iter().all(|a| a.needs_outer));
    }

    #[test]
    fn test_unknown_superclass_fails() {
        let err = ClassRegistry::load(
            &prelude_classes(),
            &program(vec![class("A").extends("Missing").build()], vec![]),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Load(msg) if msg.contains("Missing")));
    }

    #[test]
    fn test_cycle_detected() {
        let err = ClassRegistry::load(
            &prelude_classes(),
            &program(
                vec![
                    class("A").extends("B").build(),
                    class("B").extends("A").build(),
                ],
                vec![],
            ),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Load(msg) if msg.contains("cyclic")));
    }

    #[test]
    fn test_enum_constants_are_statics() {
        let reg = load(vec![enumeration("Color")
            .constant("RED", vec![])
            .constant("GREEN", vec![])
            .static_field("int", "count", Some(int(2)))
            .build()]);
        let color = reg.get(reg.lookup("Color").unwrap());
        assert_eq!(color.static_index("GREEN"), Some(1));
        assert_eq!(color.static_index("count"), Some(2));
        assert!(matches!(color.get_static(2), Value::Int(0)));
    }

    #[test]
    fn test_overload_candidates_most_derived_first() {
        let reg = load(vec![
            class("A")
                .method(method("int", "f", &[("int", "x")], vec![ret(int(1))]))
                .build(),
            class("B")
                .extends("A")
                .method(method("int", "f", &[("int", "x")], vec![ret(int(2))]))
                .build(),
        ]);
        let b = reg.lookup("B").unwrap();
        let found = reg.methods(b, "f", 1);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, b);
        assert!(reg.methods(b, "f", 2).is_empty());
    }

    #[test]
    fn test_static_init_claimed_once() {
        let reg = load(vec![class("A").build()]);
        let a = reg.get(reg.lookup("A").unwrap());
        assert!(a.begin_init());
        assert!(!a.begin_init());
        assert!(!a.is_initialized());
        a.finish_init();
        assert!(a.is_initialized());
    }

    #[test]
    fn test_other_threads_block_until_init_finishes() {
        let reg = load(vec![class("A").build()]);
        let a = reg.get(reg.lookup("A").unwrap());
        assert!(a.begin_init());
        // The initializing thread never waits on itself.
        a.wait_init();
        std::thread::scope(|s| {
            let waiter = s.spawn(|| {
                a.wait_init();
                a.is_initialized()
            });
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert!(!waiter.is_finished());
            a.finish_init();
            assert!(waiter.join().unwrap());
        });
    }
}
