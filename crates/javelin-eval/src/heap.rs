//! The shared object heap.
//!
//! Every execution context holds an `Arc` to one `Heap`. Each entry sits
//! behind its own lock, so operations on different objects never contend and
//! a single field or element update is atomic.

use std::sync::Arc;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use javelin_types::ast::TypeRef;
use parking_lot::{Mutex, RwLock};

use crate::class::ClassId;
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::threads::ThreadSignal;
use crate::value::Value;

// ══════════════════════════════════════════════════════════════════════════════
// Handles
// ══════════════════════════════════════════════════════════════════════════════

/// Handle to a heap entry. Equality is reference identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(u32);

impl ObjRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Identity hash, as `Object.hashCode` reports it.
    pub fn identity_hash(self) -> i32 {
        (self.0 as i32).wrapping_mul(0x1b87_3593).wrapping_add(0x2a5f_11c3) & 0x7fff_ffff
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Objects
// ══════════════════════════════════════════════════════════════════════════════

/// List flavours sharing one representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    ArrayList,
    LinkedList,
    Stack,
}

impl ListKind {
    pub fn name(self) -> &'static str {
        match self {
            ListKind::ArrayList => "ArrayList",
            ListKind::LinkedList => "LinkedList",
            ListKind::Stack => "Stack",
        }
    }
}

/// Runtime state a program cannot reach through fields.
#[derive(Debug, Clone, Default)]
pub enum NativeSlot {
    #[default]
    None,
    Enum {
        ordinal: i32,
        name: Arc<str>,
    },
    Thread(Arc<ThreadSignal>),
}

/// An instance of a program or prelude class.
#[derive(Debug, Clone)]
pub struct Instance {
    pub class: ClassId,
    /// Field values in layout order (ancestor fields first).
    pub fields: Vec<Value>,
    /// Enclosing instance of an inner or anonymous class.
    pub outer: Option<ObjRef>,
    /// Scope chain an anonymous class body was created in.
    pub captured: Option<Arc<Environment>>,
    pub native: NativeSlot,
}

#[derive(Debug, Clone)]
pub enum HeapObject {
    Instance(Instance),
    Array { elem: TypeRef, items: Vec<Value> },
    List { kind: ListKind, items: Vec<Value> },
    /// Insertion-ordered map: key → (original key, value).
    Map(IndexMap<HashKey, (Value, Value)>),
    /// Insertion-ordered set: key → original element.
    Set(IndexMap<HashKey, Value>),
    /// Iterator over a snapshot of a collection.
    Iterator { items: Vec<Value>, pos: usize },
}

impl HeapObject {
    /// Library type name, or `None` for class instances.
    pub fn library_name(&self) -> Option<&'static str> {
        Some(match self {
            HeapObject::Instance(_) => return None,
            HeapObject::Array { .. } => "Array",
            HeapObject::List { kind, .. } => kind.name(),
            HeapObject::Map(_) => "HashMap",
            HeapObject::Set(_) => "HashSet",
            HeapObject::Iterator { .. } => "Iterator",
        })
    }

    /// Elements in iteration order, for collections and arrays.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            HeapObject::Array { items, .. } | HeapObject::List { items, .. } => {
                Some(items.clone())
            }
            HeapObject::Set(set) => Some(set.values().cloned().collect()),
            _ => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Hash keys
// ══════════════════════════════════════════════════════════════════════════════

/// Key under which a value is stored in a HashMap or HashSet.
///
/// Values compare by content for strings, boxed numerics and dates, and by
/// identity for heap objects and closures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Null,
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    Str(Arc<str>),
    Ref(ObjRef),
    Closure(usize),
    Optional(Option<Box<HashKey>>),
    DateTime(NaiveDateTime),
}

impl HashKey {
    pub fn of(value: &Value) -> HashKey {
        match value {
            Value::Null => HashKey::Null,
            Value::Bool(b) => HashKey::Bool(*b),
            Value::Char(c) => HashKey::Char(*c),
            Value::Int(i) => HashKey::Int(*i),
            Value::Long(l) => HashKey::Long(*l),
            Value::Float(f) => HashKey::Float(f.to_bits()),
            Value::Double(d) => HashKey::Double(d.to_bits()),
            Value::Str(s) => HashKey::Str(s.clone()),
            Value::Boxed(b) => HashKey::of(b.get()),
            Value::Ref(r) => HashKey::Ref(*r),
            Value::Closure(c) => HashKey::Closure(Arc::as_ptr(c) as usize),
            Value::Optional(o) => HashKey::Optional(o.as_ref().map(|v| Box::new(HashKey::of(v)))),
            Value::DateTime(dt) => HashKey::DateTime(*dt),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Heap
// ══════════════════════════════════════════════════════════════════════════════

type Entry = Arc<Mutex<HeapObject>>;

/// Append-only object store. Entries are never freed during a run.
#[derive(Debug, Default)]
pub struct Heap {
    objects: RwLock<Vec<Entry>>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&self, object: HeapObject) -> ObjRef {
        let mut objects = self.objects.write();
        objects.push(Arc::new(Mutex::new(object)));
        ObjRef((objects.len() - 1) as u32)
    }

    /// The lock guarding one entry. The table lock is released on return.
    pub fn entry(&self, r: ObjRef) -> EvalResult<Entry> {
        self.objects
            .read()
            .get(r.index())
            .cloned()
            .ok_or_else(|| EvalError::Runtime(format!("dangling object reference #{}", r.0)))
    }

    /// Run `f` with exclusive access to one object.
    ///
    /// `f` must not touch the heap again: nested access to another entry
    /// could deadlock against a thread locking in the opposite order.
    pub fn with<T>(&self, r: ObjRef, f: impl FnOnce(&mut HeapObject) -> T) -> EvalResult<T> {
        let entry = self.entry(r)?;
        let mut guard = entry.lock();
        Ok(f(&mut guard))
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Convenience constructors ──

    pub fn alloc_array(&self, elem: TypeRef, items: Vec<Value>) -> Value {
        Value::Ref(self.alloc(HeapObject::Array { elem, items }))
    }

    pub fn alloc_list(&self, kind: ListKind, items: Vec<Value>) -> Value {
        Value::Ref(self.alloc(HeapObject::List { kind, items }))
    }

    pub fn alloc_iterator(&self, items: Vec<Value>) -> Value {
        Value::Ref(self.alloc(HeapObject::Iterator { items, pos: 0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_types::ast::PrimType;

    #[test]
    fn test_alloc_and_mutate() {
        let heap = Heap::new();
        let r = heap.alloc(HeapObject::Array {
            elem: TypeRef::Prim(PrimType::Int),
            items: vec![Value::Int(1), Value::Int(2)],
        });
        heap.with(r, |obj| {
            if let HeapObject::Array { items, .. } = obj {
                items[0] = Value::Int(10);
            }
        })
        .unwrap();
        let first = heap
            .with(r, |obj| match obj {
                HeapObject::Array { items, .. } => items[0].as_i64(),
                _ => None,
            })
            .unwrap();
        assert_eq!(first, Some(10));
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_dangling_reference() {
        let heap = Heap::new();
        assert!(heap.entry(ObjRef(3)).is_err());
    }

    #[test]
    fn test_hash_key_unboxes() {
        let boxed = crate::value::Boxed::new(Value::Int(5));
        assert_eq!(HashKey::of(&boxed), HashKey::of(&Value::Int(5)));
        assert_ne!(HashKey::of(&Value::Int(5)), HashKey::of(&Value::Long(5)));
        assert_eq!(HashKey::of(&Value::str("a")), HashKey::of(&Value::str("a")));
    }

    #[test]
    fn test_library_names() {
        let set = HeapObject::Set(IndexMap::new());
        assert_eq!(set.library_name(), Some("HashSet"));
        let stack = HeapObject::List {
            kind: ListKind::Stack,
            items: vec![],
        };
        assert_eq!(stack.library_name(), Some("Stack"));
    }

    #[test]
    fn test_concurrent_alloc() {
        let heap = Arc::new(Heap::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let heap = heap.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        heap.alloc_list(ListKind::ArrayList, Vec::new());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(heap.len(), 400);
    }
}
