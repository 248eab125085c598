//! Scoped variable environment for the Javelin evaluator.

use std::sync::Arc;

use javelin_types::ast::TypeRef;
use parking_lot::Mutex;

use crate::value::Value;

/// A mutable variable cell. Closures and anonymous class bodies hold the
/// same cell as the scope that declared the variable.
pub type Slot = Arc<Mutex<Value>>;

#[derive(Debug, Clone)]
struct Binding {
    name: Arc<str>,
    ty: TypeRef,
    slot: Slot,
}

/// A single scope level.
#[derive(Debug, Clone, Default)]
struct Scope {
    bindings: Vec<Binding>,
}

impl Scope {
    fn find(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().rev().find(|b| &*b.name == name)
    }
}

/// Scoped variable environment with push/pop semantics.
///
/// Variables are looked up from innermost scope outward. `define` always
/// creates in the innermost scope. Cloning an environment shares every cell,
/// which is how lambdas capture the variables they close over.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    /// Create a new environment with one root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope. The root scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Define a variable in the innermost scope, returning its cell.
    pub fn define(&mut self, name: &str, ty: TypeRef, value: Value) -> Slot {
        let slot = Arc::new(Mutex::new(value));
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.push(Binding {
                name: Arc::from(name),
                ty,
                slot: slot.clone(),
            });
        }
        slot
    }

    /// Whether `name` is declared in the innermost scope.
    pub fn declared_here(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.find(name).is_some())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.find(name).is_some())
    }

    /// The cell and declared type of a variable.
    pub fn lookup(&self, name: &str) -> Option<(Slot, TypeRef)> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.find(name))
            .map(|b| (b.slot.clone(), b.ty.clone()))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.find(name))
            .map(|b| b.slot.lock().clone())
    }

    /// Update a variable in the innermost scope that declares it.
    /// Returns `false` if the name is not bound.
    pub fn set(&self, name: &str, value: Value) -> bool {
        match self.scopes.iter().rev().find_map(|s| s.find(name)) {
            Some(b) => {
                *b.slot.lock() = value;
                true
            }
            None => false,
        }
    }

    /// Give every variable of the innermost scope a fresh cell holding its
    /// current value.
    ///
    /// Loops call this between iterations, so a closure created in one
    /// iteration keeps that iteration's value of the loop variable.
    pub fn refresh_scope(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            for b in &mut scope.bindings {
                let current = b.slot.lock().clone();
                b.slot = Arc::new(Mutex::new(current));
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_types::ast::PrimType;

    fn int_ty() -> TypeRef {
        TypeRef::Prim(PrimType::Int)
    }

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("x", int_ty(), Value::Int(1));
        assert!(matches!(env.get("x"), Some(Value::Int(1))));
        assert!(env.get("y").is_none());
    }

    #[test]
    fn test_inner_scope_shadows_and_pops() {
        let mut env = Environment::new();
        env.define("x", int_ty(), Value::Int(1));
        env.push_scope();
        env.define("x", int_ty(), Value::Int(2));
        assert!(matches!(env.get("x"), Some(Value::Int(2))));
        env.pop_scope();
        assert!(matches!(env.get("x"), Some(Value::Int(1))));
    }

    #[test]
    fn test_set_updates_outer_cell() {
        let mut env = Environment::new();
        env.define("x", int_ty(), Value::Int(1));
        env.push_scope();
        assert!(env.set("x", Value::Int(5)));
        env.pop_scope();
        assert!(matches!(env.get("x"), Some(Value::Int(5))));
        assert!(!env.set("missing", Value::Null));
    }

    #[test]
    fn test_clone_shares_cells() {
        let mut env = Environment::new();
        env.define("count", int_ty(), Value::Int(0));
        let captured = env.clone();
        captured.set("count", Value::Int(7));
        assert!(matches!(env.get("count"), Some(Value::Int(7))));
    }

    #[test]
    fn test_refresh_scope_detaches_captures() {
        let mut env = Environment::new();
        env.push_scope();
        env.define("i", int_ty(), Value::Int(0));
        let first_iteration = env.clone();
        env.refresh_scope();
        env.set("i", Value::Int(1));
        assert!(matches!(first_iteration.get("i"), Some(Value::Int(0))));
        assert!(matches!(env.get("i"), Some(Value::Int(1))));
    }

    #[test]
    fn test_root_scope_survives_pop() {
        let mut env = Environment::new();
        env.define("x", int_ty(), Value::Int(1));
        env.pop_scope();
        assert_eq!(env.depth(), 1);
        assert!(env.declared_here("x"));
    }
}
