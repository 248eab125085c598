//! Local variable environment with lexically scoped bindings.
//!
//! [`TypeEnv`] manages a stack of scopes, each carrying local bindings and
//! the kind of code that opened it.

use std::collections::HashMap;

use crate::ty::Type;

// ══════════════════════════════════════════════════════════════════════════════
// Scope Kind
// ══════════════════════════════════════════════════════════════════════════════

/// What kind of code context a scope represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The entry statements.
    Main,
    /// A method, constructor or initializer body.
    Member,
    /// A block, loop or catch body.
    Block,
    /// A lambda body.
    Lambda,
}

// ══════════════════════════════════════════════════════════════════════════════
// Scope
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: HashMap<String, Type>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            bindings: HashMap::new(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// TypeEnv
// ══════════════════════════════════════════════════════════════════════════════

/// A stack of scopes for local name resolution.
#[derive(Debug)]
pub struct TypeEnv {
    scopes: Vec<Scope>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Main)],
        }
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the root scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Define a binding in the innermost scope. Returns `false` if the name
    /// is already defined there.
    pub fn define(&mut self, name: &str, ty: Type) -> bool {
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        if scope.bindings.contains_key(name) {
            return false;
        }
        scope.bindings.insert(name.to_string(), ty);
        true
    }

    /// Look up a local, innermost scope first. Lookup does not cross a
    /// member boundary: locals of an enclosing method are invisible inside a
    /// nested class body.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.bindings.get(name) {
                return Some(ty);
            }
            if scope.kind == ScopeKind::Member {
                break;
            }
        }
        None
    }

    pub fn current_scope_kind(&self) -> ScopeKind {
        self.scopes.last().map_or(ScopeKind::Main, |s| s.kind)
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_types::ast::PrimType;

    #[test]
    fn test_redefinition_in_same_scope() {
        let mut env = TypeEnv::new();
        assert!(env.define("x", Type::Prim(PrimType::Int)));
        assert!(!env.define("x", Type::String));
        env.push_scope(ScopeKind::Block);
        assert!(env.define("x", Type::String));
        assert_eq!(env.lookup("x"), Some(&Type::String));
        env.pop_scope();
        assert_eq!(env.lookup("x"), Some(&Type::Prim(PrimType::Int)));
    }

    #[test]
    fn test_member_scope_hides_outer_locals() {
        let mut env = TypeEnv::new();
        env.define("outer", Type::String);
        env.push_scope(ScopeKind::Lambda);
        assert!(env.lookup("outer").is_some());
        env.push_scope(ScopeKind::Member);
        assert!(env.lookup("outer").is_none());
        assert_eq!(env.current_scope_kind(), ScopeKind::Member);
    }
}
