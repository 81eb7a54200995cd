//! Variable table and lexical scopes.
//!
//! The parser declares every variable here as it goes and resolves each
//! identifier to the innermost visible declaration, so that expressions carry
//! identities rather than names.

use crate::frontend::ast::{Type, VarRef};
use crate::utils::intern::Symbol;
use crate::utils::location::Span;
use serde::Serialize;
use std::collections::HashMap;

/// Identity of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub u32);

/// A declared variable.
#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    pub name: Symbol,
    pub ty: Type,
    pub span: Span,
    /// True for names used without a visible declaration (kernel-external
    /// symbols such as a bound `N`).
    pub implicit: bool,
}

/// Owner of all variables in a program. [`VarId`]s index into it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VarTable {
    vars: Vec<Variable>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: Symbol, ty: Type, span: Span) -> VarRef {
        self.push(Variable { name, ty, span, implicit: false })
    }

    pub fn declare_implicit(&mut self, name: Symbol, span: Span) -> VarRef {
        self.push(Variable { name, ty: Type::Int, span, implicit: true })
    }

    fn push(&mut self, var: Variable) -> VarRef {
        let id = VarId(self.vars.len() as u32);
        let name = var.name;
        self.vars.push(var);
        VarRef::new(id, name)
    }

    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.vars.get(id.0 as usize)
    }

    /// Declared type of `id`, if it exists.
    pub fn ty(&self, id: VarId) -> Option<&Type> {
        self.get(id).map(|v| &v.ty)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<Symbol, VarRef>,
    parent: Option<usize>,
}

/// A stack of lexical scopes over a [`VarTable`].
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
    current_scope: usize,
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            current_scope: 0,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope { symbols: HashMap::new(), parent: Some(self.current_scope) });
        self.current_scope = self.scopes.len() - 1;
    }

    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current_scope].parent {
            self.current_scope = parent;
        }
    }

    /// Declare `name` in the current scope. A redeclaration in the same scope
    /// replaces the visible binding and reports `true`.
    pub fn declare(&mut self, table: &mut VarTable, name: Symbol, ty: Type, span: Span) -> (VarRef, bool) {
        let var = table.declare(name, ty, span);
        let duplicate = self.scopes[self.current_scope].symbols.insert(name, var).is_some();
        (var, duplicate)
    }

    /// Resolve `name`, declaring it implicitly in the outermost function
    /// scope when no declaration is visible.
    pub fn resolve_or_declare(&mut self, table: &mut VarTable, name: Symbol, span: Span) -> VarRef {
        if let Some(var) = self.lookup(name) {
            return var;
        }
        let var = table.declare_implicit(name, span);
        let target = self.function_scope();
        self.scopes[target].symbols.insert(name, var);
        var
    }

    pub fn lookup(&self, name: Symbol) -> Option<VarRef> {
        let mut scope_idx = Some(self.current_scope);
        while let Some(idx) = scope_idx {
            if let Some(var) = self.scopes[idx].symbols.get(&name) {
                return Some(*var);
            }
            scope_idx = self.scopes[idx].parent;
        }
        None
    }

    /// The scope directly below the global one on the current chain.
    fn function_scope(&self) -> usize {
        let mut idx = self.current_scope;
        while let Some(parent) = self.scopes[idx].parent {
            if parent == 0 {
                return idx;
            }
            idx = parent;
        }
        idx
    }
}

impl Default for Scopes {
    fn default() -> Self { Self::new() }
}
