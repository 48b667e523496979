//! The scope graph: arenas for scopes, variables, types and calls, plus the
//! chain-walking operations the builder passes and the external
//! collaborators need — spec.md §3 and §9 ("Cyclic scope references").
//!
//! One [`ModuleScopeGraph`] is built per module and returned, immutable
//! from the caller's point of view, inside a
//! [`crate::driver::BuildResult`]. Grounded on
//! `red_knot_python_semantic::semantic_index::SemanticIndex` tying together
//! its own `symbol.rs`/`definition.rs`/`types.rs`, minus the Salsa
//! incrementality layer (see `DESIGN.md`).

pub mod builder;
pub mod call;
pub mod oracle;
pub mod scope;
pub mod types;

use call::{CallArg, CallId, CallMeta};
use scope::{Binding, BindingKey, Scope, ScopeId, ScopeKind, VariableId, VariableInfo};
use types::{Type, TypeId};

use crate::name::Name;

#[derive(Debug)]
pub struct ModuleScopeGraph {
    scopes: Vec<Scope>,
    variables: Vec<VariableInfo>,
    types: Vec<Type>,
    calls: Vec<CallMeta>,
    module_scope: ScopeId,
}

impl ModuleScopeGraph {
    /// A fresh graph with just the module scope and its type scope —
    /// "empty program" boundary case (spec.md §8).
    pub fn new() -> Self {
        let mut graph = Self {
            scopes: Vec::new(),
            variables: Vec::new(),
            types: Vec::new(),
            calls: Vec::new(),
            module_scope: ScopeId::from_usize(0),
        };
        let mut module = Scope::new(ScopeKind::Block, None);
        module.throwable = None;
        let module_id = graph.push_scope_raw(module);
        graph.module_scope = module_id;

        let type_scope = graph.push_scope_raw(Scope::new(ScopeKind::Block, None));
        graph
            .scope_mut(module_id)
            .body
            .insert(BindingKey::TypeScope, Binding::Scope(type_scope));

        graph
    }

    pub fn module_scope(&self) -> ScopeId {
        self.module_scope
    }

    fn push_scope_raw(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId::from_usize(self.scopes.len());
        self.scopes.push(scope);
        id
    }

    pub fn push_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        self.push_scope_raw(Scope::new(kind, parent))
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn push_variable(&mut self, info: VariableInfo) -> VariableId {
        let id = VariableId::from_usize(self.variables.len());
        self.variables.push(info);
        id
    }

    pub fn variable(&self, id: VariableId) -> &VariableInfo {
        &self.variables[id.index()]
    }

    pub fn variable_mut(&mut self, id: VariableId) -> &mut VariableInfo {
        &mut self.variables[id.index()]
    }

    pub(crate) fn push_type(&mut self, ty: Type) -> TypeId {
        let id = TypeId::from_usize(self.types.len());
        self.types.push(ty);
        id
    }

    pub fn get_type(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn push_call(&mut self, owner: ScopeId, call: CallMeta) -> CallId {
        let id = CallId::from_usize(self.calls.len());
        self.calls.push(call);
        self.scope_mut(owner).calls.push(id);
        id
    }

    pub fn call(&self, id: CallId) -> &CallMeta {
        &self.calls[id.index()]
    }

    pub fn calls(&self) -> impl Iterator<Item = &CallMeta> {
        self.calls.iter()
    }

    /// Resolves a `CallArg` down to the type it denotes — a literal type
    /// as-is, or a variable's current `ty` field (spec.md §4.4, "arguments
    /// that are VariableInfos are lifted to their `type` field").
    pub fn resolve_arg(&self, arg: CallArg) -> TypeId {
        match arg {
            CallArg::Type(t) => t,
            CallArg::Variable(v) => self.variable(v).ty,
        }
    }

    /// Walks `scope`'s value-scope ancestor chain (inclusive) to find the
    /// type scope that owns it — the sibling stored under `[[TypeScope]]`
    /// on the nearest ancestor that has one (spec.md §3, "inherits by
    /// walking its value-scope ancestors").
    pub fn type_scope_of(&self, scope: ScopeId) -> ScopeId {
        let mut cur = scope;
        loop {
            if let Some(ts) = self.scope(cur).type_scope() {
                return ts;
            }
            cur = self
                .scope(cur)
                .parent
                .expect("module scope always owns a type scope");
        }
    }

    /// Returns `scope`'s own sibling type scope, creating one (parented at
    /// the enclosing type scope) if it doesn't have one yet. Used when a
    /// generic declaration needs a fresh local type scope to bind its type
    /// parameters into (spec.md §4.3, type alias / generic function
    /// handling).
    pub fn ensure_local_type_scope(&mut self, scope: ScopeId) -> ScopeId {
        if let Some(ts) = self.scope(scope).type_scope() {
            return ts;
        }
        let parent_ts = match self.scope(scope).parent {
            Some(parent) => self.type_scope_of(parent),
            None => self.type_scope_of(scope),
        };
        let new_ts = self.push_scope(ScopeKind::Block, Some(parent_ts));
        self.scope_mut(scope)
            .body
            .insert(BindingKey::TypeScope, Binding::Scope(new_ts));
        new_ts
    }

    /// Looks up `name` by walking `scope`'s value-scope ancestor chain,
    /// stopping at the first binding found (lexical shadowing).
    pub fn lookup_variable(&self, scope: ScopeId, name: &Name) -> Option<VariableId> {
        let key = BindingKey::name(name.clone());
        let mut cur = Some(scope);
        while let Some(id) = cur {
            if let Some(Binding::Variable(v)) = self.scope(id).body.get(&key) {
                return Some(*v);
            }
            cur = self.scope(id).parent;
        }
        None
    }

    /// Looks up a named type by walking the type-scope chain starting from
    /// `scope`'s owning type scope (spec.md §3, "looking up a type walks
    /// this chain").
    pub fn lookup_type(&self, scope: ScopeId, name: &Name) -> Option<TypeId> {
        self.lookup_type_in_scope_chain(self.type_scope_of(scope), name)
    }

    /// Looks up a named type starting directly from `type_scope` itself
    /// (rather than deriving one from a value scope), walking `.parent`
    /// from there. Used by annotation resolution, which already has a type
    /// scope in hand (spec.md §6, `getTypeFromTypeAnnotation`).
    pub fn lookup_type_in_scope_chain(&self, type_scope: ScopeId, name: &Name) -> Option<TypeId> {
        let key = BindingKey::name(name.clone());
        let mut cur = Some(type_scope);
        while let Some(id) = cur {
            if let Some(Binding::Type(t)) = self.scope(id).body.get(&key) {
                return Some(*t);
            }
            cur = self.scope(id).parent;
        }
        None
    }

    /// The nearest enclosing function scope, or the module scope if none —
    /// where a `CallMeta` gets recorded (spec.md §4.4).
    pub fn nearest_call_scope(&self, scope: ScopeId) -> ScopeId {
        let mut cur = scope;
        loop {
            if self.scope(cur).accumulates_calls() {
                return cur;
            }
            cur = self
                .scope(cur)
                .parent
                .expect("module scope always accumulates calls");
        }
    }

    /// The nearest enclosing scope with a throwable list — a try block or
    /// a function scope (spec.md §9, "throwable propagation").
    pub fn nearest_throwable_scope(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            if self.scope(id).throwable.is_some() {
                return Some(id);
            }
            cur = self.scope(id).parent;
        }
        None
    }

    pub fn append_throwable(&mut self, scope: ScopeId, ty: TypeId) {
        if let Some(throwable) = &mut self.scope_mut(scope).throwable {
            if !throwable.contains(&ty) {
                throwable.push(ty);
            }
        }
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes.iter().enumerate().map(|(i, s)| (ScopeId::from_usize(i), s))
    }
}

impl Default for ModuleScopeGraph {
    fn default() -> Self {
        Self::new()
    }
}
