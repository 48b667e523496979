//! Scope graph data structures — spec.md §3.
//!
//! Scopes and variables reference each other only by index
//! (`ScopeId`/`VariableId`), never by owned/borrowed pointer, which is what
//! lets a function scope point back at the declaration that opened it while
//! that declaration's own `VariableInfo` sits in the *parent* scope without
//! any ownership cycle — the same arena-by-index discipline
//! `red_knot_python_semantic::semantic_index::symbol::{FileScopeId,
//! ScopedSymbolId}` uses, hand-written here since the macro that generates
//! it (`ruff_index::newtype_index!`) isn't a crate this workspace can depend
//! on (spec.md §9, "Cyclic scope references").

use std::fmt;

use indexmap::IndexMap;

use crate::graph::types::TypeId;
use crate::location::Meta;
use crate::name::Name;

macro_rules! newtype_index {
    ($name:ident) => {
        #[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn from_usize(index: usize) -> Self {
                Self(u32::try_from(index).expect("arena index overflowed u32"))
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

newtype_index!(ScopeId);
newtype_index!(VariableId);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ScopeKind {
    Block,
    Function,
    Object,
    Class,
}

/// A key into a [`Scope`]'s `body`. The reserved `[[TypeScope]]` binding is
/// a distinct enum variant rather than a magic string, so it can never
/// collide with a user identifier (spec.md §9, "Reserved scope keys").
/// Location-derived scope keys (spec.md §4.3, "scope keys are derived from
/// the node's source location") are ordinary `Name`s built from
/// [`crate::location::Loc::key`] — they share the identifier namespace only
/// in representation, never in practice, since `loc.key()`'s `:`/`-`
/// characters can't appear in a parsed identifier.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum BindingKey {
    Name(Name),
    TypeScope,
}

impl BindingKey {
    pub fn name(name: impl Into<Name>) -> Self {
        Self::Name(name.into())
    }

    pub fn scope_key(loc: crate::location::Loc) -> Self {
        Self::Name(Name::new(&loc.key()))
    }
}

impl From<&str> for BindingKey {
    fn from(value: &str) -> Self {
        Self::name(value)
    }
}

/// What a [`BindingKey`] resolves to inside a scope's `body`: a plain
/// value binding, a nested lexical scope (recorded under its
/// location-derived key), or — inside a type scope only — an interned
/// named type.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Binding {
    Variable(VariableId),
    Scope(ScopeId),
    Type(TypeId),
}

/// `(type, parent_scope, meta, throwable?)` — spec.md §3. `ty` is mutated
/// in place through Pass 2's lifecycle (allocated → annotated-or-undefined
/// → inferred → frozen); single-threaded (§5), so a plain field needs no
/// interior mutability.
#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub ty: TypeId,
    pub parent_scope: ScopeId,
    pub meta: Meta,
    pub throwable: Option<Vec<TypeId>>,
}

impl VariableInfo {
    pub fn new(ty: TypeId, parent_scope: ScopeId, meta: Meta) -> Self {
        Self {
            ty,
            parent_scope,
            meta,
            throwable: None,
        }
    }
}

use crate::graph::call::CallId;

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub body: IndexMap<BindingKey, Binding>,
    pub declaration: Option<VariableId>,
    pub calls: Vec<CallId>,
    pub throwable: Option<Vec<TypeId>>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            body: IndexMap::new(),
            declaration: None,
            calls: Vec::new(),
            throwable: None,
        }
    }

    pub fn accumulates_calls(&self) -> bool {
        matches!(self.kind, ScopeKind::Function) || self.parent.is_none()
    }

    pub fn type_scope(&self) -> Option<ScopeId> {
        match self.body.get(&BindingKey::TypeScope) {
            Some(Binding::Scope(id)) => Some(*id),
            _ => None,
        }
    }
}
