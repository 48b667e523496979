//! The type lattice and its interning discipline — spec.md §3.
//!
//! Types are interned by canonical name *within their owning type scope*:
//! asking for a type whose name already exists there returns the existing
//! id. Grounded on `red_knot_python_semantic::types`/`types::intern`'s
//! interned-type-as-id pattern, with the sentinel-constant style (a fixed,
//! always-present `undefined` type per type scope) drawn from the
//! intrinsic-type-id convention in the pack's TypeScript-solver reference
//! file.

use std::fmt;

use crate::graph::scope::{Binding, BindingKey, ScopeId};
use crate::graph::ModuleScopeGraph;
use crate::name::Name;

#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub(crate) fn from_usize(index: usize) -> Self {
        Self(u32::try_from(index).expect("arena index overflowed u32"))
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// The sentinel name every fresh, not-yet-inferred `VariableInfo.ty` starts
/// as (spec.md §3, "a sentinel `undefined` type").
pub const UNDEFINED: &str = "undefined";
/// The catch-all type the inference oracle falls back to for forms it
/// cannot narrow further.
pub const MIXED: &str = "mixed";

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive(Name),
    Var(Name, Option<TypeId>),
    Object(Name, Vec<(Name, TypeId)>),
    Function(Vec<TypeId>, TypeId, Option<Vec<TypeId>>),
    Generic(Name, Vec<TypeId>, ScopeId, TypeId),
}

impl Type {
    /// The stable string encoding spec.md §3 calls a type's "name" — used
    /// both as the interning key and as `FunctionType`'s canonical literal
    /// `(T1, T2) => R`.
    pub fn canonical_name(&self, graph: &ModuleScopeGraph) -> Name {
        match self {
            Type::Primitive(name) | Type::Var(name, _) | Type::Object(name, _) | Type::Generic(name, ..) => {
                name.clone()
            }
            Type::Function(args, ret, _) => {
                let arg_names: Vec<String> = args.iter().map(|id| graph.type_name(*id).to_string()).collect();
                Name::from(format!("({}) => {}", arg_names.join(", "), graph.type_name(*ret)))
            }
        }
    }
}

impl ModuleScopeGraph {
    /// Interns a type under `name` inside `type_scope`, constructing it via
    /// `build` only the first time that name is seen there (spec.md §3,
    /// "creating a type with a name that already exists in the target type
    /// scope yields the existing instance").
    pub fn intern_type(&mut self, type_scope: ScopeId, name: &Name, build: impl FnOnce() -> Type) -> TypeId {
        let key = BindingKey::name(name.clone());
        if let Some(Binding::Type(id)) = self.scope(type_scope).body.get(&key) {
            return *id;
        }
        let ty = build();
        let id = self.push_type(ty);
        self.scope_mut(type_scope).body.insert(key, Binding::Type(id));
        id
    }

    pub fn intern_primitive(&mut self, type_scope: ScopeId, name: &str) -> TypeId {
        let name = Name::new(name);
        self.intern_type(type_scope, &name, || Type::Primitive(name.clone()))
    }

    pub fn intern_function(
        &mut self,
        type_scope: ScopeId,
        args: Vec<TypeId>,
        ret: TypeId,
        throwable: Option<Vec<TypeId>>,
    ) -> TypeId {
        let ty = Type::Function(args, ret, throwable);
        let name = ty.canonical_name(self);
        self.intern_type(type_scope, &name, || ty)
    }

    pub fn intern_object(&mut self, type_scope: ScopeId, name: &Name, properties: Vec<(Name, TypeId)>) -> TypeId {
        let owned = name.clone();
        self.intern_type(type_scope, &owned, || Type::Object(owned.clone(), properties))
    }

    pub fn intern_var(&mut self, type_scope: ScopeId, name: &Name, constraint: Option<TypeId>) -> TypeId {
        let owned = name.clone();
        self.intern_type(type_scope, &owned, || Type::Var(owned.clone(), constraint))
    }

    pub fn intern_generic(
        &mut self,
        type_scope: ScopeId,
        name: &Name,
        type_params: Vec<TypeId>,
        local_type_scope: ScopeId,
        subordinate: TypeId,
    ) -> TypeId {
        let owned = name.clone();
        self.intern_type(type_scope, &owned, || {
            Type::Generic(owned.clone(), type_params, local_type_scope, subordinate)
        })
    }

    /// The empty object type used when `new` invokes a callee whose
    /// invocation type isn't itself an object (spec.md §4.4, "new").
    pub fn empty_object(&mut self, type_scope: ScopeId) -> TypeId {
        self.intern_object(type_scope, &Name::new_static("object"), vec![])
    }

    pub fn type_name(&self, id: TypeId) -> Name {
        self.get_type(id).canonical_name(self)
    }

    /// Whether `id` resolves to a function type, directly or as a
    /// generic's subordinate — the shape every `CallMeta::target` must
    /// have (spec.md §3, last invariant).
    pub fn is_callable(&self, id: TypeId) -> bool {
        match self.get_type(id) {
            Type::Function(..) => true,
            Type::Generic(_, _, _, subordinate) => matches!(self.get_type(*subordinate), Type::Function(..)),
            _ => false,
        }
    }

    /// Unwraps a generic down to its subordinate function type, if any.
    pub fn as_function(&self, id: TypeId) -> Option<(&[TypeId], TypeId, Option<&[TypeId]>)> {
        match self.get_type(id) {
            Type::Function(args, ret, throwable) => Some((args, *ret, throwable.as_deref())),
            Type::Generic(_, _, _, subordinate) => self.as_function(*subordinate),
            _ => None,
        }
    }
}
