//! External collaborator traits — spec.md §6.
//!
//! The node-level type inference, the function-body specialization pass,
//! and the whole-module call validation are each modeled as a narrow trait
//! rather than a free function, since their *implementations* are out of
//! scope (spec.md §1) and only their interface is the core's concern — the
//! same role `red_knot_python_semantic::types::infer` plays behind the
//! query functions the rest of that crate calls through. [`DefaultOracle`]
//! and [`DefaultCallChecker`] are the one minimal implementation this crate
//! ships, sufficient to carry literal/operator/function-call typing.

use crate::ast::{Literal, Node};
use crate::diagnostics::Diagnostic;
use crate::graph::scope::{Binding, ScopeId};
use crate::graph::types::{self, Type, TypeId};
use crate::graph::ModuleScopeGraph;

/// The scope context a single inference call runs under: the value scope
/// the node lexically sits in, and that scope's owning type scope.
#[derive(Debug, Clone, Copy)]
pub struct InferCtx {
    pub scope: ScopeId,
    pub type_scope: ScopeId,
}

impl InferCtx {
    pub fn new(scope: ScopeId, type_scope: ScopeId) -> Self {
        Self { scope, type_scope }
    }
}

pub trait InferenceOracle {
    /// Infers a single node's type in `ctx`.
    fn infer_node(&self, node: &Node, ctx: &InferCtx, graph: &mut ModuleScopeGraph) -> TypeId;

    /// Computes the type of values thrown inside a try block.
    fn infer_error_type(&self, try_node: &Node, ctx: &InferCtx, graph: &mut ModuleScopeGraph) -> TypeId;

    /// Refines a generic function's signature from evidence gathered while
    /// its body was walked (call sites observed against its declaration,
    /// its own recorded `"return"` calls).
    fn infer_function_by_scope(&self, scope: ScopeId, graph: &mut ModuleScopeGraph);

    /// Simulates invoking `callable` with `args`, returning the result type.
    fn invocation_type(&self, callable: TypeId, args: &[TypeId], graph: &mut ModuleScopeGraph) -> TypeId;
}

pub trait CallChecker {
    /// Validates every call recorded in `scope` against its target's
    /// resolved type, appending a diagnostic for each call whose target
    /// does not resolve to a function type.
    fn check_calls(&self, scope: ScopeId, diagnostics: &mut Vec<Diagnostic>, graph: &ModuleScopeGraph);
}

/// A minimal oracle: literals type to their primitive, identifiers type to
/// whatever their binding currently holds, everything else falls back to
/// `mixed`. Function invocation is structural (arity match, no deeper
/// argument-compatibility check) — enough for the single-call-site generic
/// specialization case this crate ships tests for.
#[derive(Debug, Default)]
pub struct DefaultOracle;

impl DefaultOracle {
    fn infer_literal(&self, literal: &Literal, type_scope: ScopeId, graph: &mut ModuleScopeGraph) -> TypeId {
        match literal {
            Literal::Number(_) => graph.intern_primitive(type_scope, "number"),
            Literal::String(_) => graph.intern_primitive(type_scope, "string"),
            Literal::Boolean(_) => graph.intern_primitive(type_scope, "boolean"),
            Literal::Null => graph.intern_primitive(type_scope, "null"),
            Literal::Undefined => graph.intern_primitive(type_scope, types::UNDEFINED),
        }
    }
}

impl InferenceOracle for DefaultOracle {
    fn infer_node(&self, node: &Node, ctx: &InferCtx, graph: &mut ModuleScopeGraph) -> TypeId {
        match node {
            Node::Literal { value, .. } => self.infer_literal(value, ctx.type_scope, graph),
            Node::Identifier { name, .. } => graph
                .lookup_variable(ctx.scope, name)
                .map(|v| graph.variable(v).ty)
                .unwrap_or_else(|| graph.intern_primitive(ctx.type_scope, types::MIXED)),
            _ => graph.intern_primitive(ctx.type_scope, types::MIXED),
        }
    }

    fn infer_error_type(&self, try_node: &Node, ctx: &InferCtx, graph: &mut ModuleScopeGraph) -> TypeId {
        // `ctx.scope` is the try block's own scope (see `reduce_try`), so its
        // `throwable` list is exactly what the block accumulated while Pass 2
        // walked it. A single thrown type is adopted directly; more than one
        // falls back to `mixed` rather than attempting a proper union type.
        let _ = try_node;
        match graph.scope(ctx.scope).throwable.as_deref() {
            Some([single]) => *single,
            _ => graph.intern_primitive(ctx.type_scope, types::MIXED),
        }
    }

    fn infer_function_by_scope(&self, scope: ScopeId, graph: &mut ModuleScopeGraph) {
        let Some(declaration) = graph.scope(scope).declaration else {
            return;
        };
        let declared_ty = graph.variable(declaration).ty;

        // Only a signature the declaration pass itself judged generic (own
        // type parameters, or a parameter/return left at the undefined
        // sentinel) is eligible for specialization — a fully concrete,
        // explicitly-annotated signature is frozen from declaration on.
        if !matches!(graph.get_type(declared_ty), Type::Generic(..)) {
            return;
        }
        let Some((original_params, original_ret, throwable)) = graph.as_function(declared_ty) else {
            return;
        };
        let original_params = original_params.to_vec();
        let throwable = throwable.map(<[TypeId]>::to_vec);

        // A single observed call site against this declaration anywhere in
        // the module specializes the parameter types (spec.md §8 scenario
        // 2); more than one call site keeps the original signature, since
        // picking among conflicting evidence needs deeper analysis this
        // minimal oracle doesn't attempt.
        let call_sites: Vec<&crate::graph::call::CallMeta> = graph
            .calls()
            .filter(|call| call.target == declaration)
            .collect();
        let [call] = call_sites.as_slice() else {
            return;
        };
        let arg_types: Vec<TypeId> = call.arguments.iter().map(|arg| graph.resolve_arg(*arg)).collect();

        // Parameters are the first bindings a function scope's body map
        // gets (declare_function_like inserts them before pass 1 ever
        // visits the body), in declaration order — rebinding the first
        // `arg_types.len()` entries carries the call-site evidence onto
        // the parameters themselves, not just the declaration's own type.
        // A parameter whose declared type is already concrete (not the
        // undefined sentinel, not one of this function's own type
        // variables) keeps its annotation; only the inferable slots move.
        let param_ids: Vec<_> = graph
            .scope(scope)
            .body
            .values()
            .filter_map(|binding| match binding {
                Binding::Variable(v) => Some(*v),
                _ => None,
            })
            .take(arg_types.len())
            .collect();
        for (i, param) in param_ids.iter().enumerate() {
            let Some(original) = original_params.get(i) else { continue };
            if !is_inferable(graph, *original) {
                continue;
            }
            graph.variable_mut(*param).ty = arg_types[i];
        }

        // Re-derive the return type from this function's own recorded
        // `return` calls now that its parameters carry call-site evidence
        // (spec.md §8 scenario 2: `return a;` narrows to `a`'s type) — but
        // only when the declared return itself was still inferable.
        let inferred_ret = if is_inferable(graph, original_ret) {
            graph
                .scope(scope)
                .calls
                .iter()
                .map(|id| graph.call(*id))
                .filter(|call| call.operator.as_str() == "return")
                .last()
                .and_then(|call| call.arguments.first())
                .map(|arg| graph.resolve_arg(*arg))
                .unwrap_or(original_ret)
        } else {
            original_ret
        };

        let type_scope = graph.type_scope_of(scope);
        let new_fn = graph.intern_function(type_scope, arg_types, inferred_ret, throwable);
        graph.variable_mut(declaration).ty = new_fn;
    }

    fn invocation_type(&self, callable: TypeId, args: &[TypeId], graph: &mut ModuleScopeGraph) -> TypeId {
        let _ = args;
        match graph.as_function(callable) {
            Some((_, ret, _)) => ret,
            None => {
                let type_scope = graph.type_scope_of(graph.module_scope());
                graph.intern_primitive(type_scope, types::MIXED)
            }
        }
    }
}

/// Whether `ty` is still a placeholder `infer_function_by_scope` may
/// overwrite: the undefined sentinel, or one of the function's own type
/// variables. Anything else was concretely annotated and is frozen.
fn is_inferable(graph: &ModuleScopeGraph, ty: TypeId) -> bool {
    graph.type_name(ty).as_str() == types::UNDEFINED || matches!(graph.get_type(ty), Type::Var(..))
}

/// Flags every recorded call whose target does not resolve to a function
/// type — the one shape error spec.md §7 names at the call-checking layer
/// (`"call target not callable"`).
#[derive(Debug, Default)]
pub struct DefaultCallChecker;

impl CallChecker for DefaultCallChecker {
    fn check_calls(&self, scope: ScopeId, diagnostics: &mut Vec<Diagnostic>, graph: &ModuleScopeGraph) {
        for &call_id in &graph.scope(scope).calls {
            let call = graph.call(call_id);
            let target_ty = graph.variable(call.target).ty;
            if !graph.is_callable(target_ty) {
                diagnostics.push(Diagnostic::call_target_not_callable(&call.operator, call.location.loc));
            }
        }
    }
}
