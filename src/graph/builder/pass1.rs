//! Pass 1 — Declaration filling — spec.md §4.3.
//!
//! Runs as the walker's `pre` callback only: every scope, declaration and
//! parameter must exist in the graph before Pass 2 tries to resolve a
//! reference against it. Grounded directly on
//! `SemanticIndexBuilder::visit_stmt`'s `FunctionDef`/`ClassDef`/`Try` arms
//! (`push_scope`, `add_symbol`, `add_definition`), generalized from
//! Python's statement set to this crate's own node taxonomy.

use rustc_hash::FxHashMap;

use crate::ast::{Node, TypeAnnotation, TypeParam};
use crate::diagnostics::Diagnostic;
use crate::graph::scope::{Binding, BindingKey, ScopeId, ScopeKind, VariableId, VariableInfo};
use crate::graph::types::{self, TypeId};
use crate::graph::ModuleScopeGraph;
use crate::location::{Loc, Meta};
use crate::name::Name;
use crate::walker::{ParentFrame, Walker};

/// Maps a node's source location to the `ScopeId` it owns — how later
/// passes retrieve "the scope this node opened" without re-deriving it
/// (spec.md §4.3, "scope keys are derived from the node's source
/// location").
pub type ScopesByLoc = FxHashMap<String, ScopeId>;

pub fn run(ast: &Node, graph: &mut ModuleScopeGraph, scopes_by_loc: &mut ScopesByLoc, diagnostics: &mut Vec<Diagnostic>) {
    let module = graph.module_scope();
    scopes_by_loc.insert(ast.loc().key(), module);

    let mut walker = Walker::new(
        |node, parents| visit(node, parents, graph, scopes_by_loc, diagnostics, module),
        |_node, _parents| {},
        |_node, _parents| crate::walker::Reachability::Reachable,
        |_loc| {},
    );
    let mut parents = Vec::new();
    walker.walk(ast, &mut parents);
}

fn current_scope(parents: &[ParentFrame<'_>], scopes_by_loc: &ScopesByLoc, module: ScopeId) -> ScopeId {
    match parents.last() {
        Some(frame) => *scopes_by_loc
            .get(&frame.scope_node.loc().key())
            .expect("enclosing scope-creating node was registered before its children are visited"),
        None => module,
    }
}

fn visit(
    node: &Node,
    parents: &[ParentFrame<'_>],
    graph: &mut ModuleScopeGraph,
    scopes_by_loc: &mut ScopesByLoc,
    diagnostics: &mut Vec<Diagnostic>,
    module: ScopeId,
) {
    let scope = current_scope(parents, scopes_by_loc, module);

    match node {
        Node::TypeAlias {
            name,
            type_params,
            value,
            loc,
        } => visit_type_alias(name, type_params, value, *loc, scope, graph),

        Node::VariableDeclarator {
            name,
            annotation,
            loc,
            pure_marker,
            ..
        } => {
            let type_scope = graph.type_scope_of(scope);
            let ty = match (annotation, pure_marker) {
                (Some(ann), _) => resolve_type_annotation(ann, type_scope, graph),
                (None, _) => graph.intern_primitive(type_scope, types::UNDEFINED),
            };
            declare_variable(scope, name, ty, Meta::new(*loc), graph, diagnostics);
        }

        Node::FunctionDeclaration {
            name,
            type_params,
            params,
            return_annotation,
            body,
            loc,
        } => {
            let fn_scope = declare_function_like(
                scope,
                name.clone(),
                type_params,
                params,
                return_annotation,
                *loc,
                ScopeKind::Function,
                graph,
                diagnostics,
            );
            scopes_by_loc.insert(loc.key(), fn_scope);
            scopes_by_loc.insert(body.loc().key(), fn_scope);
        }

        Node::ArrowFunction {
            type_params,
            params,
            return_annotation,
            body,
            loc,
        } => {
            let fn_scope = declare_function_like(
                scope,
                None,
                type_params,
                params,
                return_annotation,
                *loc,
                ScopeKind::Function,
                graph,
                diagnostics,
            );
            scopes_by_loc.insert(loc.key(), fn_scope);
            scopes_by_loc.insert(body.loc().key(), fn_scope);
        }

        Node::ObjectMethod {
            name,
            type_params,
            params,
            return_annotation,
            body,
            loc,
        } => {
            let fn_scope = declare_function_like(
                scope,
                Some(name.clone()),
                type_params,
                params,
                return_annotation,
                *loc,
                ScopeKind::Function,
                graph,
                diagnostics,
            );
            scopes_by_loc.insert(loc.key(), fn_scope);
            scopes_by_loc.insert(body.loc().key(), fn_scope);
        }

        Node::ClassDeclaration {
            name, type_params, loc, ..
        } => {
            let outer_type_scope = graph.type_scope_of(scope);
            let type_scope = if type_params.is_empty() {
                outer_type_scope
            } else {
                let local = graph.push_scope(ScopeKind::Block, Some(outer_type_scope));
                for tp in type_params {
                    let constraint = tp
                        .constraint
                        .as_ref()
                        .map(|ann| resolve_type_annotation(ann, outer_type_scope, graph));
                    graph.intern_var(local, &tp.name, constraint);
                }
                local
            };

            let instance_name = Name::from(format!(
                "{}Instance",
                name.as_ref().map(Name::as_str).unwrap_or("Anonymous")
            ));
            let instance_ty = graph.intern_object(type_scope, &instance_name, vec![]);
            let ctor_ty = graph.intern_function(type_scope, vec![], instance_ty, None);

            let key_name = name
                .clone()
                .unwrap_or_else(|| Name::from(format!("<anon-class@{}>", loc.key())));
            let var = declare_variable(scope, &key_name, ctor_ty, Meta::new(*loc), graph, diagnostics);

            let class_scope = graph.push_scope(ScopeKind::Class, Some(scope));
            graph.scope_mut(class_scope).declaration = Some(var);
            graph.scope_mut(class_scope).throwable = Some(Vec::new());
            // A generic class's own type parameters live in `type_scope`, not
            // `outer_type_scope` — attach it as `class_scope`'s `[[TypeScope]]`
            // sibling so a method body referencing `T` resolves to the same
            // type-var id instead of walking past the class to find it.
            if type_scope != outer_type_scope {
                graph
                    .scope_mut(class_scope)
                    .body
                    .insert(BindingKey::TypeScope, Binding::Scope(type_scope));
            }
            scopes_by_loc.insert(loc.key(), class_scope);
        }

        Node::Try { block, handler, .. } => {
            let try_scope = graph.push_scope(ScopeKind::Block, Some(scope));
            graph.scope_mut(try_scope).throwable = Some(Vec::new());
            scopes_by_loc.insert(block.loc().key(), try_scope);

            if let Some(handler) = handler {
                let handler_scope = graph.push_scope(ScopeKind::Block, Some(scope));
                scopes_by_loc.insert(handler.body.loc().key(), handler_scope);
                if let Some(param) = &handler.param {
                    let undefined = graph.intern_primitive(graph.type_scope_of(scope), types::UNDEFINED);
                    let info = VariableInfo::new(undefined, handler_scope, Meta::new(param.loc));
                    let id = graph.push_variable(info);
                    graph
                        .scope_mut(handler_scope)
                        .body
                        .insert(BindingKey::name(param.name.clone()), Binding::Variable(id));
                }
            }
        }

        Node::For { body, loc, .. } => {
            // The loop's own scope, shared with its `body` block (spec.md
            // §9, "For-loop scope-before-test ordering") so the hoisted
            // loop-variable declarator `body` receives is visible to `test`
            // and `update`, which are reduced against this same scope via
            // `Node::For`'s own `creates_scope` frame.
            let for_scope = graph.push_scope(ScopeKind::Block, Some(scope));
            scopes_by_loc.insert(loc.key(), for_scope);
            scopes_by_loc.insert(body.loc().key(), for_scope);
        }

        Node::Block { loc, .. } => {
            // Already claimed by a function body, a try block, a catch
            // handler body or a for-loop body (already claimed) — spec.md
            // §4.3, "if not the body of a function (already claimed)".
            if !scopes_by_loc.contains_key(&loc.key()) {
                let block_scope = graph.push_scope(ScopeKind::Block, Some(scope));
                scopes_by_loc.insert(loc.key(), block_scope);
            }
        }

        _ => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn declare_function_like(
    parent_scope: ScopeId,
    name: Option<Name>,
    type_params: &[TypeParam],
    params: &[crate::ast::Param],
    return_annotation: &Option<TypeAnnotation>,
    loc: Loc,
    kind: ScopeKind,
    graph: &mut ModuleScopeGraph,
    diagnostics: &mut Vec<Diagnostic>,
) -> ScopeId {
    let outer_type_scope = graph.type_scope_of(parent_scope);
    let mut type_param_ids = Vec::with_capacity(type_params.len());
    let type_scope = if type_params.is_empty() {
        outer_type_scope
    } else {
        let local = graph.push_scope(ScopeKind::Block, Some(outer_type_scope));
        for tp in type_params {
            let constraint = tp
                .constraint
                .as_ref()
                .map(|ann| resolve_type_annotation(ann, outer_type_scope, graph));
            type_param_ids.push(graph.intern_var(local, &tp.name, constraint));
        }
        local
    };

    let param_types: Vec<TypeId> = params
        .iter()
        .map(|p| match &p.annotation {
            Some(ann) => resolve_type_annotation(ann, type_scope, graph),
            None => graph.intern_primitive(type_scope, types::UNDEFINED),
        })
        .collect();
    let return_ty = match return_annotation {
        Some(ann) => resolve_type_annotation(ann, type_scope, graph),
        None => graph.intern_primitive(type_scope, types::UNDEFINED),
    };
    let sig = graph.intern_function(type_scope, param_types.clone(), return_ty, None);

    // A signature with its own type parameters, or with any parameter or
    // return left at the undefined sentinel, is generic in the sense
    // `infer_function_by_scope` cares about: body evidence may still
    // narrow it. A fully concrete signature is frozen from the start.
    let is_generic = !type_param_ids.is_empty()
        || param_types.iter().any(|t| graph.type_name(*t).as_str() == types::UNDEFINED)
        || graph.type_name(return_ty).as_str() == types::UNDEFINED;

    let declared_ty = if is_generic {
        let generic_name = Name::from(format!("<fn-generic@{}>", loc.key()));
        graph.intern_generic(outer_type_scope, &generic_name, type_param_ids, type_scope, sig)
    } else {
        sig
    };

    let key_name = name
        .clone()
        .unwrap_or_else(|| Name::from(format!("<anon-fn@{}>", loc.key())));
    let var = declare_variable(parent_scope, &key_name, declared_ty, Meta::new(loc), graph, diagnostics);

    let fn_scope = graph.push_scope(kind, Some(parent_scope));
    graph.scope_mut(fn_scope).declaration = Some(var);
    graph.scope_mut(fn_scope).throwable = Some(Vec::new());

    // A function with its own type parameters owns `type_scope` as its
    // `[[TypeScope]]` sibling, so a reference to `T` inside the body
    // resolves to the same type-var id the signature was built from
    // instead of walking straight past `fn_scope` to the enclosing scope.
    if type_scope != outer_type_scope {
        graph
            .scope_mut(fn_scope)
            .body
            .insert(BindingKey::TypeScope, Binding::Scope(type_scope));
    }

    for (param, ty) in params.iter().zip(param_types) {
        let info = VariableInfo::new(ty, fn_scope, Meta::new(param.loc));
        let id = graph.push_variable(info);
        graph
            .scope_mut(fn_scope)
            .body
            .insert(BindingKey::name(param.name.clone()), Binding::Variable(id));
    }

    fn_scope
}

fn declare_variable(
    scope: ScopeId,
    name: &Name,
    ty: TypeId,
    meta: Meta,
    graph: &mut ModuleScopeGraph,
    diagnostics: &mut Vec<Diagnostic>,
) -> VariableId {
    let key = BindingKey::name(name.clone());
    if let Some(Binding::Variable(existing)) = graph.scope(scope).body.get(&key) {
        diagnostics.push(Diagnostic::duplicate_declaration(name, meta.loc));
        return *existing;
    }
    let info = VariableInfo::new(ty, scope, meta);
    let id = graph.push_variable(info);
    graph.scope_mut(scope).body.insert(key, Binding::Variable(id));
    id
}

fn visit_type_alias(
    name: &Name,
    type_params: &[TypeParam],
    value: &TypeAnnotation,
    loc: Loc,
    scope: ScopeId,
    graph: &mut ModuleScopeGraph,
) {
    let type_scope = graph.type_scope_of(scope);

    if type_params.is_empty() {
        let resolved = resolve_type_annotation(value, type_scope, graph);
        graph
            .scope_mut(type_scope)
            .body
            .insert(BindingKey::name(name.clone()), Binding::Type(resolved));
        return;
    }

    let local = graph.push_scope(ScopeKind::Block, Some(type_scope));
    let mut param_ids = Vec::with_capacity(type_params.len());
    for tp in type_params {
        let constraint = tp
            .constraint
            .as_ref()
            .map(|ann| resolve_type_annotation(ann, type_scope, graph));
        param_ids.push(graph.intern_var(local, &tp.name, constraint));
    }
    let subordinate = resolve_type_annotation(value, local, graph);
    let generic = graph.intern_generic(type_scope, name, param_ids, local, subordinate);
    graph
        .scope_mut(type_scope)
        .body
        .insert(BindingKey::name(name.clone()), Binding::Type(generic));
    let _ = loc;
}

/// Resolves a written annotation into a `TypeId`, walking `type_scope`'s
/// chain for named references and falling back to a fresh primitive for
/// anything unresolved (spec.md §6, `getTypeFromTypeAnnotation`).
pub fn resolve_type_annotation(ann: &TypeAnnotation, type_scope: ScopeId, graph: &mut ModuleScopeGraph) -> TypeId {
    match ann {
        TypeAnnotation::Named(name) => graph
            .lookup_type_in_scope_chain(type_scope, name)
            .unwrap_or_else(|| graph.intern_primitive(type_scope, name)),
        TypeAnnotation::Generic(name, _args) => graph
            .lookup_type_in_scope_chain(type_scope, name)
            .unwrap_or_else(|| graph.intern_primitive(type_scope, name)),
        TypeAnnotation::Object(fields) => {
            let props: Vec<(Name, TypeId)> = fields
                .iter()
                .map(|(field_name, field_ann)| (field_name.clone(), resolve_type_annotation(field_ann, type_scope, graph)))
                .collect();
            let name = Name::from(format!(
                "{{ {} }}",
                props
                    .iter()
                    .map(|(n, t)| format!("{n}: {}", graph.type_name(*t)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            graph.intern_object(type_scope, &name, props)
        }
        TypeAnnotation::Function(params, ret) => {
            let arg_ids: Vec<TypeId> = params.iter().map(|p| resolve_type_annotation(p, type_scope, graph)).collect();
            let ret_id = resolve_type_annotation(ret, type_scope, graph);
            graph.intern_function(type_scope, arg_ids, ret_id, None)
        }
    }
}
