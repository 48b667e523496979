//! Built-in seeding — spec.md §4.5.
//!
//! Populates the module scope with global bindings and one `VariableInfo`
//! per operator label before either traversal pass runs, so that
//! `reduceToCall` (§4.4) can always resolve its targets. Grounded on
//! `red_knot_python_semantic::builtins`' global-symbol-table construction,
//! generalized from a fixed Python builtins module to this crate's own
//! operator repertoire.

use crate::ast::{AssignOp, BinaryOp, LogicalOp, UnaryOp, UpdateOp};
use crate::graph::scope::{BindingKey, Binding, ScopeId, VariableInfo};
use crate::graph::types::TypeId;
use crate::graph::ModuleScopeGraph;
use crate::location::Meta;
use crate::name::Name;

const BINARY_OPS: &[BinaryOp] = &[
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Div,
    BinaryOp::Mod,
    BinaryOp::Eq,
    BinaryOp::NotEq,
    BinaryOp::Lt,
    BinaryOp::LtEq,
    BinaryOp::Gt,
    BinaryOp::GtEq,
    BinaryOp::BitAnd,
    BinaryOp::BitOr,
    BinaryOp::BitXor,
    BinaryOp::Shl,
    BinaryOp::Shr,
];

const COMPARISON_OPS: &[BinaryOp] = &[
    BinaryOp::Eq,
    BinaryOp::NotEq,
    BinaryOp::Lt,
    BinaryOp::LtEq,
    BinaryOp::Gt,
    BinaryOp::GtEq,
];

const LOGICAL_OPS: &[LogicalOp] = &[LogicalOp::And, LogicalOp::Or, LogicalOp::NullishCoalesce];
const UNARY_OPS: &[UnaryOp] = &[UnaryOp::Neg, UnaryOp::Not, UnaryOp::BitNot, UnaryOp::Plus, UnaryOp::TypeOf];
const UPDATE_OPS: &[UpdateOp] = &[UpdateOp::Increment, UpdateOp::Decrement];

/// Populates globals and operator bindings in `graph`'s module scope.
/// Idempotent only in the sense every label interns through
/// [`ModuleScopeGraph::intern_type`]/the module scope's `body` map — calling
/// it twice on the same graph would hit "already declared", which the
/// driver never does (seeding runs exactly once per build).
pub fn seed_module(graph: &mut ModuleScopeGraph) {
    let module = graph.module_scope();
    let type_scope = graph.type_scope_of(module);

    let mixed = graph.intern_primitive(type_scope, crate::graph::types::MIXED);
    let number = graph.intern_primitive(type_scope, "number");
    let string = graph.intern_primitive(type_scope, "string");
    let boolean = graph.intern_primitive(type_scope, "boolean");

    for op in BINARY_OPS {
        let ret = if COMPARISON_OPS.contains(op) { boolean } else { number };
        seed_operator(graph, module, type_scope, op.label(), vec![number, number], ret);

        seed_operator(
            graph,
            module,
            type_scope,
            &AssignOp::Compound(*op).label(),
            vec![mixed, mixed],
            mixed,
        );
    }

    for op in LOGICAL_OPS {
        seed_operator(graph, module, type_scope, op.label(), vec![mixed, mixed], mixed);
    }

    for op in UNARY_OPS {
        let (arg, ret) = match op {
            UnaryOp::Not => (mixed, boolean),
            UnaryOp::TypeOf => (mixed, string),
            _ => (number, number),
        };
        seed_operator(graph, module, type_scope, op.label(), vec![arg], ret);
    }

    for op in UPDATE_OPS {
        seed_operator(graph, module, type_scope, op.label(), vec![number], number);
    }

    let assign_label = AssignOp::Assign.label();
    seed_operator(graph, module, type_scope, &assign_label, vec![mixed, mixed], mixed);
    seed_operator(graph, module, type_scope, "if", vec![mixed], mixed);
    seed_operator(graph, module, type_scope, "while", vec![mixed], mixed);
    seed_operator(graph, module, type_scope, "do-while", vec![mixed], mixed);
    seed_operator(graph, module, type_scope, "for", vec![mixed, mixed, mixed], mixed);
    seed_operator(graph, module, type_scope, "throw", vec![mixed], mixed);
    seed_operator(graph, module, type_scope, "return", vec![mixed], mixed);
    seed_operator(graph, module, type_scope, ".", vec![mixed, string], mixed);
    seed_operator(graph, module, type_scope, "[]", vec![mixed, mixed], mixed);
    seed_operator(graph, module, type_scope, "?:", vec![mixed, mixed, mixed], mixed);
    let object = graph.empty_object(type_scope);
    seed_operator(graph, module, type_scope, "new", vec![mixed], object);

    let undefined = graph.intern_primitive(type_scope, crate::graph::types::UNDEFINED);
    register_global(graph, module, "undefined", undefined);
}

fn seed_operator(
    graph: &mut ModuleScopeGraph,
    module: ScopeId,
    type_scope: ScopeId,
    label: &str,
    args: Vec<TypeId>,
    ret: TypeId,
) {
    let fn_ty = graph.intern_function(type_scope, args, ret, None);
    register_global(graph, module, label, fn_ty);
}

fn register_global(graph: &mut ModuleScopeGraph, module: ScopeId, name: &str, ty: TypeId) {
    let info = VariableInfo::new(ty, module, Meta::default());
    let id = graph.push_variable(info);
    graph
        .scope_mut(module)
        .body
        .insert(BindingKey::name(Name::new(name)), Binding::Variable(id));
}
