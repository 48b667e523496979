//! Pass 2 — Call graph construction & late inference — spec.md §4.4.
//!
//! Runs as the walker's `post` callback only: every child has already been
//! reduced by the time its parent is visited, so `reduceToCall` can always
//! find its operands' resolved types waiting in `results`. Grounded on
//! `SemanticIndexBuilder`'s post-order expression handling, generalized from
//! Python's statement/expression split to this crate's uniform call
//! reduction.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use crate::ast::{AssignOp, CatchClause, Node, Param, PureMarker};
use crate::diagnostics::Diagnostic;
use crate::graph::builder::pass1::ScopesByLoc;
use crate::graph::call::{CallArg, CallMeta};
use crate::graph::oracle::{CallChecker, InferCtx, InferenceOracle};
use crate::graph::scope::{ScopeId, VariableId};
use crate::graph::types::{self, TypeId};
use crate::graph::ModuleScopeGraph;
use crate::location::{Loc, Meta};
use crate::name::Name;
use crate::walker::{ParentFrame, Reachability, Walker};

type NodeKey = usize;

fn node_key(node: &Node) -> NodeKey {
    node as *const Node as usize
}

/// What a node reduces to: a bare type (most operator results) or a
/// reference to the variable that produced it (spec.md §4.4,
/// "identifier... resolve to VariableInfo directly").
#[derive(Clone, Copy)]
enum Reduced {
    Type(TypeId),
    Variable(VariableId),
}

impl Reduced {
    fn type_id(self, graph: &ModuleScopeGraph) -> TypeId {
        match self {
            Reduced::Type(t) => t,
            Reduced::Variable(v) => graph.variable(v).ty,
        }
    }

    fn as_call_arg(self) -> CallArg {
        match self {
            Reduced::Type(t) => CallArg::Type(t),
            Reduced::Variable(v) => CallArg::Variable(v),
        }
    }
}

fn is_loop_node(node: &Node) -> bool {
    matches!(
        node,
        Node::While { .. } | Node::DoWhile { .. } | Node::For { .. } | Node::ForIn { .. } | Node::ForOf { .. }
    )
}

fn current_scope(parents: &[ParentFrame<'_>], scopes_by_loc: &ScopesByLoc, module: ScopeId) -> ScopeId {
    match parents.last() {
        Some(frame) => *scopes_by_loc
            .get(&frame.scope_node.loc().key())
            .expect("enclosing scope-creating node was registered during pass 1"),
        None => module,
    }
}

pub fn run(
    ast: &Node,
    graph: &mut ModuleScopeGraph,
    scopes_by_loc: &ScopesByLoc,
    diagnostics: &mut Vec<Diagnostic>,
    oracle: &dyn InferenceOracle,
    checker: &dyn CallChecker,
) {
    let module = graph.module_scope();
    let mut results: FxHashMap<NodeKey, Reduced> = FxHashMap::default();
    let loop_depth = Cell::new(0i32);
    // A `break`/`continue` is only valid relative to a loop in its *own*
    // function — descending into a nested function body must not let it see
    // the enclosing loop, so `loop_depth` is saved and reset to 0 on entry
    // and restored on exit.
    let saved_loop_depth: RefCell<Vec<i32>> = RefCell::new(Vec::new());
    let mut fn_scopes: Vec<ScopeId> = Vec::new();
    // `post` and `on_unreachable` both need to push diagnostics, and the
    // walker holds both closures alive at once — a `RefCell` lets them
    // share access without the two borrows conflicting.
    let walk_diagnostics: RefCell<Vec<Diagnostic>> = RefCell::new(Vec::new());

    let mut walker = Walker::new(
        |node, _parents| {
            if is_loop_node(node) {
                loop_depth.set(loop_depth.get() + 1);
            } else if node.is_function_like() {
                saved_loop_depth.borrow_mut().push(loop_depth.get());
                loop_depth.set(0);
            }
        },
        |_node, _parents| {},
        |node, parents| {
            let scope = current_scope(parents, scopes_by_loc, module);
            reduce_to_call(
                node,
                scope,
                scopes_by_loc,
                graph,
                &mut results,
                &mut walk_diagnostics.borrow_mut(),
                oracle,
                &mut fn_scopes,
                &loop_depth,
            );
            if is_loop_node(node) {
                loop_depth.set(loop_depth.get() - 1);
            } else if node.is_function_like() {
                let restored = saved_loop_depth
                    .borrow_mut()
                    .pop()
                    .expect("pre pushed a saved loop_depth for every function-like node");
                loop_depth.set(restored);
            }
            Reachability::Reachable
        },
        |loc| walk_diagnostics.borrow_mut().push(Diagnostic::unreachable_code(loc)),
    );
    let mut parents = Vec::new();
    walker.walk(ast, &mut parents);
    diagnostics.extend(walk_diagnostics.into_inner());

    // Specialization runs only once every call site in the module has been
    // recorded (spec.md §8 scenario 2: `f`'s single call site appears *after*
    // its declaration in source, so a generic function's signature can't be
    // narrowed from body evidence alone while the walk is still in progress).
    for fn_scope in fn_scopes {
        oracle.infer_function_by_scope(fn_scope, graph);
        checker.check_calls(fn_scope, diagnostics, graph);

        let declaration = graph
            .scope(fn_scope)
            .declaration
            .expect("pass 1 attaches a declaration to every function-like scope");
        let accumulated = graph.scope(fn_scope).throwable.clone().unwrap_or_default();
        if !accumulated.is_empty() {
            graph.variable_mut(declaration).throwable = Some(accumulated);
        }
    }
}

fn reduced_of(results: &FxHashMap<NodeKey, Reduced>, node: &Node) -> Reduced {
    results
        .get(&node_key(node))
        .copied()
        .unwrap_or_else(|| panic!("node at {} was not reduced before its parent", node.loc()))
}

fn record_call(graph: &mut ModuleScopeGraph, scope: ScopeId, target: VariableId, arguments: Vec<CallArg>, loc: Loc, operator: &str) {
    let call_scope = graph.nearest_call_scope(scope);
    let meta = CallMeta::new(target, arguments, Meta::new(loc), Name::new(operator));
    graph.push_call(call_scope, meta);
}

fn operator_target(graph: &ModuleScopeGraph, scope: ScopeId, label: &str) -> VariableId {
    graph
        .lookup_variable(scope, &Name::new(label))
        .unwrap_or_else(|| panic!("operator `{label}` was not seeded into the module scope"))
}

#[allow(clippy::too_many_arguments)]
fn reduce_to_call(
    node: &Node,
    scope: ScopeId,
    scopes_by_loc: &ScopesByLoc,
    graph: &mut ModuleScopeGraph,
    results: &mut FxHashMap<NodeKey, Reduced>,
    diagnostics: &mut Vec<Diagnostic>,
    oracle: &dyn InferenceOracle,
    fn_scopes: &mut Vec<ScopeId>,
    loop_depth: &Cell<i32>,
) {
    let type_scope = graph.type_scope_of(scope);
    let ctx = InferCtx::new(scope, type_scope);
    let loc = node.loc();

    let reduced = match node {
        Node::Literal { .. } => Reduced::Type(oracle.infer_node(node, &ctx, graph)),

        Node::Identifier { name, .. } => match graph.lookup_variable(scope, name) {
            Some(var) => Reduced::Variable(var),
            None => {
                diagnostics.push(Diagnostic::undeclared_variable(name, loc));
                Reduced::Type(graph.intern_primitive(type_scope, types::MIXED))
            }
        },

        Node::FunctionDeclaration { .. } | Node::ArrowFunction { .. } | Node::ObjectMethod { .. } | Node::ClassDeclaration { .. } => {
            reduce_function_like(node, scopes_by_loc, graph, fn_scopes)
        }

        Node::VariableDeclarator {
            name, init, pure_marker, ..
        } => reduce_declarator(name, init.as_deref(), *pure_marker, scope, graph, results, loc),

        Node::If { test, .. } => {
            let test_ty = reduced_of(results, test).as_call_arg();
            reduce_operator_call(graph, scope, "if", vec![test_ty], loc, oracle)
        }
        Node::While { test, .. } => {
            let test_ty = reduced_of(results, test).as_call_arg();
            reduce_operator_call(graph, scope, "while", vec![test_ty], loc, oracle)
        }
        Node::DoWhile { test, .. } => {
            let test_ty = reduced_of(results, test).as_call_arg();
            reduce_operator_call(graph, scope, "do-while", vec![test_ty], loc, oracle)
        }
        Node::For { test, .. } => {
            let mixed = CallArg::Type(graph.intern_primitive(type_scope, types::MIXED));
            let test_arg = test
                .as_deref()
                .map(|t| reduced_of(results, t).as_call_arg())
                .unwrap_or_else(|| CallArg::Type(graph.intern_primitive(type_scope, types::UNDEFINED)));
            reduce_operator_call(graph, scope, "for", vec![mixed, test_arg, mixed], loc, oracle)
        }
        Node::ForIn { right, .. } | Node::ForOf { right, .. } => {
            let mixed = CallArg::Type(graph.intern_primitive(type_scope, types::MIXED));
            let right_arg = reduced_of(results, right).as_call_arg();
            reduce_operator_call(graph, scope, "for", vec![mixed, right_arg, mixed], loc, oracle)
        }

        Node::Throw { argument, .. } => {
            let arg = reduced_of(results, argument);
            let result = reduce_operator_call(graph, scope, "throw", vec![arg.as_call_arg()], loc, oracle);
            match graph.nearest_throwable_scope(scope) {
                Some(throwable_scope) => graph.append_throwable(throwable_scope, arg.type_id(graph)),
                None => diagnostics.push(Diagnostic::throw_outside_function(loc)),
            }
            result
        }

        Node::Return { argument, .. } => {
            let arg = match argument {
                Some(a) => reduced_of(results, a).as_call_arg(),
                None => CallArg::Type(graph.intern_primitive(type_scope, types::UNDEFINED)),
            };
            reduce_operator_call(graph, scope, "return", vec![arg], loc, oracle)
        }

        Node::Unary { operator, argument, .. } => {
            let arg = reduced_of(results, argument).as_call_arg();
            reduce_operator_call(graph, scope, operator.label(), vec![arg], loc, oracle)
        }
        Node::Update { operator, argument, .. } => {
            let arg = reduced_of(results, argument).as_call_arg();
            reduce_operator_call(graph, scope, operator.label(), vec![arg], loc, oracle)
        }

        Node::Binary { operator, left, right, .. } => {
            let l = reduced_of(results, left).as_call_arg();
            let r = reduced_of(results, right).as_call_arg();
            reduce_operator_call(graph, scope, operator.label(), vec![l, r], loc, oracle)
        }
        Node::Logical { operator, left, right, .. } => {
            let l = reduced_of(results, left).as_call_arg();
            let r = reduced_of(results, right).as_call_arg();
            reduce_operator_call(graph, scope, operator.label(), vec![l, r], loc, oracle)
        }

        Node::Assignment { operator, left, right, .. } => {
            if !is_assignable(left) {
                diagnostics.push(Diagnostic::invalid_assignment_target(left.loc()));
            }
            let label = match operator {
                AssignOp::Assign => "=".to_string(),
                AssignOp::Compound(op) => format!("{}=", op.label()),
            };
            let l = reduced_of(results, left).as_call_arg();
            let r = reduced_of(results, right).as_call_arg();
            reduce_operator_call(graph, scope, &label, vec![l, r], loc, oracle)
        }

        Node::Member { object, .. } => {
            let obj = reduced_of(results, object).as_call_arg();
            let prop = CallArg::Type(graph.intern_primitive(type_scope, "string"));
            reduce_operator_call(graph, scope, ".", vec![obj, prop], loc, oracle)
        }
        Node::ComputedMember { object, property, .. } => {
            let obj = reduced_of(results, object).as_call_arg();
            let prop = reduced_of(results, property).as_call_arg();
            reduce_operator_call(graph, scope, "[]", vec![obj, prop], loc, oracle)
        }

        Node::Conditional {
            test, consequent, alternate, ..
        } => {
            let t = reduced_of(results, test).as_call_arg();
            let c = reduced_of(results, consequent).as_call_arg();
            let a = reduced_of(results, alternate).as_call_arg();
            reduce_operator_call(graph, scope, "?:", vec![t, c, a], loc, oracle)
        }

        Node::Call { callee, arguments, .. } => reduce_call(callee, arguments, scope, graph, results, diagnostics, oracle, loc),
        Node::New { callee, arguments, .. } => reduce_new(callee, arguments, scope, graph, results, diagnostics, oracle, loc),

        Node::Try { block, handler, .. } => reduce_try(block, handler, scope, scopes_by_loc, graph, oracle),

        Node::ExpressionStatement { expression, .. } => reduced_of(results, expression),

        Node::Break { .. } => {
            if loop_depth.get() <= 0 {
                diagnostics.push(Diagnostic::break_outside_loop(loc));
            }
            Reduced::Type(graph.intern_primitive(type_scope, types::UNDEFINED))
        }
        Node::Continue { .. } => {
            if loop_depth.get() <= 0 {
                diagnostics.push(Diagnostic::continue_outside_loop(loc));
            }
            Reduced::Type(graph.intern_primitive(type_scope, types::UNDEFINED))
        }

        _ => Reduced::Type(oracle.infer_node(node, &ctx, graph)),
    };

    results.insert(node_key(node), reduced);
}

fn reduce_operator_call(graph: &mut ModuleScopeGraph, scope: ScopeId, label: &str, arguments: Vec<CallArg>, loc: Loc, oracle: &dyn InferenceOracle) -> Reduced {
    let target = operator_target(graph, scope, label);
    let arg_types: Vec<TypeId> = arguments.iter().map(|a| graph.resolve_arg(*a)).collect();
    record_call(graph, scope, target, arguments, loc, label);
    let callable = graph.variable(target).ty;
    Reduced::Type(oracle.invocation_type(callable, &arg_types, graph))
}

fn reduce_declarator(
    name: &Name,
    init: Option<&Node>,
    pure_marker: Option<PureMarker>,
    scope: ScopeId,
    graph: &mut ModuleScopeGraph,
    results: &mut FxHashMap<NodeKey, Reduced>,
    loc: Loc,
) -> Reduced {
    let declared = graph
        .lookup_variable(scope, name)
        .expect("pass 1 registers every declarator's variable before pass 2 walks it");

    let Some(init) = init else {
        return Reduced::Variable(declared);
    };

    let init_reduced = reduced_of(results, init);
    let type_scope = graph.type_scope_of(scope);

    // For-in/for-of hoisting (spec.md §4.1 item 5) synthesizes this
    // declarator's `init` as the *iterated* right-hand side, not a literal
    // expression — `pure_marker` says whether the loop variable binds to
    // that iterable's key or its value, so `init_reduced` (the iterable's
    // own type) is never the right type to assign directly. A for-in key
    // is always a property-name string; this crate's type lattice has no
    // iterable/element relationship to invert for a for-of value, so that
    // case falls back to `mixed` rather than (incorrectly) binding the
    // loop variable to the type of the iterable itself.
    let bound_arg = match pure_marker {
        Some(PureMarker::Key) => CallArg::Type(graph.intern_primitive(type_scope, "string")),
        Some(PureMarker::Value) => CallArg::Type(graph.intern_primitive(type_scope, types::MIXED)),
        None => init_reduced.as_call_arg(),
    };

    let assign_label = AssignOp::Assign.label();
    let target = operator_target(graph, scope, &assign_label);
    record_call(
        graph,
        scope,
        target,
        vec![CallArg::Variable(declared), bound_arg],
        loc,
        &assign_label,
    );

    let declared_ty = graph.variable(declared).ty;
    if graph.type_name(declared_ty).as_str() == types::UNDEFINED {
        graph.variable_mut(declared).ty = graph.resolve_arg(bound_arg);
    }
    Reduced::Variable(declared)
}

fn reduce_function_like(node: &Node, scopes_by_loc: &ScopesByLoc, graph: &mut ModuleScopeGraph, fn_scopes: &mut Vec<ScopeId>) -> Reduced {
    let fn_scope = *scopes_by_loc
        .get(&node.loc().key())
        .expect("pass 1 registers a scope for every function-like node and class");
    let declaration = graph
        .scope(fn_scope)
        .declaration
        .expect("pass 1 attaches a declaration to every function-like scope");

    fn_scopes.push(fn_scope);
    Reduced::Variable(declaration)
}

#[allow(clippy::too_many_arguments)]
fn reduce_call(
    callee: &Node,
    arguments: &[Node],
    scope: ScopeId,
    graph: &mut ModuleScopeGraph,
    results: &mut FxHashMap<NodeKey, Reduced>,
    diagnostics: &mut Vec<Diagnostic>,
    oracle: &dyn InferenceOracle,
    loc: Loc,
) -> Reduced {
    let type_scope = graph.type_scope_of(scope);
    let callee_reduced = reduced_of(results, callee);
    let Reduced::Variable(target) = callee_reduced else {
        let ctx = InferCtx::new(scope, type_scope);
        return Reduced::Type(oracle.infer_node(callee, &ctx, graph));
    };

    let target_ty = graph.variable(target).ty;
    if !graph.is_callable(target_ty) {
        diagnostics.push(Diagnostic::call_target_not_callable(&callee_label(callee), loc));
        return Reduced::Type(graph.intern_primitive(type_scope, types::MIXED));
    }

    let args: Vec<CallArg> = arguments.iter().map(|a| reduced_of(results, a).as_call_arg()).collect();
    let arg_types: Vec<TypeId> = args.iter().map(|a| graph.resolve_arg(*a)).collect();
    record_call(graph, scope, target, args, loc, &callee_label(callee));

    if let Some(throwable) = graph.variable(target).throwable.clone() {
        if let Some(throwable_scope) = graph.nearest_throwable_scope(scope) {
            for ty in throwable {
                graph.append_throwable(throwable_scope, ty);
            }
        }
    }

    Reduced::Type(oracle.invocation_type(target_ty, &arg_types, graph))
}

#[allow(clippy::too_many_arguments)]
fn reduce_new(
    callee: &Node,
    arguments: &[Node],
    scope: ScopeId,
    graph: &mut ModuleScopeGraph,
    results: &mut FxHashMap<NodeKey, Reduced>,
    diagnostics: &mut Vec<Diagnostic>,
    oracle: &dyn InferenceOracle,
    loc: Loc,
) -> Reduced {
    let type_scope = graph.type_scope_of(scope);
    let callee_reduced = reduced_of(results, callee);
    let Reduced::Variable(target) = callee_reduced else {
        return Reduced::Type(graph.empty_object(type_scope));
    };

    let target_ty = graph.variable(target).ty;
    if !graph.is_callable(target_ty) {
        diagnostics.push(Diagnostic::call_target_not_callable(&callee_label(callee), loc));
        return Reduced::Type(graph.empty_object(type_scope));
    }

    let args: Vec<CallArg> = arguments.iter().map(|a| reduced_of(results, a).as_call_arg()).collect();
    let arg_types: Vec<TypeId> = args.iter().map(|a| graph.resolve_arg(*a)).collect();
    record_call(graph, scope, target, args, loc, "new");

    let invoked = oracle.invocation_type(target_ty, &arg_types, graph);
    let result = match graph.get_type(invoked) {
        types::Type::Object(..) => invoked,
        _ => graph.empty_object(type_scope),
    };
    Reduced::Type(result)
}

fn callee_label(callee: &Node) -> String {
    match callee {
        Node::Identifier { name, .. } => name.to_string(),
        _ => "call".to_string(),
    }
}

fn is_assignable(node: &Node) -> bool {
    matches!(node, Node::Identifier { .. } | Node::Member { .. } | Node::ComputedMember { .. })
}

fn reduce_try(
    block: &Node,
    handler: &Option<CatchClause>,
    scope: ScopeId,
    scopes_by_loc: &ScopesByLoc,
    graph: &mut ModuleScopeGraph,
    oracle: &dyn InferenceOracle,
) -> Reduced {
    let type_scope = graph.type_scope_of(scope);
    let block_scope = *scopes_by_loc
        .get(&block.loc().key())
        .expect("pass 1 registers a scope for every try block");
    let block_throwable = graph.scope(block_scope).throwable.clone().unwrap_or_default();

    match handler {
        Some(handler) => {
            let handler_scope = *scopes_by_loc
                .get(&handler.body.loc().key())
                .expect("pass 1 registers a scope for every catch handler body");
            let ctx = InferCtx::new(block_scope, type_scope);
            let error_ty = oracle.infer_error_type(block, &ctx, graph);
            if let Some(param) = &handler.param {
                if let Some(var) = find_catch_param(graph, handler_scope, param) {
                    graph.variable_mut(var).ty = error_ty;
                }
            }
        }
        None => {
            if let Some(outer) = graph.nearest_throwable_scope(scope) {
                for ty in block_throwable {
                    graph.append_throwable(outer, ty);
                }
            }
        }
    }

    Reduced::Type(graph.intern_primitive(type_scope, types::UNDEFINED))
}

fn find_catch_param(graph: &ModuleScopeGraph, handler_scope: ScopeId, param: &Param) -> Option<VariableId> {
    graph.lookup_variable(handler_scope, &param.name)
}
