//! The public build entry point — spec.md §6.
//!
//! Wires normalization, built-in seeding and the two traversal passes into
//! one synchronous call, mirroring `SemanticIndexBuilder::build`'s role as
//! the single orchestration point the rest of the teacher's crate calls
//! into through a Salsa query; this crate has no incrementality layer, so
//! `build` runs the whole pipeline eagerly every time.

use rustc_hash::FxHashMap;
use tracing::trace_span;

use crate::ast::Node;
use crate::diagnostics::{Diagnostic, GraphError};
use crate::graph::builder::{pass1, pass2, seed};
use crate::graph::oracle::{CallChecker, DefaultCallChecker, DefaultOracle, InferenceOracle};
use crate::graph::ModuleScopeGraph;

/// The outcome of a single module build: the graph (always returned, even
/// if incomplete) and every catchable diagnostic collected along the way
/// (spec.md §7, "the ModuleScope is always returned, possibly incomplete").
#[derive(Debug)]
pub struct BuildResult {
    pub graph: ModuleScopeGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds a module's scope graph using the default oracle and call checker.
pub fn build(program: &Node) -> Result<BuildResult, GraphError> {
    build_with(program, &DefaultOracle, &DefaultCallChecker)
}

/// Builds a module's scope graph against caller-supplied external
/// collaborators (spec.md §6, "external interfaces") — the hook a caller
/// with its own inference oracle or call checker plugs into.
pub fn build_with(program: &Node, oracle: &dyn InferenceOracle, checker: &dyn CallChecker) -> Result<BuildResult, GraphError> {
    let _span = trace_span!("scopegraph::build").entered();

    if !matches!(program, Node::Program { .. }) {
        return Err(GraphError::MalformedAst);
    }

    let mut normalized = program.clone();
    {
        let _span = trace_span!("normalize").entered();
        crate::normalize::normalize(&mut normalized);
    }

    let mut graph = ModuleScopeGraph::new();
    {
        let _span = trace_span!("seed").entered();
        seed::seed_module(&mut graph);
    }

    let mut diagnostics = Vec::new();
    let mut scopes_by_loc: pass1::ScopesByLoc = FxHashMap::default();

    {
        let _span = trace_span!("pass1").entered();
        pass1::run(&normalized, &mut graph, &mut scopes_by_loc, &mut diagnostics);
    }

    {
        let _span = trace_span!("pass2").entered();
        pass2::run(&normalized, &mut graph, &scopes_by_loc, &mut diagnostics, oracle, checker);
    }

    {
        let _span = trace_span!("check_calls").entered();
        let module = graph.module_scope();
        checker.check_calls(module, &mut diagnostics, &graph);
    }

    Ok(BuildResult { graph, diagnostics })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::{AssignOp, BinaryOp, CatchClause, Literal, Param, TypeAnnotation, TypeParam, UpdateOp};
    use crate::diagnostics::DiagnosticCode;
    use crate::graph::scope::{Binding, BindingKey, VariableId};
    use crate::graph::types::Type;
    use crate::location::{Loc, Pos};
    use crate::name::Name;

    fn l(n: u32) -> Loc {
        Loc::new(Pos::new(n, 0), Pos::new(n, 1))
    }

    fn find_variable(graph: &ModuleScopeGraph, name: &str) -> Option<VariableId> {
        let key = BindingKey::name(Name::new(name));
        graph.scopes().find_map(|(_, scope)| match scope.body.get(&key) {
            Some(Binding::Variable(v)) => Some(*v),
            _ => None,
        })
    }

    // spec.md §8 scenario 1.
    #[test]
    fn scenario_const_declaration_infers_from_addition() {
        let program = Node::Program {
            body: vec![Node::VariableDeclaration {
                declarations: vec![Node::VariableDeclarator {
                    name: Name::new("x"),
                    annotation: None,
                    init: Some(Box::new(Node::Binary {
                        operator: BinaryOp::Add,
                        left: Box::new(Node::Literal {
                            value: Literal::Number(1.0),
                            loc: l(1),
                        }),
                        right: Box::new(Node::Literal {
                            value: Literal::Number(2.0),
                            loc: l(1),
                        }),
                        loc: l(1),
                    })),
                    pure_marker: None,
                    loc: l(1),
                }],
                loc: l(1),
            }],
            loc: l(0),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());

        let x = find_variable(&result.graph, "x").expect("x is declared");
        assert_eq!(result.graph.type_name(result.graph.variable(x).ty).as_str(), "number");

        let ops: Vec<String> = result.graph.calls().map(|c| c.operator.to_string()).collect();
        assert!(ops.contains(&"+".to_string()));
        assert!(ops.contains(&"=".to_string()));
    }

    // spec.md §8 scenario 2.
    #[test]
    fn scenario_function_call_after_declaration_specializes_signature() {
        let program = Node::Program {
            body: vec![
                Node::FunctionDeclaration {
                    name: Some(Name::new("f")),
                    type_params: vec![],
                    params: vec![Param {
                        name: Name::new("a"),
                        annotation: None,
                        loc: l(2),
                    }],
                    return_annotation: None,
                    body: Box::new(Node::Block {
                        body: vec![Node::Return {
                            argument: Some(Box::new(Node::Identifier {
                                name: Name::new("a"),
                                loc: l(3),
                            })),
                            loc: l(3),
                        }],
                        loc: l(1),
                    }),
                    loc: l(0),
                },
                Node::ExpressionStatement {
                    expression: Box::new(Node::Call {
                        callee: Box::new(Node::Identifier {
                            name: Name::new("f"),
                            loc: l(4),
                        }),
                        arguments: vec![Node::Literal {
                            value: Literal::Number(42.0),
                            loc: l(4),
                        }],
                        loc: l(4),
                    }),
                    loc: l(4),
                },
            ],
            loc: l(9),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());

        let f = find_variable(&result.graph, "f").expect("f is declared");
        let (args, ret, _) = result
            .graph
            .as_function(result.graph.variable(f).ty)
            .expect("f resolves to a function type");
        assert_eq!(args.len(), 1);
        assert_eq!(result.graph.type_name(args[0]).as_str(), "number");
        assert_eq!(result.graph.type_name(ret).as_str(), "number");

        let call_count = result.graph.calls().filter(|c| c.operator.as_str() == "f").count();
        assert_eq!(call_count, 1);
    }

    /// A fully, concretely annotated function — no type parameters, every
    /// parameter and the return type both explicitly typed — is not
    /// generic, so a single call site must not overwrite its declared
    /// signature with argument types, even if they happen to agree.
    #[test]
    fn concretely_annotated_function_signature_is_not_overwritten_by_call_site() {
        let program = Node::Program {
            body: vec![
                Node::FunctionDeclaration {
                    name: Some(Name::new("add")),
                    type_params: vec![],
                    params: vec![
                        Param {
                            name: Name::new("a"),
                            annotation: Some(TypeAnnotation::Named(Name::new("number"))),
                            loc: l(2),
                        },
                        Param {
                            name: Name::new("b"),
                            annotation: Some(TypeAnnotation::Named(Name::new("string"))),
                            loc: l(2),
                        },
                    ],
                    return_annotation: Some(TypeAnnotation::Named(Name::new("number"))),
                    body: Box::new(Node::Block {
                        body: vec![Node::Return {
                            argument: Some(Box::new(Node::Identifier {
                                name: Name::new("a"),
                                loc: l(3),
                            })),
                            loc: l(3),
                        }],
                        loc: l(1),
                    }),
                    loc: l(0),
                },
                Node::ExpressionStatement {
                    expression: Box::new(Node::Call {
                        callee: Box::new(Node::Identifier {
                            name: Name::new("add"),
                            loc: l(4),
                        }),
                        arguments: vec![
                            Node::Literal {
                                value: Literal::Number(42.0),
                                loc: l(4),
                            },
                            Node::Literal {
                                value: Literal::Number(7.0),
                                loc: l(4),
                            },
                        ],
                        loc: l(4),
                    }),
                    loc: l(4),
                },
            ],
            loc: l(9),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());

        let add = find_variable(&result.graph, "add").expect("add is declared");
        let (args, ret, _) = result
            .graph
            .as_function(result.graph.variable(add).ty)
            .expect("add resolves to a function type");
        assert_eq!(result.graph.type_name(args[0]).as_str(), "number");
        assert_eq!(result.graph.type_name(args[1]).as_str(), "string");
        assert_eq!(result.graph.type_name(ret).as_str(), "number");
    }

    // spec.md §8 scenario 3.
    #[test]
    fn scenario_try_catch_binds_thrown_type_to_catch_parameter() {
        let program = Node::Program {
            body: vec![Node::Try {
                block: Box::new(Node::Block {
                    body: vec![Node::Throw {
                        argument: Box::new(Node::Literal {
                            value: Literal::String("e".to_string()),
                            loc: l(2),
                        }),
                        loc: l(3),
                    }],
                    loc: l(1),
                }),
                handler: Some(CatchClause {
                    param: Some(Param {
                        name: Name::new("e"),
                        annotation: None,
                        loc: l(5),
                    }),
                    body: Box::new(Node::Block {
                        body: vec![Node::ExpressionStatement {
                            expression: Box::new(Node::Identifier {
                                name: Name::new("e"),
                                loc: l(6),
                            }),
                            loc: l(7),
                        }],
                        loc: l(4),
                    }),
                    loc: l(8),
                }),
                finalizer: None,
                loc: l(0),
            }],
            loc: l(9),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result
            .diagnostics
            .iter()
            .all(|d| d.code != DiagnosticCode::ThrowOutsideFunction));

        let e = find_variable(&result.graph, "e").expect("e is bound in the catch handler");
        assert_eq!(result.graph.type_name(result.graph.variable(e).ty).as_str(), "string");
    }

    // spec.md §8 scenario 4.
    #[test]
    fn scenario_generic_type_alias_binds_object_field_to_type_param() {
        let program = Node::Program {
            body: vec![Node::TypeAlias {
                name: Name::new("Box"),
                type_params: vec![TypeParam {
                    name: Name::new("T"),
                    constraint: None,
                    loc: l(1),
                }],
                value: TypeAnnotation::Object(vec![(Name::new("v"), TypeAnnotation::Named(Name::new("T")))]),
                loc: l(2),
            }],
            loc: l(0),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());

        let module = result.graph.module_scope();
        let box_ty = result.graph.lookup_type(module, &Name::new("Box")).expect("Box is declared");
        match result.graph.get_type(box_ty) {
            Type::Generic(name, params, _local_scope, subordinate) => {
                assert_eq!(name.as_str(), "Box");
                assert_eq!(params.len(), 1);
                match result.graph.get_type(*subordinate) {
                    Type::Object(_, fields) => {
                        assert_eq!(fields.len(), 1);
                        assert_eq!(fields[0].0.as_str(), "v");
                        assert_eq!(fields[0].1, params[0]);
                    }
                    other => panic!("expected an object subordinate, got {other:?}"),
                }
            }
            other => panic!("expected a generic type, got {other:?}"),
        }
    }

    // spec.md §8 scenario 5.
    #[test]
    fn scenario_if_statement_normalizes_branch_and_records_operator_calls() {
        let program = Node::Program {
            body: vec![
                Node::VariableDeclaration {
                    declarations: vec![Node::VariableDeclarator {
                        name: Name::new("x"),
                        annotation: None,
                        init: None,
                        pure_marker: None,
                        loc: l(1),
                    }],
                    loc: l(1),
                },
                Node::VariableDeclaration {
                    declarations: vec![Node::VariableDeclarator {
                        name: Name::new("y"),
                        annotation: None,
                        init: None,
                        pure_marker: None,
                        loc: l(2),
                    }],
                    loc: l(2),
                },
                Node::If {
                    test: Box::new(Node::Binary {
                        operator: BinaryOp::Gt,
                        left: Box::new(Node::Identifier {
                            name: Name::new("x"),
                            loc: l(3),
                        }),
                        right: Box::new(Node::Literal {
                            value: Literal::Number(0.0),
                            loc: l(3),
                        }),
                        loc: l(3),
                    }),
                    consequent: Box::new(Node::ExpressionStatement {
                        expression: Box::new(Node::Assignment {
                            operator: AssignOp::Assign,
                            left: Box::new(Node::Identifier {
                                name: Name::new("y"),
                                loc: l(4),
                            }),
                            right: Box::new(Node::Literal {
                                value: Literal::Number(1.0),
                                loc: l(4),
                            }),
                            loc: l(4),
                        }),
                        loc: l(4),
                    }),
                    alternate: None,
                    loc: l(5),
                },
            ],
            loc: l(0),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());

        let ops: Vec<String> = result.graph.calls().map(|c| c.operator.to_string()).collect();
        for expected in ["if", ">", "="] {
            assert!(ops.iter().any(|o| o == expected), "missing `{expected}` call, recorded: {ops:?}");
        }
    }

    // spec.md §8 scenario 6. Uses the textbook `for (let i = 0; i < n; i++)`
    // shape, with the loop variable declared in `init` rather than hoisted
    // manually, so this exercises the real for-loop scoping path (spec.md
    // §9, "For-loop scope-before-test ordering"): `test`/`update` reference
    // `i`, which only exists because `normalize::hoist_for_init` moves the
    // `init` declarator into `body`, and that declaration must be visible
    // where `test`/`update` are reduced.
    #[test]
    fn scenario_for_loop_records_loop_and_body_operator_calls() {
        let program = Node::Program {
            body: vec![
                Node::VariableDeclaration {
                    declarations: vec![Node::VariableDeclarator {
                        name: Name::new("n"),
                        annotation: None,
                        init: None,
                        pure_marker: None,
                        loc: l(2),
                    }],
                    loc: l(2),
                },
                Node::VariableDeclaration {
                    declarations: vec![Node::VariableDeclarator {
                        name: Name::new("s"),
                        annotation: None,
                        init: None,
                        pure_marker: None,
                        loc: l(3),
                    }],
                    loc: l(3),
                },
                Node::For {
                    init: Some(Box::new(Node::VariableDeclaration {
                        declarations: vec![Node::VariableDeclarator {
                            name: Name::new("i"),
                            annotation: None,
                            init: Some(Box::new(Node::Literal {
                                value: Literal::Number(0.0),
                                loc: l(1),
                            })),
                            pure_marker: None,
                            loc: l(1),
                        }],
                        loc: l(1),
                    })),
                    test: Some(Box::new(Node::Binary {
                        operator: BinaryOp::Lt,
                        left: Box::new(Node::Identifier {
                            name: Name::new("i"),
                            loc: l(4),
                        }),
                        right: Box::new(Node::Identifier {
                            name: Name::new("n"),
                            loc: l(4),
                        }),
                        loc: l(4),
                    })),
                    update: Some(Box::new(Node::Update {
                        operator: UpdateOp::Increment,
                        argument: Box::new(Node::Identifier {
                            name: Name::new("i"),
                            loc: l(5),
                        }),
                        prefix: false,
                        loc: l(5),
                    })),
                    body: Box::new(Node::Block {
                        body: vec![Node::ExpressionStatement {
                            expression: Box::new(Node::Assignment {
                                operator: AssignOp::Compound(BinaryOp::Add),
                                left: Box::new(Node::Identifier {
                                    name: Name::new("s"),
                                    loc: l(6),
                                }),
                                right: Box::new(Node::Identifier {
                                    name: Name::new("i"),
                                    loc: l(6),
                                }),
                                loc: l(6),
                            }),
                            loc: l(6),
                        }],
                        loc: l(7),
                    }),
                    loc: l(8),
                },
            ],
            loc: l(0),
        };
        let result = build(&program).expect("build succeeds");
        assert!(
            result
                .diagnostics
                .iter()
                .all(|d| d.code != DiagnosticCode::UndeclaredVariable),
            "`i` should be visible to `test`/`update`, diagnostics: {:?}",
            result.diagnostics
        );

        let ops: Vec<String> = result.graph.calls().map(|c| c.operator.to_string()).collect();
        for expected in ["for", "<", "++", "+="] {
            assert!(ops.iter().any(|o| o == expected), "missing `{expected}` call, recorded: {ops:?}");
        }
    }

    #[test]
    fn empty_program_yields_no_diagnostics_and_only_builtins() {
        let program = Node::Program { body: vec![], loc: l(0) };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());
        assert!(find_variable(&result.graph, "nonexistent").is_none());
        assert!(find_variable(&result.graph, "+").is_some());
    }

    #[test]
    fn declarator_with_no_annotation_or_init_stays_undefined() {
        let program = Node::Program {
            body: vec![Node::VariableDeclaration {
                declarations: vec![Node::VariableDeclarator {
                    name: Name::new("z"),
                    annotation: None,
                    init: None,
                    pure_marker: None,
                    loc: l(1),
                }],
                loc: l(1),
            }],
            loc: l(0),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());

        let z = find_variable(&result.graph, "z").expect("z is declared");
        assert_eq!(
            result.graph.type_name(result.graph.variable(z).ty).as_str(),
            crate::graph::types::UNDEFINED
        );
    }

    #[test]
    fn undeclared_variable_reference_raises_a_diagnostic() {
        let program = Node::Program {
            body: vec![Node::ExpressionStatement {
                expression: Box::new(Node::Identifier {
                    name: Name::new("ghost"),
                    loc: l(1),
                }),
                loc: l(1),
            }],
            loc: l(0),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.iter().any(|d| d.code == DiagnosticCode::UndeclaredVariable));
    }

    #[test]
    fn unreachable_statement_after_throw_is_flagged_exactly_once() {
        let program = Node::Program {
            body: vec![Node::FunctionDeclaration {
                name: Some(Name::new("f")),
                type_params: vec![],
                params: vec![],
                return_annotation: None,
                body: Box::new(Node::Block {
                    body: vec![
                        Node::Throw {
                            argument: Box::new(Node::Literal {
                                value: Literal::String("e".to_string()),
                                loc: l(2),
                            }),
                            loc: l(2),
                        },
                        Node::ExpressionStatement {
                            expression: Box::new(Node::Literal {
                                value: Literal::Number(1.0),
                                loc: l(3),
                            }),
                            loc: l(3),
                        },
                    ],
                    loc: l(1),
                }),
                loc: l(0),
            }],
            loc: l(9),
        };

        let result = build(&program).expect("build succeeds");
        let unreachable: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::UnreachableCode)
            .collect();
        assert_eq!(unreachable.len(), 1);
    }

    #[test]
    fn generic_function_call_site_narrows_parameter_and_return_type() {
        let program = Node::Program {
            body: vec![
                Node::FunctionDeclaration {
                    name: Some(Name::new("identity")),
                    type_params: vec![TypeParam {
                        name: Name::new("T"),
                        constraint: None,
                        loc: l(1),
                    }],
                    params: vec![Param {
                        name: Name::new("a"),
                        annotation: Some(TypeAnnotation::Named(Name::new("T"))),
                        loc: l(2),
                    }],
                    return_annotation: Some(TypeAnnotation::Named(Name::new("T"))),
                    body: Box::new(Node::Block {
                        body: vec![Node::Return {
                            argument: Some(Box::new(Node::Identifier {
                                name: Name::new("a"),
                                loc: l(4),
                            })),
                            loc: l(4),
                        }],
                        loc: l(3),
                    }),
                    loc: l(0),
                },
                Node::ExpressionStatement {
                    expression: Box::new(Node::Call {
                        callee: Box::new(Node::Identifier {
                            name: Name::new("identity"),
                            loc: l(5),
                        }),
                        arguments: vec![Node::Literal {
                            value: Literal::Number(42.0),
                            loc: l(5),
                        }],
                        loc: l(5),
                    }),
                    loc: l(5),
                },
            ],
            loc: l(9),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());

        let identity = find_variable(&result.graph, "identity").expect("identity is declared");
        let (args, ret, _) = result
            .graph
            .as_function(result.graph.variable(identity).ty)
            .expect("identity resolves to a function type");
        assert_eq!(result.graph.type_name(args[0]).as_str(), "number");
        assert_eq!(result.graph.type_name(ret).as_str(), "number");
    }

    /// A generic function's own type parameter must stay resolvable from
    /// inside its body, not just its signature: `declare_function_like`
    /// builds a dedicated local type scope to bind `T` into, and that scope
    /// has to be attached to the function's value scope as its
    /// `[[TypeScope]]` sibling or a body reference to `T` walks straight
    /// past it to the enclosing scope and interns an unrelated primitive.
    #[test]
    fn generic_function_body_resolves_own_type_parameter() {
        let program = Node::Program {
            body: vec![Node::FunctionDeclaration {
                name: Some(Name::new("f")),
                type_params: vec![TypeParam {
                    name: Name::new("T"),
                    constraint: None,
                    loc: l(1),
                }],
                params: vec![Param {
                    name: Name::new("a"),
                    annotation: Some(TypeAnnotation::Named(Name::new("T"))),
                    loc: l(2),
                }],
                return_annotation: None,
                body: Box::new(Node::Block {
                    body: vec![Node::VariableDeclaration {
                        declarations: vec![Node::VariableDeclarator {
                            name: Name::new("y"),
                            annotation: Some(TypeAnnotation::Named(Name::new("T"))),
                            init: None,
                            pure_marker: None,
                            loc: l(3),
                        }],
                        loc: l(3),
                    }],
                    loc: l(3),
                }),
                loc: l(0),
            }],
            loc: l(9),
        };

        let result = build(&program).expect("build succeeds");
        assert!(result.diagnostics.is_empty());

        let a = find_variable(&result.graph, "a").expect("a is declared");
        let y = find_variable(&result.graph, "y").expect("y is declared");
        assert_eq!(
            result.graph.variable(a).ty,
            result.graph.variable(y).ty,
            "a body reference to the function's own type parameter must resolve to the same type-var id its signature uses"
        );
    }

    /// spec.md §8, "idempotent re-build": building the same program twice
    /// yields the same diagnostics and the same resolved types. Graph
    /// arenas don't implement `PartialEq` (ids are only meaningful within
    /// the arena that minted them), so equality is checked structurally
    /// through names rather than `assert_eq!` on the graphs themselves.
    #[test]
    fn non_program_root_is_a_fatal_malformed_ast_error() {
        let not_a_program = Node::Block { body: vec![], loc: l(0) };
        let err = build(&not_a_program).expect_err("a non-Program root must abort the build");
        assert!(matches!(err, GraphError::MalformedAst));
    }

    #[test]
    fn rebuild_is_equal() {
        let program = Node::Program {
            body: vec![Node::VariableDeclaration {
                declarations: vec![Node::VariableDeclarator {
                    name: Name::new("x"),
                    annotation: None,
                    init: Some(Box::new(Node::Literal {
                        value: Literal::Number(1.0),
                        loc: l(1),
                    })),
                    pure_marker: None,
                    loc: l(1),
                }],
                loc: l(1),
            }],
            loc: l(0),
        };

        let first = build(&program).expect("build succeeds");
        let second = build(&program).expect("build succeeds");

        assert_eq!(first.diagnostics.len(), second.diagnostics.len());
        assert_eq!(first.graph.calls().count(), second.graph.calls().count());

        let x1 = find_variable(&first.graph, "x").expect("x declared in first build");
        let x2 = find_variable(&second.graph, "x").expect("x declared in second build");
        assert_eq!(
            first.graph.type_name(first.graph.variable(x1).ty),
            second.graph.type_name(second.graph.variable(x2).ty)
        );
    }
}
