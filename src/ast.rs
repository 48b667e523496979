//! Node taxonomy for the AST the builder consumes.
//!
//! Parsing itself is out of scope (spec.md §1, "the AST producer"): this
//! module defines the shape an already-parsed module must have, in the
//! spirit of `ruff_python_ast`'s `Stmt`/`Expr` enums (one variant per
//! surface form, each variant a plain struct carrying its own [`Loc`]),
//! generalized from Python's concrete grammar to the generic
//! dynamically-typed-with-optional-annotations language spec.md targets.

use crate::location::Loc;
use crate::name::Name;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// The operator label used as a call target name (spec.md §4.4).
    pub fn label(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
    NullishCoalesce,
}

impl LogicalOp {
    pub fn label(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::NullishCoalesce => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Plus,
    TypeOf,
}

impl UnaryOp {
    pub fn label(self) -> &'static str {
        match self {
            Self::Neg => "unary-",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Plus => "unary+",
            Self::TypeOf => "typeof",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn label(self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AssignOp {
    /// Plain `=`.
    Assign,
    /// Compound forms: `+=`, `-=`, ... The label is the full compound
    /// operator, e.g. `"+="`, matching spec.md's scenario 6 (`"+="(s, i)`).
    Compound(BinaryOp),
}

impl AssignOp {
    pub fn label(self) -> String {
        match self {
            Self::Assign => "=".to_string(),
            Self::Compound(op) => format!("{}=", op.label()),
        }
    }
}

/// A literal value. The builder never evaluates these; it only hands their
/// kind to the inference oracle (spec.md §6, `inferenceTypeForNode`).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Undefined,
}

/// A type annotation tree, as written by the user (`: Foo<Bar>`). Resolved
/// into a [`crate::graph::types::Type`] via
/// `getTypeFromTypeAnnotation` (spec.md §6).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    Named(Name),
    Generic(Name, Vec<TypeAnnotation>),
    Object(Vec<(Name, TypeAnnotation)>),
    Function(Vec<TypeAnnotation>, Box<TypeAnnotation>),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Name,
    pub annotation: Option<TypeAnnotation>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct TypeParam {
    pub name: Name,
    pub constraint: Option<TypeAnnotation>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Param>,
    pub body: Box<Node>,
    pub loc: Loc,
}

/// A single AST node. `Program` is the root; everything else nests under
/// `Stmt`/`Expr`. Kept as one flat enum (rather than separate `Stmt`/`Expr`
/// enums as `ruff_python_ast` does) because spec.md §4.4's reduction table
/// deliberately treats statements and expressions uniformly — both reduce
/// to calls against the same operator repertoire.
#[derive(Debug, Clone)]
pub enum Node {
    Program {
        body: Vec<Node>,
        loc: Loc,
    },

    // --- statements ---
    Block {
        body: Vec<Node>,
        loc: Loc,
    },
    ExpressionStatement {
        expression: Box<Node>,
        loc: Loc,
    },
    VariableDeclaration {
        declarations: Vec<Node>,
        loc: Loc,
    },
    VariableDeclarator {
        name: Name,
        annotation: Option<TypeAnnotation>,
        init: Option<Box<Node>>,
        /// Synthesized by for-in/for-of normalization (spec.md §4.1 item 5):
        /// a marker telling Pass 2 the init is the loop's key or value,
        /// rather than a literal expression to reduce directly.
        pure_marker: Option<PureMarker>,
        loc: Loc,
    },
    FunctionDeclaration {
        name: Option<Name>,
        type_params: Vec<TypeParam>,
        params: Vec<Param>,
        return_annotation: Option<TypeAnnotation>,
        body: Box<Node>,
        loc: Loc,
    },
    ClassDeclaration {
        name: Option<Name>,
        type_params: Vec<TypeParam>,
        /// methods and field declarators, in source order
        body: Vec<Node>,
        loc: Loc,
    },
    TypeAlias {
        name: Name,
        type_params: Vec<TypeParam>,
        value: TypeAnnotation,
        loc: Loc,
    },
    If {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
        loc: Loc,
    },
    While {
        test: Box<Node>,
        body: Box<Node>,
        loc: Loc,
    },
    DoWhile {
        test: Box<Node>,
        body: Box<Node>,
        loc: Loc,
    },
    For {
        init: Option<Box<Node>>,
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
        loc: Loc,
    },
    ForIn {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
        loc: Loc,
    },
    ForOf {
        left: Box<Node>,
        right: Box<Node>,
        body: Box<Node>,
        loc: Loc,
    },
    Return {
        argument: Option<Box<Node>>,
        loc: Loc,
    },
    Throw {
        argument: Box<Node>,
        loc: Loc,
    },
    Try {
        block: Box<Node>,
        handler: Option<CatchClause>,
        finalizer: Option<Box<Node>>,
        loc: Loc,
    },
    Break {
        loc: Loc,
    },
    Continue {
        loc: Loc,
    },
    Export {
        declaration: Box<Node>,
        export_as: Name,
        loc: Loc,
    },

    // --- expressions ---
    Identifier {
        name: Name,
        loc: Loc,
    },
    Literal {
        value: Literal,
        loc: Loc,
    },
    ArrowFunction {
        type_params: Vec<TypeParam>,
        params: Vec<Param>,
        return_annotation: Option<TypeAnnotation>,
        body: Box<Node>,
        loc: Loc,
    },
    ObjectMethod {
        name: Name,
        type_params: Vec<TypeParam>,
        params: Vec<Param>,
        return_annotation: Option<TypeAnnotation>,
        body: Box<Node>,
        loc: Loc,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
        loc: Loc,
    },
    Logical {
        operator: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
        loc: Loc,
    },
    Unary {
        operator: UnaryOp,
        argument: Box<Node>,
        loc: Loc,
    },
    Update {
        operator: UpdateOp,
        argument: Box<Node>,
        prefix: bool,
        loc: Loc,
    },
    Assignment {
        operator: AssignOp,
        left: Box<Node>,
        right: Box<Node>,
        loc: Loc,
    },
    Member {
        object: Box<Node>,
        property: Name,
        loc: Loc,
    },
    /// Computed property access, `obj[expr]` — reduced against the `"[]"`
    /// operator, distinct from `"."` (spec.md §9, open question 3).
    ComputedMember {
        object: Box<Node>,
        property: Box<Node>,
        loc: Loc,
    },
    Conditional {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
        loc: Loc,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
        loc: Loc,
    },
    New {
        callee: Box<Node>,
        arguments: Vec<Node>,
        loc: Loc,
    },
}

/// Consumed by Pass 2 to treat a for-in/for-of declarator's synthesized
/// `init` as a pseudo-value instead of reducing it as a real expression
/// (spec.md §4.1 item 5: "consumed by inference").
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PureMarker {
    Key,
    Value,
}

impl Node {
    pub fn loc(&self) -> Loc {
        match self {
            Node::Program { loc, .. }
            | Node::Block { loc, .. }
            | Node::ExpressionStatement { loc, .. }
            | Node::VariableDeclaration { loc, .. }
            | Node::VariableDeclarator { loc, .. }
            | Node::FunctionDeclaration { loc, .. }
            | Node::ClassDeclaration { loc, .. }
            | Node::TypeAlias { loc, .. }
            | Node::If { loc, .. }
            | Node::While { loc, .. }
            | Node::DoWhile { loc, .. }
            | Node::For { loc, .. }
            | Node::ForIn { loc, .. }
            | Node::ForOf { loc, .. }
            | Node::Return { loc, .. }
            | Node::Throw { loc, .. }
            | Node::Try { loc, .. }
            | Node::Break { loc }
            | Node::Continue { loc }
            | Node::Export { loc, .. }
            | Node::Identifier { loc, .. }
            | Node::Literal { loc, .. }
            | Node::ArrowFunction { loc, .. }
            | Node::ObjectMethod { loc, .. }
            | Node::Binary { loc, .. }
            | Node::Logical { loc, .. }
            | Node::Unary { loc, .. }
            | Node::Update { loc, .. }
            | Node::Assignment { loc, .. }
            | Node::Member { loc, .. }
            | Node::ComputedMember { loc, .. }
            | Node::Conditional { loc, .. }
            | Node::Call { loc, .. }
            | Node::New { loc, .. } => *loc,
        }
    }

    /// The node's children, in the priority order spec.md §4.2 step 3 lists
    /// (`body`, `declarations`, `properties`, then the remaining structural
    /// fields). Used by [`crate::walker::Walker`].
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Program { body, .. } | Node::Block { body, .. } => body.iter().collect(),
            Node::VariableDeclaration { declarations, .. } => declarations.iter().collect(),
            Node::ClassDeclaration { body, .. } => body.iter().collect(),

            Node::ExpressionStatement { expression, .. } => vec![expression.as_ref()],
            Node::VariableDeclarator { init, .. } => init.iter().map(Box::as_ref).collect(),
            Node::FunctionDeclaration { body, .. } => vec![body.as_ref()],
            Node::TypeAlias { .. } => vec![],
            Node::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                let mut kids = vec![test.as_ref(), consequent.as_ref()];
                if let Some(alt) = alternate {
                    kids.push(alt.as_ref());
                }
                kids
            }
            Node::While { test, body, .. } | Node::DoWhile { test, body, .. } => {
                vec![test.as_ref(), body.as_ref()]
            }
            Node::For {
                init,
                test,
                update,
                body,
                ..
            } => {
                let mut kids = vec![];
                kids.extend(init.as_deref());
                kids.extend(test.as_deref());
                kids.extend(update.as_deref());
                kids.push(body.as_ref());
                kids
            }
            Node::ForIn { left, right, body, .. } | Node::ForOf { left, right, body, .. } => {
                vec![left.as_ref(), right.as_ref(), body.as_ref()]
            }
            Node::Return { argument, .. } => argument.iter().map(Box::as_ref).collect(),
            Node::Throw { argument, .. } => vec![argument.as_ref()],
            Node::Try {
                block,
                handler,
                finalizer,
                ..
            } => {
                let mut kids = vec![block.as_ref()];
                if let Some(h) = handler {
                    kids.push(h.body.as_ref());
                }
                kids.extend(finalizer.as_deref());
                kids
            }
            Node::Break { .. } | Node::Continue { .. } => vec![],
            Node::Export { declaration, .. } => vec![declaration.as_ref()],

            Node::Identifier { .. } | Node::Literal { .. } => vec![],
            Node::ArrowFunction { body, .. } | Node::ObjectMethod { body, .. } => vec![body.as_ref()],
            Node::Binary { left, right, .. } | Node::Logical { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
            Node::Unary { argument, .. } => vec![argument.as_ref()],
            Node::Update { argument, .. } => vec![argument.as_ref()],
            Node::Assignment { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Node::Member { object, .. } => vec![object.as_ref()],
            Node::ComputedMember { object, property, .. } => vec![object.as_ref(), property.as_ref()],
            Node::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => vec![test.as_ref(), consequent.as_ref(), alternate.as_ref()],
            Node::Call { callee, arguments, .. } | Node::New { callee, arguments, .. } => {
                let mut kids = vec![callee.as_ref()];
                kids.extend(arguments.iter());
                kids
            }
        }
    }

    /// Whether entering this node pushes a new lexical scope — the
    /// "scope creator" test in spec.md §4.2's parent-propagation rule.
    ///
    /// `For` is included alongside the body `Block` it owns (spec.md §9,
    /// "For-loop scope-before-test ordering"): its hoisted loop variable
    /// lives in the body's scope, so `test`/`update` — which are `For`'s
    /// own children, visited before `body` — must resolve against that same
    /// scope rather than the one enclosing the loop, or a plain
    /// `for (let i = 0; i < n; i++)` would misreport `i` as undeclared.
    pub fn creates_scope(&self) -> bool {
        matches!(
            self,
            Node::Program { .. }
                | Node::Block { .. }
                | Node::FunctionDeclaration { .. }
                | Node::ArrowFunction { .. }
                | Node::ObjectMethod { .. }
                | Node::ClassDeclaration { .. }
                | Node::For { .. }
        )
    }

    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            Node::FunctionDeclaration { .. } | Node::ArrowFunction { .. } | Node::ObjectMethod { .. }
        )
    }
}
