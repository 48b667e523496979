//! Builds a module-level scope graph from an already-parsed AST: a lexical
//! scope tree paired with a parallel type-scope tree, a recorded call graph,
//! and diagnostics for the malformed-but-recoverable shapes a program can
//! take. Parsing and inference proper are external collaborators (see
//! [`graph::oracle`]); this crate owns only the graph itself and the two
//! traversal passes that build it.

pub mod ast;
pub mod diagnostics;
pub mod driver;
pub mod graph;
pub mod location;
pub mod name;
pub mod normalize;
pub mod walker;

pub use diagnostics::{Diagnostic, DiagnosticCode, GraphError};
pub use driver::{build, build_with, BuildResult};
pub use graph::ModuleScopeGraph;
