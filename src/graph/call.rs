//! Recorded call sites — spec.md §3, `CallMeta`.
//!
//! Every expression/statement form Pass 2 reduces ends up here: operator
//! applications, control-flow pseudo-calls, and ordinary invocations alike,
//! all recorded uniformly. Grounded on `semantic_index/definition.rs`'s
//! one-record-per-program-fact pattern, narrowed to the single shape
//! `(target, arguments, location, operator_label)` spec.md needs.

use std::fmt;

use crate::graph::scope::VariableId;
use crate::graph::types::TypeId;
use crate::location::Meta;
use crate::name::Name;

#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CallId(u32);

impl CallId {
    pub(crate) fn from_usize(index: usize) -> Self {
        Self(u32::try_from(index).expect("arena index overflowed u32"))
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

/// A single call-site argument: either a bare type (a literal, an
/// already-reduced intermediate result) or a reference to the
/// `VariableInfo` that produced it — spec.md §3, "arguments: ordered
/// sequence of (Type | VariableInfo)".
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CallArg {
    Type(TypeId),
    Variable(VariableId),
}

#[derive(Debug, Clone)]
pub struct CallMeta {
    pub target: VariableId,
    pub arguments: Vec<CallArg>,
    pub location: Meta,
    pub operator: Name,
}

impl CallMeta {
    pub fn new(target: VariableId, arguments: Vec<CallArg>, location: Meta, operator: Name) -> Self {
        Self {
            target,
            arguments,
            location,
            operator,
        }
    }
}
