//! Generic three-callback tree walker — spec.md §4.2.
//!
//! Both builder passes share this one traversal engine: Pass 1 supplies only
//! a `pre` callback (declarations must exist before anything inside a scope
//! references them), Pass 2 supplies only a `post` callback (a call's
//! arguments must be reduced before the call itself is). `middle` exists for
//! callbacks that need to run on each child in source order before the
//! walker descends into it — the builder doesn't currently need it, but
//! spec.md §4.2 specifies all three phases as part of the walker's contract.
//!
//! Grounded on `ruff_python_ast::visitor::{Visitor, walk_stmt, walk_expr}`'s
//! recursive-descent shape, generalized from one trait method per node kind
//! into three reusable phases so both passes can reuse a single traversal.

use crate::ast::Node;

/// Whether a statement, once walked, is known to fall through to its
/// successor. Mirrors spec.md §4.2's treatment of unreachable-code
/// detection as a traversal-returned signal rather than an exception:
/// a `throw`/`return` makes its containing block `Unreachable` from that
/// point on, and the walker propagates that to the caller instead of
/// aborting the walk.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Reachability {
    Reachable,
    Unreachable,
}

impl Reachability {
    fn then(self, next: Reachability) -> Reachability {
        match self {
            Reachability::Unreachable => Reachability::Unreachable,
            Reachability::Reachable => next,
        }
    }
}

/// A parent-stack entry: the nearest enclosing scope-creating node and
/// whether a throwable effect has already been seen directly inside it.
/// Pushed on entry to a scope-creating node, popped on exit — the
/// "parent-propagation rule" spec.md §4.2 names (a node occurring directly
/// inside a function/class/block body is told who that enclosing scope
/// creator is, without re-deriving it by walking back up the tree).
#[derive(Debug, Clone, Copy)]
pub struct ParentFrame<'a> {
    pub scope_node: &'a Node,
}

/// Drives the traversal. `pre`/`middle`/`post` run against every node in
/// that order relative to its children; all three default to no-ops via
/// [`Walker::new`], so a pass that only needs one phase doesn't pay for
/// the others. `on_unreachable` fires once per sibling sequence that
/// contains a non-last unreachable child — the walker's own
/// unreachable-code detection (spec.md §4.2), independent of whichever
/// phase callbacks a given pass supplies.
pub struct Walker<'a, Pre, Middle, Post, Unreachable>
where
    Pre: FnMut(&'a Node, &[ParentFrame<'a>]),
    Middle: FnMut(&'a Node, &[ParentFrame<'a>]),
    Post: FnMut(&'a Node, &[ParentFrame<'a>]) -> Reachability,
    Unreachable: FnMut(crate::location::Loc),
{
    pre: Pre,
    middle: Middle,
    post: Post,
    on_unreachable: Unreachable,
    _marker: std::marker::PhantomData<&'a Node>,
}

impl<'a, Pre, Middle, Post, Unreachable> Walker<'a, Pre, Middle, Post, Unreachable>
where
    Pre: FnMut(&'a Node, &[ParentFrame<'a>]),
    Middle: FnMut(&'a Node, &[ParentFrame<'a>]),
    Post: FnMut(&'a Node, &[ParentFrame<'a>]) -> Reachability,
    Unreachable: FnMut(crate::location::Loc),
{
    pub fn new(pre: Pre, middle: Middle, post: Post, on_unreachable: Unreachable) -> Self {
        Self {
            pre,
            middle,
            post,
            on_unreachable,
            _marker: std::marker::PhantomData,
        }
    }

    /// Walks `node` and all its descendants, in the priority order
    /// [`Node::children`] returns (spec.md §4.2 step 3). `middle` runs on
    /// each child, in order, immediately before the walker recurses into it
    /// (spec.md §4.2 step 4); for a childless node it runs once on `node`
    /// itself. Returns whether `node` falls through to whatever follows it.
    ///
    /// `If` and `Try` are not sequences: their branch children are
    /// alternatives, not a run of statements where one being unreachable
    /// dooms the next, so they're folded by [`Self::walk_if`]/
    /// [`Self::walk_try`] instead of [`Self::walk_sequential`].
    pub fn walk(&mut self, node: &'a Node, parents: &mut Vec<ParentFrame<'a>>) -> Reachability {
        (self.pre)(node, parents);

        let pushed = node.creates_scope();
        if pushed {
            parents.push(ParentFrame { scope_node: node });
        }

        let children = node.children();
        let reachability = match node {
            Node::If { alternate, .. } => self.walk_if(&children, alternate.is_some(), parents),
            Node::Try { handler, finalizer, .. } => {
                self.walk_try(&children, handler.is_some(), finalizer.is_some(), parents)
            }
            _ => self.walk_sequential(&children, parents),
        };
        if children.is_empty() {
            (self.middle)(node, parents);
        }

        if pushed {
            parents.pop();
        }

        let own = (self.post)(node, parents);
        self.terminal_reachability(node, reachability).then(own)
    }

    /// The default shape: children are a run of statements, each one falling
    /// through to the next. A non-last child that's `Unreachable` dooms its
    /// next sibling.
    fn walk_sequential(&mut self, children: &[&'a Node], parents: &mut Vec<ParentFrame<'a>>) -> Reachability {
        let mut reachability = Reachability::Reachable;
        let last = children.len().saturating_sub(1);
        for (i, child) in children.iter().enumerate() {
            // spec.md §4.2 step 4: invoke `middle` on each child in order,
            // before recursing into it.
            (self.middle)(child, parents);

            // Children are still visited once unreachable — declarations
            // inside dead code still need to exist in the scope graph — but
            // a child that itself signals unreachability and isn't the
            // last in its sequence means its next sibling is dead code.
            let child_reachability = self.walk(child, parents);
            if child_reachability == Reachability::Unreachable && i != last {
                (self.on_unreachable)(children[i + 1].loc());
            }
            reachability = reachability.then(child_reachability);
        }
        reachability
    }

    /// `children` is `[test]`, `[test, consequent]` or
    /// `[test, consequent, alternate]`. Only one of `consequent`/`alternate`
    /// ever runs, so the statement falls through if either one does — an
    /// `if` with no `else` can always fall through (the test might be
    /// false), regardless of whether `consequent` itself always throws or
    /// returns.
    fn walk_if(&mut self, children: &[&'a Node], has_alternate: bool, parents: &mut Vec<ParentFrame<'a>>) -> Reachability {
        let test = children[0];
        (self.middle)(test, parents);
        self.walk(test, parents);

        let consequent = children[1];
        (self.middle)(consequent, parents);
        let consequent_r = self.walk(consequent, parents);

        if !has_alternate {
            return Reachability::Reachable;
        }

        let alternate = children[2];
        (self.middle)(alternate, parents);
        let alternate_r = self.walk(alternate, parents);

        if consequent_r == Reachability::Reachable || alternate_r == Reachability::Reachable {
            Reachability::Reachable
        } else {
            Reachability::Unreachable
        }
    }

    /// `children` is `block` optionally followed by the catch handler's
    /// body and/or a finalizer. The handler is an alternative to the block
    /// throwing, not its sequential successor, so it's joined the same way
    /// as an `if`/`else`; the finalizer always runs, so it's folded in
    /// sequentially after that join.
    fn walk_try(
        &mut self,
        children: &[&'a Node],
        has_handler: bool,
        has_finalizer: bool,
        parents: &mut Vec<ParentFrame<'a>>,
    ) -> Reachability {
        let block = children[0];
        (self.middle)(block, parents);
        let block_r = self.walk(block, parents);

        let joined = if has_handler {
            let handler_body = children[1];
            (self.middle)(handler_body, parents);
            let handler_r = self.walk(handler_body, parents);
            if block_r == Reachability::Reachable || handler_r == Reachability::Reachable {
                Reachability::Reachable
            } else {
                Reachability::Unreachable
            }
        } else {
            block_r
        };

        if has_finalizer {
            let finalizer = children[if has_handler { 2 } else { 1 }];
            (self.middle)(finalizer, parents);
            let finalizer_r = self.walk(finalizer, parents);
            joined.then(finalizer_r)
        } else {
            joined
        }
    }

    fn terminal_reachability(&self, node: &'a Node, children: Reachability) -> Reachability {
        match node {
            Node::Return { .. } | Node::Throw { .. } | Node::Break { .. } | Node::Continue { .. } => {
                Reachability::Unreachable
            }
            // A declaration's own control flow is contained in its body;
            // the body ending in `return`/`throw` says nothing about
            // whether the *declaration statement itself* falls through to
            // its next sibling, so it must not leak `Unreachable` upward.
            Node::FunctionDeclaration { .. }
            | Node::ArrowFunction { .. }
            | Node::ObjectMethod { .. }
            | Node::ClassDeclaration { .. } => Reachability::Reachable,
            _ => children,
        }
    }
}
