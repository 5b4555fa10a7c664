//! Stateless search primitives over the linked tree.
//!
//! These are the building blocks every analyser shares: scope-bounded
//! ancestor search, subtree search with pruning, and resolution of dotted
//! names from attribute-access chains.

use thiserror::Error;

use super::{Ast, ConstValue, Links, NodeId, NodeKind, NodeTag};

/// Raised when a name is requested from an expression that has none
/// (e.g. a subscript or call in the middle of an attribute chain).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("expression is not a name")]
    NotAName,
}

/// Walk `parent` links looking for an ancestor whose kind is in `allowed`.
///
/// Traversal stops once a node with a kind in `denied` is reached, so a
/// denied kind acts as a boundary: "is this call inside a try, without
/// crossing a function boundary" is `nearest_ancestor(n, &[Try], FUNC_KINDS)`.
pub fn nearest_ancestor(
    ast: &Ast,
    links: &Links,
    node: NodeId,
    allowed: &[NodeTag],
    denied: &[NodeTag],
) -> Option<NodeId> {
    let mut current = node;
    while !denied.contains(&ast.tag(current)) {
        current = links.parent(current)?;
        if allowed.contains(&ast.tag(current)) {
            return Some(current);
        }
    }
    None
}

/// Outermost ancestor with a kind in `allowed`: applies [`nearest_ancestor`]
/// until it stops matching. Returns the node itself when no ancestor
/// matches at all.
pub fn outermost_ancestor(
    ast: &Ast,
    links: &Links,
    node: NodeId,
    allowed: &[NodeTag],
    denied: &[NodeTag],
) -> NodeId {
    let mut outer = node;
    while let Some(found) = nearest_ancestor(ast, links, outer, allowed, denied) {
        outer = found;
    }
    outer
}

/// Pre-order subtree search: the first node whose kind is in `allowed`
/// wins. Subtrees rooted at a node with a kind in `denied` are not
/// descended into (and the denied node itself never matches).
pub fn nearest_descendant(
    ast: &Ast,
    node: NodeId,
    allowed: &[NodeTag],
    denied: &[NodeTag],
) -> Option<NodeId> {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        let tag = ast.tag(current);
        if denied.contains(&tag) {
            continue;
        }
        if allowed.contains(&tag) {
            return Some(current);
        }
        let children = ast.kind(current).children();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Resolve the dotted name of a bare identifier or attribute-access chain:
/// `root.attr1.attr2`. `omit_trailing` drops that many attributes from the
/// end, used when the final attribute is the thing being assigned rather
/// than part of the object's qualified name.
pub fn dotted_name(ast: &Ast, node: NodeId, omit_trailing: usize) -> Result<String, QueryError> {
    dotted_name_parts(ast, node, omit_trailing).map(|parts| parts.join("."))
}

/// Like [`dotted_name`] but returns the parts unjoined.
pub fn dotted_name_parts(
    ast: &Ast,
    node: NodeId,
    omit_trailing: usize,
) -> Result<Vec<String>, QueryError> {
    if let NodeKind::Name { id } = ast.kind(node) {
        return Ok(vec![id.clone()]);
    }

    let mut attrs = Vec::new();
    let mut current = node;
    loop {
        match ast.kind(current) {
            NodeKind::Attribute { value, attr } => {
                attrs.push(attr.clone());
                current = *value;
            }
            NodeKind::Name { id } => {
                attrs.reverse();
                let keep = attrs.len().saturating_sub(omit_trailing);
                attrs.truncate(keep);
                let mut parts = vec![id.clone()];
                parts.extend(attrs);
                return Ok(parts);
            }
            _ => return Err(QueryError::NotAName),
        }
    }
}

/// Trivially-always-true loop tests: the literal `True`.
pub fn is_always_true(ast: &Ast, test: NodeId) -> bool {
    matches!(
        ast.kind(test),
        NodeKind::Constant {
            value: ConstValue::Bool(true)
        }
    )
}

/// Literal-like right-hand sides: constants and tuple displays. These are
/// what a one-shot module-level assignment may promote to a constant.
pub fn is_literal_like(ast: &Ast, value: NodeId) -> bool {
    matches!(
        ast.kind(value),
        NodeKind::Constant { .. } | NodeKind::Tuple { .. }
    )
}
