//! Parent and sibling link table.
//!
//! Two passes over the arena produce a side table: a pre-order parent pass,
//! and a sibling pass that walks every ordered node-sequence field of every
//! node. Nodes outside any sequence (single-child fields) keep empty
//! sibling links. Linking is total over any lowered tree.

use super::{Ast, NodeId};

/// Per-file link table, indexed by [`NodeId`]. Rebuilt for every file.
#[derive(Debug, Clone)]
pub struct Links {
    parent: Vec<Option<NodeId>>,
    prev: Vec<Option<NodeId>>,
    next: Vec<Option<NodeId>>,
}

impl Links {
    /// Build parent and sibling links for the whole tree.
    pub fn build(ast: &Ast) -> Self {
        let mut links = Self {
            parent: vec![None; ast.len()],
            prev: vec![None; ast.len()],
            next: vec![None; ast.len()],
        };
        links.link_parents(ast);
        links.link_siblings(ast);
        links
    }

    fn link_parents(&mut self, ast: &Ast) {
        for node in ast.walk(ast.root()) {
            for child in ast.kind(node).children() {
                self.parent[child.index()] = Some(node);
            }
        }
    }

    fn link_siblings(&mut self, ast: &Ast) {
        for node in ast.walk(ast.root()) {
            for seq in ast.kind(node).sequences() {
                let mut previous: Option<NodeId> = None;
                for &child in seq {
                    if let Some(prev) = previous {
                        self.next[prev.index()] = Some(child);
                    }
                    self.prev[child.index()] = previous;
                    previous = Some(child);
                }
                // The table starts zeroed per file, but clear the tail
                // explicitly: the invariant is that the last element of a
                // sequence never points onward.
                if let Some(last) = previous {
                    self.next[last.index()] = None;
                }
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent[id.index()]
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.prev[id.index()]
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.next[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeKind, Pos};

    fn pass_stmt(ast: &mut Ast, line: usize) -> NodeId {
        ast.add(NodeKind::Pass, Pos::new(line, 4))
    }

    #[test]
    fn test_parent_links() {
        let mut ast = Ast::new();
        let a = pass_stmt(&mut ast, 2);
        let b = pass_stmt(&mut ast, 3);
        let module = ast.add(NodeKind::Module { body: vec![a, b] }, Pos::new(1, 0));
        ast.set_root(module);

        let links = Links::build(&ast);
        assert_eq!(links.parent(a), Some(module));
        assert_eq!(links.parent(b), Some(module));
        assert_eq!(links.parent(module), None);
    }

    #[test]
    fn test_sibling_links_first_and_last_are_none() {
        let mut ast = Ast::new();
        let a = pass_stmt(&mut ast, 2);
        let b = pass_stmt(&mut ast, 3);
        let c = pass_stmt(&mut ast, 4);
        let module = ast.add(NodeKind::Module { body: vec![a, b, c] }, Pos::new(1, 0));
        ast.set_root(module);

        let links = Links::build(&ast);
        assert_eq!(links.prev_sibling(a), None);
        assert_eq!(links.next_sibling(a), Some(b));
        assert_eq!(links.prev_sibling(b), Some(a));
        assert_eq!(links.next_sibling(b), Some(c));
        assert_eq!(links.prev_sibling(c), Some(b));
        assert_eq!(links.next_sibling(c), None);
    }

    #[test]
    fn test_adjacent_sequences_do_not_cross_link() {
        // try body and handler body are distinct sequences on one node;
        // the last statement of the body must not link into the handler.
        let mut ast = Ast::new();
        let body_stmt = pass_stmt(&mut ast, 2);
        let handler_stmt = pass_stmt(&mut ast, 4);
        let handler = ast.add(
            NodeKind::ExceptHandler {
                typ: None,
                name: None,
                body: vec![handler_stmt],
            },
            Pos::new(3, 0),
        );
        let try_stmt = ast.add(
            NodeKind::Try {
                body: vec![body_stmt],
                handlers: vec![handler],
                orelse: vec![],
                finalbody: vec![],
            },
            Pos::new(1, 0),
        );
        let module = ast.add(NodeKind::Module { body: vec![try_stmt] }, Pos::new(1, 0));
        ast.set_root(module);

        let links = Links::build(&ast);
        assert_eq!(links.next_sibling(body_stmt), None);
        assert_eq!(links.prev_sibling(handler), None);
        assert_eq!(links.next_sibling(handler_stmt), None);
    }
}
