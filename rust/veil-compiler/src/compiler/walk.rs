//! Depth-first traversal shared by the analysis passes.
//!
//! A pass implements [`Visitor`] and specialises the node kinds it cares
//! about; everything else falls through to the no-op defaults. Traversal is
//! in source order: `enter` on a node, then its children field by field,
//! then `exit`.

use crate::compiler::ast::{Ast, NodeId};

pub trait Visitor {
    type Error;

    fn enter(&mut self, _ast: &mut Ast, _id: NodeId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit(&mut self, _ast: &mut Ast, _id: NodeId) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Walk the whole tree, stopping at the first error a hook returns.
pub fn walk<V: Visitor>(ast: &mut Ast, visitor: &mut V) -> Result<(), V::Error> {
    if ast.is_empty() {
        return Ok(());
    }
    let root = ast.root();
    walk_node(ast, root, visitor)
}

fn walk_node<V: Visitor>(ast: &mut Ast, id: NodeId, visitor: &mut V) -> Result<(), V::Error> {
    visitor.enter(ast, id)?;
    for (_, child) in ast.children(id) {
        walk_node(ast, child, visitor)?;
    }
    visitor.exit(ast, id)
}
