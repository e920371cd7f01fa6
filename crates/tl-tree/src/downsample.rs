use crate::{ComponentTree, NodeId};

/// Collapses maximal chains of unary nodes: below the root, every chain of
/// nodes with exactly one child is replaced by the node the chain ends in.
///
/// The root is preserved even if unary. In the result, only the root can
/// have exactly one child. Components are shared with the input tree;
/// applying the operation twice gives the same tree as applying it once.
pub fn downsample(tree: &ComponentTree) -> ComponentTree {
    let mut out = ComponentTree::new();
    let Some(old_root) = tree.root() else {
        return out;
    };

    let new_root = out.add_node(tree.node(old_root).component.clone());
    out.set_root(new_root);

    let mut stack: Vec<(NodeId, NodeId)> = tree
        .node(old_root)
        .children
        .iter()
        .rev()
        .map(|&child| (child, new_root))
        .collect();

    while let Some((old, new_parent)) = stack.pop() {
        // skip along the chain of single children
        let mut node = old;
        while tree.node(node).children.len() == 1 {
            node = tree.node(node).children[0];
        }

        let clone = out.add_node(tree.node(node).component.clone());
        out.add_child(new_parent, clone);

        for &child in tree.node(node).children.iter().rev() {
            stack.push((child, clone));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::downsample;
    use crate::tree::tests::leaf_component;
    use crate::ComponentTree;

    #[test]
    fn chain_collapses_to_its_last_node() {
        // r -> a -> b -> c with no branching
        let mut tree = ComponentTree::new();
        let c = tree.add_node(leaf_component(&[(0, 0)], 0.0));
        let b = tree.add_node(leaf_component(&[(0, 0), (1, 0)], 1.0));
        let a = tree.add_node(leaf_component(&[(0, 0), (1, 0), (2, 0)], 2.0));
        let r = tree.add_node(leaf_component(&[(0, 0), (1, 0), (2, 0), (3, 0)], 3.0));
        tree.add_child(b, c);
        tree.add_child(a, b);
        tree.add_child(r, a);
        tree.set_root(r);

        let down = downsample(&tree);
        assert_eq!(down.count(), 2);

        let new_root = down.root().expect("tree has a root");
        assert!(Arc::ptr_eq(
            &down.node(new_root).component,
            &tree.node(r).component
        ));

        let child = down.node(new_root).children[0];
        assert!(Arc::ptr_eq(
            &down.node(child).component,
            &tree.node(c).component
        ));
        assert!(down.node(child).children.is_empty());
    }

    #[test]
    fn branches_are_kept() {
        // r -> a -> {b, c}; the unary chain r -> a collapses below r only
        let mut tree = ComponentTree::new();
        let b = tree.add_node(leaf_component(&[(0, 0)], 0.0));
        let c = tree.add_node(leaf_component(&[(2, 0)], 0.0));
        let a = tree.add_node(leaf_component(&[(0, 0), (1, 0), (2, 0)], 1.0));
        let r = tree.add_node(leaf_component(&[(0, 0), (1, 0), (2, 0), (3, 0)], 2.0));
        tree.add_child(a, b);
        tree.add_child(a, c);
        tree.add_child(r, a);
        tree.set_root(r);

        let down = downsample(&tree);
        assert_eq!(down.count(), 4);

        let new_root = down.root().expect("tree has a root");
        let branch = down.node(new_root).children[0];
        assert!(Arc::ptr_eq(
            &down.node(branch).component,
            &tree.node(a).component
        ));
        assert_eq!(down.node(branch).children.len(), 2);
    }

    #[test]
    fn downsampling_is_idempotent() {
        let mut tree = ComponentTree::new();
        let leaf1 = tree.add_node(leaf_component(&[(0, 0)], 0.0));
        let leaf2 = tree.add_node(leaf_component(&[(4, 0)], 0.0));
        let mid1 = tree.add_node(leaf_component(&[(0, 0), (1, 0)], 1.0));
        let mid2 = tree.add_node(leaf_component(&[(0, 0), (1, 0), (2, 0)], 2.0));
        let r = tree.add_node(leaf_component(&[(0, 0), (1, 0), (2, 0), (4, 0)], 3.0));
        tree.add_child(mid1, leaf1);
        tree.add_child(mid2, mid1);
        tree.add_child(r, mid2);
        tree.add_child(r, leaf2);
        tree.set_root(r);

        let once = downsample(&tree);
        let twice = downsample(&once);

        assert_eq!(once.count(), twice.count());

        // no node below the root has exactly one child
        for d in [&once, &twice] {
            let root = d.root().expect("tree has a root");
            let mut stack = d.node(root).children.clone();
            while let Some(n) = stack.pop() {
                assert_ne!(d.node(n).children.len(), 1);
                stack.extend_from_slice(&d.node(n).children);
            }
        }
    }

    #[test]
    fn empty_tree_stays_empty() {
        let tree = ComponentTree::new();
        let down = downsample(&tree);
        assert!(down.root().is_none());
    }
}
