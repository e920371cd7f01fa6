use crate::{ComponentTree, NodeId};

/// Produces a structural copy of `tree` in which no kept subtree is higher
/// than `max_height` (counted in edges down to the deepest leaf).
///
/// Nodes whose height exceeds the limit are discarded; their kept subtrees
/// re-attach directly to the root of the result. Connected components are
/// shared with the input tree. The operation is idempotent.
pub fn prune(tree: &ComponentTree, max_height: usize) -> ComponentTree {
    let mut out = ComponentTree::new();
    let Some(old_root) = tree.root() else {
        return out;
    };

    // clone of the input root that collects re-attached subtrees; created
    // only if some node exceeds the limit
    let mut fallback_root: Option<NodeId> = None;

    // per-arena-slot result of the post-order walk
    let mut kept: Vec<Option<NodeId>> = vec![None; tree.len()];
    let mut height: Vec<i64> = vec![0; tree.len()];

    let mut stack: Vec<(NodeId, usize)> = vec![(old_root, 0)];
    while let Some(top) = stack.len().checked_sub(1) {
        let (node, next_child) = stack[top];
        let children = &tree.node(node).children;

        if next_child < children.len() {
            stack[top].1 += 1;
            stack.push((children[next_child], 0));
            continue;
        }
        stack.pop();

        let max_child_height = children.iter().map(|&c| height[c]).max().unwrap_or(-1);
        height[node] = max_child_height + 1;

        let kept_children: Vec<NodeId> =
            children.iter().filter_map(|&c| kept[c]).collect();

        if height[node] > max_height as i64 {
            // this node goes away; its surviving subtrees move to the root
            let root = *fallback_root
                .get_or_insert_with(|| out.add_node(tree.node(old_root).component.clone()));
            for child in kept_children {
                out.add_child(root, child);
            }
        } else {
            let clone = out.add_node(tree.node(node).component.clone());
            for child in kept_children {
                out.add_child(clone, child);
            }
            kept[node] = Some(clone);
        }
    }

    match kept[old_root] {
        // the whole tree stayed below the limit
        Some(root) => out.set_root(root),
        None => out.set_root(fallback_root.expect("exceeding root created the fallback")),
    }

    out
}
