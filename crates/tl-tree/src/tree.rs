use std::cell::Cell;
use std::sync::Arc;

use tl_core::Box2f;

use crate::ConnectedComponent;

pub type NodeId = usize;

/// A node of a component tree. The parent link is a plain back reference;
/// ownership flows strictly from the tree's arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub component: Arc<ConnectedComponent>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A rooted tree of connected components, stored in an arena indexed by
/// [`NodeId`].
///
/// Components are shared (`Arc`) so structural copies never duplicate pixel
/// data. The bounding box is the union of all component boxes, computed on
/// first use and invalidated by mutation.
#[derive(Debug, Default)]
pub struct ComponentTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    bounding_box: Cell<Option<Box2f>>,
}

impl ComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, component: Arc<ConnectedComponent>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            component,
            parent: None,
            children: Vec::new(),
        });
        self.bounding_box.set(None);
        id
    }

    /// Appends `child` to `parent`'s children and sets the back link.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        self.bounding_box.set(None);
    }

    pub fn set_root(&mut self, root: NodeId) {
        assert!(root < self.nodes.len(), "root is not a node of this tree");
        self.root = Some(root);
        self.bounding_box.set(None);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes reachable from the root.
    pub fn count(&self) -> usize {
        let Some(root) = self.root else { return 0 };
        let mut num = 0;
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            num += 1;
            stack.extend_from_slice(&self.nodes[n].children);
        }
        num
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.bounding_box.set(None);
    }

    /// Depth-first traversal from the root. `enter` runs before a node's
    /// children, `leave` after. Children are visited in insertion order.
    pub fn visit<E, L>(&self, mut enter: E, mut leave: L)
    where
        E: FnMut(NodeId, &Node),
        L: FnMut(NodeId, &Node),
    {
        let Some(root) = self.root else { return };

        enum Step {
            Enter(NodeId),
            Leave(NodeId),
        }

        let mut stack = vec![Step::Enter(root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id) => {
                    let node = &self.nodes[id];
                    enter(id, node);
                    stack.push(Step::Leave(id));
                    for &child in node.children.iter().rev() {
                        stack.push(Step::Enter(child));
                    }
                }
                Step::Leave(id) => leave(id, &self.nodes[id]),
            }
        }
    }

    /// A structural copy sharing the underlying components.
    pub fn clone_structure(&self) -> ComponentTree {
        let mut out = ComponentTree::new();
        let Some(root) = self.root else { return out };

        let new_root = out.add_node(self.nodes[root].component.clone());
        out.set_root(new_root);

        let mut stack: Vec<(NodeId, NodeId)> = self.nodes[root]
            .children
            .iter()
            .rev()
            .map(|&c| (c, new_root))
            .collect();

        while let Some((old, new_parent)) = stack.pop() {
            let clone = out.add_node(self.nodes[old].component.clone());
            out.add_child(new_parent, clone);
            for &c in self.nodes[old].children.iter().rev() {
                stack.push((c, clone));
            }
        }

        out
    }

    /// The union of all component bounding boxes, cached until the tree is
    /// mutated.
    pub fn bounding_box(&self) -> Box2f {
        if let Some(cached) = self.bounding_box.get() {
            return cached;
        }

        let mut bb = Box2f::default();
        let Some(root) = self.root else { return bb };
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            bb.fit(self.nodes[n].component.bounding_box().to_f32());
            stack.extend_from_slice(&self.nodes[n].children);
        }

        self.bounding_box.set(Some(bb));
        bb
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use tl_core::Pixel;

    use super::ComponentTree;
    use crate::{ConnectedComponent, PixelList};

    pub(crate) fn leaf_component(pixels: &[(u32, u32)], value: f32) -> Arc<ConnectedComponent> {
        let list = Arc::new(PixelList::with_capacity(pixels.len()));
        for &(x, y) in pixels {
            list.add(Pixel::new(x, y)).expect("within capacity");
        }
        let size = list.len();
        Arc::new(ConnectedComponent::new(list, 0, size, value))
    }

    fn chain_tree() -> ComponentTree {
        // root covers everything, one nested child, one leaf
        let mut tree = ComponentTree::new();
        let leaf = tree.add_node(leaf_component(&[(0, 0)], 0.0));
        let mid = tree.add_node(leaf_component(&[(0, 0), (1, 0)], 0.5));
        let root = tree.add_node(leaf_component(&[(0, 0), (1, 0), (1, 1)], 1.0));
        tree.add_child(mid, leaf);
        tree.add_child(root, mid);
        tree.set_root(root);
        tree
    }

    #[test]
    fn count_and_links() {
        let tree = chain_tree();
        assert_eq!(tree.count(), 3);

        let root = tree.root().expect("tree has a root");
        let mid = tree.node(root).children[0];
        assert_eq!(tree.node(mid).parent, Some(root));
    }

    #[test]
    fn visit_orders_enter_before_children_before_leave() {
        let tree = chain_tree();
        let order = std::cell::RefCell::new(Vec::new());
        tree.visit(
            |id, _| order.borrow_mut().push(("enter", id)),
            |id, _| order.borrow_mut().push(("leave", id)),
        );

        let root = tree.root().expect("tree has a root");
        let mid = tree.node(root).children[0];
        let leaf = tree.node(mid).children[0];
        let order = order.into_inner();
        assert_eq!(
            order,
            vec![
                ("enter", root),
                ("enter", mid),
                ("enter", leaf),
                ("leave", leaf),
                ("leave", mid),
                ("leave", root),
            ]
        );
    }

    #[test]
    fn clone_structure_shares_components() {
        let tree = chain_tree();
        let copy = tree.clone_structure();

        assert_eq!(copy.count(), tree.count());

        let old_root = tree.root().expect("tree has a root");
        let new_root = copy.root().expect("copy has a root");
        assert!(Arc::ptr_eq(
            &tree.node(old_root).component,
            &copy.node(new_root).component
        ));
    }

    #[test]
    fn bounding_box_is_union_of_components() {
        let tree = chain_tree();
        let bb = tree.bounding_box();
        assert_eq!(
            (bb.min_x, bb.min_y, bb.max_x, bb.max_y),
            (0.0, 0.0, 2.0, 2.0)
        );
    }
}
