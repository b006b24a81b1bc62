use std::fmt::Display;

use serde::Serialize;

pub type NodeId = usize;

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode<T> {
    pub value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<T> TreeNode<T> {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// An ordered n-ary tree stored in a flat arena. Children own their position in the
/// parent's child list; the parent link is only used to walk back up with the cursor.
#[derive(Debug, Clone, Serialize)]
pub struct Tree<T> {
    nodes: Vec<TreeNode<T>>,
    root: Option<NodeId>,
    #[serde(skip)]
    current: Option<NodeId>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self {
            nodes: vec![],
            root: None,
            current: None,
        }
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Creates a node which is not attached to any parent yet.
    pub fn node(&mut self, value: T) -> NodeId {
        let id = self.nodes.len();

        self.nodes.push(TreeNode {
            value,
            parent: None,
            children: vec![],
        });

        id
    }

    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn add_child(&mut self, parent: NodeId, value: T) -> NodeId {
        let id = self.node(value);
        self.attach(parent, id);
        id
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, value: T) -> NodeId {
        let id = self.node(value);
        self.nodes[id].parent = Some(parent);

        let children = &mut self.nodes[parent].children;
        children.insert(index.min(children.len()), id);

        id
    }

    /// Moves every node of `subtree` into this arena and appends its root to `parent`.
    pub fn graft(&mut self, parent: NodeId, subtree: Tree<T>) -> Option<NodeId> {
        let offset = self.nodes.len();
        let root = subtree.root? + offset;

        self.nodes
            .extend(subtree.nodes.into_iter().map(|node| TreeNode {
                value: node.value,
                parent: node.parent.map(|id| id + offset),
                children: node.children.into_iter().map(|id| id + offset).collect(),
            }));
        self.attach(parent, root);

        Some(root)
    }

    /// Adds a leaf under the cursor. On an empty tree the leaf becomes the root.
    pub fn add(&mut self, value: T) -> NodeId {
        match self.current {
            Some(current) => self.add_child(current, value),
            None => {
                let id = self.node(value);
                self.root.get_or_insert(id);
                id
            }
        }
    }

    /// Adds a child under the cursor and moves the cursor onto it.
    pub fn descend(&mut self, value: T) -> NodeId {
        let id = self.add(value);
        self.current = Some(id);
        id
    }

    /// Moves the cursor back to the parent of the current node.
    pub fn ascend(&mut self) {
        self.current = self.current.and_then(|id| self.nodes[id].parent);
    }

    /// Number of nodes between the cursor and the root, counting both ends.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.current;

        while let Some(id) = node {
            depth += 1;
            node = self.nodes[id].parent;
        }

        depth
    }

    pub fn get(&self, id: NodeId) -> &TreeNode<T> {
        &self.nodes[id]
    }

    pub fn value(&self, id: NodeId) -> &T {
        &self.nodes[id].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id].value
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id].children.get(index).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn first_leaf(&self, id: NodeId) -> &T {
        let mut node = &self.nodes[id];

        while let Some(&child) = node.children.first() {
            node = &self.nodes[child];
        }

        &node.value
    }

    pub fn last_leaf(&self, id: NodeId) -> &T {
        let mut node = &self.nodes[id];

        while let Some(&child) = node.children.last() {
            node = &self.nodes[child];
        }

        &node.value
    }

    /// Node ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    /// Node ids of the subtree below `id`, parents before children.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = vec![];
        let mut stack = vec![id];

        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }

        order
    }

    fn write_node(&self, f: &mut std::fmt::Formatter<'_>, id: NodeId) -> std::fmt::Result
    where
        T: Display,
    {
        // `None` closes the bracket of the node opened before its children.
        let mut stack = vec![Some(id)];

        while let Some(step) = stack.pop() {
            match step {
                Some(id) => {
                    write!(f, "[{}", self.nodes[id].value)?;
                    stack.push(None);
                    stack.extend(self.nodes[id].children.iter().rev().map(|&child| Some(child)));
                }
                None => write!(f, "]")?,
            }
        }

        Ok(())
    }
}

/// Bracket notation, e.g. `[{}[decl[int][a]]]`.
impl<T: Display> Display for Tree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.root {
            Some(root) => self.write_node(f, root),
            None => Ok(()),
        }
    }
}
