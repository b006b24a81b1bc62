mod tree;

pub use tree::{NodeId, Tree, TreeNode};
