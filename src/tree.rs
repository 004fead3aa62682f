//! Interface to the tree-processing stages.
//!
//! Trees are built, rooted, masked and pruned elsewhere. The run log only
//! needs to count leaves and taxa, read the taxon of a paralog, and print a
//! topology, so that is all this trait asks for.

use std::collections::HashSet;

/// A node of a phylogenetic tree, standing for the subtree below it.
pub trait TreeNode {
    /// Leaf nodes of this subtree, in traversal order. A leaf yields itself.
    fn leaves(&self) -> Vec<&Self>;

    /// Taxon (OTU) of this node; `None` for internal nodes.
    fn taxon(&self) -> Option<&str>;

    /// Text rendering of the topology below this node.
    fn view(&self) -> String;

    /// Taxa of all leaves, in leaf order, duplicates included.
    fn taxa(&self) -> Vec<&str> {
        self.leaves().into_iter().filter_map(|leaf| leaf.taxon()).collect()
    }

    /// Number of leaves below this node.
    fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Number of distinct taxa among the leaves.
    fn taxon_count(&self) -> usize {
        self.taxa().into_iter().collect::<HashSet<_>>().len()
    }
}
