//! Dynamic bounding-volume tree broad-phase.
//!
//! A binary tree over "fat" leaf boxes: each leaf stores its entity's bounds
//! inflated by [`TreeConfig::margin`], and every branch stores the union of
//! its children. There is no fixed world size. Insertion picks a sibling by
//! the perimeter (2D surface-area) heuristic and rebalances with rotations on
//! the way back up, which keeps update and query cost logarithmic in practice.
//!
//! Unlike the grid, removal is keyed by handle, so it stays correct even if
//! the entity moved since insertion.

use std::fmt;
use std::hash::Hash;

use hashbrown::HashMap;
use sift_geom::Rect;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::TreeConfig;
use crate::entity::Bounded;
use crate::error::ConfigResult;
use crate::resolver::BroadPhase;

type NodeId = usize;

#[derive(Clone, Debug)]
enum NodeKind<H> {
    Leaf(H),
    Branch([NodeId; 2]),
    Free,
}

#[derive(Clone, Debug)]
struct Node<H> {
    aabb: Rect,
    parent: Option<NodeId>,
    /// Leaves are 0.
    height: u32,
    kind: NodeKind<H>,
}

/// Dynamic AABB tree resolver.
pub struct DynamicTree<H> {
    config: TreeConfig,
    nodes: Vec<Node<H>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    /// Every leaf of each handle, most recently inserted last.
    leaves: HashMap<H, SmallVec<[NodeId; 1]>>,
    leaf_count: usize,
}

impl<H: fmt::Debug> fmt::Debug for DynamicTree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTree")
            .field("config", &self.config)
            .field("leaves", &self.leaf_count)
            .field("nodes", &(self.nodes.len() - self.free.len()))
            .finish_non_exhaustive()
    }
}

impl<H: Copy + Eq + Hash + fmt::Debug> DynamicTree<H> {
    pub fn new(config: TreeConfig) -> ConfigResult<Self> {
        config.validate()?;
        debug!(margin = config.margin, "built dynamic tree");
        Ok(Self {
            config,
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            leaves: HashMap::new(),
            leaf_count: 0,
        })
    }

    #[must_use]
    pub const fn config(&self) -> TreeConfig {
        self.config
    }

    /// Height of the root; an empty tree or a lone leaf is 0.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.root.map_or(0, |root| self.nodes[root].height)
    }

    /// Live nodes, branches included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Fat box stored for the most recent registration of `handle`.
    #[must_use]
    pub fn fat_bounds(&self, handle: H) -> Option<Rect> {
        let leaf = *self.leaves.get(&handle)?.last()?;
        Some(self.nodes[leaf].aabb)
    }

    /// Check structural invariants: parent links, branch boxes enclosing
    /// their children, heights, and the handle map.
    pub fn validate(&self) -> Result<(), String> {
        let Some(root) = self.root else {
            return if self.leaf_count == 0 && self.leaves.is_empty() {
                Ok(())
            } else {
                Err(format!("empty tree reports {} leaves", self.leaf_count))
            };
        };
        if self.nodes[root].parent.is_some() {
            return Err(format!("root {root} has a parent"));
        }

        let mut reached = 0;
        let mut leaves = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reached += 1;
            let node = &self.nodes[id];
            match node.kind {
                NodeKind::Free => return Err(format!("free node {id} reachable")),
                NodeKind::Leaf(handle) => {
                    leaves += 1;
                    if node.height != 0 {
                        return Err(format!("leaf {id} has height {}", node.height));
                    }
                    if !self.leaves.get(&handle).is_some_and(|ids| ids.contains(&id)) {
                        return Err(format!("leaf {id} ({handle:?}) missing from handle map"));
                    }
                }
                NodeKind::Branch([a, b]) => {
                    for child in [a, b] {
                        if self.nodes[child].parent != Some(id) {
                            return Err(format!("child {child} does not point back to {id}"));
                        }
                        if !node.aabb.contains(&self.nodes[child].aabb) {
                            return Err(format!("branch {id} does not enclose child {child}"));
                        }
                    }
                    let expected = 1 + self.nodes[a].height.max(self.nodes[b].height);
                    if node.height != expected {
                        return Err(format!(
                            "branch {id} height {} expected {expected}",
                            node.height
                        ));
                    }
                    stack.extend([a, b]);
                }
            }
        }

        if leaves != self.leaf_count {
            return Err(format!("reached {leaves} leaves, counted {}", self.leaf_count));
        }
        if reached != self.node_count() {
            return Err(format!("reached {reached} nodes, {} live", self.node_count()));
        }
        Ok(())
    }

    fn allocate(&mut self, node: Node<H>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id].kind = NodeKind::Free;
        self.nodes[id].parent = None;
        self.free.push(id);
    }

    fn children(&self, id: NodeId) -> Option<[NodeId; 2]> {
        match self.nodes[id].kind {
            NodeKind::Branch(children) => Some(children),
            _ => None,
        }
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if let NodeKind::Branch(children) = &mut self.nodes[parent].kind {
            for child in children.iter_mut().filter(|c| **c == old) {
                *child = new;
            }
        }
    }

    /// Point whatever referenced `old` (its parent, or the root) at `new`.
    fn reattach(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            Some(parent) => self.replace_child(parent, old, new),
            None => self.root = Some(new),
        }
        self.nodes[new].parent = parent;
    }

    /// Recompute a branch's box and height from its children.
    fn refresh(&mut self, id: NodeId) {
        if let Some([a, b]) = self.children(id) {
            let (na, nb) = (&self.nodes[a], &self.nodes[b]);
            let aabb = na.aabb.union(&nb.aabb);
            let height = 1 + na.height.max(nb.height);
            let node = &mut self.nodes[id];
            node.aabb = aabb;
            node.height = height;
        }
    }

    /// Walk from `index` to the root, rebalancing and refreshing each branch.
    fn refit_from(&mut self, mut index: Option<NodeId>) {
        while let Some(id) = index {
            let id = self.balance(id);
            self.refresh(id);
            index = self.nodes[id].parent;
        }
    }

    /// Rotate the taller child of `a` up if the children's heights differ by
    /// more than one. Returns the node now occupying `a`'s position.
    fn balance(&mut self, a: NodeId) -> NodeId {
        let Some([b, c]) = self.children(a) else {
            return a;
        };
        if self.nodes[a].height < 2 {
            return a;
        }

        let diff = i64::from(self.nodes[c].height) - i64::from(self.nodes[b].height);
        let (heavy_slot, heavy) = match diff {
            d if d > 1 => (1, c),
            d if d < -1 => (0, b),
            _ => return a,
        };
        let Some([f, g]) = self.children(heavy) else {
            return a;
        };

        let parent = self.nodes[a].parent;
        self.reattach(parent, a, heavy);
        self.nodes[a].parent = Some(heavy);

        // The taller grandchild stays under `heavy`; the shorter one fills
        // the slot `heavy` vacated under `a`.
        let (tall, short) = if self.nodes[f].height > self.nodes[g].height {
            (f, g)
        } else {
            (g, f)
        };
        let mut a_children = [b, c];
        a_children[heavy_slot] = short;
        self.nodes[a].kind = NodeKind::Branch(a_children);
        self.nodes[short].parent = Some(a);
        self.nodes[heavy].kind = NodeKind::Branch([a, tall]);

        self.refresh(a);
        self.refresh(heavy);
        heavy
    }

    /// Cheapest sibling for a new leaf with box `aabb`.
    fn find_sibling(&self, root: NodeId, aabb: Rect) -> NodeId {
        let mut index = root;
        while let Some([c1, c2]) = self.children(index) {
            let node_aabb = self.nodes[index].aabb;
            let area = node_aabb.perimeter();
            let combined = node_aabb.union(&aabb).perimeter();

            // Cost of pairing with this node, and the minimum cost pushed down
            // to any node below it.
            let cost = 2.0 * combined;
            let inheritance = 2.0 * (combined - area);

            let descend_cost = |child: NodeId| {
                let child_node = &self.nodes[child];
                let merged = child_node.aabb.union(&aabb).perimeter();
                match child_node.kind {
                    NodeKind::Leaf(_) => merged + inheritance,
                    _ => merged - child_node.aabb.perimeter() + inheritance,
                }
            };
            let (cost1, cost2) = (descend_cost(c1), descend_cost(c2));

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { c1 } else { c2 };
        }
        index
    }

    fn insert_leaf(&mut self, leaf: NodeId) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.nodes[leaf].parent = None;
            return;
        };

        let leaf_aabb = self.nodes[leaf].aabb;
        let sibling = self.find_sibling(root, leaf_aabb);
        let old_parent = self.nodes[sibling].parent;

        let branch = self.allocate(Node {
            aabb: leaf_aabb.union(&self.nodes[sibling].aabb),
            parent: None,
            height: self.nodes[sibling].height + 1,
            kind: NodeKind::Branch([sibling, leaf]),
        });
        self.reattach(old_parent, sibling, branch);
        self.nodes[sibling].parent = Some(branch);
        self.nodes[leaf].parent = Some(branch);

        self.refit_from(Some(branch));
    }

    fn remove_leaf(&mut self, leaf: NodeId) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }
        let Some(parent) = self.nodes[leaf].parent else {
            return;
        };
        let Some([a, b]) = self.children(parent) else {
            return;
        };
        let sibling = if a == leaf { b } else { a };
        let grandparent = self.nodes[parent].parent;

        self.reattach(grandparent, parent, sibling);
        self.release(parent);
        self.nodes[leaf].parent = None;

        self.refit_from(grandparent);
    }

    fn relink_leaf(&mut self, leaf: NodeId, bounds: Rect) {
        self.remove_leaf(leaf);
        self.nodes[leaf].aabb = bounds.inflate(self.config.margin);
        self.insert_leaf(leaf);
    }
}

impl<H: Copy + Eq + Hash + fmt::Debug> BroadPhase<H> for DynamicTree<H> {
    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.leaves.clear();
        self.root = None;
        self.leaf_count = 0;
        trace!("dynamic tree cleared");
    }

    fn insert<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E) {
        let handle = entity.handle();
        let leaf = self.allocate(Node {
            aabb: entity.bounds().inflate(self.config.margin),
            parent: None,
            height: 0,
            kind: NodeKind::Leaf(handle),
        });
        self.insert_leaf(leaf);
        self.leaves.entry(handle).or_default().push(leaf);
        self.leaf_count += 1;
    }

    /// Remove the most recent registration of the entity's handle. Its current
    /// bounds are not consulted.
    fn remove<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E) {
        let handle = entity.handle();
        let Some(ids) = self.leaves.get_mut(&handle) else {
            return;
        };
        let Some(leaf) = ids.pop() else {
            return;
        };
        if ids.is_empty() {
            self.leaves.remove(&handle);
        }

        self.remove_leaf(leaf);
        self.release(leaf);
        self.leaf_count -= 1;
    }

    /// Refresh the entity's leaf to its current bounds. The leaf is left in
    /// place while its fat box still encloses the new bounds. An entity that
    /// is not indexed is inserted.
    fn relocate<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E, _previous: Rect) {
        let bounds = entity.bounds();
        let leaf = self
            .leaves
            .get(&entity.handle())
            .and_then(|ids| ids.last().copied());

        match leaf {
            Some(leaf) if self.nodes[leaf].aabb.contains(&bounds) => {}
            Some(leaf) => self.relink_leaf(leaf, bounds),
            None => self.insert(entity),
        }
    }

    /// Every leaf whose fat box overlaps `query`, touching edges included.
    fn retrieve_into(&self, query: Rect, out: &mut Vec<H>) {
        out.clear();
        let Some(root) = self.root else {
            return;
        };

        let mut stack: SmallVec<[NodeId; 64]> = SmallVec::new();
        stack.push(root);
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.aabb.overlaps(&query) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf(handle) => out.push(handle),
                NodeKind::Branch([a, b]) => stack.extend([a, b]),
                NodeKind::Free => {}
            }
        }
    }

    /// Number of leaves.
    fn len(&self) -> usize {
        self.leaf_count
    }
}
