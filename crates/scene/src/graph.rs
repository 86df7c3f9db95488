//! Arena of transforms linked into a parent/child hierarchy.
//!
//! # Invariants
//! - `child.parent == Some(p)` iff `child` appears exactly once in
//!   `p.children`.
//! - The parent links never form a cycle; edits that would are rejected.
//! - A world matrix refresh marks only the direct children dirty. Deeper
//!   descendants pick the change up as each level updates.

use glscene_gl::{GlContext, GlError, GpuResources};
use glscene_math::{Bounds, Mat4};
use tracing::{debug, trace, warn};

use crate::transform::{NodeId, Transform};

#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Transform>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transform: Transform) -> NodeId {
        self.nodes.push(transform);
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Transform> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.nodes.get_mut(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// True if `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(Transform::parent);
        }
        false
    }

    fn can_link(&self, parent: NodeId, child: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(child) {
            warn!(%parent, %child, "hierarchy edit on unknown node rejected");
            return false;
        }
        if self.is_ancestor(child, parent) {
            warn!(%parent, %child, "hierarchy edit would form a cycle, rejected");
            return false;
        }
        true
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(old) = self.nodes[child.0].parent.take() else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(old.0) {
            p.children.retain(|&c| c != child);
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        self.nodes[parent.0].children.push(child);
        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.matrix_needs_update = true;
        debug!(%parent, %child, "node attached");
    }

    /// Make `parent` the parent of `child`, leaving any previous parent.
    /// Returns false for unknown ids or if the link would form a cycle.
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> bool {
        if !self.can_link(parent, child) {
            return false;
        }
        self.link(parent, child);
        true
    }

    /// Attach `child` under `parent`. Already being a child of `parent` is a
    /// successful no-op.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.can_link(parent, child) {
            return false;
        }
        if self.nodes[child.0].parent == Some(parent) {
            return true;
        }
        self.link(parent, child);
        true
    }

    /// Remove `child` from its parent. Returns false if it had none.
    pub fn detach(&mut self, child: NodeId) -> bool {
        match self.get(child).and_then(Transform::parent) {
            Some(parent) => {
                self.unlink(child);
                self.nodes[child.0].matrix_needs_update = true;
                debug!(%parent, %child, "node detached");
                true
            }
            None => false,
        }
    }

    /// Run the node's update hook, then refresh its matrices if dirty.
    pub fn update(&mut self, id: NodeId) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        node.run_on_update();
        if node.matrix_needs_update {
            self.update_matrix(id);
        }
    }

    /// Recompute the world matrices of `id` against its parent's current world
    /// matrix, refresh bounds up the parent chain and mark direct children
    /// dirty. Camera nodes also refresh their view-projection.
    pub fn update_matrix(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).map(Transform::parent) else {
            return;
        };
        let parent_world = parent.and_then(|p| self.get(p)).map(|p| *p.local_to_world());

        let node = &mut self.nodes[id.0];
        node.recompute_matrices(parent_world.as_ref());
        trace!(node = %id, "world matrix updated");

        self.update_bounds(id);

        let node = &mut self.nodes[id.0];
        let children = node.children.clone();
        node.matrix_needs_update = false;
        node.update_view_projection_matrix();
        for child in children {
            if let Some(c) = self.nodes.get_mut(child.0) {
                c.matrix_needs_update = true;
            }
        }
    }

    /// World bounds of `id`: its mesh bounds in world space (or its world
    /// origin without a mesh), extended by the children's bounds. Repeats for
    /// every ancestor.
    pub fn update_bounds(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(node) = self.nodes.get(id.0) else {
                return;
            };
            let mut bounds = Bounds::default();
            match &node.mesh_bounds {
                Some(local) => bounds.from_bounds_with_matrix(local, &node.local_to_world),
                None => {
                    let origin = node.local_to_world.translation();
                    bounds.set_min_max(origin, origin);
                }
            }
            for child in &node.children {
                if let Some(c) = self.nodes.get(child.0) {
                    bounds.extend_to_bounds(&c.bounds);
                }
            }
            current = node.parent;
            self.nodes[id.0].bounds = bounds;
        }
    }

    /// Draw one node with the given view-projection.
    pub fn draw(
        &mut self,
        id: NodeId,
        ctx: &mut dyn GlContext,
        resources: &mut GpuResources,
        view_projection: &Mat4,
    ) -> Result<(), GlError> {
        match self.get_mut(id) {
            Some(node) => node.draw(ctx, resources, view_projection),
            None => Ok(()),
        }
    }
}
