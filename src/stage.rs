//! Per-frame world transforms for a flattened scene.

use three_d::*;

use crate::log; // macro import
use crate::motion::{Animator, Clock, ElementId, ElementState};
use crate::scene::FlatNode;


struct StageNode {
    parent: Option<usize>,
    base: ElementState,
    element: Option<ElementId>,
}

/// Holds the animator for a flattened scene and the world matrix of every node.
pub struct Stage {
    nodes: Vec<StageNode>,
    animator: Animator,
    world: Vec<Mat4>,
}

impl Stage {
    /// Registers every node that has motions. Expects parents before children.
    pub fn new(flat: &[FlatNode]) -> Self {
        let mut animator = Animator::new();
        let nodes = flat
            .iter()
            .map(|node| StageNode {
                parent: node.parent,
                base: node.base,
                element: (!node.motions.is_empty())
                    .then(|| animator.register(node.name.clone(), node.base, node.motions.clone())),
            })
            .collect::<Vec<_>>();
        log!("Stage::new(): nodes={}, animated={}", nodes.len(), animator.len());

        let mut stage = Self {
            world: vec![Mat4::identity(); nodes.len()],
            nodes,
            animator,
        };
        stage.refresh_world();
        stage
    }

    /// Samples every motion at the clock's time and rebuilds world matrices.
    pub fn update(&mut self, clock: &Clock) {
        self.animator.tick(clock);
        self.refresh_world();
    }

    fn refresh_world(&mut self) {
        for i in 0..self.nodes.len() {
            let local = self.state(i).matrix();
            self.world[i] = match self.nodes[i].parent {
                Some(parent) => self.world[parent] * local,
                None => local,
            };
        }
    }

    /// Current local state of node `i`.
    pub fn state(&self, i: usize) -> ElementState {
        let node = &self.nodes[i];
        match node.element {
            Some(id) => *self.animator.state(id),
            None => node.base,
        }
    }

    pub fn world(&self, i: usize) -> Mat4 {
        self.world[i]
    }

    pub fn world_position(&self, i: usize) -> Vec3 {
        let p = self.world[i] * vec4(0.0, 0.0, 0.0, 1.0);
        vec3(p.x, p.y, p.z)
    }

    pub fn is_animated(&self, i: usize) -> bool {
        self.nodes[i].element.is_some()
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
