pub mod builder;
pub mod network;
pub mod node;

pub use network::Network;
pub use node::Node;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Index-based weak reference to a node.
///
/// A scene rebuild discards the previous generation wholesale, so a handle
/// must be revalidated through [`Scene::node`] / [`Scene::node_mut`] on every
/// use; a stale handle simply resolves to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle {
    pub network: usize,
    pub node: usize,
}

/// Generation parameters for the particle field.
///
/// Host pages can replace these wholesale with a JSON payload; unspecified
/// fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    /// Cluster count on a regular display.
    pub networks: u32,
    /// Cluster count when the display is constrained (narrow viewport).
    pub networks_constrained: u32,
    pub min_nodes_per_network: usize,
    pub max_nodes_per_network: usize,
    /// Radial spread of a cluster around its center, pixels.
    pub cluster_spread: f32,
    /// Per-axis positional jitter added on top of the radial layout, pixels.
    pub position_jitter: f32,
    /// Only peers closer than this are eligible as connections, pixels.
    pub connect_distance: f32,
    /// Upper bound on connections synthesized per node.
    pub max_connections: usize,
    pub min_base_radius: f32,
    pub max_base_radius: f32,
    /// Initial drift speed per axis is sampled from `±max_axis_speed`.
    pub max_axis_speed: f32,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            networks: 8,
            networks_constrained: 6,
            min_nodes_per_network: 5,
            max_nodes_per_network: 12,
            cluster_spread: 120.0,
            position_jitter: 60.0,
            connect_distance: 150.0,
            max_connections: 3,
            min_base_radius: 2.0,
            max_base_radius: 5.0,
            max_axis_speed: 0.25,
        }
    }
}

/// The full animated scene for one viewport generation.
///
/// Owned and mutated exclusively by the frame loop and the input handlers,
/// which never run concurrently.
#[derive(Debug)]
pub struct Scene {
    pub networks: Vec<Network>,
    /// Viewport size in surface pixels; nodes are confined to `[0, bounds]`.
    pub bounds: Vec2,
    /// Drag state: `None` is Idle, `Some` is Dragging that node.
    pub drag_target: Option<NodeHandle>,
    /// Last surface-local pointer position reported by the host.
    pub pointer: Vec2,
}

impl Scene {
    pub fn empty(bounds: Vec2) -> Self {
        Self {
            networks: Vec::new(),
            bounds,
            drag_target: None,
            pointer: Vec2::ZERO,
        }
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.networks
            .get(handle.network)
            .and_then(|network| network.nodes.get(handle.node))
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.networks
            .get_mut(handle.network)
            .and_then(|network| network.nodes.get_mut(handle.node))
    }

    pub fn node_count(&self) -> usize {
        self.networks.iter().map(|network| network.nodes.len()).sum()
    }

    /// The drag target, dropped if the handle no longer resolves.
    pub fn valid_drag_target(&self) -> Option<NodeHandle> {
        self.drag_target.filter(|&handle| self.node(handle).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handle_resolves_to_none() {
        let scene = Scene::empty(Vec2::new(800.0, 600.0));
        let handle = NodeHandle { network: 0, node: 0 };
        assert!(scene.node(handle).is_none());
    }

    #[test]
    fn valid_drag_target_drops_stale_handles() {
        let mut scene = Scene::empty(Vec2::new(800.0, 600.0));
        scene.drag_target = Some(NodeHandle { network: 3, node: 7 });
        assert_eq!(scene.valid_drag_target(), None);
    }

    #[test]
    fn field_params_deserialize_with_partial_json() {
        let params: FieldParams = serde_json::from_str(r#"{"networks": 4}"#).unwrap();
        assert_eq!(params.networks, 4);
        assert_eq!(params.networks_constrained, 6);
        assert_eq!(params.max_connections, 3);
    }
}
