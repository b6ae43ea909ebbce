//! Pointer interaction: a two-state machine (Idle / Dragging) realized by
//! `Scene::drag_target`.
//!
//! Mouse and touch funnel into the same three operations with surface-local
//! coordinates; the window layer maps the returned [`Cursor`] onto the
//! platform cursor icon. All operations run strictly between frames, never
//! concurrently with the simulation step.

use glam::Vec2;

use crate::scene::{NodeHandle, Scene};

/// Extra pick radius around a node, pixels.
pub const GRAB_TOLERANCE: f32 = 10.0;

/// Cursor affordance for the current interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Default,
    /// Hovering a grabbable node.
    Grab,
    /// Actively dragging a node.
    Grabbing,
}

/// Idle -> Dragging: pick the first node within tolerance, scanning networks
/// in iteration order. The picked node is pinned to the pointer immediately
/// so the drag invariant (position = pointer, velocity = zero) holds from
/// the very first frame of the drag.
pub fn pointer_down(scene: &mut Scene, position: Vec2) -> Cursor {
    scene.pointer = position;

    match hit_test(scene, position) {
        Some(handle) => {
            scene.drag_target = Some(handle);
            if let Some(node) = scene.node_mut(handle) {
                node.position = position;
                node.velocity = Vec2::ZERO;
            }
            Cursor::Grabbing
        }
        None => Cursor::Default,
    }
}

/// Dragging: pin the target to the pointer. Idle: update the hover
/// affordance only, with no scene mutation beyond the pointer itself.
pub fn pointer_move(scene: &mut Scene, position: Vec2) -> Cursor {
    scene.pointer = position;

    if let Some(handle) = scene.drag_target {
        if let Some(node) = scene.node_mut(handle) {
            node.position = position;
            node.velocity = Vec2::ZERO;
            return Cursor::Grabbing;
        }
        // Stale handle after a rebuild: drop the drag, fall through to hover.
        scene.drag_target = None;
    }

    if hit_test(scene, position).is_some() {
        Cursor::Grab
    } else {
        Cursor::Default
    }
}

/// Dragging -> Idle.
pub fn pointer_up(scene: &mut Scene) -> Cursor {
    scene.drag_target = None;
    Cursor::Default
}

/// First node within `radius + GRAB_TOLERANCE` of the pointer, in network
/// iteration order. No global distance minimization: the first match wins.
fn hit_test(scene: &Scene, position: Vec2) -> Option<NodeHandle> {
    for (network_index, network) in scene.networks.iter().enumerate() {
        for (node_index, node) in network.nodes.iter().enumerate() {
            if node.position.distance(position) < node.radius + GRAB_TOLERANCE {
                return Some(NodeHandle {
                    network: network_index,
                    node: node_index,
                });
            }
        }
    }
    None
}
