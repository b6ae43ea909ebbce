//! Per-frame simulation: pulse phase, drift with edge reflection, and soft
//! repulsion between nodes of different networks.
//!
//! All increments are fixed per frame rather than scaled by wall-clock
//! delta; the field's speed follows the display refresh rate.

use glam::Vec2;

use crate::scene::{Node, NodeHandle, Scene};

/// Pulse phase advance per frame.
pub const PHASE_STEP: f32 = 0.02;
/// Radius oscillation amplitude around the base radius, pixels.
pub const RADIUS_SWING: f32 = 0.5;
/// Opacity oscillates as `ALPHA_BASE + sin(pulse) * ALPHA_SWING`.
pub const ALPHA_BASE: f32 = 0.7;
pub const ALPHA_SWING: f32 = 0.3;
/// Nodes of different networks repel inside this distance, pixels.
pub const REPULSION_RANGE: f32 = 100.0;
/// Impulse per pixel of overlap with the repulsion range.
pub const REPULSION_STRENGTH: f32 = 0.01;

/// Current opacity of a node, derived from its pulse phase.
pub fn node_alpha(node: &Node) -> f32 {
    ALPHA_BASE + node.pulse.sin() * ALPHA_SWING
}

/// Advance the whole scene by one frame tick.
pub fn step(scene: &mut Scene) {
    let dragged = scene.valid_drag_target();
    let bounds = scene.bounds;

    for (network_index, network) in scene.networks.iter_mut().enumerate() {
        for (node_index, node) in network.nodes.iter_mut().enumerate() {
            node.pulse += PHASE_STEP;
            node.radius = node.base_radius + node.pulse.sin() * RADIUS_SWING;

            let handle = NodeHandle {
                network: network_index,
                node: node_index,
            };
            // The drag target's position is driven by the input handlers.
            if dragged != Some(handle) {
                integrate(node, bounds);
            }
        }
    }

    resolve_repulsion(scene, dragged);
}

/// Drift plus elastic boundary reflection, each axis independently.
fn integrate(node: &mut Node, bounds: Vec2) {
    node.position += node.velocity;

    if node.position.x < 0.0 {
        node.position.x = 0.0;
        node.velocity.x = -node.velocity.x;
    } else if node.position.x > bounds.x {
        node.position.x = bounds.x;
        node.velocity.x = -node.velocity.x;
    }

    if node.position.y < 0.0 {
        node.position.y = 0.0;
        node.velocity.y = -node.velocity.y;
    } else if node.position.y > bounds.y {
        node.position.y = bounds.y;
        node.velocity.y = -node.velocity.y;
    }
}

/// Single-pass symmetric impulses between every unordered pair of nodes
/// drawn from two distinct networks. Intra-network pairs never repel.
///
/// O(total nodes squared), acceptable at the 40-96 nodes this field runs;
/// anything bigger would need a spatial grid. Pairs involving the drag
/// target are skipped so its velocity stays pinned at zero for the whole
/// drag.
fn resolve_repulsion(scene: &mut Scene, dragged: Option<NodeHandle>) {
    for a in 0..scene.networks.len() {
        for b in (a + 1)..scene.networks.len() {
            let (head, tail) = scene.networks.split_at_mut(b);
            let network_a = &mut head[a];
            let network_b = &mut tail[0];

            for (i, node_a) in network_a.nodes.iter_mut().enumerate() {
                if dragged == Some(NodeHandle { network: a, node: i }) {
                    continue;
                }
                for (j, node_b) in network_b.nodes.iter_mut().enumerate() {
                    if dragged == Some(NodeHandle { network: b, node: j }) {
                        continue;
                    }

                    let delta = node_b.position - node_a.position;
                    let distance = delta.length();
                    if distance <= 0.0 || distance >= REPULSION_RANGE {
                        continue;
                    }

                    let push = delta / distance * ((REPULSION_RANGE - distance) * REPULSION_STRENGTH);
                    node_a.velocity -= push;
                    node_b.velocity += push;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::scene::{FieldParams, Network};
    use glam::Vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_node(position: Vec2, velocity: Vec2, network_id: u32) -> Node {
        Node {
            position,
            velocity,
            radius: 3.0,
            base_radius: 3.0,
            pulse: 0.0,
            color: Color::from((0x00, 0xd9, 0xff)),
            connections: Vec::new(),
            network_id,
        }
    }

    fn scene_with(networks: Vec<Network>, bounds: Vec2) -> Scene {
        let mut scene = Scene::empty(bounds);
        scene.networks = networks;
        scene
    }

    fn single_node_scene(position: Vec2, velocity: Vec2, bounds: Vec2) -> Scene {
        scene_with(
            vec![Network {
                id: 0,
                nodes: vec![test_node(position, velocity, 0)],
            }],
            bounds,
        )
    }

    #[test]
    fn pulse_drives_radius_oscillation() {
        let mut scene = single_node_scene(
            Vec2::new(100.0, 100.0),
            Vec2::ZERO,
            Vec2::new(800.0, 600.0),
        );
        step(&mut scene);

        let node = &scene.networks[0].nodes[0];
        assert!((node.pulse - PHASE_STEP).abs() < 1e-6);
        let expected = node.base_radius + node.pulse.sin() * RADIUS_SWING;
        assert!((node.radius - expected).abs() < 1e-6);
    }

    #[test]
    fn crossing_the_right_edge_reflects_and_clamps() {
        let mut scene = single_node_scene(
            Vec2::new(799.0, 300.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(800.0, 600.0),
        );
        step(&mut scene);

        let node = &scene.networks[0].nodes[0];
        assert_eq!(node.position.x, 800.0);
        assert!(node.velocity.x < 0.0);
        assert_eq!(node.velocity.x, -3.0);
    }

    #[test]
    fn corner_crossing_reflects_each_axis_independently() {
        // Both axes cross the lower bound in the same step; both must clamp
        // and flip, not just one.
        let mut scene = single_node_scene(
            Vec2::new(2.0, 2.0),
            Vec2::new(-3.0, -3.0),
            Vec2::new(800.0, 800.0),
        );
        step(&mut scene);

        let node = &scene.networks[0].nodes[0];
        assert_eq!(node.position, Vec2::ZERO);
        assert_eq!(node.velocity, Vec2::new(3.0, 3.0));
    }

    #[test]
    fn only_the_crossing_axis_flips() {
        let mut scene = single_node_scene(
            Vec2::new(2.0, 50.0),
            Vec2::new(-3.0, -3.0),
            Vec2::new(800.0, 800.0),
        );
        step(&mut scene);

        let node = &scene.networks[0].nodes[0];
        assert_eq!(node.position, Vec2::new(0.0, 47.0));
        assert_eq!(node.velocity, Vec2::new(3.0, -3.0));
    }

    #[test]
    fn positions_stay_in_bounds_over_many_steps() {
        let mut rng = StdRng::seed_from_u64(99);
        let bounds = Vec2::new(640.0, 480.0);
        let mut scene = Scene::generate(bounds.x, bounds.y, &FieldParams::default(), false, &mut rng);

        for _ in 0..500 {
            step(&mut scene);
        }

        for network in &scene.networks {
            for node in &network.nodes {
                assert!(node.position.x >= 0.0 && node.position.x <= bounds.x);
                assert!(node.position.y >= 0.0 && node.position.y <= bounds.y);
            }
        }
    }

    #[test]
    fn repulsion_is_equal_and_opposite() {
        let mut scene = scene_with(
            vec![
                Network {
                    id: 0,
                    nodes: vec![test_node(Vec2::new(100.0, 100.0), Vec2::ZERO, 0)],
                },
                Network {
                    id: 1,
                    nodes: vec![test_node(Vec2::new(150.0, 100.0), Vec2::ZERO, 1)],
                },
            ],
            Vec2::new(800.0, 600.0),
        );
        step(&mut scene);

        let va = scene.networks[0].nodes[0].velocity;
        let vb = scene.networks[1].nodes[0].velocity;
        assert!((va + vb).length() < 1e-6, "impulses must cancel");

        // d = 50 gives a push of (100 - 50) * 0.01 = 0.5 along x.
        assert!((vb.x - 0.5).abs() < 1e-5);
        assert!((va.x + 0.5).abs() < 1e-5);
        assert_eq!(va.y, 0.0);
        assert_eq!(vb.y, 0.0);
    }

    #[test]
    fn repulsion_ignores_distant_and_coincident_pairs() {
        let mut scene = scene_with(
            vec![
                Network {
                    id: 0,
                    nodes: vec![
                        test_node(Vec2::new(100.0, 100.0), Vec2::ZERO, 0),
                        test_node(Vec2::new(400.0, 400.0), Vec2::ZERO, 0),
                    ],
                },
                Network {
                    id: 1,
                    nodes: vec![
                        test_node(Vec2::new(250.0, 100.0), Vec2::ZERO, 1), // d = 150 from the first
                        test_node(Vec2::new(400.0, 400.0), Vec2::ZERO, 1), // coincident with the second
                    ],
                },
            ],
            Vec2::new(800.0, 600.0),
        );
        step(&mut scene);

        for network in &scene.networks {
            for node in &network.nodes {
                assert_eq!(node.velocity, Vec2::ZERO);
            }
        }
    }

    #[test]
    fn intra_network_nodes_never_repel() {
        let mut scene = scene_with(
            vec![Network {
                id: 0,
                nodes: vec![
                    test_node(Vec2::new(100.0, 100.0), Vec2::ZERO, 0),
                    test_node(Vec2::new(120.0, 100.0), Vec2::ZERO, 0),
                ],
            }],
            Vec2::new(800.0, 600.0),
        );
        step(&mut scene);

        for node in &scene.networks[0].nodes {
            assert_eq!(node.velocity, Vec2::ZERO);
        }
    }

    #[test]
    fn drag_target_skips_motion_and_repulsion() {
        let mut scene = scene_with(
            vec![
                Network {
                    id: 0,
                    nodes: vec![test_node(Vec2::new(100.0, 100.0), Vec2::ZERO, 0)],
                },
                Network {
                    id: 1,
                    nodes: vec![test_node(Vec2::new(150.0, 100.0), Vec2::new(1.0, 0.0), 1)],
                },
            ],
            Vec2::new(800.0, 600.0),
        );
        scene.drag_target = Some(NodeHandle { network: 0, node: 0 });

        step(&mut scene);

        let dragged = &scene.networks[0].nodes[0];
        assert_eq!(dragged.position, Vec2::new(100.0, 100.0));
        assert_eq!(dragged.velocity, Vec2::ZERO);
        // The free node keeps its drift and picks up no impulse either,
        // since its only in-range peer is the drag target.
        let free = &scene.networks[1].nodes[0];
        assert_eq!(free.velocity, Vec2::new(1.0, 0.0));
        // Pulse still advances for the dragged node.
        assert!(dragged.pulse > 0.0);
    }

    #[test]
    fn node_alpha_follows_the_pulse_phase() {
        let mut node = test_node(Vec2::ZERO, Vec2::ZERO, 0);
        node.pulse = 0.0;
        assert!((node_alpha(&node) - ALPHA_BASE).abs() < 1e-6);

        node.pulse = std::f32::consts::FRAC_PI_2;
        assert!((node_alpha(&node) - (ALPHA_BASE + ALPHA_SWING)).abs() < 1e-6);
    }
}
