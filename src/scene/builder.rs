//! Scene generation: scattered clusters with sparse local connectivity.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use crate::color::Color;

use super::{FieldParams, Network, Node, Scene};

/// The two accent colors nodes are drawn with, assigned at creation.
fn accent_colors() -> [Color; 2] {
    [
        Color::from((0x00, 0xd9, 0xff)), // cyan
        Color::from((0x7c, 0x3a, 0xed)), // violet
    ]
}

impl Scene {
    /// Build a fresh scene for the given viewport.
    ///
    /// Destructive by contract: callers replace their previous scene
    /// wholesale, which also invalidates any outstanding [`super::NodeHandle`].
    pub fn generate(
        width: f32,
        height: f32,
        params: &FieldParams,
        constrained: bool,
        rng: &mut impl Rng,
    ) -> Self {
        let network_count = if constrained {
            params.networks_constrained
        } else {
            params.networks
        };

        let mut scene = Scene::empty(Vec2::new(width, height));
        for id in 0..network_count {
            let center = Vec2::new(
                rng.random_range(0.0..=width),
                rng.random_range(0.0..=height),
            );
            let node_count =
                rng.random_range(params.min_nodes_per_network..=params.max_nodes_per_network);
            scene
                .networks
                .push(build_network(center, node_count, id, params, rng));
        }
        scene
    }
}

/// Build one cluster: nodes on a noisy radial layout around `center`, then
/// sparse nearest-neighbor connections.
pub fn build_network(
    center: Vec2,
    node_count: usize,
    id: u32,
    params: &FieldParams,
    rng: &mut impl Rng,
) -> Network {
    let mut nodes = Vec::with_capacity(node_count);

    for i in 0..node_count {
        let angle = (i as f32 / node_count as f32) * TAU;
        let distance = rng.random_range(0.0..params.cluster_spread);
        let jitter = Vec2::new(
            (rng.random::<f32>() - 0.5) * params.position_jitter,
            (rng.random::<f32>() - 0.5) * params.position_jitter,
        );
        let position = center + Vec2::from_angle(angle) * distance + jitter;
        nodes.push(spawn_node(position, id, params, rng));
    }

    synthesize_connections(&mut nodes, params, rng);

    Network { id, nodes }
}

fn spawn_node(position: Vec2, network_id: u32, params: &FieldParams, rng: &mut impl Rng) -> Node {
    let base_radius = rng.random_range(params.min_base_radius..params.max_base_radius);
    let palette = accent_colors();
    let color = palette[usize::from(rng.random_bool(0.5))];
    Node {
        position,
        velocity: Vec2::new(
            (rng.random::<f32>() - 0.5) * params.max_axis_speed * 2.0,
            (rng.random::<f32>() - 0.5) * params.max_axis_speed * 2.0,
        ),
        radius: base_radius,
        base_radius,
        pulse: rng.random_range(0.0..TAU),
        color,
        connections: Vec::new(),
        network_id,
    }
}

/// Connect each node to its 1-3 nearest in-cluster peers, but only within
/// `connect_distance`. The resulting graph is sparse and locally connected,
/// never complete, so line-draw cost stays bounded per frame.
fn synthesize_connections(nodes: &mut [Node], params: &FieldParams, rng: &mut impl Rng) {
    for i in 0..nodes.len() {
        let wanted = rng.random_range(1..=params.max_connections);
        let origin = nodes[i].position;

        let mut candidates: Vec<(usize, f32)> = nodes
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, peer)| (j, origin.distance(peer.position)))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        for &(target, distance) in candidates.iter().take(wanted) {
            if distance < params.connect_distance && !nodes[i].connections.contains(&target) {
                nodes[i].connections.push(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn params() -> FieldParams {
        FieldParams::default()
    }

    #[test]
    fn generated_connections_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        let scene = Scene::generate(1280.0, 720.0, &params(), false, &mut rng);

        assert_eq!(scene.networks.len(), 8);
        for network in &scene.networks {
            for (i, node) in network.nodes.iter().enumerate() {
                assert!(node.connections.len() <= 3);
                let mut seen = node.connections.clone();
                seen.sort_unstable();
                seen.dedup();
                assert_eq!(seen.len(), node.connections.len(), "duplicate connection");
                for &target in &node.connections {
                    assert_ne!(target, i, "self-connection");
                    assert!(target < network.nodes.len(), "index out of range");
                }
            }
        }
    }

    #[test]
    fn connection_distances_stay_under_threshold() {
        let mut rng = StdRng::seed_from_u64(11);
        let scene = Scene::generate(1280.0, 720.0, &params(), false, &mut rng);

        for network in &scene.networks {
            for node in &network.nodes {
                for &target in &node.connections {
                    let distance = node.position.distance(network.nodes[target].position);
                    assert!(distance < params().connect_distance);
                }
            }
        }
    }

    #[test]
    fn constrained_display_gets_fewer_networks() {
        let mut rng = StdRng::seed_from_u64(3);
        let scene = Scene::generate(375.0, 667.0, &params(), true, &mut rng);
        assert_eq!(scene.networks.len(), 6);
    }

    #[test]
    fn network_ids_match_their_nodes() {
        let mut rng = StdRng::seed_from_u64(5);
        let scene = Scene::generate(1024.0, 768.0, &params(), false, &mut rng);
        for network in &scene.networks {
            assert!(!network.nodes.is_empty());
            assert!(network.nodes.iter().all(|node| node.network_id == network.id));
        }
    }

    #[test]
    fn six_node_cluster_connects_every_node() {
        // Tight layout keeps every pair under the threshold, so each node
        // must come out with between one and three connections.
        let mut tight = params();
        tight.cluster_spread = 50.0;
        tight.position_jitter = 10.0;

        let mut rng = StdRng::seed_from_u64(42);
        let network = build_network(Vec2::new(400.0, 300.0), 6, 0, &tight, &mut rng);

        assert_eq!(network.nodes.len(), 6);
        for node in &network.nodes {
            assert!(
                (1..=3).contains(&node.connections.len()),
                "expected 1-3 connections, got {}",
                node.connections.len()
            );
            for &target in &node.connections {
                let distance = node.position.distance(network.nodes[target].position);
                assert!(distance < tight.connect_distance);
            }
        }
    }

    #[test]
    fn single_node_network_stays_isolated() {
        let mut rng = StdRng::seed_from_u64(13);
        let network = build_network(Vec2::new(10.0, 10.0), 1, 0, &params(), &mut rng);
        assert_eq!(network.nodes.len(), 1);
        assert!(network.nodes[0].connections.is_empty());
    }

    #[test]
    fn node_speed_and_radius_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(23);
        let p = params();
        let network = build_network(Vec2::new(200.0, 200.0), 12, 1, &p, &mut rng);
        for node in &network.nodes {
            assert!(node.velocity.x.abs() <= p.max_axis_speed);
            assert!(node.velocity.y.abs() <= p.max_axis_speed);
            assert!(node.base_radius >= p.min_base_radius);
            assert!(node.base_radius < p.max_base_radius);
            assert_eq!(node.radius, node.base_radius);
        }
    }
}
