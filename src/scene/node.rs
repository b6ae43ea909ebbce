use glam::Vec2;

use crate::color::Color;

/// A single drawable particle.
///
/// `connections` holds indices into the owning network's node vector; the
/// builder guarantees they are in-range, unique, never self-referential and
/// at most three per node. Vector order doubles as the draw order for the
/// node's connection segments.
#[derive(Debug, Clone)]
pub struct Node {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Current radius, oscillating around `base_radius` with the pulse phase.
    pub radius: f32,
    pub base_radius: f32,
    /// Monotonically increasing phase; wraps implicitly through `sin`.
    pub pulse: f32,
    /// One of the two accent colors, fixed at creation.
    pub color: Color,
    pub connections: Vec<usize>,
    pub network_id: u32,
}
