use super::node::Node;

/// An independently simulated cluster of connected nodes.
///
/// Node order is irrelevant to the simulation but must stay stable within a
/// scene generation: connections reference nodes by position in `nodes`.
#[derive(Debug, Clone)]
pub struct Network {
    pub id: u32,
    pub nodes: Vec<Node>,
}
