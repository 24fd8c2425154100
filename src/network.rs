//! Location graph and risk-weighted shortest paths.
//!
//! The graph is rebuilt per planning session from a list of named locations:
//! every location gets a directed edge to each of its nearest neighbours, and
//! each edge inherits the risk of the flood zone containing its midpoint.
//!
//! Edge cost multipliers when hazards are avoided:
//!
//! | Risk   | Multiplier |
//! |--------|------------|
//! | Safe   | 1.0        |
//! | Low    | 1.5        |
//! | Medium | 2.0        |
//! | High   | impassable |
//!
//! Without hazard avoidance every edge costs its distance.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_distance, point_in_polygon};
use crate::{Coordinate, FloodZone, OptionExt, Result, Severity};

/// Risk attached to a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
}

impl From<Severity> for RiskLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::High => RiskLevel::High,
            Severity::Medium => RiskLevel::Medium,
            Severity::Low => RiskLevel::Low,
            Severity::Safe => RiskLevel::Safe,
        }
    }
}

impl RiskLevel {
    /// Cost multiplier for this risk, `None` if the edge must not be used.
    pub fn cost_multiplier(self, avoid_hazards: bool) -> Option<f64> {
        if !avoid_hazards {
            return Some(1.0);
        }
        match self {
            RiskLevel::Safe => Some(1.0),
            RiskLevel::Low => Some(1.5),
            RiskLevel::Medium => Some(2.0),
            RiskLevel::High => None,
        }
    }
}

/// Directed edge to another node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub node_id: String,
    /// Great-circle length in kilometers
    pub distance_km: f64,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub coordinates: Coordinate,
    pub connections: Vec<Connection>,
}

/// Result of a shortest-path query. Empty `node_ids` means unreachable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkPath {
    pub node_ids: Vec<String>,
    pub coordinates: Vec<Coordinate>,
    /// Risk of each traversed edge, one per hop
    pub edge_risks: Vec<RiskLevel>,
    /// Sum of risk-weighted edge costs
    pub total_cost_km: f64,
    /// Sum of raw edge distances
    pub total_distance_km: f64,
}

impl NetworkPath {
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// True when every traversed edge is `Safe`.
    pub fn is_hazard_free(&self) -> bool {
        self.edge_risks.iter().all(|r| *r == RiskLevel::Safe)
    }
}

/// Heap entry ordered by cost, then node index for deterministic ties.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    cost: f64,
    node: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Graph of named locations.
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
}

impl RoadNetwork {
    /// Connect each location to its `neighbor_count` nearest others.
    ///
    /// Edge risk comes from the first non-degenerate zone (input order) whose
    /// polygon contains the edge midpoint. Repeated names keep the first entry.
    pub fn build<I, S>(locations: I, zones: &[FloodZone], neighbor_count: usize) -> Self
    where
        I: IntoIterator<Item = (S, Coordinate)>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut points: Vec<(String, Coordinate)> = Vec::new();
        for (name, coordinates) in locations {
            let name = name.into();
            if !seen.insert(name.clone()) {
                debug!("[RoadNetwork] Skipping duplicate location {}", name);
                continue;
            }
            points.push((name, coordinates));
        }

        let nodes: Vec<GraphNode> = points
            .iter()
            .enumerate()
            .map(|(i, (id, coordinates))| {
                let mut others: Vec<(usize, f64)> = points
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(j, (_, other))| (j, haversine_distance(coordinates, other) / 1000.0))
                    .collect();
                others.sort_by(|a, b| a.1.total_cmp(&b.1));

                let connections = others
                    .into_iter()
                    .take(neighbor_count)
                    .map(|(j, distance_km)| {
                        let target = &points[j];
                        Connection {
                            node_id: target.0.clone(),
                            distance_km,
                            risk: edge_risk(coordinates, &target.1, zones),
                        }
                    })
                    .collect();

                GraphNode {
                    id: id.clone(),
                    coordinates: *coordinates,
                    connections,
                }
            })
            .collect();

        let network = Self::from_nodes(nodes);
        info!(
            "[RoadNetwork] Built {} nodes, {} edges",
            network.len(),
            network.edge_count()
        );
        network
    }

    /// Wrap a hand-built graph. Connections to unknown ids are ignored during
    /// search; repeated ids keep the first node.
    pub fn from_nodes(nodes: Vec<GraphNode>) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id.clone()).or_insert(i);
        }
        Self { nodes, index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.connections.len()).sum()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Dijkstra from `from` to `to`.
    ///
    /// Unknown ids fail with `LocationNotFound`. An unreachable destination
    /// yields an empty path; `from == to` yields a single-node path.
    pub fn shortest_path(&self, from: &str, to: &str, avoid_hazards: bool) -> Result<NetworkPath> {
        let source = self.index.get(from).copied().ok_or_location_not_found(from)?;
        let target = self.index.get(to).copied().ok_or_location_not_found(to)?;

        if source == target {
            return Ok(NetworkPath {
                node_ids: vec![self.nodes[source].id.clone()],
                coordinates: vec![self.nodes[source].coordinates],
                ..NetworkPath::default()
            });
        }

        let n = self.nodes.len();
        let mut dist = vec![f64::INFINITY; n];
        // prev[v] = (predecessor, raw distance km, risk) of the edge that reached v
        let mut prev: Vec<Option<(usize, f64, RiskLevel)>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        heap.push(Reverse(QueueEntry {
            cost: 0.0,
            node: source,
        }));

        while let Some(Reverse(QueueEntry { cost, node })) = heap.pop() {
            if node == target {
                return Ok(self.reconstruct(&prev, source, target, cost));
            }
            // Stale entry
            if cost > dist[node] {
                continue;
            }

            for connection in &self.nodes[node].connections {
                let Some(&neighbor) = self.index.get(&connection.node_id) else {
                    continue;
                };
                let Some(multiplier) = connection.risk.cost_multiplier(avoid_hazards) else {
                    continue;
                };

                let next = cost + connection.distance_km * multiplier;
                if next < dist[neighbor] {
                    dist[neighbor] = next;
                    prev[neighbor] = Some((node, connection.distance_km, connection.risk));
                    heap.push(Reverse(QueueEntry {
                        cost: next,
                        node: neighbor,
                    }));
                }
            }
        }

        debug!("[RoadNetwork] No path from {} to {}", from, to);
        Ok(NetworkPath::default())
    }

    fn reconstruct(
        &self,
        prev: &[Option<(usize, f64, RiskLevel)>],
        source: usize,
        target: usize,
        total_cost_km: f64,
    ) -> NetworkPath {
        let mut order = vec![target];
        let mut risks = Vec::new();
        let mut total_distance_km = 0.0;
        let mut current = target;

        while current != source {
            let Some((previous, distance_km, risk)) = prev[current] else {
                break;
            };
            total_distance_km += distance_km;
            risks.push(risk);
            order.push(previous);
            current = previous;
        }
        order.reverse();
        risks.reverse();

        NetworkPath {
            node_ids: order.iter().map(|&i| self.nodes[i].id.clone()).collect(),
            coordinates: order.iter().map(|&i| self.nodes[i].coordinates).collect(),
            edge_risks: risks,
            total_cost_km,
            total_distance_km,
        }
    }
}

fn edge_risk(a: &Coordinate, b: &Coordinate, zones: &[FloodZone]) -> RiskLevel {
    let midpoint = a.midpoint(b);
    zones
        .iter()
        .filter(|z| !z.is_degenerate())
        .find(|z| point_in_polygon(&midpoint, &z.boundary))
        .map_or(RiskLevel::Safe, |z| RiskLevel::from(z.severity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouteError;

    fn edge(to: &str, distance_km: f64, risk: RiskLevel) -> Connection {
        Connection {
            node_id: to.to_string(),
            distance_km,
            risk,
        }
    }

    fn node(id: &str, lng: f64, connections: Vec<Connection>) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            coordinates: Coordinate::new(13.0, lng),
            connections,
        }
    }

    /// A -1- B -1- C -1- D with a 3 km shortcut A -> C
    fn diamond(shortcut_risk: RiskLevel, chain_risk: RiskLevel) -> RoadNetwork {
        RoadNetwork::from_nodes(vec![
            node(
                "A",
                80.0,
                vec![edge("B", 1.0, chain_risk), edge("C", 3.0, shortcut_risk)],
            ),
            node("B", 80.01, vec![edge("C", 1.0, chain_risk)]),
            node("C", 80.02, vec![edge("D", 1.0, RiskLevel::Safe)]),
            node("D", 80.03, vec![]),
        ])
    }

    #[test]
    fn test_shortest_path_uniform_safe() {
        let network = diamond(RiskLevel::Safe, RiskLevel::Safe);
        let path = network.shortest_path("A", "D", true).unwrap();

        assert_eq!(path.node_ids, vec!["A", "B", "C", "D"]);
        assert!((path.total_cost_km - 3.0).abs() < 1e-12);
        assert!((path.total_distance_km - 3.0).abs() < 1e-12);
        assert_eq!(path.coordinates.len(), 4);
        assert_eq!(path.edge_risks.len(), 3);
        assert!(path.is_hazard_free());
    }

    #[test]
    fn test_risk_multipliers() {
        // Chain edges cost 2 each when avoiding: 4 + 1 > 3 + 1
        let network = diamond(RiskLevel::Safe, RiskLevel::Medium);
        let avoiding = network.shortest_path("A", "D", true).unwrap();
        assert_eq!(avoiding.node_ids, vec!["A", "C", "D"]);
        assert!((avoiding.total_cost_km - 4.0).abs() < 1e-12);

        let ignoring = network.shortest_path("A", "D", false).unwrap();
        assert_eq!(ignoring.node_ids, vec!["A", "B", "C", "D"]);
        assert!((ignoring.total_cost_km - 3.0).abs() < 1e-12);
        assert!(!ignoring.is_hazard_free());

        // Low risk: 1.5 + 1.5 = 3.0 ties with the shortcut; both cost 4 total
        let network = diamond(RiskLevel::Safe, RiskLevel::Low);
        let path = network.shortest_path("A", "D", true).unwrap();
        assert!((path.total_cost_km - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_high_risk_edge_is_impassable() {
        let network = RoadNetwork::from_nodes(vec![
            node("A", 80.0, vec![edge("B", 5.0, RiskLevel::High)]),
            node("B", 80.05, vec![]),
        ]);

        let path = network.shortest_path("A", "B", true).unwrap();
        assert!(path.is_empty());
        assert!(path.coordinates.is_empty());

        let path = network.shortest_path("A", "B", false).unwrap();
        assert_eq!(path.node_ids, vec!["A", "B"]);
        assert!((path.total_cost_km - 5.0).abs() < 1e-12);
        assert_eq!(path.edge_risks, vec![RiskLevel::High]);
    }

    #[test]
    fn test_same_node_and_unknown_ids() {
        let network = diamond(RiskLevel::Safe, RiskLevel::Safe);

        let path = network.shortest_path("B", "B", true).unwrap();
        assert_eq!(path.node_ids, vec!["B"]);
        assert_eq!(path.total_cost_km, 0.0);

        match network.shortest_path("A", "Atlantis", true) {
            Err(RouteError::LocationNotFound { query }) => assert_eq!(query, "Atlantis"),
            other => panic!("expected LocationNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_edges_are_directed() {
        let network = diamond(RiskLevel::Safe, RiskLevel::Safe);
        let path = network.shortest_path("D", "A", false).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_build_nearest_neighbours() {
        let locations = vec![
            ("West", Coordinate::new(13.0, 80.0)),
            ("Middle", Coordinate::new(13.0, 80.1)),
            ("East", Coordinate::new(13.0, 80.2)),
            ("Far", Coordinate::new(13.0, 81.0)),
            ("West", Coordinate::new(0.0, 0.0)),
        ];
        let network = RoadNetwork::build(locations, &[], 2);

        assert_eq!(network.len(), 4);
        assert_eq!(network.edge_count(), 8);
        let west = network.node("West").unwrap();
        assert_eq!(west.coordinates, Coordinate::new(13.0, 80.0));
        let targets: Vec<&str> = west.connections.iter().map(|c| c.node_id.as_str()).collect();
        assert_eq!(targets, vec!["Middle", "East"]);
        assert!(west.connections[0].distance_km > 10.0 && west.connections[0].distance_km < 11.5);
    }

    #[test]
    fn test_build_assigns_zone_risk() {
        let locations = vec![
            ("A", Coordinate::new(13.0, 80.0)),
            ("B", Coordinate::new(13.0, 80.1)),
        ];
        // Covers the A-B midpoint (13.0, 80.05)
        let zone = FloodZone::new(
            "river",
            Severity::Critical,
            vec![
                Coordinate::new(12.99, 80.04),
                Coordinate::new(12.99, 80.06),
                Coordinate::new(13.01, 80.06),
                Coordinate::new(13.01, 80.04),
            ],
        );
        let advisory = FloodZone::new("wide", Severity::Low, zone.boundary.clone());

        let network = RoadNetwork::build(locations.clone(), &[zone.clone(), advisory.clone()], 1);
        assert_eq!(network.node("A").unwrap().connections[0].risk, RiskLevel::High);
        assert!(network.shortest_path("A", "B", true).unwrap().is_empty());

        // First matching zone wins
        let network = RoadNetwork::build(locations, &[advisory, zone], 1);
        assert_eq!(network.node("B").unwrap().connections[0].risk, RiskLevel::Low);
    }

    #[test]
    fn test_severity_to_risk() {
        assert_eq!(RiskLevel::from(Severity::Critical), RiskLevel::High);
        assert_eq!(RiskLevel::from(Severity::High), RiskLevel::High);
        assert_eq!(RiskLevel::from(Severity::Medium), RiskLevel::Medium);
        assert_eq!(RiskLevel::from(Severity::Low), RiskLevel::Low);
        assert_eq!(RiskLevel::from(Severity::Safe), RiskLevel::Safe);
        assert_eq!(RiskLevel::High.cost_multiplier(false), Some(1.0));
        assert_eq!(RiskLevel::High.cost_multiplier(true), None);
    }
}
