//! Topology builders and the graph algorithms analyzers run over them.
//!
//! The builders turn flat triples into network-level structures:
//! - [`NetworkAdjacency`]: undirected network graph induced by routers, with
//!   the routers responsible for each directed edge
//! - [`Membership`]: device/router/BBMD placement on networks and subnets
//! - [`RoutingGraph`]: router and connectivity maps restricted to typed networks
//!
//! Algorithms take `BTreeMap<String, BTreeSet<String>>` adjacency maps. The
//! traversal-based ones run on a petgraph [`UnGraphMap`] view built in key
//! order, so results are reproducible.

use crate::error::Result;
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};
use petgraph::graphmap::UnGraphMap;
use petgraph::visit::{Bfs, DfsEvent, depth_first_search};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub type Adjacency = BTreeMap<String, BTreeSet<String>>;

/// Key under which the routers of a directed network edge are recorded.
pub fn edge_key(from: &str, to: &str) -> String {
    format!("{from}→{to}")
}

fn link(adjacency: &mut Adjacency, a: &str, b: &str) {
    adjacency
        .entry(a.to_owned())
        .or_default()
        .insert(b.to_owned());
    adjacency
        .entry(b.to_owned())
        .or_default()
        .insert(a.to_owned());
}

/// Network graph induced by every `Router`'s `device-on-network` x `serves-network` pairs.
#[derive(Debug, Clone, Default)]
pub struct NetworkAdjacency {
    adjacency: Adjacency,
    declared: BTreeSet<(String, String)>,
    edge_routers: BTreeMap<String, Vec<String>>,
}

impl NetworkAdjacency {
    pub fn from_routers(graph: &BacnetGraph<'_>) -> Result<Self> {
        let mut topology = Self::default();
        for router in graph.instances_of(class::ROUTER)? {
            let on = graph.objects(&router, prop::DEVICE_ON_NETWORK)?;
            let served = graph.objects(&router, prop::SERVES_NETWORK)?;
            for source in &on {
                for target in served.iter().filter(|t| *t != source) {
                    topology.add_route(&router, source, target);
                }
            }
        }
        Ok(topology)
    }

    /// Records that `router` sits on `from` and routes to `to`.
    pub fn add_route(&mut self, router: &str, from: &str, to: &str) {
        link(&mut self.adjacency, from, to);
        self.declared.insert((from.to_owned(), to.to_owned()));
        for key in [edge_key(from, to), edge_key(to, from)] {
            let routers = self.edge_routers.entry(key).or_default();
            if !routers.iter().any(|r| r == router) {
                routers.push(router.to_owned());
            }
        }
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    pub fn network_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn networks(&self) -> impl Iterator<Item = &String> {
        self.adjacency.keys()
    }

    /// True when some router on `from` declares it serves `to`.
    pub fn is_declared(&self, from: &str, to: &str) -> bool {
        self.declared.contains(&(from.to_owned(), to.to_owned()))
    }

    pub fn routers_between(&self, from: &str, to: &str) -> &[String] {
        self.edge_routers
            .get(&edge_key(from, to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Placement of entities on networks and subnets.
#[derive(Debug, Clone, Default)]
pub struct Membership {
    pub subnet_networks: BTreeMap<String, BTreeSet<String>>,
    pub entity_networks: BTreeMap<String, BTreeSet<String>>,
    pub entity_subnets: BTreeMap<String, BTreeSet<String>>,
}

impl Membership {
    pub fn build(graph: &BacnetGraph<'_>) -> Result<Self> {
        let mut membership = Self::default();
        for (subnet, network) in graph.pairs(prop::SUBNET_OF_NETWORK)? {
            membership
                .subnet_networks
                .entry(subnet)
                .or_default()
                .insert(network);
        }
        for (entity, network) in graph.pairs(prop::DEVICE_ON_NETWORK)? {
            membership
                .entity_networks
                .entry(entity)
                .or_default()
                .insert(network);
        }
        for (entity, subnet) in graph.pairs(prop::DEVICE_ON_SUBNET)? {
            membership
                .entity_subnets
                .entry(entity)
                .or_default()
                .insert(subnet);
        }
        Ok(membership)
    }

    /// Networks an entity belongs to directly or through one of its subnets.
    pub fn networks_of(&self, entity: &str) -> BTreeSet<String> {
        let mut networks = self
            .entity_networks
            .get(entity)
            .cloned()
            .unwrap_or_default();
        for subnet in self.entity_subnets.get(entity).into_iter().flatten() {
            networks.extend(self.subnet_networks.get(subnet).into_iter().flatten().cloned());
        }
        networks
    }

    /// Network -> entities placed on it directly or through a subnet.
    pub fn network_members(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let entities = self
            .entity_networks
            .keys()
            .chain(self.entity_subnets.keys())
            .collect::<BTreeSet<_>>();
        for entity in entities {
            for network in self.networks_of(entity) {
                members.entry(network).or_default().insert(entity.clone());
            }
        }
        members
    }
}

/// Router maps and network connectivity restricted to typed networks and routers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingGraph {
    /// Router -> networks it sits on.
    pub router_networks: BTreeMap<String, BTreeSet<String>>,
    /// Router -> networks it routes to.
    pub router_serves: BTreeMap<String, BTreeSet<String>>,
    /// Network -> routers sitting on it.
    pub network_routers: BTreeMap<String, BTreeSet<String>>,
    pub connections: Adjacency,
    pub all_networks: BTreeSet<String>,
}

impl RoutingGraph {
    pub fn build(graph: &BacnetGraph<'_>) -> Result<Self> {
        let all_networks: BTreeSet<String> =
            graph.instances_of(class::NETWORK)?.into_iter().collect();
        let mut routing = Self {
            all_networks,
            ..Self::default()
        };

        for router in graph.instances_of(class::ROUTER)? {
            for network in graph.objects(&router, prop::DEVICE_ON_NETWORK)? {
                if routing.all_networks.contains(&network) {
                    routing
                        .network_routers
                        .entry(network.clone())
                        .or_default()
                        .insert(router.clone());
                    routing
                        .router_networks
                        .entry(router.clone())
                        .or_default()
                        .insert(network);
                }
            }
            for network in graph.objects(&router, prop::SERVES_NETWORK)? {
                if routing.all_networks.contains(&network) {
                    routing
                        .router_serves
                        .entry(router.clone())
                        .or_default()
                        .insert(network);
                }
            }
        }

        for (router, on_networks) in &routing.router_networks {
            let Some(served) = routing.router_serves.get(router) else {
                continue;
            };
            for on in on_networks {
                for target in served.iter().filter(|t| *t != on) {
                    link(&mut routing.connections, on, target);
                }
            }
        }
        Ok(routing)
    }

    /// Routers sitting on `from` that route to `to`.
    pub fn routers_between(&self, from: &str, to: &str) -> BTreeSet<String> {
        self.router_networks
            .iter()
            .filter(|(router, on)| {
                on.contains(from)
                    && self
                        .router_serves
                        .get(*router)
                        .is_some_and(|served| served.contains(to))
            })
            .map(|(router, _)| router.clone())
            .collect()
    }

    pub fn neighbors(&self, network: &str) -> impl Iterator<Item = &String> {
        self.connections.get(network).into_iter().flatten()
    }
}

/// Undirected petgraph view over `adjacency`, plus any extra `nodes` it lacks.
///
/// Edges are added in key order, so for a symmetric adjacency every node's
/// neighbor list comes out sorted and traversals stay reproducible.
fn undirected_view<'a>(
    nodes: impl IntoIterator<Item = &'a str>,
    adjacency: &'a Adjacency,
) -> UnGraphMap<&'a str, ()> {
    let mut graph = UnGraphMap::new();
    for node in nodes {
        graph.add_node(node);
    }
    for (node, neighbors) in adjacency {
        graph.add_node(node.as_str());
        for next in neighbors {
            graph.add_edge(node.as_str(), next.as_str(), ());
        }
    }
    graph
}

/// Connected components by breadth-first traversal, starting from `nodes` in order.
pub fn connected_components(nodes: &BTreeSet<String>, adjacency: &Adjacency) -> Vec<BTreeSet<String>> {
    let graph = undirected_view(nodes.iter().map(String::as_str), adjacency);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut components = Vec::new();
    for start in nodes {
        if seen.contains(start.as_str()) {
            continue;
        }
        let mut component = BTreeSet::new();
        let mut bfs = Bfs::new(&graph, start.as_str());
        while let Some(node) = bfs.next(&graph) {
            seen.insert(node);
            component.insert(node.to_owned());
        }
        components.push(component);
    }
    components
}

/// Rotates a cycle so it starts at its lexicographically smallest member.
pub fn rotate_to_smallest(cycle: &[String]) -> Vec<String> {
    let Some(min_index) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    cycle[min_index..]
        .iter()
        .chain(&cycle[..min_index])
        .cloned()
        .collect()
}

struct Frame<'a> {
    node: &'a str,
    neighbors: Vec<&'a str>,
    next: usize,
}

impl<'a> Frame<'a> {
    fn new(node: &'a str, adjacency: &'a Adjacency) -> Self {
        Self {
            node,
            neighbors: adjacency
                .get(node)
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect(),
            next: 0,
        }
    }
}

/// First simple cycle through `start` of at least three nodes, searching at most
/// `max_depth` edges away from `start`.
fn first_cycle_from(start: &str, adjacency: &Adjacency, max_depth: usize) -> Option<Vec<String>> {
    let mut path: Vec<&str> = vec![start];
    let mut on_path: HashSet<&str> = HashSet::from([start]);
    let mut stack = vec![Frame::new(start, adjacency)];

    while let Some(frame) = stack.last_mut() {
        let Some(&neighbor) = frame.neighbors.get(frame.next) else {
            on_path.remove(frame.node);
            path.pop();
            stack.pop();
            continue;
        };
        frame.next += 1;

        if neighbor == start && path.len() >= 3 {
            return Some(path.iter().map(|n| (*n).to_owned()).collect());
        }
        if on_path.contains(neighbor) || path.len() > max_depth {
            continue;
        }
        path.push(neighbor);
        on_path.insert(neighbor);
        stack.push(Frame::new(neighbor, adjacency));
    }
    None
}

/// Distinct cycles of three or more networks, one search per unvisited start.
///
/// Each cycle is rotated to start at its smallest member; cycles over the same
/// node set are reported once.
pub fn bounded_cycles(adjacency: &Adjacency, max_depth: usize) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut covered: HashSet<String> = HashSet::new();

    for start in adjacency.keys() {
        if covered.contains(start) {
            continue;
        }
        if let Some(cycle) = first_cycle_from(start, adjacency, max_depth) {
            let normalized = rotate_to_smallest(&cycle);
            let members: BTreeSet<&String> = normalized.iter().collect();
            let known = cycles
                .iter()
                .any(|existing| existing.iter().collect::<BTreeSet<_>>() == members);
            if !known {
                covered.extend(normalized.iter().cloned());
                cycles.push(normalized);
            }
        }
        covered.insert(start.clone());
    }
    cycles
}

/// Cycles closed by DFS back edges, as closed paths (`[a, b, c, a]`).
///
/// The edge back to a node's own DFS parent is not a cycle.
pub fn back_edge_cycles(nodes: &BTreeSet<String>, adjacency: &Adjacency) -> Vec<Vec<String>> {
    let graph = undirected_view(nodes.iter().map(String::as_str), adjacency);
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();
    let mut cycles = Vec::new();

    depth_first_search(&graph, nodes.iter().map(String::as_str), |event| match event {
        DfsEvent::Discover(node, _) => path.push(node),
        DfsEvent::TreeEdge(from, to) => {
            parent.insert(to, from);
        }
        DfsEvent::BackEdge(from, to) if parent.get(from) != Some(&to) => {
            if let Some(start) = path.iter().position(|n| *n == to) {
                let mut cycle: Vec<String> = path[start..].iter().map(|n| (*n).to_owned()).collect();
                cycle.push(to.to_owned());
                cycles.push(cycle);
            }
        }
        DfsEvent::Finish(_, _) => {
            path.pop();
        }
        _ => {}
    });
    cycles
}

/// Rotates a closed path (`[b, c, a, b]`) to start and end at its smallest member.
pub fn normalize_closed_path(closed: &[String]) -> Vec<String> {
    let Some((_, open)) = closed.split_last() else {
        return Vec::new();
    };
    let mut normalized = rotate_to_smallest(open);
    if let Some(first) = normalized.first().cloned() {
        normalized.push(first);
    }
    normalized
}

/// Shortest paths (by hop count) from `source` to every reachable node.
///
/// Ties go to the parent dequeued first, i.e. the smallest name on each level.
pub fn shortest_paths(source: &str, adjacency: &Adjacency) -> BTreeMap<String, Vec<String>> {
    let graph = undirected_view([source], adjacency);
    let mut paths: BTreeMap<String, Vec<String>> = BTreeMap::new();
    paths.insert(source.to_owned(), vec![source.to_owned()]);
    let mut bfs = Bfs::new(&graph, source);
    while let Some(current) = bfs.next(&graph) {
        let Some(current_path) = paths.get(current).cloned() else {
            continue;
        };
        for next in graph.neighbors(current) {
            if paths.contains_key(next) {
                continue;
            }
            let mut path = current_path.clone();
            path.push(next.to_owned());
            paths.insert(next.to_owned(), path);
        }
    }
    paths
}

/// Cut vertices of the undirected graph (Tarjan low-link over DFS events).
pub fn articulation_points(nodes: &BTreeSet<String>, adjacency: &Adjacency) -> BTreeSet<String> {
    let graph = undirected_view(nodes.iter().map(String::as_str), adjacency);
    let mut disc: HashMap<&str, usize> = HashMap::new();
    let mut low: HashMap<&str, usize> = HashMap::new();
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut root_children: HashMap<&str, usize> = HashMap::new();
    let mut points = BTreeSet::new();

    depth_first_search(&graph, nodes.iter().map(String::as_str), |event| match event {
        DfsEvent::Discover(node, _) => {
            let time = disc.len();
            disc.insert(node, time);
            low.insert(node, time);
        }
        DfsEvent::TreeEdge(from, to) => {
            if !parent.contains_key(from) {
                *root_children.entry(from).or_default() += 1;
            }
            parent.insert(to, from);
        }
        DfsEvent::BackEdge(from, to) if parent.get(from) != Some(&to) => {
            let reached = disc.get(to).copied().unwrap_or(usize::MAX);
            if let Some(current) = low.get_mut(from) {
                *current = (*current).min(reached);
            }
        }
        DfsEvent::Finish(node, _) => {
            let Some(&up) = parent.get(node) else {
                return;
            };
            let child_low = low.get(node).copied().unwrap_or(usize::MAX);
            if let Some(current) = low.get_mut(up) {
                *current = (*current).min(child_low);
            }
            let up_disc = disc.get(up).copied().unwrap_or(0);
            if parent.contains_key(up) && child_low >= up_disc {
                points.insert(up.to_owned());
            }
        }
        _ => {}
    });

    points.extend(
        root_children
            .into_iter()
            .filter(|(_, children)| *children > 1)
            .map(|(root, _)| root.to_owned()),
    );
    points
}
