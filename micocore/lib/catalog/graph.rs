use std::collections::{HashMap, HashSet, VecDeque};

use semver::VersionReq;

use crate::{
    models::{parse_version, Identity, MicoService, MicoServiceDependency},
    MicoError, MicoResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Index of a node slot in a [`ServiceGraph`].
pub(crate) type NodeId = usize;

/// A directed dependency edge between two node slots.
#[derive(Debug, Clone)]
pub(crate) struct DependencyEdge {
    source: NodeId,
    target: NodeId,
    version_range: Option<VersionReq>,
}

/// An arena of service nodes plus an edge list.
///
/// Nodes live in slots addressed by [`NodeId`]; a removed node leaves an empty slot so the ids of
/// the remaining nodes stay valid. Edges are kept in insertion order and are the only record of
/// a dependency: dependers are found by scanning the edges, never through back-pointers.
///
/// Stored nodes never carry a `dependencies` list. It is materialized from the edges when a node
/// is read.
#[derive(Debug, Default)]
pub struct ServiceGraph {
    nodes: Vec<Option<MicoService>>,
    index: HashMap<Identity, NodeId>,
    edges: Vec<DependencyEdge>,
    next_surrogate_id: u64,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServiceGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored services.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no service is stored.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether a service with the identity is stored.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.index.contains_key(identity)
    }

    /// Stores a new service, assigning it a surrogate id. Any `dependencies` on the payload are
    /// dropped; edges are added separately.
    pub fn insert(&mut self, mut service: MicoService) -> MicoResult<MicoService> {
        let identity = service.identity();
        if self.index.contains_key(&identity) {
            return Err(MicoError::ServiceAlreadyExists(identity));
        }

        self.next_surrogate_id += 1;
        service.id = Some(self.next_surrogate_id);
        service.dependencies.clear();

        let node = self.nodes.len();
        self.nodes.push(Some(service.clone()));
        self.index.insert(identity, node);

        Ok(service)
    }

    /// Returns the service with its dependencies materialized.
    pub fn get(&self, identity: &Identity) -> Option<MicoService> {
        self.index
            .get(identity)
            .and_then(|&node| self.materialize(node))
    }

    /// Returns the stored node for in-place attribute changes.
    pub(crate) fn get_mut(&mut self, identity: &Identity) -> Option<&mut MicoService> {
        let node = *self.index.get(identity)?;
        self.nodes.get_mut(node).and_then(Option::as_mut)
    }

    /// Returns every service sharing the short name, in storage order.
    pub fn versions(&self, short_name: &str) -> Vec<MicoService> {
        self.live_nodes()
            .filter(|(_, s)| s.short_name == short_name)
            .filter_map(|(node, _)| self.materialize(node))
            .collect()
    }

    /// Returns every stored service, in storage order.
    pub fn all(&self) -> Vec<MicoService> {
        self.live_nodes()
            .filter_map(|(node, _)| self.materialize(node))
            .collect()
    }

    /// Removes a service together with every edge touching it.
    pub fn remove(&mut self, identity: &Identity) -> Option<MicoService> {
        let node = self.index.remove(identity)?;
        self.edges.retain(|e| e.source != node && e.target != node);
        self.nodes.get_mut(node).and_then(Option::take)
    }

    /// Whether an edge `source -> target` exists.
    pub fn has_edge(&self, source: &Identity, target: &Identity) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => self.outgoing(s).any(|e| e.target == t),
            _ => false,
        }
    }

    /// Appends the edge `source -> target`.
    ///
    /// Fails if either node is missing, if `source == target`, if the edge already exists or if
    /// the target's version does not satisfy `version_range`. Targets whose version is not semver
    /// are accepted without a range check.
    pub fn add_edge(
        &mut self,
        source: &Identity,
        target: &Identity,
        version_range: Option<VersionReq>,
    ) -> MicoResult<()> {
        let s = self.node_id(source)?;
        let t = self.node_id(target)?;

        if s == t {
            return Err(MicoError::SelfDependency(source.clone()));
        }

        if self.outgoing(s).any(|e| e.target == t) {
            return Err(MicoError::DependencyAlreadyExists {
                service: source.clone(),
                depended_service: target.clone(),
            });
        }

        if let Some(range) = &version_range {
            if let Some(version) = parse_version(target.get_version()) {
                if !range.matches(&version) {
                    return Err(MicoError::VersionConstraintUnsatisfied {
                        target: target.clone(),
                        range: range.to_string(),
                    });
                }
            }
        }

        self.edges.push(DependencyEdge {
            source: s,
            target: t,
            version_range,
        });

        Ok(())
    }

    /// Removes the edge `source -> target`. Returns whether an edge was removed.
    pub fn remove_edge(&mut self, source: &Identity, target: &Identity) -> bool {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };

        let before = self.edges.len();
        self.edges.retain(|e| !(e.source == s && e.target == t));
        before != self.edges.len()
    }

    /// Identities of every service with an edge into `identity`, in edge order.
    pub fn dependers(&self, identity: &Identity) -> Vec<Identity> {
        let Some(&node) = self.index.get(identity) else {
            return Vec::new();
        };

        self.edges
            .iter()
            .filter(|e| e.target == node)
            .filter_map(|e| self.identity_of(e.source))
            .collect()
    }

    /// Identities of every service `identity` has an edge into, in edge order.
    pub fn dependees(&self, identity: &Identity) -> Vec<Identity> {
        let Some(&node) = self.index.get(identity) else {
            return Vec::new();
        };

        self.outgoing(node)
            .filter_map(|e| self.identity_of(e.target))
            .collect()
    }

    /// Every service reachable from `identity` over one or more edges, breadth-first, each once.
    /// The start node itself is only included if it lies on a cycle.
    pub fn closure(&self, identity: &Identity) -> Vec<Identity> {
        let Some(&start) = self.index.get(identity) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        let mut reached = Vec::new();

        while let Some(node) = queue.pop_front() {
            for edge in self.outgoing(node) {
                if seen.insert(edge.target) {
                    reached.push(edge.target);
                    queue.push_back(edge.target);
                }
            }
        }

        reached
            .into_iter()
            .filter_map(|node| self.identity_of(node))
            .collect()
    }

    /// Returns one cycle, if the graph has any, as the identities along it starting from the
    /// node where it was detected.
    pub fn find_cycle(&self) -> Option<Vec<Identity>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];

        for (root, _) in self.live_nodes() {
            if marks[root] != Mark::Unvisited {
                continue;
            }

            // Iterative DFS: each frame is a node and the position of its next outgoing edge.
            let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
            marks[root] = Mark::OnStack;

            while let Some(frame) = stack.last_mut() {
                let (node, position) = *frame;
                frame.1 += 1;

                let Some(target) = self.outgoing(node).nth(position).map(|e| e.target) else {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                };

                match marks[target] {
                    Mark::Unvisited => {
                        marks[target] = Mark::OnStack;
                        stack.push((target, 0));
                    }
                    Mark::OnStack => {
                        let start = stack.iter().position(|&(n, _)| n == target).unwrap_or(0);
                        return Some(
                            stack[start..]
                                .iter()
                                .filter_map(|&(n, _)| self.identity_of(n))
                                .collect(),
                        );
                    }
                    Mark::Done => {}
                }
            }
        }

        None
    }

    fn node_id(&self, identity: &Identity) -> MicoResult<NodeId> {
        self.index
            .get(identity)
            .copied()
            .ok_or_else(|| MicoError::ServiceNotFound(identity.clone()))
    }

    fn identity_of(&self, node: NodeId) -> Option<Identity> {
        self.nodes
            .get(node)
            .and_then(Option::as_ref)
            .map(MicoService::identity)
    }

    fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &MicoService)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(node, slot)| slot.as_ref().map(|s| (node, s)))
    }

    fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(move |e| e.source == node)
    }

    fn materialize(&self, node: NodeId) -> Option<MicoService> {
        let mut service = self.nodes.get(node).and_then(Option::as_ref)?.clone();

        let identity = service.identity();
        service.dependencies = self
            .outgoing(node)
            .filter_map(|e| {
                self.identity_of(e.target).map(|target| MicoServiceDependency {
                    service: identity.clone(),
                    depended_service: target,
                    version_range: e.version_range.clone(),
                })
            })
            .collect();

        Some(service)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
