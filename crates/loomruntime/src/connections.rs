use loomcore::{Connection, EdgeDefinition, IssueKind, ValidationIssue};
use std::collections::{HashMap, HashSet};

/// Input side of a connection map entry: one upstream source, or an
/// ordered fan-in of several
#[derive(Debug, Clone, PartialEq)]
pub enum InputBinding {
    Single(Connection),
    FanIn(Vec<Connection>),
}

impl InputBinding {
    /// All connections in declaration order
    pub fn connections(&self) -> &[Connection] {
        match self {
            InputBinding::Single(conn) => std::slice::from_ref(conn),
            InputBinding::FanIn(conns) => conns,
        }
    }

    fn push(&mut self, conn: Connection) {
        match self {
            InputBinding::Single(first) => {
                *self = InputBinding::FanIn(vec![first.clone(), conn]);
            }
            InputBinding::FanIn(conns) => conns.push(conn),
        }
    }
}

/// Per-node view of a flow's wiring
#[derive(Debug, Clone, Default)]
pub struct ConnectionMap {
    inputs: HashMap<String, HashMap<String, InputBinding>>,
    outputs: HashMap<String, HashMap<String, Vec<Connection>>>,
}

impl ConnectionMap {
    pub fn inputs_for(&self, node_id: &str) -> Option<&HashMap<String, InputBinding>> {
        self.inputs.get(node_id)
    }

    pub fn outputs_for(&self, node_id: &str) -> Option<&HashMap<String, Vec<Connection>>> {
        self.outputs.get(node_id)
    }

    pub fn has_incoming(&self, node_id: &str) -> bool {
        self.inputs.get(node_id).is_some_and(|m| !m.is_empty())
    }

    pub fn has_outgoing(&self, node_id: &str) -> bool {
        self.outputs.get(node_id).is_some_and(|m| !m.is_empty())
    }

    fn add(&mut self, conn: Connection) {
        self.outputs
            .entry(conn.source_node_id.clone())
            .or_default()
            .entry(conn.source_handle.clone())
            .or_default()
            .push(conn.clone());

        let bindings = self.inputs.entry(conn.target_node_id.clone()).or_default();
        match bindings.get_mut(&conn.target_handle) {
            Some(binding) => binding.push(conn),
            None => {
                bindings.insert(conn.target_handle.clone(), InputBinding::Single(conn));
            }
        }
    }
}

/// Parses edge definitions into a per-node connection map, validates
/// endpoints, detects cycles, and identifies boundary nodes
///
/// Mapping is best-effort: an edge with a missing endpoint is recorded as
/// an issue and skipped, the remainder of the definition is still mapped.
pub struct ConnectionMapper {
    map: ConnectionMap,
    node_order: Vec<String>,
    issues: Vec<ValidationIssue>,
}

impl ConnectionMapper {
    /// Build the connection map for the given edges; `node_order` is the
    /// original input array order of the node definitions.
    pub fn build(edges: &[EdgeDefinition], node_order: Vec<String>) -> Self {
        let known: HashSet<&str> = node_order.iter().map(String::as_str).collect();
        let mut map = ConnectionMap::default();
        let mut issues = Vec::new();

        for edge in edges {
            let mut endpoints_ok = true;

            if !known.contains(edge.source.as_str()) {
                issues.push(ValidationIssue::for_node(
                    IssueKind::MissingSourceNode,
                    edge.source.clone(),
                    format!(
                        "edge {} -> {} references unknown source node '{}'",
                        edge.source, edge.target, edge.source
                    ),
                ));
                endpoints_ok = false;
            }

            if !known.contains(edge.target.as_str()) {
                issues.push(ValidationIssue::for_node(
                    IssueKind::MissingTargetNode,
                    edge.target.clone(),
                    format!(
                        "edge {} -> {} references unknown target node '{}'",
                        edge.source, edge.target, edge.target
                    ),
                ));
                endpoints_ok = false;
            }

            if endpoints_ok {
                map.add(Connection::from(edge));
            }
        }

        Self {
            map,
            node_order,
            issues,
        }
    }

    pub fn map(&self) -> &ConnectionMap {
        &self.map
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_map(self) -> ConnectionMap {
        self.map
    }

    /// DFS with a recursion stack, O(V+E)
    pub fn detect_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();

        for node_id in &self.node_order {
            if !visited.contains(node_id.as_str())
                && self.cycle_from(node_id, &mut visited, &mut stack)
            {
                return true;
            }
        }
        false
    }

    fn cycle_from<'a>(
        &'a self,
        node_id: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut HashSet<&'a str>,
    ) -> bool {
        visited.insert(node_id);
        stack.insert(node_id);

        if let Some(handles) = self.map.outputs_for(node_id) {
            for conns in handles.values() {
                for conn in conns {
                    let next = conn.target_node_id.as_str();
                    if stack.contains(next) {
                        return true;
                    }
                    if !visited.contains(next) && self.cycle_from(next, visited, stack) {
                        return true;
                    }
                }
            }
        }

        stack.remove(node_id);
        false
    }

    /// Nodes with no incoming edges, in original input order
    ///
    /// When every node has an incoming edge the first node of the original
    /// input array is the deterministic fallback.
    pub fn find_start_nodes(&self) -> Vec<String> {
        let starts: Vec<String> = self
            .node_order
            .iter()
            .filter(|id| !self.map.has_incoming(id))
            .cloned()
            .collect();

        if starts.is_empty() {
            if let Some(first) = self.node_order.first() {
                tracing::warn!(
                    node_id = %first,
                    "no clear start node; falling back to first node in input order"
                );
                return vec![first.clone()];
            }
        }
        starts
    }

    /// Nodes with no outgoing edges, in original input order
    ///
    /// When every node has an outgoing edge the last node of the original
    /// input array is the deterministic fallback.
    pub fn find_end_nodes(&self) -> Vec<String> {
        let ends: Vec<String> = self
            .node_order
            .iter()
            .filter(|id| !self.map.has_outgoing(id))
            .cloned()
            .collect();

        if ends.is_empty() {
            if let Some(last) = self.node_order.last() {
                tracing::warn!(
                    node_id = %last,
                    "no clear end node; falling back to last node in input order"
                );
                return vec![last.clone()];
            }
        }
        ends
    }

    /// Nodes with no connections at all; warnings, not errors
    pub fn orphaned_nodes(&self) -> Vec<String> {
        if self.node_order.len() < 2 {
            return Vec::new();
        }
        self.node_order
            .iter()
            .filter(|id| !self.map.has_incoming(id) && !self.map.has_outgoing(id))
            .cloned()
            .collect()
    }
}
