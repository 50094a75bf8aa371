//! Immutable graph definition: named nodes, static and conditional edges,
//! validated at construction time.

use crate::error::EngineError;
use std::collections::{HashMap, HashSet, VecDeque};
use tandem_contract::Message;

/// Virtual entry point. Not a node; only an edge source.
pub const START: &str = "__start__";
/// Virtual terminal. Not a node; only an edge target.
pub const END: &str = "__end__";

/// The reasoning node of the standard graph.
pub const AGENT_NODE: &str = "agent";
/// The tool-execution node of the standard graph.
pub const TOOLS_NODE: &str = "tools";

/// What a node does when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// One chat call against the model, possibly streaming.
    Reasoning,
    /// Concurrent execution of the last assistant message's tool calls.
    ToolExecution,
}

/// Routing decision after a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Continue with the named node.
    Node(&'static str),
    /// Terminate the run. This is success, not an error.
    End,
}

/// A pure routing function over the message sequence.
pub type RouterFn = fn(&[Message]) -> Next;

/// Outgoing edge of a node.
#[derive(Debug, Clone)]
pub enum Edge {
    /// Fixed successor (`END` allowed).
    To(&'static str),
    /// Conditional successor chosen by a router among declared candidates
    /// (`END` allowed as a candidate).
    Conditional {
        router: RouterFn,
        candidates: &'static [&'static str],
    },
}

/// An explicit, immutable graph: node kinds plus one outgoing edge per node.
#[derive(Debug, Clone)]
pub struct GraphDefinition {
    nodes: HashMap<&'static str, NodeKind>,
    edges: HashMap<&'static str, Edge>,
}

impl GraphDefinition {
    /// Start building a graph.
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// The standard reason/act graph:
    /// `START -> agent`, `agent -> route -> {tools, END}`, `tools -> agent`.
    pub fn react() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(AGENT_NODE, NodeKind::Reasoning);
        nodes.insert(TOOLS_NODE, NodeKind::ToolExecution);

        let mut edges = HashMap::new();
        edges.insert(START, Edge::To(AGENT_NODE));
        edges.insert(
            AGENT_NODE,
            Edge::Conditional {
                router: crate::route::route,
                candidates: &[TOOLS_NODE, END],
            },
        );
        edges.insert(TOOLS_NODE, Edge::To(AGENT_NODE));

        Self { nodes, edges }
    }

    /// The node the run starts at.
    pub fn start_node(&self) -> Result<&'static str, EngineError> {
        match self.edges.get(START) {
            Some(Edge::To(target)) => Ok(target),
            Some(Edge::Conditional { .. }) => Err(EngineError::InvalidGraph(
                "start edge must be a fixed edge".to_string(),
            )),
            None => Err(EngineError::InvalidGraph("missing start edge".to_string())),
        }
    }

    /// Kind of a named node.
    pub fn node_kind(&self, name: &str) -> Result<NodeKind, EngineError> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::Internal(format!("node '{name}' not in graph")))
    }

    /// Resolve the successor of `node` given the current message sequence.
    pub fn next(&self, node: &str, messages: &[Message]) -> Result<Next, EngineError> {
        match self.edges.get(node) {
            Some(Edge::To(target)) if *target == END => Ok(Next::End),
            Some(Edge::To(target)) => Ok(Next::Node(target)),
            Some(Edge::Conditional { router, .. }) => Ok(router(messages)),
            None => Err(EngineError::Internal(format!(
                "node '{node}' has no outgoing edge"
            ))),
        }
    }
}

/// Builder validating the definition before it can be executed.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: HashMap<&'static str, NodeKind>,
    edges: HashMap<&'static str, Edge>,
}

impl GraphBuilder {
    /// Add a named node.
    #[must_use]
    pub fn node(mut self, name: &'static str, kind: NodeKind) -> Self {
        self.nodes.insert(name, kind);
        self
    }

    /// Add a fixed edge (`START` allowed as source, `END` as target).
    #[must_use]
    pub fn edge(mut self, from: &'static str, to: &'static str) -> Self {
        self.edges.insert(from, Edge::To(to));
        self
    }

    /// Add a conditional edge choosing among `candidates` via `router`.
    #[must_use]
    pub fn conditional(
        mut self,
        from: &'static str,
        router: RouterFn,
        candidates: &'static [&'static str],
    ) -> Self {
        self.edges.insert(from, Edge::Conditional { router, candidates });
        self
    }

    /// Validate and build.
    ///
    /// Checks that the start edge exists, that every referenced name is a
    /// known node (or `END`), that every node has an outgoing edge, and that
    /// `END` is reachable from `START`.
    pub fn build(self) -> Result<GraphDefinition, EngineError> {
        let Self { nodes, edges } = self;

        let known = |name: &str| name == END || nodes.contains_key(name);

        if !edges.contains_key(START) {
            return Err(EngineError::InvalidGraph("missing start edge".to_string()));
        }
        for (from, edge) in &edges {
            if *from != START && !nodes.contains_key(from) {
                return Err(EngineError::InvalidGraph(format!(
                    "edge source '{from}' is not a node"
                )));
            }
            match edge {
                Edge::To(to) if !known(to) => {
                    return Err(EngineError::InvalidGraph(format!(
                        "edge target '{to}' is not a node"
                    )));
                }
                Edge::Conditional { candidates, .. } => {
                    for candidate in *candidates {
                        if !known(candidate) {
                            return Err(EngineError::InvalidGraph(format!(
                                "router candidate '{candidate}' is not a node"
                            )));
                        }
                    }
                }
                Edge::To(_) => {}
            }
        }
        for node in nodes.keys() {
            if !edges.contains_key(node) {
                return Err(EngineError::InvalidGraph(format!(
                    "node '{node}' has no outgoing edge"
                )));
            }
        }

        // END must be reachable from START through some edge path.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([START]);
        let mut reachable_end = false;
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            let targets: Vec<&'static str> = match edges.get(name) {
                Some(Edge::To(to)) => vec![*to],
                Some(Edge::Conditional { candidates, .. }) => candidates.to_vec(),
                None => continue,
            };
            for target in targets {
                if target == END {
                    reachable_end = true;
                } else {
                    queue.push_back(target);
                }
            }
        }
        if !reachable_end {
            return Err(EngineError::InvalidGraph(
                "terminal is not reachable from start".to_string(),
            ));
        }

        Ok(GraphDefinition { nodes, edges })
    }
}
