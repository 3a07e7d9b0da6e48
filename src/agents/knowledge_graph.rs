//! Knowledge-graph QA over a small directed graph of extracted triplets.

use tracing::{info, warn};

use crate::agents::{AgentContext, failure_message, require_input};
use crate::error::AppError;

pub const EXTRACT_TEMPLATE: &str = "kg_extract.txt";
pub const QUERY_TEMPLATE: &str = "kg_query.txt";

pub const NOT_FOUND_MESSAGE: &str = "No matching information found in the graph.";

pub const DEMO_TEXT: &str = "Steve Jobs founded Apple in 1976.";
pub const DEMO_QUESTION: &str = "Who founded Apple?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} --{}--> {}", self.subject, self.relation, self.object)
    }
}

/// Directed graph with at most one edge per (subject, object) pair.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    edges: Vec<Edge>,
}

impl KnowledgeGraph {
    /// Add or relabel the edge `subject -> object`.
    pub fn add_edge(&mut self, subject: &str, relation: &str, object: &str) {
        if let Some(e) = self.edges.iter_mut().find(|e| e.subject == subject && e.object == object) {
            e.relation = relation.to_string();
        } else {
            self.edges.push(Edge {
                subject: subject.to_string(),
                relation: relation.to_string(),
                object: object.to_string(),
            });
        }
    }

    /// Edges where `node` is either endpoint, in insertion order.
    pub fn edges_touching(&self, node: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.subject == node || e.object == node).collect()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        let mut nodes: Vec<&str> = self.edges.iter().flat_map(|e| [e.subject.as_str(), e.object.as_str()]).collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes.len()
    }
}

/// Parse one `subject, relation, object` line. Anything without exactly
/// three comma-separated parts is ignored.
pub fn parse_triplet(line: &str) -> Option<(String, String, String)> {
    let line = line.trim().trim_start_matches(['-', '*']).trim();
    let line = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')).unwrap_or(line);
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [s, r, o] if !s.is_empty() && !r.is_empty() && !o.is_empty() => {
            Some((s.to_string(), r.to_string(), o.to_string()))
        }
        _ => None,
    }
}

pub struct KnowledgeGraphAgent {
    ctx: AgentContext,
    graph: KnowledgeGraph,
}

impl KnowledgeGraphAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx, graph: KnowledgeGraph::default() }
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    /// Ask the model for triplets and add them. Returns the number of lines
    /// that became edges.
    pub async fn build_graph_from_text(&mut self, text: &str) -> Result<usize, AppError> {
        let text = require_input(text, "text")?;
        let template = self.ctx.template(EXTRACT_TEMPLATE)?;
        let reply = self.ctx.complete(template.render([("text", text)])).await?;

        let mut added = 0;
        for line in reply.lines() {
            if let Some((s, r, o)) = parse_triplet(line) {
                self.graph.add_edge(&s, &r, &o);
                added += 1;
            }
        }
        if added == 0 {
            warn!("knowledge graph: model reply contained no triplets");
        }
        info!(added, edges = self.graph.edges.len(), "graph built");
        Ok(added)
    }

    /// Map the question to a node and list every edge touching it.
    pub async fn query(&self, question: &str) -> String {
        let question = match require_input(question, "question") {
            Ok(q) => q,
            Err(e) => return e.to_string(),
        };
        let node = match self.resolve_node(question).await {
            Ok(n) => n,
            Err(e) => return failure_message("knowledge_graph", &e),
        };
        info!(%node, "graph query");

        let hits = self.graph.edges_touching(&node);
        if hits.is_empty() {
            return NOT_FOUND_MESSAGE.to_string();
        }
        hits.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }

    async fn resolve_node(&self, question: &str) -> Result<String, AppError> {
        let template = self.ctx.template(QUERY_TEMPLATE)?;
        let reply = self.ctx.complete(template.render([("question", question)])).await?;
        Ok(reply.trim().trim_matches(['"', '\'', '.']).trim().to_string())
    }
}
