//! Module data-flow analysis.
//!
//! Modules in a lead-generation workflow reference each other's outputs with
//! `{{moduleId.field}}` placeholders. This crate turns those references into
//! a dependency graph and flags two shapes worth a look:
//! - outputs no other module consumes (potential data loss)
//! - producers with many distinct consumers (bottlenecks)

pub mod parser;

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use leadgen_shared::DataFlowConfig;

pub use parser::{DEFAULT_FIELD, Reference, extract_references, parse_claims_response};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A module and the texts (prompts, templates) it is configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub id: String,
    #[serde(default)]
    pub texts: Vec<String>,
}

impl ModuleSpec {
    pub fn new(id: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            id: id.into(),
            texts,
        }
    }
}

/// `consumer` reads `field` from `producer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub producer: String,
    pub consumer: String,
    pub field: String,
}

/// A producer read by more distinct consumers than the threshold allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub module_id: String,
    /// Distinct consumers, sorted.
    pub consumers: Vec<String>,
}

/// Result of [`DependencyGraph::report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlowReport {
    pub edges: Vec<Edge>,
    /// Declared modules nobody references, root excluded.
    pub unreferenced_outputs: Vec<String>,
    pub bottlenecks: Vec<Bottleneck>,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Reference graph between declared modules.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Declared module ids, in declaration order.
    modules: Vec<String>,
    /// Edges in discovery order, one per (consumer, producer, field).
    edges: Vec<Edge>,
}

impl DependencyGraph {
    /// Build the graph by scanning every text of every module.
    #[instrument(skip_all, fields(modules = modules.len()))]
    pub fn from_modules(modules: &[ModuleSpec]) -> Self {
        let mut graph = Self::default();

        for module in modules {
            graph.modules.push(module.id.clone());

            let mut seen = HashSet::new();
            for text in &module.texts {
                for reference in extract_references(text, &module.id) {
                    if seen.insert(reference.clone()) {
                        graph.edges.push(Edge {
                            producer: reference.module_id,
                            consumer: module.id.clone(),
                            field: reference.field,
                        });
                    }
                }
            }
        }

        debug!(edges = graph.edges.len(), "dependency graph built");
        graph
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Distinct modules reading from `producer`, sorted.
    pub fn consumers_of(&self, producer: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.producer == producer)
            .map(|e| e.consumer.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// References made by `consumer`, in discovery order.
    pub fn dependencies_of(&self, consumer: &str) -> Vec<Reference> {
        self.edges
            .iter()
            .filter(|e| e.consumer == consumer)
            .map(|e| Reference {
                module_id: e.producer.clone(),
                field: e.field.clone(),
            })
            .collect()
    }

    /// Declared modules whose output no module references, excluding the root.
    pub fn unreferenced_outputs(&self, root_module_id: &str) -> Vec<String> {
        let referenced: HashSet<&str> = self.edges.iter().map(|e| e.producer.as_str()).collect();
        self.modules
            .iter()
            .filter(|id| id.as_str() != root_module_id && !referenced.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Producers with strictly more than `threshold` distinct consumers, in
    /// order of first reference.
    pub fn bottlenecks(&self, threshold: usize) -> Vec<Bottleneck> {
        let mut order: Vec<&str> = Vec::new();
        let mut consumers: HashMap<&str, BTreeSet<&str>> = HashMap::new();

        for edge in &self.edges {
            let entry = consumers.entry(edge.producer.as_str()).or_insert_with(|| {
                order.push(edge.producer.as_str());
                BTreeSet::new()
            });
            entry.insert(edge.consumer.as_str());
        }

        order
            .into_iter()
            .filter_map(|producer| {
                let set = consumers.get(producer)?;
                (set.len() > threshold).then(|| Bottleneck {
                    module_id: producer.to_string(),
                    consumers: set.iter().map(|c| c.to_string()).collect(),
                })
            })
            .collect()
    }

    /// Full analysis with the configured root and threshold.
    pub fn report(&self, config: &DataFlowConfig) -> DataFlowReport {
        let report = DataFlowReport {
            edges: self.edges.clone(),
            unreferenced_outputs: self.unreferenced_outputs(&config.root_module_id),
            bottlenecks: self.bottlenecks(config.bottleneck_threshold),
        };

        info!(
            edges = report.edges.len(),
            unreferenced = report.unreferenced_outputs.len(),
            bottlenecks = report.bottlenecks.len(),
            "data-flow analysis complete"
        );
        report
    }
}
