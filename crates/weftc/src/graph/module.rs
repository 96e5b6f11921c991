//! Transport-ready description of a reactive pipeline

use crate::types::{Params, TaskType, Type};
use indexmap::IndexMap;
use serde::Serialize;

/// Port names used on every edge
pub const OUTPUT_PARAM: &str = "output";
pub const INPUT_PARAM: &str = "input";

/// Built-in node types
pub const ON_NODE: &str = "on";
pub const WRITE_NODE: &str = "write";

/// Signature of a task with types rendered as strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub key: String,
    pub config: IndexMap<String, String>,
    pub params: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    pub reads: Vec<String>,
    pub writes: Vec<String>,
}

impl TaskRecord {
    pub fn new(key: impl Into<String>, task: &TaskType) -> Self {
        Self {
            key: key.into(),
            config: render_params(&task.config),
            params: render_params(&task.params),
            returns: task.ret.as_ref().map(ToString::to_string),
            reads: task.channels.read.iter().cloned().collect(),
            writes: task.channels.write.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionRecord {
    pub key: String,
    pub params: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
}

impl FunctionRecord {
    pub fn new(key: impl Into<String>, params: &Params, ret: Option<&Type>) -> Self {
        Self {
            key: key.into(),
            params: render_params(params),
            returns: ret.map(ToString::to_string),
        }
    }
}

fn render_params(params: &Params) -> IndexMap<String, String> {
    params
        .iter()
        .map(|(name, ty)| (name.to_string(), ty.to_string()))
        .collect()
}

/// One stage of a pipeline. `node_type` names a task or a built-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub key: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Config values as written in source, unevaluated
    pub config: IndexMap<String, String>,
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handle {
    pub node: String,
    pub param: String,
}

impl Handle {
    pub fn new(node: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            param: param.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: Handle,
    pub target: Handle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Module {
    pub tasks: Vec<TaskRecord>,
    pub functions: Vec<FunctionRecord>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Compiled bodies, embedded unmodified
    pub wasm: Vec<u8>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
