//! Reassembles tool calls that arrive split across stream chunks.

use std::collections::BTreeMap;

use llmstxt_core::types::ToolCallRequest;
use llmstxt_providers::ToolCallFragment;
use tracing::trace;

/// A tool call assembled from fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRecord {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallRecord {
    pub fn to_request(&self) -> ToolCallRequest {
        ToolCallRequest {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

/// Per-stream accumulation state, keyed by slot index.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    records: BTreeMap<usize, ToolCallRecord>,
    observed: bool,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, fragment: &ToolCallFragment) {
        self.observed = true;

        let record = self
            .records
            .entry(fragment.index)
            .or_insert_with(|| {
                trace!(slot = fragment.index, "New tool call slot");
                ToolCallRecord {
                    index: fragment.index,
                    id: String::new(),
                    name: String::new(),
                    arguments: String::new(),
                }
            });

        if record.id.is_empty() {
            if let Some(id) = &fragment.id {
                record.id.clone_from(id);
            }
        }
        if let Some(name) = &fragment.name {
            record.name.push_str(name);
        }
        if let Some(arguments) = &fragment.arguments {
            record.arguments.push_str(arguments);
        }
    }

    /// True when the stream carried at least one tool-call fragment.
    pub fn has_tool_calls(&self) -> bool {
        self.observed && !self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.records.values()
    }

    /// Records in slot order. Calls the endpoint left without an identifier
    /// get a generated `call_<uuid>` one.
    pub fn into_records(self) -> Vec<ToolCallRecord> {
        self.records
            .into_values()
            .map(|mut record| {
                if record.id.is_empty() {
                    record.id = format!("call_{}", uuid::Uuid::new_v4().simple());
                }
                record
            })
            .collect()
    }
}
