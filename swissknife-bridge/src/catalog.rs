//! TTL-bounded cache of backend tool descriptors

use std::collections::HashMap;
use std::time::Duration;

use swissknife_protocol::ToolDescriptor;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::backend::ToolBackend;

/// Tool descriptors keyed by name, in backend order
#[derive(Debug)]
pub struct ToolCatalog {
    ttl: Duration,
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
    /// Time of the last fetch attempt, successful or not
    fetched_at: Option<Instant>,
}

impl ToolCatalog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tools: Vec::new(),
            index: HashMap::new(),
            fetched_at: None,
        }
    }

    /// Never fetched, or older than the TTL
    pub fn is_stale(&self) -> bool {
        match self.fetched_at {
            None => true,
            Some(at) => at.elapsed() > self.ttl,
        }
    }

    /// Refetch if stale. A failed fetch empties the catalog.
    pub async fn ensure_fresh(&mut self, backend: &dyn ToolBackend) {
        if !self.is_stale() {
            return;
        }

        match backend.fetch_tools().await {
            Ok(tools) => {
                self.replace(tools);
                info!(tools = self.len(), "Tool catalog refreshed");
            }
            Err(e) => {
                warn!(error = %e, "Tool catalog fetch failed; serving empty catalog");
                self.replace(Vec::new());
            }
        }
        self.fetched_at = Some(Instant::now());
    }

    /// Swap in a new descriptor set. A later duplicate name replaces the
    /// earlier entry in place.
    pub fn replace(&mut self, tools: Vec<ToolDescriptor>) {
        self.tools.clear();
        self.index.clear();
        for tool in tools {
            match self.index.get(&tool.name) {
                Some(&slot) => self.tools[slot] = tool,
                None => {
                    self.index.insert(tool.name.clone(), self.tools.len());
                    self.tools.push(tool);
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    /// Descriptors an agent may see; reserved paths are hidden
    pub fn visible(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().filter(|tool| !tool.is_reserved())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}
