use std::collections::HashMap;
use std::sync::Arc;

use crate::echo::EchoAgent;
use crate::slow::SlowAgent;
use crate::starter::StarterAgent;
use crate::VoiceAgent;

/// Constructs an agent for a given model identifier.
pub type AgentFactory = fn(model: &str) -> Arc<dyn VoiceAgent>;

#[derive(Clone, Debug, thiserror::Error)]
#[error("unknown agent '{name}'; available: {available}")]
pub struct UnknownAgentError {
    pub name: String,
    pub available: String,
}

/// Lookup-by-name map from agent names to factories. Populated once at
/// startup and read-only afterwards; passed explicitly to whoever needs to
/// construct agents instead of living in process-wide state.
pub struct AgentRegistry {
    agents: HashMap<String, AgentFactory>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in example agents.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("starter", |model| Arc::new(StarterAgent::new(model)));
        registry.register("echo", |model| Arc::new(EchoAgent::new(model)));
        registry.register("slow", |model| Arc::new(SlowAgent::new(model)));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: AgentFactory) {
        self.agents.insert(name.into().to_lowercase(), factory);
    }

    /// Instantiate an agent by registry name.
    pub fn create(&self, name: &str, model: &str) -> Result<Arc<dyn VoiceAgent>, UnknownAgentError> {
        let key = name.to_lowercase();
        match self.agents.get(&key) {
            Some(factory) => Ok(factory(model)),
            None => Err(UnknownAgentError {
                name: name.to_owned(),
                available: self.names().join(", "),
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(&name.to_lowercase())
    }

    /// Sorted agent names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
