use std::collections::HashMap;
use std::sync::Arc;

use intake_core::{LLMError, LLMProvider};

/// Named LLM providers. Operations refer to a provider by alias so a cheaper model can
/// be assigned to classification while generation stays on the default.
#[derive(Clone)]
pub struct LLMRegistry {
    providers: HashMap<String, Arc<dyn LLMProvider>>,
    default_alias: String,
}

impl std::fmt::Debug for LLMRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("default_alias", &self.default_alias)
            .finish()
    }
}

impl LLMRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            default_alias: "default".to_string(),
        }
    }

    /// Registry with a single provider under the default alias.
    pub fn single(provider: Arc<dyn LLMProvider>) -> Self {
        let mut registry = Self::new();
        registry.register("default", provider);
        registry
    }

    pub fn register(&mut self, alias: impl Into<String>, provider: Arc<dyn LLMProvider>) {
        self.providers.insert(alias.into(), provider);
    }

    pub fn set_default(&mut self, alias: impl Into<String>) {
        self.default_alias = alias.into();
    }

    pub fn get(&self, alias: &str) -> Result<Arc<dyn LLMProvider>, LLMError> {
        self.providers
            .get(alias)
            .cloned()
            .ok_or_else(|| LLMError::Config(format!("LLM alias not found: {}", alias)))
    }

    pub fn default(&self) -> Result<Arc<dyn LLMProvider>, LLMError> {
        self.get(&self.default_alias)
    }

    /// Provider for `alias`, or the default provider when the alias is not registered.
    pub fn resolve(&self, alias: &str) -> Result<Arc<dyn LLMProvider>, LLMError> {
        match self.providers.get(alias) {
            Some(provider) => Ok(provider.clone()),
            None => self.default(),
        }
    }

    pub fn has(&self, alias: &str) -> bool {
        self.providers.contains_key(alias)
    }

    pub fn aliases(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for LLMRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLLMProvider;
    use intake_core::ChatMessage;

    #[test]
    fn test_registry_basic() {
        let registry = LLMRegistry::single(Arc::new(MockLLMProvider::new("main")));
        assert!(registry.has("default"));
        assert!(!registry.has("unknown"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("nonexistent").is_err());
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_default() {
        let main = MockLLMProvider::new("main");
        main.set_response("from main");
        let fast = MockLLMProvider::new("fast");
        fast.set_response("from fast");

        let mut registry = LLMRegistry::new();
        registry.register("main", Arc::new(main.clone()));
        registry.register("fast", Arc::new(fast.clone()));
        registry.set_default("main");

        let messages = vec![ChatMessage::user("hi")];
        let classifier = registry.resolve("fast").unwrap();
        assert_eq!(classifier.complete(&messages, None).await.unwrap().content, "from fast");

        let generator = registry.resolve("generation").unwrap();
        assert_eq!(generator.complete(&messages, None).await.unwrap().content, "from main");
        assert_eq!(main.call_count(), 1);
        assert_eq!(fast.call_count(), 1);
    }

    #[test]
    fn test_resolve_without_default_errors() {
        let registry = LLMRegistry::new();
        let err = registry.resolve("anything").err().unwrap();
        assert!(matches!(err, LLMError::Config(_)));
    }
}
