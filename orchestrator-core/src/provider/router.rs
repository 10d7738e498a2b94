//! Model Router: role→model mapping and primary→fallback chain traversal
//! (spec §4.7).

use crate::provider::health::ProviderHealthManager;
use crate::provider::{FallbackInfo, ModelApiError, ModelRequest, ModelResponse, ProviderAdapter};
use crate::role::AgentRole;
use std::collections::HashMap;
use std::sync::Arc;

/// One (provider, model) pair in a fallback chain.
#[derive(Debug, Clone)]
pub struct ProviderModelPair {
    pub provider: String,
    pub model: String,
}

/// The static routing table for one role: a primary provider/model, that
/// provider's own fallback model, then an ordered list of other providers
/// to fall back to entirely (spec §4.7 `getModelForRole`).
#[derive(Debug, Clone)]
pub struct RoleRoute {
    pub primary: ProviderModelPair,
    pub primary_fallback_model: Option<String>,
    pub provider_fallbacks: Vec<ProviderModelPair>,
}

impl RoleRoute {
    /// Flattens the route into the attempt order defined by spec §4.7:
    /// "primary provider's model, primary provider's fallbackModel, then
    /// each entry of providerFallbacks in order".
    fn attempt_order(&self) -> Vec<ProviderModelPair> {
        let mut attempts = vec![self.primary.clone()];
        if let Some(fallback_model) = &self.primary_fallback_model {
            attempts.push(ProviderModelPair {
                provider: self.primary.provider.clone(),
                model: fallback_model.clone(),
            });
        }
        attempts.extend(self.provider_fallbacks.iter().cloned());
        attempts
    }
}

/// Routes role-scoped model calls across registered provider adapters,
/// gated by provider credential availability and health.
pub struct ModelRouter {
    routes: HashMap<AgentRole, RoleRoute>,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    health: Arc<ProviderHealthManager>,
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelRouter {
    pub fn new(
        routes: HashMap<AgentRole, RoleRoute>,
        adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
        health: Arc<ProviderHealthManager>,
    ) -> Self {
        Self {
            routes,
            adapters,
            health,
        }
    }

    /// `getModelForRole` (spec §4.7).
    pub fn route_for(&self, role: AgentRole) -> Option<&RoleRoute> {
        self.routes.get(&role)
    }

    /// Whether a provider may be attempted: its adapter must be registered
    /// (credentials loaded at init) and the health manager must report it
    /// healthy (spec §4.7).
    fn is_attemptable(&self, provider: &str) -> bool {
        self.adapters.contains_key(provider) && self.health.check_health(provider)
    }

    /// `executeWithFallback` (spec §4.7, §8 scenario 6).
    pub async fn execute_with_fallback(
        &self,
        role: AgentRole,
        mut build_request: impl FnMut(&str) -> ModelRequest,
    ) -> Result<ModelResponse, ModelApiError> {
        let route = self
            .routes
            .get(&role)
            .ok_or_else(|| ModelApiError::new("router", format!("no route configured for role {role}")))?;

        let primary_provider = route.primary.provider.clone();
        let attempts = route.attempt_order();
        let mut last_error: Option<ModelApiError> = None;

        for attempt in attempts {
            if !self.is_attemptable(&attempt.provider) {
                tracing::debug!(provider = %attempt.provider, "skipping unattemptable provider");
                continue;
            }
            let Some(adapter) = self.adapters.get(&attempt.provider) else {
                continue;
            };

            let request = build_request(&attempt.model);
            match adapter.execute(request).await {
                Ok(mut response) => {
                    self.health.mark_success(&attempt.provider);
                    if attempt.provider != primary_provider {
                        response.fallback_info = Some(FallbackInfo {
                            original_provider: primary_provider.clone(),
                            used_provider: attempt.provider.clone(),
                            reason: last_error
                                .as_ref()
                                .map(|e| format!("{:?}", e.kind))
                                .unwrap_or_else(|| "fallback".to_string()),
                        });
                    }
                    return Ok(response);
                }
                Err(error) => {
                    tracing::warn!(provider = %attempt.provider, error = %error, "provider call failed");
                    self.health.mark_error(&attempt.provider, &error);
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ModelApiError::new("router", "no providers were attemptable")))
    }

    /// `executeWithTools` (spec §4.7): identical fallback traversal, using
    /// the adapter's tool-aware entry point.
    pub async fn execute_with_tools_fallback(
        &self,
        role: AgentRole,
        mut build_request: impl FnMut(&str) -> ModelRequest,
    ) -> Result<ModelResponse, ModelApiError> {
        let route = self
            .routes
            .get(&role)
            .ok_or_else(|| ModelApiError::new("router", format!("no route configured for role {role}")))?;

        let primary_provider = route.primary.provider.clone();
        let attempts = route.attempt_order();
        let mut last_error: Option<ModelApiError> = None;

        for attempt in attempts {
            if !self.is_attemptable(&attempt.provider) {
                continue;
            }
            let Some(adapter) = self.adapters.get(&attempt.provider) else {
                continue;
            };

            let request = build_request(&attempt.model);
            match adapter.execute_with_tools(request).await {
                Ok(mut response) => {
                    self.health.mark_success(&attempt.provider);
                    if attempt.provider != primary_provider {
                        response.fallback_info = Some(FallbackInfo {
                            original_provider: primary_provider.clone(),
                            used_provider: attempt.provider.clone(),
                            reason: last_error
                                .as_ref()
                                .map(|e| format!("{:?}", e.kind))
                                .unwrap_or_else(|| "fallback".to_string()),
                        });
                    }
                    return Ok(response);
                }
                Err(error) => {
                    self.health.mark_error(&attempt.provider, &error);
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ModelApiError::new("router", "no providers were attemptable")))
    }
}

/// The default role→route table (spec §4 canonical role table + §4.7).
pub fn default_routes() -> HashMap<AgentRole, RoleRoute> {
    let mut routes = HashMap::new();
    routes.insert(
        AgentRole::Architect,
        RoleRoute {
            primary: ProviderModelPair {
                provider: "anthropic".into(),
                model: "claude-sonnet-4-5".into(),
            },
            primary_fallback_model: Some("claude-3-5-sonnet-latest".into()),
            provider_fallbacks: vec![ProviderModelPair {
                provider: "openai".into(),
                model: "gpt-4.1".into(),
            }],
        },
    );
    routes.insert(
        AgentRole::Frontend,
        RoleRoute {
            primary: ProviderModelPair {
                provider: "openai".into(),
                model: "gpt-4.1".into(),
            },
            primary_fallback_model: Some("gpt-4o".into()),
            provider_fallbacks: vec![ProviderModelPair {
                provider: "anthropic".into(),
                model: "claude-sonnet-4-5".into(),
            }],
        },
    );
    routes.insert(
        AgentRole::CodeExplorer,
        RoleRoute {
            primary: ProviderModelPair {
                provider: "anthropic".into(),
                model: "claude-sonnet-4-5".into(),
            },
            primary_fallback_model: Some("claude-3-5-sonnet-latest".into()),
            provider_fallbacks: vec![ProviderModelPair {
                provider: "xai".into(),
                model: "grok-4".into(),
            }],
        },
    );
    routes.insert(
        AgentRole::TechnicalWriter,
        RoleRoute {
            primary: ProviderModelPair {
                provider: "anthropic".into(),
                model: "claude-sonnet-4-5".into(),
            },
            primary_fallback_model: Some("claude-3-5-haiku-latest".into()),
            provider_fallbacks: vec![ProviderModelPair {
                provider: "openai".into(),
                model: "gpt-4.1".into(),
            }],
        },
    );
    routes.insert(
        AgentRole::MultimodalAnalyzer,
        RoleRoute {
            primary: ProviderModelPair {
                provider: "google".into(),
                model: "gemini-2.5-pro".into(),
            },
            primary_fallback_model: Some("gemini-2.5-flash".into()),
            provider_fallbacks: vec![ProviderModelPair {
                provider: "anthropic".into(),
                model: "claude-sonnet-4-5".into(),
            }],
        },
    );
    routes.insert(
        AgentRole::DocumentationLibrarian,
        RoleRoute {
            primary: ProviderModelPair {
                provider: "anthropic".into(),
                model: "claude-sonnet-4-5".into(),
            },
            primary_fallback_model: Some("claude-3-5-haiku-latest".into()),
            provider_fallbacks: vec![ProviderModelPair {
                provider: "google".into(),
                model: "gemini-2.5-flash".into(),
            }],
        },
    );
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ModelMessage, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FakeAdapter {
        name: &'static str,
        fail_times: AtomicU32,
        calls: AtomicU32,
        failure_message: String,
    }

    impl FakeAdapter {
        fn new(name: &'static str, fail_times: u32, failure_message: &str) -> Self {
            Self {
                name,
                fail_times: AtomicU32::new(fail_times),
                calls: AtomicU32::new(0),
                failure_message: failure_message.to_string(),
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for FakeAdapter {
        fn provider_name(&self) -> &str {
            self.name
        }

        async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(ModelApiError::new(self.name, self.failure_message.clone()));
            }
            Ok(ModelResponse {
                content: format!("ok from {}", self.name),
                tool_calls: Vec::new(),
                finish_reason: "stop".into(),
                model: request.model,
                tokens_used: TokenUsage::default(),
                fallback_info: None,
            })
        }
    }

    fn route(primary: &str, fallback: &str) -> RoleRoute {
        RoleRoute {
            primary: ProviderModelPair {
                provider: primary.into(),
                model: "m1".into(),
            },
            primary_fallback_model: None,
            provider_fallbacks: vec![ProviderModelPair {
                provider: fallback.into(),
                model: "m2".into(),
            }],
        }
    }

    #[tokio::test]
    async fn falls_back_to_second_provider_on_rate_limit() {
        let p1 = Arc::new(FakeAdapter::new("p1", 1, "429 too many requests, retry-after: 2"));
        let p2 = Arc::new(FakeAdapter::new("p2", 0, ""));

        let mut routes = HashMap::new();
        routes.insert(AgentRole::Architect, route("p1", "p2"));

        let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert("p1".into(), p1.clone());
        adapters.insert("p2".into(), p2.clone());

        let health = Arc::new(ProviderHealthManager::new());
        let router = ModelRouter::new(routes, adapters, health);

        let response = router
            .execute_with_fallback(AgentRole::Architect, |model| {
                ModelRequest::simple(model, "sys", "hello")
            })
            .await
            .expect("should fall back successfully");

        assert_eq!(response.content, "ok from p2");
        let info = response.fallback_info.expect("expected fallback info");
        assert_eq!(info.original_provider, "p1");
        assert_eq!(info.used_provider, "p2");
        assert_eq!(p1.calls.load(Ordering::SeqCst), 1);
        assert_eq!(p2.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_providers_failing_returns_last_error() {
        let p1 = Arc::new(FakeAdapter::new("p1", 10, "500 internal server error"));
        let p2 = Arc::new(FakeAdapter::new("p2", 10, "500 internal server error"));

        let mut routes = HashMap::new();
        routes.insert(AgentRole::Architect, route("p1", "p2"));

        let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert("p1".into(), p1);
        adapters.insert("p2".into(), p2);

        let health = Arc::new(ProviderHealthManager::new());
        let router = ModelRouter::new(routes, adapters, health);

        let result = router
            .execute_with_fallback(AgentRole::Architect, |model| {
                ModelRequest::simple(model, "sys", "hello")
            })
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn message_constructor_sets_single_user_message() {
        let request = ModelRequest::simple("m", "sys", "hi");
        assert_eq!(request.messages.len(), 1);
        assert!(matches!(request.messages[0], ModelMessage { .. }));
    }
}
