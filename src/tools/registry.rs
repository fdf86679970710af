use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ToolCallRequest, ToolCallResult, ToolDescriptor, ToolModule};
use crate::config::HubConfig;
use crate::error::{RegistryError, ToolError};
use crate::modules::{AgriculturalModule, CultureModule, FinanceModule, TradeModule};

/// Where a tool name is routed: its module and the descriptor's position in
/// that module's catalog.
#[derive(Clone, Copy)]
struct Route {
    module: usize,
    descriptor: usize,
}

/// Aggregates modules for discovery and routes calls to the owning module.
///
/// Routing uses an exact-name table built at registration time. Once the
/// registry is shared it is read-only, so concurrent dispatches never
/// contend on anything.
pub struct ToolRegistry {
    modules: Vec<Arc<dyn ToolModule>>,
    routes: HashMap<String, Route>,
    call_timeout: Option<Duration>,
}

impl ToolRegistry {
    /// Create an empty registry without a call timeout
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            routes: HashMap::new(),
            call_timeout: None,
        }
    }

    /// Registry holding every enabled built-in module, configured from `config`
    pub fn with_default_modules(config: &HubConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new().with_call_timeout(config.call_timeout());
        let modules = &config.modules;

        if modules.agricultural.enabled {
            registry.register(AgriculturalModule::synthetic(config))?;
        }
        if modules.trade.enabled {
            registry.register(TradeModule::synthetic(config))?;
        }
        if modules.culture.enabled {
            registry.register(CultureModule::synthetic(config))?;
        }
        if modules.finance.enabled {
            registry.register(FinanceModule::synthetic(config))?;
        }

        Ok(registry)
    }

    /// Bound every call by `timeout` unless the module overrides it
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Register a module.
    ///
    /// Nothing is registered if any of its tools is misnamed or already owned.
    pub fn register(&mut self, module: impl ToolModule + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(module))
    }

    /// Register a module that is already shared
    pub fn register_arc(&mut self, module: Arc<dyn ToolModule>) -> Result<(), RegistryError> {
        let domain = module.domain().to_string();
        if self.modules.iter().any(|m| m.domain() == domain) {
            return Err(RegistryError::DuplicateDomain(domain));
        }

        let prefix = format!("{}_", domain);
        let index = self.modules.len();
        let mut pending: HashMap<String, Route> = HashMap::new();

        for (position, descriptor) in module.list_tools().iter().enumerate() {
            if !descriptor.name.starts_with(&prefix) {
                return Err(RegistryError::PrefixMismatch {
                    name: descriptor.name.clone(),
                    domain,
                });
            }

            let existing = self.routes.get(&descriptor.name).or(pending.get(&descriptor.name));
            if let Some(route) = existing {
                let first = self
                    .modules
                    .get(route.module)
                    .map_or_else(|| domain.clone(), |m| m.domain().to_string());
                return Err(RegistryError::DuplicateTool {
                    name: descriptor.name.clone(),
                    first,
                    second: domain,
                });
            }

            pending.insert(
                descriptor.name.clone(),
                Route {
                    module: index,
                    descriptor: position,
                },
            );
        }

        debug!(domain = %domain, tools = pending.len(), "registered module");
        self.routes.extend(pending);
        self.modules.push(module);
        Ok(())
    }

    /// Every module's descriptors, in registration order then declaration order
    pub fn list_all_tools(&self) -> Vec<ToolDescriptor> {
        self.modules
            .iter()
            .flat_map(|m| m.list_tools().iter().cloned())
            .collect()
    }

    /// Look up a descriptor by exact tool name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        let route = self.routes.get(name)?;
        self.modules
            .get(route.module)?
            .list_tools()
            .get(route.descriptor)
    }

    /// Registered domains, in registration order
    pub fn domains(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.domain()).collect()
    }

    /// Tool names in listing order
    pub fn names(&self) -> Vec<&str> {
        self.modules
            .iter()
            .flat_map(|m| m.list_tools().iter().map(|d| d.name.as_str()))
            .collect()
    }

    /// Route a call and wrap the outcome.
    ///
    /// Never fails: unknown names, invalid arguments, module errors, timeouts
    /// and panics all come back as an error envelope.
    pub async fn dispatch(&self, request: &ToolCallRequest) -> ToolCallResult {
        let call_id = Uuid::new_v4();
        let started = Instant::now();

        match self.try_dispatch(&request.name, &request.arguments).await {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => {
                    debug!(
                        %call_id,
                        tool = %request.name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "tool call succeeded"
                    );
                    ToolCallResult::ok(text)
                }
                Err(e) => {
                    warn!(%call_id, tool = %request.name, error = %e, "failed to serialize tool output");
                    ToolCallResult::error(&request.name, e)
                }
            },
            Err(e) => {
                warn!(
                    %call_id,
                    tool = %request.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "tool call failed"
                );
                ToolCallResult::error(&request.name, e)
            }
        }
    }

    /// Dispatch several calls concurrently; results keep the request order
    pub async fn dispatch_all(&self, requests: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        join_all(requests.iter().map(|r| self.dispatch(r))).await
    }

    async fn try_dispatch(&self, name: &str, raw: &Value) -> Result<Value, ToolError> {
        let Some(route) = self.routes.get(name).copied() else {
            return Err(self.unresolved(name));
        };
        let module = self
            .modules
            .get(route.module)
            .cloned()
            .ok_or_else(|| ToolError::unknown(name))?;
        let descriptor = module
            .list_tools()
            .get(route.descriptor)
            .ok_or_else(|| ToolError::unknown(name))?;

        let args = descriptor.input_schema.validate(raw)?;
        debug!(tool = %name, domain = %module.domain(), "routing tool call");

        let timeout = module.call_timeout().or(self.call_timeout);
        let owned_name = name.to_string();
        let mut task = tokio::spawn(async move { module.handle(&owned_name, args).await });

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return Err(ToolError::Timeout {
                        name: name.to_string(),
                        limit,
                    });
                }
            },
            None => task.await,
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(ToolError::Panicked {
                name: name.to_string(),
            }),
            Err(e) => Err(ToolError::Internal(anyhow::anyhow!(
                "tool task was cancelled: {}",
                e
            ))),
        }
    }

    /// Classify a name with no route: a module claims the prefix but does not
    /// declare the tool, or no module claims it at all.
    fn unresolved(&self, name: &str) -> ToolError {
        let claimed = self
            .modules
            .iter()
            .any(|m| name.starts_with(&format!("{}_", m.domain())));
        if claimed {
            ToolError::unknown(name)
        } else {
            ToolError::Unroutable {
                name: name.to_string(),
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Arguments, InputSchema, ParamSpec};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoModule {
        domain: &'static str,
        tools: Vec<ToolDescriptor>,
    }

    impl EchoModule {
        fn new(domain: &'static str, names: &[&str]) -> Self {
            let tools = names
                .iter()
                .map(|n| {
                    ToolDescriptor::new(
                        *n,
                        "echo",
                        InputSchema::new(vec![ParamSpec::string("value", "anything")]),
                    )
                })
                .collect();
            Self { domain, tools }
        }
    }

    #[async_trait]
    impl ToolModule for EchoModule {
        fn domain(&self) -> &str {
            self.domain
        }

        fn list_tools(&self) -> &[ToolDescriptor] {
            &self.tools
        }

        async fn handle(&self, name: &str, args: Arguments) -> Result<Value, ToolError> {
            match name {
                "alpha_panic" => panic!("handler blew up"),
                "alpha_slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::Null)
                }
                _ if self.descriptor(name).is_some() => Ok(json!({
                    "module": self.domain,
                    "tool": name,
                    "value": args.get("value"),
                })),
                _ => Err(ToolError::unknown(name)),
            }
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(EchoModule::new("alpha", &["alpha_one", "alpha_two"]))
            .unwrap();
        registry
            .register(EchoModule::new("beta", &["beta_one"]))
            .unwrap();
        registry
    }

    #[test]
    fn lists_in_registration_then_declaration_order() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["alpha_one", "alpha_two", "beta_one"]);
        assert_eq!(registry.domains(), vec!["alpha", "beta"]);
        assert_eq!(registry.get("beta_one").unwrap().name, "beta_one");
        assert!(registry.get("beta_two").is_none());
    }

    #[test]
    fn rejects_prefix_mismatch() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .register(EchoModule::new("alpha", &["alpha_one", "beta_one"]))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::PrefixMismatch {
                name: "beta_one".to_string(),
                domain: "alpha".to_string(),
            }
        );
        assert!(registry.names().is_empty());
    }

    #[test]
    fn rejects_duplicate_domain() {
        let mut registry = registry();
        let err = registry
            .register(EchoModule::new("beta", &["beta_three"]))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateDomain("beta".to_string()));
    }

    #[test]
    fn rejects_name_declared_twice() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .register(EchoModule::new("alpha", &["alpha_one", "alpha_one"]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool { .. }));
    }

    #[test]
    fn rejects_name_owned_by_another_module() {
        let mut registry = ToolRegistry::new();
        registry
            .register(EchoModule::new("alpha", &["alpha_x_run"]))
            .unwrap();
        let err = registry
            .register(EchoModule::new("alpha_x", &["alpha_x_run"]))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTool {
                name: "alpha_x_run".to_string(),
                first: "alpha".to_string(),
                second: "alpha_x".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn routes_to_owning_module() {
        let result = registry()
            .dispatch(&ToolCallRequest::new("beta_one", json!({"value": 3})))
            .await;
        assert!(!result.is_error);
        let body = result.json().unwrap();
        assert_eq!(body["module"], "beta");
        assert_eq!(body["value"], 3);
    }

    #[tokio::test]
    async fn unknown_name_with_claimed_prefix() {
        let result = registry()
            .dispatch(&ToolCallRequest::new("alpha_three", json!({})))
            .await;
        assert!(result.is_error);
        assert_eq!(
            result.text().unwrap(),
            "Error executing tool alpha_three: unknown tool: alpha_three"
        );
    }

    #[tokio::test]
    async fn unroutable_name() {
        let result = registry()
            .dispatch(&ToolCallRequest::new("gamma_one", Value::Null))
            .await;
        assert!(result.is_error);
        assert_eq!(
            result.text().unwrap(),
            "Error executing tool gamma_one: no module registered for tool: gamma_one"
        );
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_handler() {
        let result = registry()
            .dispatch(&ToolCallRequest::new("alpha_one", json!({"value": 1})))
            .await;
        assert!(result.is_error);
        assert!(
            result
                .text()
                .unwrap()
                .contains("argument 'value' must be of type string")
        );
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let mut registry = ToolRegistry::new();
        registry
            .register(EchoModule::new("alpha", &["alpha_panic"]))
            .unwrap();

        let result = registry
            .dispatch(&ToolCallRequest::new("alpha_panic", json!({})))
            .await;
        assert!(result.is_error);
        assert_eq!(
            result.text().unwrap(),
            "Error executing tool alpha_panic: tool alpha_panic panicked while executing"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let mut registry = ToolRegistry::new().with_call_timeout(Some(Duration::from_secs(1)));
        registry
            .register(EchoModule::new("alpha", &["alpha_slow"]))
            .unwrap();

        let result = registry
            .dispatch(&ToolCallRequest::new("alpha_slow", json!({})))
            .await;
        assert!(result.is_error);
        assert!(result.text().unwrap().contains("timed out after 1s"));
    }

    #[tokio::test]
    async fn dispatch_all_keeps_request_order() {
        let requests = vec![
            ToolCallRequest::new("beta_one", json!({"value": "b"})),
            ToolCallRequest::new("nope", json!({})),
            ToolCallRequest::new("alpha_two", json!({"value": "a"})),
        ];
        let results = registry().dispatch_all(&requests).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].json().unwrap()["module"], "beta");
        assert!(results[1].is_error);
        assert_eq!(results[2].json().unwrap()["tool"], "alpha_two");
    }
}
