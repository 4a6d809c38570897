//! Service Method Dispatch Table
//!
//! A deployed service is a named set of async closures. Each closure is registered under
//! a `MethodKey` (method name plus argument kinds) when the service is built, so a call
//! never needs runtime introspection: it is a map lookup followed by an invocation.

use super::types::{ArgKind, MethodKey, ServiceName};

use anyhow::Result;
use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a thread-safe, asynchronous service method.
/// It takes the call arguments and returns a Future resolving to the method result.
pub type MethodHandler =
    Arc<dyn Fn(Vec<Value>) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

/// A service instance deployed on this node.
pub struct ServiceContext {
    name: ServiceName,
    methods: DashMap<MethodKey, MethodHandler>,
}

impl ServiceContext {
    /// Creates a service with no methods.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            methods: DashMap::new(),
        }
    }

    /// Builder form of [`ServiceContext::register`].
    pub fn method<F, Fut>(self, method_name: &str, arg_kinds: &[ArgKind], handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(method_name, arg_kinds, handler);
        self
    }

    /// Registers a method under the signature `method_name(arg_kinds...)`.
    ///
    /// Registering the same signature twice replaces the previous handler.
    pub fn register<F, Fut>(&self, method_name: &str, arg_kinds: &[ArgKind], handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        // Box::pin erases the concrete Future type so every method fits the same map.
        let handler_fn: MethodHandler = Arc::new(move |args: Vec<Value>| {
            Box::pin(handler(args)) as Pin<Box<dyn Future<Output = Result<Value>> + Send>>
        });

        let key = MethodKey::new(method_name, arg_kinds);
        tracing::debug!("Registered method {} on service {}", key, self.name);
        self.methods.insert(key, handler_fn);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finds the handler serving `call`.
    ///
    /// An exact signature wins; otherwise any registered signature whose wildcard
    /// positions accept the call's argument kinds is used. Overlapping wildcard
    /// signatures are not ordered.
    pub fn lookup(&self, call: &MethodKey) -> Option<MethodHandler> {
        if let Some(handler) = self.methods.get(call) {
            return Some(handler.value().clone());
        }

        self.methods
            .iter()
            .find(|entry| entry.key().matches(call))
            .map(|entry| entry.value().clone())
    }

    pub fn has_method(&self, call: &MethodKey) -> bool {
        self.lookup(call).is_some()
    }

    /// Returns all registered signatures.
    pub fn list_methods(&self) -> Vec<MethodKey> {
        self.methods.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .finish()
    }
}
