//! Named operation handlers (function imports) and their registry.

use std::sync::Arc;

use mockdb_core::{MockError, MockResult, Record};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Result of an operation: a single entry or a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutput {
    Entry(Record),
    Feed(Vec<Record>),
}

pub trait OperationHandler: Send + Sync {
    fn handle(&self, operation: &str, params: &Record, keys: &Record) -> MockResult<HandlerOutput>;
}

impl<F> OperationHandler for F
where
    F: Fn(&str, &Record, &Record) -> MockResult<HandlerOutput> + Send + Sync,
{
    fn handle(&self, operation: &str, params: &Record, keys: &Record) -> MockResult<HandlerOutput> {
        self(operation, params, keys)
    }
}

#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: FxHashMap<String, Arc<dyn OperationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self { Self::default() }

    /// Register `handler` under `name`, returning the one it replaces.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn OperationHandler>) -> Option<Arc<dyn OperationHandler>> {
        let name = name.into();
        debug!(operation = %name, "handler registered");
        self.handlers.insert(name, handler)
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn OperationHandler>> { self.handlers.remove(name) }

    pub fn contains(&self, name: &str) -> bool { self.handlers.contains_key(name) }

    pub fn len(&self) -> usize { self.handlers.len() }
    pub fn is_empty(&self) -> bool { self.handlers.is_empty() }

    /// Dispatch to the handler registered under `name`; unknown names are `NotImplemented`.
    pub fn invoke(&self, name: &str, params: &Record, keys: &Record) -> MockResult<HandlerOutput> {
        let handler = self.handlers.get(name).ok_or_else(|| MockError::NotImplemented(format!("operation {}", name)))?;
        handler.handle(name, params, keys)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("HandlerRegistry").field("operations", &names).finish()
    }
}
