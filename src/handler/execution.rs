use fnv::FnvHashMap;
use serde_json::Value;

use crate::protocol::ExecutionContextId;

/// Represents a context for JavaScript execution. A frame has many of them
/// over its lifetime
/// - every new document gets a main world context
/// - isolated worlds (like those created for init scripts with a world name)
///   get their own.
///
/// Workers track their contexts the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    /// Identifier of the execution context inside its content process
    local_id: ExecutionContextId,
    aux_data: Value,
}

impl ExecutionContext {
    pub fn new(local_id: ExecutionContextId, aux_data: Value) -> Self {
        Self { local_id, aux_data }
    }

    pub fn local_id(&self) -> &ExecutionContextId {
        &self.local_id
    }

    pub fn aux_data(&self) -> &Value {
        &self.aux_data
    }
}

/// The live execution contexts of a frame or worker, in creation order.
#[derive(Debug, Default)]
pub struct ExecutionContexts {
    contexts: FnvHashMap<ExecutionContextId, ExecutionContext>,
    order: Vec<ExecutionContextId>,
}

impl ExecutionContexts {
    /// Tracks a new context, returns `false` if a context with that id is
    /// already live.
    pub fn insert(&mut self, context: ExecutionContext) -> bool {
        if self.contexts.contains_key(&context.local_id) {
            return false;
        }
        self.order.push(context.local_id.clone());
        self.contexts.insert(context.local_id.clone(), context);
        true
    }

    pub fn remove(&mut self, local_id: &ExecutionContextId) -> Option<ExecutionContext> {
        let context = self.contexts.remove(local_id)?;
        self.order.retain(|id| id != local_id);
        Some(context)
    }

    pub fn get(&self, local_id: &ExecutionContextId) -> Option<&ExecutionContext> {
        self.contexts.get(local_id)
    }

    pub fn contains(&self, local_id: &ExecutionContextId) -> bool {
        self.contexts.contains_key(local_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates the contexts in the order they were created
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionContext> + '_ {
        self.order.iter().filter_map(move |id| self.contexts.get(id))
    }

    /// Removes all contexts, oldest first
    pub fn drain(&mut self) -> Vec<ExecutionContext> {
        let mut contexts = std::mem::take(&mut self.contexts);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|id| contexts.remove(&id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(id: &str) -> ExecutionContext {
        ExecutionContext::new(ExecutionContextId::new(id), json!({"name": id}))
    }

    #[test]
    fn keeps_creation_order() {
        let mut contexts = ExecutionContexts::default();
        assert!(contexts.insert(ctx("3")));
        assert!(contexts.insert(ctx("1")));
        assert!(contexts.insert(ctx("2")));
        assert!(!contexts.insert(ctx("1")));
        assert_eq!(contexts.len(), 3);

        contexts.remove(&ExecutionContextId::new("1"));
        let ids: Vec<_> = contexts.iter().map(|c| c.local_id().to_string()).collect();
        assert_eq!(ids, vec!["3", "2"]);

        let drained: Vec<_> = contexts
            .drain()
            .into_iter()
            .map(|c| c.local_id().to_string())
            .collect();
        assert_eq!(drained, vec!["3", "2"]);
        assert!(contexts.is_empty());
    }
}
