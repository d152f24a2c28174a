//! Memoization of specialized function instances.

use std::collections::HashMap;

use crate::ast::value::ValueId;
use crate::types::TypeId;

/// Identity of a specialization request. Frames and templates compare by
/// node identity, types by interned id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct InstanceKey {
    pub frame: Option<ValueId>,
    pub original: ValueId,
    pub instance_args: Vec<TypeId>,
}

/// Session-lifetime map from instance keys to specialized functions.
///
/// Entries are inserted before the function body is specialized so that
/// recursive lookups find the in-progress shell instead of respecializing.
pub(crate) struct InstanceCache {
    map: HashMap<InstanceKey, ValueId>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn get(&self, key: &InstanceKey) -> Option<ValueId> {
        self.map.get(key).copied()
    }

    pub fn insert(&mut self, key: InstanceKey, function: ValueId) {
        self.map.insert(key, function);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}
