use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hash::hash32;

/// Opaque function identifier: the upper 32 bits are a stable hash of the
/// owning module's identifier, the lower 32 are a per-module monotonically
/// increasing counter assigned in IR walk order.
pub type FunctionId = u64;

pub fn module_id_hash(module_id: &str) -> u32 {
    hash32(module_id.as_bytes())
}

/// Compose a [`FunctionId`] from a module hash and a per-module counter.
pub fn make_function_id(module_hash: u32, counter: u32) -> FunctionId {
    ((module_hash as u64) << 32) | counter as u64
}

/// A function encountered by the IR rewriter, emitted once per function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub module_id: String,
    pub linkage_name: String,
    pub demangled_name: String,
    pub file_name: String,
    pub directory: String,
    pub line: i32,
    pub instrumented: bool,
    /// Nanoseconds since the Unix epoch, sampled from the system (wall)
    /// clock -- never the steady clock used for event timestamps.
    pub created_at: i64,
}

/// The mapping from [`FunctionId`] to an ordered sequence of [`FunctionInfo`].
///
/// The sequence is non-singleton only after [`crate::reduce_symbols`] merges
/// symbol tables from modules that collided on the low-32 counter space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbols {
    function_symbols_table: BTreeMap<FunctionId, Vec<FunctionInfo>>,
}

impl Symbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `info` to the sequence recorded for `id`.
    pub fn insert(&mut self, id: FunctionId, info: FunctionInfo) {
        self.function_symbols_table.entry(id).or_default().push(info);
    }

    pub fn get(&self, id: FunctionId) -> Option<&[FunctionInfo]> {
        self.function_symbols_table.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.function_symbols_table.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.function_symbols_table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FunctionId, &Vec<FunctionInfo>)> {
        self.function_symbols_table.iter()
    }

    pub(crate) fn table_mut(&mut self) -> &mut BTreeMap<FunctionId, Vec<FunctionInfo>> {
        &mut self.function_symbols_table
    }

    pub(crate) fn take_table(&mut self) -> BTreeMap<FunctionId, Vec<FunctionInfo>> {
        std::mem::take(&mut self.function_symbols_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_id_partitions_hash_and_counter() {
        let id = make_function_id(0xdead_beef, 7);
        assert_eq!(id >> 32, 0xdead_beef);
        assert_eq!(id & 0xffff_ffff, 7);
    }

    #[test]
    fn insert_appends_rather_than_overwrites() {
        let mut symbols = Symbols::new();
        let info = |name: &str| FunctionInfo {
            module_id: "m".to_string(),
            linkage_name: name.to_string(),
            demangled_name: name.to_string(),
            file_name: String::new(),
            directory: String::new(),
            line: 0,
            instrumented: true,
            created_at: 0,
        };
        symbols.insert(1, info("a"));
        symbols.insert(1, info("b"));
        assert_eq!(symbols.get(1).unwrap().len(), 2);
        assert_eq!(symbols.len(), 2);
    }
}
