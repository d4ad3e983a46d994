use crate::types::Symbols;

/// Move every `(FunctionId, FunctionInfo)` entry from `source` into
/// `destination`, appending rather than overwriting any entries already
/// present for a given id. `source` is empty afterwards.
pub fn reduce_symbols(source: &mut Symbols, destination: &mut Symbols) {
    for (id, infos) in source.take_table() {
        destination.table_mut().entry(id).or_default().extend(infos);
    }
}
