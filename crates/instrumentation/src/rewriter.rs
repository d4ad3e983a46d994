//! Walks a module's functions in declaration order, consulting the filter
//! evaluator and injecting entry/exit probes. Grounded on
//! `original_source/spoor/instrumentation/inject_instrumentation/inject_instrumentation.cc`'s
//! `InstrumentModule`, adapted to decide `instrument` purely from the filter
//! evaluator (the source's separate allow-list/blocklist/min-instruction-count
//! path is superseded here by filter rule predicates on the same fields).

use spoor_filters::{Filters, FunctionInfo as FilterFunctionInfo};
use spoor_symbols::{make_function_id, module_id_hash, FunctionInfo, Symbols};

use crate::demangle::Demangler;
use crate::ir::{Module, Probe};

const MAIN_FUNCTION_NAME: &str = "main";

/// Whether the entry point should initialize and enable the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    pub initialize_runtime: bool,
    pub enable_runtime: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self { initialize_runtime: true, enable_runtime: true }
    }
}

#[derive(Debug)]
pub struct RewriteOutput {
    pub symbols: Symbols,
    pub modified: bool,
}

/// Rewrite every non-declaration function of `module`, returning the symbol
/// table for all of them (instrumented or not) and whether any function was
/// modified. `now_nanoseconds` supplies each `FunctionInfo`'s `created_at`.
pub fn rewrite_module(
    module: &mut dyn Module,
    filters: &Filters,
    demangler: &dyn Demangler,
    options: &RewriteOptions,
    now_nanoseconds: impl Fn() -> i64,
) -> RewriteOutput {
    let module_id = module.module_id().to_string();
    let module_hash = module_id_hash(&module_id);
    let mut symbols = Symbols::new();
    let mut modified = false;
    let mut counter: u32 = 0;

    for index in 0..module.function_count() {
        let function = module.function_at(index);
        if function.is_declaration() {
            continue;
        }

        let function_id = make_function_id(module_hash, counter);
        counter += 1;
        let linkage_name = function.linkage_name().to_string();
        let demangled_name = demangler.demangle(&linkage_name);
        let debug_info = function.debug_info().cloned();
        let instruction_count = function.instruction_count();

        let filter_info = FilterFunctionInfo {
            source_file_path: debug_info.as_ref().map(|d| d.file_name.clone()).unwrap_or_default(),
            demangled_name: demangled_name.clone(),
            linkage_name: linkage_name.clone(),
            ir_instruction_count: instruction_count,
        };
        let instrument = filters.evaluate(&filter_info).instrument;

        symbols.insert(
            function_id,
            FunctionInfo {
                module_id: module_id.clone(),
                linkage_name: linkage_name.clone(),
                demangled_name,
                file_name: debug_info.as_ref().map(|d| d.file_name.clone()).unwrap_or_default(),
                directory: debug_info.as_ref().map(|d| d.directory.clone()).unwrap_or_default(),
                line: debug_info.as_ref().map(|d| d.line).unwrap_or_default(),
                instrumented: instrument,
                created_at: now_nanoseconds(),
            },
        );

        if !instrument {
            continue;
        }
        modified = true;

        let is_main = linkage_name == MAIN_FUNCTION_NAME;
        let inject_runtime_calls = is_main && options.initialize_runtime;

        let mut entry_probes = Vec::new();
        if inject_runtime_calls {
            entry_probes.push(Probe::Initialize);
            if options.enable_runtime {
                entry_probes.push(Probe::Enable);
            }
        }
        entry_probes.push(Probe::LogFunctionEntry(function_id));
        function.insert_at_entry(&entry_probes);

        let mut exit_probes = vec![Probe::LogFunctionExit(function_id)];
        if inject_runtime_calls {
            exit_probes.push(Probe::Deinitialize);
        }
        function.insert_before_each_return(&exit_probes);
    }

    RewriteOutput { symbols, modified }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demangle::GenericDemangler;
    use crate::ir::mock::{MockFunction, MockModule};
    use spoor_filters::{default_filters, Filter, Action};

    fn allow_all_filters() -> Filters {
        Filters::new(vec![Filter::empty(Action::Allow)])
    }

    #[test]
    fn s4_main_with_two_returns_and_init_enable_requested() {
        let mut module = MockModule::new("m");
        module.push_function(MockFunction::new("main", 10).with_return_instruction_count(2));
        let filters = allow_all_filters();
        let demangler = GenericDemangler;

        let output = rewrite_module(
            &mut module,
            &filters,
            &demangler,
            &RewriteOptions { initialize_runtime: true, enable_runtime: true },
            || 0,
        );

        assert!(output.modified);
        let function = &module.functions()[0];
        let function_id = match function.entry_probes()[2] {
            Probe::LogFunctionEntry(id) => id,
            other => panic!("expected LogFunctionEntry, got {other:?}"),
        };
        assert_eq!(
            function.entry_probes().to_vec(),
            vec![Probe::Initialize, Probe::Enable, Probe::LogFunctionEntry(function_id)]
        );
        assert_eq!(function.exit_probes().len(), 2);
        for exit in function.exit_probes() {
            assert_eq!(exit, &vec![Probe::LogFunctionExit(function_id), Probe::Deinitialize]);
        }
    }

    #[test]
    fn s4_init_disabled_only_entry_exit_pairs_are_inserted() {
        let mut module = MockModule::new("m");
        module.push_function(MockFunction::new("main", 10).with_return_instruction_count(2));
        let filters = allow_all_filters();
        let demangler = GenericDemangler;

        rewrite_module(
            &mut module,
            &filters,
            &demangler,
            &RewriteOptions { initialize_runtime: false, enable_runtime: false },
            || 0,
        );

        let function = &module.functions()[0];
        assert_eq!(function.entry_probes().len(), 1);
        assert!(matches!(function.entry_probes()[0], Probe::LogFunctionEntry(_)));
        for exit in function.exit_probes() {
            assert_eq!(exit.len(), 1);
            assert!(matches!(exit[0], Probe::LogFunctionExit(_)));
        }
    }

    #[test]
    fn non_instrumented_functions_are_still_recorded_in_symbols() {
        let mut module = MockModule::new("m");
        module.push_function(MockFunction::new("skipped", 1));
        let filters = Filters::new(vec![Filter::empty(Action::Block)]);
        let demangler = GenericDemangler;

        let output = rewrite_module(
            &mut module,
            &filters,
            &demangler,
            &RewriteOptions::default(),
            || 0,
        );

        assert!(!output.modified);
        assert_eq!(output.symbols.len(), 1);
        let function = &module.functions()[0];
        assert!(function.entry_probes().is_empty());
    }

    #[test]
    fn declarations_are_skipped_entirely() {
        let mut module = MockModule::new("m");
        module.push_function(MockFunction::new("extern_fn", 0).declaration());
        let output = rewrite_module(
            &mut module,
            &allow_all_filters(),
            &GenericDemangler,
            &RewriteOptions::default(),
            || 0,
        );
        assert!(output.symbols.is_empty());
    }

    #[test]
    fn counter_only_advances_for_non_declaration_functions() {
        let mut module = MockModule::new("m");
        module.push_function(MockFunction::new("extern_fn", 0).declaration());
        module.push_function(MockFunction::new("first_real_fn", 1));
        let output = rewrite_module(
            &mut module,
            &allow_all_filters(),
            &GenericDemangler,
            &RewriteOptions::default(),
            || 0,
        );
        let function = &module.functions()[1];
        let function_id = match function.entry_probes()[0] {
            Probe::LogFunctionEntry(id) => id,
            other => panic!("expected LogFunctionEntry, got {other:?}"),
        };
        assert_eq!(function_id & 0xffff_ffff, 0, "the declaration must not consume counter 0");
        assert_eq!(output.symbols.len(), 2);
    }

    #[test]
    fn default_filters_block_the_config_file_path_accessor() {
        let mut module = MockModule::new("m");
        module.push_function(MockFunction::new(
            "spoor_runtime::config::config_file_path()",
            1,
        ));
        let filters = Filters::new(default_filters());
        let output = rewrite_module(
            &mut module,
            &filters,
            &GenericDemangler,
            &RewriteOptions::default(),
            || 0,
        );
        assert!(!output.modified);
    }
}
