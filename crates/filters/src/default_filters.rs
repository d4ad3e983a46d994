use crate::filter::{Action, Filter};

/// The demangled name of the runtime's configuration file path accessor.
/// The default filter set blocks this function to prevent the pass from
/// instrumenting the runtime's own initialization path (see the runtime/
/// instrumentation cycle note).
pub const CONFIG_FILE_PATH_DEMANGLED_NAME: &str = "spoor_runtime::config::config_file_path";

/// The filter set applied when no rule file is supplied: a single `Block`
/// rule on the runtime's configuration initializer, preventing recursive
/// instrumentation.
pub fn default_filters() -> Vec<Filter> {
    vec![Filter {
        rule_name: Some("Block config file path configuration function".to_string()),
        function_demangled_name: Some(format!(
            "^{}\\(\\)$",
            regex::escape(CONFIG_FILE_PATH_DEMANGLED_NAME)
        )),
        ..Filter::empty(Action::Block)
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filters;
    use crate::filter::FunctionInfo;

    #[test]
    fn blocks_config_file_path_accessor() {
        let filters = Filters::new(default_filters());
        let info = FunctionInfo {
            source_file_path: String::new(),
            demangled_name: format!("{CONFIG_FILE_PATH_DEMANGLED_NAME}()"),
            linkage_name: String::new(),
            ir_instruction_count: 1,
        };
        assert!(!filters.evaluate(&info).instrument);
    }

    #[test]
    fn does_not_block_unrelated_functions() {
        let filters = Filters::new(default_filters());
        let info = FunctionInfo {
            source_file_path: String::new(),
            demangled_name: "my_app::main".to_string(),
            linkage_name: String::new(),
            ir_instruction_count: 1,
        };
        assert!(filters.evaluate(&info).instrument);
    }
}
