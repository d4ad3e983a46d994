use std::path::Path;

use spoor_util::file_system::FileReader;
use thiserror::Error;
use toml::Value;

use crate::filter::{Action, Filter};
use crate::filters::Filters;

const ALLOW_KEY: &str = "allow";
const BLOCK_KEY: &str = "block";
const RULE_NAME_KEY: &str = "rule_name";
const SOURCE_FILE_PATH_KEY: &str = "source_file_path";
const FUNCTION_DEMANGLED_NAME_KEY: &str = "function_demangled_name";
const FUNCTION_LINKAGE_NAME_KEY: &str = "function_linkage_name";
const FUNCTION_IR_INSTRUCTION_COUNT_LT_KEY: &str = "function_ir_instruction_count_lt";
const FUNCTION_IR_INSTRUCTION_COUNT_GT_KEY: &str = "function_ir_instruction_count_gt";

const FILTER_KEYS: [&str; 6] = [
    RULE_NAME_KEY,
    SOURCE_FILE_PATH_KEY,
    FUNCTION_DEMANGLED_NAME_KEY,
    FUNCTION_LINKAGE_NAME_KEY,
    FUNCTION_IR_INSTRUCTION_COUNT_LT_KEY,
    FUNCTION_IR_INSTRUCTION_COUNT_GT_KEY,
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open the filter file {path}")]
    FailedToOpenFile { path: String },
    #[error("malformed filter file: {message}")]
    MalformedFile { message: String },
    #[error("unknown key \"{key}\"")]
    UnknownNode { key: String },
    #[error("malformed node \"{key}\": expected a list of filter tables")]
    MalformedNode { key: String },
}

/// Parse a filter file into a [`Filters`] rule list.
///
/// The file is a table with two top-level array-of-tables keys, `allow` and
/// `block`. Unknown keys at either level are errors, and a top-level
/// `allow`/`block` key that isn't an array of tables is `MalformedNode` (this
/// rejects a rule file that collapses `allow`/`block` into a scalar).
pub fn load_filters_file(file_reader: &impl FileReader, path: &Path) -> Result<Filters, LoadError> {
    let contents = file_reader
        .read_to_string(path)
        .map_err(|_| LoadError::FailedToOpenFile { path: path.display().to_string() })?;
    parse_filters(&contents)
}

fn parse_filters(contents: &str) -> Result<Filters, LoadError> {
    let table: Value = contents
        .parse()
        .map_err(|e: toml::de::Error| LoadError::MalformedFile { message: e.to_string() })?;
    let table = table
        .as_table()
        .ok_or_else(|| LoadError::MalformedFile { message: "root node is not a table".to_string() })?;

    let mut filters = Vec::new();
    for (key, node) in table {
        let action = match key.as_str() {
            ALLOW_KEY => Action::Allow,
            BLOCK_KEY => Action::Block,
            _ => return Err(LoadError::UnknownNode { key: key.clone() }),
        };

        let array = node
            .as_array()
            .ok_or_else(|| LoadError::MalformedNode { key: key.clone() })?;
        for element in array {
            let rule_table = element
                .as_table()
                .ok_or_else(|| LoadError::MalformedNode { key: key.clone() })?;

            for rule_key in rule_table.keys() {
                if !FILTER_KEYS.contains(&rule_key.as_str()) {
                    return Err(LoadError::UnknownNode {
                        key: format!("{rule_key} (in \"{key}\")"),
                    });
                }
            }

            filters.push(Filter {
                action,
                rule_name: string_field(rule_table, RULE_NAME_KEY),
                source_file_path: string_field(rule_table, SOURCE_FILE_PATH_KEY),
                function_demangled_name: string_field(rule_table, FUNCTION_DEMANGLED_NAME_KEY),
                function_linkage_name: string_field(rule_table, FUNCTION_LINKAGE_NAME_KEY),
                function_ir_instruction_count_lt: int_field(
                    rule_table,
                    FUNCTION_IR_INSTRUCTION_COUNT_LT_KEY,
                ),
                function_ir_instruction_count_gt: int_field(
                    rule_table,
                    FUNCTION_IR_INSTRUCTION_COUNT_GT_KEY,
                ),
            });
        }
    }

    Ok(Filters::new(filters))
}

fn string_field(table: &toml::map::Map<String, Value>, key: &str) -> Option<String> {
    table.get(key).and_then(Value::as_str).map(str::to_string)
}

fn int_field(table: &toml::map::Map<String, Value>, key: &str) -> Option<i32> {
    table.get(key).and_then(Value::as_integer).map(|v| v as i32)
}
