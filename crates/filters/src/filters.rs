use crate::filter::{Action, Filter, FunctionInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluateResult {
    pub instrument: bool,
    pub matching_rule_name: Option<String>,
}

/// An ordered set of [`Filter`] rules with disjunctive semantics across rules
/// of the same action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    filters: Vec<Filter>,
}

impl Filters {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// `instrument = !block || allow`, where `block`/`allow` are whether any
    /// rule of that action matches `function_info`. `matching_rule_name` is
    /// the first matching allow rule's name if one matched, else the first
    /// matching block rule's name, else `None`.
    pub fn evaluate(&self, function_info: &FunctionInfo) -> EvaluateResult {
        let blocking_rule = self
            .filters
            .iter()
            .find(|f| f.action == Action::Block && f.matches(function_info));
        let allowing_rule = self
            .filters
            .iter()
            .find(|f| f.action == Action::Allow && f.matches(function_info));

        let block = blocking_rule.is_some();
        let allow = allowing_rule.is_some();
        let matching_rule_name = allowing_rule
            .or(blocking_rule)
            .and_then(|f| f.rule_name.clone());

        EvaluateResult {
            instrument: !block || allow,
            matching_rule_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    fn info_with_name(demangled_name: &str) -> FunctionInfo {
        FunctionInfo {
            source_file_path: String::new(),
            demangled_name: demangled_name.to_string(),
            linkage_name: String::new(),
            ir_instruction_count: 0,
        }
    }

    #[test]
    fn block_all_allow_std() {
        let filters = Filters::new(vec![
            Filter {
                rule_name: Some("Block all".to_string()),
                ..Filter::empty(Action::Block)
            },
            Filter {
                rule_name: Some("Allow std".to_string()),
                function_demangled_name: Some(r"^std::.*".to_string()),
                ..Filter::empty(Action::Allow)
            },
        ]);

        let result = filters.evaluate(&info_with_name("std::sort"));
        assert!(result.instrument);
        assert_eq!(result.matching_rule_name, Some("Allow std".to_string()));

        let result = filters.evaluate(&info_with_name("foo"));
        assert!(!result.instrument);
        assert_eq!(result.matching_rule_name, Some("Block all".to_string()));
    }

    #[test]
    fn block_all_with_all_absent_predicates_blocks_everything() {
        let filters = Filters::new(vec![Filter::empty(Action::Block)]);
        assert!(!filters.evaluate(&info_with_name("anything")).instrument);
        assert!(!filters.evaluate(&info_with_name("")).instrument);
    }

    #[test]
    fn no_rules_instruments_everything() {
        let filters = Filters::new(vec![]);
        assert!(filters.evaluate(&info_with_name("anything")).instrument);
        assert_eq!(filters.evaluate(&info_with_name("anything")).matching_rule_name, None);
    }

    #[test]
    fn evaluate_is_pure() {
        let filters = Filters::new(vec![Filter::empty(Action::Block)]);
        let info = info_with_name("foo");
        assert_eq!(filters.evaluate(&info), filters.evaluate(&info));
    }
}
