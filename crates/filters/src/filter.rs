use regex::Regex;

/// The subset of a function's identity a [`Filter`] can match against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub source_file_path: String,
    pub demangled_name: String,
    pub linkage_name: String,
    pub ir_instruction_count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,
    Block,
}

/// One allow/block rule. Every present predicate must hold for the rule to
/// match (conjunction); absent predicates do not constrain the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub action: Action,
    pub rule_name: Option<String>,
    pub source_file_path: Option<String>,
    pub function_demangled_name: Option<String>,
    pub function_linkage_name: Option<String>,
    pub function_ir_instruction_count_lt: Option<i32>,
    pub function_ir_instruction_count_gt: Option<i32>,
}

impl Filter {
    /// A rule with no predicates set; matches everything.
    pub fn empty(action: Action) -> Self {
        Self {
            action,
            rule_name: None,
            source_file_path: None,
            function_demangled_name: None,
            function_linkage_name: None,
            function_ir_instruction_count_lt: None,
            function_ir_instruction_count_gt: None,
        }
    }

    pub fn matches(&self, function_info: &FunctionInfo) -> bool {
        if let Some(pattern) = &self.source_file_path {
            if !full_match(pattern, &function_info.source_file_path) {
                return false;
            }
        }
        if let Some(pattern) = &self.function_demangled_name {
            if !full_match(pattern, &function_info.demangled_name) {
                return false;
            }
        }
        if let Some(pattern) = &self.function_linkage_name {
            if !full_match(pattern, &function_info.linkage_name) {
                return false;
            }
        }
        if let Some(lt) = self.function_ir_instruction_count_lt {
            if !(function_info.ir_instruction_count < lt) {
                return false;
            }
        }
        if let Some(gt) = self.function_ir_instruction_count_gt {
            if !(gt < function_info.ir_instruction_count) {
                return false;
            }
        }
        true
    }
}

/// Compile `pattern` as a regular expression and test it as a full match
/// against `haystack`, regardless of whether `pattern` itself carries `^`/`$`
/// anchors.
fn full_match(pattern: &str, haystack: &str) -> bool {
    let anchored = format!("^(?:{pattern})$");
    match Regex::new(&anchored) {
        Ok(regex) => regex.is_match(haystack),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_info() -> FunctionInfo {
        FunctionInfo {
            source_file_path: "src/main.rs".to_string(),
            demangled_name: "foo::bar".to_string(),
            linkage_name: "_ZN3foo3barE".to_string(),
            ir_instruction_count: 42,
        }
    }

    #[test]
    fn empty_rule_matches_everything() {
        let rule = Filter::empty(Action::Block);
        assert!(rule.matches(&function_info()));
    }

    #[test]
    fn full_match_requires_whole_string() {
        let mut rule = Filter::empty(Action::Allow);
        rule.function_demangled_name = Some("foo".to_string());
        assert!(!rule.matches(&function_info()));
        rule.function_demangled_name = Some("foo::bar".to_string());
        assert!(rule.matches(&function_info()));
    }

    #[test]
    fn instruction_count_boundaries_are_strict() {
        let mut rule = Filter::empty(Action::Block);
        rule.function_ir_instruction_count_lt = Some(100);
        let mut info = function_info();
        for (count, expect_match) in [(99, true), (100, false), (101, false)] {
            info.ir_instruction_count = count;
            assert_eq!(rule.matches(&info), expect_match, "count={count}");
        }
    }
}
