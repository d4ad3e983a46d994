//! The collaborator seam for the module representation the rewriter walks
//! and mutates. The real toolchain plugs in an IR library's module/function
//! handles; [`mock`] stands in for it here and in `spoor-cli`'s
//! `instrument` subcommand, which has no compiler frontend to drive.

/// Debug metadata attached to a function, when the module carries it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DebugInfo {
    pub file_name: String,
    pub directory: String,
    pub line: i32,
}

/// One well-known runtime call the rewriter can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Initialize,
    Deinitialize,
    Enable,
    LogFunctionEntry(u64),
    LogFunctionExit(u64),
}

/// A single function within a [`Module`].
pub trait Function {
    fn linkage_name(&self) -> &str;
    fn instruction_count(&self) -> i32;
    fn is_declaration(&self) -> bool;
    fn debug_info(&self) -> Option<&DebugInfo>;

    /// The number of return instructions in the function body. The
    /// rewriter injects exit probes before every one of them.
    fn return_instruction_count(&self) -> usize;

    /// Insert `probes`, in order, at the entry block's first insertion
    /// point.
    fn insert_at_entry(&mut self, probes: &[Probe]);

    /// Insert `probes`, in order, immediately before every return
    /// instruction.
    fn insert_before_each_return(&mut self, probes: &[Probe]);
}

/// A compiled unit the rewriter walks in function-declaration order.
pub trait Module {
    fn module_id(&self) -> &str;
    fn function_count(&self) -> usize;
    fn function_at(&mut self, index: usize) -> &mut dyn Function;
}

pub mod mock {
    use super::{DebugInfo, Function, Module, Probe};

    /// A function in a [`MockModule`]. Built by [`MockModule::push_function`];
    /// after a rewrite, `entry_probes`/`exit_probes` record what was
    /// injected for test assertions.
    #[derive(Debug, Clone, Default)]
    pub struct MockFunction {
        linkage_name: String,
        instruction_count: i32,
        is_declaration: bool,
        debug_info: Option<DebugInfo>,
        return_instruction_count: usize,
        entry_probes: Vec<Probe>,
        exit_probes: Vec<Vec<Probe>>,
    }

    impl MockFunction {
        pub fn new(linkage_name: impl Into<String>, instruction_count: i32) -> Self {
            Self {
                linkage_name: linkage_name.into(),
                instruction_count,
                is_declaration: false,
                debug_info: None,
                return_instruction_count: 1,
                entry_probes: Vec::new(),
                exit_probes: Vec::new(),
            }
        }

        pub fn declaration(mut self) -> Self {
            self.is_declaration = true;
            self
        }

        pub fn with_debug_info(mut self, debug_info: DebugInfo) -> Self {
            self.debug_info = Some(debug_info);
            self
        }

        pub fn with_return_instruction_count(mut self, count: usize) -> Self {
            self.return_instruction_count = count;
            self
        }

        pub fn entry_probes(&self) -> &[Probe] {
            &self.entry_probes
        }

        pub fn exit_probes(&self) -> &[Vec<Probe>] {
            &self.exit_probes
        }
    }

    impl Function for MockFunction {
        fn linkage_name(&self) -> &str {
            &self.linkage_name
        }

        fn instruction_count(&self) -> i32 {
            self.instruction_count
        }

        fn is_declaration(&self) -> bool {
            self.is_declaration
        }

        fn debug_info(&self) -> Option<&DebugInfo> {
            self.debug_info.as_ref()
        }

        fn return_instruction_count(&self) -> usize {
            self.return_instruction_count
        }

        fn insert_at_entry(&mut self, probes: &[Probe]) {
            self.entry_probes.extend_from_slice(probes);
        }

        fn insert_before_each_return(&mut self, probes: &[Probe]) {
            for _ in 0..self.return_instruction_count {
                self.exit_probes.push(probes.to_vec());
            }
        }
    }

    /// A module made of explicitly constructed functions, in the order
    /// they were pushed.
    #[derive(Debug, Clone, Default)]
    pub struct MockModule {
        module_id: String,
        functions: Vec<MockFunction>,
    }

    impl MockModule {
        pub fn new(module_id: impl Into<String>) -> Self {
            Self { module_id: module_id.into(), functions: Vec::new() }
        }

        pub fn push_function(&mut self, function: MockFunction) -> &mut Self {
            self.functions.push(function);
            self
        }

        pub fn functions(&self) -> &[MockFunction] {
            &self.functions
        }
    }

    impl Module for MockModule {
        fn module_id(&self) -> &str {
            &self.module_id
        }

        fn function_count(&self) -> usize {
            self.functions.len()
        }

        fn function_at(&mut self, index: usize) -> &mut dyn Function {
            &mut self.functions[index]
        }
    }
}
