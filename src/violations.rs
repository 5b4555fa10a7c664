//! Violation records, rule catalogue and message templates.
//!
//! Every finding carries a rule code, ordered message arguments, a line
//! number and a status flag. `status == false` is a defect; `status ==
//! true` is an explicit "checked and correct" observation. Both are
//! recorded so downstream consumers can render "no issues found"
//! positively rather than by absence.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Analysis categories, in their fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Basic,
    Function,
    FileHandling,
    DataStructure,
    Library,
    ExceptionHandling,
    /// Synthetic: the file could not be parsed.
    FileError,
    /// Synthetic: the analyser itself failed on the file.
    AnalysisError,
}

/// The six selectable categories in execution order.
pub const CATEGORY_ORDER: &[Category] = &[
    Category::Basic,
    Category::Function,
    Category::FileHandling,
    Category::DataStructure,
    Category::Library,
    Category::ExceptionHandling,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Basic => "basic",
            Category::Function => "function",
            Category::FileHandling => "file_handling",
            Category::DataStructure => "data_structure",
            Category::Library => "library",
            Category::ExceptionHandling => "exception_handling",
            Category::FileError => "file_error",
            Category::AnalysisError => "analysis_error",
        }
    }

    /// Human-readable heading used by the pretty report.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Basic => "Basic commands",
            Category::Function => "Functions",
            Category::FileHandling => "File handling",
            Category::DataStructure => "Data structures",
            Category::Library => "Library usage",
            Category::ExceptionHandling => "Exception handling",
            Category::FileError => "File error",
            Category::AnalysisError => "Analysis error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(Category::Basic),
            "function" => Some(Category::Function),
            "file_handling" => Some(Category::FileHandling),
            "data_structure" => Some(Category::DataStructure),
            "library" => Some(Category::Library),
            "exception_handling" => Some(Category::ExceptionHandling),
            "file_error" => Some(Category::FileError),
            "analysis_error" => Some(Category::AnalysisError),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rule codes for every check the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    #[serde(rename = "syntax_error")]
    SyntaxError,
    #[serde(rename = "tool_error")]
    ToolError,
    #[serde(rename = "PT1")]
    DiscouragedCommand,
    #[serde(rename = "PT2")]
    InvalidName,
    #[serde(rename = "PT4-1")]
    InfiniteLoop,
    #[serde(rename = "PT5")]
    UnreachableCode,
    #[serde(rename = "AR1")]
    MissingEntryPoint,
    #[serde(rename = "AR2-1")]
    NestedFunction,
    #[serde(rename = "AR3")]
    GlobalVariable,
    #[serde(rename = "AR3-1")]
    ShadowedConstant,
    #[serde(rename = "AR4")]
    RecursiveCall,
    #[serde(rename = "AR5-1")]
    TooFewArguments,
    #[serde(rename = "AR5-2")]
    TooManyArguments,
    #[serde(rename = "AR5-3")]
    InvalidKeywordArgument,
    #[serde(rename = "AR6")]
    MissingReturn,
    #[serde(rename = "AR6-1")]
    YieldUsed,
    #[serde(rename = "AR6-2")]
    MidFunctionReturn,
    #[serde(rename = "AR6-3")]
    ReturnWithoutValue,
    #[serde(rename = "AR6-4")]
    ReturnConstant,
    #[serde(rename = "AR6-5")]
    ReturnMultipleValues,
    #[serde(rename = "AR6-6")]
    ReturnExpression,
    #[serde(rename = "AR7")]
    FunctionAttribute,
    #[serde(rename = "MR1")]
    ElementOrder,
    #[serde(rename = "MR2-3")]
    ExtraEntryCall,
    #[serde(rename = "MR2-4")]
    AttributeEntryCall,
    #[serde(rename = "MR3")]
    DuplicateImport,
    #[serde(rename = "MR3-1")]
    DuplicateFromImport,
    #[serde(rename = "MR4")]
    LocalImport,
    #[serde(rename = "MR5")]
    MissingHeaderComments,
    #[serde(rename = "TK1")]
    FileLeftOpen,
    #[serde(rename = "TK1-1")]
    WithOpenUsed,
    #[serde(rename = "TK1-2")]
    CloseInExcept,
    #[serde(rename = "TK1-3")]
    CloseWithoutCall,
    #[serde(rename = "TK2")]
    FileOperationElsewhere,
    #[serde(rename = "TR2-1")]
    ClassUsedDirectly,
    #[serde(rename = "TR2-2")]
    MissingObjectParens,
    #[serde(rename = "TR2-3")]
    NestedClass,
    #[serde(rename = "TR2-4")]
    ClassNameNotUppercase,
    #[serde(rename = "PK1")]
    TryWithoutExcept,
    #[serde(rename = "PK1-1")]
    ExceptWithoutType,
    #[serde(rename = "PK3")]
    OpenWithoutTry,
    #[serde(rename = "PK4")]
    FileOperationWithoutTry,
    #[serde(rename = "PK4-1")]
    FileIterationWithoutTry,
    #[serde(rename = "PK5")]
    CloseWithoutTry,
}

/// English message templates; `{}` placeholders fill from the violation
/// arguments in order.
static MESSAGES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "syntax_error" => "File has a syntax error.",
    "tool_error" => "Analysis failure while checking the file '{}'.",
    "PT1" => "Command '{}' is used.",
    "PT2" => "Name '{}' contains other than A-Z, 0-9 and underscore characters.",
    "PT4-1" => "Loop never breaks.",
    "PT5" => "Unreachable code after command '{}'.",
    "AR1" => "No function definition for '{}'.",
    "AR2-1" => "Definition of the function '{}' is not at the global scope.",
    "AR3" => "Global variable '{}'.",
    "AR3-1" => "Local variable '{}' shadows a module-level constant.",
    "AR4" => "Recursive function call.",
    "AR5-1" => "Function '{}' requires at least {} parameters, but {} given.",
    "AR5-2" => "Function '{}' requires at most {} parameters, but {} given.",
    "AR5-3" => "In call of function '{}', '{}' is an invalid keyword argument.",
    "AR6" => "Missing return at the end of the function '{}'.",
    "AR6-1" => "Usage of '{}' in function '{}'.",
    "AR6-2" => "Return statement in the middle of the function.",
    "AR6-3" => "Missing value from the return statement.",
    "AR6-4" => "Return value is a constant.",
    "AR6-5" => "Returning multiple values at once.",
    "AR6-6" => "Returning something else than a variable or constant.",
    "AR7" => "Assigning an attribute to the function '{}'.",
    "MR1" => "Statement seems to be in the wrong location.",
    "MR2-3" => "Function call '{}()' is the {}. function call in the global scope. There should be only one.",
    "MR2-4" => "Function call '{}.{}()' in the global scope does not call the main function.",
    "MR3" => "Module '{}' is imported again.",
    "MR3-1" => "From module '{}' something is imported again.",
    "MR4" => "Import of the module '{}' is not at the global scope.",
    "MR5" => "Missing some or all header comments in the {} first lines of the file.",
    "TK1" => "File handle '{}' is left open.",
    "TK1-1" => "Usage of '{}' is not recommended on this course.",
    "TK1-2" => "File handle '{}' is closed in an except branch.",
    "TK1-3" => "Missing parentheses from the file closing '{}.{}'.",
    "TK2" => "File operation '{}.{}' is in a different function than the open and close.",
    "TR2-1" => "Class is used directly without an object: '{}'.",
    "TR2-2" => "Missing parentheses from object creation. Should be '{}()'.",
    "TR2-3" => "Class '{}' is not defined in the global scope.",
    "TR2-4" => "Name of the class '{}' is not in UPPERCASE.",
    "PK1" => "Error handling has no except branches.",
    "PK1-1" => "Missing exception type.",
    "PK3" => "Missing exception handling from the file opening.",
    "PK4" => "Missing exception handling from the file operation '{}'.",
    "PK4-1" => "Missing exception handling from the file-reading loop '{}'.",
    "PK5" => "Missing exception handling from the file closing '{}'.",
};

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::SyntaxError => "syntax_error",
            Rule::ToolError => "tool_error",
            Rule::DiscouragedCommand => "PT1",
            Rule::InvalidName => "PT2",
            Rule::InfiniteLoop => "PT4-1",
            Rule::UnreachableCode => "PT5",
            Rule::MissingEntryPoint => "AR1",
            Rule::NestedFunction => "AR2-1",
            Rule::GlobalVariable => "AR3",
            Rule::ShadowedConstant => "AR3-1",
            Rule::RecursiveCall => "AR4",
            Rule::TooFewArguments => "AR5-1",
            Rule::TooManyArguments => "AR5-2",
            Rule::InvalidKeywordArgument => "AR5-3",
            Rule::MissingReturn => "AR6",
            Rule::YieldUsed => "AR6-1",
            Rule::MidFunctionReturn => "AR6-2",
            Rule::ReturnWithoutValue => "AR6-3",
            Rule::ReturnConstant => "AR6-4",
            Rule::ReturnMultipleValues => "AR6-5",
            Rule::ReturnExpression => "AR6-6",
            Rule::FunctionAttribute => "AR7",
            Rule::ElementOrder => "MR1",
            Rule::ExtraEntryCall => "MR2-3",
            Rule::AttributeEntryCall => "MR2-4",
            Rule::DuplicateImport => "MR3",
            Rule::DuplicateFromImport => "MR3-1",
            Rule::LocalImport => "MR4",
            Rule::MissingHeaderComments => "MR5",
            Rule::FileLeftOpen => "TK1",
            Rule::WithOpenUsed => "TK1-1",
            Rule::CloseInExcept => "TK1-2",
            Rule::CloseWithoutCall => "TK1-3",
            Rule::FileOperationElsewhere => "TK2",
            Rule::ClassUsedDirectly => "TR2-1",
            Rule::MissingObjectParens => "TR2-2",
            Rule::NestedClass => "TR2-3",
            Rule::ClassNameNotUppercase => "TR2-4",
            Rule::TryWithoutExcept => "PK1",
            Rule::ExceptWithoutType => "PK1-1",
            Rule::OpenWithoutTry => "PK3",
            Rule::FileOperationWithoutTry => "PK4",
            Rule::FileIterationWithoutTry => "PK4-1",
            Rule::CloseWithoutTry => "PK5",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Rule::SyntaxError
            | Rule::ToolError
            | Rule::InfiniteLoop
            | Rule::UnreachableCode
            | Rule::NestedFunction
            | Rule::GlobalVariable
            | Rule::TooFewArguments
            | Rule::TooManyArguments
            | Rule::InvalidKeywordArgument
            | Rule::MissingReturn
            | Rule::DuplicateImport
            | Rule::LocalImport
            | Rule::FileLeftOpen
            | Rule::CloseWithoutCall
            | Rule::FileOperationElsewhere
            | Rule::ClassUsedDirectly
            | Rule::MissingObjectParens
            | Rule::NestedClass
            | Rule::OpenWithoutTry
            | Rule::FileOperationWithoutTry
            | Rule::FileIterationWithoutTry
            | Rule::CloseWithoutTry => Severity::Error,
            Rule::InvalidName
            | Rule::ShadowedConstant
            | Rule::ReturnWithoutValue
            | Rule::FunctionAttribute
            | Rule::ElementOrder
            | Rule::ExtraEntryCall
            | Rule::AttributeEntryCall
            | Rule::DuplicateFromImport
            | Rule::MissingHeaderComments
            | Rule::CloseInExcept
            | Rule::ExceptWithoutType => Severity::Warning,
            Rule::DiscouragedCommand
            | Rule::MissingEntryPoint
            | Rule::RecursiveCall
            | Rule::YieldUsed
            | Rule::MidFunctionReturn
            | Rule::ReturnConstant
            | Rule::ReturnMultipleValues
            | Rule::ReturnExpression
            | Rule::WithOpenUsed
            | Rule::ClassNameNotUppercase
            | Rule::TryWithoutExcept => Severity::Info,
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recorded finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: Rule,
    pub args: Vec<String>,
    pub line: usize,
    /// `false` = defect, `true` = checked and correct.
    pub status: bool,
}

impl Violation {
    /// Render the message by filling the rule's template with the
    /// arguments in order. Extra arguments are dropped; missing ones leave
    /// the placeholder empty.
    pub fn message(&self) -> String {
        let template = MESSAGES.get(self.rule.as_str()).copied().unwrap_or("");
        let mut out = String::with_capacity(template.len());
        let mut args = self.args.iter();
        let mut rest = template;
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            if let Some(arg) = args.next() {
                out.push_str(arg);
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }

    pub fn severity(&self) -> Severity {
        self.rule.severity()
    }
}

/// Per-file results grouped by category, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileResults {
    pub path: String,
    pub categories: Vec<(Category, Vec<Violation>)>,
}

impl FileResults {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            categories: Vec::new(),
        }
    }

    /// Count of defect findings across all categories.
    pub fn defect_count(&self) -> usize {
        self.categories
            .iter()
            .map(|(_, violations)| violations.iter().filter(|v| !v.status).count())
            .sum()
    }
}

/// The active violation buffer shared by the checkers of one file run.
#[derive(Debug, Default)]
pub struct Sink {
    buffer: Vec<Violation>,
    ignored: HashSet<String>,
}

impl Sink {
    pub fn new(ignored: &[String]) -> Self {
        Self {
            buffer: Vec::new(),
            ignored: ignored.iter().cloned().collect(),
        }
    }

    /// Append a finding to the active buffer unless its code is ignored.
    pub fn report(&mut self, rule: Rule, args: &[String], line: usize, status: bool) {
        if self.ignored.contains(rule.as_str()) {
            return;
        }
        self.buffer.push(Violation {
            rule,
            args: args.to_vec(),
            line,
            status,
        });
    }

    /// Shorthand for a defect with no arguments.
    pub fn defect(&mut self, rule: Rule, line: usize) {
        self.report(rule, &[], line, false);
    }

    /// Drain the buffer, ending the current category.
    pub fn drain(&mut self) -> Vec<Violation> {
        std::mem::take(&mut self.buffer)
    }

    pub fn discard(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_templating() {
        let violation = Violation {
            rule: Rule::FileLeftOpen,
            args: vec!["fh".to_string()],
            line: 7,
            status: false,
        };
        assert_eq!(violation.message(), "File handle 'fh' is left open.");
    }

    #[test]
    fn test_message_with_multiple_args() {
        let violation = Violation {
            rule: Rule::TooFewArguments,
            args: vec!["load".to_string(), "2".to_string(), "1".to_string()],
            line: 3,
            status: false,
        };
        assert_eq!(
            violation.message(),
            "Function 'load' requires at least 2 parameters, but 1 given."
        );
    }

    #[test]
    fn test_sink_filters_ignored_codes() {
        let mut sink = Sink::new(&["PT1".to_string()]);
        sink.report(Rule::DiscouragedCommand, &["eval".to_string()], 1, false);
        sink.report(Rule::GlobalVariable, &["x".to_string()], 2, false);
        let drained = sink.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].rule, Rule::GlobalVariable);
    }

    #[test]
    fn test_rule_codes_round_trip_serde() {
        let json = serde_json::to_string(&Rule::InfiniteLoop).unwrap();
        assert_eq!(json, "\"PT4-1\"");
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rule::InfiniteLoop);
    }
}
