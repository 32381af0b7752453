//! Error code registry
//!
//! Every evaluation phase owns one `CT_ERR_*` code with a fixed explanation.
//! Rendered errors link the code to its documentation anchor.

use std::fmt;

use once_cell::sync::Lazy;

/// Documentation page that has one anchor per code
pub const ERRORS_URL: &str = "https://comptime.js.org/errors";

/// Phase of a target's evaluation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Building the dependency slice or resolving its imports
    GetEvaluation,
    /// Parsing the assembled program
    SyntaxCheck,
    /// Type erasure
    EraseTypes,
    /// Parsing the erased program into the sandbox function
    CreateFunction,
    /// Running the sandbox function
    Evaluate,
    /// `comptime()` called outside an evaluation
    NoComptime,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::GetEvaluation,
        Phase::SyntaxCheck,
        Phase::EraseTypes,
        Phase::CreateFunction,
        Phase::Evaluate,
        Phase::NoComptime,
    ];

    /// Registered definition of this phase's code
    pub fn definition(self) -> &'static ErrorCodeDefinition {
        // the registry is built from `Phase::ALL`, so every phase has an entry
        &ERROR_CODES[self as usize]
    }

    #[inline]
    pub fn code(self) -> &'static str {
        self.definition().code
    }

    #[inline]
    pub fn explanation(self) -> &'static str {
        self.definition().message
    }
}

impl fmt::Display for Phase {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Phase::GetEvaluation => "get-evaluation",
            Phase::SyntaxCheck => "syntax-check",
            Phase::EraseTypes => "erase-types",
            Phase::CreateFunction => "create-function",
            Phase::Evaluate => "evaluate",
            Phase::NoComptime => "no-comptime",
        };
        f.write_str(name)
    }
}

/// Error code definition
#[derive(Debug, Clone, Copy)]
pub struct ErrorCodeDefinition {
    /// Code, e.g. "CT_ERR_EVALUATE"
    pub code: &'static str,
    pub phase: Phase,
    /// Fixed explanation shown in the inner box
    pub message: &'static str,
}

impl ErrorCodeDefinition {
    /// Look a definition up by its code
    pub fn find(code: &str) -> Option<&'static Self> {
        ERROR_CODES.iter().find(|c| c.code == code)
    }

    /// All registered codes, in phase order
    pub fn all() -> &'static [Self] {
        &ERROR_CODES
    }

    /// Documentation link of this code
    pub fn url(&self) -> String {
        format!("{}#{}", ERRORS_URL, self.code.to_lowercase())
    }
}

static ERROR_CODES: Lazy<Vec<ErrorCodeDefinition>> = Lazy::new(|| {
    Phase::ALL
        .iter()
        .map(|&phase| {
            let (code, message) = match phase {
                Phase::GetEvaluation => (
                    "CT_ERR_GET_EVALUATION",
                    "An error occurred while attempting to construct the comptime evaluation block.",
                ),
                Phase::SyntaxCheck => ("CT_ERR_SYNTAX_CHECK", "Syntax error in comptime evaluation block."),
                Phase::EraseTypes => ("CT_ERR_ERASE_TYPES", "Error occurred while erasing types."),
                Phase::CreateFunction => ("CT_ERR_CREATE_FUNCTION", "Error occurred while creating a new Function."),
                Phase::Evaluate => ("CT_ERR_EVALUATE", "Error occurred while evaluating the expression."),
                Phase::NoComptime => (
                    "CT_ERR_NO_COMPTIME",
                    "comptime() must be called in a comptime context, but was called at runtime.\n\n\
                     Are you missing `with { type: \"comptime\" }` or a compile-step?\n",
                ),
            };
            ErrorCodeDefinition { code, phase, message }
        })
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_follows_phase_order() {
        for phase in Phase::ALL {
            assert_eq!(phase.definition().phase, phase);
        }
        assert_eq!(ErrorCodeDefinition::all().len(), Phase::ALL.len());
    }

    #[test]
    fn test_find_and_url() {
        let def = ErrorCodeDefinition::find("CT_ERR_ERASE_TYPES").unwrap();
        assert_eq!(def.phase, Phase::EraseTypes);
        assert_eq!(def.url(), "https://comptime.js.org/errors#ct_err_erase_types");
        assert!(ErrorCodeDefinition::find("CT_ERR_NOPE").is_none());
    }
}
