//! Error taxonomy for the specializer library.
//!
//! Malformed query shapes are never errors; they are left for runtime.
//! Only caller mistakes surface here: bad combination input, broken trees,
//! and scripts the front end cannot parse.

use miette::{Diagnostic, SourceSpan};

/// Library result alias.
pub type Result<T, E = SpecializeError> = std::result::Result<T, E>;

/// Failures reported by the permutation subsystem and its collaborators.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum SpecializeError
{
    /// Combination input that is not a mapping of flag names to scalars.
    #[error("invalid combination: {0}")]
    #[diagnostic(
        code(specializer::configuration),
        help("a combination maps flag names to booleans, null, numbers or strings")
    )]
    Configuration(String),

    /// Tree links are inconsistent or a replacement has nowhere to go.
    #[error("malformed syntax tree: {0}")]
    #[diagnostic(code(specializer::structural))]
    Structural(String),

    /// The tree-sitter grammar could not be loaded.
    #[error("failed to initialize script parser: {0}")]
    #[diagnostic(code(specializer::parser))]
    Parser(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(Box<SyntaxError>),
}

impl From<SyntaxError> for SpecializeError
{
    fn from(err: SyntaxError) -> Self
    {
        SpecializeError::Syntax(Box::new(err))
    }
}

/// Source text rejected by the script front end.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("syntax error in {name} at {line}:{column}: {reason}")]
#[diagnostic(code(specializer::syntax))]
pub struct SyntaxError
{
    /// Display name of the source (file path or `<expression>`)
    pub name: String,

    /// 1-based line of the first error
    pub line: usize,

    /// 1-based column of the first error
    pub column: usize,

    /// Short description of what went wrong
    pub reason: String,

    #[source_code]
    pub src: String,

    #[label("here")]
    pub span: SourceSpan,
}
