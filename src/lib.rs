//! ConfXP - translator for a Scheme-flavored configuration language
//!
//! This crate reads a small configuration language made of integer constant
//! definitions and brace-delimited dictionary blocks, evaluates it into an ordered
//! value tree, and renders that tree as TOML (or JSON).
//!
//! ## Language
//!
//! ```text
//! #|
//!   Block comments span lines
//! |#
//! (define WIDTH 80);            % single-line comment
//! (define HEIGHT ^(WIDTH) / 2);
//! { screen : { width : ^(WIDTH); height : ^(HEIGHT); }; area : ^(WIDTH) * ^(HEIGHT); }
//! ```
//!
//! translates to
//!
//! ```toml
//! area = 3200
//!
//! [screen]
//! width = 80
//! height = 40
//! ```
//!
//! ## Strict semantics
//!
//! - Values are 64-bit integers or nested documents, nothing else
//! - `^(NAME)` must refer to a constant defined on an earlier line
//! - Arithmetic is limited to `+ - * /` and parentheses, with overflow detection
//! - Every error aborts the translation and names the offending line
//!
//! Behaviors where reasonable implementations disagree (duplicate keys, constant
//! redefinition, unknown lines, unterminated block comments) are selected through
//! [`ParseConfig`].
//!
//! ## Modules
//!
//! - `ast`: the [`ast::Value`] / [`ast::Document`] tree
//! - `comments`: comment stripping and line normalization
//! - `constants`: the constant table and `define` statements
//! - `expression`: interpolation and sandboxed integer arithmetic
//! - `dictionary`: brace-block parsing
//! - `translator`: the driver that assembles a whole source into one document
//! - `render`: TOML and JSON output

/// Maximum nesting of parentheses and unary signs in an arithmetic expression
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum nesting of dictionary blocks inside one another
pub const MAX_NESTING_DEPTH: usize = 128;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The text does not have the shape the grammar requires
    Syntax,
    /// The text is well-formed but cannot be evaluated to a value
    Value,
    /// The source could not be read
    Io,
    /// The serializer rejected the document
    Render,
}

/// Error type for every stage of a translation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The text does not match the grammar (definition, block, item or top-level line)
    #[error("SyntaxError: {message}\nContext: {context}")]
    Syntax { message: String, context: String },

    /// An interpolation marker names a constant that is not defined yet
    #[error("ValueError: undefined constant '{name}'\nContext: {context}")]
    UndefinedConstant { name: String, context: String },

    /// An expression that cannot be evaluated to an integer: bad arithmetic,
    /// overflow, division by zero, or a block where an integer is required
    #[error("ValueError: {message}\nContext: {context}")]
    InvalidExpression { message: String, context: String },

    /// Opening or reading the source failed
    #[error("IOError: {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    /// The TOML or JSON serializer rejected the document
    #[error("RenderError: {0}")]
    Render(String),

    /// Any of the above, raised while handling a given source line (1-based)
    #[error("line {line}: {error}")]
    AtLine { line: usize, error: Box<Error> },
}

impl Error {
    pub fn syntax(message: impl Into<String>, context: impl Into<String>) -> Self {
        Error::Syntax {
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn undefined_constant(name: impl Into<String>, context: impl Into<String>) -> Self {
        Error::UndefinedConstant {
            name: name.into(),
            context: context.into(),
        }
    }

    pub fn invalid_expression(message: impl Into<String>, context: impl Into<String>) -> Self {
        Error::InvalidExpression {
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// Attach a source line number. An error that already carries one keeps it.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            located @ Error::AtLine { .. } => located,
            other => Error::AtLine {
                line,
                error: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax { .. } => ErrorKind::Syntax,
            Error::UndefinedConstant { .. } | Error::InvalidExpression { .. } => ErrorKind::Value,
            Error::Io { .. } => ErrorKind::Io,
            Error::Render(_) => ErrorKind::Render,
            Error::AtLine { error, .. } => error.kind(),
        }
    }

    /// Source line the error was raised on, if the driver recorded one
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// What to do when a key or constant name is bound a second time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
    /// The later binding replaces the earlier one
    #[default]
    Overwrite,
    /// The second binding is a syntax error
    Reject,
}

/// What to do when a block comment is still open at end of input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnterminatedComment {
    /// The comment silently swallows the rest of the file
    #[default]
    DropRemainder,
    /// Report a syntax error pointing at the opening line
    Reject,
}

/// What to do with a top-level line that is neither a definition nor a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownLines {
    #[default]
    Reject,
    /// Skip the line, logging a warning
    Ignore,
}

/// Settings shared by every stage of a translation.
///
/// The default is compatible with existing configuration files, except that
/// unrecognized top-level lines are rejected rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConfig {
    pub line_comment: String,
    pub block_comment_open: String,
    pub block_comment_close: String,
    pub unterminated_comment: UnterminatedComment,
    pub duplicate_keys: OnConflict,
    pub redefinition: OnConflict,
    pub unknown_lines: UnknownLines,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            line_comment: "%".into(),
            block_comment_open: "#|".into(),
            block_comment_close: "|#".into(),
            unterminated_comment: UnterminatedComment::default(),
            duplicate_keys: OnConflict::default(),
            redefinition: OnConflict::default(),
            unknown_lines: UnknownLines::default(),
        }
    }
}

impl ParseConfig {
    /// Every ambiguous construct becomes an error
    pub fn strict() -> Self {
        ParseConfig {
            unterminated_comment: UnterminatedComment::Reject,
            duplicate_keys: OnConflict::Reject,
            redefinition: OnConflict::Reject,
            unknown_lines: UnknownLines::Reject,
            ..ParseConfig::default()
        }
    }
}

pub mod ast;
pub mod comments;
pub mod constants;
pub mod dictionary;
pub mod expression;
pub mod render;
pub mod translator;

/// Translate a complete source text into a document in one call.
pub fn translate(source: &str, config: &ParseConfig) -> Result<ast::Document, Error> {
    translator::Translator::with_config(config.clone()).parse_str(source)
}
