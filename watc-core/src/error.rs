use core::fmt;

use thiserror::Error;

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
    Resolve,
    Codegen,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Resolve => "resolve",
            Stage::Codegen => "codegen",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("lex error at byte {position}: unexpected character {character:?}")]
    Lex { character: char, position: usize },
    #[error("lex error at byte {position}: unterminated block comment")]
    UnterminatedComment { position: usize },
    #[error("lex error at byte {position}: integer literal {literal} does not fit in i32")]
    IntegerOutOfRange { literal: String, position: usize },
    #[error("parse error at byte {position}: expected {expected}, found {found}")]
    Parse {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("parse error at byte {position}: expression nested deeper than {limit} levels")]
    ExpressionTooDeep { limit: usize, position: usize },
    #[error("undefined identifier `{name}` at byte {position}")]
    UndefinedIdentifier { name: String, position: usize },
    #[error("function `{function}` does not return a value (at byte {position})")]
    MissingReturn { function: String, position: usize },
    #[error("function `{name}` is defined more than once (at byte {position})")]
    DuplicateFunction { name: String, position: usize },
    #[error("`{name}` is bound more than once in the same scope (at byte {position})")]
    DuplicateBinding { name: String, position: usize },
    #[error("unknown type `{name}` at byte {position}")]
    UnknownType { name: String, position: usize },
    #[error("type mismatch at byte {position}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("codegen error: {message}")]
    Codegen { message: String },
}

impl CoreError {
    pub fn stage(&self) -> Stage {
        match self {
            CoreError::Lex { .. }
            | CoreError::UnterminatedComment { .. }
            | CoreError::IntegerOutOfRange { .. } => Stage::Lex,
            CoreError::Parse { .. } | CoreError::ExpressionTooDeep { .. } => Stage::Parse,
            CoreError::UndefinedIdentifier { .. }
            | CoreError::MissingReturn { .. }
            | CoreError::DuplicateFunction { .. }
            | CoreError::DuplicateBinding { .. }
            | CoreError::UnknownType { .. }
            | CoreError::TypeMismatch { .. } => Stage::Resolve,
            CoreError::Codegen { .. } => Stage::Codegen,
        }
    }

    /// Byte offset of the offending source text, if the error has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            CoreError::Lex { position, .. }
            | CoreError::UnterminatedComment { position }
            | CoreError::IntegerOutOfRange { position, .. }
            | CoreError::Parse { position, .. }
            | CoreError::ExpressionTooDeep { position, .. }
            | CoreError::UndefinedIdentifier { position, .. }
            | CoreError::MissingReturn { position, .. }
            | CoreError::DuplicateFunction { position, .. }
            | CoreError::DuplicateBinding { position, .. }
            | CoreError::UnknownType { position, .. }
            | CoreError::TypeMismatch { position, .. } => Some(*position),
            CoreError::Codegen { .. } => None,
        }
    }

    pub(crate) fn parse(expected: impl Into<String>, found: impl Into<String>, position: usize) -> Self {
        CoreError::Parse {
            expected: expected.into(),
            found: found.into(),
            position,
        }
    }

    pub(crate) fn codegen(message: impl Into<String>) -> Self {
        CoreError::Codegen {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_stage_and_position() {
        let err = CoreError::UndefinedIdentifier {
            name: "x".to_string(),
            position: 30,
        };
        assert_eq!(err.stage(), Stage::Resolve);
        assert_eq!(err.position(), Some(30));
        assert_eq!(err.to_string(), "undefined identifier `x` at byte 30");
    }

    #[test]
    fn depth_limit_is_a_parse_error() {
        let err = CoreError::ExpressionTooDeep {
            limit: 256,
            position: 12,
        };
        assert_eq!(err.stage(), Stage::Parse);
        assert_eq!(err.position(), Some(12));
    }

    #[test]
    fn codegen_errors_have_no_position() {
        let err = CoreError::codegen("no instruction");
        assert_eq!(err.stage(), Stage::Codegen);
        assert_eq!(err.position(), None);
    }
}
