use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors kept per run. Later ones are only counted.
pub const MAX_ERRORS: usize = 20;

/// Which rule family an error belongs to, derived from its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Type,
    Scope,
    Structure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Type => "type",
            Self::Scope => "scope",
            Self::Structure => "structure",
        })
    }
}

/// Numeric static-phase error code, rendered as `E201`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Types (E2xx) ──
    pub const UNKNOWN_TYPE: Self = Self(200);
    pub const CANT_ASSIGN_TO_LOCAL: Self = Self(201);
    pub const WRONG_ARG_COUNT: Self = Self(202);
    pub const CANT_ASSIGN_TO_FIELD: Self = Self(204);

    // ── Scopes (E5xx) ──
    pub const VARIABLE_ALREADY_DECLARED: Self = Self(500);
    pub const BREAK_OUTSIDE_LOOP: Self = Self(501);
    pub const SUPER_OUTSIDE_CLASS: Self = Self(502);
    pub const INVALID_SUPER_DEPTH: Self = Self(503);

    // ── Class structure (E6xx) ──
    pub const CYCLIC_INHERITANCE: Self = Self(600);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            500..=599 => ErrorCategory::Scope,
            600..=699 => ErrorCategory::Structure,
            _ => ErrorCategory::Type,
        }
    }

    /// Message id that stays stable when the wording changes.
    pub fn id(self) -> &'static str {
        match self {
            Self::UNKNOWN_TYPE => "unknownType",
            Self::CANT_ASSIGN_TO_LOCAL => "cantAssignValueToLocalVariable",
            Self::WRONG_ARG_COUNT => "wrongArgumentCount",
            Self::CANT_ASSIGN_TO_FIELD => "cantAssignValueToField",
            Self::VARIABLE_ALREADY_DECLARED => "variableAlreadyDefined",
            Self::BREAK_OUTSIDE_LOOP => "breakOutsideLoop",
            Self::SUPER_OUTSIDE_CLASS => "superOutsideClass",
            Self::INVALID_SUPER_DEPTH => "invalidSuperDepth",
            Self::CYCLIC_INHERITANCE => "cyclicInheritance",
            _ => "unknownError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// One problem found before execution.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{file}:{span}: {code} {message}")]
pub struct CompileError {
    pub file: String,
    pub code: ErrorCode,
    /// e.g. `cantAssignValueToLocalVariable`
    pub id: String,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// Offending line, empty when the program came without source text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_line: String,
}

impl CompileError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            id: code.id().to_string(),
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
        }
    }

    /// The error, then the quoted line with a caret under the start column.
    pub fn excerpt(&self) -> String {
        if self.source_line.is_empty() {
            return self.to_string();
        }
        let indent = " ".repeat(self.span.start_col.saturating_sub(1) as usize);
        format!("{self}\n    {}\n    {indent}^", self.source_line)
    }
}

/// Everything the static phase reported for one program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<CompileError>,
    pub total_errors: usize,
}

impl CompileErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Record an error. Past [`MAX_ERRORS`] it is counted but not kept.
    pub fn push(&mut self, error: CompileError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.errors.iter().any(|e| e.id == id)
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error.excerpt())?;
        }
        let dropped = self.total_errors.saturating_sub(self.errors.len());
        if dropped > 0 {
            writeln!(f, "... and {dropped} more")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mismatch(line: &str) -> CompileError {
        CompileError::new(
            "Main.java",
            ErrorCode::CANT_ASSIGN_TO_LOCAL,
            "Can't assign a value of type String to a local variable of type int",
            Span::new(2, 9, 2, 15),
            line,
        )
    }

    #[test]
    fn test_codes_know_their_family() {
        assert_eq!(ErrorCode::WRONG_ARG_COUNT.category(), ErrorCategory::Type);
        assert_eq!(ErrorCode::BREAK_OUTSIDE_LOOP.category(), ErrorCategory::Scope);
        assert_eq!(ErrorCode::CYCLIC_INHERITANCE.category(), ErrorCategory::Structure);
        assert_eq!(ErrorCode::INVALID_SUPER_DEPTH.to_string(), "E503");
        assert_eq!(ErrorCode(299).id(), "unknownError");
    }

    #[test]
    fn test_display_and_excerpt() {
        let err = mismatch("int i = \"Test\";");
        assert_eq!(
            err.to_string(),
            "Main.java:2:9: E201 Can't assign a value of type String to a local variable of type int"
        );
        let excerpt = err.excerpt();
        let quoted: Vec<&str> = excerpt.lines().skip(1).collect();
        assert_eq!(quoted, vec!["    int i = \"Test\";", "            ^"]);
        assert_eq!(mismatch("").excerpt(), mismatch("").to_string());
    }

    #[test]
    fn test_json_flattens_span_and_omits_empty_line() {
        let json = serde_json::to_string(&mismatch("")).unwrap();
        assert!(json.contains("\"start_line\":2"));
        assert!(json.contains("\"id\":\"cantAssignValueToLocalVariable\""));
        assert!(!json.contains("source_line"));
        let back: CompileError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.span, Span::new(2, 9, 2, 15));
        assert_eq!(back.code, ErrorCode::CANT_ASSIGN_TO_LOCAL);
    }

    #[test]
    fn test_errors_past_the_cap_are_counted() {
        let mut errs = CompileErrors::new();
        assert!(!errs.has_errors());
        for _ in 0..MAX_ERRORS + 3 {
            errs.push(mismatch(""));
        }
        assert_eq!(errs.errors.len(), MAX_ERRORS);
        assert_eq!(errs.total_errors, MAX_ERRORS + 3);
        assert!(errs.contains_id("cantAssignValueToLocalVariable"));
        assert!(!errs.contains_id("unknownType"));
        assert!(errs.to_string().ends_with("... and 3 more\n"));
    }
}
