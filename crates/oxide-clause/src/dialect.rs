//! SQL dialect support.
//!
//! The pipeline never quotes identifiers or chooses placeholders itself; it
//! asks the dialect. Dialects also render traced SQL with its parameters
//! inlined.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::value::SqlValue;

/// How a dialect spells bind parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` for every parameter.
    #[default]
    Question,
    /// `$1`, `$2`, ... by position.
    Numbered,
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the parameter placeholder style.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    /// Returns whether the dialect supports RETURNING clause.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Returns whether the dialect supports UPSERT (ON CONFLICT).
    fn supports_upsert(&self) -> bool {
        false
    }

    /// Quotes an identifier, quoting each part of a `table.column` path.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        name.split('.')
            .map(|part| {
                if part == "*" {
                    String::from(part)
                } else {
                    format!("{quote}{part}{quote}")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Returns the placeholder for the parameter at `position` (1-based).
    fn bind_var(&self, position: usize) -> String {
        match self.placeholder_style() {
            PlaceholderStyle::Question => String::from("?"),
            PlaceholderStyle::Numbered => format!("${position}"),
        }
    }

    /// Renders `sql` with `vars` inlined, for logging.
    fn explain(&self, sql: &str, vars: &[SqlValue]) -> String {
        explain(sql, self.placeholder_style(), vars)
    }
}

/// A generic SQL dialect using ANSI SQL standards.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect {
    style: PlaceholderStyle,
}

impl GenericDialect {
    /// Creates a new generic dialect with `?` placeholders.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            style: PlaceholderStyle::Question,
        }
    }

    /// Creates a generic dialect with `$n` placeholders and RETURNING support.
    #[must_use]
    pub const fn numbered() -> Self {
        Self {
            style: PlaceholderStyle::Numbered,
        }
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }

    fn supports_returning(&self) -> bool {
        self.style == PlaceholderStyle::Numbered
    }

    fn supports_upsert(&self) -> bool {
        true
    }
}

fn numbered_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$(\d+)").expect("placeholder pattern is valid"))
}

/// Inlines `vars` into `sql` according to the placeholder style.
///
/// Placeholders inside single-quoted literals are left alone. A placeholder
/// without a matching value is kept verbatim.
#[must_use]
pub fn explain(sql: &str, style: PlaceholderStyle, vars: &[SqlValue]) -> String {
    match style {
        PlaceholderStyle::Question => {
            let mut out = String::with_capacity(sql.len() + vars.len() * 8);
            let mut in_literal = false;
            let mut next = 0;
            for c in sql.chars() {
                match c {
                    '\'' => {
                        in_literal = !in_literal;
                        out.push(c);
                    }
                    '?' if !in_literal => match vars.get(next) {
                        Some(v) => {
                            out.push_str(&v.to_sql_inline());
                            next += 1;
                        }
                        None => out.push(c),
                    },
                    _ => out.push(c),
                }
            }
            out
        }
        PlaceholderStyle::Numbered => numbered_placeholder()
            .replace_all(sql, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| vars.get(idx))
                    .map_or_else(|| caps[0].to_string(), SqlValue::to_sql_inline)
            })
            .into_owned(),
    }
}
