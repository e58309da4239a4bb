//! Condition maps: ordered `key => value` pairs whose keys carry an optional comparison
//! operator and glue token, e.g. `"age >="` or `"name LIKE OR"`.
//!
//! Keys are parsed once into [`Condition`] values; rendering only ever sees the parsed
//! form.

use std::fmt;

use crate::error::SqlClientError;
use crate::escape::ValueEscaper;
use crate::types::SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Is,
    IsNot,
    In,
    NotIn,
    Between,
    NotBetween,
    Like,
    NotLike,
    Gt,
    Lt,
    Ge,
    Le,
    Ne,
}

/// Token sequences checked against a key, most specific first.
const OPERATOR_TOKENS: [(Operator, &[&str]); 14] = [
    (Operator::NotBetween, &["NOT", "BETWEEN"]),
    (Operator::NotLike, &["NOT", "LIKE"]),
    (Operator::NotIn, &["NOT", "IN"]),
    (Operator::IsNot, &["IS", "NOT"]),
    (Operator::Between, &["BETWEEN"]),
    (Operator::Like, &["LIKE"]),
    (Operator::In, &["IN"]),
    (Operator::Is, &["IS"]),
    (Operator::Ge, &[">="]),
    (Operator::Le, &["<="]),
    (Operator::Ne, &["<>"]),
    (Operator::Gt, &[">"]),
    (Operator::Lt, &["<"]),
    (Operator::Eq, &["="]),
];

impl Operator {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Ne => "<>",
        }
    }

    fn takes_list(self) -> bool {
        matches!(
            self,
            Operator::In | Operator::NotIn | Operator::Between | Operator::NotBetween
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Connective placed between fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glue {
    And,
    Or,
    /// Separator for `SET` lists.
    Comma,
}

impl Glue {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Glue::And => "AND",
            Glue::Or => "OR",
            Glue::Comma => ",",
        }
    }
}

/// One parsed entry of a condition map.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    /// Explicit glue from the key; `None` uses the renderer's default.
    pub glue: Option<Glue>,
    pub value: SqlValue,
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            operator,
            glue: None,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn with_glue(mut self, glue: Glue) -> Self {
        self.glue = Some(glue);
        self
    }

    /// Parse a raw key such as `"created_at >= OR"`.
    pub fn parse(raw_key: &str, value: impl Into<SqlValue>) -> Self {
        let mut tokens: Vec<&str> = raw_key.split_whitespace().collect();

        let mut glue = None;
        if let Some(pos) = tokens
            .iter()
            .skip(1)
            .position(|t| t.eq_ignore_ascii_case("OR") || t.eq_ignore_ascii_case("AND"))
        {
            let token = tokens.remove(pos + 1);
            glue = Some(if token.eq_ignore_ascii_case("OR") {
                Glue::Or
            } else {
                Glue::And
            });
        }

        let mut operator = Operator::Eq;
        'search: for (candidate, pattern) in OPERATOR_TOKENS {
            if tokens.len() <= pattern.len() {
                continue;
            }
            for start in 1..=tokens.len() - pattern.len() {
                let window = &tokens[start..start + pattern.len()];
                if window
                    .iter()
                    .zip(pattern.iter())
                    .all(|(t, p)| t.eq_ignore_ascii_case(p))
                {
                    operator = candidate;
                    tokens.drain(start..start + pattern.len());
                    break 'search;
                }
            }
        }

        Self {
            column: tokens.join(" "),
            operator,
            glue,
            value: value.into(),
        }
    }
}

/// Ordered condition map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder-style `push`.
    #[must_use]
    pub fn with(mut self, raw_key: &str, value: impl Into<SqlValue>) -> Self {
        self.push(raw_key, value);
        self
    }

    pub fn push(&mut self, raw_key: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.0.push(Condition::parse(raw_key, value));
        self
    }

    pub fn push_condition(&mut self, condition: Condition) -> &mut Self {
        self.0.push(condition);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.0.iter()
    }
}

impl<K: AsRef<str>, V: Into<SqlValue>> FromIterator<(K, V)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| Condition::parse(k.as_ref(), v))
                .collect(),
        )
    }
}

impl FromIterator<Condition> for Conditions {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Conditions {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Render `conditions` as a clause body (the caller adds `WHERE (...)` or `SET`).
///
/// OR entries open their own parenthesized group so they bind to each other, not to the
/// surrounding AND chain.
///
/// # Errors
/// Returns `SqlClientError::EscapeError` if a value or column cannot be escaped.
pub fn render(
    conditions: &Conditions,
    default_glue: Glue,
    escaper: &ValueEscaper<'_>,
) -> Result<String, SqlClientError> {
    let mut fragments: Vec<String> = Vec::with_capacity(conditions.len());

    for condition in conditions {
        let column = escaper.quote_identifier(&condition.column)?;
        let operator = condition.operator.as_sql();
        let values = render_values(condition, escaper)?;
        if values.is_empty() {
            continue;
        }

        let glue = condition.glue.unwrap_or(default_glue);
        let first_entry = fragments.is_empty();

        for (n, value) in values.iter().enumerate() {
            let lead = match (first_entry, n, glue) {
                (true, 0, Glue::Or) => "1 = 1 AND (",
                (true, 0, _) => "",
                (false, 0, Glue::Or) => "AND (",
                _ => glue.as_sql(),
            };
            if lead.is_empty() {
                fragments.push(format!("{column} {operator} {value}"));
            } else {
                fragments.push(format!("{lead} {column} {operator} {value}"));
            }
        }

        if glue == Glue::Or
            && let Some(last) = fragments.last_mut()
        {
            last.push_str(" )");
        }
    }

    Ok(fragments.join("\n"))
}

fn render_values(
    condition: &Condition,
    escaper: &ValueEscaper<'_>,
) -> Result<Vec<String>, SqlClientError> {
    let SqlValue::List(items) = &condition.value else {
        return Ok(vec![escaper.secure(&condition.value)?]);
    };

    let secured = items
        .iter()
        .map(|item| escaper.secure(item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match condition.operator {
        Operator::In | Operator::NotIn if secured.is_empty() => vec!["(NULL)".to_string()],
        Operator::In | Operator::NotIn => vec![format!("({})", secured.join(","))],
        Operator::Between | Operator::NotBetween => vec![format!("({})", secured.join(" AND "))],
        op => {
            debug_assert!(!op.takes_list());
            secured
        }
    })
}
