//! Turning runtime values into SQL literals.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::driver::Driver;
use crate::error::SqlClientError;
use crate::types::{SqlValue, TIMESTAMP_FORMAT};

/// Time functions that `secure()` passes through as live SQL.
pub const DEFAULT_TIME_FUNCTIONS: [&str; 13] = [
    "CURDATE()",
    "CURRENT_DATE()",
    "CURRENT_TIME()",
    "CURRENT_TIMESTAMP()",
    "CURTIME()",
    "LOCALTIME()",
    "LOCALTIMESTAMP()",
    "NOW()",
    "SYSDATE()",
    "UNIX_TIMESTAMP()",
    "UTC_DATE()",
    "UTC_TIME()",
    "UTC_TIMESTAMP()",
];

/// What `escape` does with list and map values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayMode {
    /// Escape element-wise and keep the structure.
    #[default]
    Keep,
    /// Escape element-wise and join with `,` into one string.
    Join,
    /// Collapse the whole value to `NULL`.
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeOptions {
    pub strip_non_utf8: bool,
    pub decode_html_entities: bool,
    pub array_mode: ArrayMode,
}

impl Default for EscapeOptions {
    fn default() -> Self {
        Self {
            strip_non_utf8: true,
            decode_html_entities: false,
            array_mode: ArrayMode::Keep,
        }
    }
}

impl EscapeOptions {
    #[must_use]
    pub fn strip_non_utf8(mut self, strip: bool) -> Self {
        self.strip_non_utf8 = strip;
        self
    }

    #[must_use]
    pub fn decode_html_entities(mut self, decode: bool) -> Self {
        self.decode_html_entities = decode;
        self
    }

    #[must_use]
    pub fn array_mode(mut self, mode: ArrayMode) -> Self {
        self.array_mode = mode;
        self
    }
}

/// Result of `ValueEscaper::escape`. Text is escaped but not quoted.
#[derive(Debug, Clone, PartialEq)]
pub enum Escaped {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Escaped>),
    Map(Vec<(Escaped, Escaped)>),
}

impl Escaped {
    /// Bare SQL rendering: numbers as numbers, `NULL`, text as-is, collections comma-joined.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Escaped::Null => "NULL".to_string(),
            Escaped::Int(v) => v.to_string(),
            Escaped::Float(v) => format_float(*v),
            Escaped::Text(v) => v.clone(),
            Escaped::List(items) => items.iter().map(Escaped::to_sql).collect::<Vec<_>>().join(","),
            Escaped::Map(entries) => entries
                .iter()
                .map(|(_, v)| v.to_sql())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        "NULL".to_string()
    }
}

/// Classifies values and produces escaped results or quoted literals, using the
/// driver's native string escaping.
pub struct ValueEscaper<'a> {
    driver: &'a dyn Driver,
    null_as_empty: bool,
}

impl<'a> ValueEscaper<'a> {
    pub fn new(driver: &'a dyn Driver, null_as_empty: bool) -> Self {
        Self {
            driver,
            null_as_empty,
        }
    }

    /// Escape `value` according to its kind.
    ///
    /// # Errors
    /// Returns `SqlClientError::EscapeError` for values with no SQL representation.
    pub fn escape(&self, value: &SqlValue, opts: EscapeOptions) -> Result<Escaped, SqlClientError> {
        if value.is_empty_text() {
            return Ok(Escaped::Text(String::new()));
        }

        match value {
            SqlValue::Null => Ok(Escaped::Null),
            SqlValue::Int(v) => Ok(Escaped::Int(*v)),
            SqlValue::Bool(v) => Ok(Escaped::Int(i64::from(*v))),
            SqlValue::Text(s) => match integer_like(s) {
                Some(v) => Ok(Escaped::Int(v)),
                None => Ok(Escaped::Text(self.escape_text(s, opts))),
            },
            SqlValue::Bytes(bytes) => {
                if let Some(v) = std::str::from_utf8(bytes).ok().and_then(integer_like) {
                    return Ok(Escaped::Int(v));
                }
                let text = if opts.strip_non_utf8 {
                    Cow::Owned(strip_invalid_utf8(bytes))
                } else {
                    String::from_utf8_lossy(bytes)
                };
                Ok(Escaped::Text(self.escape_text(&text, opts)))
            }
            SqlValue::Float(v) => Ok(Escaped::Float(*v)),
            SqlValue::List(items) => {
                if opts.array_mode == ArrayMode::Null {
                    return Ok(Escaped::Null);
                }
                let inner = opts.array_mode(ArrayMode::Keep);
                let cleaned = items
                    .iter()
                    .map(|item| self.escape(item, inner))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(collect_array(Escaped::List(cleaned), opts.array_mode))
            }
            SqlValue::Map(entries) => {
                if opts.array_mode == ArrayMode::Null {
                    return Ok(Escaped::Null);
                }
                let inner = opts.array_mode(ArrayMode::Keep);
                let mut cleaned = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let key = self.escape(&SqlValue::Text(key.clone()), inner)?;
                    cleaned.push((key, self.escape(item, inner)?));
                }
                Ok(collect_array(Escaped::Map(cleaned), opts.array_mode))
            }
            SqlValue::Stringable(display) => {
                Ok(Escaped::Text(self.escape_text(&display.to_string(), opts)))
            }
            SqlValue::Timestamp(ts) => {
                let formatted = SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string());
                self.escape(&formatted, EscapeOptions::default().strip_non_utf8(false))
            }
            SqlValue::Opaque(type_name) => Err(SqlClientError::EscapeError(format!(
                "value of type `{type_name}` has no SQL representation"
            ))),
        }
    }

    fn escape_text(&self, text: &str, opts: EscapeOptions) -> String {
        let mut text = Cow::Borrowed(text);
        if opts.strip_non_utf8 {
            text = Cow::Owned(text.trim_start_matches('\u{feff}').to_string());
        }
        if opts.decode_html_entities {
            text = Cow::Owned(decode_html_entities(&text));
        }
        self.driver.escape(&text)
    }

    /// Render `value` as a single SQL token: a quoted string, a number, `NULL`, or one of
    /// the default time functions verbatim.
    ///
    /// # Errors
    /// Returns `SqlClientError::EscapeError` for values with no SQL representation.
    pub fn secure(&self, value: &SqlValue) -> Result<String, SqlClientError> {
        if value.is_empty_text() || (self.null_as_empty && value.is_null()) {
            return Ok("''".to_string());
        }

        let text = match value {
            SqlValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            SqlValue::Bytes(bytes) => Some(Cow::Owned(strip_invalid_utf8(bytes))),
            SqlValue::Stringable(display) => Some(Cow::Owned(display.to_string())),
            _ => None,
        };
        let value = match text {
            Some(s) if DEFAULT_TIME_FUNCTIONS.contains(&s.as_ref()) => return Ok(s.into_owned()),
            // Quotes are trimmed from the raw text, before the driver escapes it.
            Some(s) => Cow::Owned(SqlValue::Text(s.trim().trim_matches('\'').to_string())),
            None => Cow::Borrowed(value),
        };

        let escaped = self.escape(
            &value,
            EscapeOptions::default().array_mode(ArrayMode::Null),
        )?;

        Ok(match escaped {
            Escaped::Text(text) => format!("'{text}'"),
            other => other.to_sql(),
        })
    }

    /// Quote a table, column or database name with backticks.
    ///
    /// # Errors
    /// Returns `SqlClientError::EscapeError` if the name cannot be escaped.
    pub fn quote_identifier(&self, name: &str) -> Result<String, SqlClientError> {
        let escaped = self.escape(
            &SqlValue::Text(name.to_string()),
            EscapeOptions::default().strip_non_utf8(false),
        )?;
        let inner = escaped.to_sql().trim_matches('`').replace('`', "``");
        Ok(format!("`{inner}`"))
    }
}

fn collect_array(escaped: Escaped, mode: ArrayMode) -> Escaped {
    if mode == ArrayMode::Join {
        Escaped::Text(escaped.to_sql())
    } else {
        escaped
    }
}

/// Digit strings without a leading zero that survive an `i64` round trip.
fn integer_like(s: &str) -> Option<i64> {
    if s.starts_with('0') {
        return None;
    }
    let parsed = s.parse::<i64>().ok()?;
    (parsed.to_string() == s).then_some(parsed)
}

/// Drop every invalid UTF-8 sequence.
#[must_use]
pub fn strip_invalid_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,7});")
        .expect("entity pattern is valid")
});

/// Decode numeric and the common named HTML entities; unknown ones are left alone.
#[must_use]
pub fn decode_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "euro" => '€',
        "pound" => '£',
        "yen" => '¥',
        "sect" => '§',
        "deg" => '°',
        "laquo" => '«',
        "raquo" => '»',
        "hellip" => '…',
        "ndash" => '–',
        "mdash" => '—',
        "auml" => 'ä',
        "ouml" => 'ö',
        "uuml" => 'ü',
        "Auml" => 'Ä',
        "Ouml" => 'Ö',
        "Uuml" => 'Ü',
        "szlig" => 'ß',
        _ => return None,
    })
}

/// MySQL-style escaping (`mysql_real_escape_string` semantics), for drivers that speak it.
#[must_use]
pub fn mysql_escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedDriver;
    use chrono::NaiveDate;

    fn escaper(driver: &ScriptedDriver) -> ValueEscaper<'_> {
        ValueEscaper::new(driver, false)
    }

    #[test]
    fn scalars_follow_kind_rules() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        let opts = EscapeOptions::default();

        assert_eq!(e.escape(&"".into(), opts).unwrap(), Escaped::Text(String::new()));
        assert_eq!(e.escape(&SqlValue::Null, opts).unwrap(), Escaped::Null);
        assert_eq!(e.escape(&true.into(), opts).unwrap(), Escaped::Int(1));
        assert_eq!(e.escape(&(-42).into(), opts).unwrap(), Escaped::Int(-42));
        assert_eq!(e.escape(&1.25.into(), opts).unwrap(), Escaped::Float(1.25));
        assert_eq!(e.escape(&"123".into(), opts).unwrap(), Escaped::Int(123));
        assert_eq!(
            e.escape(&"0123".into(), opts).unwrap(),
            Escaped::Text("0123".into())
        );
        assert_eq!(
            e.escape(&"12abc".into(), opts).unwrap(),
            Escaped::Text("12abc".into())
        );
    }

    #[test]
    fn strings_use_driver_escaping() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        let escaped = e.escape(&"O'Reilly \"x\"\n".into(), EscapeOptions::default()).unwrap();
        assert_eq!(escaped, Escaped::Text("O\\'Reilly \\\"x\\\"\\n".into()));
    }

    #[test]
    fn invalid_utf8_is_stripped_only_when_asked() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        let raw = SqlValue::bytes(b"ab\xffcd".to_vec());

        let stripped = e.escape(&raw, EscapeOptions::default()).unwrap();
        assert_eq!(stripped, Escaped::Text("abcd".into()));

        let kept = e
            .escape(&raw, EscapeOptions::default().strip_non_utf8(false))
            .unwrap();
        assert_eq!(kept, Escaped::Text("ab\u{fffd}cd".into()));
    }

    #[test]
    fn html_entities_decode_before_escaping() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        let escaped = e
            .escape(
                &"&lt;b&gt; &amp; &#39;x&#x27; &bogus;".into(),
                EscapeOptions::default().decode_html_entities(true),
            )
            .unwrap();
        assert_eq!(escaped, Escaped::Text("<b> & \\'x\\' &bogus;".into()));
    }

    #[test]
    fn arrays_keep_join_or_collapse() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        let list = SqlValue::from(vec![SqlValue::from(1), "a'b".into(), SqlValue::Null]);

        let kept = e.escape(&list, EscapeOptions::default()).unwrap();
        assert_eq!(
            kept,
            Escaped::List(vec![Escaped::Int(1), Escaped::Text("a\\'b".into()), Escaped::Null])
        );

        let joined = e
            .escape(&list, EscapeOptions::default().array_mode(ArrayMode::Join))
            .unwrap();
        assert_eq!(joined, Escaped::Text("1,a\\'b,NULL".into()));

        let nulled = e
            .escape(&list, EscapeOptions::default().array_mode(ArrayMode::Null))
            .unwrap();
        assert_eq!(nulled, Escaped::Null);

        let map = SqlValue::Map(vec![("k'1".into(), 5.into())]);
        assert_eq!(
            e.escape(&map, EscapeOptions::default()).unwrap(),
            Escaped::Map(vec![(Escaped::Text("k\\'1".into()), Escaped::Int(5))])
        );
    }

    #[test]
    fn timestamps_and_objects() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        assert_eq!(
            e.escape(&ts.into(), EscapeOptions::default()).unwrap(),
            Escaped::Text("2024-02-29 13:05:09".into())
        );
        assert_eq!(
            e.escape(&SqlValue::stringable(7_u64), EscapeOptions::default()).unwrap(),
            Escaped::Text("7".into())
        );
        let err = e
            .escape(&SqlValue::opaque::<std::fs::File>(), EscapeOptions::default())
            .unwrap_err();
        assert!(matches!(err, SqlClientError::EscapeError(msg) if msg.contains("File")));
    }

    #[test]
    fn secure_quotes_text_and_passes_time_functions() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        assert_eq!(e.secure(&"NOW()".into()).unwrap(), "NOW()");
        assert_eq!(e.secure(&"now()".into()).unwrap(), "'now()'");
        assert_eq!(e.secure(&"".into()).unwrap(), "''");
        assert_eq!(e.secure(&SqlValue::Null).unwrap(), "NULL");
        assert_eq!(e.secure(&" 'quoted' ".into()).unwrap(), "'quoted'");
        assert_eq!(e.secure(&"it's".into()).unwrap(), "'it\\'s'");
        assert_eq!(e.secure(&"42".into()).unwrap(), "42");
        assert_eq!(e.secure(&2.5.into()).unwrap(), "2.5");
        assert_eq!(e.secure(&false.into()).unwrap(), "0");
        assert_eq!(e.secure(&vec![1, 2].into()).unwrap(), "NULL");
    }

    #[test]
    fn secure_trims_quotes_from_every_text_form() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        assert_eq!(e.secure(&SqlValue::stringable("x'")).unwrap(), "'x'");
        assert_eq!(e.secure(&SqlValue::bytes(b"ab'".to_vec())).unwrap(), "'ab'");
        assert_eq!(e.secure(&SqlValue::bytes(b"a'b\xff".to_vec())).unwrap(), "'a\\'b'");
        assert_eq!(e.secure(&SqlValue::stringable("NOW()")).unwrap(), "NOW()");
        assert_eq!(e.secure(&SqlValue::bytes(b"17".to_vec())).unwrap(), "17");
    }

    #[test]
    fn secure_can_render_null_as_empty_string() {
        let driver = ScriptedDriver::new();
        let e = ValueEscaper::new(&driver, true);
        assert_eq!(e.secure(&SqlValue::Null).unwrap(), "''");
    }

    #[test]
    fn identifiers_double_backticks() {
        let driver = ScriptedDriver::new();
        let e = escaper(&driver);
        assert_eq!(e.quote_identifier("users").unwrap(), "`users`");
        assert_eq!(e.quote_identifier("`users`").unwrap(), "`users`");
        assert_eq!(e.quote_identifier("we`ird").unwrap(), "`we``ird`");
    }
}
