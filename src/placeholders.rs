use crate::error::SqlClientError;
use crate::escape::ValueEscaper;
use crate::types::SqlValue;

/// Replace each `?` in `sql`, left to right, with the `secure()`d form of the matching
/// parameter.
///
/// The statement is split on `?` before any value is inserted, so a parameter that
/// itself contains `?` is never substituted again. Surplus parameters are ignored.
///
/// # Errors
/// Returns `SqlClientError::ParameterError` if there are fewer parameters than
/// placeholders, or `EscapeError` if a parameter cannot be rendered.
pub fn substitute(
    sql: &str,
    params: &[SqlValue],
    escaper: &ValueEscaper<'_>,
) -> Result<String, SqlClientError> {
    if params.is_empty() || !sql.contains('?') {
        return Ok(sql.to_string());
    }

    let pieces: Vec<&str> = sql.split('?').collect();
    let wanted = pieces.len() - 1;
    if params.len() < wanted {
        return Err(SqlClientError::ParameterError(format!(
            "statement has {wanted} placeholders but only {} parameters were given",
            params.len()
        )));
    }

    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    for (index, piece) in pieces.iter().enumerate() {
        out.push_str(piece);
        if index < wanted {
            out.push_str(&escaper.secure(&params[index])?);
        }
    }
    Ok(out)
}
