//! SQL text helpers shared by the connection and statement decorators.

/// The companion query used to normalize SELECT row counts. Engines in the
/// MySQL family report the pre-LIMIT match count of the immediately
/// preceding SELECT on the same connection.
pub const FOUND_ROWS_PROBE: &str = "SELECT FOUND_ROWS()";

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Leading-whitespace-tolerant, case-insensitive check for SELECT text.
/// Requires a word boundary so `SELECTION...` does not count.
#[must_use]
pub(crate) fn is_select(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    let Some(head) = trimmed.get(..6) else {
        return false;
    };
    head.eq_ignore_ascii_case("SELECT")
        && trimmed.as_bytes().get(6).is_none_or(|b| !is_ident_byte(*b))
}

/// Is this statement the row-count probe itself? A trailing semicolon is
/// still the probe.
#[must_use]
pub(crate) fn is_found_rows_probe(sql: &str) -> bool {
    let trimmed = sql.trim();
    let trimmed = trimmed
        .strip_suffix(';')
        .map_or(trimmed, str::trim_end);
    trimmed.eq_ignore_ascii_case(FOUND_ROWS_PROBE)
}

/// Normalize a caller-supplied parameter name to exactly one leading colon,
/// so `search` and `:search` store under the same key.
#[must_use]
pub(crate) fn normalize_param_name(name: &str) -> String {
    let bare = name.trim().trim_start_matches(':');
    format!(":{bare}")
}

/// Replace every whole-token occurrence of `name` (including its colon) in
/// `sql` with `replacement`.
///
/// A match requires a non-identifier, non-colon character (or start of text)
/// before the colon and a non-identifier character (or end of text) after
/// the name, so `:search` never matches inside `:search2` and `:arch` never
/// matches inside `:search`.
#[must_use]
pub(crate) fn substitute_param(sql: &str, name: &str, replacement: &str) -> String {
    debug_assert!(name.starts_with(':'));
    let bytes = sql.as_bytes();
    let pat = name.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    let mut idx = 0;
    while idx + pat.len() <= bytes.len() {
        let before_ok = idx == 0 || {
            let prev = bytes[idx - 1];
            !is_ident_byte(prev) && prev != b':'
        };
        let after_ok = bytes
            .get(idx + pat.len())
            .is_none_or(|b| !is_ident_byte(*b));
        if bytes[idx] == b':' && &bytes[idx..idx + pat.len()] == pat && before_ok && after_ok {
            out.push_str(&sql[last..idx]);
            out.push_str(replacement);
            idx += pat.len();
            last = idx;
        } else {
            idx += 1;
        }
    }
    out.push_str(&sql[last..]);
    out
}
