//! Payload text codec: `LNWP V1 PRM=<prm> [VAL="..."] [KEY="..."]...`

use std::collections::BTreeMap;

/// Decoded payload fields, keyed by uppercase name
pub type Fields = BTreeMap<String, String>;

/// Quote a value so it survives tokenization
///
/// Double quotes become single quotes and line breaks become spaces.
pub fn quote_val(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        quoted.push(match ch {
            '"' => '\'',
            '\r' | '\n' => ' ',
            c => c,
        });
    }
    quoted.push('"');
    quoted
}

/// Build a payload string
///
/// `extra` pairs are appended in order after `VAL`.
pub fn build_payload(prm: &str, val: Option<&str>, extra: &[(&str, &str)]) -> String {
    let mut out = format!("LNWP V1 PRM={prm}");
    if let Some(val) = val {
        out.push_str(" VAL=");
        out.push_str(&quote_val(val));
    }
    for (key, value) in extra {
        out.push(' ');
        out.push_str(key);
        out.push('=');
        out.push_str(&quote_val(value));
    }
    out
}

/// Split on whitespace outside double quotes; quotes stay in the token
fn tokenize(payload: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;

    for (i, ch) in payload.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch.is_whitespace() && !in_quotes {
            if let Some(s) = start.take() {
                tokens.push(&payload[s..i]);
            }
            continue;
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        tokens.push(&payload[s..]);
    }
    tokens
}

/// Parse a payload into fields
///
/// Tokens without `=` are dropped. A repeated key keeps its last value.
pub fn parse_payload(payload: &str) -> Fields {
    let mut fields = Fields::new();
    for token in tokenize(payload.trim()) {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let value = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            &value[1..value.len() - 1]
        } else {
            value
        };
        fields.insert(key.trim().to_uppercase(), value.to_string());
    }
    fields
}
