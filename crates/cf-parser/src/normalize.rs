//! Pre-parse text repair: entity and escape decoding plus the ordered
//! cascade of sanitizing rewrites applied when the strict parse fails.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Decodes character entities and backslash escapes, in that order, and
/// trims surrounding whitespace. Exported diagrams frequently arrive
/// double-encoded (entity-escaped markup inside a JSON string).
#[must_use]
pub fn decode(input: &str) -> String {
    let decoded = decode_entities(input);
    let decoded = decode_escapes(&decoded);
    decoded.trim().to_string()
}

/// Replaces named and numeric character references with their characters.
/// Unknown or malformed references pass through unchanged; this pass must
/// never fail.
#[must_use]
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        // An entity ends at the next ';' and is short; anything else is a
        // bare ampersand.
        let limit = tail.len().min(32);
        let Some(semi) = tail.as_bytes()[..limit].iter().position(|&b| b == b';') else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let name = &tail[1..semi];
        match resolve_entity(name) {
            Some(ch) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = if let Some(hex) = digits.strip_prefix(['x', 'X']) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                digits.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Decodes literal backslash escapes: `\uXXXX` unicode escapes plus the
/// common single-character forms. Invalid sequences are left untouched.
#[must_use]
pub fn decode_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek().map(|(_, next)| *next) {
            Some('u') => {
                let hex_start = idx + 2;
                let hex = input.get(hex_start..hex_start + 4);
                let decoded = hex
                    .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32);
                match decoded {
                    Some(value) => {
                        out.push(value);
                        // Consume 'u' and the four hex digits.
                        for _ in 0..5 {
                            chars.next();
                        }
                    }
                    None => out.push('\\'),
                }
            }
            Some('n') => {
                out.push('\n');
                chars.next();
            }
            Some('r') => {
                out.push('\r');
                chars.next();
            }
            Some('t') => {
                out.push('\t');
                chars.next();
            }
            Some('\\') => {
                out.push('\\');
                chars.next();
            }
            Some('"') => {
                out.push('"');
                chars.next();
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// Identifies which sanitizing rewrite (if any) made the input parseable.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub enum RecoveryStrategy {
    /// The input parsed strictly, no rewrite needed.
    #[default]
    Strict,
    /// The parameter-blob attribute's value was emptied.
    EmptyParamsValue,
    /// The parameter-blob attribute was removed entirely.
    DropParamsAttribute,
    /// Attributes whose value contains `<` were removed.
    DropLtAttributes,
    /// Attributes whose value contains `>` were removed.
    DropGtAttributes,
    /// Attributes whose value contains `&` were removed.
    DropAmpAttributes,
    /// Attributes whose quoted value embeds a stray quote were removed.
    DropQuoteAttributes,
}

impl RecoveryStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::EmptyParamsValue => "empty-params-value",
            Self::DropParamsAttribute => "drop-params-attribute",
            Self::DropLtAttributes => "drop-lt-attributes",
            Self::DropGtAttributes => "drop-gt-attributes",
            Self::DropAmpAttributes => "drop-amp-attributes",
            Self::DropQuoteAttributes => "drop-quote-attributes",
        }
    }
}

static EMPTY_PARAMS_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"xmlParamsData="[^"]*""#).expect("valid rewrite pattern")
});
static DROP_PARAMS_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+xmlParamsData="[^"]*""#).expect("valid rewrite pattern")
});
static DROP_LT_ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+[a-zA-Z_][a-zA-Z0-9_]*="[^"]*<[^"]*""#).expect("valid rewrite pattern")
});
static DROP_GT_ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+[a-zA-Z_][a-zA-Z0-9_]*="[^"]*>[^"]*""#).expect("valid rewrite pattern")
});
static DROP_AMP_ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+[a-zA-Z_][a-zA-Z0-9_]*="[^"]*&[^"]*""#).expect("valid rewrite pattern")
});
static DROP_QUOTE_ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+[a-zA-Z_][a-zA-Z0-9_]*="[^"]*"[^"]*""#).expect("valid rewrite pattern")
});

/// The sanitizing rewrites, in the order they are attempted. Each is a pure
/// function over the decoded text; each may discard attribute content rather
/// than guess at its intended value. Documented, intentionally lossy
/// behavior.
#[must_use]
pub fn rewrites() -> [(RecoveryStrategy, fn(&str) -> String); 6] {
    [
        (RecoveryStrategy::EmptyParamsValue, empty_params_value),
        (RecoveryStrategy::DropParamsAttribute, drop_params_attribute),
        (RecoveryStrategy::DropLtAttributes, drop_lt_attributes),
        (RecoveryStrategy::DropGtAttributes, drop_gt_attributes),
        (RecoveryStrategy::DropAmpAttributes, drop_amp_attributes),
        (RecoveryStrategy::DropQuoteAttributes, drop_quote_attributes),
    ]
}

fn empty_params_value(input: &str) -> String {
    EMPTY_PARAMS_VALUE
        .replace_all(input, r#"xmlParamsData="""#)
        .into_owned()
}

fn drop_params_attribute(input: &str) -> String {
    DROP_PARAMS_ATTRIBUTE.replace_all(input, "").into_owned()
}

fn drop_lt_attributes(input: &str) -> String {
    DROP_LT_ATTRIBUTES.replace_all(input, "").into_owned()
}

fn drop_gt_attributes(input: &str) -> String {
    DROP_GT_ATTRIBUTES.replace_all(input, "").into_owned()
}

fn drop_amp_attributes(input: &str) -> String {
    DROP_AMP_ATTRIBUTES.replace_all(input, "").into_owned()
}

fn drop_quote_attributes(input: &str) -> String {
    DROP_QUOTE_ATTRIBUTES.replace_all(input, "").into_owned()
}
