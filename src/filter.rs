// src/filter.rs - OPC-style wildcard pattern matching for area/source filters
use crate::error::{AeError, Result};
use regex::{Regex, RegexBuilder};

/// A compiled wildcard pattern
///
/// Supports the OPC string-filter syntax: `*` matches any run of
/// characters, `?` matches exactly one, `[abc]`/`[a-z]` match one character
/// from a set and `[!set]` one character outside it. Matching is anchored
/// over the whole string and case-insensitive by default.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a wildcard pattern, case-insensitive
    pub fn new(pattern: &str) -> Result<Self> {
        Self::with_case_sensitivity(pattern, false)
    }

    /// Compile a wildcard pattern with explicit case sensitivity
    pub fn with_case_sensitivity(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let regex = RegexBuilder::new(&translate(pattern)?)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| AeError::InvalidArgument(format!("bad filter pattern '{pattern}': {e}")))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether the whole of `text` matches this pattern
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The wildcard text this pattern was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Translate a wildcard pattern into an anchored regex
fn translate(pattern: &str) -> Result<String> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if inner == '-' {
                        out.push('-');
                    } else {
                        push_literal_in_class(&mut out, inner);
                    }
                }
                if !closed {
                    return Err(AeError::InvalidArgument(format!(
                        "unterminated character set in pattern '{pattern}'"
                    )));
                }
                out.push(']');
            }
            _ => push_literal(&mut out, c),
        }
    }
    out.push('$');
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c.is_ascii_alphanumeric() {
        out.push(c);
    } else {
        out.push_str(&regex::escape(&c.to_string()));
    }
}

fn push_literal_in_class(out: &mut String, c: char) {
    if matches!(c, '\\' | ']' | '^') {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_and_question() {
        let p = Pattern::new("Plant.Tank*").unwrap();
        assert!(p.matches("Plant.Tank1"));
        assert!(p.matches("Plant.TankFarm.Unit3"));
        assert!(!p.matches("Plant.Valve1"));

        let p = Pattern::new("Tank?").unwrap();
        assert!(p.matches("Tank1"));
        assert!(!p.matches("Tank12"));
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let p = Pattern::new("tank*").unwrap();
        assert!(p.matches("TANK7"));
        let strict = Pattern::with_case_sensitivity("tank*", true).unwrap();
        assert!(!strict.matches("TANK7"));
    }

    #[test]
    fn test_character_sets() {
        let p = Pattern::new("Tank[1-3]").unwrap();
        assert!(p.matches("Tank2"));
        assert!(!p.matches("Tank4"));

        let p = Pattern::new("Tank[!1-3]").unwrap();
        assert!(p.matches("Tank9"));
        assert!(!p.matches("Tank1"));
    }

    #[test]
    fn test_literal_dots_are_literal() {
        let p = Pattern::new("Plant.Tank1").unwrap();
        assert!(p.matches("Plant.Tank1"));
        assert!(!p.matches("PlantXTank1"));
    }

    #[test]
    fn test_match_is_anchored() {
        let p = Pattern::new("Tank").unwrap();
        assert!(!p.matches("Plant.Tank"));
        assert!(!p.matches("Tank1"));
        assert!(p.matches("Tank"));
    }

    #[test]
    fn test_unterminated_set_rejected() {
        assert!(matches!(
            Pattern::new("Tank[1-3"),
            Err(AeError::InvalidArgument(_))
        ));
    }
}
