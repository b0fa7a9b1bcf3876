//! Option parser: structures already-tokenized words into positional
//! arguments and a flag map.
//!
//! Supports `--key=value`, `--key value`, `--flag`, `--no-flag`, grouped
//! shorts (`-abc`), short-with-value (`-k value`) and the `--` terminator.
//! Values that look numeric are coerced to JSON numbers; everything else
//! stays a string. Positionals always stay strings.

use serde_json::{Map, Value};

#[derive(Debug, Default)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub flags: Map<String, Value>,
}

pub fn parse(tokens: Vec<String>) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if token == "--" {
            parsed.positional.extend(iter.by_ref());
            break;
        }

        if let Some(long) = token.strip_prefix("--") {
            if let Some((key, value)) = long.split_once('=') {
                parsed.flags.insert(key.to_string(), coerce(value));
            } else if let Some(name) = long.strip_prefix("no-") {
                parsed.flags.insert(name.to_string(), Value::Bool(false));
            } else if takes_value(iter.peek()) {
                let value = iter.next().unwrap_or_default();
                parsed.flags.insert(long.to_string(), coerce(&value));
            } else {
                parsed.flags.insert(long.to_string(), Value::Bool(true));
            }
            continue;
        }

        if token.len() > 1 && token.starts_with('-') && !is_numeric(&token) {
            let shorts: Vec<char> = token[1..].chars().collect();
            if shorts.len() == 1 && takes_value(iter.peek()) {
                let value = iter.next().unwrap_or_default();
                parsed.flags.insert(shorts[0].to_string(), coerce(&value));
            } else {
                for ch in shorts {
                    parsed.flags.insert(ch.to_string(), Value::Bool(true));
                }
            }
            continue;
        }

        parsed.positional.push(token);
    }

    parsed
}

fn takes_value(next: Option<&String>) -> bool {
    matches!(next, Some(token) if !token.starts_with('-') || is_numeric(token))
}

fn is_numeric(token: &str) -> bool {
    token.parse::<f64>().is_ok()
}

fn coerce(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn long_flags_and_values() {
        let parsed = parse(words(&["foo", "--bar=1", "--baz", "qux", "--on"]));
        assert_eq!(parsed.positional, vec!["foo"]);
        assert_eq!(parsed.flags.get("bar"), Some(&Value::from(1)));
        assert_eq!(parsed.flags.get("baz"), Some(&Value::from("qux")));
        assert_eq!(parsed.flags.get("on"), Some(&Value::Bool(true)));
    }

    #[test]
    fn negated_flags() {
        let parsed = parse(words(&["--no-color"]));
        assert_eq!(parsed.flags.get("color"), Some(&Value::Bool(false)));
    }

    #[test]
    fn grouped_and_valued_shorts() {
        let parsed = parse(words(&["-abc", "-n", "3"]));
        assert_eq!(parsed.flags.get("a"), Some(&Value::Bool(true)));
        assert_eq!(parsed.flags.get("b"), Some(&Value::Bool(true)));
        assert_eq!(parsed.flags.get("c"), Some(&Value::Bool(true)));
        assert_eq!(parsed.flags.get("n"), Some(&Value::from(3)));
    }

    #[test]
    fn double_dash_ends_flag_parsing() {
        let parsed = parse(words(&["a", "--", "--not-a-flag", "b"]));
        assert_eq!(parsed.positional, vec!["a", "--not-a-flag", "b"]);
        assert!(parsed.flags.is_empty());
    }

    #[test]
    fn negative_numbers_stay_positional() {
        let parsed = parse(words(&["-3", "-2.5"]));
        assert_eq!(parsed.positional, vec!["-3", "-2.5"]);
        assert!(parsed.flags.is_empty());
    }

    #[test]
    fn numeric_coercion() {
        let parsed = parse(words(&["--int=42", "--float=1.5", "--text=1x"]));
        assert_eq!(parsed.flags.get("int"), Some(&Value::from(42)));
        assert_eq!(parsed.flags.get("float"), Some(&Value::from(1.5)));
        assert_eq!(parsed.flags.get("text"), Some(&Value::from("1x")));
    }
}
