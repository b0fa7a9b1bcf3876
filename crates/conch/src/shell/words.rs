//! Tokenizer adapter: splits a raw input line into words.

use std::borrow::Cow;

/// Options applied when splitting an input line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenizeOptions {
    /// Treats backslashes as ordinary characters instead of escapes.
    pub ignore_backslash: bool,
}

pub fn tokenize(
    line: &str,
    options: &TokenizeOptions,
) -> Result<Vec<String>, shell_words::ParseError> {
    let line = if options.ignore_backslash {
        neutralize_backslashes(line)
    } else {
        Cow::Borrowed(line)
    };
    shell_words::split(&line)
}

/// Doubles every backslash the splitter would otherwise treat as an escape.
/// Backslashes inside single quotes are already literal and must stay single;
/// quote tracking needs no escape handling since no doubled backslash can
/// escape a quote.
fn neutralize_backslashes(line: &str) -> Cow<'_, str> {
    if !line.contains('\\') {
        return Cow::Borrowed(line);
    }

    let mut escaped = String::with_capacity(line.len() + 4);
    let mut in_single = false;
    let mut in_double = false;
    for ch in line.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '\\' if !in_single => escaped.push('\\'),
            _ => {}
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace_and_quotes() {
        let tokens = tokenize("echo foo --bar=1", &TokenizeOptions::default()).unwrap();
        assert_eq!(tokens, vec!["echo", "foo", "--bar=1"]);

        let tokens = tokenize(r#"say "two words" three"#, &TokenizeOptions::default()).unwrap();
        assert_eq!(tokens, vec!["say", "two words", "three"]);
    }

    #[test]
    fn empty_line_yields_no_tokens() {
        assert!(tokenize("   ", &TokenizeOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn ignore_backslash_keeps_backslashes_literal() {
        let opts = TokenizeOptions {
            ignore_backslash: true,
        };
        let tokens = tokenize(r"copy C:\tmp\file", &opts).unwrap();
        assert_eq!(tokens, vec!["copy", r"C:\tmp\file"]);

        let tokens = tokenize(r"copy C:\tmp\file", &TokenizeOptions::default()).unwrap();
        assert_eq!(tokens, vec!["copy", "C:tmpfile"]);
    }

    #[test]
    fn ignore_backslash_leaves_quoted_backslashes_alone() {
        let opts = TokenizeOptions {
            ignore_backslash: true,
        };
        // Single quotes already deliver backslashes literally.
        let tokens = tokenize(r"say 'a\b'", &opts).unwrap();
        assert_eq!(tokens, vec!["say", r"a\b"]);

        // Double quotes do escape, so neutralizing applies inside them.
        let tokens = tokenize(r#"say "a\b""#, &opts).unwrap();
        assert_eq!(tokens, vec!["say", r"a\b"]);

        // A single quote inside double quotes is literal, not an opener.
        let tokens = tokenize(r#"say "it's" C:\tmp"#, &opts).unwrap();
        assert_eq!(tokens, vec!["say", "it's", r"C:\tmp"]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(tokenize(r#"say "oops"#, &TokenizeOptions::default()).is_err());
    }
}
