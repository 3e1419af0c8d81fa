//! Positional message templates: `"Hello {0}, you have {1} messages"`.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("placeholder regex is valid"))
}

/// Replace `{n}` with `args[n]`. Placeholders without a matching argument stay as they are.
pub fn format_template(template: &str, args: &[String]) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn given_positional_placeholders_when_formatting_then_substitutes_in_order() {
        let out = format_template("{1} before {0}", &args(&["b", "a"]));
        assert_eq!(out, "a before b");
    }

    #[test]
    fn given_repeated_placeholder_when_formatting_then_substitutes_each() {
        assert_eq!(format_template("{0}-{0}", &args(&["x"])), "x-x");
    }

    #[test]
    fn given_missing_argument_when_formatting_then_placeholder_is_kept() {
        assert_eq!(format_template("{0} {3}", &args(&["x"])), "x {3}");
    }

    #[test]
    fn given_no_placeholders_when_formatting_then_text_unchanged() {
        assert_eq!(format_template("plain", &args(&["x"])), "plain");
    }
}
