use std::sync::LazyLock;

use regex::Regex;

/// Matches `${VAR}` placeholders, grounded on the same regex-driven
/// envelope-parsing idiom `pinguin_crypto` uses for `ENC[...]`.
static VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var regex is valid"));

/// Expands every `${VAR}` occurrence in `raw` against the process
/// environment before the YAML parser ever sees it. A variable that isn't
/// set expands to the empty string rather than failing config load — an
/// absent secret should surface later as a validation error with context,
/// not a cryptic env lookup failure.
#[must_use]
pub fn expand_env(raw: &str) -> String {
    VAR_RE
        .replace_all(raw, |caps: &regex::Captures<'_>| std::env::var(&caps[1]).unwrap_or_default())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_variable() {
        // SAFETY: tests run single-threaded within this process for env vars
        // used only here.
        unsafe { std::env::set_var("PINGUIN_TEST_VAR", "hunter2") };
        assert_eq!(expand_env("password: ${PINGUIN_TEST_VAR}"), "password: hunter2");
        unsafe { std::env::remove_var("PINGUIN_TEST_VAR") };
    }

    #[test]
    fn unset_variable_expands_to_empty() {
        assert_eq!(expand_env("key: ${PINGUIN_DEFINITELY_UNSET_VAR}"), "key: ");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(expand_env("host: smtp.acme.test"), "host: smtp.acme.test");
    }
}
