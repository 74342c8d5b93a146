use once_cell::sync::Lazy;
use regex::Regex;

use crate::store::StringMap;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid regex"));

/// Replaces every literal `{{key}}` with its value. One pass per variable over
/// the input; placeholders without a matching variable are left untouched.
pub fn substitute_variables(input: &str, variables: &StringMap) -> String {
    let mut output = input.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{{{key}}}}}");
        if output.contains(&placeholder) {
            output = output.replace(&placeholder, value);
        }
    }
    output
}

/// Names of `{{...}}` placeholders still present in `input`.
pub fn unresolved_variables(input: &str) -> Vec<String> {
    VARIABLE_PATTERN
        .captures_iter(input)
        .map(|captures| captures[1].to_string())
        .collect()
}
