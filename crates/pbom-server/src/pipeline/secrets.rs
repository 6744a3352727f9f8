//! Secret reference scanning of workflow definitions.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Secret provided to every run by GitHub itself.
const IMPLICIT_TOKEN: &str = "GITHUB_TOKEN";

static SECRET_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{\s*secrets\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
});

/// Returns the names of all secrets referenced as `${{ secrets.NAME }}`,
/// deduplicated and sorted, without the implicit `GITHUB_TOKEN`.
pub fn scan_secrets(workflow: &str) -> Vec<String> {
    SECRET_REFERENCE
        .captures_iter(workflow)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_str())
        .filter(|name| *name != IMPLICIT_TOKEN)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}
