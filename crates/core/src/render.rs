//! Config template rendering.
//!
//! [`render`] is a pure function: a template with `{{key}}`
//! placeholders plus a closed parameter set produces deterministic
//! text, so re-rendering with identical params yields byte-identical
//! output and configs can be verified by diff. Placeholders without a
//! parameter are an error, never silently left in place.
//!
//! The inverse helpers ([`parse_ini`], [`parse_env_file`]) read the
//! generated formats back: env files feed launched process
//! environments, and the INI parser backs round-trip verification.

use std::collections::BTreeMap;

use crate::error::BootstrapError;

/// Substitute `{{key}}` placeholders in `template` from `params`.
///
/// Every placeholder must resolve; the first unresolved key aborts with
/// [`BootstrapError::MissingKey`]. Parameters the template never
/// mentions are allowed.
pub fn render(template: &str, params: &BTreeMap<String, String>) -> Result<String, BootstrapError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| BootstrapError::Config(
            "Unterminated '{{' placeholder in template".into(),
        ))?;
        let key = after[..end].trim();
        let value = params
            .get(key)
            .ok_or_else(|| BootstrapError::MissingKey { key: key.to_string() })?;
        out.push_str(value);
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse an INI-style document into `(section, key) -> value`.
///
/// Keys before any `[section]` header land in the empty section.
/// Blank lines and `;`/`#` comment lines are skipped. Values keep
/// everything after the first `=`, trimmed.
pub fn parse_ini(text: &str) -> BTreeMap<(String, String), String> {
    let mut out = BTreeMap::new();
    let mut section = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim().to_string();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            out.insert(
                (section.clone(), key.trim().to_string()),
                value.trim().to_string(),
            );
        }
    }

    out
}

/// Parse a `KEY=VALUE` env file into a map.
///
/// Same line rules as [`parse_ini`] minus sections. Lines without `=`
/// are ignored.
pub fn parse_env_file(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            out.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // -- render ---------------------------------------------------------------

    #[test]
    fn substitutes_placeholders() {
        let text = render(
            "HTTP_PORT = {{http_port}}\nDOMAIN = {{domain}}\n",
            &params(&[("http_port", "3000"), ("domain", "localhost")]),
        )
        .unwrap();
        assert_eq!(text, "HTTP_PORT = 3000\nDOMAIN = localhost\n");
    }

    #[test]
    fn same_inputs_give_identical_bytes() {
        let p = params(&[("a", "1"), ("b", "2")]);
        let t = "[x]\nA = {{a}}\nB = {{b}}\n";
        assert_eq!(render(t, &p).unwrap(), render(t, &p).unwrap());
    }

    #[test]
    fn missing_key_is_an_error() {
        let result = render("PORT = {{port}}\n", &params(&[]));
        assert_matches!(result, Err(BootstrapError::MissingKey { key }) if key == "port");
    }

    #[test]
    fn unused_params_are_fine() {
        let text = render("static\n", &params(&[("unused", "x")])).unwrap();
        assert_eq!(text, "static\n");
    }

    #[test]
    fn repeated_placeholder_resolves_every_time() {
        let text = render(
            "{{secret}} and again {{secret}}",
            &params(&[("secret", "s")]),
        )
        .unwrap();
        assert_eq!(text, "s and again s");
    }

    #[test]
    fn unterminated_placeholder_rejected() {
        let result = render("PORT = {{port\n", &params(&[("port", "1")]));
        assert_matches!(result, Err(BootstrapError::Config(_)));
    }

    #[test]
    fn whitespace_inside_placeholder_tolerated() {
        let text = render("{{ key }}", &params(&[("key", "v")])).unwrap();
        assert_eq!(text, "v");
    }

    // -- parse_ini ------------------------------------------------------------

    #[test]
    fn ini_round_trip_recovers_params() {
        let p = params(&[("http_port", "3000"), ("domain", "git.test")]);
        let rendered = render(
            "[server]\nHTTP_PORT = {{http_port}}\nDOMAIN = {{domain}}\n",
            &p,
        )
        .unwrap();

        let parsed = parse_ini(&rendered);
        assert_eq!(
            parsed[&("server".to_string(), "HTTP_PORT".to_string())],
            "3000"
        );
        assert_eq!(
            parsed[&("server".to_string(), "DOMAIN".to_string())],
            "git.test"
        );
    }

    #[test]
    fn ini_skips_comments_and_blank_lines() {
        let parsed = parse_ini("; comment\n\n# more\n[s]\nK = v\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[&("s".to_string(), "K".to_string())], "v");
    }

    #[test]
    fn ini_keys_before_section_use_empty_section() {
        let parsed = parse_ini("TOP = 1\n[s]\nK = 2\n");
        assert_eq!(parsed[&(String::new(), "TOP".to_string())], "1");
    }

    #[test]
    fn ini_value_keeps_inner_equals() {
        let parsed = parse_ini("[db]\nDSN = postgres://u:p@h/db?sslmode=disable\n");
        assert_eq!(
            parsed[&("db".to_string(), "DSN".to_string())],
            "postgres://u:p@h/db?sslmode=disable"
        );
    }

    // -- parse_env_file -------------------------------------------------------

    #[test]
    fn env_file_parses_pairs() {
        let parsed = parse_env_file("# drone\nDRONE_RPC_HOST=localhost\nDRONE_RPC_PROTO=http\n");
        assert_eq!(parsed["DRONE_RPC_HOST"], "localhost");
        assert_eq!(parsed["DRONE_RPC_PROTO"], "http");
    }

    #[test]
    fn env_file_ignores_malformed_lines() {
        let parsed = parse_env_file("JUSTAWORD\nGOOD=1\n");
        assert_eq!(parsed.len(), 1);
    }
}
