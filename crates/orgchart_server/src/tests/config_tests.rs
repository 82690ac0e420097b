use std::collections::HashMap;

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    assert_eq!(resolve_settings(None, env_from(&[])), Settings::default());
}

#[test]
fn file_values_are_overridden_by_env() {
    let file = r#"
bind_addr = "0.0.0.0:9000"
token = "from-file"
seed_path = "seed/acme.json"
"#;
    let settings = resolve_settings(
        Some(file),
        env_from(&[("ORGCHART__SERVER_TOKEN", "from-env")]),
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.token.as_deref(), Some("from-env"));
    assert_eq!(settings.seed_path, Some(PathBuf::from("seed/acme.json")));
}

#[test]
fn prefixed_bind_wins_over_plain_and_blank_token_disables_auth() {
    let settings = resolve_settings(
        Some(r#"token = "secret""#),
        env_from(&[
            ("SERVER_BIND", "127.0.0.1:1"),
            ("ORGCHART__BIND_ADDR", "127.0.0.1:2"),
            ("ORGCHART__SERVER_TOKEN", "  "),
        ]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:2");
    assert!(settings.token.is_none());
}

#[test]
fn malformed_file_is_ignored() {
    let settings = resolve_settings(Some("bind_addr = ["), env_from(&[]));
    assert_eq!(settings, Settings::default());
}
