// 設定ファイル解析テスト

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pdf_unmark::config::load_settings;
use pdf_unmark::config::settings::Settings;
use pdf_unmark::error::UnmarkError;
use pdf_unmark::marker::LineScope;

// ============================================================
// 1. デフォルト値
// ============================================================

#[test]
fn test_settings_default() {
    let settings = Settings::default();
    assert_eq!(settings.pdftk_path, PathBuf::from("pdftk"));
    assert_eq!(settings.qpdf_path, PathBuf::from("qpdf"));
    assert_eq!(settings.tool_timeout(), Duration::from_secs(120));
    assert_eq!(settings.header_scope, LineScope { before: 0, after: 0 });
    assert!(settings.compress_output);
    assert!(!settings.linearize);
    assert!(!settings.keep_intermediates);
    assert!(settings.report_path.is_none());
}

#[test]
fn test_settings_empty_yaml_uses_defaults() {
    let settings = Settings::from_yaml("{}").expect("should parse empty mapping");
    assert_eq!(settings.tool_timeout_secs, 120);
    assert!(settings.compress_output);
}

// ============================================================
// 2. YAML 解析
// ============================================================

#[test]
fn test_settings_full_yaml() {
    let yaml = r#"
pdftk_path: /opt/pdftk/bin/pdftk
qpdf_path: /usr/local/bin/qpdf
tool_timeout_secs: 30
header_scope:
  before: 2
  after: 3
compress_output: false
linearize: true
keep_intermediates: true
report_path: /tmp/report.json
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse");
    assert_eq!(settings.pdftk_path, PathBuf::from("/opt/pdftk/bin/pdftk"));
    assert_eq!(settings.qpdf_path, PathBuf::from("/usr/local/bin/qpdf"));
    assert_eq!(settings.tool_timeout(), Duration::from_secs(30));
    assert_eq!(settings.header_scope, LineScope { before: 2, after: 3 });
    assert!(!settings.compress_output);
    assert!(settings.linearize);
    assert!(settings.keep_intermediates);
    assert_eq!(settings.report_path, Some(PathBuf::from("/tmp/report.json")));
}

#[test]
fn test_settings_partial_header_scope() {
    let settings = Settings::from_yaml("header_scope:\n  after: 4\n").expect("should parse");
    assert_eq!(settings.header_scope, LineScope { before: 0, after: 4 });
}

#[test]
fn test_settings_zero_timeout_rejected() {
    let result = Settings::from_yaml("tool_timeout_secs: 0\n");
    assert!(matches!(result, Err(UnmarkError::ConfigError(_))));
}

#[test]
fn test_settings_invalid_yaml() {
    let result = Settings::from_yaml("tool_timeout_secs: [not, a, number]\n");
    assert!(matches!(result, Err(UnmarkError::ConfigError(_))));
}

// ============================================================
// 3. load_settings
// ============================================================

#[test]
fn test_load_settings_without_path() {
    let settings = load_settings(None).expect("defaults");
    assert_eq!(settings.tool_timeout_secs, 120);
}

#[test]
fn test_load_settings_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    writeln!(file, "tool_timeout_secs: 5").expect("write");
    writeln!(file, "linearize: true").expect("write");

    let settings = load_settings(Some(file.path())).expect("should load");
    assert_eq!(settings.tool_timeout(), Duration::from_secs(5));
    assert!(settings.linearize);
}

#[test]
fn test_load_settings_missing_file() {
    let result = load_settings(Some(Path::new("/nonexistent/settings.yaml")));
    match result {
        Err(UnmarkError::ConfigError(msg)) => assert!(msg.contains("settings.yaml")),
        other => panic!("expected ConfigError, got: {other:?}"),
    }
}
