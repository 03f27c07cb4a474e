// 外部コマンド実行（タイムアウト・終了コード）テスト

#![cfg(unix)]

use std::path::Path;
use std::time::{Duration, Instant};

use pdf_unmark::error::UnmarkError;
use pdf_unmark::tools::Toolchain;
use pdf_unmark::tools::command::{ensure_output, run_checked, run_with_timeout};
use pdf_unmark::tools::external::ExternalToolchain;

fn sh() -> &'static Path {
    Path::new("sh")
}

#[test]
fn test_captures_output() {
    let output = run_with_timeout(sh(), ["-c", "echo out; echo err >&2"], Duration::from_secs(10))
        .expect("run sh");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
    assert_eq!(output.stderr_text(), "err");
}

#[test]
fn test_nonzero_exit_is_external_tool_error() {
    let err = run_checked(
        sh(),
        ["-c", "echo broken xref >&2; exit 2"],
        Duration::from_secs(10),
        |code| code == 0,
    )
    .expect_err("should fail");

    match err {
        UnmarkError::ExternalToolError(msg) => {
            assert!(msg.contains("exit code 2"), "message: {msg}");
            assert!(msg.contains("broken xref"), "message: {msg}");
        }
        other => panic!("expected ExternalToolError, got: {other}"),
    }
}

#[test]
fn test_accepted_exit_code() {
    let result = run_checked(sh(), ["-c", "exit 3"], Duration::from_secs(10), |code| {
        code == 0 || code == 3
    });
    assert!(result.is_ok());
}

#[test]
fn test_timeout_kills_child() {
    let started = Instant::now();
    let err = run_with_timeout(sh(), ["-c", "sleep 30"], Duration::from_millis(300))
        .expect_err("should time out");

    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        UnmarkError::ExternalToolError(msg) => assert!(msg.contains("timed out"), "message: {msg}"),
        other => panic!("expected ExternalToolError, got: {other}"),
    }
}

#[test]
fn test_large_output_does_not_block() {
    // パイプバッファ(64KiB)を超える出力でもデッドロックしない
    let output = run_with_timeout(
        sh(),
        ["-c", "head -c 300000 /dev/zero"],
        Duration::from_secs(10),
    )
    .expect("run");
    assert_eq!(output.stdout.len(), 300_000);
}

#[test]
fn test_missing_program() {
    let err = run_with_timeout(
        Path::new("/nonexistent/bin/pdftk"),
        ["--version"],
        Duration::from_secs(1),
    )
    .expect_err("should fail");
    assert!(matches!(err, UnmarkError::ExternalToolError(_)));
}

#[test]
fn test_ensure_output() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let missing = dir.path().join("missing.pdf");
    assert!(matches!(
        ensure_output(&missing, "pdftk"),
        Err(UnmarkError::ExternalToolError(_))
    ));

    let empty = dir.path().join("empty.pdf");
    std::fs::write(&empty, b"").expect("write");
    assert!(ensure_output(&empty, "pdftk").is_err());

    let full = dir.path().join("full.pdf");
    std::fs::write(&full, b"%PDF-1.5").expect("write");
    assert!(ensure_output(&full, "pdftk").is_ok());
}

#[test]
fn test_toolchain_with_missing_binaries() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("in.pdf");
    std::fs::write(&input, b"%PDF-1.5").expect("write");
    let output = dir.path().join("out.pdf");

    let toolchain = ExternalToolchain {
        pdftk: "/nonexistent/pdftk".into(),
        qpdf: "/nonexistent/qpdf".into(),
        timeout: Duration::from_secs(5),
    };

    assert!(matches!(
        toolchain.normalize(&input, &output),
        Err(UnmarkError::ExternalToolError(_))
    ));
    assert!(matches!(
        toolchain.expand(&input, &output),
        Err(UnmarkError::ExternalToolError(_))
    ));
    assert!(!output.exists());
}

#[test]
fn test_toolchain_tool_exiting_without_output() {
    // 成功終了しても出力ファイルがなければエラー
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("in.pdf");
    std::fs::write(&input, b"%PDF-1.5").expect("write");
    let output = dir.path().join("out.pdf");

    let toolchain = ExternalToolchain {
        pdftk: "true".into(),
        qpdf: "true".into(),
        timeout: Duration::from_secs(5),
    };

    let err = toolchain.rebuild(&input, &output).expect_err("no output produced");
    match err {
        UnmarkError::ExternalToolError(msg) => assert!(msg.contains("no readable output")),
        other => panic!("expected ExternalToolError, got: {other}"),
    }
}
