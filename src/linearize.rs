// 最終PDFのリニアライズ (qpdf CLI wrapper)

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use crate::tools::command::{ensure_output, run_checked};
use crate::tools::external::QPDF_EXIT_WARNINGS;

/// Linearize a PDF file using qpdf.
///
/// Creates a linearized copy of the input PDF at the output path.
/// If input_path == output_path, uses qpdf's --replace-input mode.
pub fn linearize(
    qpdf: &Path,
    input_path: &Path,
    output_path: &Path,
    timeout: Duration,
) -> crate::error::Result<()> {
    let accept = |code: i32| code == 0 || code == QPDF_EXIT_WARNINGS;
    if input_path == output_path {
        run_checked(
            qpdf,
            [
                OsStr::new("--linearize"),
                OsStr::new("--replace-input"),
                input_path.as_os_str(),
            ],
            timeout,
            accept,
        )?;
    } else {
        run_checked(
            qpdf,
            [
                OsStr::new("--linearize"),
                input_path.as_os_str(),
                output_path.as_os_str(),
            ],
            timeout,
            accept,
        )?;
    }
    ensure_output(output_path, "qpdf")
}

/// Linearize a PDF in-place (replaces the original file).
pub fn linearize_in_place(qpdf: &Path, path: &Path, timeout: Duration) -> crate::error::Result<()> {
    linearize(qpdf, path, path, timeout)
}
