use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::settings::Settings;
use crate::tools::Toolchain;
use crate::tools::command::{ensure_output, run_checked};

/// qpdf exits with 3 when it succeeded but emitted warnings.
pub(crate) const QPDF_EXIT_WARNINGS: i32 = 3;

/// [`Toolchain`] backed by the `pdftk` and `qpdf` command line tools.
#[derive(Debug, Clone)]
pub struct ExternalToolchain {
    pub pdftk: PathBuf,
    pub qpdf: PathBuf,
    pub timeout: Duration,
}

impl ExternalToolchain {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pdftk: settings.pdftk_path.clone(),
            qpdf: settings.qpdf_path.clone(),
            timeout: settings.tool_timeout(),
        }
    }

    /// `pdftk <input> output <output> <mode>`
    fn pdftk(&self, input: &Path, output: &Path, mode: &str) -> crate::error::Result<()> {
        run_checked(
            &self.pdftk,
            [
                input.as_os_str(),
                OsStr::new("output"),
                output.as_os_str(),
                OsStr::new(mode),
            ],
            self.timeout,
            |code| code == 0,
        )?;
        ensure_output(output, "pdftk")
    }
}

impl Toolchain for ExternalToolchain {
    fn normalize(&self, input: &Path, output: &Path) -> crate::error::Result<()> {
        self.pdftk(input, output, "uncompress")
    }

    fn rebuild(&self, input: &Path, output: &Path) -> crate::error::Result<()> {
        self.pdftk(input, output, "compress")
    }

    fn expand(&self, input: &Path, output: &Path) -> crate::error::Result<()> {
        run_checked(
            &self.qpdf,
            [
                OsStr::new("--qdf"),
                OsStr::new("--object-streams=disable"),
                input.as_os_str(),
                output.as_os_str(),
            ],
            self.timeout,
            |code| code == 0 || code == QPDF_EXIT_WARNINGS,
        )?;
        ensure_output(output, "qpdf")
    }
}
