use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::marker::LineScope;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pdftk_path: PathBuf,
    pub qpdf_path: PathBuf,
    pub tool_timeout_secs: u64,
    pub header_scope: LineScope,
    pub compress_output: bool,
    pub linearize: bool,
    pub keep_intermediates: bool,
    pub report_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            pdftk_path: PathBuf::from("pdftk"),
            qpdf_path: PathBuf::from("qpdf"),
            tool_timeout_secs: 120,
            header_scope: LineScope::default(),
            compress_output: true,
            linearize: false,
            keep_intermediates: false,
            report_path: None,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::UnmarkError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::UnmarkError::config(format!(
                "Failed to read settings file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// 外部ツール1回あたりのタイムアウト。
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.tool_timeout_secs == 0 {
            return Err(crate::error::UnmarkError::config(
                "tool_timeout_secs must be greater than 0",
            ));
        }
        Ok(())
    }
}
