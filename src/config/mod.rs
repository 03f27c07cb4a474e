pub mod settings;

use settings::Settings;
use std::path::Path;

/// 設定ファイルを読み込む。
///
/// パスが指定されていればそのYAMLを読み込み、
/// 指定がなければデフォルト設定を返す。
pub fn load_settings(settings_path: Option<&Path>) -> crate::error::Result<Settings> {
    match settings_path {
        Some(path) => Settings::from_file(path),
        None => Ok(Settings::default()),
    }
}
