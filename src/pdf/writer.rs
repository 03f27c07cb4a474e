use std::path::Path;

use lopdf::Document;

use crate::error::UnmarkError;

/// PDFドキュメントをバイト列として出力する。
pub fn save_to_bytes(doc: &mut Document) -> crate::error::Result<Vec<u8>> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| UnmarkError::pdf_write(e.to_string()))?;
    Ok(buf)
}

/// PDFドキュメントを指定パスに書き出す。
///
/// シリアライズが完了してからファイルを作るため、失敗時に中途半端なファイルは残らない。
pub fn save_to_file(doc: &mut Document, path: &Path) -> crate::error::Result<()> {
    let bytes = save_to_bytes(doc)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
