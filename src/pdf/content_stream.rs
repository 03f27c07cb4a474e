use lopdf::content::{Content, Operation};
use lopdf::{Object, ObjectId};
use serde::Serialize;

use crate::error::UnmarkError;
use crate::marker::CompiledHexMarker;

/// 文字列を描画するオペレータ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShowText {
    /// `string Tj`
    Tj,
    /// `array TJ`
    TjArray,
    /// `string '` (T* の後に Tj)
    NextLine,
    /// `aw ac string "` (Tw, Tc, T* の後に Tj)
    NextLineSpaced,
}

impl ShowText {
    pub fn from_operator(operator: &str) -> Option<Self> {
        match operator {
            "Tj" => Some(ShowText::Tj),
            "TJ" => Some(ShowText::TjArray),
            "'" => Some(ShowText::NextLine),
            "\"" => Some(ShowText::NextLineSpaced),
            _ => None,
        }
    }
}

/// ストリーム内で検出・削除されたウォーターマーク描画1件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HexMatch {
    pub object_id: ObjectId,
    /// 元のオペレータ列におけるインデックス
    pub operator_index: usize,
    pub operator: ShowText,
    pub marker: &'static str,
}

/// コンテンツストリームのバイト列をオペレータ列にデコードする。
///
/// 空ストリームは空のオペレータ列として扱う。
pub fn decode_operations(
    object_id: ObjectId,
    content_bytes: &[u8],
) -> crate::error::Result<Vec<Operation>> {
    if content_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }
    Content::decode(content_bytes)
        .map(|content| content.operations)
        .map_err(|e| UnmarkError::marker_not_decodable(object_id, e.to_string()))
}

/// オペレータ列をコンテンツストリームのバイト列にエンコードする。
pub fn encode_operations(operations: Vec<Operation>) -> crate::error::Result<Vec<u8>> {
    Content { operations }
        .encode()
        .map_err(|e| UnmarkError::pdf_write(e.to_string()))
}

/// 文字列オペランドをデコード済みバイト列として取り出す。
///
/// lopdfは `(...)` と `<...>` のどちらも同じ `Object::String` に展開するため、
/// 比較は常に元の表記ではなくデコード後のバイト列で行う。
pub fn decode_string_operand(object_id: ObjectId, operand: &Object) -> crate::error::Result<&[u8]> {
    match operand {
        Object::String(bytes, _) => Ok(bytes.as_slice()),
        other => Err(UnmarkError::marker_not_decodable(
            object_id,
            format!("expected string operand, got {:?}", other),
        )),
    }
}

/// 文字列描画オペレータが描く文字列全体をデコードする。
///
/// TJ配列は文字列要素を連結し、位置調整値は無視する。
pub fn shown_bytes(
    object_id: ObjectId,
    kind: ShowText,
    operation: &Operation,
) -> crate::error::Result<Vec<u8>> {
    let operand = operation.operands.last().ok_or_else(|| {
        UnmarkError::marker_not_decodable(
            object_id,
            format!("'{}' without operands", operation.operator),
        )
    })?;

    if kind == ShowText::NextLineSpaced && operation.operands.len() != 3 {
        return Err(UnmarkError::marker_not_decodable(
            object_id,
            format!("'\"' expects 3 operands, got {}", operation.operands.len()),
        ));
    }

    match kind {
        ShowText::TjArray => {
            let elements = operand.as_array().map_err(|_| {
                UnmarkError::marker_not_decodable(object_id, "TJ operand is not an array")
            })?;
            let mut shown = Vec::new();
            for element in elements {
                match element {
                    Object::Integer(_) | Object::Real(_) => {}
                    other => shown.extend_from_slice(decode_string_operand(object_id, other)?),
                }
            }
            Ok(shown)
        }
        _ => Ok(decode_string_operand(object_id, operand)?.to_vec()),
    }
}

/// ウォーターマーク描画を取り除いたときに代わりに残すオペレータ。
///
/// `'` と `"` は行送り・間隔設定の副作用を持つため、それだけを残す。
fn replacement_for(kind: ShowText, operation: &Operation) -> Vec<Operation> {
    match kind {
        ShowText::Tj | ShowText::TjArray => Vec::new(),
        ShowText::NextLine => vec![Operation::new("T*", vec![])],
        ShowText::NextLineSpaced => vec![
            Operation::new("Tw", vec![operation.operands[0].clone()]),
            Operation::new("Tc", vec![operation.operands[1].clone()]),
            Operation::new("T*", vec![]),
        ],
    }
}

/// オペレータ列からウォーターマーク文字列の描画を取り除く。
///
/// デコードできない文字列オペランドが1つでもあればエラーを返し、
/// 呼び出し側はそのストリームを変更せずに残す。
pub fn remove_watermark_operations(
    object_id: ObjectId,
    operations: Vec<Operation>,
    markers: &[CompiledHexMarker],
) -> crate::error::Result<(Vec<Operation>, Vec<HexMatch>)> {
    let mut kept = Vec::with_capacity(operations.len());
    let mut matches = Vec::new();

    for (operator_index, operation) in operations.into_iter().enumerate() {
        let Some(kind) = ShowText::from_operator(&operation.operator) else {
            kept.push(operation);
            continue;
        };

        let shown = shown_bytes(object_id, kind, &operation)?;
        match markers.iter().find(|m| m.target == shown) {
            Some(marker) => {
                kept.extend(replacement_for(kind, &operation));
                matches.push(HexMatch {
                    object_id,
                    operator_index,
                    operator: kind,
                    marker: marker.label,
                });
            }
            None => kept.push(operation),
        }
    }

    Ok((kept, matches))
}

/// コンテンツストリームのバイト列からウォーターマーク描画を取り除く。
///
/// 一致がなければ `None` を返し、元のバイト列はそのまま使われる。
pub fn strip_watermarks(
    object_id: ObjectId,
    content_bytes: &[u8],
    markers: &[CompiledHexMarker],
) -> crate::error::Result<Option<(Vec<u8>, Vec<HexMatch>)>> {
    let operations = decode_operations(object_id, content_bytes)?;
    let (kept, matches) = remove_watermark_operations(object_id, operations, markers)?;
    if matches.is_empty() {
        return Ok(None);
    }
    Ok(Some((encode_operations(kept)?, matches)))
}

/// BT/ET と q/Q の対応が取れているかを確認する。
pub fn is_balanced(operations: &[Operation]) -> bool {
    let mut text_depth = 0i64;
    let mut graphics_depth = 0i64;
    for op in operations {
        match op.operator.as_str() {
            "BT" => text_depth += 1,
            "ET" => text_depth -= 1,
            "q" => graphics_depth += 1,
            "Q" => graphics_depth -= 1,
            _ => {}
        }
        if text_depth < 0 || graphics_depth < 0 {
            return false;
        }
    }
    text_depth == 0 && graphics_depth == 0
}
