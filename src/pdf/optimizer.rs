// 最終PDFのストリーム圧縮

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId};

/// ドキュメント内の未圧縮ストリームにFlateDecode圧縮を適用する。
///
/// 既にフィルターが設定されているストリームとXRefストリームはスキップする。
/// 圧縮したストリーム数を返す。
pub fn compress_streams(doc: &mut Document) -> usize {
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    let mut compressed_count = 0;

    for id in ids {
        let needs_compression = {
            let Some(Object::Stream(stream)) = doc.objects.get(&id) else {
                continue;
            };
            let is_xref = stream
                .dict
                .get(b"Type")
                .and_then(Object::as_name)
                .is_ok_and(|t| t == b"XRef");
            stream.dict.get(b"Filter").is_err() && !is_xref && !stream.content.is_empty()
        };

        if needs_compression {
            let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
                continue;
            };

            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            if encoder.write_all(&stream.content).is_err() {
                continue;
            }
            let Ok(compressed) = encoder.finish() else {
                continue;
            };

            stream.dict.set("Filter", "FlateDecode");
            stream.set_content(compressed);
            compressed_count += 1;
        }
    }

    compressed_count
}
