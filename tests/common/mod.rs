// テスト用PDFフィクスチャ

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

pub const WATERMARK_FOR: &str = "For personal,";
pub const WATERMARK_NONCOMM: &str = " non-commercial use only.";

/// テキストをUTF-16BEバイト列に変換する。
pub fn utf16be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
}

pub fn literal(bytes: impl Into<Vec<u8>>) -> Object {
    Object::String(bytes.into(), StringFormat::Literal)
}

pub fn hex_string(bytes: impl Into<Vec<u8>>) -> Object {
    Object::String(bytes.into(), StringFormat::Hexadecimal)
}

/// `BT /F1 <size> Tf <x> <y> Td <string> Tj ET`
pub fn show_text(x: i64, y: i64, string: Object) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![string]),
        Operation::new("ET", vec![]),
    ]
}

/// 元の出版社PDFと同じ形の透かしブロック:
/// `q 0 0 0.502 rg BT ... <hex> Tj ET Q`
pub fn watermark_block(y: i64, string: Object) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.502)],
        ),
    ];
    ops.extend(show_text(200, y, string));
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// 各ページのオペレータ列からPDFを組み立てる。
///
/// `form`: (ページ番号1-indexed, Form XObjectの中身)。指定ページのResourcesに /Fm1 として登録する。
pub fn build_pdf(pages: Vec<Vec<Operation>>, form: Option<(usize, Vec<Operation>)>) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let form_entry = form.map(|(page_num, ops)| {
        let bytes = Content { operations: ops }.encode().expect("encode form");
        let form_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            },
            bytes,
        );
        (page_num, doc.add_object(form_stream))
    });

    let mut kids: Vec<Object> = Vec::new();
    for (idx, ops) in pages.into_iter().enumerate() {
        let page_num = idx + 1;
        let bytes = Content { operations: ops }.encode().expect("encode content");
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        if let Some((form_page, form_id)) = form_entry
            && form_page == page_num
        {
            resources.set("XObject", dictionary! { "Fm1" => form_id });
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn save_pdf(mut doc: Document, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    doc.save(&path).expect("save PDF");
    path
}

/// ストリームのデコード済み中身（フィルターなしならそのまま）。
pub fn stream_bytes(doc: &Document, id: ObjectId) -> Vec<u8> {
    let stream = doc
        .get_object(id)
        .and_then(Object::as_stream)
        .expect("stream object");
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

/// 指定ページ(1-indexed)のコンテンツストリームをオペレータ列として返す。
pub fn page_operations(doc: &Document, page_num: u32) -> Vec<Operation> {
    let page_id = doc.get_pages()[&page_num];
    let mut ops = Vec::new();
    for id in doc.get_page_contents(page_id) {
        let bytes = stream_bytes(doc, id);
        ops.extend(Content::decode(&bytes).expect("decode content").operations);
    }
    ops
}

/// ドキュメント内の全 Form XObject のオペレータ列。
pub fn form_operations(doc: &Document) -> Vec<Operation> {
    let mut ops = Vec::new();
    for (id, object) in &doc.objects {
        if let Object::Stream(stream) = object
            && stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|s| s == b"Form")
        {
            let bytes = stream_bytes(doc, *id);
            ops.extend(Content::decode(&bytes).expect("decode form").operations);
        }
    }
    ops
}

/// オペレータ列中のTj/TJで描画される文字列（デコード済み）。
pub fn shown_strings(ops: &[Operation]) -> Vec<Vec<u8>> {
    let mut shown = Vec::new();
    for op in ops {
        match op.operator.as_str() {
            "Tj" | "'" | "\"" => {
                if let Some(Object::String(bytes, _)) = op.operands.last() {
                    shown.push(bytes.clone());
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let mut joined = Vec::new();
                    for item in items {
                        if let Object::String(bytes, _) = item {
                            joined.extend_from_slice(bytes);
                        }
                    }
                    shown.push(joined);
                }
            }
            _ => {}
        }
    }
    shown
}

pub fn is_watermark(bytes: &[u8]) -> bool {
    bytes == utf16be(WATERMARK_FOR).as_slice() || bytes == utf16be(WATERMARK_NONCOMM).as_slice()
}

pub fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
