// Stage 5: 展開済みPDFのコンテンツストリームからhex文字列のウォーターマークを削除する

use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use serde::Serialize;

use crate::error::UnmarkError;
use crate::marker::CompiledHexMarker;
use crate::pdf::content_stream::{HexMatch, strip_watermarks};
use crate::pdf::reader::{ContentStreamRef, PdfReader};

/// Options for the final write of the stripped document.
#[derive(Debug, Clone, Copy)]
pub struct HexStripOptions {
    /// Flate-compress streams that are left without a filter.
    pub compress_output: bool,
}

impl Default for HexStripOptions {
    fn default() -> Self {
        Self {
            compress_output: true,
        }
    }
}

/// A content stream left untouched because it could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStream {
    pub object_id: ObjectId,
    pub reason: String,
}

/// Outcome of the hex watermark stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HexStripReport {
    pub pages: u32,
    pub streams_scanned: usize,
    pub streams_modified: usize,
    pub streams_compressed: usize,
    pub skipped: Vec<SkippedStream>,
    pub matches: Vec<HexMatch>,
}

/// Open `input`, strip the watermark from every reachable content stream and save to `output`.
///
/// Fails with `NoObjectModelError` if `input` cannot be opened. A stream that
/// cannot be decoded is logged, recorded in the report and left as it was.
pub fn strip_hex_watermarks(
    input: &Path,
    output: &Path,
    markers: &[CompiledHexMarker],
    options: HexStripOptions,
) -> crate::error::Result<HexStripReport> {
    let reader = PdfReader::open(input)?;
    let pages = reader.page_count();
    let streams = reader.content_streams()?;
    let mut doc = reader.into_document();

    let mut report = strip_document(&mut doc, &streams, markers);
    report.pages = pages;

    if options.compress_output {
        report.streams_compressed = crate::pdf::optimizer::compress_streams(&mut doc);
    }

    crate::pdf::writer::save_to_file(&mut doc, output)?;
    Ok(report)
}

/// Strip watermarks from the listed content streams of an in-memory document.
pub fn strip_document(
    doc: &mut Document,
    streams: &[ContentStreamRef],
    markers: &[CompiledHexMarker],
) -> HexStripReport {
    let mut report = HexStripReport::default();

    for stream_ref in streams {
        report.streams_scanned += 1;
        match strip_stream(doc, stream_ref.object_id, markers) {
            Ok(matches) if matches.is_empty() => {}
            Ok(matches) => {
                tracing::debug!(
                    object = ?stream_ref.object_id,
                    owner = ?stream_ref.owner,
                    count = matches.len(),
                    "removed watermark operators"
                );
                report.streams_modified += 1;
                report.matches.extend(matches);
            }
            Err(e) => {
                tracing::warn!(owner = ?stream_ref.owner, "{e}; stream left untouched");
                report.skipped.push(SkippedStream {
                    object_id: stream_ref.object_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

/// Rewrite one stream object in place. Nothing is written unless a watermark matched.
fn strip_stream(
    doc: &mut Document,
    object_id: ObjectId,
    markers: &[CompiledHexMarker],
) -> crate::error::Result<Vec<HexMatch>> {
    let stream = doc
        .get_object_mut(object_id)
        .and_then(Object::as_stream_mut)
        .map_err(|e| UnmarkError::marker_not_decodable(object_id, e.to_string()))?;

    let content = stream
        .decompressed_content()
        .or_else(|e| {
            // decompressed_content fails for streams that carry no filter at all
            if stream.dict.get(b"Filter").is_err() {
                Ok(stream.content.clone())
            } else {
                Err(e)
            }
        })
        .map_err(|e| UnmarkError::marker_not_decodable(object_id, e.to_string()))?;

    match strip_watermarks(object_id, &content, markers)? {
        Some((stripped, matches)) => {
            stream.set_plain_content(stripped);
            Ok(matches)
        }
        None => Ok(Vec::new()),
    }
}
