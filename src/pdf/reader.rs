use std::collections::BTreeSet;
use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use serde::Serialize;

use crate::error::UnmarkError;

/// コンテンツストリームの持ち主。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOwner {
    /// ページの /Contents (1-indexed ページ番号)
    Page(u32),
    /// ページから到達可能な Form XObject (1-indexed ページ番号)
    Form(u32),
}

/// 編集対象のコンテンツストリーム1本。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentStreamRef {
    pub object_id: ObjectId,
    pub owner: StreamOwner,
}

pub struct PdfReader {
    doc: Document,
}

impl PdfReader {
    /// 展開済みPDFを開いてPdfReaderを作成する。
    ///
    /// lopdfで読めない場合は `NoObjectModelError` を返す。
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path).map_err(|e| {
            UnmarkError::no_object_model(format!("{}: {e}", path.display()))
        })?;
        Ok(Self { doc })
    }

    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// 内部のlopdf Documentを取り出す。
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// ページツリーから到達可能な全コンテンツストリームを列挙する。
    ///
    /// 各ページの /Contents と、Resources から（再帰的に）参照される
    /// Form XObject を含む。同じオブジェクトは一度だけ返す。
    pub fn content_streams(&self) -> crate::error::Result<Vec<ContentStreamRef>> {
        let mut seen: BTreeSet<ObjectId> = BTreeSet::new();
        let mut streams = Vec::new();

        for (page_num, page_id) in self.doc.get_pages() {
            for object_id in self.doc.get_page_contents(page_id) {
                if seen.insert(object_id) {
                    streams.push(ContentStreamRef {
                        object_id,
                        owner: StreamOwner::Page(page_num),
                    });
                }
            }

            let mut pending: Vec<ObjectId> = Vec::new();
            let (resource_dict, resource_ids) = self.doc.get_page_resources(page_id)?;
            if let Some(dict) = resource_dict {
                self.collect_form_ids(dict, &mut pending);
            }
            for res_id in resource_ids {
                let dict = self.doc.get_dictionary(res_id)?;
                self.collect_form_ids(dict, &mut pending);
            }

            // Formの中のFormもたどる（循環参照は seen で止める）
            while let Some(form_id) = pending.pop() {
                if !seen.insert(form_id) {
                    continue;
                }
                streams.push(ContentStreamRef {
                    object_id: form_id,
                    owner: StreamOwner::Form(page_num),
                });
                if let Some(dict) = self.form_resources(form_id) {
                    self.collect_form_ids(dict, &mut pending);
                }
            }
        }

        Ok(streams)
    }

    /// Form XObject自身の /Resources 辞書を返す。
    fn form_resources(&self, form_id: ObjectId) -> Option<&lopdf::Dictionary> {
        let stream = self.doc.get_object(form_id).ok()?.as_stream().ok()?;
        match stream.dict.get(b"Resources").ok()? {
            Object::Dictionary(dict) => Some(dict),
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            _ => None,
        }
    }

    /// リソース辞書のXObjectエントリから Subtype=Form のオブジェクトIDを収集する。
    ///
    /// 間接参照されていないXObjectはIDを持たないため対象外。
    fn collect_form_ids(&self, dict: &lopdf::Dictionary, ids: &mut Vec<ObjectId>) {
        let xobject_dict = match dict.get(b"XObject") {
            Ok(Object::Dictionary(d)) => d,
            Ok(Object::Reference(id)) => match self.doc.get_dictionary(*id) {
                Ok(d) => d,
                Err(_) => return,
            },
            _ => return,
        };

        for (_name, value) in xobject_dict.iter() {
            let Object::Reference(id) = value else {
                continue;
            };
            let Ok(stream) = self.doc.get_object(*id).and_then(Object::as_stream) else {
                continue;
            };
            if let Ok(subtype) = stream.dict.get(b"Subtype").and_then(Object::as_name)
                && subtype == b"Form"
            {
                ids.push(*id);
            }
        }
    }
}
