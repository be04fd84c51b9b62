use crate::error::ExtractError;
use lopdf::Document;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

const DOCX_BODY_PART: &str = "word/document.xml";

/// Raw bytes of an upload together with the name it was sent under.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn read(path: &Path) -> Result<Self, std::io::Error> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self { filename, bytes })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Txt,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lowered = filename.to_ascii_lowercase();
        if lowered.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lowered.ends_with(".docx") {
            Some(Self::Docx)
        } else if lowered.ends_with(".txt") {
            Some(Self::Txt)
        } else {
            None
        }
    }
}

/// Turns an upload into plain text, dispatching on its filename suffix.
///
/// Parser failures never escape as parser types; they come back as
/// [`ExtractError::ExtractionFailed`] carrying the filename and cause.
pub fn extract_text(file: &UploadedFile) -> Result<String, ExtractError> {
    let kind = FileKind::from_filename(&file.filename)
        .ok_or_else(|| ExtractError::UnsupportedFileType(file.filename.clone()))?;

    debug!(filename = %file.filename, ?kind, bytes = file.bytes.len(), "extracting text");

    match kind {
        FileKind::Pdf => extract_pdf(&file.filename, &file.bytes),
        FileKind::Docx => extract_docx(&file.filename, &file.bytes),
        FileKind::Txt => extract_txt(&file.filename, &file.bytes),
    }
}

fn extract_pdf(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let document =
        Document::load_mem(bytes).map_err(|error| ExtractError::failed(filename, error))?;

    let mut text = String::new();
    for page_no in document.get_pages().into_keys() {
        match document.extract_text(&[page_no]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(error) => {
                warn!(filename, page = page_no, %error, "page has no extractable text");
            }
        }
    }

    Ok(text)
}

fn extract_docx(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|error| ExtractError::failed(filename, error))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|error| ExtractError::failed(filename, error))?
        .read_to_string(&mut xml)
        .map_err(|error| ExtractError::failed(filename, error))?;

    let paragraphs =
        docx_paragraphs(&xml).map_err(|error| ExtractError::failed(filename, error))?;
    Ok(paragraphs.join("\n"))
}

/// Paragraphs that are direct children of `w:body`, in document order.
///
/// Table cells and text boxes hold their own `w:p` elements; neither is part
/// of the body text. Inside a body paragraph, run content under drawings,
/// alternate content and property blocks is skipped.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    let mut current: Option<String> = None;
    let mut hidden = 0usize;
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let name = element.local_name();
                match name.as_ref() {
                    b"body" if body_depth.is_none() => body_depth = Some(depth),
                    b"p" if is_body_child(body_depth, depth) => {
                        current = Some(String::new());
                        hidden = 0;
                    }
                    b"t" if current.is_some() && hidden == 0 => in_text_run = true,
                    local if current.is_some() && is_hidden_container(local) => hidden += 1,
                    _ => {}
                }
                depth += 1;
            }
            Event::End(element) => {
                depth = depth.saturating_sub(1);
                let name = element.local_name();
                match name.as_ref() {
                    b"p" if is_body_child(body_depth, depth) => {
                        if let Some(paragraph) = current.take() {
                            paragraphs.push(paragraph);
                        }
                    }
                    b"t" => in_text_run = false,
                    local if current.is_some() && is_hidden_container(local) => {
                        hidden = hidden.saturating_sub(1);
                    }
                    _ => {}
                }
            }
            Event::Empty(element) => match element.local_name().as_ref() {
                b"p" if is_body_child(body_depth, depth) => paragraphs.push(String::new()),
                b"tab" if hidden == 0 => push_to(&mut current, "\t"),
                b"br" | b"cr" if hidden == 0 => push_to(&mut current, "\n"),
                _ => {}
            },
            Event::Text(text) if in_text_run => {
                let unescaped = text.unescape()?;
                push_to(&mut current, &unescaped);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn is_body_child(body_depth: Option<usize>, depth: usize) -> bool {
    body_depth.is_some_and(|body| depth == body + 1)
}

fn is_hidden_container(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"pPr" | b"rPr" | b"txbxContent" | b"AlternateContent" | b"pict" | b"drawing" | b"object"
    )
}

fn push_to(paragraph: &mut Option<String>, text: &str) {
    if let Some(paragraph) = paragraph {
        paragraph.push_str(text);
    }
}

fn extract_txt(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|source| ExtractError::Decode {
            filename: filename.to_string(),
            source,
        })
}

/// Recursively lists files under `folder` that [`extract_text`] can handle, sorted.
pub fn discover_supported_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .file_name()
            .to_str()
            .and_then(FileKind::from_filename)
            .is_some();

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Builds a PDF with one page per entry; `None` yields a page without content.
    pub fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for page in pages {
            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            };
            if let Some(text) = page {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 24.into()]),
                        Operation::new("Td", vec![100.into(), 600.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let encoded = content.encode().expect("encode content");
                let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
                page_dict.set("Contents", content_id);
            }
            kids.push(Object::from(doc.add_object(page_dict)));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save pdf");
        bytes
    }

    const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
    const MARKUP_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

    pub fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WORD_NS}" xmlns:mc="{MARKUP_NS}"><w:body>{body}</w:body></w:document>"#
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .expect("start docx part");
        writer.write_all(xml.as_bytes()).expect("write docx part");
        writer.finish().expect("finish docx").into_inner()
    }
}
