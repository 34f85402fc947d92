//! Document rendering collaborators.
//!
//! The pipeline needs three things from a source document: a PDF, the
//! narration text of every page, and one image per page.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};

use regex::Regex;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_model::Slide;
use slidecast_render_engine::command_exists;
use tokio::process::Command;

/// Target width of rendered page images.
pub const PAGE_IMAGE_WIDTH: u32 = 2560;

/// Turns a source document into slides.
#[async_trait::async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Convert `source` to PDF inside `out_dir`, returning the PDF path.
    async fn render_to_pdf(&self, source: &Path, out_dir: &Path) -> SlidecastResult<PathBuf>;

    /// Narration text of each page, in page order.
    ///
    /// `pdf` is the output of [`render_to_pdf`](Self::render_to_pdf) for the
    /// same `source`.
    async fn extract_text(&self, source: &Path, pdf: &Path) -> SlidecastResult<Vec<String>>;

    /// Render every PDF page into `target_dir` and pair it with `texts` by index.
    /// Pages beyond `texts` get empty text.
    async fn render_pdf_to_images(
        &self,
        pdf: &Path,
        target_dir: &Path,
        texts: &[String],
    ) -> SlidecastResult<Vec<Slide>>;
}

/// Renderer built on LibreOffice and poppler-utils.
#[derive(Debug, Clone, Default)]
pub struct OfficeRenderer;

impl OfficeRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl DocumentRenderer for OfficeRenderer {
    async fn render_to_pdf(&self, source: &Path, out_dir: &Path) -> SlidecastResult<PathBuf> {
        if !source.is_file() {
            return Err(SlidecastError::FileNotFound {
                path: source.to_path_buf(),
            });
        }
        tokio::fs::create_dir_all(out_dir).await?;
        let stem = source
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("document");
        let pdf = out_dir.join(format!("{stem}.pdf"));

        if extension_of(source) == "pdf" {
            tokio::fs::copy(source, &pdf).await?;
            return Ok(pdf);
        }

        let mut cmd = Command::new("soffice");
        cmd.args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(out_dir)
            .arg(source);
        run_tool("soffice", &mut cmd).await?;

        if !pdf.is_file() {
            return Err(SlidecastError::document(format!(
                "soffice produced no PDF for {}",
                source.display()
            )));
        }
        Ok(pdf)
    }

    async fn extract_text(&self, source: &Path, pdf: &Path) -> SlidecastResult<Vec<String>> {
        match TextSource::for_document(source) {
            TextSource::PptxArchive => {
                let path = source.to_path_buf();
                tokio::task::spawn_blocking(move || pptx_slide_texts(&path))
                    .await
                    .map_err(|e| SlidecastError::document(format!("text extraction aborted: {e}")))?
            }
            TextSource::RenderedPdf => {
                let mut cmd = Command::new("pdftotext");
                cmd.args(["-enc", "UTF-8"]).arg(pdf).arg("-");
                let stdout = run_tool("pdftotext", &mut cmd).await?;
                Ok(split_pdf_pages(&String::from_utf8_lossy(&stdout)))
            }
        }
    }

    async fn render_pdf_to_images(
        &self,
        pdf: &Path,
        target_dir: &Path,
        texts: &[String],
    ) -> SlidecastResult<Vec<Slide>> {
        tokio::fs::create_dir_all(target_dir).await?;
        let width = PAGE_IMAGE_WIDTH.to_string();
        let mut cmd = Command::new("pdftoppm");
        cmd.args(["-png", "-scale-to-x", &width, "-scale-to-y", "-1"])
            .arg(pdf)
            .arg(target_dir.join("page"));
        run_tool("pdftoppm", &mut cmd).await?;

        // pdftoppm zero-pads page numbers to the page count's width.
        let page_file = Regex::new(r"^page-(\d+)\.png$")
            .map_err(|e| SlidecastError::document(e.to_string()))?;
        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(target_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(caps) = name.to_str().and_then(|n| page_file.captures(n)) else {
                continue;
            };
            if let Ok(number) = caps[1].parse::<u32>() {
                pages.push((number, entry.path()));
            }
        }
        pages.sort_by_key(|(number, _)| *number);

        let mut slides = Vec::with_capacity(pages.len());
        for (number, rendered) in pages {
            let image_path = target_dir.join(format!("{number}.png"));
            tokio::fs::rename(&rendered, &image_path).await?;
            let text = (number as usize)
                .checked_sub(1)
                .and_then(|index| texts.get(index))
                .cloned()
                .unwrap_or_default();
            slides.push(Slide::new(number, image_path, text));
        }
        Ok(slides)
    }
}

/// Where narration text is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextSource {
    /// Slide XML inside the `.pptx` archive.
    PptxArchive,
    /// `pdftotext` over the PDF rendering (`.pdf`, `.ppt`, `.odp`, ...).
    RenderedPdf,
}

impl TextSource {
    fn for_document(source: &Path) -> Self {
        match extension_of(source).as_str() {
            "pptx" => TextSource::PptxArchive,
            _ => TextSource::RenderedPdf,
        }
    }
}

/// Availability of every external tool the production pipeline shells out to.
pub fn check_tools() -> Vec<(&'static str, bool)> {
    ["ffmpeg", "ffprobe", "soffice", "pdftoppm", "pdftotext"]
        .into_iter()
        .map(|tool| (tool, command_exists(tool)))
        .collect()
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

async fn run_tool(name: &str, cmd: &mut Command) -> SlidecastResult<Vec<u8>> {
    tracing::debug!(tool = name, "Running document tool");
    let output = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| SlidecastError::document(format!("Failed to start {name}: {e}")))?;
    if !output.status.success() {
        return Err(SlidecastError::document(format!(
            "{name} failed (status {}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(output.stdout)
}

/// Text of each slide of a `.pptx`, in slide-number order.
///
/// A slide whose XML cannot be parsed contributes empty text.
fn pptx_slide_texts(path: &Path) -> SlidecastResult<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| SlidecastError::document(format!("{}: {e}", path.display())))?;

    let slide_entry = Regex::new(r"^ppt/slides/slide(\d+)\.xml$")
        .map_err(|e| SlidecastError::document(e.to_string()))?;

    let mut entries: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = slide_entry.captures(name)?[1].parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    entries.sort_by_key(|(number, _)| *number);

    let mut texts = Vec::with_capacity(entries.len());
    for (number, name) in entries {
        let mut xml = String::new();
        archive
            .by_name(&name)
            .map_err(|e| SlidecastError::document(format!("{name}: {e}")))?
            .read_to_string(&mut xml)?;
        let text = slide_text(&xml).unwrap_or_else(|e| {
            tracing::warn!(slide = number, error = %e, "Unreadable slide XML, narrating nothing");
            String::new()
        });
        texts.push(text);
    }
    Ok(texts)
}

/// Narration text of one slide.
///
/// `<a:t>` runs are concatenated per `<a:p>` paragraph, paragraphs are
/// joined by newlines within a `<p:sp>` shape, and shapes by spaces.
/// Elements are matched by local name so strict and transitional
/// namespaces both work.
fn slide_text(xml: &str) -> SlidecastResult<String> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| SlidecastError::document(format!("slide XML: {e}")))?;

    let shapes: Vec<String> = doc
        .descendants()
        .filter(|node| is_element(node, "sp"))
        .map(|shape| {
            shape
                .descendants()
                .filter(|node| is_element(node, "p"))
                .map(|paragraph| {
                    paragraph
                        .descendants()
                        .filter(|node| is_element(node, "t"))
                        .filter_map(|run| run.text())
                        .collect::<String>()
                })
                .filter(|paragraph| !paragraph.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|shape| !shape.trim().is_empty())
        .collect();

    Ok(shapes.join(" ").trim().to_string())
}

fn is_element(node: &roxmltree::Node, local_name: &str) -> bool {
    node.is_element() && node.tag_name().name() == local_name
}

/// Split `pdftotext` output into pages on form feeds.
fn split_pdf_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw.split('\u{c}').map(|page| page.trim().to_string()).collect();
    // Every page ends with a form feed, leaving one empty trailing piece.
    if raw.ends_with('\u{c}') {
        pages.pop();
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SLIDE_XML: &str = r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>
<p:sp><p:txBody><a:p><a:r><a:rPr lang="en-US"/><a:t>Quarterly</a:t></a:r><a:r><a:t xml:space="preserve"> results</a:t></a:r></a:p><a:p><a:r><a:t>Q&amp;A later</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:txBody><a:p><a:r><a:t>Revenue up</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:sld>"#;

    fn write_pptx(path: &Path, slides: &[(u32, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        for (number, xml) in slides {
            zip.start_file(format!("ppt/slides/slide{number}.xml"), options)
                .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.start_file("ppt/slides/_rels/slide1.xml.rels", options).unwrap();
        zip.write_all(b"<Relationships/>").unwrap();
        zip.finish().unwrap();
    }

    fn wrap_slide(shapes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{shapes}</p:spTree></p:cSld></p:sld>"#
        )
    }

    #[test]
    fn test_slide_text_joins_runs_paragraphs_and_shapes() {
        assert_eq!(slide_text(SLIDE_XML).unwrap(), "Quarterly results\nQ&A later Revenue up");
    }

    #[test]
    fn test_slide_text_decodes_character_references() {
        let xml = wrap_slide(
            "<p:sp><p:txBody><a:p><a:r><a:t>It&#8217;s &#x4E2D;文 &#38; more</a:t></a:r></a:p></p:txBody></p:sp>",
        );
        assert_eq!(slide_text(&xml).unwrap(), "It\u{2019}s 中文 & more");
    }

    #[test]
    fn test_slide_text_reads_grouped_shapes() {
        let xml = wrap_slide(
            "<p:grpSp><p:sp><p:txBody><a:p><a:r><a:t>inside group</a:t></a:r></a:p></p:txBody></p:sp></p:grpSp>\
             <p:sp><p:txBody><a:p><a:fld type=\"slidenum\"><a:t>7</a:t></a:fld></a:p></p:txBody></p:sp>",
        );
        assert_eq!(slide_text(&xml).unwrap(), "inside group 7");
    }

    #[test]
    fn test_malformed_slide_is_an_error() {
        assert!(slide_text("<p:sld><p:sp>").is_err());
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let empty = wrap_slide("");
        write_pptx(
            &path,
            &[(10, SLIDE_XML), (2, empty.as_str()), (1, SLIDE_XML), (3, "<broken")],
        );

        let texts = pptx_slide_texts(&path).unwrap();
        assert_eq!(texts.len(), 4);
        assert_eq!(texts[0], "Quarterly results\nQ&A later Revenue up");
        assert_eq!(texts[1], "");
        assert_eq!(texts[2], "");
        assert_eq!(texts[3], texts[0]);
    }

    #[test]
    fn test_text_source_by_extension() {
        assert_eq!(TextSource::for_document(Path::new("a/deck.pptx")), TextSource::PptxArchive);
        assert_eq!(TextSource::for_document(Path::new("a/DECK.PPTX")), TextSource::PptxArchive);
        assert_eq!(TextSource::for_document(Path::new("a/legacy.ppt")), TextSource::RenderedPdf);
        assert_eq!(TextSource::for_document(Path::new("a/talk.pdf")), TextSource::RenderedPdf);
        assert_eq!(TextSource::for_document(Path::new("a/deck.odp")), TextSource::RenderedPdf);
    }

    #[tokio::test]
    async fn test_ppt_text_comes_from_rendered_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("legacy.ppt");
        std::fs::write(&source, b"\xD0\xCF\x11\xE0").unwrap();

        // The rendered PDF does not exist, so pdftotext fails (or is missing);
        // either way the failure is a document error, never `Unsupported`.
        let err = OfficeRenderer::new()
            .extract_text(&source, &dir.path().join("missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlidecastError::Document { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_pdf_source_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.pdf");
        std::fs::write(&source, b"%PDF-1.4").unwrap();
        let out = dir.path().join("out");

        let pdf = OfficeRenderer::new().render_to_pdf(&source, &out).await.unwrap();
        assert_eq!(pdf, out.join("talk.pdf"));
        assert_eq!(std::fs::read(&pdf).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_split_pdf_pages() {
        assert_eq!(
            split_pdf_pages("Intro\n\u{c}Body text\n\u{c}\u{c}"),
            vec!["Intro".to_string(), "Body text".to_string(), String::new()]
        );
        assert!(split_pdf_pages("").len() == 1);
    }
}
