// Printable book export.
//
// The session builds a `BookManifest` (only each chapter's present text is
// exported); `render_html` turns it into a standalone document for the
// external print renderer.

use folio_common::types::ChapterId;
use pulldown_cmark::{html, Event, Options, Parser};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportChapter {
    pub chapter_id: ChapterId,
    pub chapter_title: String,
    pub present_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookManifest {
    pub title: String,
    /// `data:` URL of the cover, if one was generated.
    pub cover_image: Option<String>,
    pub chapters: Vec<ExportChapter>,
}

impl BookManifest {
    pub fn word_count(&self) -> usize {
        self.chapters.iter().map(|chapter| chapter.present_text.split_whitespace().count()).sum()
    }

    /// `mailto:` link that opens a draft announcing the manuscript. The
    /// exported file itself still has to be attached by hand.
    pub fn mailto_link(&self, recipient: &str, synopsis: &str) -> String {
        let subject = format!("Book Manuscript: {}", self.title);
        let body = format!(
            "Hi,\n\nPlease find the manuscript for \"{}\" attached.\n\nSynopsis:\n{synopsis}\n\nBest regards,\n",
            self.title
        );
        format!(
            "mailto:{}?subject={}&body={}",
            recipient.trim(),
            encode_component(&subject),
            encode_component(&body)
        )
    }
}

/// Percent-encodes everything but unreserved characters. Spaces become
/// `%20`, not `+`, since mail clients do not decode `+` in `mailto:` links.
fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>().replace('+', "%20")
}

pub fn render_html(manifest: &BookManifest) -> String {
    let title = escape_html(&manifest.title);
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{title}</title>\n"));
    out.push_str(STYLE);
    out.push_str("</head>\n<body>\n");

    out.push_str("<section class=\"title-page\">\n");
    if let Some(cover) = manifest.cover_image.as_deref().filter(|c| c.starts_with("data:image/")) {
        out.push_str(&format!(
            "<img class=\"cover\" src=\"{}\" alt=\"Cover image\">\n",
            escape_html(cover)
        ));
    }
    out.push_str(&format!("<h1>{title}</h1>\n</section>\n"));

    for (index, chapter) in manifest.chapters.iter().enumerate() {
        out.push_str(&format!(
            "<section class=\"chapter\" id=\"chapter-{}\">\n<h2>Chapter {}: {}</h2>\n",
            escape_html(chapter.chapter_id.as_str()),
            index + 1,
            escape_html(&chapter.chapter_title)
        ));
        out.push_str(&markdown_to_html(&chapter.present_text));
        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

const STYLE: &str = "<style>\n\
body { font-family: Georgia, serif; line-height: 1.6; max-width: 40em; margin: 0 auto; }\n\
.title-page { text-align: center; page-break-after: always; }\n\
.cover { max-width: 100%; }\n\
.chapter { page-break-before: always; }\n\
</style>\n";

/// Markdown to HTML with embedded raw HTML rendered as text.
fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
