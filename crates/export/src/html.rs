//! HTML marker export.
//!
//! The writer fills a user-supplied template: `{PLACEHOLDER}` tokens are
//! substituted per marker row, and the region between
//! `<!-- BEGIN MARKER -->` and `<!-- END MARKER -->` repeats once per
//! marker. A template without the delimiters is treated as one big row
//! template and concatenated. Substituted values are HTML-escaped; the
//! `{THUMBNAIL}` token expands to the row's relative image reference.

use lc_common::{format_timecode, Rational};

use crate::csv::MarkerRow;

const ROW_BEGIN: &str = "<!-- BEGIN MARKER -->";
const ROW_END: &str = "<!-- END MARKER -->";

/// Thumbnail image encoding, which fixes the exported file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbnailFormat {
    Jpeg,
    Png,
}

impl ThumbnailFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ThumbnailFormat::Jpeg => "jpeg",
            ThumbnailFormat::Png => "png",
        }
    }
}

/// Relative reference the HTML rows use for an exported thumbnail file.
pub fn thumbnail_relative_path(name: &str, format: ThumbnailFormat) -> String {
    format!("./images/{}.{}", name, format.extension())
}

/// A marker-export template split at the repeating row region.
#[derive(Clone, Debug)]
pub struct HtmlTemplate {
    head: String,
    row: String,
    tail: String,
}

impl HtmlTemplate {
    /// Splits `text` at the row delimiters. When they are absent the
    /// whole template is the row.
    pub fn parse(text: &str) -> HtmlTemplate {
        let begin = text.find(ROW_BEGIN);
        let end =
            begin.and_then(|b| text[b..].find(ROW_END).map(|offset| b + offset));
        match (begin, end) {
            (Some(b), Some(e)) => HtmlTemplate {
                head: text[..b].to_string(),
                row: text[b + ROW_BEGIN.len()..e].to_string(),
                tail: text[e + ROW_END.len()..].to_string(),
            },
            _ => HtmlTemplate {
                head: String::new(),
                row: text.to_string(),
                tail: String::new(),
            },
        }
    }

    /// Renders head, one row per marker, tail. Tokens in the head and tail
    /// substitute from the first row, which carries the asset-level values.
    pub fn render(&self, rows: &[MarkerRow], frame_rate: Rational) -> String {
        let mut out = String::with_capacity(
            self.head.len() + self.tail.len() + self.row.len() * rows.len(),
        );
        match rows.first() {
            Some(first) => out.push_str(&substitute(&self.head, first, frame_rate)),
            None => out.push_str(&self.head),
        }
        for row in rows {
            out.push_str(&substitute(&self.row, row, frame_rate));
        }
        match rows.first() {
            Some(first) => out.push_str(&substitute(&self.tail, first, frame_rate)),
            None => out.push_str(&self.tail),
        }
        out
    }
}

fn substitute(template: &str, row: &MarkerRow, frame_rate: Rational) -> String {
    let thumbnail = row.thumbnail.clone().unwrap_or_default();
    let pairs = [
        ("{ASSETNAME}", escape(&row.asset_name)),
        ("{BINPATH}", escape(&row.bin_path)),
        ("{MARKERNAME}", escape(&row.marker_name)),
        ("{COMMENT}", escape(&row.comment)),
        ("{IN}", format_timecode(row.in_point, frame_rate)),
        ("{OUT}", format_timecode(row.out_point, frame_rate)),
        ("{DURATION}", format_timecode(row.duration(), frame_rate)),
        ("{TYPE}", escape(&row.marker_type)),
        ("{TAGS}", escape(&row.tags)),
        ("{MEDIAPATH}", escape(&row.media_path)),
        ("{THUMBNAIL}", thumbnail),
    ];
    let mut out = template.to_string();
    for (token, value) in &pairs {
        out = out.replace(token, value);
    }
    out
}

/// Minimal HTML escaping for substituted values.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
