//! Renderable message content.

use chrono::NaiveDateTime;

/// Everything needed to render a message body to a document.
///
/// Produced on demand by a store message and dropped once rendered.
#[derive(Debug, Clone, Default)]
pub struct MessageContent {
    /// Sender, as displayed (`Name <address>` or bare address).
    pub from: String,

    /// Primary recipients, as displayed.
    pub to: Vec<String>,

    /// Carbon-copy recipients, as displayed.
    pub cc: Vec<String>,

    /// Received timestamp, archive-local.
    pub received: Option<NaiveDateTime>,

    /// Subject line (may be empty).
    pub subject: String,

    /// Plain-text body.
    pub text: Option<String>,

    /// HTML body. Preferred over `text` when both exist.
    pub html: Option<String>,

    /// Names of the message's attachments, listed under the body.
    pub attachment_names: Vec<String>,
}

impl MessageContent {
    /// Build a standalone HTML document: a header block, the body, then the
    /// attachment list.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
        out.push_str(&format!("<title>{}</title>", escape_html(&self.subject)));
        out.push_str("</head><body>\n<table class=\"headers\">\n");

        push_header(&mut out, "From", &self.from);
        if !self.to.is_empty() {
            push_header(&mut out, "To", &self.to.join(", "));
        }
        if !self.cc.is_empty() {
            push_header(&mut out, "Cc", &self.cc.join(", "));
        }
        if let Some(date) = self.received {
            push_header(&mut out, "Date", &date.format("%a, %d %b %Y %H:%M:%S").to_string());
        }
        push_header(&mut out, "Subject", &self.subject);
        out.push_str("</table>\n<hr>\n");

        match (&self.html, &self.text) {
            (Some(html), _) => out.push_str(html),
            (None, Some(text)) => {
                out.push_str("<pre style=\"white-space: pre-wrap\">");
                out.push_str(&escape_html(text));
                out.push_str("</pre>");
            }
            (None, None) => {}
        }

        if !self.attachment_names.is_empty() {
            out.push_str(&format!(
                "\n<hr>\n<p>Attachments: {} file(s)</p>\n<ul>\n",
                self.attachment_names.len()
            ));
            for name in &self.attachment_names {
                out.push_str(&format!("<li>{}</li>\n", escape_html(name)));
            }
            out.push_str("</ul>");
        }

        out.push_str("\n</body></html>\n");
        out
    }
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!(
        "<tr><th align=\"left\">{name}:</th><td>{}</td></tr>\n",
        escape_html(value)
    ));
}

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
