//! Minimal MIME composition for outgoing notifications.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

const PREAMBLE: &str = "This is a multi-part MIME message.";
const LINE_WIDTH: usize = 76;

/// Encode a header value as an RFC 2047 encoded word when it is not plain ASCII
pub fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    format!("=?utf-8?b?{}?=", STANDARD.encode(value.as_bytes()))
}

/// Render a `name <address>` pair. Blank names render the bare address,
/// names with special characters are quoted.
pub fn format_address(name: &str, address: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return address.to_string();
    }
    if !name.is_ascii() {
        return format!("{} <{address}>", encode_header(name));
    }
    if name.chars().any(|c| "()<>[]:;@\\,.\"".contains(c)) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("\"{escaped}\" <{address}>");
    }
    format!("{name} <{address}>")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MimePart {
    content_type: String,
    disposition: Option<String>,
    data: Vec<u8>,
}

/// A `multipart/related` message with an HTML body and optional files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage {
    subject: String,
    from: String,
    to: Vec<String>,
    parts: Vec<MimePart>,
    boundary: String,
}

impl MimeMessage {
    pub fn related(subject: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            from: from.into(),
            to: Vec::new(),
            parts: Vec::new(),
            boundary: format!("==============={}==", Uuid::new_v4().simple()),
        }
    }

    pub fn to(mut self, recipients: Vec<String>) -> Self {
        self.to = recipients;
        self
    }

    pub fn html_body(mut self, html: &str) -> Self {
        self.parts.push(MimePart {
            content_type: "text/html; charset=\"utf-8\"".to_string(),
            disposition: None,
            data: html.as_bytes().to_vec(),
        });
        self
    }

    /// Attach PDF bytes as `{filename}.pdf`
    pub fn attach_pdf(mut self, filename: &str, data: Vec<u8>) -> Self {
        self.parts.push(MimePart {
            content_type: crate::constants::PDF_CONTENT_TYPE.to_string(),
            disposition: Some(format!("attachment; filename=\"{filename}.pdf\"")),
            data,
        });
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn recipients(&self) -> &[String] {
        &self.to
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Content-Type: multipart/related; boundary=\"{}\"\n",
            self.boundary
        ));
        out.push_str("MIME-Version: 1.0\n");
        out.push_str(&format!("Subject: {}\n", encode_header(&self.subject)));
        out.push_str(&format!("From: {}\n", self.from));
        out.push_str(&format!("To: {}\n", self.to.join(",")));
        out.push('\n');
        out.push_str(PREAMBLE);
        out.push('\n');

        for part in &self.parts {
            out.push_str(&format!("--{}\n", self.boundary));
            out.push_str(&format!("Content-Type: {}\n", part.content_type));
            out.push_str("MIME-Version: 1.0\n");
            out.push_str("Content-Transfer-Encoding: base64\n");
            if let Some(disposition) = &part.disposition {
                out.push_str(&format!("Content-Disposition: {disposition}\n"));
            }
            out.push('\n');
            let encoded = STANDARD.encode(&part.data);
            // base64 output is ASCII, so byte chunks are valid str slices
            for line in encoded.as_bytes().chunks(LINE_WIDTH) {
                out.push_str(&String::from_utf8_lossy(line));
                out.push('\n');
            }
        }
        out.push_str(&format!("--{}--\n", self.boundary));
        out
    }
}
