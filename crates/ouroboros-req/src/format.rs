//! Diagnostic rendering of a request/response pair

use std::fmt::{self, Write as _};
use std::sync::OnceLock;
use std::time::Duration;

use http::HeaderMap;
use regex::bytes::Regex;

use crate::req::Req;
use crate::response::ResponseHead;

/// Layout of a diagnostic dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DumpFormat {
    /// Request line, headers and bodies on separate lines
    Pretty,
    /// Everything on one line, line breaks in bodies become spaces
    Compact,
    /// One line unless a body contains a line break
    #[default]
    Auto,
}

/// Borrowed view of everything a dump can show
pub(crate) struct Snapshot<'a> {
    pub method: &'a str,
    pub url: &'a str,
    /// Present only when elapsed time should be shown
    pub cost: Option<Duration>,
    pub request_headers: Option<&'a HeaderMap>,
    pub request_body: &'a [u8],
    pub response: Option<&'a ResponseHead>,
    pub response_body: &'a [u8],
}

fn newline() -> &'static Regex {
    static NEWLINE: OnceLock<Regex> = OnceLock::new();
    NEWLINE.get_or_init(|| Regex::new(r"[\r\n]").expect("valid regex"))
}

pub(crate) fn render(snapshot: &Snapshot<'_>, format: DumpFormat) -> String {
    let mut out = String::new();
    let _ = write!(out, "{} {}", snapshot.method, snapshot.url);
    if let Some(cost) = snapshot.cost {
        let _ = write!(out, " {:?}", cost);
    }

    let bodies = [snapshot.request_body, snapshot.response_body];
    match format {
        DumpFormat::Pretty => render_pretty(&mut out, snapshot),
        DumpFormat::Compact => {
            for body in bodies.iter().filter(|b| !b.is_empty()) {
                out.push(' ');
                out.push_str(&String::from_utf8_lossy(&newline().replace_all(body, &b" "[..])));
            }
        }
        DumpFormat::Auto => {
            let multiline = bodies.iter().any(|b| newline().is_match(b));
            let sep = if multiline { '\n' } else { ' ' };
            for body in bodies.iter().filter(|b| !b.is_empty()) {
                out.push(sep);
                out.push_str(&String::from_utf8_lossy(body));
            }
        }
    }
    out
}

fn render_pretty(out: &mut String, snapshot: &Snapshot<'_>) {
    if let Some(headers) = snapshot.request_headers {
        write_headers(out, headers);
    }
    if !snapshot.request_body.is_empty() {
        out.push_str("\n\n");
        out.push_str(&String::from_utf8_lossy(snapshot.request_body));
    }

    if let Some(response) = snapshot.response {
        out.push_str("\n\n");
        out.push_str(&response.status_line());
        write_headers(out, response.headers());
        if !snapshot.response_body.is_empty() {
            out.push_str("\n\n");
            out.push_str(&String::from_utf8_lossy(snapshot.response_body));
        }
    }
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = write!(out, "\n{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
}

impl fmt::Display for Req {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = if f.sign_plus() {
            DumpFormat::Pretty
        } else if f.sign_minus() {
            DumpFormat::Compact
        } else {
            DumpFormat::Auto
        };
        f.write_str(&self.render(format))
    }
}
