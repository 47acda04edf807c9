//! Gettext syntax highlighting for the file view page.
//!
//! # Responsibilities
//! - Classify PO lines (keywords, strings, comments, flags, obsolete)
//! - Emit HTML spans with inline line numbers
//! - Provide the static style sheet for the view template
//!
//! # Design Decisions
//! - Line-oriented: PO files keep one construct per line, so no real
//!   lexer state is needed beyond the string scanner
//! - Everything is HTML-escaped before markup is added

/// CSS used by the rendered view page.
pub const STYLE_DEFS: &str = "\
.hl { background: #f8f8f8; padding: .5em; font-family: monospace; white-space: pre; }\n\
.hl .lineno { color: #aaa; padding-right: 1em; user-select: none; }\n\
.hl .k { color: #008000; font-weight: bold; }\n\
.hl .s { color: #ba2121; }\n\
.hl .se { color: #aa5d1f; font-weight: bold; }\n\
.hl .c { color: #408080; font-style: italic; }\n\
.hl .cf { color: #a045a0; font-style: italic; }\n\
.hl .ob { color: #999; }\n";

const KEYWORDS: &[&str] = &["msgctxt", "msgid_plural", "msgid", "msgstr"];

/// Render PO content as highlighted HTML with inline line numbers.
pub fn highlight(content: &str) -> String {
    let total = content.lines().count();
    let width = total.to_string().len().max(1);

    let mut out = String::with_capacity(content.len() * 2);
    out.push_str("<div class=\"hl\">");
    for (idx, line) in content.lines().enumerate() {
        out.push_str(&format!(
            "<span class=\"lineno\">{:>width$}</span>",
            idx + 1,
            width = width
        ));
        highlight_line(line, &mut out);
        out.push('\n');
    }
    out.push_str("</div>");
    out
}

fn highlight_line(line: &str, out: &mut String) {
    let trimmed = line.trim_start();

    if trimmed.starts_with("#~") {
        out.push_str(&span("ob", line));
        return;
    }
    if trimmed.starts_with("#,") {
        out.push_str(&span("cf", line));
        return;
    }
    if trimmed.starts_with('#') {
        out.push_str(&span("c", line));
        return;
    }

    let mut rest = line;
    if let Some(keyword) = KEYWORDS.iter().find(|k| trimmed.starts_with(**k)) {
        let indent_len = line.len() - trimmed.len();
        let (head, tail) = line.split_at(indent_len + keyword.len());
        out.push_str(&escape(&head[..indent_len]));
        out.push_str(&span("k", &head[indent_len..]));
        rest = tail;

        // msgstr[0]: keep the index with the keyword.
        if let Some(after_bracket) = rest.strip_prefix('[') {
            if let Some(close) = after_bracket.find(']') {
                out.push_str(&span("k", &rest[..close + 2]));
                rest = &after_bracket[close + 1..];
            }
        }
    }

    highlight_strings(rest, out);
}

/// Walk a line tail, marking quoted strings and escape sequences.
fn highlight_strings(text: &str, out: &mut String) {
    let mut plain = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '"' {
            plain.push(c);
            continue;
        }
        out.push_str(&escape(&plain));
        plain.clear();

        // Inside a string literal.
        let mut literal = String::from("\"");
        let mut spans = Vec::new();
        while let Some(sc) = chars.next() {
            if sc == '\\' {
                if !literal.is_empty() {
                    spans.push(span("s", &literal));
                    literal.clear();
                }
                let mut esc = String::from("\\");
                if let Some(next) = chars.next() {
                    esc.push(next);
                }
                spans.push(span("se", &esc));
            } else {
                literal.push(sc);
                if sc == '"' {
                    break;
                }
            }
        }
        if !literal.is_empty() {
            spans.push(span("s", &literal));
        }
        for s in spans {
            out.push_str(&s);
        }
    }
    out.push_str(&escape(&plain));
}

fn span(class: &str, text: &str) -> String {
    format!("<span class=\"{}\">{}</span>", class, escape(text))
}

/// Escape text for inclusion in HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
