//! Minimal gettext PO reader and writer.
//!
//! # Responsibilities
//! - Parse PO entries (comments, flags, msgctxt, msgid, plural forms)
//! - Classify entries for statistics (translated / fuzzy / untranslated)
//! - Merge a translation against its POT template
//! - Serialize entries back to PO text
//!
//! # Design Decisions
//! - The header entry (empty msgid) and obsolete entries never count
//! - Merging follows msgmerge: the template drives the entry set, matching
//!   translations are carried over, the rest comes out untranslated

use std::fmt;

/// One PO entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoEntry {
    /// Raw comment lines (translator, extracted, reference), without `#`.
    pub comments: Vec<String>,
    /// Flags from `#,` lines (e.g. "fuzzy", "c-format").
    pub flags: Vec<String>,
    pub msgctxt: Option<String>,
    pub msgid: String,
    pub msgid_plural: Option<String>,
    /// One element for singular entries, one per plural form otherwise.
    pub msgstrs: Vec<String>,
    /// Entry was commented out with `#~`.
    pub obsolete: bool,
}

impl PoEntry {
    /// The metadata header carries an empty msgid.
    pub fn is_header(&self) -> bool {
        self.msgid.is_empty() && self.msgctxt.is_none()
    }

    pub fn is_fuzzy(&self) -> bool {
        self.flags.iter().any(|f| f == "fuzzy")
    }

    /// Translated means every form has a non-empty msgstr.
    pub fn is_translated(&self) -> bool {
        !self.msgstrs.is_empty() && self.msgstrs.iter().all(|s| !s.is_empty())
    }

    fn key(&self) -> (Option<&str>, &str) {
        (self.msgctxt.as_deref(), &self.msgid)
    }
}

/// A parsed PO file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoDocument {
    pub entries: Vec<PoEntry>,
}

impl PoDocument {
    /// Entries that participate in statistics.
    pub fn countable(&self) -> impl Iterator<Item = &PoEntry> {
        self.entries
            .iter()
            .filter(|e| !e.is_header() && !e.obsolete)
    }

    pub fn header(&self) -> Option<&PoEntry> {
        self.entries.iter().find(|e| e.is_header())
    }

    /// Compute translation statistics.
    pub fn stats(&self) -> PoStats {
        let mut stats = PoStats::default();
        for entry in self.countable() {
            stats.total += 1;
            if entry.is_fuzzy() {
                stats.fuzzy += 1;
            } else if entry.is_translated() {
                stats.translated += 1;
            } else {
                stats.untranslated += 1;
            }
        }
        stats
    }
}

/// Statistics over one PO document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoStats {
    pub total: u32,
    pub translated: u32,
    pub fuzzy: u32,
    pub untranslated: u32,
}

/// Parse failure with position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for PoParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for PoParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    MsgCtxt,
    MsgId,
    MsgIdPlural,
    MsgStr(usize),
}

#[derive(Default)]
struct EntryBuilder {
    comments: Vec<String>,
    flags: Vec<String>,
    msgctxt: Option<String>,
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgstrs: Vec<String>,
    obsolete: bool,
    section: Section,
}

impl Default for Section {
    fn default() -> Self {
        Section::None
    }
}

impl EntryBuilder {
    fn has_message(&self) -> bool {
        self.msgid.is_some()
    }

    fn append(&mut self, text: &str, line: usize) -> Result<(), PoParseError> {
        let target = match self.section {
            Section::MsgCtxt => self.msgctxt.get_or_insert_with(String::new),
            Section::MsgId => self.msgid.get_or_insert_with(String::new),
            Section::MsgIdPlural => self.msgid_plural.get_or_insert_with(String::new),
            Section::MsgStr(n) => {
                while self.msgstrs.len() <= n {
                    self.msgstrs.push(String::new());
                }
                &mut self.msgstrs[n]
            }
            Section::None => {
                return Err(PoParseError {
                    line,
                    message: "string continuation outside of an entry".into(),
                })
            }
        };
        target.push_str(text);
        Ok(())
    }

    fn finish(self) -> Option<PoEntry> {
        if !self.has_message() {
            return None;
        }
        Some(PoEntry {
            comments: self.comments,
            flags: self.flags,
            msgctxt: self.msgctxt,
            msgid: self.msgid.unwrap_or_default(),
            msgid_plural: self.msgid_plural,
            msgstrs: self.msgstrs,
            obsolete: self.obsolete,
        })
    }
}

/// Parse PO text into a document.
pub fn parse(content: &str) -> Result<PoDocument, PoParseError> {
    let mut entries = Vec::new();
    let mut builder = EntryBuilder::default();

    for (idx, raw) in content.lines().enumerate() {
        let lineno = idx + 1;
        let mut line = raw.trim_end();
        let mut obsolete = false;

        if let Some(rest) = line.strip_prefix("#~") {
            obsolete = true;
            line = rest.trim_start();
        }

        if line.is_empty() {
            if let Some(entry) = std::mem::take(&mut builder).finish() {
                entries.push(entry);
            }
            continue;
        }

        // A new message (or its leading comments) after a completed msgstr
        // starts the next entry even without a separating blank line.
        let starts_entry =
            line.starts_with("msgctxt") || line.starts_with("msgid ") || line.starts_with('#');
        if starts_entry && matches!(builder.section, Section::MsgStr(_)) {
            if let Some(entry) = std::mem::take(&mut builder).finish() {
                entries.push(entry);
            }
        }

        if obsolete {
            builder.obsolete = true;
        }

        if let Some(rest) = line.strip_prefix("#,") {
            builder
                .flags
                .extend(rest.split(',').map(|f| f.trim().to_string()));
        } else if let Some(rest) = line.strip_prefix('#') {
            builder.comments.push(rest.trim_start().to_string());
        } else if let Some(rest) = line.strip_prefix("msgctxt") {
            builder.section = Section::MsgCtxt;
            builder.msgctxt = Some(String::new());
            builder.append(&parse_string(rest, lineno)?, lineno)?;
        } else if let Some(rest) = line.strip_prefix("msgid_plural") {
            builder.section = Section::MsgIdPlural;
            builder.msgid_plural = Some(String::new());
            builder.append(&parse_string(rest, lineno)?, lineno)?;
        } else if let Some(rest) = line.strip_prefix("msgid") {
            builder.section = Section::MsgId;
            builder.msgid = Some(String::new());
            builder.append(&parse_string(rest, lineno)?, lineno)?;
        } else if let Some(rest) = line.strip_prefix("msgstr") {
            let rest = rest.trim_start();
            let (index, rest) = if let Some(bracketed) = rest.strip_prefix('[') {
                let close = bracketed.find(']').ok_or_else(|| PoParseError {
                    line: lineno,
                    message: "unterminated msgstr index".into(),
                })?;
                let index: usize =
                    bracketed[..close].parse().map_err(|_| PoParseError {
                        line: lineno,
                        message: "invalid msgstr index".into(),
                    })?;
                (index, &bracketed[close + 1..])
            } else {
                (0, rest)
            };
            builder.section = Section::MsgStr(index);
            builder.append(&parse_string(rest, lineno)?, lineno)?;
        } else if line.starts_with('"') {
            builder.append(&parse_string(line, lineno)?, lineno)?;
        } else {
            return Err(PoParseError {
                line: lineno,
                message: format!("unexpected line: {}", line),
            });
        }
    }

    if let Some(entry) = builder.finish() {
        entries.push(entry);
    }

    Ok(PoDocument { entries })
}

/// Merge a translation against its template, msgmerge style.
///
/// The template's entry set wins: entries present in the translation keep
/// their msgstr and flags, the rest come out untranslated.
pub fn merge(translation: &PoDocument, template: &PoDocument) -> PoDocument {
    let mut entries = Vec::new();

    if let Some(header) = translation.header().or_else(|| template.header()) {
        entries.push(header.clone());
    }

    for tmpl in template.entries.iter().filter(|e| !e.is_header()) {
        match translation
            .countable()
            .find(|e| e.key() == tmpl.key())
        {
            Some(existing) => {
                let mut merged = tmpl.clone();
                merged.msgstrs = existing.msgstrs.clone();
                merged.flags = existing.flags.clone();
                merged.obsolete = false;
                entries.push(merged);
            }
            None => {
                let mut fresh = tmpl.clone();
                let forms = if fresh.msgid_plural.is_some() { 2 } else { 1 };
                fresh.msgstrs = vec![String::new(); forms];
                fresh.obsolete = false;
                entries.push(fresh);
            }
        }
    }

    PoDocument { entries }
}

/// Serialize a document back to PO text.
pub fn to_string(doc: &PoDocument) -> String {
    let mut out = String::new();
    for (i, entry) in doc.entries.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let prefix = if entry.obsolete { "#~ " } else { "" };
        for comment in &entry.comments {
            out.push('#');
            if !comment.is_empty() {
                out.push(' ');
                out.push_str(comment);
            }
            out.push('\n');
        }
        if !entry.flags.is_empty() {
            out.push_str("#, ");
            out.push_str(&entry.flags.join(", "));
            out.push('\n');
        }
        if let Some(ctxt) = &entry.msgctxt {
            out.push_str(&format!("{}msgctxt \"{}\"\n", prefix, escape(ctxt)));
        }
        out.push_str(&format!("{}msgid \"{}\"\n", prefix, escape(&entry.msgid)));
        if let Some(plural) = &entry.msgid_plural {
            out.push_str(&format!("{}msgid_plural \"{}\"\n", prefix, escape(plural)));
            for (n, msgstr) in entry.msgstrs.iter().enumerate() {
                out.push_str(&format!("{}msgstr[{}] \"{}\"\n", prefix, n, escape(msgstr)));
            }
        } else {
            let empty = String::new();
            let msgstr = entry.msgstrs.first().unwrap_or(&empty);
            out.push_str(&format!("{}msgstr \"{}\"\n", prefix, escape(msgstr)));
        }
    }
    out
}

/// Extract the quoted payload of a keyword or continuation line.
fn parse_string(rest: &str, line: usize) -> Result<String, PoParseError> {
    let rest = rest.trim();
    if !(rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"')) {
        return Err(PoParseError {
            line,
            message: format!("expected quoted string, got: {}", rest),
        });
    }
    unescape(&rest[1..rest.len() - 1], line)
}

fn unescape(s: &str, line: usize) -> Result<String, PoParseError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {
                return Err(PoParseError {
                    line,
                    message: "dangling escape at end of string".into(),
                })
            }
        }
    }
    Ok(out)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"msgid ""
msgstr ""
"Project-Id-Version: demo 1.0\n"
"Content-Type: text/plain; charset=UTF-8\n"

#. extracted note
#: src/main.c:42
msgid "Hello"
msgstr "Hallo"

#, fuzzy
msgid "Goodbye"
msgstr "Tschuss"

msgid "Untranslated"
msgstr ""

msgid "One file"
msgid_plural "%d files"
msgstr[0] "Eine Datei"
msgstr[1] "%d Dateien"
"#;

    #[test]
    fn test_parse_counts_entries() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.entries.len(), 5);
        assert!(doc.entries[0].is_header());
        assert_eq!(doc.entries[1].msgid, "Hello");
        assert_eq!(doc.entries[1].msgstrs, vec!["Hallo".to_string()]);
        assert_eq!(doc.entries[4].msgid_plural.as_deref(), Some("%d files"));
        assert_eq!(doc.entries[4].msgstrs.len(), 2);
    }

    #[test]
    fn test_stats_classification() {
        let doc = parse(SAMPLE).unwrap();
        let stats = doc.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.translated, 2);
        assert_eq!(stats.fuzzy, 1);
        assert_eq!(stats.untranslated, 1);
    }

    #[test]
    fn test_header_excluded_from_stats() {
        let doc = parse("msgid \"\"\nmsgstr \"Content-Type: text/plain\\n\"\n").unwrap();
        assert_eq!(doc.stats().total, 0);
    }

    #[test]
    fn test_obsolete_entries_excluded() {
        let text = "#~ msgid \"Old\"\n#~ msgstr \"Alt\"\n";
        let doc = parse(text).unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert!(doc.entries[0].obsolete);
        assert_eq!(doc.stats().total, 0);
    }

    #[test]
    fn test_multiline_strings_concatenate() {
        let text = "msgid \"\"\n\"first \"\n\"second\"\nmsgstr \"x\"\n";
        let doc = parse(text).unwrap();
        assert_eq!(doc.entries[0].msgid, "first second");
    }

    #[test]
    fn test_escapes_round_trip() {
        let text = "msgid \"a\\n\\\"b\\\"\"\nmsgstr \"c\\\\d\"\n";
        let doc = parse(text).unwrap();
        assert_eq!(doc.entries[0].msgid, "a\n\"b\"");
        assert_eq!(doc.entries[0].msgstrs[0], "c\\d");

        let reparsed = parse(&to_string(&doc)).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = parse("msgid \"x\"\nmsgstr \"y\"\nwhat is this\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_merge_carries_translations_and_adds_new() {
        let template = parse(
            "msgid \"\"\nmsgstr \"\"\n\nmsgid \"Hello\"\nmsgstr \"\"\n\nmsgid \"New\"\nmsgstr \"\"\n",
        )
        .unwrap();
        let translation =
            parse("msgid \"\"\nmsgstr \"\"\n\nmsgid \"Hello\"\nmsgstr \"Hallo\"\n\nmsgid \"Dropped\"\nmsgstr \"Weg\"\n")
                .unwrap();

        let merged = merge(&translation, &template);
        let stats = merged.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.translated, 1);
        assert_eq!(stats.untranslated, 1);
        assert!(merged.entries.iter().all(|e| e.msgid != "Dropped"));
    }
}
