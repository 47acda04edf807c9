//! Language guessing from translation file names.
//!
//! PO files are conventionally named after their language
//! (`po/pt_BR.po`, `de.po`, `sr@latin.po`). The guess takes the file
//! stem, validates the primary subtag as ISO 639-1/639-3 and normalizes
//! the case (`pt_br` → `pt_BR`).

use std::path::Path;

use isolang::Language;

/// Guess the language code for a translation file.
///
/// Returns `None` when the stem does not look like a language code
/// (e.g. a template named `desktop.pot`).
pub fn guess_language(filename: &str) -> Option<String> {
    let stem = Path::new(filename).file_stem()?.to_str()?;
    let (primary, rest) = split_subtags(stem);

    let primary = primary.to_lowercase();
    let valid = match primary.len() {
        2 => Language::from_639_1(&primary).is_some(),
        3 => Language::from_639_3(&primary).is_some(),
        _ => false,
    };
    if !valid {
        return None;
    }

    Some(match rest {
        Some((sep, region)) if sep == '_' && region.len() == 2 => {
            format!("{}_{}", primary, region.to_uppercase())
        }
        Some((sep, variant)) => format!("{}{}{}", primary, sep, variant.to_lowercase()),
        None => primary,
    })
}

/// English display name for a guessed code, region kept as a suffix
/// (`pt_BR` → "Portuguese (BR)").
pub fn language_name(code: &str) -> Option<String> {
    let (primary, rest) = split_subtags(code);
    let primary = primary.to_lowercase();

    let language = match primary.len() {
        2 => Language::from_639_1(&primary)?,
        3 => Language::from_639_3(&primary)?,
        _ => return None,
    };

    Some(match rest {
        Some((_, suffix)) => format!("{} ({})", language.to_name(), suffix),
        None => language.to_name().to_string(),
    })
}

fn split_subtags(stem: &str) -> (&str, Option<(char, &str)>) {
    for (i, c) in stem.char_indices() {
        if c == '_' || c == '@' {
            return (&stem[..i], Some((c, &stem[i + c.len_utf8()..])));
        }
    }
    (stem, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_codes() {
        assert_eq!(guess_language("po/de.po").as_deref(), Some("de"));
        assert_eq!(guess_language("fil.po").as_deref(), Some("fil"));
    }

    #[test]
    fn test_region_normalized() {
        assert_eq!(guess_language("po/pt_br.po").as_deref(), Some("pt_BR"));
        assert_eq!(guess_language("pt_BR.po").as_deref(), Some("pt_BR"));
    }

    #[test]
    fn test_variant_suffix_kept() {
        assert_eq!(guess_language("sr@Latin.po").as_deref(), Some("sr@latin"));
    }

    #[test]
    fn test_non_language_stems_rejected() {
        assert_eq!(guess_language("desktop.pot"), None);
        assert_eq!(guess_language("po/POTFILES.in"), None);
        assert_eq!(guess_language("xx.po"), None);
    }

    #[test]
    fn test_language_names() {
        assert_eq!(language_name("de").as_deref(), Some("German"));
        assert_eq!(language_name("pt_BR").as_deref(), Some("Portuguese (BR)"));
        assert_eq!(language_name("xx"), None);
    }
}
