use std::borrow::Cow;

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::text::config::TextConfig;

const URL_TAG: &str = "_url";
const USR_TAG: &str = "_usr";
const NUM_TAG: &str = "_num";
const EMO_TAG: &str = "_emo";

/// Normalize `text` following `config`.
///
/// The output has single blanks between words, punctuation split into its own
/// words (unless removed), and one leading and one trailing blank so that
/// character q-grams see word boundaries.
pub fn normalize_text(config: &TextConfig, text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    normalize_text_into(config, text, &mut out);
    out
}

/// Same as [`normalize_text`] but writes into a reusable buffer.
/// The buffer is cleared first.
pub fn normalize_text_into(config: &TextConfig, text: &str, out: &mut String) {
    out.clear();
    out.push(' ');
    for word in text.split_whitespace() {
        push_word(config, word, out);
        push_blank(out);
    }
}

fn push_word(config: &TextConfig, word: &str, out: &mut String) {
    if config.group_url && is_url(word) {
        push_tag(out, URL_TAG);
        return;
    }
    if config.group_usr && word.len() > 1 && word.starts_with('@') {
        push_tag(out, USR_TAG);
        return;
    }

    let word: Cow<str> = if config.del_diac {
        Cow::Owned(word.nfd().filter(|c| !is_combining_mark(*c)).collect())
    } else {
        Cow::Borrowed(word)
    };

    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        if config.group_num && c.is_ascii_digit() {
            // 12, 3.5, 1,000 -> one tag
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() || matches!(next, '.' | ',') {
                    chars.next();
                } else {
                    break;
                }
            }
            push_tag(out, NUM_TAG);
        } else if config.group_emo && is_emoji(c) {
            push_tag(out, EMO_TAG);
        } else if is_punctuation(c) {
            if config.del_punc {
                push_blank(out);
            } else {
                push_blank(out);
                push_char(config, c, out);
                push_blank(out);
            }
        } else if c.is_whitespace() {
            push_blank(out);
        } else if config.lc {
            for lc in c.to_lowercase() {
                push_char(config, lc, out);
            }
        } else {
            push_char(config, c, out);
        }
    }
}

#[inline]
fn push_char(config: &TextConfig, c: char, out: &mut String) {
    if config.del_dup && out.ends_with(c) {
        return;
    }
    out.push(c);
}

#[inline]
fn push_blank(out: &mut String) {
    if !out.ends_with(' ') {
        out.push(' ');
    }
}

#[inline]
fn push_tag(out: &mut String, tag: &str) {
    push_blank(out);
    out.push_str(tag);
    push_blank(out);
}

fn is_url(word: &str) -> bool {
    let lower = word.get(..8).unwrap_or(word).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

/// '_' '#' '@' are kept inside words (tags, hashtags, mentions)
fn is_punctuation(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation() && !matches!(c, '_' | '#' | '@');
    }
    matches!(c, '\u{00A1}' | '\u{00BF}' | '\u{00AB}' | '\u{00BB}' | '\u{2010}'..='\u{2027}' | '\u{2030}'..='\u{205E}' | '\u{3000}'..='\u{3003}')
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1FAFF   // symbols, pictographs, emoticons, transport, supplemental
        | 0x2600..=0x27BF   // misc symbols, dingbats
        | 0x2B00..=0x2BFF
        | 0xFE0F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_diacritics() {
        let cfg = TextConfig::default();
        assert_eq!(normalize_text(&cfg, "Canción  MÚSICA"), " cancion musica ");
    }

    #[test]
    fn splits_or_removes_punctuation() {
        let cfg = TextConfig::default();
        assert_eq!(normalize_text(&cfg, "hi!! fun"), " hi ! ! fun ");
        let cfg = TextConfig { del_punc: true, ..TextConfig::default() };
        assert_eq!(normalize_text(&cfg, "hi!! fun."), " hi fun ");
    }

    #[test]
    fn groups_numbers_urls_users_and_emojis() {
        let cfg = TextConfig {
            group_usr: true,
            group_emo: true,
            ..TextConfig::default()
        };
        assert_eq!(
            normalize_text(&cfg, "@sadit paid 1,000 at http://x.org 😀"),
            " _usr paid _num at _url _emo "
        );
    }

    #[test]
    fn collapses_duplicated_characters() {
        let cfg = TextConfig { del_dup: true, ..TextConfig::default() };
        assert_eq!(normalize_text(&cfg, "Hoooola"), " hola ");
    }

    #[test]
    fn empty_text_is_a_single_blank() {
        assert_eq!(normalize_text(&TextConfig::default(), "   "), " ");
    }
}
