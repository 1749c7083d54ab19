//! Keyword matching primitives shared by the classifier, scorer and aggregator.
//!
//! Text and keywords are folded the same way: lower-cased, split into `\w+`
//! tokens, and re-joined with single spaces. A keyword then matches only on
//! whole-token boundaries, so `fed` does not hit `federal` and `s&p` matches
//! `S&P 500` (both fold to `s p`).
//!
//! Japanese and Chinese text is written without spaces and folds into long
//! tokens. At a keyword edge that touches a Han or kana character on either
//! side, the boundary check is skipped, so `利下げ` is found inside
//! `日銀が利下げを決定` and `fed` inside `米fed議長`.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\w+").expect("token regex"));

/// Scripts written without spaces between words.
pub fn is_unspaced(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'   // hiragana, katakana
        | '\u{31F0}'..='\u{31FF}' // katakana phonetic extensions
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}' // compatibility ideographs
        | '\u{FF66}'..='\u{FF9F}' // halfwidth katakana
    )
}

/// Fold arbitrary text into its space-joined lowercase token form.
pub fn fold(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    for m in TOKEN_RE.find_iter(&lower) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(m.as_str());
    }
    out
}

/// A keyword as written in the tables, plus its folded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub raw: String,
    folded: String,
}

impl Keyword {
    /// Returns `None` when the keyword folds to nothing (pure punctuation/whitespace).
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let folded = fold(&raw);
        if folded.is_empty() {
            None
        } else {
            Some(Self { raw, folded })
        }
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }
}

/// Article text folded once, then queried many times.
#[derive(Debug, Clone)]
pub struct FoldedText {
    folded: String,
}

impl FoldedText {
    pub fn new(text: &str) -> Self {
        Self {
            folded: fold(text),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    /// Non-overlapping whole-token occurrences of `kw`.
    pub fn count(&self, kw: &Keyword) -> usize {
        let hay = self.folded.as_str();
        let needle = kw.folded();
        let open_left = needle.chars().next().is_some_and(is_unspaced);
        let open_right = needle.chars().next_back().is_some_and(is_unspaced);

        let mut count = 0;
        let mut from = 0;
        while let Some(pos) = hay[from..].find(needle) {
            let start = from + pos;
            let end = start + needle.len();
            let left_ok = open_left
                || hay[..start]
                    .chars()
                    .next_back()
                    .map_or(true, |c| c == ' ' || is_unspaced(c));
            let right_ok = open_right
                || hay[end..]
                    .chars()
                    .next()
                    .map_or(true, |c| c == ' ' || is_unspaced(c));
            if left_ok && right_ok {
                count += 1;
                from = end;
            } else {
                // step one char so a boundary miss cannot swallow a real match
                from = start + hay[start..].chars().next().map_or(1, char::len_utf8);
            }
            if from >= hay.len() {
                break;
            }
        }
        count
    }

    pub fn contains(&self, kw: &Keyword) -> bool {
        self.count(kw) > 0
    }

    /// Sum of occurrences over a keyword list.
    pub fn count_any(&self, kws: &[Keyword]) -> usize {
        kws.iter().map(|k| self.count(k)).sum()
    }

    /// Keywords from `kws` that occur at least once, in table order.
    pub fn matched<'a>(&self, kws: &'a [Keyword]) -> Vec<&'a Keyword> {
        kws.iter().filter(|k| self.contains(k)).collect()
    }
}
