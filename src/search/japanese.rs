//! Japanese text normalization for search.
//!
//! Transcripts and queries are folded to bare hiragana so katakana spellings,
//! romaji input, and long-vowel marks all land on the same key.

/// True for hiragana block characters.
pub fn is_hiragana(ch: char) -> bool {
    ('\u{3040}'..='\u{309F}').contains(&ch)
}

/// True for katakana block characters.
pub fn is_katakana(ch: char) -> bool {
    ('\u{30A0}'..='\u{30FF}').contains(&ch)
}

/// Fold one katakana character to its hiragana counterpart.
fn kata_to_hira(ch: char) -> char {
    let code = ch as u32;
    if (0x30A1..=0x30F6).contains(&code) {
        // The blocks are offset by 0x60 for every mapped character.
        char::from_u32(code - 0x60).unwrap_or(ch)
    } else {
        ch
    }
}

/// Normalize text to bare hiragana: katakana folded, long-vowel marks and
/// everything non-kana dropped.
pub fn jp_kana_norm(text: &str) -> String {
    let mut out = String::new();
    for ch in text.trim().chars().filter(|ch| !ch.is_whitespace()) {
        if is_katakana(ch) {
            let folded = kata_to_hira(ch);
            if is_hiragana(folded) {
                out.push(folded);
            }
        } else if is_hiragana(ch) {
            out.push(ch);
        }
        // 'ー' and everything else is dropped
    }
    out
}

/// Romaji-to-hiragana conversion table, longest keys first so greedy
/// matching picks compound readings before single vowels.
const ROMAJI_TABLE: &[(&str, &str)] = &[
    ("kya", "きゃ"),
    ("kyu", "きゅ"),
    ("kyo", "きょ"),
    ("gya", "ぎゃ"),
    ("gyu", "ぎゅ"),
    ("gyo", "ぎょ"),
    ("sha", "しゃ"),
    ("shu", "しゅ"),
    ("sho", "しょ"),
    ("sya", "しゃ"),
    ("syu", "しゅ"),
    ("syo", "しょ"),
    ("ja", "じゃ"),
    ("ju", "じゅ"),
    ("jo", "じょ"),
    ("jya", "じゃ"),
    ("jyu", "じゅ"),
    ("jyo", "じょ"),
    ("cha", "ちゃ"),
    ("chu", "ちゅ"),
    ("cho", "ちょ"),
    ("tya", "ちゃ"),
    ("tyu", "ちゅ"),
    ("tyo", "ちょ"),
    ("nya", "にゃ"),
    ("nyu", "にゅ"),
    ("nyo", "にょ"),
    ("hya", "ひゃ"),
    ("hyu", "ひゅ"),
    ("hyo", "ひょ"),
    ("bya", "びゃ"),
    ("byu", "びゅ"),
    ("byo", "びょ"),
    ("pya", "ぴゃ"),
    ("pyu", "ぴゅ"),
    ("pyo", "ぴょ"),
    ("mya", "みゃ"),
    ("myu", "みゅ"),
    ("myo", "みょ"),
    ("rya", "りゃ"),
    ("ryu", "りゅ"),
    ("ryo", "りょ"),
    ("shi", "し"),
    ("chi", "ち"),
    ("tsu", "つ"),
    ("fu", "ふ"),
    ("ka", "か"),
    ("ki", "き"),
    ("ku", "く"),
    ("ke", "け"),
    ("ko", "こ"),
    ("sa", "さ"),
    ("si", "し"),
    ("su", "す"),
    ("se", "せ"),
    ("so", "そ"),
    ("ta", "た"),
    ("ti", "ち"),
    ("tu", "つ"),
    ("te", "て"),
    ("to", "と"),
    ("na", "な"),
    ("ni", "に"),
    ("nu", "ぬ"),
    ("ne", "ね"),
    ("no", "の"),
    ("ha", "は"),
    ("hi", "ひ"),
    ("hu", "ふ"),
    ("he", "へ"),
    ("ho", "ほ"),
    ("ma", "ま"),
    ("mi", "み"),
    ("mu", "む"),
    ("me", "め"),
    ("mo", "も"),
    ("ya", "や"),
    ("yu", "ゆ"),
    ("yo", "よ"),
    ("ra", "ら"),
    ("ri", "り"),
    ("ru", "る"),
    ("re", "れ"),
    ("ro", "ろ"),
    ("wa", "わ"),
    ("wo", "を"),
    ("ga", "が"),
    ("gi", "ぎ"),
    ("gu", "ぐ"),
    ("ge", "げ"),
    ("go", "ご"),
    ("za", "ざ"),
    ("zi", "じ"),
    ("zu", "ず"),
    ("ze", "ぜ"),
    ("zo", "ぞ"),
    ("da", "だ"),
    ("di", "ぢ"),
    ("du", "づ"),
    ("de", "で"),
    ("do", "ど"),
    ("ba", "ば"),
    ("bi", "び"),
    ("bu", "ぶ"),
    ("be", "べ"),
    ("bo", "ぼ"),
    ("pa", "ぱ"),
    ("pi", "ぴ"),
    ("pu", "ぷ"),
    ("pe", "ぺ"),
    ("po", "ぽ"),
    ("a", "あ"),
    ("i", "い"),
    ("u", "う"),
    ("e", "え"),
    ("o", "お"),
    ("n", "ん"),
];

/// Consonants that geminate: a doubled letter becomes っ plus the reading.
const GEMINATING: &str = "kstphgzbdrjmc";

/// Convert romaji input to hiragana, greedy over [`ROMAJI_TABLE`].
///
/// Unmatchable letters are skipped rather than failing: the output is a
/// search key, not a faithful transliteration.
pub fn romaji_to_hiragana(s: &str) -> String {
    let letters: Vec<char> = s
        .chars()
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_lowercase)
        .collect();
    if letters.is_empty() {
        return String::new();
    }
    let text: String = letters.iter().collect();

    let mut out = String::new();
    let mut i = 0;
    while i < letters.len() {
        if i + 1 < letters.len() && letters[i] == letters[i + 1] && GEMINATING.contains(letters[i])
        {
            out.push('っ');
            i += 1;
            continue;
        }
        let rest = &text[i..];
        let mut matched = false;
        for (key, kana) in ROMAJI_TABLE {
            if rest.starts_with(key) {
                out.push_str(kana);
                i += key.len();
                matched = true;
                break;
            }
        }
        if !matched {
            i += 1;
        }
    }
    out
}
