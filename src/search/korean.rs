//! Korean text normalization for search.
//!
//! Hangul syllables decompose into jamo so queries match regardless of how
//! syllables combine. The sound-based variant additionally applies liaison
//! and nasal/lateral assimilation so a query typed the way a phrase is
//! pronounced still finds the orthographic transcript.

/// Initial consonants (choseong), in Unicode composition order.
const CHO: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ',
    'ㅋ', 'ㅌ', 'ㅍ', 'ㅎ',
];

/// Medial vowels (jungseong).
const JUNG: [char; 21] = [
    'ㅏ', 'ㅐ', 'ㅑ', 'ㅒ', 'ㅓ', 'ㅔ', 'ㅕ', 'ㅖ', 'ㅗ', 'ㅘ', 'ㅙ', 'ㅚ', 'ㅛ', 'ㅜ', 'ㅝ',
    'ㅞ', 'ㅟ', 'ㅠ', 'ㅡ', 'ㅢ', 'ㅣ',
];

/// Final consonants (jongseong); index 0 is "no final".
const JONG: [Option<char>; 28] = [
    None,
    Some('ㄱ'),
    Some('ㄲ'),
    Some('ㄳ'),
    Some('ㄴ'),
    Some('ㄵ'),
    Some('ㄶ'),
    Some('ㄷ'),
    Some('ㄹ'),
    Some('ㄺ'),
    Some('ㄻ'),
    Some('ㄼ'),
    Some('ㄽ'),
    Some('ㄾ'),
    Some('ㄿ'),
    Some('ㅀ'),
    Some('ㅁ'),
    Some('ㅂ'),
    Some('ㅄ'),
    Some('ㅅ'),
    Some('ㅆ'),
    Some('ㅇ'),
    Some('ㅈ'),
    Some('ㅊ'),
    Some('ㅋ'),
    Some('ㅌ'),
    Some('ㅍ'),
    Some('ㅎ'),
];

/// A syllable decomposed for pronunciation rules, or a passthrough character.
#[derive(Debug, Clone, PartialEq)]
enum Unit {
    Hangul {
        cho: char,
        jung: char,
        jong: Option<char>,
    },
    Other(char),
}

/// True for precomposed Hangul syllables (U+AC00..=U+D7A3).
pub fn is_hangul_syllable(ch: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&ch)
}

/// Lowercase, strip whitespace and common punctuation.
pub fn sanitize_for_match(s: &str) -> String {
    const PUNCT: &str = "\"'.,!?(){}[]:;~`@#$%^&*+=/\\|<>—-";
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|ch| !ch.is_whitespace() && !PUNCT.contains(*ch))
        .collect()
}

fn decompose_syllable(ch: char) -> Option<(char, char, Option<char>)> {
    if !is_hangul_syllable(ch) {
        return None;
    }
    let idx = ch as u32 - 0xAC00;
    let cho = CHO[(idx / 588) as usize];
    let jung = JUNG[((idx % 588) / 28) as usize];
    let jong = JONG[(idx % 28) as usize];
    Some((cho, jung, jong))
}

/// Flatten Hangul syllables to jamo; keep other alphanumerics.
pub fn hangul_to_jamo(s: &str) -> String {
    let mut out = String::new();
    for ch in s.chars() {
        if let Some((cho, jung, jong)) = decompose_syllable(ch) {
            out.push(cho);
            out.push(jung);
            if let Some(j) = jong {
                out.push(j);
            }
        } else if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Reduce a final consonant to the onset class it is pronounced as.
fn simplify_final_for_pron(jong: char) -> char {
    match jong {
        'ㄱ' | 'ㄲ' | 'ㄳ' => 'ㄱ',
        'ㄴ' | 'ㄵ' | 'ㄶ' => 'ㄴ',
        'ㄷ' => 'ㄷ',
        'ㄹ' | 'ㄺ' | 'ㄻ' | 'ㄼ' | 'ㄽ' | 'ㄾ' | 'ㄿ' | 'ㅀ' => 'ㄹ',
        'ㅁ' => 'ㅁ',
        'ㅂ' | 'ㅄ' => 'ㅂ',
        'ㅅ' => 'ㅅ',
        'ㅆ' => 'ㅆ',
        'ㅇ' => 'ㅇ',
        'ㅈ' => 'ㅈ',
        'ㅊ' => 'ㅊ',
        'ㅋ' => 'ㅋ',
        'ㅌ' => 'ㅌ',
        'ㅍ' => 'ㅍ',
        'ㅎ' => 'ㅎ',
        other => other,
    }
}

fn decompose(s: &str) -> Vec<Unit> {
    sanitize_for_match(s)
        .chars()
        .filter_map(|ch| {
            if let Some((cho, jung, jong)) = decompose_syllable(ch) {
                Some(Unit::Hangul { cho, jung, jong })
            } else if ch.is_alphanumeric() {
                Some(Unit::Other(ch))
            } else {
                None
            }
        })
        .collect()
}

/// Carry a final consonant onto a following vowel-initial syllable (연음).
fn apply_liaison(units: &mut [Unit]) {
    for i in 0..units.len().saturating_sub(1) {
        let (left, right) = units.split_at_mut(i + 1);
        let (Unit::Hangul { jong, .. }, Unit::Hangul { cho, .. }) = (&mut left[i], &mut right[0])
        else {
            continue;
        };
        let Some(final_consonant) = *jong else {
            continue;
        };
        if *cho != 'ㅇ' {
            continue;
        }
        *cho = simplify_final_for_pron(final_consonant);
        *jong = None;
    }
}

/// Nasal and lateral assimilation across syllable boundaries.
fn apply_assimilation(units: &mut [Unit]) {
    let nasal_next = ['ㄴ', 'ㅁ'];
    let velar = ['ㄱ', 'ㅋ', 'ㄲ', 'ㄳ', 'ㄺ'];
    let alveolar = ['ㄷ', 'ㅅ', 'ㅆ', 'ㅈ', 'ㅊ', 'ㅌ', 'ㅎ'];
    let labial = ['ㅂ', 'ㅍ', 'ㅄ'];

    for i in 0..units.len().saturating_sub(1) {
        let (left, right) = units.split_at_mut(i + 1);
        let (Unit::Hangul { jong, .. }, Unit::Hangul { cho, .. }) = (&mut left[i], &mut right[0])
        else {
            continue;
        };
        let Some(final_consonant) = *jong else {
            continue;
        };

        let jong_rep = simplify_final_for_pron(final_consonant);
        if jong_rep == 'ㄴ' && *cho == 'ㄹ' {
            *jong = Some('ㄹ');
            *cho = 'ㄹ';
            continue;
        }
        if jong_rep == 'ㄹ' && *cho == 'ㄴ' {
            *jong = Some('ㄹ');
            *cho = 'ㄹ';
            continue;
        }

        if nasal_next.contains(cho) {
            if velar.contains(&final_consonant) {
                *jong = Some('ㅇ');
            } else if alveolar.contains(&final_consonant) {
                *jong = Some('ㄴ');
            } else if labial.contains(&final_consonant) {
                *jong = Some('ㅁ');
            }
        }
    }
}

fn units_to_jamo(units: &[Unit]) -> String {
    let mut out = String::new();
    for unit in units {
        match unit {
            Unit::Other(ch) => out.push(*ch),
            Unit::Hangul { cho, jung, jong } => {
                out.push(*cho);
                out.push(*jung);
                if let Some(j) = jong {
                    out.push(*j);
                }
            }
        }
    }
    out
}

/// Sound-based normalization: liaison + assimilation + final simplification.
pub fn norm_ko_sound(s: &str) -> String {
    let mut units = decompose(s);
    apply_liaison(&mut units);
    apply_assimilation(&mut units);

    for unit in &mut units {
        if let Unit::Hangul { jong, .. } = unit {
            *jong = jong.map(simplify_final_for_pron);
        }
    }

    units_to_jamo(&units)
}

fn onset_to_romaji(cho: char) -> Option<&'static str> {
    Some(match cho {
        'ㅇ' => "",
        'ㄱ' => "g",
        'ㄲ' | 'ㅋ' => "k",
        'ㄴ' => "n",
        'ㄷ' => "d",
        'ㄸ' | 'ㅌ' => "t",
        'ㄹ' => "r",
        'ㅁ' => "m",
        'ㅂ' => "b",
        'ㅃ' | 'ㅍ' => "p",
        'ㅅ' | 'ㅆ' => "s",
        'ㅈ' => "j",
        'ㅉ' | 'ㅊ' => "ch",
        'ㅎ' => "h",
        _ => return None,
    })
}

fn vowel_to_romaji(jung: char) -> Option<&'static str> {
    Some(match jung {
        'ㅏ' => "a",
        'ㅐ' | 'ㅔ' => "e",
        'ㅑ' | 'ㅒ' => "ya",
        'ㅓ' | 'ㅗ' | 'ㅚ' => "o",
        'ㅕ' | 'ㅛ' => "yo",
        'ㅖ' => "ye",
        'ㅘ' => "wa",
        'ㅙ' | 'ㅞ' => "we",
        'ㅜ' | 'ㅡ' => "u",
        'ㅝ' => "wo",
        'ㅟ' => "wi",
        'ㅠ' => "yu",
        'ㅢ' | 'ㅣ' => "i",
        _ => return None,
    })
}

/// Approximate a Hangul query as hiragana via a romaji bridge.
///
/// Finals are intentionally dropped: the goal is a fuzzy phonetic key for
/// matching against Japanese transcripts, not a transliteration.
pub fn hangul_to_hiragana_guess(s: &str) -> String {
    let mut romaji = String::new();
    for ch in s.chars().filter(|ch| !ch.is_whitespace()) {
        if let Some((cho, jung, _)) = decompose_syllable(ch) {
            if let (Some(onset), Some(vowel)) = (onset_to_romaji(cho), vowel_to_romaji(jung)) {
                romaji.push_str(onset);
                romaji.push_str(vowel);
            }
        } else if ch.is_ascii_alphabetic() {
            romaji.push(ch.to_ascii_lowercase());
        }
    }
    super::japanese::romaji_to_hiragana(&romaji)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hangul_syllable() {
        assert!(is_hangul_syllable('가'));
        assert!(is_hangul_syllable('힣'));
        assert!(!is_hangul_syllable('ㄱ')); // bare jamo, not a syllable
        assert!(!is_hangul_syllable('a'));
        assert!(!is_hangul_syllable('あ'));
    }

    #[test]
    fn test_sanitize_strips_punctuation_and_space() {
        assert_eq!(sanitize_for_match("  안녕, 세상!  "), "안녕세상");
        assert_eq!(sanitize_for_match("Hello-World"), "helloworld");
        assert_eq!(sanitize_for_match("a—b"), "ab");
    }

    #[test]
    fn test_hangul_to_jamo_decomposes() {
        // 안 = ㅇ+ㅏ+ㄴ, 녕 = ㄴ+ㅕ+ㅇ
        assert_eq!(hangul_to_jamo("안녕"), "ㅇㅏㄴㄴㅕㅇ");
    }

    #[test]
    fn test_hangul_to_jamo_keeps_alphanumerics() {
        assert_eq!(hangul_to_jamo("abc123"), "abc123");
        assert_eq!(hangul_to_jamo("가a"), "ㄱㅏa");
    }

    #[test]
    fn test_hangul_to_jamo_drops_symbols() {
        assert_eq!(hangul_to_jamo("가!?"), "ㄱㅏ");
    }

    #[test]
    fn test_decompose_open_syllable_has_no_final() {
        assert_eq!(decompose_syllable('가'), Some(('ㄱ', 'ㅏ', None)));
        assert_eq!(decompose_syllable('각'), Some(('ㄱ', 'ㅏ', Some('ㄱ'))));
    }

    #[test]
    fn test_liaison_moves_final_onto_vowel() {
        // 음악 pronounced 으막: ㅁ moves onto the 악 syllable
        assert_eq!(norm_ko_sound("음악"), "ㅇㅡㅁㅏㄱ");
    }

    #[test]
    fn test_nasal_assimilation_velar() {
        // 국물 pronounced 궁물: ㄱ before ㅁ becomes ㅇ
        assert_eq!(norm_ko_sound("국물"), "ㄱㅜㅇㅁㅜㄹ");
    }

    #[test]
    fn test_lateral_assimilation() {
        // 신라 pronounced 실라: ㄴ+ㄹ → ㄹ+ㄹ
        assert_eq!(norm_ko_sound("신라"), "ㅅㅣㄹㄹㅏ");
        // 설날 pronounced 설랄: ㄹ+ㄴ → ㄹ+ㄹ
        assert_eq!(norm_ko_sound("설날"), "ㅅㅓㄹㄹㅏㄹ");
    }

    #[test]
    fn test_final_simplification() {
        // 부엌: ㅋ final simplifies to ㄱ
        assert_eq!(norm_ko_sound("부엌"), "ㅂㅜㅇㅓㄱ");
    }

    #[test]
    fn test_norm_ko_sound_same_pronunciation_matches() {
        // Orthographic 국물 and phonetic spelling 궁물 normalize identically
        assert_eq!(norm_ko_sound("국물"), norm_ko_sound("궁물"));
        assert_eq!(norm_ko_sound("신라"), norm_ko_sound("실라"));
    }

    #[test]
    fn test_hangul_to_hiragana_guess_basic() {
        // 가 → "ga" → が
        assert_eq!(hangul_to_hiragana_guess("가"), "が");
        // 나 → "na" → な
        assert_eq!(hangul_to_hiragana_guess("나"), "な");
    }

    #[test]
    fn test_hangul_to_hiragana_guess_ignores_symbols() {
        assert_eq!(hangul_to_hiragana_guess("가!"), "が");
        assert_eq!(hangul_to_hiragana_guess(""), "");
    }
}
