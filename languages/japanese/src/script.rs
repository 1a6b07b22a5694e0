/// Writing system of a single character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Hiragana,
    Katakana,
    Kanji,
    Latin,
    Other,
}

impl Script {
    pub fn of(c: char) -> Self {
        match c {
            '\u{3041}'..='\u{3096}' | '\u{309D}'..='\u{309F}' => Script::Hiragana,
            '\u{30A1}'..='\u{30FA}' | '\u{30FC}'..='\u{30FF}' => Script::Katakana,
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}' | '々' => {
                Script::Kanji
            }
            c if c.is_ascii_alphabetic() => Script::Latin,
            _ => Script::Other,
        }
    }

    pub fn is_japanese(self) -> bool {
        matches!(self, Script::Hiragana | Script::Katakana | Script::Kanji)
    }

    pub fn is_kana(self) -> bool {
        matches!(self, Script::Hiragana | Script::Katakana)
    }
}

/// Kana-only words need no separate reading
pub fn is_kana_only(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| Script::of(c).is_kana())
}

pub fn has_japanese(text: &str) -> bool {
    text.chars().any(|c| Script::of(c).is_japanese())
}

/// Katakana → hiragana; everything else passes through
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{30A1}'..='\u{30F6}' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_scripts() {
        assert_eq!(Script::of('ね'), Script::Hiragana);
        assert_eq!(Script::of('ネ'), Script::Katakana);
        assert_eq!(Script::of('ー'), Script::Katakana);
        assert_eq!(Script::of('猫'), Script::Kanji);
        assert_eq!(Script::of('々'), Script::Kanji);
        assert_eq!(Script::of('a'), Script::Latin);
        assert_eq!(Script::of('!'), Script::Other);
    }

    #[test]
    fn converts_katakana() {
        assert_eq!(katakana_to_hiragana("カタカナ"), "かたかな");
        assert_eq!(katakana_to_hiragana("コーヒー"), "こーひー");
        assert_eq!(katakana_to_hiragana("猫ネコ"), "猫ねこ");
    }

    #[test]
    fn kana_only() {
        assert!(is_kana_only("ねこ"));
        assert!(is_kana_only("テレビ"));
        assert!(!is_kana_only("猫"));
        assert!(!is_kana_only(""));
    }
}
