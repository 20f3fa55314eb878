//! Languages and language masks
//!
//! Every configured language owns one bit of a mask, bit 0 is reserved for the "always
//! available" flag

use std::collections::HashMap;

use serde::Serialize;

/// Bit marking an alias as available in every language
const ALWAYS_AVAILABLE: i64 = 1;

/// Highest amount of languages that fit in a mask next to the always available bit
pub const MAX_LANGUAGES: usize = 62;

/// Bitset of the languages an alias is valid for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct LanguageMask(i64);

impl LanguageMask {
    /// Mask without any language
    pub const EMPTY: Self = Self(0);

    /// Create a mask from its raw value
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Mask containing a single language
    pub fn from_language(language: &Language) -> Self {
        Self(language.id)
    }

    /// Raw value, as persisted
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Set or clear the always available flag
    #[must_use]
    pub fn with_always_available(self, always_available: bool) -> Self {
        if always_available {
            Self(self.0 | ALWAYS_AVAILABLE)
        } else {
            Self(self.0 & !ALWAYS_AVAILABLE)
        }
    }

    /// Is the always available flag set?
    pub fn is_always_available(self) -> bool {
        self.0 & ALWAYS_AVAILABLE != 0
    }

    /// Union of both masks
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove a single language bit
    #[must_use]
    pub fn strip(self, language: &Language) -> Self {
        Self(self.0 & !language.id)
    }

    /// Does the mask contain the language?
    pub fn contains(self, language: &Language) -> bool {
        self.0 & language.id != 0
    }

    /// Only the language bits, without the always available flag
    fn language_bits(self) -> i64 {
        self.0 & !ALWAYS_AVAILABLE
    }

    /// Does the mask consist of more than one language?
    pub fn is_composite(self) -> bool {
        self.language_bits().count_ones() > 1
    }

    /// Is the mask usable for any of the languages in `wanted`?
    ///
    /// Always available masks match everything
    pub fn matches(self, wanted: Self) -> bool {
        self.is_always_available() || self.language_bits() & wanted.language_bits() != 0
    }

    /// Lowest language bit in the mask, used as a stable tie breaker
    fn lowest_language_bit(self) -> i64 {
        let bits = self.language_bits();

        if bits == 0 { i64::MAX } else { bits & -bits }
    }
}

/// A configured language
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Language {
    /// Bit of the language in a mask
    pub id: i64,

    /// Language code, like `eng-GB`
    pub code: String,
}

/// Registry of all configured languages
#[derive(Clone, Debug)]
pub struct Languages {
    /// Languages in configuration order
    languages: Vec<Language>,

    /// Index by language code
    by_code: HashMap<String, usize>,
}

impl Languages {
    /// Build the registry, the first code is the default language
    ///
    /// Duplicated codes are ignored, `None` when no language is left or when there are too many
    pub fn new<I, C>(codes: I) -> Option<Self>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let mut languages = Vec::new();
        let mut by_code = HashMap::new();

        for code in codes {
            let code = code.as_ref().trim();

            if code.is_empty() || by_code.contains_key(code) {
                continue;
            }

            if languages.len() == MAX_LANGUAGES {
                return None;
            }

            by_code.insert(code.to_string(), languages.len());
            languages.push(Language {
                id: 1 << (languages.len() + 1),
                code: code.to_string(),
            });
        }

        if languages.is_empty() {
            None
        } else {
            Some(Self { languages, by_code })
        }
    }

    /// The default language, used when no language is given
    pub fn default_language(&self) -> &Language {
        &self.languages[0]
    }

    /// Find a language by its code
    pub fn by_code(&self, code: &str) -> Option<&Language> {
        self.by_code.get(code).map(|index| &self.languages[*index])
    }

    /// Mask of all known languages in `codes`, unknown codes are skipped
    pub fn mask_for<C>(&self, codes: &[C]) -> LanguageMask
    where
        C: AsRef<str>,
    {
        codes
            .iter()
            .filter_map(|code| self.by_code(code.as_ref()))
            .fold(LanguageMask::EMPTY, |mask, language| {
                mask.merge(LanguageMask::from_language(language))
            })
    }

    /// Codes of all languages in the mask, in configuration order
    pub fn codes_for(&self, mask: LanguageMask) -> Vec<String> {
        self.languages
            .iter()
            .filter(|language| mask.contains(language))
            .map(|language| language.code.clone())
            .collect()
    }

    /// Rank a mask against prioritized language codes, lower is better
    ///
    /// The position of the first prioritized language in the mask wins, then always available
    /// masks, then the lowest language bit
    pub fn rank<C>(&self, mask: LanguageMask, prioritized: &[C]) -> (usize, i64)
    where
        C: AsRef<str>,
    {
        let position = prioritized.iter().position(|code| {
            self.by_code(code.as_ref())
                .is_some_and(|language| mask.contains(language))
        });

        match position {
            Some(position) => (position, 0),
            None if mask.is_always_available() => (prioritized.len(), 0),
            None => (prioritized.len() + 1, mask.lowest_language_bit()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages() -> Languages {
        Languages::new(["eng-GB", "ger-DE", "nor-NO"]).unwrap()
    }

    #[test]
    fn test_language_ids() {
        let languages = languages();

        assert_eq!(2, languages.by_code("eng-GB").unwrap().id);
        assert_eq!(4, languages.by_code("ger-DE").unwrap().id);
        assert_eq!(8, languages.by_code("nor-NO").unwrap().id);
        assert_eq!("eng-GB", languages.default_language().code);
        assert!(languages.by_code("fre-FR").is_none());
    }

    #[test]
    fn test_empty_languages() {
        assert!(Languages::new(Vec::<String>::new()).is_none());
        assert!(Languages::new([" ", ""]).is_none());
    }

    #[test]
    fn test_composite_mask() {
        let languages = languages();
        let eng = languages.by_code("eng-GB").unwrap();
        let ger = languages.by_code("ger-DE").unwrap();

        let mask = LanguageMask::from_language(eng).with_always_available(true);
        assert!(!mask.is_composite());

        let mask = mask.merge(LanguageMask::from_language(ger));
        assert!(mask.is_composite());
        assert_eq!(7, mask.raw());

        let mask = mask.strip(ger);
        assert!(!mask.is_composite());
        assert!(mask.contains(eng));
        assert!(!mask.contains(ger));
        assert!(mask.is_always_available());
    }

    #[test]
    fn test_matches() {
        let languages = languages();
        let ger = languages.by_code("ger-DE").unwrap();

        let wanted = languages.mask_for(&["eng-GB", "unknown"]);
        assert_eq!(2, wanted.raw());

        let mask = LanguageMask::from_language(ger);
        assert!(!mask.matches(wanted));
        assert!(mask.with_always_available(true).matches(wanted));
        assert!(!mask.matches(LanguageMask::EMPTY));
    }

    #[test]
    fn test_rank() {
        let languages = languages();
        let prioritized = ["ger-DE", "eng-GB"];

        let eng = languages.mask_for(&["eng-GB"]);
        let ger = languages.mask_for(&["ger-DE"]);
        let nor = languages.mask_for(&["nor-NO"]);

        assert!(languages.rank(ger, &prioritized) < languages.rank(eng, &prioritized));
        assert!(
            languages.rank(nor.with_always_available(true), &prioritized)
                < languages.rank(nor, &prioritized)
        );
        assert_eq!(
            vec!["eng-GB".to_string(), "nor-NO".to_string()],
            languages.codes_for(eng.merge(nor))
        );
    }
}
