//! Word-list profanity detection.
//!
//! Text is lower-cased and common look-alike substitutions are folded
//! (`0→o 1→i 3→e 4→a 5→s 7→t @→a $→s`) before matching. Each listed word
//! compiles to a whole-word pattern where every letter run may be stretched
//! (`shit` also matches `shiiiit`), so repeated letters never evade the
//! filter while shorter innocent words are left alone.

use regex::Regex;

use crate::settings::ModerationSettings;

pub const DEFAULT_WORDS: &[&str] = &[
    "fuck",
    "fucking",
    "fucker",
    "motherfucker",
    "shit",
    "shitty",
    "bullshit",
    "bitch",
    "bastard",
    "asshole",
    "dickhead",
    "cunt",
    "wanker",
    "twat",
    "prick",
];

#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    pattern: Option<Regex>,
}

fn fold(c: char) -> char {
    match c {
        '0' => 'o',
        '1' => 'i',
        '3' => 'e',
        '4' => 'a',
        '5' => 's',
        '7' => 't',
        '@' => 'a',
        '$' => 's',
        other => other,
    }
}

/// Lower-case and fold look-alike characters.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().chars().map(fold).collect()
}

/// `ass` -> `a+s{2,}`: each run of a letter must appear at least as often
/// as in the listed word, and may repeat further.
fn stretch_pattern(word: &str) -> String {
    let mut pattern = String::new();
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        let mut run = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }
        pattern.push_str(&regex::escape(&c.to_string()));
        if run == 1 {
            pattern.push('+');
        } else {
            pattern.push_str(&format!("{{{run},}}"));
        }
    }
    pattern
}

impl ProfanityFilter {
    pub fn new<I, S>(words: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut alternatives: Vec<String> = words
            .into_iter()
            .map(|w| normalize(w.as_ref().trim()))
            .filter(|w| !w.is_empty())
            .map(|w| stretch_pattern(&w))
            .collect();
        alternatives.sort();
        alternatives.dedup();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn from_settings(settings: &ModerationSettings) -> Result<Self, regex::Error> {
        let base: Vec<String> = if settings.profanity_words.is_empty() {
            DEFAULT_WORDS.iter().map(|w| w.to_string()).collect()
        } else {
            settings.profanity_words.clone()
        };
        Self::new(base.into_iter().chain(settings.extra_profanity_words.iter().cloned()))
    }

    /// The first offending fragment, as it appears after normalization.
    pub fn find(&self, text: &str) -> Option<String> {
        let pattern = self.pattern.as_ref()?;
        let normalized = normalize(text);
        pattern.find(&normalized).map(|m| m.as_str().to_string())
    }

    pub fn is_profane(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS).unwrap_or(Self { pattern: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ProfanityFilter {
        ProfanityFilter::new(DEFAULT_WORDS).unwrap()
    }

    #[test]
    fn clean_text_passes() {
        let filter = filter();
        for text in [
            "Great crate, works as advertised",
            "Shitake mushrooms are tasty",
            "Scunthorpe is a town",
            "The class passes every test",
            "",
        ] {
            assert!(!filter.is_profane(text), "{text:?} flagged");
        }
    }

    #[test]
    fn catches_case_substitutions_and_stretching() {
        let filter = filter();
        for text in ["This is SHIT", "what a sh1t", "$h1t happens", "shiiiiit", "@$$hole move"] {
            assert!(filter.is_profane(text), "{text:?} not flagged");
        }
        assert_eq!(filter.find("total B1TCH").as_deref(), Some("bitch"));
    }

    #[test]
    fn doubled_letters_keep_minimum() {
        let filter = ProfanityFilter::new(["ass"]).unwrap();
        assert!(filter.is_profane("what an ass"));
        assert!(filter.is_profane("what an asssss"));
        assert!(!filter.is_profane("as expected"));

        let filter = ProfanityFilter::new(["bullshit"]).unwrap();
        assert!(filter.is_profane("bulllllshit"));
        assert!(!filter.is_profane("bulshit"));
    }

    #[test]
    fn settings_replace_and_extend_list() {
        let settings = ModerationSettings {
            profanity_words: vec!["darn".into()],
            extra_profanity_words: vec!["heck".into()],
        };
        let filter = ProfanityFilter::from_settings(&settings).unwrap();
        assert!(filter.is_profane("darn it"));
        assert!(filter.is_profane("what the h3ck"));
        assert!(!filter.is_profane("this is shit"));
    }

    #[test]
    fn empty_list_never_matches() {
        let filter = ProfanityFilter::new(Vec::<String>::new()).unwrap();
        assert!(!filter.is_profane("shit"));
    }
}
