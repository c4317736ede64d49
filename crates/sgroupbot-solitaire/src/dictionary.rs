//! Idiom dictionary
//!
//! Built once at startup and shared read-only behind an `Arc`.

use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::SolitaireResult;

/// A fixed phrase together with its first and last unit.
///
/// A unit is a single `char`; idioms are CJK text where every character
/// is one scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Idiom {
    word: String,
    first: char,
    last: char,
}

impl Idiom {
    /// Build an idiom from its text. Returns `None` for blank input.
    pub fn new(word: impl Into<String>) -> Option<Self> {
        let word = word.into();
        let word = word.trim().to_string();
        let first = word.chars().next()?;
        let last = word.chars().last()?;
        Some(Self { word, first, last })
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn first(&self) -> char {
        self.first
    }

    pub fn last(&self) -> char {
        self.last
    }
}

/// On-disk entry: either a bare string or an object carrying `word`
/// (extra fields such as `pinyin` or `explanation` are ignored).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdiomRecord {
    Plain(String),
    Entry { word: String },
}

impl IdiomRecord {
    fn into_word(self) -> String {
        match self {
            IdiomRecord::Plain(word) | IdiomRecord::Entry { word } => word,
        }
    }
}

/// Immutable lookup structure over the idiom set.
#[derive(Debug, Default)]
pub struct IdiomDictionary {
    /// phrase -> its last unit
    last_unit: HashMap<String, char>,
    /// first unit -> phrases starting with it, in load order
    by_first_unit: HashMap<char, Vec<String>>,
    /// phrases whose last unit has at least one onward phrase
    starters: Vec<String>,
}

impl IdiomDictionary {
    /// Build the indexes. Duplicate phrases keep their first occurrence.
    pub fn new(idioms: impl IntoIterator<Item = Idiom>) -> Self {
        let mut last_unit = HashMap::new();
        let mut by_first_unit: HashMap<char, Vec<String>> = HashMap::new();
        let mut order = Vec::new();

        for idiom in idioms {
            if last_unit.contains_key(&idiom.word) {
                continue;
            }
            last_unit.insert(idiom.word.clone(), idiom.last);
            by_first_unit
                .entry(idiom.first)
                .or_default()
                .push(idiom.word.clone());
            order.push(idiom.word);
        }

        let starters = order
            .into_iter()
            .filter(|word| {
                last_unit
                    .get(word)
                    .is_some_and(|last| by_first_unit.contains_key(last))
            })
            .collect();

        Self {
            last_unit,
            by_first_unit,
            starters,
        }
    }

    /// Build from plain phrase texts; blank entries are skipped.
    pub fn from_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(phrases.into_iter().filter_map(Idiom::new))
    }

    /// Parse a JSON array of idiom entries.
    pub fn from_json_slice(bytes: &[u8]) -> SolitaireResult<Self> {
        let records: Vec<IdiomRecord> = serde_json::from_slice(bytes)?;
        Ok(Self::from_phrases(records.into_iter().map(IdiomRecord::into_word)))
    }

    /// Load the dictionary file.
    pub async fn load(path: &Path) -> SolitaireResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let dictionary = Self::from_json_slice(&bytes)?;
        info!(
            path = %path.display(),
            phrases = dictionary.len(),
            starters = dictionary.starters.len(),
            "Idiom dictionary loaded"
        );
        Ok(dictionary)
    }

    pub fn len(&self) -> usize {
        self.last_unit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_unit.is_empty()
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.last_unit.contains_key(phrase)
    }

    /// Last unit of a dictionary phrase, `None` if the phrase is unknown.
    pub fn last_unit(&self, phrase: &str) -> Option<char> {
        self.last_unit.get(phrase).copied()
    }

    /// Phrases that begin with `unit`.
    pub fn starting_with(&self, unit: char) -> &[String] {
        self.by_first_unit
            .get(&unit)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether at least one phrase begins with `unit`.
    pub fn has_onward(&self, unit: char) -> bool {
        self.by_first_unit.contains_key(&unit)
    }

    /// Number of phrases usable as an opening phrase.
    pub fn starter_count(&self) -> usize {
        self.starters.len()
    }

    /// A random continuable phrase and its last unit.
    pub fn random_starter(&self) -> Option<(&str, char)> {
        let word = self.starters.choose(&mut rand::thread_rng())?;
        let last = self.last_unit(word)?;
        Some((word.as_str(), last))
    }

    /// Next phrase the bot can put forward after `phrase`.
    ///
    /// Picks the first candidate (other than `phrase` itself) starting with
    /// the last unit of `phrase` whose own last unit has an onward phrase.
    /// The lookahead is one step deep only.
    pub fn next_continuable(&self, phrase: &str) -> Option<(&str, char)> {
        let last = self.last_unit(phrase)?;
        self.starting_with(last)
            .iter()
            .filter(|candidate| candidate.as_str() != phrase)
            .find_map(|candidate| {
                let candidate_last = self.last_unit(candidate)?;
                self.has_onward(candidate_last)
                    .then_some((candidate.as_str(), candidate_last))
            })
    }

    /// Whether `answer` is a dictionary phrase beginning with `unit`.
    pub fn accepts(&self, answer: &str, unit: char) -> bool {
        self.contains(answer) && answer.chars().next() == Some(unit)
    }
}
