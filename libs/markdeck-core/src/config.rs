//! Extraction and synchronization settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings that drive the pattern grammar, the extraction pipeline and the
/// anchor formats written back into documents.
///
/// A `Config` must pass [`Config::validate`] before it is handed to an
/// extractor; degenerate separators or tags are rejected here rather than
/// surfacing as silent mis-parses later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Prepend the ancestor-heading chain to every question.
    pub context_aware_mode: bool,
    /// Separator between ancestor headings and the question text.
    pub context_separator: String,
    /// Deck used when neither front matter nor folder naming provides one.
    pub deck: String,
    /// Trigger tag for tagged and spaced cards, without the leading `#`.
    pub flashcards_tag: String,
    /// Separator of an inline card, question side first.
    pub inline_separator: String,
    /// Separator of a reversed inline card.
    pub inline_separator_reverse: String,
    /// Write inline identifiers on the same line instead of the next one.
    pub inline_id: bool,
    /// Hide inline identifiers inside an HTML comment.
    pub hidden_id: bool,
    /// Extra tag appended to every card; empty means none.
    pub default_tag: String,
    /// Derive the deck from the file's folder path (`a/b/note.md` -> `a::b`).
    pub folder_based_deck: bool,
    /// Add a `Source` field linking back to the note, and bind the `-source`
    /// model variants.
    pub source_support: bool,
    /// Provision code-highlight media and bind the `-code` model variants for
    /// cards containing code.
    pub code_highlight_support: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context_aware_mode: true,
            context_separator: " > ".to_string(),
            deck: "Default".to_string(),
            flashcards_tag: "card".to_string(),
            inline_separator: "::".to_string(),
            inline_separator_reverse: ":::".to_string(),
            inline_id: false,
            hidden_id: false,
            default_tag: String::new(),
            folder_based_deck: false,
            source_support: false,
            code_highlight_support: false,
        }
    }
}

impl Config {
    /// Check the configuration for degenerate values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flashcards_tag.is_empty() {
            return Err(ConfigError::EmptyTag);
        }
        if self.flashcards_tag.chars().any(char::is_whitespace) {
            return Err(ConfigError::TagContainsWhitespace(
                self.flashcards_tag.clone(),
            ));
        }
        if self.deck.is_empty() {
            return Err(ConfigError::EmptyDeck);
        }
        if self.inline_separator.is_empty() || self.inline_separator_reverse.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        if self.inline_separator == self.inline_separator_reverse {
            return Err(ConfigError::EqualSeparators(self.inline_separator.clone()));
        }
        if !self.default_tag.is_empty() && self.default_tag.chars().any(char::is_whitespace) {
            return Err(ConfigError::DefaultTagContainsWhitespace(
                self.default_tag.clone(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn reject_empty_tag() {
        let config = Config {
            flashcards_tag: String::new(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyTag));
    }

    #[test]
    fn reject_equal_separators() {
        let config = Config {
            inline_separator: "::".to_string(),
            inline_separator_reverse: "::".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EqualSeparators("::".to_string()))
        );
    }

    #[test]
    fn reject_empty_separator() {
        let config = Config {
            inline_separator: String::new(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptySeparator));
    }

    #[test]
    fn reject_whitespace_in_tag() {
        let config = Config {
            flashcards_tag: "my card".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TagContainsWhitespace(_))
        ));
    }
}
