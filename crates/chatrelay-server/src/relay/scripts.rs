//! Canned replies used by the scripted (test) mode, and the keyword router
//! that picks one for a message.

use std::collections::HashMap;
use std::sync::Arc;

use rand::RngExt;
use serde::Deserialize;
use thiserror::Error;

use super::event::StructuredEvent;

const BUILTIN_SCRIPTS: &str = include_str!("../../scripts/demo_scripts.json");

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to parse script library: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown script key: {0}")]
    UnknownKey(String),
    #[error("script '{0}' is defined more than once")]
    Duplicate(&'static str),
    #[error("script '{0}' is missing")]
    Missing(&'static str),
    #[error("script '{key}' event {index} has a contentType that does not match its content")]
    InconsistentEvent { key: &'static str, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKey {
    NewYearResolutions,
    RandomQuoteJs,
    SentimentAnalysis,
}

impl ScriptKey {
    pub const ALL: [ScriptKey; 3] = [
        ScriptKey::NewYearResolutions,
        ScriptKey::RandomQuoteJs,
        ScriptKey::SentimentAnalysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScriptKey::NewYearResolutions => "new_year_resolutions",
            ScriptKey::RandomQuoteJs => "random_quote_js",
            ScriptKey::SentimentAnalysis => "sentiment_analysis",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            ScriptKey::NewYearResolutions => &["new year", "resolution"],
            ScriptKey::RandomQuoteJs => &["quote", "javascript"],
            ScriptKey::SentimentAnalysis => &["sentiment", "analysis", "python"],
        }
    }
}

/// Source of the fallback choice when no keyword matches.
pub trait ScriptPicker: Send + Sync {
    /// Return an index in `0..choices`. `choices` is never zero.
    fn pick(&self, choices: usize) -> usize;
}

/// Uniform choice from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngPicker;

impl ScriptPicker for ThreadRngPicker {
    fn pick(&self, choices: usize) -> usize {
        rand::rng().random_range(0..choices)
    }
}

/// Route a message to a script. Rules are checked in [`ScriptKey::ALL`]
/// order against the lowercased, trimmed message; the first hit wins.
pub fn select_script(message: &str, picker: &dyn ScriptPicker) -> ScriptKey {
    let normalized = message.trim().to_lowercase();

    ScriptKey::ALL
        .into_iter()
        .find(|key| {
            key.keywords()
                .iter()
                .any(|keyword| normalized.contains(keyword))
        })
        .unwrap_or_else(|| {
            let index = picker.pick(ScriptKey::ALL.len()) % ScriptKey::ALL.len();
            ScriptKey::ALL[index]
        })
}

#[derive(Deserialize)]
struct ScriptFile {
    scripts: Vec<ScriptEntry>,
}

#[derive(Deserialize)]
struct ScriptEntry {
    key: String,
    events: Vec<StructuredEvent>,
}

/// All scripts, validated at load and shared read-only between requests.
#[derive(Debug, Clone)]
pub struct ScriptLibrary {
    scripts: HashMap<ScriptKey, Arc<[StructuredEvent]>>,
}

impl ScriptLibrary {
    /// The demo scripts compiled into the binary.
    pub fn builtin() -> Result<Self, ScriptError> {
        Self::from_json(BUILTIN_SCRIPTS)
    }

    pub fn from_json(raw: &str) -> Result<Self, ScriptError> {
        let file: ScriptFile = serde_json::from_str(raw)?;
        let mut scripts = HashMap::new();

        for entry in file.scripts {
            let key = ScriptKey::parse(&entry.key).ok_or(ScriptError::UnknownKey(entry.key))?;
            if let Some(index) = entry.events.iter().position(|e| !e.is_consistent()) {
                return Err(ScriptError::InconsistentEvent {
                    key: key.as_str(),
                    index,
                });
            }
            if scripts.insert(key, Arc::from(entry.events)).is_some() {
                return Err(ScriptError::Duplicate(key.as_str()));
            }
        }

        if let Some(missing) = ScriptKey::ALL.into_iter().find(|k| !scripts.contains_key(k)) {
            return Err(ScriptError::Missing(missing.as_str()));
        }

        Ok(Self { scripts })
    }

    pub fn get(&self, key: ScriptKey) -> Arc<[StructuredEvent]> {
        // Presence of every key is checked in `from_json`.
        self.scripts.get(&key).cloned().unwrap_or_else(|| Arc::from(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::event::ContentType;

    struct FixedPicker(usize);

    impl ScriptPicker for FixedPicker {
        fn pick(&self, _choices: usize) -> usize {
            self.0
        }
    }

    #[test]
    fn resolution_routes_to_new_year_script() {
        let picker = FixedPicker(2);
        assert_eq!(
            select_script("My RESOLUTION for next year", &picker),
            ScriptKey::NewYearResolutions
        );
        assert_eq!(
            select_script("  happy new year!  ", &picker),
            ScriptKey::NewYearResolutions
        );
    }

    #[test]
    fn quote_routes_to_javascript_script() {
        let picker = FixedPicker(0);
        assert_eq!(
            select_script("show a random quote", &picker),
            ScriptKey::RandomQuoteJs
        );
        assert_eq!(
            select_script("JavaScript please", &picker),
            ScriptKey::RandomQuoteJs
        );
    }

    #[test]
    fn python_routes_to_sentiment_script() {
        let picker = FixedPicker(0);
        assert_eq!(
            select_script("write some python", &picker),
            ScriptKey::SentimentAnalysis
        );
    }

    #[test]
    fn earlier_rules_take_precedence() {
        let picker = FixedPicker(0);
        assert_eq!(
            select_script("python script for a new year resolution", &picker),
            ScriptKey::NewYearResolutions
        );
        assert_eq!(
            select_script("a python quote", &picker),
            ScriptKey::RandomQuoteJs
        );
    }

    #[test]
    fn fallback_uses_injected_picker() {
        assert_eq!(
            select_script("hello there", &FixedPicker(0)),
            ScriptKey::NewYearResolutions
        );
        assert_eq!(
            select_script("hello there", &FixedPicker(1)),
            ScriptKey::RandomQuoteJs
        );
        assert_eq!(
            select_script("hello there", &FixedPicker(2)),
            ScriptKey::SentimentAnalysis
        );
    }

    #[test]
    fn thread_rng_picker_stays_in_range() {
        for _ in 0..100 {
            assert!(ThreadRngPicker.pick(3) < 3);
        }
    }

    #[test]
    fn builtin_library_loads_every_script() {
        let library = ScriptLibrary::builtin().unwrap();
        for key in ScriptKey::ALL {
            assert!(!library.get(key).is_empty(), "{} is empty", key.as_str());
        }

        let has_python_code = library
            .get(ScriptKey::NewYearResolutions)
            .iter()
            .any(|event| {
                event.content_type == ContentType::Code
                    && event.code_block().is_some_and(|b| b.language == "python")
            });
        assert!(has_python_code);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = ScriptLibrary::from_json(r#"{"scripts":[{"key":"nope","events":[]}]}"#)
            .unwrap_err();
        assert!(matches!(err, ScriptError::UnknownKey(key) if key == "nope"));
    }

    #[test]
    fn rejects_missing_scripts() {
        let err = ScriptLibrary::from_json(
            r#"{"scripts":[{"key":"random_quote_js","events":[]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScriptError::Missing("new_year_resolutions")));
    }

    #[test]
    fn rejects_inconsistent_events() {
        let raw = r#"{"scripts":[{"key":"new_year_resolutions","events":[
            {"type":"thinking","contentType":"code","content":"plain text"}
        ]}]}"#;
        let err = ScriptLibrary::from_json(raw).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::InconsistentEvent {
                key: "new_year_resolutions",
                index: 0
            }
        ));
    }
}
