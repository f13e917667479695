use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::akn::NodeId;

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());

/// Lowercase `text` and collapse each run of non-word characters to a single hyphen.
pub fn slug(text: &str) -> String {
    NON_WORD_RE
        .replace_all(&text.to_lowercase(), "-")
        .into_owned()
}

#[derive(Debug, Clone)]
pub struct Speaker {
    pub name: String,
    pub slug: String,
    /// `TLCPerson` entry in the metadata references, once registered.
    pub reference: Option<NodeId>,
}

/// Display name → speaker, created on first sight and stable afterwards.
#[derive(Debug, Default, Clone)]
pub struct SpeakerRegistry {
    speakers: HashMap<String, Speaker>,
}

impl SpeakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for `name`, creating the entry if this name hasn't been seen.
    pub fn resolve(&mut self, name: &str) -> String {
        self.speakers
            .entry(name.to_string())
            .or_insert_with(|| Speaker {
                name: name.to_string(),
                slug: slug(name),
                reference: None,
            })
            .slug
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<&Speaker> {
        self.speakers.get(name)
    }

    /// The speaker for `name` if it still lacks a metadata reference.
    pub fn unregistered(&self, name: &str) -> Option<&Speaker> {
        self.speakers.get(name).filter(|s| s.reference.is_none())
    }

    pub fn set_reference(&mut self, name: &str, node: NodeId) {
        if let Some(speaker) = self.speakers.get_mut(name) {
            speaker.reference = Some(node);
        }
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}
