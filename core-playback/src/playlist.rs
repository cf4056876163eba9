//! Playlist parsing
//!
//! Accepts either a JSON array of URL strings or plain text with one URL
//! per line.

use crate::error::ParseError;
use serde_json::Value;
use std::str::FromStr;

/// One playlist position. Duplicate URLs are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub index: usize,
    pub url: String,
}

/// Ordered, immutable list of URLs; insertion order is playback order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
}

impl Playlist {
    /// Parse user input.
    ///
    /// Input that parses as JSON must be an array of non-empty strings.
    /// Anything else is split into lines; blank lines are ignored.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let urls = match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(position, item)| match item {
                    Value::String(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
                    _ => Err(ParseError::InvalidEntry { position }),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Ok(_) => return Err(ParseError::NotAnArray),
            Err(_) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        };

        if urls.is_empty() {
            return Err(ParseError::Empty);
        }

        Ok(Self::from_urls(urls))
    }

    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| PlaylistEntry {
                index,
                url: url.into(),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.entries.iter()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.url.as_str())
    }
}

impl FromStr for Playlist {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
