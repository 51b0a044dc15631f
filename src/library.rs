//! Library view composer
//!
//! Assembles filtered view models from media records. Filters combine
//! with AND across categories and OR within one; every comparison is
//! case-insensitive. Record order is always preserved.

use serde::Serialize;

use crate::api::MediaItemResponse;
use crate::config::CategoryConfig;
use crate::data::Media;

/// A view filter; an empty set means "no filter" for that category
#[derive(Debug, Clone, Default, Serialize)]
pub struct LibraryFilter {
    /// MIME prefixes (e.g. "audio/")
    pub types: Vec<String>,
    pub tags: Vec<String>,
    pub playlist_tags: Vec<String>,
}

impl LibraryFilter {
    pub fn matches(&self, record: &Media) -> bool {
        let mime = record.mime_type.to_lowercase();

        let type_ok = self.types.is_empty()
            || self
                .types
                .iter()
                .any(|prefix| mime.starts_with(&prefix.to_lowercase()));

        let tags_ok = self.tags.is_empty()
            || record
                .tags
                .iter()
                .any(|tag| self.tags.iter().any(|wanted| wanted.eq_ignore_ascii_case(tag)));

        let playlist_ok = self.playlist_tags.is_empty()
            || record.playlist_tags.iter().any(|tag| {
                self.playlist_tags
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(tag))
            });

        type_ok && tags_ok && playlist_ok
    }

    /// Fold additional filter values in (used for query-string filters)
    pub fn extend(&mut self, types: Vec<String>, tags: Vec<String>, playlist_tags: Vec<String>) {
        self.types.extend(types);
        self.tags.extend(tags);
        self.playlist_tags.extend(playlist_tags);
    }
}

/// Compose view models for the records passing the filter
pub fn build_view(records: &[Media], filter: &LibraryFilter) -> Vec<MediaItemResponse> {
    records
        .iter()
        .filter(|record| filter.matches(record))
        .map(MediaItemResponse::from)
        .collect()
}

/// Pre-select the filter for a category landing page.
///
/// The category's MIME prefixes always apply. Its option names are then
/// resolved against the records: any option matching an existing
/// playlist tag wins over any option matching a plain tag, and within
/// one kind the first listed option wins.
pub fn category_filter(category: &CategoryConfig, records: &[Media]) -> LibraryFilter {
    let mut filter = LibraryFilter {
        types: category.media_types.clone(),
        ..Default::default()
    };

    for option in &category.options {
        let found = records.iter().any(|record| {
            record
                .playlist_tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(option))
        });
        if found {
            filter.playlist_tags.push(option.clone());
            return filter;
        }
    }

    for option in &category.options {
        let found = records
            .iter()
            .any(|record| record.tags.iter().any(|tag| tag.eq_ignore_ascii_case(option)));
        if found {
            filter.tags.push(option.clone());
            return filter;
        }
    }

    filter
}
