//! User annotations: likes, check marks and tags.

use std::collections::BTreeSet;

use spm_model::{DataId, PropValue};

use crate::keys;
use crate::outcome::{WriteMode, WriteOutcome};
use crate::store::PropertyStore;

impl PropertyStore {
    pub fn is_liked(&self, id: &str) -> bool {
        self.flag(id, keys::LIKED)
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.flag(id, keys::CHECKED)
    }

    /// Tags of a record; empty when the record or property is missing.
    pub fn tags(&self, id: &str) -> Vec<String> {
        self.get_data(id, keys::TAGS)
            .and_then(PropValue::as_text_list)
            .unwrap_or_default()
    }

    pub fn set_liked(&mut self, id: &str, liked: bool) -> WriteOutcome {
        self.write_data(id, keys::LIKED, liked, WriteMode::CREATE_KEY)
    }

    /// Flips the like state and returns the new value, or `None` if the
    /// record does not exist.
    pub fn toggle_liked(&mut self, id: &str) -> Option<bool> {
        let liked = !self.is_liked(id);
        self.set_liked(id, liked).is_success().then_some(liked)
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> WriteOutcome {
        self.write_data(id, keys::CHECKED, checked, WriteMode::CREATE_KEY)
    }

    /// Checks or unchecks every record. Returns how many were written.
    pub fn set_checked_all(&mut self, checked: bool) -> usize {
        self.ids()
            .iter()
            .filter(|id| self.set_checked(id.as_str(), checked).is_success())
            .count()
    }

    pub fn checked_ids(&self) -> Vec<DataId> {
        self.ids()
            .into_iter()
            .filter(|id| self.is_checked(id.as_str()))
            .collect()
    }

    /// Adds `tag` to a record unless it already has it.
    ///
    /// Returns `None` when the tag was already present.
    pub fn add_tag(&mut self, id: &str, tag: &str) -> Option<WriteOutcome> {
        let mut tags = self.tags(id);
        if tags.iter().any(|t| t == tag) {
            return None;
        }
        tags.push(tag.to_string());
        Some(self.write_data(id, keys::TAGS, PropValue::text_list(tags), WriteMode::CREATE_KEY))
    }

    /// Removes `tag` from a record. Returns `None` when it was not there.
    pub fn remove_tag(&mut self, id: &str, tag: &str) -> Option<WriteOutcome> {
        let mut tags = self.tags(id);
        let before = tags.len();
        tags.retain(|t| t != tag);
        if tags.len() == before {
            return None;
        }
        Some(self.write_data(id, keys::TAGS, PropValue::text_list(tags), WriteMode::UPDATE))
    }

    /// Adds `tag` to every checked record; returns the records changed.
    pub fn add_tag_to_checked(&mut self, tag: &str) -> Vec<DataId> {
        self.checked_ids()
            .into_iter()
            .filter(|id| {
                self.add_tag(id.as_str(), tag)
                    .is_some_and(|outcome| outcome.is_success())
            })
            .collect()
    }

    /// Removes `tag` from every checked record; returns the records changed.
    pub fn remove_tag_from_checked(&mut self, tag: &str) -> Vec<DataId> {
        self.checked_ids()
            .into_iter()
            .filter(|id| {
                self.remove_tag(id.as_str(), tag)
                    .is_some_and(|outcome| outcome.is_success())
            })
            .collect()
    }

    /// Likes or unlikes every checked record; returns the records written.
    pub fn set_liked_checked(&mut self, liked: bool) -> Vec<DataId> {
        self.checked_ids()
            .into_iter()
            .filter(|id| self.set_liked(id.as_str(), liked).is_success())
            .collect()
    }

    /// Every tag in use, sorted and without duplicates.
    pub fn all_tags(&self) -> Vec<String> {
        self.ids()
            .iter()
            .flat_map(|id| self.tags(id.as_str()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// One line per liked or tagged record, in store order:
    /// `<filename>[ liked][ tags: ['a', 'b']]`.
    pub fn annotation_lines(&self) -> Vec<String> {
        self.ids()
            .iter()
            .filter_map(|id| {
                let liked = self.is_liked(id.as_str());
                let tags = self.tags(id.as_str());
                if !liked && tags.is_empty() {
                    return None;
                }
                let mut line = id.to_string();
                if liked {
                    line.push_str(" liked");
                }
                if !tags.is_empty() {
                    let quoted: Vec<String> = tags.iter().map(|t| format!("'{t}'")).collect();
                    line.push_str(&format!(" tags: [{}]", quoted.join(", ")));
                }
                Some(line)
            })
            .collect()
    }

    fn flag(&self, id: &str, key: &str) -> bool {
        self.get_data(id, key)
            .and_then(PropValue::as_bool)
            .unwrap_or(false)
    }
}
