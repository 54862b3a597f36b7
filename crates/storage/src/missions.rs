// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The missions markdown store: `missions.md`'s five canonical sections
//! (Ideas, Pending, In Progress, Done, Failed) plus the mutation operations
//! the agent loop, the bridge, and the CLI all perform on it.
//!
//! Grounded on `examples/original_source/koan/app/missions.py`: the section
//! classifier, bilingual (English/French) header aliasing, project-tag
//! extraction (inline `[project:NAME]` wins over a surrounding
//! `### project:NAME` sub-header), and the idea/pending/in-progress/done
//! lifecycle all follow that module's behavior. The representation here is
//! a thin structured view over the text — every operation round-trips
//! through [`normalize_content`], never a full re-render from a detached
//! model, so bytes the parser doesn't understand survive unchanged.

use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

use koan_core::mission::Section;

#[derive(Debug, Error)]
pub enum MissionsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no pending mission matches {0:?}")]
    NotFound(String),

    #[error("position {0} is out of range (1..={1})")]
    OutOfRange(usize, usize),

    #[error("source and target position are both {0}")]
    NoOp(usize),
}

/// A parsed mission entry: full text block plus its resolved project tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub text: String,
    pub project: Option<String>,
}

impl Item {
    pub fn first_line(&self) -> &str {
        self.text.lines().next().unwrap_or("")
    }
}

#[derive(Debug, Clone)]
enum Entry {
    SubHeader { line: String, project: String },
    Item(Item),
}

/// Parsed `missions.md`: a title line plus the five canonical sections, each
/// holding its entries in file order. Sections absent from the source text
/// are absent here too — they're created lazily by whichever mutation first
/// needs them.
#[derive(Debug, Clone, Default)]
pub struct MissionsFile {
    title: Option<String>,
    sections: IndexMap<Section, Vec<Entry>>,
}

/// Recognized section headers, English and French, case-insensitively
/// matched against the header text with markdown `#` markers stripped.
fn classify_section(line: &str) -> Option<Section> {
    let stripped = line.trim_start_matches('#').trim().to_ascii_lowercase();
    match stripped.as_str() {
        "ideas" | "idees" | "idées" => Some(Section::Idea),
        "pending" | "a faire" | "à faire" => Some(Section::Pending),
        "in progress" | "en cours" => Some(Section::InProgress),
        "done" | "termine" | "terminé" | "terminées" | "terminees" => Some(Section::Done),
        "failed" | "echec" | "échec" | "echecs" | "échecs" => Some(Section::Failed),
        _ => None,
    }
}

/// `[project:NAME]` or `[projet:NAME]` anywhere on the entry's first line.
pub fn extract_project_tag(text: &str) -> Option<String> {
    let first_line = text.lines().next().unwrap_or("");
    let lower = first_line.to_ascii_lowercase();
    for marker in ["[project:", "[projet:"] {
        if let Some(start) = lower.find(marker) {
            let rest = &first_line[start + marker.len()..];
            if let Some(end) = rest.find(']') {
                let tag = rest[..end].trim();
                if !tag.is_empty() {
                    return Some(tag.to_string());
                }
            }
        }
    }
    None
}

fn subheader_project(line: &str) -> Option<String> {
    let stripped = line.trim_start_matches('#').trim();
    let lower = stripped.to_ascii_lowercase();
    for marker in ["project:", "projet:"] {
        if let Some(rest) = lower.strip_prefix(marker) {
            let start = stripped.len() - rest.len();
            let tag = stripped[start..].trim();
            if !tag.is_empty() {
                return Some(tag.to_string());
            }
        }
    }
    None
}

fn is_item_start(line: &str) -> bool {
    line.starts_with("- ") || line == "-"
}

impl MissionsFile {
    /// Parse `missions.md` text. Continuation lines (indented, or anything
    /// inside a fenced code block) attach to the preceding item; a blank
    /// line outside a fence closes the current item without attaching.
    pub fn parse(text: &str) -> Self {
        let mut title = None;
        let mut sections: IndexMap<Section, Vec<Entry>> = IndexMap::new();
        let mut current_section: Option<Section> = None;
        let mut current_subheader: Option<String> = None;
        let mut current_item: Option<String> = None;
        let mut fenced = false;
        let mut seen_title = false;

        macro_rules! flush_item {
            () => {
                if let Some(text) = current_item.take() {
                    if let Some(section) = current_section {
                        let project =
                            extract_project_tag(&text).or_else(|| current_subheader.clone());
                        sections
                            .entry(section)
                            .or_default()
                            .push(Entry::Item(Item { text, project }));
                    }
                }
            };
        }

        for raw_line in text.lines() {
            let line = raw_line.trim_end();

            if !seen_title {
                title = Some(line.to_string());
                seen_title = true;
                continue;
            }

            let fence_toggle = line.trim_start().starts_with("```");
            if fence_toggle {
                fenced = !fenced;
                if let Some(item) = current_item.as_mut() {
                    item.push('\n');
                    item.push_str(line);
                }
                continue;
            }

            if fenced {
                if let Some(item) = current_item.as_mut() {
                    item.push('\n');
                    item.push_str(line);
                }
                continue;
            }

            if let Some(section) = classify_section(line) {
                flush_item!();
                current_section = Some(section);
                current_subheader = None;
                sections.entry(section).or_default();
                continue;
            }

            if line.trim_start().starts_with("###") {
                flush_item!();
                if let Some(project) = subheader_project(line) {
                    current_subheader = Some(project.clone());
                    if let Some(section) = current_section {
                        sections.entry(section).or_default().push(Entry::SubHeader {
                            line: line.to_string(),
                            project,
                        });
                    }
                    continue;
                }
            }

            if line.trim().is_empty() {
                flush_item!();
                continue;
            }

            if is_item_start(line) {
                flush_item!();
                current_item = Some(line.to_string());
                continue;
            }

            if let Some(item) = current_item.as_mut() {
                item.push('\n');
                item.push_str(line);
            }
        }
        flush_item!();

        Self { title, sections }
    }

    pub fn from_path(path: &Path) -> Result<Self, MissionsError> {
        let text = std::fs::read_to_string(path).unwrap_or_default();
        Ok(Self::parse(&text))
    }

    pub fn save(&self, path: &Path) -> Result<(), MissionsError> {
        crate::signals::write_atomic(path, &self.render())?;
        Ok(())
    }

    /// Render back to text, then run [`normalize_content`] over the result so
    /// spacing stays canonical regardless of how it was mutated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(self.title.as_deref().unwrap_or("# Missions"));
        out.push('\n');

        for section in Section::canonical_order() {
            let Some(entries) = self.sections.get(&section) else {
                continue;
            };
            out.push('\n');
            out.push_str(section.header());
            out.push('\n');
            for entry in entries {
                out.push('\n');
                match entry {
                    Entry::SubHeader { line, .. } => out.push_str(line),
                    Entry::Item(item) => out.push_str(&item.text),
                }
                out.push('\n');
            }
        }

        normalize_content(&out)
    }

    fn items_mut(&mut self, section: Section) -> &mut Vec<Entry> {
        self.sections.entry(section).or_default()
    }

    fn items(&self, section: Section) -> Vec<&Item> {
        self.sections
            .get(&section)
            .into_iter()
            .flatten()
            .filter_map(|e| match e {
                Entry::Item(item) => Some(item),
                Entry::SubHeader { .. } => None,
            })
            .collect()
    }

    pub fn pending(&self) -> Vec<&Item> {
        self.items(Section::Pending)
    }

    pub fn in_progress(&self) -> Vec<&Item> {
        self.items(Section::InProgress)
    }

    pub fn done(&self) -> Vec<&Item> {
        self.items(Section::Done)
    }

    pub fn failed(&self) -> Vec<&Item> {
        self.items(Section::Failed)
    }

    pub fn ideas(&self) -> Vec<&Item> {
        self.items(Section::Idea)
    }

    fn normalize_entry_text(entry: &str) -> String {
        let trimmed = entry.trim();
        if is_item_start(trimmed) {
            trimmed.to_string()
        } else {
            format!("- {trimmed}")
        }
    }

    /// Append (or, if `urgent`, prepend) a new Pending entry.
    pub fn insert_mission(&mut self, entry: &str, urgent: bool) {
        let text = Self::normalize_entry_text(entry);
        let project = extract_project_tag(&text);
        let item = Entry::Item(Item { text, project });
        let items = self.items_mut(Section::Pending);
        if urgent {
            items.insert(0, item);
        } else {
            items.push(item);
        }
    }

    /// Always appends: ideas are a backlog, not a priority queue.
    pub fn insert_idea(&mut self, entry: &str) {
        let text = Self::normalize_entry_text(entry);
        let project = extract_project_tag(&text);
        self.items_mut(Section::Idea)
            .push(Entry::Item(Item { text, project }));
    }

    /// First Pending item, optionally filtered by project. An untagged item
    /// matches any requested project; a tagged item must match exactly.
    pub fn extract_next_pending(&self, project: Option<&str>) -> Option<&Item> {
        self.pending().into_iter().find(|item| match project {
            None => true,
            Some(p) => item.project.is_none() || item.project.as_deref() == Some(p),
        })
    }

    /// Pending items grouped by resolved project, `"default"` for untagged.
    pub fn group_by_project(&self) -> IndexMap<String, Vec<&Item>> {
        let mut groups: IndexMap<String, Vec<&Item>> = IndexMap::new();
        for item in self.pending() {
            let key = item.project.clone().unwrap_or_else(|| "default".to_string());
            groups.entry(key).or_default().push(item);
        }
        groups
    }

    /// Flush every In Progress item to Done, each stamped with a `✅
    /// (timestamp)` marker exactly like `complete_mission` (these were
    /// interrupted, not explicitly finished, but the transition table in
    /// `spec.md` §4.D still requires the marker), then move the Pending item
    /// whose first line contains `needle` into In Progress. No-op, including
    /// the flush, if nothing matches.
    pub fn start_mission(&mut self, needle: &str, now_unix: i64) -> bool {
        let Some(pos) = self
            .pending()
            .iter()
            .position(|item| item.first_line().contains(needle))
        else {
            return false;
        };

        let stale: Vec<Entry> = self
            .sections
            .entry(Section::InProgress)
            .or_default()
            .drain(..)
            .collect();
        let stamp = format_timestamp(now_unix);
        let stale = stale.into_iter().map(|entry| match entry {
            Entry::Item(mut item) => {
                item.text = format!("{} \u{2705} ({stamp})", item.text);
                Entry::Item(item)
            }
            other => other,
        });
        self.items_mut(Section::Done).extend(stale);

        let pending = self.items_mut(Section::Pending);
        let mut idx = 0;
        let mut remove_at = None;
        for (i, entry) in pending.iter().enumerate() {
            if let Entry::Item(item) = entry {
                if idx == pos {
                    remove_at = Some(i);
                    break;
                }
                idx += 1;
            }
        }
        let entry = remove_at.map(|i| pending.remove(i));
        if let Some(entry) = entry {
            self.items_mut(Section::InProgress).push(entry);
        }
        true
    }

    /// Search Pending then In Progress for a first-line substring match and
    /// move it to `target` with a `marker` + `now_unix` timestamp appended.
    fn finish(
        &mut self,
        needle: &str,
        target: Section,
        marker: &str,
        now_unix: i64,
    ) -> bool {
        for source in [Section::Pending, Section::InProgress] {
            let entries = self.items_mut(source);
            let mut remove_at = None;
            for (i, entry) in entries.iter().enumerate() {
                if let Entry::Item(item) = entry {
                    if item.first_line().contains(needle) {
                        remove_at = Some(i);
                        break;
                    }
                }
            }
            if let Some(i) = remove_at {
                if let Entry::Item(mut item) = entries.remove(i) {
                    let stamp = format_timestamp(now_unix);
                    item.text = format!("{} {marker} ({stamp})", item.text);
                    self.items_mut(target).push(Entry::Item(item));
                    return true;
                }
            }
        }
        false
    }

    pub fn complete_mission(&mut self, needle: &str, now_unix: i64) -> bool {
        self.finish(needle, Section::Done, "\u{2705}", now_unix)
    }

    pub fn fail_mission(&mut self, needle: &str, now_unix: i64) -> bool {
        self.finish(needle, Section::Failed, "\u{274c}", now_unix)
    }

    /// Remove the 1-based idea, returning its text. `None` if out of range.
    pub fn delete_idea(&mut self, position: usize) -> Option<String> {
        let ideas = self.items_mut(Section::Idea);
        let mut idx = 0;
        for (i, entry) in ideas.iter().enumerate() {
            if let Entry::Item(_) = entry {
                idx += 1;
                if idx == position {
                    if let Entry::Item(item) = ideas.remove(i) {
                        return Some(item.text);
                    }
                }
            }
        }
        None
    }

    /// Move the 1-based idea to the top of Pending.
    pub fn promote_idea(&mut self, position: usize) -> bool {
        match self.delete_idea(position) {
            Some(text) => {
                self.insert_mission(&text, true);
                true
            }
            None => false,
        }
    }

    /// Promote every idea, preserving relative order at the top of Pending.
    pub fn promote_all_ideas(&mut self) -> usize {
        let ideas: Vec<String> = self
            .ideas()
            .into_iter()
            .map(|item| item.text.clone())
            .collect();
        self.items_mut(Section::Idea).clear();
        for text in ideas.iter().rev() {
            self.insert_mission(text, true);
        }
        ideas.len()
    }

    /// Move the Pending item at 1-based `from` to 1-based `to`.
    pub fn reorder_mission(&mut self, from: usize, to: usize) -> Result<(), MissionsError> {
        let len = self.pending().len();
        if from == 0 || from > len || to == 0 || to > len {
            return Err(MissionsError::OutOfRange(from.max(to), len));
        }
        if from == to {
            return Err(MissionsError::NoOp(from));
        }

        let entries = self.items_mut(Section::Pending);
        let item_positions: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Entry::Item(_)))
            .map(|(i, _)| i)
            .collect();
        let from_idx = item_positions[from - 1];
        let moved = entries.remove(from_idx);

        let item_positions: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Entry::Item(_)))
            .map(|(i, _)| i)
            .collect();
        let insert_at = if to - 1 >= item_positions.len() {
            entries.len()
        } else {
            item_positions[to - 1]
        };
        entries.insert(insert_at, moved);
        Ok(())
    }

    /// Cancel a Pending mission by 1-based numeric position or by first-line
    /// substring match.
    pub fn cancel_pending_mission(&mut self, id_or_needle: &str) -> Result<String, MissionsError> {
        let len = self.pending().len();
        if let Ok(position) = id_or_needle.parse::<usize>() {
            if position == 0 || position > len {
                return Err(MissionsError::OutOfRange(position, len));
            }
            let entries = self.items_mut(Section::Pending);
            let mut idx = 0;
            for (i, entry) in entries.iter().enumerate() {
                if let Entry::Item(_) = entry {
                    idx += 1;
                    if idx == position {
                        if let Entry::Item(item) = entries.remove(i) {
                            return Ok(item.text);
                        }
                    }
                }
            }
            return Err(MissionsError::NotFound(id_or_needle.to_string()));
        }

        let entries = self.items_mut(Section::Pending);
        let mut remove_at = None;
        for (i, entry) in entries.iter().enumerate() {
            if let Entry::Item(item) = entry {
                if item.first_line().contains(id_or_needle) {
                    remove_at = Some(i);
                    break;
                }
            }
        }
        match remove_at {
            Some(i) => match entries.remove(i) {
                Entry::Item(item) => Ok(item.text),
                Entry::SubHeader { .. } => unreachable!(),
            },
            None => Err(MissionsError::NotFound(id_or_needle.to_string())),
        }
    }
}

fn format_timestamp(now_unix: i64) -> String {
    chrono::DateTime::from_timestamp(now_unix, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| now_unix.to_string())
}

/// Detect and remove a `--now` token among the entry's first five words,
/// returning the cleaned text and whether the flag was present. Used by the
/// CLI and bridge's `/mission` handler to route a flagged entry straight to
/// `start_mission` instead of the back of Pending.
pub fn extract_now_flag(entry: &str) -> (String, bool) {
    let trimmed = entry.trim();
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    match words.iter().take(5).position(|w| *w == "--now") {
        Some(idx) => {
            let mut rest = words;
            rest.remove(idx);
            (rest.join(" "), true)
        }
        None => (trimmed.to_string(), false),
    }
}

/// Single-line display form for chat/CLI output: first line only, a
/// `[project:X]` tag rewritten to a leading `[X]` prefix, completion markers
/// stripped, truncated to `max_length` with an ellipsis.
pub fn clean_mission_display(text: &str, max_length: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    let project = extract_project_tag(first_line);
    let mut cleaned = first_line.trim_start_matches('-').trim().to_string();

    for marker in ["\u{2705}", "\u{274c}"] {
        if let Some(idx) = cleaned.find(marker) {
            cleaned.truncate(idx);
        }
    }
    cleaned = strip_bracket_tags(&cleaned);
    let cleaned = cleaned.trim().to_string();
    let cleaned = match project {
        Some(p) => format!("[{p}] {cleaned}"),
        None => cleaned,
    };

    if cleaned.chars().count() > max_length {
        let truncated: String = cleaned.chars().take(max_length.saturating_sub(1)).collect();
        format!("{}\u{2026}", truncated.trim_end())
    } else {
        cleaned
    }
}

fn strip_bracket_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0u32;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Collapse runs of blank lines to a single blank line, drop trailing blank
/// lines, and ensure exactly one trailing newline. Operates on raw text, not
/// the parsed model, so it is safe to run even over content this module's
/// parser doesn't fully understand.
pub fn normalize_content(text: &str) -> String {
    let mut out_lines: Vec<&str> = Vec::new();
    let mut blank_run = false;
    for line in text.lines() {
        if line.trim().is_empty() {
            if !blank_run && !out_lines.is_empty() {
                out_lines.push("");
            }
            blank_run = true;
        } else {
            out_lines.push(line.trim_end());
            blank_run = false;
        }
    }
    while out_lines.last() == Some(&"") {
        out_lines.pop();
    }
    let mut result = out_lines.join("\n");
    result.push('\n');
    result
}

#[cfg(test)]
#[path = "missions_tests.rs"]
mod tests;
