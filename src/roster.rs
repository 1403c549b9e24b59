//! The master result set: filtering, deduplication, and report rendering.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One collected name, keyed by the filter letter it appeared under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub letter: char,
    pub name: String,
}

/// How names are keyed for deduplication.
///
/// `Exact` preserves the source behavior: near-duplicates differing only in
/// case are both retained. The stored name is never altered by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameKeyPolicy {
    #[default]
    Exact,
    CaseInsensitive,
}

impl NameKeyPolicy {
    fn key(self, name: &str) -> String {
        match self {
            NameKeyPolicy::Exact => name.to_owned(),
            NameKeyPolicy::CaseInsensitive => name.to_lowercase(),
        }
    }
}

/// Append-only, deduplicated collection of entries across all sections.
///
/// Insertion order is section discovery order crossed with first-seen order
/// within a section. Membership is tracked in a hash set keyed on
/// `(letter, name-key)`.
pub struct Roster {
    ignore: Vec<String>,
    policy: NameKeyPolicy,
    entries: Vec<Entry>,
    seen: HashSet<(char, String)>,
}

impl Roster {
    /// `ignore` entries are matched as case-insensitive substrings and are
    /// lowercased once here.
    pub fn new(ignore: &[String], policy: NameKeyPolicy) -> Self {
        Self {
            ignore: ignore.iter().map(|w| w.to_lowercase()).collect(),
            policy,
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Filter one extracted line against the current section.
    ///
    /// Rejects, in order: the section letter re-extracted as content, lines
    /// containing an ignore substring, and `(letter, name)` duplicates.
    /// Returns true if the line was appended.
    pub fn accept(&mut self, line: &str, letter: char) -> bool {
        if line.chars().eq([letter]) {
            return false;
        }

        let lower = line.to_lowercase();
        if self.ignore.iter().any(|word| lower.contains(word.as_str())) {
            return false;
        }

        let key = (letter, self.policy.key(line));
        if !self.seen.insert(key) {
            return false;
        }

        self.entries.push(Entry {
            letter,
            name: line.to_owned(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

/// Render the plain-text report.
///
/// Title, underline, then per-letter groups in entry order (which is sorted
/// label order), each introduced by `--- <LETTER> ---`, one name per line in
/// first-seen order. An aborted run is marked partial rather than
/// suppressed.
pub fn render_report(entries: &[Entry], partial: bool) -> String {
    let mut out = String::from("List of Participating CSPs\n==========================\n");
    if partial {
        out.push_str("(partial results - run aborted)\n");
    }
    out.push('\n');

    let mut current: Option<char> = None;
    for entry in entries {
        if current != Some(entry.letter) {
            current = Some(entry.letter);
            out.push_str(&format!("\n--- {} ---\n", entry.letter));
        }
        out.push_str(&entry.name);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn roster() -> Roster {
        Roster::new(
            &["privacy".to_owned(), "back to top".to_owned()],
            NameKeyPolicy::Exact,
        )
    }

    #[test]
    fn accepts_new_names_and_rejects_duplicates() {
        let mut r = roster();
        assert!(r.accept("Acme Corp", 'A'));
        assert!(!r.accept("Acme Corp", 'A'));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn same_name_under_different_letters_is_kept() {
        let mut r = roster();
        assert!(r.accept("Acme Corp", 'A'));
        assert!(r.accept("Acme Corp", 'B'));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn rejects_the_section_letter_itself() {
        let mut r = roster();
        assert!(!r.accept("A", 'A'));
        // A different single letter is legitimate content under this letter
        // only if it passes the length filter upstream; here it is accepted.
        assert!(r.accept("AB", 'A'));
    }

    #[test]
    fn ignore_list_matches_substrings_case_insensitively() {
        let mut r = roster();
        assert!(!r.accept("Privacy Policy", 'P'));
        assert!(!r.accept("PRIVACY", 'P'));
        assert!(!r.accept("Back To Top", 'B'));
        assert!(r.accept("Privus Networks", 'P'));
    }

    #[test]
    fn exact_policy_keeps_case_variants() {
        let mut r = roster();
        assert!(r.accept("Acme Corp", 'A'));
        assert!(r.accept("ACME CORP", 'A'));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn case_insensitive_policy_merges_case_variants() {
        let mut r = Roster::new(&[], NameKeyPolicy::CaseInsensitive);
        assert!(r.accept("Acme Corp", 'A'));
        assert!(!r.accept("ACME CORP", 'A'));
        // Stored name is the first-seen spelling, untouched.
        assert_eq!(r.into_entries()[0].name, "Acme Corp");
    }

    #[test]
    fn no_entry_pair_is_ever_duplicated() {
        let mut r = roster();
        for _ in 0..3 {
            r.accept("Acme Corp", 'A');
            r.accept("Beta Ltd", 'B');
        }
        let entries = r.into_entries();
        let mut keys: Vec<(char, &str)> = entries
            .iter()
            .map(|e| (e.letter, e.name.as_str()))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), entries.len());
    }

    #[test]
    fn report_groups_by_letter_in_entry_order() {
        let mut r = Roster::new(&[], NameKeyPolicy::Exact);
        r.accept("Hash Co", '#');
        r.accept("Acme Corp", 'A');
        r.accept("Apex Ltd", 'A');
        r.accept("Beta GmbH", 'B');
        let text = render_report(&r.into_entries(), false);

        assert!(text.starts_with("List of Participating CSPs\n==========================\n\n"));
        assert_eq!(text.matches("--- ").count(), 3);
        let hash_pos = text.find("--- # ---").unwrap();
        let a_pos = text.find("--- A ---").unwrap();
        let b_pos = text.find("--- B ---").unwrap();
        assert!(hash_pos < a_pos && a_pos < b_pos);
        assert!(text.find("Acme Corp").unwrap() < text.find("Apex Ltd").unwrap());
    }

    #[test]
    fn partial_report_is_clearly_marked() {
        let mut r = Roster::new(&[], NameKeyPolicy::Exact);
        r.accept("Acme Corp", 'A');
        let text = render_report(&r.into_entries(), true);
        assert!(text.contains("(partial results - run aborted)"));
        assert!(text.contains("Acme Corp"));
    }

    #[test]
    fn empty_report_has_no_group_headers() {
        let text = render_report(&[], false);
        assert_eq!(text.matches("---").count(), 0);
    }
}
