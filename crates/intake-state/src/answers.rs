//! Deterministic interpretation of free-text replies

use std::sync::LazyLock;

use regex::Regex;

static NUMBER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s,;:])(\d{1,2})[.)]").expect("valid number marker regex")
});

static ORDINAL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    let words = ORDINALS
        .iter()
        .flat_map(|(_, words)| words.iter().copied())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(?:^|[\s,;.])({words})\b[:.,)\-]?"))
        .expect("valid ordinal marker regex")
});

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("valid sentence break regex"));

/// Position-indexed ordinal words; longer forms first within each entry.
const ORDINALS: [(usize, &[&str]); 7] = [
    (0, &["во-первых", "первое", "первый", "first"]),
    (1, &["во-вторых", "второе", "второй", "second"]),
    (2, &["в-третьих", "третье", "третий", "third"]),
    (3, &["в-четвертых", "в-четвёртых", "четвертое", "четвёртое", "четвертый", "четвёртый", "fourth"]),
    (4, &["в-пятых", "пятое", "пятый", "fifth"]),
    (5, &["в-шестых", "шестое", "шестой", "sixth"]),
    (6, &["в-седьмых", "седьмое", "седьмой", "seventh"]),
];

/// Lower-cased, trimmed, trailing sentence punctuation removed.
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .trim_end_matches(['.', '!', '?', ',', ';'])
        .trim()
        .to_string()
}

/// Whole-reply match against a phrase list, after normalization.
pub fn matches_phrase(text: &str, phrases: &[String]) -> bool {
    let normalized = normalize(text);
    phrases.iter().any(|p| p.to_lowercase() == normalized)
}

/// Split `reply` into exactly `count` answers, or `None` when no rule applies.
///
/// Rules in order: numbered markers ("1.", "2)"), ordinal words ("первое",
/// "во-вторых", "first"), then delimiters (line breaks, semicolons, sentence
/// breaks, commas) where the first delimiter giving exactly `count` parts wins.
/// Numbered and ordinal segmentation may leave gaps as empty strings; a
/// single leading number ("2. только iOS") answers just that question.
pub fn segment(reply: &str, count: usize) -> Option<Vec<String>> {
    let reply = reply.trim();
    if count == 0 || reply.is_empty() {
        return None;
    }
    if count == 1 {
        return Some(vec![reply.to_string()]);
    }

    by_markers(reply, count, &NUMBER_MARKER, number_index, 1)
        .or_else(|| by_markers(reply, count, &ORDINAL_MARKER, ordinal_index, 2))
        .or_else(|| by_delimiters(reply, count))
}

fn number_index(marker: &str) -> Option<usize> {
    marker.parse::<usize>().ok()?.checked_sub(1)
}

fn ordinal_index(marker: &str) -> Option<usize> {
    let marker = marker.to_lowercase();
    ORDINALS
        .iter()
        .find(|(_, words)| words.contains(&marker.as_str()))
        .map(|(index, _)| *index)
}

fn by_markers(
    reply: &str,
    count: usize,
    pattern: &Regex,
    index_of: fn(&str) -> Option<usize>,
    min_markers: usize,
) -> Option<Vec<String>> {
    // (answer index, marker start, content start)
    let mut markers: Vec<(usize, usize, usize)> = Vec::new();
    for caps in pattern.captures_iter(reply) {
        let (Some(whole), Some(group)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // "1.5" is a number, not a marker
        if reply[whole.end()..].starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let index = index_of(group.as_str())?;
        if index >= count {
            return None;
        }
        markers.push((index, group.start(), whole.end()));
    }

    if markers.is_empty() || markers.len() < min_markers {
        return None;
    }
    if !reply[..markers[0].1].trim().is_empty() {
        return None;
    }

    let mut answers = vec![String::new(); count];
    let mut seen = vec![false; count];
    for (i, &(index, _, content_start)) in markers.iter().enumerate() {
        if seen[index] {
            return None;
        }
        seen[index] = true;
        let end = markers.get(i + 1).map_or(reply.len(), |next| next.1);
        answers[index] = clean_segment(&reply[content_start..end]);
    }
    Some(answers)
}

fn by_delimiters(reply: &str, count: usize) -> Option<Vec<String>> {
    let lines: Vec<String> = reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    if lines.len() == count {
        return Some(lines);
    }

    let candidates = [
        split_trimmed(reply.split(';')),
        split_trimmed(SENTENCE_BREAK.split(reply)),
        split_trimmed(reply.split(',')),
    ];
    candidates.into_iter().find(|parts| parts.len() == count)
}

fn split_trimmed<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut parts: Vec<String> = parts.map(clean_segment).collect();
    if parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

fn clean_segment(segment: &str) -> String {
    segment
        .trim()
        .trim_start_matches([':', '-', '–', '—'])
        .trim_end_matches([',', ';'])
        .trim()
        .to_string()
}
