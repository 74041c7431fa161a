//! Text and time helpers shared by the dispatcher and the transport layer.

use chrono::{Datelike, Duration, Weekday};
use chrono_tz::Europe::Istanbul;

use crate::types::Timestamp;

/// Trims and lowercases inbound text.
///
/// Dotted capital `İ` folds to plain `i` instead of `i` plus a combining dot,
/// so "İSTANBUL" and "istanbul" normalize to the same string.
pub fn normalize_text(input: &str) -> String {
    input
        .trim()
        .chars()
        .flat_map(|c| match c {
            'İ' => vec!['i'],
            other => other.to_lowercase().collect(),
        })
        .collect()
}

fn upper_tr(c: char) -> String {
    match c {
        'i' => "İ".to_string(),
        'ı' => "I".to_string(),
        other => other.to_uppercase().collect(),
    }
}

fn lower_tr(c: char) -> String {
    match c {
        'I' => "ı".to_string(),
        'İ' => "i".to_string(),
        other => other.to_lowercase().collect(),
    }
}

/// Title-cases each whitespace-separated word using Turkish casing rules.
pub fn title_case_tr(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                let mut out = upper_tr(first);
                out.extend(chars.map(lower_tr));
                out
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const BACK_VOWELS: &[char] = &['a', 'ı', 'o', 'u', 'A', 'I', 'O', 'U'];
const FRONT_VOWELS: &[char] = &['e', 'i', 'ö', 'ü', 'E', 'İ', 'Ö', 'Ü'];

fn is_vowel(c: char) -> bool {
    BACK_VOWELS.contains(&c) || FRONT_VOWELS.contains(&c)
}

/// Title-cases a city name and appends the dative suffix.
///
/// The last vowel picks `a` or `e`; a name ending in a vowel takes the
/// buffer `y`. "istanbul" becomes "İstanbul'a", "ankara" becomes "Ankara'ya".
pub fn add_city_suffix(city: &str) -> String {
    let name = title_case_tr(city);
    let last_vowel = name.chars().rev().find(|c| is_vowel(*c));
    let vowel = match last_vowel {
        Some(v) if BACK_VOWELS.contains(&v) => 'a',
        _ => 'e',
    };
    let buffer = if name.chars().last().is_some_and(is_vowel) {
        "y"
    } else {
        ""
    };
    format!("{name}'{buffer}{vowel}")
}

/// Whether `needle` occurs in `haystack` delimited by non-alphanumeric
/// characters or the ends of the string.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, matched)| {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[start + matched.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Splits text into pieces of at most `max_chars` characters.
///
/// Splits on char boundaries, never inside a multi-byte codepoint. Empty input
/// yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Human-readable Turkish duration, e.g. "1 gün 2 saat 5 saniye".
pub fn format_time_delta(delta: Duration) -> String {
    let total = delta.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days} gün"));
    }
    if hours > 0 {
        parts.push(format!("{hours} saat"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} dakika"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds} saniye"));
    }
    parts.join(" ")
}

/// Turkish weekday name.
pub const fn weekday_tr(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Pazartesi",
        Weekday::Tue => "Salı",
        Weekday::Wed => "Çarşamba",
        Weekday::Thu => "Perşembe",
        Weekday::Fri => "Cuma",
        Weekday::Sat => "Cumartesi",
        Weekday::Sun => "Pazar",
    }
}

/// Wall-clock fields for Istanbul local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTimeInfo {
    /// `HH:MM:SS`
    pub time: String,
    /// `DD/MM/YYYY`
    pub date: String,
    /// Turkish weekday name
    pub weekday: &'static str,
    /// Fixed zone label
    pub zone: &'static str,
}

/// Converts a UTC instant to Istanbul local time fields.
pub fn istanbul_time(now: Timestamp) -> LocalTimeInfo {
    let local = now.with_timezone(&Istanbul);
    LocalTimeInfo {
        time: local.format("%H:%M:%S").to_string(),
        date: local.format("%d/%m/%Y").to_string(),
        weekday: weekday_tr(local.weekday()),
        zone: "İstanbul (GMT+3)",
    }
}

/// Formats a timestamp as `DD/MM/YYYY HH:MM` in Istanbul local time.
pub fn format_timestamp_tr(timestamp: Timestamp) -> String {
    timestamp
        .with_timezone(&Istanbul)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  HAVA İstanbul \n"), "hava istanbul");
        assert_eq!(normalize_text("Fıkra"), "fıkra");
    }

    #[test]
    fn test_title_case_tr() {
        assert_eq!(title_case_tr("istanbul"), "İstanbul");
        assert_eq!(title_case_tr("ığdır"), "Iğdır");
        assert_eq!(title_case_tr("  new   york "), "New York");
        assert_eq!(title_case_tr(""), "");
    }

    #[test]
    fn test_add_city_suffix() {
        assert_eq!(add_city_suffix("istanbul"), "İstanbul'a");
        assert_eq!(add_city_suffix("ankara"), "Ankara'ya");
        assert_eq!(add_city_suffix("izmir"), "İzmir'e");
        assert_eq!(add_city_suffix("antalya"), "Antalya'ya");
        assert_eq!(add_city_suffix("bursa"), "Bursa'ya");
        assert_eq!(add_city_suffix("adana"), "Adana'ya");
        assert_eq!(add_city_suffix("berlin"), "Berlin'e");
        assert_eq!(add_city_suffix("rize"), "Rize'ye");
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("sa", "sa"));
        assert!(contains_word("sa naber", "sa"));
        assert!(contains_word("selam, nasılsın?", "nasılsın"));
        assert!(contains_word("çok sağ ol", "sağ ol"));
        assert!(!contains_word("saat kaç", "sa"));
        assert!(!contains_word("sayı tahmin", "sa"));
        assert!(!contains_word("hiçbir", "hi"));
        assert!(!contains_word("anything", ""));
    }

    #[test]
    fn test_chunk_text_respects_char_boundaries() {
        let text = "ğüşıöç".repeat(3);
        let chunks = chunk_text(&text, 4);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.concat(), text);

        assert!(chunk_text("", 10).is_empty());
        assert_eq!(chunk_text("kısa", 2000), vec!["kısa".to_string()]);
    }

    #[test]
    fn test_format_time_delta() {
        assert_eq!(format_time_delta(Duration::zero()), "0 saniye");
        assert_eq!(format_time_delta(Duration::seconds(65)), "1 dakika 5 saniye");
        assert_eq!(
            format_time_delta(Duration::seconds(86_400 + 7_200)),
            "1 gün 2 saat"
        );
        assert_eq!(format_time_delta(Duration::seconds(-5)), "0 saniye");
    }

    #[test]
    fn test_istanbul_time() {
        // 2024-01-01 is a Monday; 21:30 UTC is 00:30 on Tuesday in Istanbul.
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 21, 30, 0).unwrap();
        let info = istanbul_time(now);
        assert_eq!(info.time, "00:30:00");
        assert_eq!(info.date, "02/01/2024");
        assert_eq!(info.weekday, "Salı");
        assert_eq!(format_timestamp_tr(now), "02/01/2024 00:30");
    }
}
