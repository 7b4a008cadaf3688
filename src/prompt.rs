//! Code-to-prompt analysis.
//!
//! Derives a music generation prompt from a source code snippet: the
//! language picks a genre family, a rough complexity score picks tempo
//! and mood, and a few structural signals pick instrumentation. The
//! analysis is intentionally shallow; it only has to produce a prompt
//! that feels related to the code, not a real static analysis.

use rand::Rng;

use crate::types::MAX_PROMPT_LEN;

/// Maximum number of characters of code fed to the analysis.
pub const MAX_SNIPPET: usize = 1200;

/// Keyword signatures for language detection, checked in order.
/// The first language with two or more keyword hits wins.
const LANGUAGE_KEYWORDS: &[(&str, &[&str])] = &[
    ("rust", &["fn ", "let mut", "impl ", "pub fn", "match ", "trait ", "::"]),
    ("python", &["def ", "import ", "elif ", "lambda ", "self.", "__init__"]),
    ("go", &["func ", "package ", "chan ", ":= ", "go func", "defer "]),
    ("java", &["public class", "private ", "extends ", "void ", "System.out"]),
    ("csharp", &["namespace ", "using System", "Console.Write", "string[] "]),
    ("ruby", &["def ", "end\n", "module ", "require ", "attr_accessor"]),
    ("php", &["<?php", "function ", "echo ", "->", "$"]),
    ("sql", &["SELECT ", "INSERT ", "UPDATE ", "FROM ", "WHERE ", "JOIN "]),
    ("shell", &["#!/bin/", "echo ", "export ", "grep ", "fi\n", "esac"]),
    ("html", &["<html", "<div", "<body", "<span", "<script"]),
    ("css", &["@media", ":hover", "margin:", "padding:", "display:"]),
    ("typescript", &["interface ", ": string", ": number", "implements ", "enum "]),
    ("javascript", &["const ", "=> ", "function ", "async ", "await ", "let "]),
];

/// Genre candidates per language; the first entry is the default pick.
const LANGUAGE_GENRES: &[(&str, &[&str])] = &[
    ("javascript", &["lo-fi house", "chillhop", "trip hop"]),
    ("typescript", &["synthwave", "ambient techno", "deep house"]),
    ("python", &["ambient", "downtempo", "chillwave"]),
    ("java", &["orchestral", "cinematic", "epic"]),
    ("csharp", &["electronic", "IDM", "glitch"]),
    ("ruby", &["jazz", "bossa nova", "smooth jazz"]),
    ("go", &["minimal techno", "dub techno", "microhouse"]),
    ("rust", &["industrial", "dark ambient", "techno"]),
    ("php", &["vaporwave", "retrowave", "future funk"]),
    ("html", &["pop", "indie pop", "electropop"]),
    ("css", &["dream pop", "shoegaze", "ambient pop"]),
    ("sql", &["acid jazz", "nu jazz", "broken beat"]),
    ("shell", &["breakbeat", "drum and bass", "jungle"]),
    ("unknown", &["lo-fi", "ambient", "electronic"]),
];

const CONTROL_KEYWORDS: &[&str] = &[
    "if ", "for ", "while ", "switch ", "catch ", "try ", "else", "match ", "loop ",
];

const FUNCTION_KEYWORDS: &[&str] = &["function ", "def ", "func ", "fn ", "class "];

/// Detects the programming language of a snippet, or "unknown".
pub fn detect_language(code: &str) -> &'static str {
    for (language, keywords) in LANGUAGE_KEYWORDS {
        let hits = keywords.iter().filter(|k| code.contains(*k)).count();
        if hits >= 2 {
            return language;
        }
    }
    "unknown"
}

/// Scores snippet complexity on a 0.0-1.0 scale.
///
/// Combines brace nesting, control structures, function definitions,
/// operator density, and indentation depth with fixed weights. The
/// score only has to order snippets roughly, not measure them.
pub fn complexity_score(code: &str) -> f32 {
    let braces = code.matches('{').count() as f32;
    let control: usize = CONTROL_KEYWORDS.iter().map(|k| code.matches(k).count()).sum();
    let functions: usize = FUNCTION_KEYWORDS.iter().map(|k| code.matches(k).count()).sum();
    let operators = code
        .chars()
        .filter(|c| matches!(c, '+' | '-' | '*' | '/' | '%' | '=' | '&' | '|' | '<' | '>' | '!' | '?'))
        .count() as f32;
    let max_indent = code
        .lines()
        .map(|line| line.len() - line.trim_start().len())
        .max()
        .unwrap_or(0) as f32
        / 8.0;

    let score = (braces / 20.0).min(1.0) * 0.2
        + (control as f32 / 15.0).min(1.0) * 0.3
        + (functions as f32 / 10.0).min(1.0) * 0.2
        + (operators / 50.0).min(1.0) * 0.2
        + max_indent.min(1.0) * 0.1;
    score.clamp(0.0, 1.0)
}

/// Returns the default genre for a language.
pub fn genre_for_language(language: &str) -> &'static str {
    let language = language.to_lowercase();
    LANGUAGE_GENRES
        .iter()
        .find(|(name, _)| *name == language)
        .or_else(|| LANGUAGE_GENRES.iter().find(|(name, _)| *name == "unknown"))
        .map(|(_, genres)| genres[0])
        .unwrap_or("lo-fi")
}

/// BPM range for a complexity score; busy code gets faster music.
fn bpm_range(complexity: f32) -> (u32, u32) {
    if complexity < 0.2 {
        (60, 80)
    } else if complexity < 0.4 {
        (80, 100)
    } else if complexity < 0.6 {
        (100, 120)
    } else if complexity < 0.8 {
        (120, 140)
    } else {
        (140, 160)
    }
}

/// Picks a tempo within the complexity's BPM range.
pub fn select_bpm(complexity: f32) -> u32 {
    let (min, max) = bpm_range(complexity);
    rand::thread_rng().gen_range(min..max)
}

/// Mood descriptors for a complexity score.
pub fn select_mood(complexity: f32) -> &'static str {
    if complexity > 0.7 {
        "intense, focused, intricate"
    } else if complexity > 0.4 {
        "structured, methodical, evolving"
    } else {
        "relaxed, calm, gentle"
    }
}

/// Suggests an instrument palette from structural signals in the code.
fn suggest_instrumentation(code: &str) -> Vec<&'static str> {
    let mut instruments = vec!["acoustic kick & snare"];

    let upper = code.to_uppercase();
    if upper.contains("SELECT ") || upper.contains("INSERT ") || upper.contains("UPDATE ") {
        instruments.push("lo-fi drum loop");
        instruments.push("dusty vinyl crackle");
        instruments.push("electric rhodes piano");
    }
    if code.contains("async") || code.contains("await") || code.contains("Promise") {
        instruments.push("four-on-the-floor house kit");
        instruments.push("side-chained saw pad");
    }

    let loc = code.lines().count();
    if loc < 40 {
        instruments.push("minimal sub-bass");
    } else if loc > 200 {
        instruments.push("warm string pad");
    }

    instruments
}

/// Builds a generation prompt from a code snippet.
///
/// `genre` and `language` override the detected values when given. The
/// analysis reads up to [`MAX_SNIPPET`] characters of code; the appended
/// snippet is cut further so the finished prompt never exceeds
/// [`MAX_PROMPT_LEN`] bytes and always passes request validation.
pub fn build_prompt(code: &str, genre: Option<&str>, language: Option<&str>) -> String {
    let snippet: String = code.chars().take(MAX_SNIPPET).collect();

    let detected = detect_language(&snippet);
    let language = language.filter(|l| !l.trim().is_empty()).unwrap_or(detected);
    let genre = genre
        .filter(|g| !g.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| genre_for_language(language).to_string());

    let complexity = complexity_score(&snippet);
    let bpm = select_bpm(complexity);
    let mood = select_mood(complexity);
    let style = if complexity > 0.6 {
        "complex and intricate"
    } else {
        "smooth and flowing"
    };
    let character = if complexity > 0.5 {
        "sophisticated and detailed"
    } else {
        "clean and elegant"
    };
    let instrumentation = suggest_instrumentation(&snippet).join(", ");

    let header = format!(
        "Genre: {genre}\n\
         Mood: {mood}\n\
         Tempo: {bpm} BPM\n\
         Style: {style}\n\
         Inspiration: {language} code that is {character}\n\
         Instrumentation: {instrumentation}\n\
         The music should capture the essence of coding in {language}, with a {mood} atmosphere.\n\
         CODE CONTEXT:\n"
    );

    // The snippet yields to the fixed header when space runs out
    let budget = MAX_PROMPT_LEN.saturating_sub(header.len());
    let mut end = snippet.len().min(budget);
    while end > 0 && !snippet.is_char_boundary(end) {
        end -= 1;
    }
    format!("{header}{}", &snippet[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_rust() {
        let code = "pub fn main() {\n    let mut x = 1;\n    match x { _ => {} }\n}";
        assert_eq!(detect_language(code), "rust");
    }

    #[test]
    fn detects_python() {
        let code = "def handler(self):\n    import os\n    lambda x: x";
        assert_eq!(detect_language(code), "python");
    }

    #[test]
    fn detects_sql() {
        let code = "SELECT id FROM users WHERE active = 1";
        assert_eq!(detect_language(code), "sql");
    }

    #[test]
    fn unknown_language_falls_back() {
        assert_eq!(detect_language("hello world"), "unknown");
        assert_eq!(genre_for_language("unknown"), "lo-fi");
        assert_eq!(genre_for_language("klingon"), "lo-fi");
    }

    #[test]
    fn genre_lookup_is_case_insensitive() {
        assert_eq!(genre_for_language("Rust"), "industrial");
        assert_eq!(genre_for_language("python"), "ambient");
    }

    #[test]
    fn complexity_orders_snippets() {
        let simple = "let x = 1;";
        let busy = "fn f() {\n    for i in 0..10 {\n        if i % 2 == 0 {\n            \
                    while check(i) { g(i); }\n        } else {\n            h(i)?;\n        }\n    }\n}\n"
            .repeat(4);
        assert!(complexity_score(simple) < complexity_score(&busy));
        assert!(complexity_score("") <= 0.01);
        assert!(complexity_score(&busy) <= 1.0);
    }

    #[test]
    fn bpm_stays_in_range() {
        for _ in 0..50 {
            let bpm = select_bpm(0.1);
            assert!((60..80).contains(&bpm));
            let bpm = select_bpm(0.9);
            assert!((140..160).contains(&bpm));
        }
    }

    #[test]
    fn build_prompt_has_expected_sections() {
        let prompt = build_prompt("def f():\n    import os\n    return 1", None, None);
        assert!(prompt.starts_with("Genre: ambient"));
        assert!(prompt.contains("Tempo: "));
        assert!(prompt.contains(" BPM"));
        assert!(prompt.contains("CODE CONTEXT:\ndef f():"));
    }

    #[test]
    fn build_prompt_honors_overrides() {
        let prompt = build_prompt("let x = 1;", Some("jazz"), Some("ruby"));
        assert!(prompt.starts_with("Genre: jazz"));
        assert!(prompt.contains("coding in ruby"));

        // Empty overrides fall back to detection
        let prompt = build_prompt("hello", Some(""), Some(""));
        assert!(prompt.starts_with("Genre: lo-fi"));
    }

    #[test]
    fn build_prompt_truncates_snippet() {
        let code = "x".repeat(MAX_SNIPPET * 2);
        let prompt = build_prompt(&code, None, None);
        let snippet = prompt.split("CODE CONTEXT:\n").nth(1).unwrap();
        assert!(!snippet.is_empty());
        assert!(snippet.chars().count() <= MAX_SNIPPET);
    }

    #[test]
    fn built_prompt_always_passes_validation() {
        use crate::types::GenerationRequest;

        for len in [10, 700, MAX_SNIPPET, MAX_SNIPPET * 3] {
            let code: String = "let mut total = 0;\n"
                .repeat(1 + len / 19)
                .chars()
                .take(len)
                .collect();
            let prompt = build_prompt(&code, None, None);
            assert!(
                prompt.len() <= MAX_PROMPT_LEN,
                "prompt of {} bytes from {}-char snippet",
                prompt.len(),
                len
            );
            GenerationRequest::new(prompt).validate().unwrap();
        }
    }

    #[test]
    fn snippet_cut_lands_on_char_boundary() {
        // Multibyte content right at the cut point must not split a char
        let code = "ß".repeat(MAX_SNIPPET);
        let prompt = build_prompt(&code, None, None);
        assert!(prompt.len() <= MAX_PROMPT_LEN);
        let snippet = prompt.split("CODE CONTEXT:\n").nth(1).unwrap();
        assert!(snippet.chars().all(|c| c == 'ß'));
    }
}
