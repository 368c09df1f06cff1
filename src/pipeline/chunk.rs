//! Sentence-aware chunking of protocol text.
//!
//! Protocols run to hundreds of pages; a 100 000-character chunk (roughly
//! 25k tokens) leaves ample room in a 128k-token context window for the
//! schema-bearing system prompt and a 16k-token reply. Splitting on sentence
//! boundaries keeps an inclusion criterion or an endpoint definition from
//! being cut in half between two requests.

use tracing::debug;

/// Default chunk size in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 100_000;

const SENTENCE_BREAK: &str = ". ";

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Newlines are flattened to spaces, the text is cut at `". "` boundaries
/// and sentences are packed greedily. Each packed chunk is closed with a
/// period, which is not counted against `max_chars`. A
/// single sentence longer than `max_chars` is hard-split on character
/// boundaries. Whitespace-only input yields no chunks.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let flat = text.replace(['\r', '\n'], " ");

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0usize;

    for sentence in flat.split(SENTENCE_BREAK) {
        if sentence.trim().is_empty() {
            continue;
        }
        let size = sentence.chars().count();

        if size > max_chars {
            flush(&mut chunks, &mut current, &mut current_size);
            chunks.extend(hard_split(sentence, max_chars));
            continue;
        }

        let joined_size = if current.is_empty() {
            size
        } else {
            current_size + SENTENCE_BREAK.len() + size
        };
        if joined_size > max_chars {
            flush(&mut chunks, &mut current, &mut current_size);
            current_size = size;
        } else {
            current_size = joined_size;
        }
        current.push(sentence);
    }
    flush(&mut chunks, &mut current, &mut current_size);

    debug!("Text split into {} chunks", chunks.len());
    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut Vec<&str>, size: &mut usize) {
    if current.is_empty() {
        return;
    }
    let mut chunk = current.join(SENTENCE_BREAK).trim().to_string();
    if !chunk.ends_with('.') {
        chunk.push('.');
    }
    chunks.push(chunk);
    current.clear();
    *size = 0;
}

fn hard_split(sentence: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect::<String>().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("Protocol title. Phase 2 study", 1000);
        assert_eq!(chunks, vec!["Protocol title. Phase 2 study."]);
    }

    #[test]
    fn newlines_are_flattened() {
        let chunks = split_text("Line one\nline two.\r\nLine three", 1000);
        assert_eq!(chunks, vec!["Line one line two.  Line three."]);
    }

    #[test]
    fn splits_on_sentence_boundaries() {
        let text = "Aaaa aaaa. Bbbb bbbb. Cccc cccc. Dddd dddd";
        let chunks = split_text(text, 22);
        assert_eq!(chunks, vec!["Aaaa aaaa. Bbbb bbbb.", "Cccc cccc. Dddd dddd."]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 22));
    }

    #[test]
    fn oversized_sentence_is_hard_split() {
        let long = "x".repeat(25);
        let text = format!("Intro. {long}. Outro");
        let chunks = split_text(&text, 10);
        assert_eq!(
            chunks,
            vec!["Intro.", "xxxxxxxxxx", "xxxxxxxxxx", "xxxxx", "Outro."]
        );
    }

    #[test]
    fn never_emits_empty_chunks() {
        assert!(split_text("", 100).is_empty());
        assert!(split_text("   \n\n  ", 100).is_empty());
        assert!(split_text(". . . ", 100).iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let text = "Éàü ÉàüÉ. Ωμέγα δέλτα";
        let chunks = split_text(text, 12);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "Ωμέγα δέλτα.");
    }

    #[test]
    fn all_text_is_preserved() {
        let text = (0..200)
            .map(|i| format!("Sentence number {i}"))
            .collect::<Vec<_>>()
            .join(". ");
        let chunks = split_text(&text, 500);
        assert!(chunks.len() > 1);
        let rejoined = chunks
            .iter()
            .map(|c| c.trim_end_matches('.'))
            .collect::<Vec<_>>()
            .join(". ");
        assert_eq!(rejoined, text);
    }
}
