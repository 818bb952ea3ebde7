//! Rendering of lookup results into chat messages.

use std::num::NonZeroUsize;

use crate::models::CatalogRecord;

/// Largest message the Telegram Bot API accepts, in UTF-16 code units.
pub const TELEGRAM_MAX_MESSAGE_LEN: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(n) => n,
    None => panic!("4096 is non-zero"),
};

/// A rendered result, already cut into transport-sized chunks.
///
/// Never empty: an empty result set has no message at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    chunks: Vec<String>,
}

impl RenderedMessage {
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<String> {
        self.chunks
    }

    /// The full text, chunks rejoined.
    pub fn text(&self) -> String {
        self.chunks.concat()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MessageFormatter {
    max_chunk_size: NonZeroUsize,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(TELEGRAM_MAX_MESSAGE_LEN)
    }
}

impl MessageFormatter {
    pub fn new(max_chunk_size: NonZeroUsize) -> Self {
        Self { max_chunk_size }
    }

    /// Render `records` and cut the text into chunks; `None` when there is
    /// nothing to send.
    pub fn to_message(&self, records: &[CatalogRecord]) -> Option<RenderedMessage> {
        let text = render(records);
        if text.is_empty() {
            return None;
        }
        let chunks = if message_len(&text) <= self.max_chunk_size.get() {
            vec![text]
        } else {
            split(&text, self.max_chunk_size)
        };
        Some(RenderedMessage { chunks })
    }
}

/// Numbered list of records, four lines per entry. Empty input renders to "".
pub fn render(records: &[CatalogRecord]) -> String {
    let mut output = String::new();
    for (i, record) in records.iter().enumerate() {
        output.push_str(&format!(
            "{}. {}\nLink: {}\nAddress: {}\n\n",
            i + 1,
            record.category,
            record.link,
            record.formatted_address
        ));
    }
    output
}

/// Length of `text` in UTF-16 code units, the unit Telegram limits
/// messages by.
pub fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Cut `text` into consecutive slices of at most `max_size` UTF-16 code
/// units.
///
/// Slices are filled greedily and only ever end on a char boundary, so a
/// surrogate pair is never separated; a slice may therefore be one unit short
/// of `max_size`. For text inside the Basic Multilingual Plane this gives
/// exactly `ceil(len / max_size)` slices. Boundaries ignore words and lines.
/// Empty text yields no slices.
pub fn split(text: &str, max_size: NonZeroUsize) -> Vec<String> {
    let max_size = max_size.get();
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut units = 0;

    for (offset, c) in text.char_indices() {
        let width = c.len_utf16();
        if units + width > max_size && offset > start {
            chunks.push(text[start..offset].to_string());
            start = offset;
            units = 0;
        }
        units += width;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::test_record;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "");
        assert!(MessageFormatter::default().to_message(&[]).is_none());
    }

    #[test]
    fn test_render_entries() {
        let records = vec![test_record(1, "w21z6h8v5"), test_record(2, "w21z6j000")];
        assert_eq!(
            render(&records),
            "1. Place 1\nLink: https://example.com/1\nAddress: 1 Example Road\n\n\
             2. Place 2\nLink: https://example.com/2\nAddress: 2 Example Road\n\n"
        );
    }

    #[test]
    fn test_split_boundaries() {
        let exact = "a".repeat(4096);
        assert_eq!(split(&exact, TELEGRAM_MAX_MESSAGE_LEN), vec![exact.clone()]);

        let over = "a".repeat(4097);
        let chunks = split(&over, TELEGRAM_MAX_MESSAGE_LEN);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 1);
    }

    #[test]
    fn test_split_empty_yields_no_chunks() {
        assert!(split("", TELEGRAM_MAX_MESSAGE_LEN).is_empty());
    }

    #[test]
    fn test_split_accented_text() {
        let chunks = split("héllo wörld", size(4));
        assert_eq!(chunks, vec!["héll", "o wö", "rld"]);
    }

    #[test]
    fn test_split_never_separates_surrogate_pair() {
        assert_eq!(message_len("🍜"), 2);
        assert_eq!(split("a🍜", size(2)), vec!["a", "🍜"]);
        assert_eq!(split("🍜🍜", size(3)), vec!["🍜", "🍜"]);
        assert_eq!(split("🍜🍜", size(4)), vec!["🍜🍜"]);
    }

    #[test]
    fn test_emoji_chunks_fit_telegram_limit() {
        let records: Vec<_> = (0..120)
            .map(|i| {
                let mut record = test_record(i, "w21z6h8v5");
                record.category = "Laksa 🍜🍜🍜".to_string();
                record
            })
            .collect();

        let message = MessageFormatter::default().to_message(&records).unwrap();
        assert!(message.chunks().len() > 1);
        for chunk in message.chunks() {
            assert!(chunk.encode_utf16().count() <= 4096);
        }
        assert_eq!(message.text(), render(&records));
    }

    #[test]
    fn test_single_chunk_check_counts_utf16() {
        // 2048 chars, 4097 UTF-16 units.
        let text = format!("{}a", "🍜".repeat(2048));
        assert_eq!(text.chars().count(), 2049);
        let chunks = split(&text, TELEGRAM_MAX_MESSAGE_LEN);
        assert_eq!(chunks.len(), 2);
        assert_eq!(message_len(&chunks[0]), 4096);
        assert_eq!(chunks[1], "a");
    }

    #[test]
    fn test_split_reassembles_rendered_text() {
        let records: Vec<_> = (0..200).map(|i| test_record(i, "w21z6h8v5")).collect();
        let text = render(&records);
        let chunks = split(&text, size(97));
        assert!(chunks.iter().all(|c| message_len(c) <= 97));
        assert_eq!(chunks.len(), message_len(&text).div_ceil(97));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_to_message_chunks_long_output() {
        let records: Vec<_> = (0..200).map(|i| test_record(i, "w21z6h8v5")).collect();
        let formatter = MessageFormatter::new(size(1000));

        let message = formatter.to_message(&records).unwrap();
        assert!(message.chunks().len() > 1);
        assert!(message.chunks().iter().all(|c| message_len(c) <= 1000));
        assert_eq!(message.text(), render(&records));
    }

    #[test]
    fn test_to_message_single_chunk() {
        let records = vec![test_record(1, "w21z6h8v5")];
        let message = MessageFormatter::default().to_message(&records).unwrap();
        assert_eq!(message.chunks().len(), 1);
    }
}
