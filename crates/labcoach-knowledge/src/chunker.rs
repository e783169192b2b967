//! Paragraph-first document chunking.
//!
//! Paragraphs (blank-line separated) are packed greedily into chunks of at
//! most `max_chars` characters. A paragraph that alone exceeds the limit is
//! split at line boundaries instead; a single line longer than the limit is
//! kept whole, so no chunk boundary ever falls inside a line.

/// Split `text` into bounded chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for paragraph in paragraphs(text) {
        if char_len(&paragraph) > max_chars {
            flush(&mut buffer, &mut chunks);
            chunks.extend(split_lines(&paragraph, max_chars));
            continue;
        }
        if buffer.is_empty() {
            buffer = paragraph;
        } else if char_len(&buffer) + 2 + char_len(&paragraph) <= max_chars {
            buffer.push_str("\n\n");
            buffer.push_str(&paragraph);
        } else {
            flush(&mut buffer, &mut chunks);
            buffer = paragraph;
        }
    }
    flush(&mut buffer, &mut chunks);
    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn flush(buffer: &mut String, chunks: &mut Vec<String>) {
    if !buffer.is_empty() {
        chunks.push(std::mem::take(buffer));
    }
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n").trim().to_string());
    }
    out
}

fn split_lines(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut buffer = String::new();
    for line in paragraph.lines() {
        if buffer.is_empty() {
            buffer.push_str(line);
        } else if char_len(&buffer) + 1 + char_len(line) <= max_chars {
            buffer.push('\n');
            buffer.push_str(line);
        } else {
            pieces.push(std::mem::take(&mut buffer));
            buffer.push_str(line);
        }
    }
    if !buffer.is_empty() {
        pieces.push(buffer);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_paragraphs_until_limit() {
        let text = "alpha one\n\nbeta two\n\ngamma three";
        assert_eq!(chunk_text(text, 1200), vec![
            "alpha one\n\nbeta two\n\ngamma three"
        ]);
        assert_eq!(chunk_text(text, 20), vec![
            "alpha one\n\nbeta two",
            "gamma three"
        ]);
    }

    #[test]
    fn oversized_paragraph_splits_on_lines() {
        let text = "line aaaa\nline bbbb\nline cccc";
        let chunks = chunk_text(text, 20);
        assert_eq!(chunks, vec!["line aaaa\nline bbbb", "line cccc"]);
    }

    #[test]
    fn long_line_is_never_split() {
        let line = "x".repeat(50);
        let chunks = chunk_text(&format!("short\n\n{line}\n\ntail"), 10);
        assert_eq!(chunks, vec!["short".to_string(), line, "tail".to_string()]);
    }

    #[test]
    fn blank_documents_yield_nothing() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("  \n\n \n", 100).is_empty());
    }

    #[test]
    fn every_line_survives_intact() {
        let text = "# Title\n\nfirst para line 1\nfirst para line 2\n\n\n- item a\n- item b\n";
        let chunks = chunk_text(text, 25);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            assert!(
                chunks.iter().any(|c| c.lines().any(|cl| cl == line.trim_end())),
                "line {line:?} was split"
            );
        }
    }
}
