//! Outbound size limiting applied by the host before handing messages to the backend.

/// Split `body` into chunks of at most `limit` characters.
///
/// Chunks break on line boundaries where possible; a single line longer than
/// `limit` is cut at character boundaries. A zero limit disables splitting.
pub fn split_message(body: &str, limit: usize) -> Vec<String> {
    if limit == 0 || body.chars().count() <= limit {
        return vec![body.to_string()];
    }

    let mut out: Vec<String> = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0usize;

    for line in body.split('\n') {
        let line_len = line.chars().count();
        let sep = usize::from(!chunk.is_empty());

        if chunk_len + sep + line_len <= limit {
            if sep == 1 {
                chunk.push('\n');
            }
            chunk.push_str(line);
            chunk_len += sep + line_len;
            continue;
        }

        if !chunk.is_empty() {
            out.push(std::mem::take(&mut chunk));
            chunk_len = 0;
        }

        if line_len <= limit {
            chunk.push_str(line);
            chunk_len = line_len;
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut pieces = chars.chunks(limit).peekable();
        while let Some(piece) = pieces.next() {
            if pieces.peek().is_some() {
                out.push(piece.iter().collect());
            } else {
                chunk = piece.iter().collect();
                chunk_len = piece.len();
            }
        }
    }

    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}
