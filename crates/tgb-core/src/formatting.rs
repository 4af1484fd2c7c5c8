//! Markdown → plain text rendering for outbound messages.
//!
//! Messages are sent without a parse mode, so markup is stripped rather than
//! translated. Code is kept verbatim.

use std::sync::OnceLock;

use regex::Regex;

/// Render host markdown as the plain text Telegram displays as-is.
pub fn markdown_to_text(input: &str) -> String {
    let (text, code_blocks) = extract_code_blocks(input);
    let (text, inline_codes) = extract_inline_codes(&text);
    let (mut text, links) = extract_links(&text);

    // Line-oriented transforms (avoid cross-line emphasis bugs).
    let mut lines = Vec::new();
    for line in text.split('\n') {
        if is_horizontal_rule(line) {
            continue;
        }
        let mut l = strip_header(line);
        l = strip_blockquote(&l);
        l = convert_bullet(&l);
        l = strip_emphasis(&l);
        lines.push(l);
    }
    text = lines.join("\n");

    for (i, link) in links.iter().enumerate() {
        text = text.replace(&format!("\0LINK{i}\0"), link);
    }
    for (i, code) in code_blocks.iter().enumerate() {
        text = text.replace(&format!("\0CODEBLOCK{i}\0"), code.trim_end_matches('\n'));
    }
    for (i, code) in inline_codes.iter().enumerate() {
        text = text.replace(&format!("\0INLINECODE{i}\0"), code);
    }

    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }

    text.trim_end().to_string()
}

fn strip_emphasis(line: &str) -> String {
    let mut l = strip_delimited(line, "**");
    l = strip_delimited(&l, "__");
    l = strip_delimited(&l, "~~");
    l = strip_single_delim(&l, '*');
    strip_single_delim(&l, '_')
}

/// Render images and links up front so their targets never see the emphasis pass.
fn extract_links(input: &str) -> (String, Vec<String>) {
    let mut links = Vec::new();

    // Images first so the link pattern does not eat their alt text.
    let text = image_re()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let idx = links.len();
            links.push(render_link(&caps[1], &caps[2]));
            format!("\0LINK{idx}\0")
        })
        .to_string();
    let text = link_re()
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            let idx = links.len();
            links.push(render_link(&caps[1], &caps[2]));
            format!("\0LINK{idx}\0")
        })
        .to_string();

    (text, links)
}

fn render_link(label: &str, url: &str) -> String {
    let label = strip_emphasis(label);
    if label.is_empty() || label == url {
        url.to_string()
    } else {
        format!("{label} ({url})")
    }
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("valid regex"))
}

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"))
}

fn extract_code_blocks(input: &str) -> (String, Vec<String>) {
    let mut blocks = Vec::new();
    let mut out = String::new();

    let mut i = 0usize;
    while let Some(rel) = input[i..].find("```") {
        let start = i + rel;
        out.push_str(&input[i..start]);

        let mut p = start + 3;
        // Optional language identifier: [A-Za-z0-9_]+
        while p < input.len() {
            let b = input.as_bytes()[p];
            if b.is_ascii_alphanumeric() || b == b'_' {
                p += 1;
            } else {
                break;
            }
        }
        if p < input.len() && input.as_bytes()[p] == b'\n' {
            p += 1;
        }

        if let Some(end_rel) = input[p..].find("```") {
            let end = p + end_rel;
            let idx = blocks.len();
            blocks.push(input[p..end].to_string());
            out.push_str(&format!("\0CODEBLOCK{idx}\0"));
            i = end + 3;
            continue;
        }

        // Unclosed fence: keep the rest untouched.
        out.push_str(&input[start..]);
        return (out, blocks);
    }

    out.push_str(&input[i..]);
    (out, blocks)
}

fn extract_inline_codes(input: &str) -> (String, Vec<String>) {
    let mut codes = Vec::new();
    let mut out = String::new();

    let mut i = 0usize;
    while let Some(rel) = input[i..].find('`') {
        let start = i + rel;
        out.push_str(&input[i..start]);

        let content_start = start + 1;
        if let Some(end_rel) = input[content_start..].find('`') {
            let end = content_start + end_rel;
            let idx = codes.len();
            codes.push(input[content_start..end].to_string());
            out.push_str(&format!("\0INLINECODE{idx}\0"));
            i = end + 1;
            continue;
        }

        out.push_str(&input[start..]);
        return (out, codes);
    }

    out.push_str(&input[i..]);
    (out, codes)
}

fn is_horizontal_rule(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && (t.chars().all(|c| c == '-') || t.chars().all(|c| c == '*'))
}

fn strip_header(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() && bytes[i] == b'#' && i < 6 {
        i += 1;
    }
    if i > 0 && i < bytes.len() && bytes[i] == b' ' {
        return line[i + 1..].to_string();
    }
    line.to_string()
}

fn strip_blockquote(line: &str) -> String {
    if line == ">" {
        return String::new();
    }
    match line.strip_prefix("> ") {
        Some(rest) => rest.to_string(),
        None => line.to_string(),
    }
}

fn convert_bullet(line: &str) -> String {
    let indent = line.len() - line.trim_start().len();
    let body = &line[indent..];
    if let Some(rest) = body.strip_prefix("- ").or_else(|| body.strip_prefix("* ")) {
        return format!("{}• {rest}", &line[..indent]);
    }
    line.to_string()
}

fn strip_delimited(text: &str, delim: &str) -> String {
    let mut out = String::new();
    let mut i = 0usize;
    while let Some(rel) = text[i..].find(delim) {
        let start = i + rel;
        out.push_str(&text[i..start]);
        let content_start = start + delim.len();
        if let Some(end_rel) = text[content_start..].find(delim) {
            let end = content_start + end_rel;
            out.push_str(&text[content_start..end]);
            i = end + delim.len();
            continue;
        }
        out.push_str(&text[start..]);
        return out;
    }
    out.push_str(&text[i..]);
    out
}

fn strip_single_delim(text: &str, delim: char) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] != delim {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        // Only treat the delimiter as emphasis when it opens a word
        // (snake_case identifiers and `2 * 3` stay as they are).
        let opens = (i == 0 || !chars[i - 1].is_alphanumeric())
            && chars.get(i + 1).is_some_and(|c| !c.is_whitespace() && *c != delim);
        let close = opens
            .then(|| {
                (i + 2..chars.len()).find(|&j| {
                    chars[j] == delim
                        && !chars[j - 1].is_whitespace()
                        && chars.get(j + 1).map_or(true, |c| !c.is_alphanumeric())
                })
            })
            .flatten();

        match close {
            Some(j) => {
                out.extend(&chars[i + 1..j]);
                i = j + 1;
            }
            None => {
                out.push(delim);
                i += 1;
            }
        }
    }

    out
}
