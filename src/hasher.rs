/// Hex digest of the raw bytes. Deterministic and collision-resistant;
/// exact-mode grouping keys are equality over this string.
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Hash of the normalized text, used as the canonical-mode grouping key.
pub fn normalized_hash(text: &str) -> String {
    content_hash(normalize_text(text).as_bytes())
}

/// Canonical text normalization:
/// - line endings unified to `\n`
/// - bold/italic markup delimiters (`*`, `_`) stripped
/// - runs of horizontal whitespace collapsed to one space
/// - every line trimmed
/// - runs of blank lines collapsed to one, boundaries trimmed
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<String> = unified
        .split('\n')
        .map(|raw| {
            let stripped: String = raw.chars().filter(|c| *c != '*' && *c != '_').collect();
            stripped.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .collect();

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut prev_blank = false;
    for line in &lines {
        let blank = line.is_empty();
        if blank && prev_blank {
            continue;
        }
        out.push(line.as_str());
        prev_blank = blank;
    }
    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
