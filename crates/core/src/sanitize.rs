const ILLEGAL_REPLACEMENT: &str = " - ";

/// Replaces characters that are illegal in path components with `" - "` and
/// collapses whitespace runs into a single space.
pub fn sanitize(value: &str) -> String {
    let mut replaced = String::with_capacity(value.len());
    for ch in value.chars() {
        if is_disallowed_char(ch) {
            replaced.push_str(ILLEGAL_REPLACEMENT);
        } else {
            replaced.push(ch);
        }
    }
    collapse_whitespace(&replaced)
}

pub fn sanitize_opt(value: Option<&str>) -> Option<String> {
    value.map(sanitize)
}

fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending: Option<char> = None;
    let mut run = 0usize;

    for ch in value.chars() {
        if ch.is_whitespace() {
            if run == 0 {
                pending = Some(ch);
            }
            run += 1;
            continue;
        }
        flush_run(&mut out, pending.take(), run);
        run = 0;
        out.push(ch);
    }
    flush_run(&mut out, pending, run);

    out
}

// A lone whitespace char is kept as-is; only runs of two or more become one space.
fn flush_run(out: &mut String, first: Option<char>, run: usize) {
    match (first, run) {
        (Some(ch), 1) => out.push(ch),
        (Some(_), _) => out.push(' '),
        (None, _) => {}
    }
}

fn is_disallowed_char(ch: char) -> bool {
    matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}
