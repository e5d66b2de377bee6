//! Finds the templates a template pulls in
//!
//! Tera resolves `extends`, `include` and `import` by name inside one template
//! set, so everything a template references has to be loaded alongside it.
//! This is a tag-level scan, not a parse: string literals inside those tags
//! are taken as template names. Expressions, comments and `raw` blocks are
//! skipped, and delimiters inside string literals do not end a block.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dependency {
    pub name: String,
    /// `include ... ignore missing`, or one candidate of an include list
    pub optional: bool,
}

pub(crate) fn scan(source: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut rest = source;
    let mut in_raw = false;

    while let Some((start, kind)) = next_block(rest, in_raw) {
        let body_start = start + 2;
        let len = match kind {
            // Comments end at the first `#}`, quotes or not
            Block::Comment => rest[body_start..].find("#}"),
            Block::Expression => closing(&rest[body_start..], "}}"),
            Block::Tag => closing(&rest[body_start..], "%}"),
        };
        let Some(len) = len else {
            break;
        };
        let body = rest[body_start..body_start + len].trim_matches('-').trim();
        rest = &rest[body_start + len + 2..];

        if kind != Block::Tag {
            continue;
        }

        let keyword = body.split_whitespace().next().unwrap_or_default();
        if in_raw {
            in_raw = keyword != "endraw";
            continue;
        }

        match keyword {
            "raw" => in_raw = true,
            "extends" | "include" | "import" => {
                let args = &body[keyword.len()..];
                let names = string_literals(args);
                let optional = keyword == "include"
                    && (names.len() > 1 || args.contains("ignore missing"));
                deps.extend(names.into_iter().map(|name| Dependency { name, optional }));
            }
            _ => {}
        }
    }

    deps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Tag,
    Expression,
    Comment,
}

/// Offset and kind of the next `{%`, `{{` or `{#`; only tags count inside `raw`
fn next_block(source: &str, in_raw: bool) -> Option<(usize, Block)> {
    let bytes = source.as_bytes();
    source.match_indices('{').find_map(|(i, _)| {
        let kind = match bytes.get(i + 1)? {
            b'%' => Block::Tag,
            b'{' if !in_raw => Block::Expression,
            b'#' if !in_raw => Block::Comment,
            _ => return None,
        };
        Some((i, kind))
    })
}

/// Offset of `close` in `body`, ignoring any inside string literals
fn closing(body: &str, close: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in body.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '"' | '\'' | '`') => quote = Some(c),
            None if body[i..].starts_with(close) => return Some(i),
            None => {}
        }
    }
    None
}

fn string_literals(input: &str) -> Vec<String> {
    let mut literals = Vec::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '"' | '\'' | '`') {
            continue;
        }
        let start = i + c.len_utf8();
        match chars.by_ref().find(|&(_, close)| close == c) {
            Some((end, _)) => literals.push(input[start..end].to_string()),
            None => break,
        }
    }
    literals
}
