//! Gradient and color rendering for nametags and titles.
//!
//! Text markup understood here:
//! - `<gradient>...</gradient>` spans get a character-by-character gradient
//!   over the configured palette.
//! - `&gword` is shorthand for `<gradient>word</gradient>` (sigil plus a run
//!   of non-whitespace), for compact chat input.
//! - `&x` flat color codes outside a gradient span are translated to `§x`.
//!
//! Everything in this module is a pure function over its inputs. Malformed
//! markup degrades to literal passthrough; nothing here ever fails.

/// Color name to `§` code mapping, in classic server order.
pub const COLOR_CODES: &[(&str, &str)] = &[
    ("black", "§0"),
    ("dark_blue", "§1"),
    ("dark_green", "§2"),
    ("dark_aqua", "§3"),
    ("dark_red", "§4"),
    ("dark_purple", "§5"),
    ("gold", "§6"),
    ("gray", "§7"),
    ("dark_gray", "§8"),
    ("blue", "§9"),
    ("green", "§a"),
    ("aqua", "§b"),
    ("red", "§c"),
    ("light_purple", "§d"),
    ("yellow", "§e"),
    ("white", "§f"),
    ("reset", "§r"),
];

const OPEN_TAG: &str = "<gradient>";
const CLOSE_TAG: &str = "</gradient>";

/// Default gradient palette: warm-to-cool sweep across seven colors.
pub fn default_palette() -> Vec<String> {
    ["§c", "§6", "§e", "§a", "§b", "§9", "§d"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Look up the `§` code for a color name.
pub fn color_code(name: &str) -> Option<&'static str> {
    COLOR_CODES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
}

/// True if `code` is a `§` sequence from the color table.
pub fn is_color_code(code: &str) -> bool {
    COLOR_CODES.iter().any(|(_, c)| *c == code)
}

/// Apply a gradient over `content`: character `i` of `L` receives the palette
/// color at index `min(i*N/L, N-1)`. The mapping is monotonic, covers the full
/// palette, and always maps the last character to the last color. A single
/// character gets index 0; empty content yields an empty string.
pub fn render(content: &str, palette: &[String]) -> String {
    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();
    let n = palette.len();
    if len == 0 || n == 0 {
        return content.to_string();
    }
    let mut out = String::with_capacity(content.len() + len * 2);
    for (i, ch) in chars.iter().enumerate() {
        let idx = (i * n / len).min(n - 1);
        out.push_str(&palette[idx]);
        out.push(*ch);
    }
    out
}

/// Expand `&gword` shorthand into full `<gradient>word</gradient>` form.
/// The sigil must be immediately followed by non-whitespace; a bare `&g`
/// stays literal.
pub fn expand_shorthand(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 24);
    let mut rest = text;
    while let Some(pos) = rest.find("&g") {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        let after = &tail[2..];
        let word_end = after.find(char::is_whitespace).unwrap_or(after.len());
        if word_end == 0 {
            out.push_str("&g");
            rest = after;
        } else {
            out.push_str(OPEN_TAG);
            out.push_str(&after[..word_end]);
            out.push_str(CLOSE_TAG);
            rest = &after[word_end..];
        }
    }
    out.push_str(rest);
    out
}

/// Translate `&x` flat color codes to `§x`. Only table codes (`0-9`, `a-f`,
/// `r`) are translated; any other ampersand stays literal.
fn translate_amp_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&' {
            match chars.peek() {
                Some(&n) if matches!(n, '0'..='9' | 'a'..='f' | 'r') => {
                    out.push('§');
                    out.push(n);
                    chars.next();
                }
                _ => out.push('&'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Render a full marked-up string: expand shorthand, colorize every
/// `<gradient>` span with `render`, and translate flat codes in the text
/// between spans. An opening tag with no matching close leaves the whole
/// remainder untouched.
pub fn render_markup(text: &str, palette: &[String]) -> String {
    if text.is_empty() {
        return String::new();
    }
    let expanded = expand_shorthand(text);
    let mut out = String::with_capacity(expanded.len() + 16);
    let mut rest = expanded.as_str();
    loop {
        match rest.find(OPEN_TAG) {
            None => {
                out.push_str(&translate_amp_codes(rest));
                break;
            }
            Some(pos) => {
                let (head, tail) = rest.split_at(pos);
                out.push_str(&translate_amp_codes(head));
                let body = &tail[OPEN_TAG.len()..];
                match body.find(CLOSE_TAG) {
                    None => {
                        // Unterminated opening tag: pass the remainder through literally.
                        out.push_str(tail);
                        break;
                    }
                    Some(end) => {
                        out.push_str(&render(&body[..end], palette));
                        rest = &body[end + CLOSE_TAG.len()..];
                    }
                }
            }
        }
    }
    out
}

/// Remove `§x` color sequences, leaving the bare text. Used when re-coloring
/// an existing tag.
pub fn strip_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '§' {
            match chars.peek() {
                Some(&n) if matches!(n, '0'..='9' | 'a'..='f' | 'r') => {
                    chars.next();
                }
                _ => out.push('§'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
