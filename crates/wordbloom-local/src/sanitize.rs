//! Best-effort HTML to plain text.
//!
//! This is not an HTML parser. Malformed markup degrades to "some tags left in the text",
//! never to an error.

/// Default bound on fetched text, in characters.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 20_000;

/// Strip `<script>`/`<style>` blocks (contents included), replace every other tag with a
/// single space, collapse whitespace runs to one space, and trim.
pub fn html_to_plain(html: &str) -> String {
    let s = strip_tag_blocks(html, "script");
    let s = strip_tag_blocks(&s, "style");
    norm_ws(&replace_tags(&s))
}

fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_tag_blocks(html: &str, tag: &str) -> String {
    // `<tag ...> ... </tag>`, ASCII-case-insensitive, shortest match. An unclosed block is left
    // alone. ASCII lowercasing keeps byte offsets aligned with `html`.
    let open_pat = format!("<{}", tag.to_ascii_lowercase());
    let close_pat = format!("</{}>", tag.to_ascii_lowercase());
    let lower = html.to_ascii_lowercase();

    let mut out = String::with_capacity(html.len());
    let mut i = 0usize;
    while let Some(rel_start) = lower[i..].find(&open_pat) {
        let start = i + rel_start;
        let after_open = start + open_pat.len();
        let Some(rel_gt) = lower[after_open..].find('>') else {
            break;
        };
        let body_start = after_open + rel_gt + 1;
        let Some(rel_end) = lower[body_start..].find(&close_pat) else {
            break;
        };
        out.push_str(&html[i..start]);
        i = body_start + rel_end + close_pat.len();
    }
    out.push_str(&html[i..]);
    out
}

fn replace_tags(s: &str) -> String {
    // `<` followed by at least one non-`>` and then `>` is a tag. Anything else is text.
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];
        match after.find('>') {
            Some(gt) if gt > 0 => {
                out.push(' ');
                rest = &after[gt + 1..];
            }
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Keep at most `max_chars` characters (not bytes).
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => s[..byte].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_script_contents_and_tags() {
        let out = html_to_plain("<script>evil()</script>Hello <b>world</b>");
        assert_eq!(out, "Hello world");
    }

    #[test]
    fn removes_style_blocks_case_insensitively() {
        let html = "<HTML><Style type=\"text/css\">p { color: red }</STYLE><p>Hi\n\n  there</p></HTML>";
        assert_eq!(html_to_plain(html), "Hi there");
    }

    #[test]
    fn script_attributes_and_multiple_blocks() {
        let html = r#"a<script src="x.js"></script>b<script type="module">let x = "<b>";</script>c"#;
        assert_eq!(html_to_plain(html), "abc");
    }

    #[test]
    fn malformed_markup_never_panics() {
        assert_eq!(html_to_plain("a <> b"), "a <> b");
        // A stray `<` swallows text up to the next `>`, like any tag-shaped span.
        assert_eq!(html_to_plain("1 < 2 and <i>3</i>"), "1 3");
        assert_eq!(html_to_plain("<script>never closed"), "never closed");
        assert_eq!(html_to_plain("text <b"), "text <b");
        assert_eq!(html_to_plain(""), "");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
