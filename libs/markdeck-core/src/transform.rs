//! Text transforms applied to card fields before rendering, and the
//! Markdown-to-HTML render itself.
//!
//! Order matters: embeds are rewritten first (so the wikilink pattern never
//! sees an image or audio embed), then note links, then math. Math payloads
//! are backslash-escaped so the Markdown renderer passes them through
//! verbatim.

use pulldown_cmark::{html, Options, Parser};
use regex::Captures;

use crate::grammar::Grammar;

/// Full field pipeline: substitutions, then render to HTML.
pub fn render_field(grammar: &Grammar, raw: &str, vault: &str) -> String {
    let s = substitute_image_links(grammar, raw);
    let s = substitute_audio_links(grammar, &s);
    let s = substitute_note_links(grammar, &s, vault);
    let s = substitute_math(grammar, &s);
    markdown_to_html(&s)
}

/// `![[img.png]]` and `![](img.png)` become `<img>` elements.
pub fn substitute_image_links(grammar: &Grammar, s: &str) -> String {
    let s = grammar.wiki_image.replace_all(s, "<img src='$1'>");
    grammar
        .markdown_image
        .replace_all(&s, "<img src='$1'>")
        .into_owned()
}

/// `![[clip.mp3]]` becomes the store's `[sound:clip.mp3]` tag.
pub fn substitute_audio_links(grammar: &Grammar, s: &str) -> String {
    grammar
        .wiki_audio
        .replace_all(s, "[sound:$1]")
        .into_owned()
}

/// `[[target]]` and `[[target|alias]]` become deep links opening the note,
/// keeping the wikilink itself as the link text.
pub fn substitute_note_links(grammar: &Grammar, s: &str, vault: &str) -> String {
    let vault = urlencoding::encode(vault).into_owned();
    grammar
        .note_link
        .replace_all(s, |caps: &Captures| {
            let inner = &caps[1];
            let target = inner.split('|').next().unwrap_or(inner);
            format!(
                "<a href=\"obsidian://open?vault={}&file={}.md\">{}</a>",
                vault,
                urlencoding::encode(target),
                &caps[0]
            )
        })
        .into_owned()
}

/// `$$payload$$` and `$payload$` become the store's `\(payload\)` math
/// delimiters, the payload escaped to survive the Markdown render.
pub fn substitute_math(grammar: &Grammar, s: &str) -> String {
    let s = grammar.math_block.replace_all(s, |caps: &Captures| {
        format!(r"\\({}\\)", escape_markdown(&caps[1]))
    });
    grammar
        .math_inline
        .replace_all(&s, |caps: &Captures| {
            format!(r"\\({}\\)", escape_markdown(&caps[1]))
        })
        .into_owned()
}

/// Render Markdown to HTML with tables, task lists and strikethrough, the
/// way the store expects field content.
pub fn markdown_to_html(s: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(s, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out.trim_end().to_string()
}

/// Image and audio targets referenced by `raw`, markdown link targets
/// percent-decoded, for the media-upload collaborator.
pub fn media_links(grammar: &Grammar, raw: &str) -> Vec<String> {
    let mut links = Vec::new();
    for caps in grammar.wiki_image.captures_iter(raw) {
        links.push(caps[1].to_string());
    }
    for caps in grammar.markdown_image.captures_iter(raw) {
        let name = &caps[1];
        links.push(
            urlencoding::decode(name)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| name.to_string()),
        );
    }
    for caps in grammar.wiki_audio.captures_iter(raw) {
        links.push(caps[1].to_string());
    }
    links
}

/// True when a rendered field carries a code element, which switches the
/// card to the code-highlight model variant.
pub fn contains_code<'a>(grammar: &Grammar, fields: impl IntoIterator<Item = &'a str>) -> bool {
    fields.into_iter().any(|f| grammar.html_code.is_match(f))
}

fn escape_markdown(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    for c in payload.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;

    fn grammar() -> Grammar {
        Grammar::new(&Config::default())
    }

    #[test]
    fn wiki_image_becomes_img_tag() {
        let out = substitute_image_links(&grammar(), "see ![[cell.png]] here");
        assert_eq!(out, "see <img src='cell.png'> here");
    }

    #[test]
    fn markdown_image_becomes_img_tag() {
        let out = substitute_image_links(&grammar(), "![](diagram.svg)");
        assert_eq!(out, "<img src='diagram.svg'>");
    }

    #[test]
    fn audio_becomes_sound_tag() {
        let out = substitute_audio_links(&grammar(), "listen ![[word.mp3]]");
        assert_eq!(out, "listen [sound:word.mp3]");
    }

    #[test]
    fn note_link_becomes_deep_link() {
        let out = substitute_note_links(&grammar(), "see [[Other Note]]", "My Vault");
        assert_eq!(
            out,
            "see <a href=\"obsidian://open?vault=My%20Vault&file=Other%20Note.md\">[[Other Note]]</a>"
        );
    }

    #[test]
    fn aliased_note_link_targets_the_note() {
        let out = substitute_note_links(&grammar(), "[[Note|label]]", "v");
        assert!(out.contains("file=Note.md"));
        assert!(out.contains(">[[Note|label]]</a>"));
    }

    #[test]
    fn math_is_rewritten_and_escaped() {
        let out = substitute_math(&grammar(), "$$x_1$$ and $a*b$");
        assert_eq!(out, r"\\(x\_1\\) and \\(a\*b\\)");
    }

    #[test]
    fn math_survives_rendering() {
        let g = grammar();
        let html = markdown_to_html(&substitute_math(&g, "$x_1 * y$"));
        assert!(html.contains(r"\(x_1 * y\)"));
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn renders_paragraph() {
        assert_eq!(markdown_to_html("Q"), "<p>Q</p>");
    }

    #[test]
    fn collects_media_in_order() {
        let g = grammar();
        let links = media_links(&g, "![[a.png]] ![](b%20c.jpg) ![[d.mp3]]");
        assert_eq!(links, vec!["a.png", "b c.jpg", "d.mp3"]);
    }

    #[test]
    fn detects_code_elements() {
        let g = grammar();
        let rendered = markdown_to_html("use `let` here");
        assert!(contains_code(&g, [rendered.as_str()]));
        assert!(!contains_code(&g, ["<p>plain</p>"]));
    }
}
