//! Pattern grammar recognizing the four card shapes and the exclusion zones.
//!
//! The original grammar for the multi-line card shapes needs lookahead, which
//! the `regex` crate does not provide, so the tagged and spaced matchers are
//! line-oriented scanners: a question block is a run of consecutive non-blank
//! lines ending at the trigger line, an answer block is a run of consecutive
//! non-blank lines terminated by a blank line, a 13-digit anchor at the start
//! of a line, or the end of input. Single-line shapes (inline, cloze) use
//! per-line patterns. All matchers return spans in original-document byte
//! offsets and never overlap within one matcher.

use regex::Regex;

use crate::config::Config;
use crate::headings::HeadingNode;

/// Byte span into the original document, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A tagged (question block / `#card` / answer block) match.
#[derive(Debug, Clone)]
pub struct TaggedMatch {
    pub span: Span,
    pub heading_level: Option<u8>,
    pub question: String,
    pub answer: String,
    pub reversed: bool,
    pub tags: Vec<String>,
    pub id: Option<u64>,
}

/// A spaced (`#card/spaced`) match; single prompt field.
#[derive(Debug, Clone)]
pub struct SpacedMatch {
    pub span: Span,
    pub heading_level: Option<u8>,
    pub prompt: String,
    pub tags: Vec<String>,
    pub id: Option<u64>,
}

/// An inline (`question :: answer`) match.
#[derive(Debug, Clone)]
pub struct InlineMatch {
    pub span: Span,
    pub heading_level: Option<u8>,
    pub question: String,
    pub answer: String,
    pub reversed: bool,
    pub tags: Vec<String>,
    pub id: Option<u64>,
}

/// A cloze line match. `text` carries the deletions already rewritten to the
/// store's `{{cN::...}}` syntax; `raw` is the untouched line content.
#[derive(Debug, Clone)]
pub struct ClozeMatch {
    pub span: Span,
    pub heading_level: Option<u8>,
    pub text: String,
    pub raw: String,
    pub tags: Vec<String>,
    pub id: Option<u64>,
}

/// An anchored identifier token found in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorBlock {
    pub id: u64,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerKind {
    Plain,
    Reverse,
    Spaced,
}

#[derive(Debug, Clone, Copy)]
struct TriggerHit {
    start: usize,
    end: usize,
    kind: TriggerKind,
}

/// Question prefixes that mark document metadata rather than a card.
const METADATA_PREFIXES: [&str; 3] = ["cards-deck", "cards-tags", "tags:"];

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern")
}

/// The compiled pattern set for one configuration.
pub struct Grammar {
    heading_line: Regex,
    pub(crate) wiki_image: Regex,
    pub(crate) markdown_image: Regex,
    pub(crate) wiki_audio: Regex,
    pub(crate) html_code: Regex,
    pub(crate) note_link: Regex,
    fenced_code: Regex,
    pub(crate) math_block: Regex,
    pub(crate) math_inline: Regex,
    anchor_scan: Regex,
    delete_scan: Regex,
    tags_line: Regex,
    tags_splitter: Regex,
    trigger: Regex,
    tag_list: Regex,
    tag_token: Regex,
    line_anchor: Regex,
    inline_prefix: Regex,
    inline_tail: Regex,
    inline_tail_with_id: Regex,
    cloze_curly: Regex,
    cloze_highlight: Regex,
    sep_long: String,
    sep_short: String,
    sep_reverse: String,
    inline_id: bool,
}

impl Grammar {
    /// Compile the grammar for a validated configuration.
    pub fn new(config: &Config) -> Self {
        let tag = regex::escape(&config.flashcards_tag);
        let (sep_long, sep_short) =
            if config.inline_separator.len() >= config.inline_separator_reverse.len() {
                (
                    config.inline_separator.clone(),
                    config.inline_separator_reverse.clone(),
                )
            } else {
                (
                    config.inline_separator_reverse.clone(),
                    config.inline_separator.clone(),
                )
            };

        Self {
            heading_line: rx(r"(?m)^ {0,3}(#{1,6}) +([^\n]+?) ?((?: *#\S+)*) *$"),
            wiki_image: rx(
                r"(?i)!\[\[([^\[\]\n]*\.(?:png|jpg|jpeg|gif|bmp|svg|tiff))[^\]\n]*?\]\]",
            ),
            markdown_image: rx(
                r"(?i)!\[\]\(([^()\n]*\.(?:png|jpg|jpeg|gif|bmp|svg|tiff))[^)\n]*?\)",
            ),
            wiki_audio: rx(
                r"(?i)!\[\[([^\[\]\n]*\.(?:mp3|webm|wav|m4a|ogg|3gp|flac))[^\]\n]*?\]\]",
            ),
            html_code: rx(r"(?is)<code\b[^>]*>.*?</code>"),
            note_link: rx(r"\[\[([^\[\]\n]+?)\]\]"),
            fenced_code: rx(r"(?s)```.*?```"),
            math_block: rx(r"(?s)\$\$(.*?)\$\$"),
            math_inline: rx(r"\$([^$\n]*)\$"),
            anchor_scan: rx(r"\^(\d{13})\s*"),
            delete_scan: rx(r"(?m)^\s*\n\^(\d{13})\n?"),
            tags_line: rx(r"(?i)(?:cards-)?tags:[ ]?([^\n]*)"),
            tags_splitter: rx(r"\[\[(.*?)\]\]|#([\p{L}\d:\-_/]+)|([\p{L}\d:\-_/]+)"),
            trigger: rx(&format!(r"(?i)#{tag}(?:[/-](reverse|spaced))?")),
            tag_list: rx(r"^(?: *#[\p{L}\d\-/_]+)* *$"),
            tag_token: rx(r"#([\p{L}\d\-/_]+)"),
            line_anchor: rx(r"^(?:<!--)?\^(\d{13})(?:-->)?"),
            inline_prefix: rx(r"^( {0,3}#{0,6})?(?:[\t ]*(?:\d+\.|[-+*]|#{1,6}))?"),
            inline_tail: rx(r"^(.*?)((?: *#[\p{L}\d\-/_]+)*)[ \t]*$"),
            inline_tail_with_id: rx(r"^(.*?)(?:\s+((?:<!--)?\^\d{13}(?:-->)?))?[ \t]*$"),
            cloze_curly: rx(r"\{(?:(\d+):)?([^{}\n]+?)\}"),
            cloze_highlight: rx(r"==([^\n]+?)=="),
            sep_long,
            sep_short,
            sep_reverse: config.inline_separator_reverse.clone(),
            inline_id: config.inline_id,
        }
    }

    /// Heading outline of the document, ordered by position.
    pub fn headings(&self, text: &str) -> Vec<HeadingNode> {
        self.heading_line
            .captures_iter(text)
            .map(|caps| {
                let whole = caps.get(0).expect("match");
                HeadingNode {
                    level: caps[1].len() as u8,
                    text: caps[2].trim().to_string(),
                    position: whole.start(),
                }
            })
            .collect()
    }

    /// Fenced-code and math spans; matches lying entirely inside one are void.
    pub fn exclusion_zones(&self, text: &str) -> Vec<Span> {
        let mut zones: Vec<Span> = self
            .fenced_code
            .find_iter(text)
            .map(|m| Span::new(m.start(), m.end()))
            .collect();
        zones.extend(self.math_zones(text));
        zones.sort_by_key(|z| z.start);
        zones
    }

    /// Block and inline math spans only, used for per-cloze-deletion tests.
    pub fn math_zones(&self, text: &str) -> Vec<Span> {
        let blocks: Vec<Span> = self
            .math_block
            .find_iter(text)
            .map(|m| Span::new(m.start(), m.end()))
            .collect();
        let mut zones = blocks.clone();
        for m in self.math_inline.find_iter(text) {
            let span = Span::new(m.start(), m.end());
            if !blocks.iter().any(|b| b.overlaps(span)) {
                zones.push(span);
            }
        }
        zones.sort_by_key(|z| z.start);
        zones
    }

    /// Every anchored identifier token, trailing whitespace included in the
    /// span.
    pub fn anchors(&self, text: &str) -> Vec<AnchorBlock> {
        self.anchor_scan
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0).expect("match");
                let id = caps[1].parse().ok()?;
                Some(AnchorBlock {
                    id,
                    span: Span::new(whole.start(), whole.end()),
                })
            })
            .collect()
    }

    /// Anchors with no content above them: a whitespace-only gap ends in a
    /// newline right before the `^` token. The span covers the gap, the token
    /// and its trailing newline, which is exactly what deletion removes.
    pub fn deleted_anchors(&self, text: &str) -> Vec<AnchorBlock> {
        self.delete_scan
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0).expect("match");
                let id = caps[1].parse().ok()?;
                Some(AnchorBlock {
                    id,
                    span: Span::new(whole.start(), whole.end()),
                })
            })
            .collect()
    }

    /// Tags declared on a `tags:` / `cards-tags:` metadata line.
    pub fn global_tags(&self, text: &str) -> Vec<String> {
        let Some(caps) = self.tags_line.captures(text) else {
            return Vec::new();
        };
        let payload = caps.get(1).map_or("", |m| m.as_str());
        self.tags_splitter
            .find_iter(payload)
            .map(|m| {
                let token = m.as_str();
                let token = token.strip_prefix('#').unwrap_or(token);
                let token = token
                    .strip_prefix("[[")
                    .and_then(|t| t.strip_suffix("]]"))
                    .unwrap_or(token);
                token.replace('/', "::").trim().replace(' ', "-")
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// All tagged-card matches in document order.
    pub fn tagged_matches(&self, text: &str) -> Vec<TaggedMatch> {
        let lines = lines_of(text);
        let mut out = Vec::new();
        let mut min_line = 0usize;
        let mut i = 0usize;

        while i < lines.len() {
            let line = &lines[i];
            let Some((hit, tags)) = self.block_trigger(line.text) else {
                i += 1;
                continue;
            };

            let first = self.question_start(&lines, i, min_line);
            let q_start = lines[first].start;
            let q_end = line.start + hit.start;
            let (heading_level, question) = strip_heading_prefix(&text[q_start..q_end]);
            let question = question.trim();
            if question.is_empty() || is_metadata_question(question) {
                i += 1;
                continue;
            }

            let (answer, id, span_end) = self.answer_block(text, &lines, i + 1);
            out.push(TaggedMatch {
                span: Span::new(q_start, span_end),
                heading_level,
                question: question.to_string(),
                answer,
                reversed: hit.kind == TriggerKind::Reverse,
                tags,
                id,
            });

            min_line = lines.partition_point(|l| l.start < span_end);
            i = min_line.max(i + 1);
        }
        out
    }

    /// All spaced-card matches in document order.
    pub fn spaced_matches(&self, text: &str) -> Vec<SpacedMatch> {
        let lines = lines_of(text);
        let mut out = Vec::new();
        let mut min_line = 0usize;
        let mut i = 0usize;

        while i < lines.len() {
            let line = &lines[i];
            let Some((hit, tags, id, tail_end)) = self.spaced_trigger(line.text) else {
                i += 1;
                continue;
            };

            let first = self.question_start(&lines, i, min_line);
            let q_start = lines[first].start;
            let q_end = line.start + hit.start;
            let (heading_level, prompt) = strip_heading_prefix(&text[q_start..q_end]);
            let prompt = prompt.trim();
            if prompt.is_empty() || is_metadata_question(prompt) {
                i += 1;
                continue;
            }

            let mut id = id;
            let mut span_end = match tail_end {
                // Same-line anchor: the span ends right after it.
                Some(end) => line.start + end,
                // Otherwise the trigger line is consumed, newline included.
                None => line_end_with_newline(text, line),
            };
            if id.is_none() && tail_end.is_none() {
                if let Some(next) = lines.get(i + 1) {
                    if let Some(caps) = self.line_anchor.captures(next.text) {
                        id = caps[1].parse().ok();
                        span_end = next.start + caps.get(0).expect("match").end();
                    }
                }
            }

            out.push(SpacedMatch {
                span: Span::new(q_start, span_end),
                heading_level,
                prompt: prompt.to_string(),
                tags,
                id,
            });

            min_line = lines.partition_point(|l| l.start < span_end);
            i = min_line.max(i + 1);
        }
        out
    }

    /// All inline-card matches, one per line at most.
    pub fn inline_matches(&self, text: &str) -> Vec<InlineMatch> {
        let lines = lines_of(text);
        let mut out = Vec::new();
        let mut i = 0usize;

        while i < lines.len() {
            let line = &lines[i];
            let Some(m) = self.inline_on_line(&lines, i) else {
                i += 1;
                continue;
            };
            let consumed_next = m.span.end > line_end(line);
            out.push(m);
            i += if consumed_next { 2 } else { 1 };
        }
        out
    }

    fn inline_on_line(&self, lines: &[Line<'_>], index: usize) -> Option<InlineMatch> {
        let line = &lines[index];
        let prefix = self
            .inline_prefix
            .captures(line.text)
            .expect("prefix is nullable");
        let heading_level = heading_level_of(prefix.get(1).map_or("", |m| m.as_str()));
        let prefix_end = prefix.get(0).expect("match").end();
        let rest = &line.text[prefix_end..];

        let (sep_start, sep_end, reversed) = self.find_separator(rest)?;
        let question = rest[..sep_start].trim();
        if question.is_empty() || is_metadata_question(question) {
            return None;
        }

        let tail = &rest[sep_end..];
        let mut id = None;
        let mut span_end = line_end(line);

        let middle = if self.inline_id {
            let caps = self.inline_tail_with_id.captures(tail)?;
            if let Some(token) = caps.get(2) {
                id = parse_anchor_token(token.as_str());
            }
            caps.get(1).map_or("", |m| m.as_str())
        } else {
            tail
        };

        let caps = self.inline_tail.captures(middle)?;
        let answer = caps.get(1).map_or("", |m| m.as_str()).trim();
        if answer.is_empty() {
            return None;
        }
        let tags = self.parse_tags(caps.get(2).map_or("", |m| m.as_str()));

        if !self.inline_id && id.is_none() {
            if let Some(next) = lines.get(index + 1) {
                if let Some(caps) = self.line_anchor.captures(next.text) {
                    id = caps[1].parse().ok();
                    span_end = next.start + caps.get(0).expect("match").end();
                }
            }
        }

        Some(InlineMatch {
            span: Span::new(line.start, span_end),
            heading_level,
            question: question.to_string(),
            answer: answer.to_string(),
            reversed,
            tags,
            id,
        })
    }

    /// All cloze matches. `math` carries the document's math spans; a
    /// deletion lying entirely inside one is not a deletion, and a line whose
    /// deletions are all inside math produces no card.
    pub fn cloze_matches(&self, text: &str, math: &[Span]) -> Vec<ClozeMatch> {
        let lines = lines_of(text);
        let mut out = Vec::new();
        let mut i = 0usize;

        while i < lines.len() {
            let line = &lines[i];
            let Some(m) = self.cloze_on_line(&lines, i, math) else {
                i += 1;
                continue;
            };
            let consumed_next = m.span.end > line_end(line);
            out.push(m);
            i += if consumed_next { 2 } else { 1 };
        }
        out
    }

    fn cloze_on_line(
        &self,
        lines: &[Line<'_>],
        index: usize,
        math: &[Span],
    ) -> Option<ClozeMatch> {
        let line = &lines[index];
        let prefix = self
            .inline_prefix
            .captures(line.text)
            .expect("prefix is nullable");
        let heading_level = heading_level_of(prefix.get(1).map_or("", |m| m.as_str()));
        let prefix_end = prefix.get(0).expect("match").end();
        let rest = &line.text[prefix_end..];

        let caps = self.inline_tail.captures(rest)?;
        let middle = caps.get(1).map_or("", |m| m.as_str());
        let middle_offset = line.start + prefix_end + caps.get(1).map_or(0, |m| m.start());
        let tags = self.parse_tags(caps.get(2).map_or("", |m| m.as_str()));

        let deletions = self.deletions_of(middle, middle_offset, math);
        if deletions.is_empty() {
            return None;
        }

        let converted = render_deletions(middle, &deletions);

        let mut id = None;
        let mut span_end = line_end(line);
        if let Some(next) = lines.get(index + 1) {
            if let Some(caps) = self.line_anchor.captures(next.text) {
                id = caps[1].parse().ok();
                span_end = next.start + caps.get(0).expect("match").end();
            }
        }

        Some(ClozeMatch {
            span: Span::new(line.start, span_end),
            heading_level,
            text: converted.trim().to_string(),
            raw: middle.trim().to_string(),
            tags,
            id,
        })
    }

    /// Deletion tokens of one line, math-excluded ones dropped, overlapping
    /// ones resolved leftmost-first.
    fn deletions_of(&self, middle: &str, offset: usize, math: &[Span]) -> Vec<Deletion> {
        let mut tokens: Vec<Deletion> = Vec::new();
        for caps in self.cloze_curly.captures_iter(middle) {
            let whole = caps.get(0).expect("match");
            tokens.push(Deletion {
                start: whole.start(),
                end: whole.end(),
                group: caps.get(1).and_then(|g| g.as_str().parse().ok()),
                content: caps[2].to_string(),
            });
        }
        for caps in self.cloze_highlight.captures_iter(middle) {
            let whole = caps.get(0).expect("match");
            tokens.push(Deletion {
                start: whole.start(),
                end: whole.end(),
                group: None,
                content: caps[1].to_string(),
            });
        }
        tokens.sort_by_key(|t| (t.start, t.end));

        let mut kept: Vec<Deletion> = Vec::new();
        for token in tokens {
            if kept.iter().any(|k| k.end > token.start) {
                continue;
            }
            let absolute = Span::new(offset + token.start, offset + token.end);
            if math.iter().any(|zone| zone.contains(absolute)) {
                continue;
            }
            kept.push(token);
        }
        kept
    }

    fn question_start(&self, lines: &[Line<'_>], trigger: usize, min_line: usize) -> usize {
        let mut first = trigger;
        while first > min_line {
            let prev = &lines[first - 1];
            if prev.text.trim().is_empty() || self.is_trigger_line(prev.text) {
                break;
            }
            first -= 1;
        }
        first
    }

    /// Answer block after a trigger line: leading blank lines are skipped,
    /// then non-blank lines are collected until a blank line, an anchor at
    /// the start of a line, or the end of input.
    fn answer_block(
        &self,
        text: &str,
        lines: &[Line<'_>],
        from: usize,
    ) -> (String, Option<u64>, usize) {
        let mut j = from;
        while j < lines.len() && lines[j].text.is_empty() {
            j += 1;
        }
        let ans_start = lines.get(j).map_or(text.len(), |l| l.start);

        let mut k = j;
        loop {
            let Some(line) = lines.get(k) else {
                let answer = text[ans_start.min(text.len())..].trim().to_string();
                return (answer, None, text.len());
            };
            if line.text.is_empty() {
                let answer = text[ans_start..line.start].trim().to_string();
                return (answer, None, line.start);
            }
            if let Some(caps) = self.line_anchor.captures(line.text) {
                if let Ok(id) = caps[1].parse() {
                    let answer = text[ans_start..line.start].trim().to_string();
                    let span_end = line.start + caps.get(0).expect("match").end();
                    return (answer, Some(id), span_end);
                }
            }
            k += 1;
        }
    }

    /// First valid tagged trigger on a line: the text after it must be a
    /// plain tag list (spaced triggers use [`Self::spaced_trigger`]).
    fn block_trigger(&self, line: &str) -> Option<(TriggerHit, Vec<String>)> {
        for hit in self.trigger_hits(line) {
            if hit.kind == TriggerKind::Spaced {
                continue;
            }
            let tail = &line[hit.end..];
            if self.tag_list.is_match(tail) {
                return Some((hit, self.parse_tags(tail)));
            }
        }
        None
    }

    /// First valid spaced trigger on a line. Returns the tag list, an
    /// optional same-line anchor id, and the line-relative end offset of that
    /// anchor when present.
    fn spaced_trigger(&self, line: &str) -> Option<(TriggerHit, Vec<String>, Option<u64>, Option<usize>)> {
        for hit in self.trigger_hits(line) {
            if hit.kind != TriggerKind::Spaced {
                continue;
            }
            let tail = &line[hit.end..];
            if self.tag_list.is_match(tail) {
                return Some((hit, self.parse_tags(tail), None, None));
            }
            // Tags followed by a same-line anchor.
            if let Some(pos) = tail.find('^') {
                let (tags_part, anchor_part) = tail.split_at(pos);
                if self.tag_list.is_match(tags_part) {
                    if let Some(caps) = self.line_anchor.captures(anchor_part) {
                        let token = caps.get(0).expect("match");
                        if anchor_part[token.end()..].trim().is_empty() {
                            return Some((
                                hit,
                                self.parse_tags(tags_part),
                                caps[1].parse().ok(),
                                Some(hit.end + pos + token.end()),
                            ));
                        }
                    }
                }
            }
        }
        None
    }

    fn is_trigger_line(&self, line: &str) -> bool {
        self.block_trigger(line).is_some() || self.spaced_trigger(line).is_some()
    }

    /// Boundary-checked trigger occurrences on one line.
    fn trigger_hits(&self, line: &str) -> Vec<TriggerHit> {
        self.trigger
            .captures_iter(line)
            .filter_map(|caps| {
                let whole = caps.get(0).expect("match");
                let boundary_ok = line[whole.end()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace);
                if !boundary_ok {
                    return None;
                }
                let kind = match caps.get(1).map(|m| m.as_str().to_ascii_lowercase()) {
                    None => TriggerKind::Plain,
                    Some(s) if s == "reverse" => TriggerKind::Reverse,
                    Some(_) => TriggerKind::Spaced,
                };
                Some(TriggerHit {
                    start: whole.start(),
                    end: whole.end(),
                    kind,
                })
            })
            .collect()
    }

    /// Earliest separator occurrence; at equal positions the longer
    /// configured separator wins, so `:::` is never split as `::` + `:`.
    fn find_separator(&self, s: &str) -> Option<(usize, usize, bool)> {
        let long = s.find(self.sep_long.as_str());
        let short = s.find(self.sep_short.as_str());
        let (pos, sep) = match (long, short) {
            (Some(l), Some(sh)) if l <= sh => (l, &self.sep_long),
            (Some(l), None) => (l, &self.sep_long),
            (_, Some(sh)) => (sh, &self.sep_short),
            (None, None) => return None,
        };
        Some((pos, pos + sep.len(), *sep == self.sep_reverse))
    }

    fn parse_tags(&self, s: &str) -> Vec<String> {
        self.tag_token
            .captures_iter(s)
            .map(|caps| caps[1].to_string())
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Deletion {
    start: usize,
    end: usize,
    group: Option<u32>,
    content: String,
}

/// Rewrite kept deletions to `{{cN::content}}`, numbering explicit groups as
/// written and the rest sequentially.
fn render_deletions(middle: &str, deletions: &[Deletion]) -> String {
    let mut out = String::with_capacity(middle.len() + deletions.len() * 8);
    let mut cursor = 0;
    let mut next = 1u32;
    for deletion in deletions {
        out.push_str(&middle[cursor..deletion.start]);
        let group = match deletion.group {
            Some(n) => {
                next = next.max(n + 1);
                n
            }
            None => {
                let n = next;
                next += 1;
                n
            }
        };
        out.push_str(&format!("{{{{c{group}::{}}}}}", deletion.content));
        cursor = deletion.end;
    }
    out.push_str(&middle[cursor..]);
    out
}

struct Line<'a> {
    start: usize,
    text: &'a str,
}

/// Split into lines keeping byte offsets; `text` excludes the newline.
fn lines_of(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for seg in text.split_inclusive('\n') {
        let stripped = seg.strip_suffix('\n').unwrap_or(seg);
        lines.push(Line {
            start,
            text: stripped,
        });
        start += seg.len();
    }
    lines
}

fn line_end(line: &Line<'_>) -> usize {
    line.start + line.text.len()
}

fn line_end_with_newline(text: &str, line: &Line<'_>) -> usize {
    (line.start + line.text.len() + 1).min(text.len())
}

/// Strip the optional heading prefix of a question block, returning the
/// heading depth when one is present.
fn strip_heading_prefix(question: &str) -> (Option<u8>, &str) {
    let mut rest = question;
    let mut spaces = 0;
    while spaces < 3 && rest.starts_with(' ') {
        rest = &rest[1..];
        spaces += 1;
    }
    let marks = rest.chars().take_while(|&c| c == '#').count();
    if marks == 0 {
        return (None, question);
    }
    (Some(marks.min(u8::MAX as usize) as u8), &rest[marks..])
}

fn heading_level_of(prefix: &str) -> Option<u8> {
    let marks = prefix.trim().len();
    if marks == 0 {
        None
    } else {
        Some(marks as u8)
    }
}

fn is_metadata_question(question: &str) -> bool {
    let lowered = question.to_lowercase();
    METADATA_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

fn parse_anchor_token(token: &str) -> Option<u64> {
    let token = token.strip_prefix("<!--").unwrap_or(token);
    let token = token.strip_suffix("-->").unwrap_or(token);
    token.strip_prefix('^')?.parse().ok()
}
