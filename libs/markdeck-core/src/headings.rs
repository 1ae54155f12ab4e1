//! Heading outline and ancestor-chain resolution.

/// A heading line of the document outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingNode {
    /// Heading depth, 1 through 6.
    pub level: u8,
    /// Heading text without the `#` markers and without trailing tags.
    pub text: String,
    /// Byte offset of the heading line start in the document.
    pub position: usize,
}

/// Compute the ancestor-heading chain for a card starting at `position`.
///
/// `own_level` is the heading depth of the card itself when the card sits on
/// a heading line, or `None` when it sits in a paragraph. Headings must be
/// ordered by strictly increasing position.
///
/// The chain is returned in ancestor-to-descendant order: walking backward
/// from the heading immediately preceding `position`, one heading is taken
/// per decreasing level until level 1 is collected or the outline is
/// exhausted.
pub fn resolve_context(
    headings: &[HeadingNode],
    position: usize,
    own_level: Option<u8>,
) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    let mut current_pos = position;
    let mut goal: i32 = 6;

    let mut i = headings.len() as i64 - 1;
    match own_level {
        Some(level) => {
            // The card is a heading itself: its parent is one level up.
            goal = i32::from(level) - 1;
        }
        None => {
            // Find the nearest heading above the card and start from there.
            while i >= 0 {
                let h = &headings[i as usize];
                if h.position < current_pos {
                    current_pos = h.position;
                    goal = i32::from(h.level) - 1;
                    chain.push(h.text.clone());
                    break;
                }
                i -= 1;
            }
        }
    }

    while i >= 0 {
        let h = &headings[i as usize];
        if i32::from(h.level) == goal && h.position < current_pos {
            current_pos = h.position;
            goal = i32::from(h.level) - 1;
            chain.push(h.text.clone());
        }
        i -= 1;
    }

    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(nodes: &[(u8, &str, usize)]) -> Vec<HeadingNode> {
        nodes
            .iter()
            .map(|&(level, text, position)| HeadingNode {
                level,
                text: text.to_string(),
                position,
            })
            .collect()
    }

    #[test]
    fn paragraph_card_collects_full_chain() {
        let headings = outline(&[(1, "Biology", 0), (2, "Cells", 20), (3, "Mitosis", 40)]);
        let chain = resolve_context(&headings, 60, None);
        assert_eq!(chain, vec!["Biology", "Cells", "Mitosis"]);
    }

    #[test]
    fn heading_card_skips_its_own_level() {
        let headings = outline(&[(1, "Biology", 0), (2, "Cells", 20), (3, "Mitosis", 40)]);
        // A card on the level-3 heading line starts the walk at level 2.
        let chain = resolve_context(&headings, 39, Some(3));
        assert_eq!(chain, vec!["Biology", "Cells"]);
    }

    #[test]
    fn sibling_headings_are_not_collected_twice() {
        let headings = outline(&[
            (1, "Root", 0),
            (2, "First", 10),
            (2, "Second", 30),
            (3, "Leaf", 50),
        ]);
        let chain = resolve_context(&headings, 70, None);
        assert_eq!(chain, vec!["Root", "Second", "Leaf"]);
    }

    #[test]
    fn no_preceding_heading_yields_empty_chain() {
        let headings = outline(&[(2, "Later", 100)]);
        assert_eq!(resolve_context(&headings, 10, None), Vec::<String>::new());
    }

    #[test]
    fn gap_in_levels_stops_the_walk() {
        // A level-4 heading under a level-1: after collecting the level-4
        // the walk looks for an exact level-3 ancestor and finds none, so the
        // level-1 is never reached.
        let headings = outline(&[(1, "Top", 0), (4, "Deep", 20)]);
        let chain = resolve_context(&headings, 40, None);
        assert_eq!(chain, vec!["Deep"]);
    }
}
