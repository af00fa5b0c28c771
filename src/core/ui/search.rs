use super::snapshot::{UiNodeData, UiTree};
use std::collections::VecDeque;

/// Breadth-first search for a node whose text or description contains one
/// of `keywords` (case-insensitive). A match resolves to its nearest
/// clickable ancestor, the node itself included; a match with no clickable
/// ancestor does not end the search.
pub fn find_clickable(tree: &UiTree, keywords: &[&str]) -> Option<usize> {
    let mut queue = VecDeque::from([tree.root()]);

    while let Some(id) = queue.pop_front() {
        if matches_keywords(tree.node(id), keywords)
            && let Some(clickable) = nearest_clickable(tree, id)
        {
            return Some(clickable);
        }
        queue.extend(tree.node(id).children.iter().copied());
    }
    None
}

fn matches_keywords(node: &UiNodeData, keywords: &[&str]) -> bool {
    keywords
        .iter()
        .any(|k| contains_ignore_case(&node.text, k) || contains_ignore_case(&node.desc, k))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn nearest_clickable(tree: &UiTree, mut id: usize) -> Option<usize> {
    loop {
        if tree.node(id).clickable {
            return Some(id);
        }
        id = tree.node(id).parent?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(text: &str, desc: &str, clickable: bool) -> UiNodeData {
        UiNodeData {
            text: text.into(),
            desc: desc.into(),
            clickable,
            ..Default::default()
        }
    }

    #[test]
    fn match_resolves_to_clickable_ancestor() {
        let mut tree = UiTree::new();
        let frame = tree.push(tree.root(), node("", "", false));
        let controls = tree.push(frame, node("", "", true));
        let icon = tree.push(controls, node("", "Pause", false));
        let _ = icon;

        assert_eq!(find_clickable(&tree, &["pause", "play"]), Some(controls));
    }

    #[test]
    fn clickable_match_returns_itself() {
        let mut tree = UiTree::new();
        let btn = tree.push(tree.root(), node("Play", "", true));

        assert_eq!(find_clickable(&tree, &["play"]), Some(btn));
    }

    #[test]
    fn no_match_visits_everything_and_misses() {
        let mut tree = UiTree::new();
        let a = tree.push(tree.root(), node("Guide", "", true));
        let b = tree.push(a, node("Recordings", "", true));
        tree.push(b, node("", "Search", true));

        assert_eq!(find_clickable(&tree, &["pause", "play"]), None);
    }

    #[test]
    fn unclickable_match_does_not_stop_the_search() {
        let mut tree = UiTree::new();
        // first match in BFS order has no clickable ancestor
        tree.push(tree.root(), node("Paused", "", false));
        let deeper = tree.push(tree.root(), node("", "", false));
        let real = tree.push(deeper, node("", "", true));
        tree.push(real, node("Pause", "", false));

        assert_eq!(find_clickable(&tree, &["pause"]), Some(real));
    }

    #[test]
    fn breadth_first_prefers_the_shallower_match() {
        let mut tree = UiTree::new();
        let shallow = tree.push(tree.root(), node("Play", "", true));
        let wrapper = tree.push(tree.root(), node("", "", true));
        tree.push(wrapper, node("Play along", "", true));

        assert_eq!(find_clickable(&tree, &["play"]), Some(shallow));
    }

    #[test]
    fn empty_tree_is_a_miss() {
        let tree = UiTree::new();
        assert_eq!(find_clickable(&tree, &["pause"]), None);
    }
}
