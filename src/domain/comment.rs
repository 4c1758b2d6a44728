use std::ops::Deref;

use super::Item;

/// A node in a comment tree. Children are owned, so the tree cannot cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub item: Item,
    pub depth: usize,
    pub children: Vec<Comment>,
}

impl Comment {
    pub fn new(item: Item, depth: usize) -> Self {
        Self {
            item,
            depth,
            children: Vec::new(),
        }
    }

    /// Number of comments in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Comment::count).sum::<usize>()
    }

    /// Deepest depth found in this subtree.
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(Comment::max_depth)
            .max()
            .unwrap_or(self.depth)
            .max(self.depth)
    }
}

impl Deref for Comment {
    type Target = Item;

    fn deref(&self) -> &Item {
        &self.item
    }
}

/// Whether a node at `depth` is kept under `max_depth` (0 = unlimited).
pub fn within_depth(depth: usize, max_depth: usize) -> bool {
    max_depth == 0 || depth <= max_depth
}

/// Whether the children of a node at `depth` should be expanded.
pub fn should_expand(depth: usize, max_depth: usize) -> bool {
    max_depth == 0 || depth < max_depth
}

/// Pre-order traversal of a forest.
pub fn flatten(roots: &[Comment]) -> Vec<&Comment> {
    fn walk<'a>(nodes: &'a [Comment], out: &mut Vec<&'a Comment>) {
        for node in nodes {
            out.push(node);
            walk(&node.children, out);
        }
    }

    let mut out = Vec::new();
    walk(roots, &mut out);
    out
}

/// Build a forest from comments listed in page order with their depth.
///
/// Each comment becomes a child of the nearest preceding comment with a
/// smaller depth. Comments deeper than `max_depth` are dropped.
pub fn assemble(flat: Vec<Comment>, max_depth: usize) -> Vec<Comment> {
    let mut roots = Vec::new();
    let mut open: Vec<Comment> = Vec::new();

    for comment in flat {
        if !within_depth(comment.depth, max_depth) {
            continue;
        }
        while open
            .last()
            .is_some_and(|top| top.depth >= comment.depth)
        {
            close_top(&mut open, &mut roots);
        }
        open.push(comment);
    }
    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }

    roots
}

fn close_top(open: &mut Vec<Comment>, roots: &mut Vec<Comment>) {
    if let Some(done) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(author: &str, depth: usize) -> Comment {
        Comment::new(
            Item {
                by: author.to_string(),
                ..Default::default()
            },
            depth,
        )
    }

    fn authors(nodes: &[Comment]) -> Vec<&str> {
        nodes.iter().map(|c| c.by.as_str()).collect()
    }

    #[test]
    fn test_assemble_nests_by_depth() {
        let tree = assemble(
            vec![
                flat("a", 0),
                flat("a1", 1),
                flat("a1x", 2),
                flat("a2", 1),
                flat("b", 0),
            ],
            0,
        );

        assert_eq!(authors(&tree), vec!["a", "b"]);
        assert_eq!(authors(&tree[0].children), vec!["a1", "a2"]);
        assert_eq!(authors(&tree[0].children[0].children), vec!["a1x"]);
        assert!(tree[1].children.is_empty());
        assert_eq!(tree.iter().map(Comment::count).sum::<usize>(), 5);
    }

    #[test]
    fn test_assemble_respects_max_depth() {
        let chain: Vec<Comment> = (0..6).map(|d| flat(&format!("c{}", d), d)).collect();
        let tree = assemble(chain, 2);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].max_depth(), 2);
        assert_eq!(tree[0].count(), 3);
    }

    #[test]
    fn test_assemble_orphan_becomes_root() {
        let tree = assemble(vec![flat("late", 2), flat("top", 0)], 0);
        assert_eq!(authors(&tree), vec!["late", "top"]);
    }

    #[test]
    fn test_flatten_is_pre_order() {
        let tree = assemble(
            vec![flat("a", 0), flat("a1", 1), flat("b", 0), flat("b1", 1)],
            0,
        );
        let order: Vec<&str> = flatten(&tree).iter().map(|c| c.by.as_str()).collect();
        assert_eq!(order, vec!["a", "a1", "b", "b1"]);
    }

    #[test]
    fn test_depth_rules() {
        assert!(within_depth(9, 0));
        assert!(within_depth(2, 2));
        assert!(!within_depth(3, 2));
        assert!(should_expand(1, 2));
        assert!(!should_expand(2, 2));
        assert!(should_expand(40, 0));
    }
}
