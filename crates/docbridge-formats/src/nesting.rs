//! Re-nesting of flat level-tagged sequences into trees

/// Rebuild a tree from items tagged with a nesting level
///
/// An item with `Some(level)` becomes a child of the nearest preceding item whose level
/// is lower. `None` items are barriers: they close every open item and never take
/// children themselves.
pub(crate) fn nest<T>(
    items: impl IntoIterator<Item = (Option<u32>, T)>,
    mut attach: impl FnMut(&mut T, T),
) -> Vec<T> {
    let mut roots = Vec::new();
    let mut open: Vec<(u32, T)> = Vec::new();

    for (level, node) in items {
        match level {
            Some(level) => {
                while open.last().is_some_and(|(open_level, _)| *open_level >= level) {
                    close_one(&mut open, &mut roots, &mut attach);
                }
                open.push((level, node));
            }
            None => {
                while !open.is_empty() {
                    close_one(&mut open, &mut roots, &mut attach);
                }
                roots.push(node);
            }
        }
    }

    while !open.is_empty() {
        close_one(&mut open, &mut roots, &mut attach);
    }
    roots
}

fn close_one<T>(open: &mut Vec<(u32, T)>, roots: &mut Vec<T>, attach: &mut impl FnMut(&mut T, T)) {
    if let Some((_, node)) = open.pop() {
        match open.last_mut() {
            Some((_, parent)) => attach(parent, node),
            None => roots.push(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Node(&'static str, Vec<Node>);

    fn leaf(name: &'static str) -> Node {
        Node(name, Vec::new())
    }

    fn build(items: Vec<(Option<u32>, &'static str)>) -> Vec<Node> {
        nest(
            items.into_iter().map(|(level, name)| (level, leaf(name))),
            |parent, child| parent.1.push(child),
        )
    }

    #[test]
    fn test_nest_list_levels() {
        let tree = build(vec![
            (Some(1), "a"),
            (Some(2), "a.1"),
            (Some(3), "a.1.i"),
            (Some(2), "a.2"),
            (Some(1), "b"),
        ]);

        assert_eq!(
            tree,
            vec![
                Node(
                    "a",
                    vec![Node("a.1", vec![leaf("a.1.i")]), leaf("a.2")]
                ),
                leaf("b"),
            ]
        );
    }

    #[test]
    fn test_barriers_close_open_items() {
        let tree = build(vec![(Some(1), "a"), (None, "p"), (Some(2), "orphan")]);
        assert_eq!(tree, vec![leaf("a"), leaf("p"), leaf("orphan")]);
    }

    #[test]
    fn test_level_zero_items_take_children() {
        let tree = build(vec![(Some(0), "heading"), (Some(1), "child"), (Some(0), "next")]);
        assert_eq!(
            tree,
            vec![Node("heading", vec![leaf("child")]), leaf("next")]
        );
    }
}
