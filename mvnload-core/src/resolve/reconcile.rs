use super::types::Frame;
use crate::dependency::Dependency;

/// Versions already selected in this run for `group_id`, in the order they
/// are tried.
///
/// Frames are scanned innermost first; within a frame the subtree results
/// come before the leaves, which come before the walked list. Local entries
/// never pin a version.
pub(crate) fn candidate_versions(frames: &[Frame], group_id: &str) -> Vec<String> {
    frames
        .iter()
        .rev()
        .flat_map(|frame| frame.views())
        .flat_map(|view| view.iter())
        .filter_map(Dependency::coordinate)
        .filter(|coordinate| coordinate.group_id == group_id)
        .map(|coordinate| coordinate.version.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Coordinate;

    fn remote(g: &str, a: &str, v: &str) -> Dependency {
        Dependency::remote(Coordinate::new(g, a, v))
    }

    #[test]
    fn scans_innermost_frame_first() {
        let outer = Frame::new(vec![remote("org.x", "a", "1.0")], None);
        let mut inner = Frame::new(vec![remote("org.x", "b", "3.0")], None);
        inner.leaves.push(remote("org.x", "c", "2.0"));
        inner.subtree.push(remote("org.x", "d", "4.0"));

        assert_eq!(
            candidate_versions(&[outer, inner], "org.x"),
            vec!["4.0", "2.0", "3.0", "1.0"]
        );
    }

    #[test]
    fn ignores_local_and_foreign_entries() {
        let mut frame = Frame::new(vec![remote("org.y", "a", "1.0")], None);
        frame.leaves.push(Dependency::local("/tmp/lib.so"));

        assert!(candidate_versions(&[frame], "org.x").is_empty());
    }
}
