//! Segment selection.

use mveed_models::UploadSession;

/// Ordered set of selected segment ids.
///
/// Insertion order is kept so the compile request lists segments in the
/// order the user picked them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentSelector {
    selected: Vec<String>,
}

impl SegmentSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select every segment of `session`, replacing the previous selection.
    pub fn select_all(&mut self, session: &UploadSession) {
        self.selected.clear();
        for id in session.segment_ids() {
            if !self.selected.contains(&id) {
                self.selected.push(id);
            }
        }
    }

    /// Flip membership of `segment_id`. Returns whether it is now selected.
    pub fn toggle(&mut self, segment_id: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|id| id == segment_id) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(segment_id.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, segment_id: &str) -> bool {
        self.selected.iter().any(|id| id == segment_id)
    }

    pub fn ids(&self) -> &[String] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// A reel can be compiled once there is a session and at least one pick.
    pub fn can_compile(&self, session_id: Option<&str>) -> bool {
        !self.selected.is_empty() && session_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mveed_models::{Segment, SessionStatus};

    fn session(ids: &[&str]) -> UploadSession {
        UploadSession {
            session_id: "abc".into(),
            segments: ids
                .iter()
                .enumerate()
                .map(|(i, id)| Segment::new(*id, i as f64, i as f64 + 1.0))
                .collect(),
            status: SessionStatus::Ready,
        }
    }

    #[test]
    fn test_select_all() {
        let mut sel = SegmentSelector::new();
        sel.select_all(&session(&["s1", "s2", "s3"]));
        assert_eq!(sel.ids(), ["s1", "s2", "s3"]);
        assert!(sel.can_compile(Some("abc")));
    }

    #[test]
    fn test_double_toggle_restores() {
        let mut sel = SegmentSelector::new();
        sel.select_all(&session(&["s1", "s2"]));
        let before = sel.clone();

        assert!(!sel.toggle("s1"));
        assert!(!sel.contains("s1"));
        assert!(sel.toggle("s1"));
        assert!(sel.contains("s1"));

        let mut a: Vec<_> = before.ids().to_vec();
        let mut b: Vec<_> = sel.ids().to_vec();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_toggle_unknown_id_adds_it() {
        let mut sel = SegmentSelector::new();
        assert!(sel.toggle("x"));
        assert_eq!(sel.len(), 1);
        assert!(!sel.toggle("x"));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_can_compile_requires_both() {
        let mut sel = SegmentSelector::new();
        assert!(!sel.can_compile(Some("abc")));
        sel.toggle("s1");
        assert!(!sel.can_compile(None));
        assert!(sel.can_compile(Some("abc")));
    }
}
