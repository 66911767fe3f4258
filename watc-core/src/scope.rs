use std::collections::HashMap;

use crate::hir::Slot;

/// Stack of name-to-slot frames. Lookups search innermost first.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, Slot>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Bind `name` in the innermost frame, returning the slot it replaced
    /// in that same frame, if any.
    ///
    /// # Panics
    ///
    /// Panics if no frame has been pushed.
    pub fn bind(&mut self, name: &str, slot: Slot) -> Option<Slot> {
        self.frames
            .last_mut()
            .expect("bind called without an open scope")
            .insert(name.to_string(), slot)
    }

    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let mut scope = ScopeStack::new();
        scope.push();
        scope.bind("a", 0);
        scope.bind("b", 1);

        scope.push();
        scope.bind("a", 2);
        assert_eq!(scope.lookup("a"), Some(2));
        assert_eq!(scope.lookup("b"), Some(1));
        scope.pop();

        assert_eq!(scope.lookup("a"), Some(0));
        assert_eq!(scope.lookup("c"), None);
    }

    #[test]
    fn rebinding_in_same_frame_reports_previous_slot() {
        let mut scope = ScopeStack::new();
        scope.push();
        assert_eq!(scope.bind("x", 0), None);
        assert_eq!(scope.bind("x", 3), Some(0));
        assert_eq!(scope.lookup("x"), Some(3));
    }

    #[test]
    fn popping_everything_forgets_bindings() {
        let mut scope = ScopeStack::new();
        scope.push();
        scope.bind("x", 0);
        scope.pop();
        assert_eq!(scope.depth(), 0);
        assert_eq!(scope.lookup("x"), None);
    }
}
