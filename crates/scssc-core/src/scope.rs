//! Lexically scoped variable bindings.
//!
//! One frame is pushed per rule set or mixin body and popped on exit.
//! Lookup walks innermost-out, so local bindings shadow enclosing ones;
//! within a frame the last write wins. The bottom frame holds globals
//! (top-level `$var` declarations and `globalDefines` from the options).

use std::collections::HashMap;

/// A chain of name -> resolved-value-text frames.
#[derive(Debug)]
pub struct ScopeChain {
    frames: Vec<HashMap<String, String>>,
}

impl ScopeChain {
    pub fn new(globals: HashMap<String, String>) -> Self {
        Self {
            frames: vec![globals],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1, "the global frame is never popped");
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Bind `name` in the innermost frame.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.frames
            .last_mut()
            .expect("scope chain always has a global frame")
            .insert(name.into(), value.into());
    }

    /// Innermost binding for `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).map(String::as_str))
    }
}
