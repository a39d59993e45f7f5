// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot input holder

/// Holds at most one input of a kind.
///
/// Attaching into an occupied slot hands the input back instead of silently
/// replacing what is there; swapping devices goes through
/// [`detach`](Self::detach) + [`attach`](Self::attach) so the caller decides
/// what happens to the old input.
#[derive(Debug)]
pub struct InputSlot<T> {
    current: Option<T>,
}

impl<T> InputSlot<T> {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.current.as_mut()
    }

    /// Attach `input` if the slot is empty, otherwise give it back
    pub fn attach(&mut self, input: T) -> Result<(), T> {
        if self.current.is_some() {
            return Err(input);
        }
        self.current = Some(input);
        Ok(())
    }

    pub fn detach(&mut self) -> Option<T> {
        self.current.take()
    }
}

impl<T> Default for InputSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
