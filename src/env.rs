//! The environment: a chain of frames from the innermost scope out to the
//! module top.
//!
//! Bindings live in an insertion-ordered map, so a binding's map index *is*
//! its slot. Redefining a name overwrites the value in place and keeps the
//! slot, which is exactly the bookkeeping the resolver does on its side —
//! the two stay aligned by construction.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

#[derive(Debug)]
pub struct Frame {
  parent: Option<Rc<Frame>>,
  slots: RefCell<IndexMap<String, Value>>,
}

impl Frame {
  /// A frame with no parent: a module's top frame.
  pub fn top() -> Rc<Frame> {
    Rc::new(Frame {
      parent: None,
      slots: RefCell::new(IndexMap::new()),
    })
  }

  pub fn child(parent: &Rc<Frame>) -> Rc<Frame> {
    Rc::new(Frame {
      parent: Some(parent.clone()),
      slots: RefCell::new(IndexMap::new()),
    })
  }

  /// Binds `name` in this frame. A fresh name appends a slot; a known name
  /// keeps its slot and overwrites the value.
  pub fn define(&self, name: &str, value: Value) {
    self.slots.borrow_mut().insert(name.to_string(), value);
  }

  fn ancestor(&self, depth: usize) -> Option<&Frame> {
    let mut frame = self;
    for _ in 0..depth {
      frame = frame.parent.as_deref()?;
    }
    Some(frame)
  }

  pub fn get_at(&self, depth: usize, slot: usize) -> Option<Value> {
    let frame = self.ancestor(depth)?;
    let slots = frame.slots.borrow();
    slots.get_index(slot).map(|(_, v)| v.clone())
  }

  pub fn assign_at(&self, depth: usize, slot: usize, value: Value) -> bool {
    let Some(frame) = self.ancestor(depth) else {
      return false;
    };
    let mut slots = frame.slots.borrow_mut();
    match slots.get_index_mut(slot) {
      Some((_, v)) => {
        *v = value;
        true
      }
      None => false,
    }
  }

  /// By-name lookup in this frame only. Module top frames are the only
  /// place the evaluator needs this: reads the resolver could not resolve
  /// may still late-bind to a module-level definition.
  pub fn get_by_name(&self, name: &str) -> Option<Value> {
    self.slots.borrow().get(name).cloned()
  }

  /// The root of this frame's chain.
  pub fn module_top(self: &Rc<Frame>) -> Rc<Frame> {
    let mut frame = self.clone();
    while let Some(parent) = frame.parent.clone() {
      frame = parent;
    }
    frame
  }

  /// Snapshot of the bindings, in slot order.
  pub fn entries(&self) -> Vec<(String, Value)> {
    self
      .slots
      .borrow()
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }

  pub fn len(&self) -> usize {
    self.slots.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
