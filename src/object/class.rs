use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::object::function::UserFunc;
use crate::value::Value;

/// A user-defined class.
///
/// Classes are themselves instances of a synthesized metaclass (named
/// `__<Name>__`) which carries the static methods; the metaclass of a
/// subclass inherits from the metaclasses of its superclasses, so static
/// methods dispatch along the same graph as instance methods.
#[derive(Debug)]
pub struct Class {
  pub name: String,
  pub supers: Vec<Rc<Class>>,
  pub methods: RefCell<IndexMap<String, Rc<UserFunc>>>,
  pub metaclass: Option<Rc<Class>>,
}

impl Class {
  /// Finds `name` on this class or, depth-first left-to-right, on its
  /// superclasses. First match wins.
  pub fn find_method(&self, name: &str) -> Option<Rc<UserFunc>> {
    if let Some(method) = self.methods.borrow().get(name) {
      return Some(method.clone());
    }
    self.find_super_method(name)
  }

  /// Like [`find_method`][Self::find_method], but starts at the
  /// superclasses. This is `haha.name` lookup.
  pub fn find_super_method(&self, name: &str) -> Option<Rc<UserFunc>> {
    self.supers.iter().find_map(|s| s.find_method(name))
  }
}

/// An instance: a class pointer plus a mutable field table. Field reads
/// fall through to the class's methods when no field matches.
#[derive(Debug)]
pub struct Instance {
  pub class: Rc<Class>,
  pub fields: RefCell<IndexMap<String, Value>>,
}

impl Instance {
  pub fn new(class: &Rc<Class>) -> Self {
    Self {
      class: class.clone(),
      fields: RefCell::new(IndexMap::new()),
    }
  }
}
