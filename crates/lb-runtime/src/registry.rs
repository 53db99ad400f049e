use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use lb_core::{ArgValue, CallbackKey, LuaBridgeError};

/// A host function callable from scripts.
///
/// Receives the trailing call arguments in order and returns one integer to
/// the script. Closures with a matching signature implement it.
pub trait HostFunction {
    fn call(&self, args: &[ArgValue]) -> Result<i32, LuaBridgeError>;
}

impl<F> HostFunction for F
where
    F: Fn(&[ArgValue]) -> Result<i32, LuaBridgeError>,
{
    fn call(&self, args: &[ArgValue]) -> Result<i32, LuaBridgeError> {
        self(args)
    }
}

/// Flat map from `namespace:name` to host function.
///
/// Registering an existing key replaces its handle.
#[derive(Default)]
pub struct CallbackRegistry {
    functions: BTreeMap<CallbackKey, Rc<dyn HostFunction>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when an earlier handle was replaced.
    pub fn register(&mut self, key: CallbackKey, handle: Rc<dyn HostFunction>) -> bool {
        self.functions.insert(key, handle).is_some()
    }

    pub fn resolve(&self, namespace: &str, name: &str) -> Option<Rc<dyn HostFunction>> {
        self.functions
            .get(&CallbackKey::new(namespace, name))
            .map(Rc::clone)
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.functions
            .contains_key(&CallbackKey::new(namespace, name))
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.keys()
            .map(|key| key.namespace.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CallbackKey> {
        self.functions.keys()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.keys().map(ToString::to_string))
            .finish()
    }
}
