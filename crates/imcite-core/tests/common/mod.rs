#![allow(dead_code)]

//! Shared fixtures: a scripted connector and record builders

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{json, Value};

use imcite_core::{Ambiguity, Connector, HttpError, Record, ResolveError};

/// Build a minimal normalized record.
pub fn record(id: &str, title: &str) -> Record {
    let Value::Object(object) = json!({ "id": id, "type": "book", "title": title }) else {
        unreachable!()
    };
    Record::from_object(object).unwrap()
}

enum Scripted {
    Hit(Record),
    Ambiguous,
    Down,
}

/// Connector that serves from a fixed script and logs every key it is asked
/// to resolve. Keys without a script entry are not found.
pub struct MockConnector {
    script: HashMap<String, Scripted>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_record(mut self, key: &str, title: &str) -> Self {
        self.script
            .insert(key.to_string(), Scripted::Hit(record(key, title)));
        self
    }

    pub fn with_ambiguous(mut self, key: &str) -> Self {
        self.script.insert(key.to_string(), Scripted::Ambiguous);
        self
    }

    pub fn with_connection_failure(mut self, key: &str) -> Self {
        self.script.insert(key.to_string(), Scripted::Down);
        self
    }

    /// Handle onto the call log; stays readable after the connector is
    /// boxed.
    pub fn call_log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.calls)
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MockConnector {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn resolve(&mut self, key: &str) -> Result<Record, ResolveError> {
        self.calls.borrow_mut().push(key.to_string());
        match self.script.get(key) {
            Some(Scripted::Hit(record)) => Ok(record.clone()),
            Some(Scripted::Ambiguous) => Err(ResolveError::Ambiguous {
                key: key.to_string(),
                ambiguity: Ambiguity::NoMatchingItems,
            }),
            Some(Scripted::Down) => Err(ResolveError::Connection(HttpError::Timeout)),
            None => Err(ResolveError::NotFound {
                key: key.to_string(),
                detail: "not in fixture set".to_string(),
            }),
        }
    }
}
