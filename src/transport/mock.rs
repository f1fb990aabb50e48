//! Scripted in-memory transport for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use super::{Connector, Transport};
use crate::errors::Error;
use crate::session::SessionRecord;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Verb {
    Get,
    Put,
    Post,
    Delete,
    CreateUser,
    Description,
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json(Value),
    Text(String),
    Fail(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Request {
    pub verb: Verb,
    pub path: String,
    pub body: Option<Value>,
}

/// Replays queued replies per route; the last reply of a route repeats.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<(Verb, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, verb: Verb, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((verb, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn json(&self, verb: Verb, path: &str, value: Value) -> &Self {
        self.reply(verb, path, Reply::Json(value))
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, verb: Verb, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.verb == verb && r.path == path)
            .count()
    }

    pub fn bodies(&self, verb: Verb, path: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.verb == verb && r.path == path)
            .filter_map(|r| r.body.clone())
            .collect()
    }

    fn next(&self, verb: Verb, path: &str, body: Option<Value>) -> Result<Reply> {
        self.requests.lock().unwrap().push(Request {
            verb,
            path: path.to_string(),
            body,
        });

        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .get_mut(&(verb, path.to_string()))
            .ok_or_else(|| Error::UnexpectedResponse(format!("no route for {verb:?} {path}")))?;
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match reply {
            Some(Reply::Fail(reason)) => Err(Error::UnexpectedResponse(reason)),
            Some(reply) => Ok(reply),
            None => Err(Error::UnexpectedResponse(format!("empty route {path}"))),
        }
    }

    fn next_json(&self, verb: Verb, path: &str, body: Option<Value>) -> Result<Value> {
        match self.next(verb, path, body)? {
            Reply::Json(value) => Ok(value),
            other => Err(Error::UnexpectedResponse(format!("{other:?}"))),
        }
    }
}

impl Transport for MockTransport {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>> {
        async move { self.next_json(Verb::Get, path, None) }.boxed()
    }

    fn put<'a>(&'a self, path: &'a str, body: Value) -> BoxFuture<'a, Result<Value>> {
        async move { self.next_json(Verb::Put, path, Some(body)) }.boxed()
    }

    fn post<'a>(&'a self, path: &'a str, body: Value) -> BoxFuture<'a, Result<Value>> {
        async move { self.next_json(Verb::Post, path, Some(body)) }.boxed()
    }

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>> {
        async move { self.next_json(Verb::Delete, path, None) }.boxed()
    }

    fn create_user<'a>(&'a self, device_type: &'a str) -> BoxFuture<'a, Result<Value>> {
        let body = serde_json::json!({ "devicetype": device_type });
        async move { self.next_json(Verb::CreateUser, "", Some(body)) }.boxed()
    }

    fn description<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            match self.next(Verb::Description, path, None)? {
                Reply::Text(text) => Ok(text),
                other => Err(Error::UnexpectedResponse(format!("{other:?}"))),
            }
        }
        .boxed()
    }
}

/// Hands out one [`MockTransport`] per bridge address.
#[derive(Default)]
pub(crate) struct MockConnector {
    bridges: Mutex<HashMap<String, Arc<MockTransport>>>,
    connects: Mutex<Vec<SessionRecord>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bridge(&self, address: &str) -> Arc<MockTransport> {
        Arc::clone(
            self.bridges
                .lock()
                .unwrap()
                .entry(address.to_string())
                .or_insert_with(|| Arc::new(MockTransport::new())),
        )
    }

    pub fn connects(&self) -> Vec<SessionRecord> {
        self.connects.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    fn connect(&self, record: &SessionRecord) -> Result<Arc<dyn Transport>> {
        self.connects.lock().unwrap().push(record.clone());
        let transport: Arc<dyn Transport> = self.bridge(record.address());
        Ok(transport)
    }
}
