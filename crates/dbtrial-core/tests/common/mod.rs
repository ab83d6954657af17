//! Scriptable mock adapter shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::time::Duration;

use dbtrial_core::{Adapter, AdapterError, CancelHandle, Params, QuerySpec, TimedResult};

/// Adapter call, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Connect,
    ConnectFailed,
    Query,
    Close,
}

/// Mock backend that counts calls and misbehaves on request.
///
/// Call numbers are 1-based and counted across the whole lifetime of the
/// adapter, cold and warm phases included.
pub struct MockAdapter {
    pub elapsed_ms: f64,
    pub events: Vec<Event>,
    pub open: bool,
    pub query_while_closed: bool,
    connect_calls: usize,
    query_calls: usize,
    fail_connect_on: HashSet<usize>,
    malformed_on: HashSet<usize>,
    error_on: HashSet<usize>,
    panic_on: HashSet<usize>,
    query_delay: Option<Duration>,
    cancel_after_query: Option<(usize, CancelHandle)>,
}

impl MockAdapter {
    pub fn new(elapsed_ms: f64) -> Self {
        Self {
            elapsed_ms,
            events: Vec::new(),
            open: false,
            query_while_closed: false,
            connect_calls: 0,
            query_calls: 0,
            fail_connect_on: HashSet::new(),
            malformed_on: HashSet::new(),
            error_on: HashSet::new(),
            panic_on: HashSet::new(),
            query_delay: None,
            cancel_after_query: None,
        }
    }

    pub fn fail_connect_on(mut self, calls: &[usize]) -> Self {
        self.fail_connect_on.extend(calls);
        self
    }

    pub fn malformed_on(mut self, calls: &[usize]) -> Self {
        self.malformed_on.extend(calls);
        self
    }

    pub fn error_on(mut self, calls: &[usize]) -> Self {
        self.error_on.extend(calls);
        self
    }

    pub fn panic_on(mut self, calls: &[usize]) -> Self {
        self.panic_on.extend(calls);
        self
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn cancel_after_query(mut self, call: usize, handle: CancelHandle) -> Self {
        self.cancel_after_query = Some((call, handle));
        self
    }

    pub fn count(&self, event: Event) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }
}

impl Adapter for MockAdapter {
    async fn connect(&mut self) -> Result<(), AdapterError> {
        self.connect_calls += 1;
        if self.fail_connect_on.contains(&self.connect_calls) {
            self.events.push(Event::ConnectFailed);
            return Err(AdapterError::Connection("connection refused".to_string()));
        }
        self.events.push(Event::Connect);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.events.push(Event::Close);
        self.open = false;
    }

    async fn run_query(
        &mut self,
        _query: &QuerySpec,
        _params: Option<&Params>,
    ) -> Result<TimedResult, AdapterError> {
        self.query_calls += 1;
        self.events.push(Event::Query);
        if !self.open {
            self.query_while_closed = true;
        }

        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((call, handle)) = &self.cancel_after_query {
            if *call == self.query_calls {
                handle.cancel();
            }
        }

        let call = self.query_calls;
        if self.panic_on.contains(&call) {
            panic!("mock driver panic on call {}", call);
        }
        if self.error_on.contains(&call) {
            return Err(AdapterError::Query("mock query error".to_string()));
        }
        if self.malformed_on.contains(&call) {
            return Ok(TimedResult::missing_timing());
        }
        Ok(TimedResult::new(self.elapsed_ms, 1))
    }
}
