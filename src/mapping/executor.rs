use super::content::CoercionContext;
use super::error::{MappingError, MappingResult};
use super::path::FieldPath;
use super::setter::Setter;
use super::shape::{Request, lookup};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::debug;

/// Applies a list of setters to a request and invokes one remote call with it
#[derive(Debug, Clone)]
pub struct CallExecutor {
    name: String,
    setters: Vec<Setter>,
}

impl CallExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setters: Vec::new(),
        }
    }

    pub fn with_setters(mut self, setters: Vec<Setter>) -> Self {
        self.setters.extend(setters);
        self
    }

    pub fn setter(mut self, setter: Setter) -> Self {
        self.setters.push(setter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply every setter in order, stopping at the first failure
    pub fn prepare(&self, request: &mut Request, ctx: &mut CoercionContext) -> MappingResult<()> {
        for setter in &self.setters {
            setter.apply(request, ctx)?;
        }
        Ok(())
    }

    /// Build the typed request and invoke `call` with it.
    ///
    /// Provider errors are flattened to their message and prefixed with the
    /// call name. Callers that branch on typed provider errors should build
    /// the request with [`CallExecutor::prepare`] and call the API directly.
    pub fn execute<Req, Resp, E, F>(
        &self,
        mut request: Request,
        ctx: &mut CoercionContext,
        call: F,
    ) -> MappingResult<Resp>
    where
        Req: DeserializeOwned,
        E: fmt::Display,
        F: FnOnce(Req) -> Result<Resp, E>,
    {
        self.prepare(&mut request, ctx)?;
        let input: Req = request.build()?;

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || call(input)));
        debug!(
            call = %self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "remote call finished"
        );

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(MappingError::RemoteCall {
                call: self.name.clone(),
                message: e.to_string(),
            }),
            Err(payload) => Err(MappingError::Panic {
                call: self.name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Pull a stable identifier out of a response
pub fn extract_id<T: Serialize>(response: &T, path: &FieldPath) -> MappingResult<String> {
    let extraction = |message: &str| MappingError::Extraction {
        path: path.to_string(),
        message: message.to_string(),
    };

    let document = serde_json::to_value(response).map_err(|e| extraction(&e.to_string()))?;

    match lookup(&document, path) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(extraction("value is not a non-empty string")),
        None => Err(extraction("no such field in response")),
    }
}
