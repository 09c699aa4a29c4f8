use super::coerce::coerce;
use super::content::CoercionContext;
use super::error::MappingResult;
use super::path::FieldPath;
use super::shape::Request;
use super::tag::TypeTag;
use serde_json::Value;

/// One field assignment: coerce `value` with `tag` and store it at `path`
#[derive(Debug, Clone, PartialEq)]
pub struct Setter {
    pub value: Value,
    pub path: FieldPath,
    pub tag: TypeTag,
    /// User-facing parameter name used to annotate errors
    pub param: Option<String>,
}

impl Setter {
    pub fn new(value: impl Into<Value>, path: &str, tag: TypeTag) -> MappingResult<Self> {
        Ok(Self::with_path(value.into(), FieldPath::parse(path)?, tag))
    }

    pub fn with_path(value: Value, path: FieldPath, tag: TypeTag) -> Self {
        Self {
            value,
            path,
            tag,
            param: None,
        }
    }

    /// Build a setter from an optional value; `None` becomes a no-op setter
    pub fn optional<V: Into<Value>>(
        value: Option<V>,
        path: &str,
        tag: TypeTag,
    ) -> MappingResult<Self> {
        Self::new(value.map(Into::into).unwrap_or(Value::Null), path, tag)
    }

    /// Attribute errors from this setter to a named parameter
    pub fn for_param(mut self, name: impl Into<String>) -> Self {
        self.param = Some(name.into());
        self
    }

    pub fn apply(&self, request: &mut Request, ctx: &mut CoercionContext) -> MappingResult<()> {
        if self.value.is_null() {
            return Ok(());
        }

        let result = coerce(&self.value, self.tag, ctx)
            .and_then(|coerced| request.assign(&self.path, coerced));

        match (&self.param, result) {
            (Some(name), Err(e)) => Err(e.for_parameter(name)),
            (_, result) => result,
        }
    }
}
