//! Request shapes and the destination request document.
//!
//! A [`StructShape`] describes the fields of a provider request struct: which
//! ones are plain values, nested structs, string maps or lists of structs. A
//! [`Request`] is the JSON document built against that shape; once every
//! setter has been applied it is deserialized into the provider's typed
//! request with [`Request::build`].

use super::error::{MappingError, MappingResult};
use super::path::{FieldPath, PathStep};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Kind of a single field in a request shape
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// Any value: scalar, list of scalars, or a composite produced by a tag
    Leaf,
    Struct(StructShape),
    /// String-keyed map of strings
    Map,
    /// List of structs, addressable only at index 0
    List(StructShape),
}

impl FieldShape {
    fn describe(&self) -> String {
        match self {
            FieldShape::Leaf => "a plain value".to_string(),
            FieldShape::Struct(s) => format!("struct {}", s.name),
            FieldShape::Map => "a string map".to_string(),
            FieldShape::List(s) => format!("a list of {}", s.name),
        }
    }
}

/// Field layout of one request (or nested) struct
#[derive(Debug, Clone, PartialEq)]
pub struct StructShape {
    name: String,
    fields: IndexMap<String, FieldShape>,
}

impl StructShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn leaf(mut self, name: &str) -> Self {
        self.fields.insert(name.to_string(), FieldShape::Leaf);
        self
    }

    pub fn leaves(mut self, names: &[&str]) -> Self {
        for name in names {
            self.fields.insert(name.to_string(), FieldShape::Leaf);
        }
        self
    }

    pub fn structure(mut self, name: &str, shape: StructShape) -> Self {
        self.fields.insert(name.to_string(), FieldShape::Struct(shape));
        self
    }

    pub fn map(mut self, name: &str) -> Self {
        self.fields.insert(name.to_string(), FieldShape::Map);
        self
    }

    pub fn list(mut self, name: &str, element: StructShape) -> Self {
        self.fields.insert(name.to_string(), FieldShape::List(element));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.get(name)
    }

    /// Verify that `path` addresses an assignable location in this shape
    pub fn check(&self, path: &FieldPath) -> MappingResult<()> {
        check_in(self, path.steps(), path)
    }
}

fn check_in(shape: &StructShape, steps: &[PathStep], path: &FieldPath) -> MappingResult<()> {
    let (name, field, rest) = step_field(shape, steps, path)?;

    match (field, rest) {
        (_, []) => Ok(()),
        (FieldShape::Struct(inner), [PathStep::Field(_), ..]) => check_in(inner, rest, path),
        (FieldShape::Map, [PathStep::MapKey(_)]) => Ok(()),
        (FieldShape::List(inner), [PathStep::SliceIndex(0), tail @ ..]) if !tail.is_empty() => {
            check_in(inner, tail, path)
        }
        (kind, [step, ..]) => Err(unreachable_step(path, shape, name, kind, step)),
    }
}

/// Resolve the first step of `steps` to a field of `shape`
fn step_field<'s, 'p>(
    shape: &'s StructShape,
    steps: &'p [PathStep],
    path: &FieldPath,
) -> MappingResult<(&'p str, &'s FieldShape, &'p [PathStep])> {
    let Some((PathStep::Field(name), rest)) = steps.split_first() else {
        return Err(MappingError::assignment(
            path,
            shape.name(),
            "expected a field name",
        ));
    };

    let field = shape.field(name).ok_or_else(|| {
        MappingError::assignment(path, shape.name(), format!("no field named '{}'", name))
    })?;

    Ok((name.as_str(), field, rest))
}

fn unreachable_step(
    path: &FieldPath,
    shape: &StructShape,
    name: &str,
    kind: &FieldShape,
    step: &PathStep,
) -> MappingError {
    let step = match step {
        PathStep::Field(f) => format!("field access '.{}'", f),
        PathStep::MapKey(k) => format!("map key '[{}]'", k),
        PathStep::SliceIndex(i) => format!("list index '[{}]'", i),
    };
    MappingError::assignment(
        path,
        shape.name(),
        format!("field '{}' is {} and does not accept {}", name, kind.describe(), step),
    )
}

/// A request document under construction
#[derive(Debug, Clone)]
pub struct Request {
    shape: Arc<StructShape>,
    body: Map<String, Value>,
}

impl Request {
    pub fn new(shape: Arc<StructShape>) -> Self {
        Self {
            shape,
            body: Map::new(),
        }
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    /// Read the value currently stored at `path`
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        lookup_in_map(&self.body, path.steps())
    }

    /// Set `value` at `path`, allocating intermediate structs, maps and the
    /// first list element as needed. A `null` value leaves the document
    /// untouched.
    pub fn assign(&mut self, path: &FieldPath, value: Value) -> MappingResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let shape = Arc::clone(&self.shape);
        set_in(&mut self.body, &shape, path.steps(), value, path)
    }

    /// Deserialize the document into the provider's typed request
    pub fn build<T: DeserializeOwned>(&self) -> MappingResult<T> {
        serde_json::from_value(self.to_value()).map_err(|e| {
            MappingError::assignment("<request>", self.shape.name(), e.to_string())
        })
    }
}

fn set_in(
    obj: &mut Map<String, Value>,
    shape: &StructShape,
    steps: &[PathStep],
    value: Value,
    path: &FieldPath,
) -> MappingResult<()> {
    let (name, field, rest) = step_field(shape, steps, path)?;

    match (field, rest) {
        (kind, []) => {
            check_value_kind(kind, &value, name, shape, path)?;
            obj.insert(name.to_string(), value);
            Ok(())
        }
        (FieldShape::Struct(inner), [PathStep::Field(_), ..]) => {
            let nested = object_entry(obj, name, shape, path)?;
            set_in(nested, inner, rest, value, path)
        }
        (FieldShape::Map, [PathStep::MapKey(key)]) => {
            let map = object_entry(obj, name, shape, path)?;
            map.insert(key.clone(), Value::String(stringify(&value)));
            Ok(())
        }
        (FieldShape::List(inner), [PathStep::SliceIndex(0), tail @ ..]) if !tail.is_empty() => {
            let entry = obj
                .entry(name.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            let Value::Array(items) = entry else {
                return Err(MappingError::assignment(
                    path,
                    shape.name(),
                    format!("field '{}' already holds a non-list value", name),
                ));
            };
            if items.is_empty() {
                items.push(Value::Object(Map::new()));
            }
            match items.first_mut() {
                Some(Value::Object(element)) => set_in(element, inner, tail, value, path),
                _ => Err(MappingError::assignment(
                    path,
                    shape.name(),
                    format!("first element of '{}' is not a struct", name),
                )),
            }
        }
        (kind, [step, ..]) => Err(unreachable_step(path, shape, name, kind, step)),
    }
}

fn object_entry<'a>(
    obj: &'a mut Map<String, Value>,
    name: &str,
    shape: &StructShape,
    path: &FieldPath,
) -> MappingResult<&'a mut Map<String, Value>> {
    let entry = obj
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match entry {
        Value::Object(map) => Ok(map),
        _ => Err(MappingError::assignment(
            path,
            shape.name(),
            format!("field '{}' already holds a non-object value", name),
        )),
    }
}

fn check_value_kind(
    kind: &FieldShape,
    value: &Value,
    name: &str,
    shape: &StructShape,
    path: &FieldPath,
) -> MappingResult<()> {
    let ok = match kind {
        FieldShape::Leaf => true,
        FieldShape::Struct(_) | FieldShape::Map => value.is_object(),
        FieldShape::List(_) => value.is_array(),
    };
    if ok {
        Ok(())
    } else {
        Err(MappingError::assignment(
            path,
            shape.name(),
            format!(
                "field '{}' is {} and cannot hold {}",
                name,
                kind.describe(),
                json_kind(value)
            ),
        ))
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Follow `steps` through a JSON value
pub fn lookup<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    lookup_steps(root, path.steps())
}

fn lookup_in_map<'a>(map: &'a Map<String, Value>, steps: &[PathStep]) -> Option<&'a Value> {
    let (first, rest) = steps.split_first()?;
    let next = match first {
        PathStep::Field(name) | PathStep::MapKey(name) => map.get(name)?,
        PathStep::SliceIndex(_) => return None,
    };
    lookup_steps(next, rest)
}

fn lookup_steps<'a>(value: &'a Value, steps: &[PathStep]) -> Option<&'a Value> {
    let Some((first, rest)) = steps.split_first() else {
        return Some(value);
    };
    let next = match first {
        PathStep::Field(name) | PathStep::MapKey(name) => value.as_object()?.get(name)?,
        PathStep::SliceIndex(index) => value.as_array()?.get(*index)?,
    };
    lookup_steps(next, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn sample_shape() -> Arc<StructShape> {
        Arc::new(
            StructShape::new("SampleInput")
                .leaves(&["Name", "Count"])
                .map("MapAttribute")
                .structure(
                    "Placement",
                    StructShape::new("Placement")
                        .leaf("Zone")
                        .structure("Host", StructShape::new("Host").leaf("Id")),
                )
                .list(
                    "Listeners",
                    StructShape::new("Listener").leaves(&["Port", "Protocol"]),
                ),
        )
    }

    #[test]
    fn test_map_index_on_nil_map_allocates_one_entry() {
        let mut request = Request::new(sample_shape());

        request.assign(&p("MapAttribute[Field1]"), json!("abc")).unwrap();

        assert_eq!(request.to_value(), json!({"MapAttribute": {"Field1": "abc"}}));
    }

    #[test]
    fn test_map_index_last_write_wins_and_distinct_keys_accumulate() {
        let mut request = Request::new(sample_shape());

        request.assign(&p("MapAttribute[a]"), json!("1")).unwrap();
        request.assign(&p("MapAttribute[a]"), json!("2")).unwrap();
        assert_eq!(request.body()["MapAttribute"].as_object().unwrap().len(), 1);

        request.assign(&p("MapAttribute[b]"), json!(3)).unwrap();
        let map = request.body()["MapAttribute"].as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], json!("2"));
        assert_eq!(map["b"], json!("3"));
    }

    #[test]
    fn test_nested_struct_path_allocates_intermediates() {
        let mut request = Request::new(sample_shape());

        request.assign(&p("Placement.Host.Id"), json!("h-1")).unwrap();
        request.assign(&p("Placement.Zone"), json!("eu-west-1a")).unwrap();

        assert_eq!(
            request.to_value(),
            json!({"Placement": {"Zone": "eu-west-1a", "Host": {"Id": "h-1"}}})
        );
    }

    #[test]
    fn test_slice_index_grows_to_one_element_only() {
        let mut request = Request::new(sample_shape());

        request.assign(&p("Listeners[0]Port"), json!(443)).unwrap();
        request.assign(&p("Listeners[0]Protocol"), json!("HTTPS")).unwrap();

        assert_eq!(
            request.to_value(),
            json!({"Listeners": [{"Port": 443, "Protocol": "HTTPS"}]})
        );
    }

    #[test]
    fn test_null_value_is_a_no_op() {
        let mut request = Request::new(sample_shape());

        request.assign(&p("MapAttribute[a]"), Value::Null).unwrap();
        request.assign(&p("DoesNotExist"), Value::Null).unwrap();

        assert!(request.body().is_empty());
    }

    #[test]
    fn test_missing_field_names_path_and_target() {
        let mut request = Request::new(sample_shape());

        let err = request.assign(&p("Nope"), json!("x")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'Nope'"));
        assert!(message.contains("SampleInput"));
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_kind_mismatches_are_errors() {
        let mut request = Request::new(sample_shape());

        assert!(request.assign(&p("Name[key]"), json!("x")).is_err());
        assert!(request.assign(&p("MapAttribute.Inner"), json!("x")).is_err());
        assert!(request.assign(&p("Placement"), json!("flat")).is_err());
        assert!(request.assign(&p("Listeners"), json!({"Port": 1})).is_err());

        let err = request.assign(&p("Placement[0]Zone"), json!("x")).unwrap_err();
        assert!(err.to_string().contains("struct Placement"));
    }

    #[test]
    fn test_whole_struct_and_list_values_accepted() {
        let mut request = Request::new(sample_shape());

        request.assign(&p("Placement"), json!({"Zone": "a"})).unwrap();
        request.assign(&p("Listeners"), json!([{"Port": 80}])).unwrap();

        assert_eq!(request.get(&p("Placement.Zone")), Some(&json!("a")));
        assert_eq!(request.get(&p("Listeners[0]Port")), Some(&json!(80)));
    }

    #[test]
    fn test_check_validates_without_values() {
        let shape = sample_shape();

        assert!(shape.check(&p("Listeners[0]Port")).is_ok());
        assert!(shape.check(&p("MapAttribute[anything]")).is_ok());
        assert!(shape.check(&p("Placement.Host.Id")).is_ok());
        assert!(shape.check(&p("Placement.Host.Missing")).is_err());
        assert!(shape.check(&p("Count.Inner")).is_err());
    }

    #[test]
    fn test_build_into_typed_request() {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct SampleInput {
            name: Option<String>,
            map_attribute: Option<HashMap<String, String>>,
        }

        let mut request = Request::new(sample_shape());
        request.assign(&p("Name"), json!("web")).unwrap();
        request.assign(&p("MapAttribute[k]"), json!("v")).unwrap();

        let typed: SampleInput = request.build().unwrap();
        assert_eq!(typed.name.as_deref(), Some("web"));
        assert_eq!(typed.map_attribute.unwrap()["k"], "v");

        request.assign(&p("Name"), json!(5)).unwrap();
        assert!(request.build::<SampleInput>().is_err());
    }

    #[test]
    fn test_lookup_follows_index_steps() {
        let doc = json!({"Instances": [{"InstanceId": "i-123"}], "Tags": {"Name": "web"}});

        assert_eq!(
            lookup(&doc, &p("Instances[0]InstanceId")),
            Some(&json!("i-123"))
        );
        assert_eq!(lookup(&doc, &p("Tags[Name]")), Some(&json!("web")));
        assert_eq!(lookup(&doc, &p("Missing.Field")), None);
    }
}
