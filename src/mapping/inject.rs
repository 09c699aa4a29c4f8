//! Mapping tables: declarative parameter-to-request mappings.
//!
//! A command declares, once, which user parameter feeds which request field
//! and with which [`TypeTag`]. Paths are parsed and checked against the
//! request shape when the table is built, so a broken mapping fails at
//! registration rather than on every invocation.
//!
//! The inverse direction, filling a command's own typed fields from the
//! parameter map, is covered by [`ParamField`] and [`FromParams`]: the tag is
//! picked from the Rust field type instead of being declared.

use super::Params;
use super::coerce::coerce;
use super::content::CoercionContext;
use super::error::{MappingError, MappingResult};
use super::path::FieldPath;
use super::setter::Setter;
use super::shape::{Request, StructShape};
use super::tag::TypeTag;
use serde_json::Value;
use std::sync::Arc;

/// A single parameter mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ParamMapping {
    field: String,
    external: Option<String>,
    targets: Vec<FieldPath>,
    tag: TypeTag,
}

impl ParamMapping {
    /// Name the parameter is looked up and reported under
    pub fn param_name(&self) -> &str {
        self.external.as_deref().unwrap_or(&self.field)
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Validated set of mappings for one request shape
#[derive(Debug, Clone)]
pub struct MappingTable {
    shape: Arc<StructShape>,
    mappings: Vec<ParamMapping>,
}

impl MappingTable {
    pub fn builder(shape: StructShape) -> MappingTableBuilder {
        MappingTableBuilder {
            shape: Arc::new(shape),
            mappings: Vec::new(),
            error: None,
        }
    }

    pub fn mappings(&self) -> &[ParamMapping] {
        &self.mappings
    }

    /// An empty request document of this table's shape
    pub fn new_request(&self) -> Request {
        Request::new(Arc::clone(&self.shape))
    }

    /// One setter per populated parameter and destination path, in
    /// declaration order. Absent or `null` parameters produce nothing.
    pub fn setters(&self, params: &Params) -> Vec<Setter> {
        let mut setters = Vec::new();
        for mapping in &self.mappings {
            let Some(value) = params.get(mapping.param_name()) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            for target in &mapping.targets {
                setters.push(
                    Setter::with_path(value.clone(), target.clone(), mapping.tag)
                        .for_param(mapping.param_name()),
                );
            }
        }
        setters
    }

    /// Apply every populated parameter to `request`, stopping at the first error
    pub fn inject(
        &self,
        params: &Params,
        request: &mut Request,
        ctx: &mut CoercionContext,
    ) -> MappingResult<()> {
        for setter in self.setters(params) {
            setter.apply(request, ctx)?;
        }
        Ok(())
    }
}

/// Builder collecting mappings; the first invalid mapping is reported by
/// [`MappingTableBuilder::build`]
pub struct MappingTableBuilder {
    shape: Arc<StructShape>,
    mappings: Vec<ParamMapping>,
    error: Option<MappingError>,
}

impl MappingTableBuilder {
    /// Map parameter `field` onto one or more comma-separated request paths
    pub fn map(self, field: &str, targets: &str, tag: TypeTag) -> Self {
        self.push(field, None, targets, tag)
    }

    /// Like [`MappingTableBuilder::map`], with a distinct user-facing name
    pub fn map_param(self, field: &str, external: &str, targets: &str, tag: TypeTag) -> Self {
        self.push(field, Some(external), targets, tag)
    }

    fn push(mut self, field: &str, external: Option<&str>, targets: &str, tag: TypeTag) -> Self {
        if self.error.is_some() {
            return self;
        }

        let name = external.unwrap_or(field);
        let parsed = FieldPath::parse_list(targets).and_then(|paths| {
            for path in &paths {
                self.shape.check(path)?;
            }
            Ok(paths)
        });

        match parsed {
            Ok(paths) => self.mappings.push(ParamMapping {
                field: field.to_string(),
                external: external.map(str::to_string),
                targets: paths,
                tag,
            }),
            Err(e) => self.error = Some(e.for_parameter(name)),
        }
        self
    }

    pub fn build(self) -> MappingResult<MappingTable> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(MappingTable {
            shape: self.shape,
            mappings: self.mappings,
        })
    }
}

/// A typed field that can be filled straight from the parameter map
pub trait ParamField: Sized {
    /// Coercion tag implied by the field type
    const TAG: TypeTag;

    /// Convert the coerced value; `null` means the parameter was absent
    fn from_coerced(value: Value) -> MappingResult<Self>;
}

macro_rules! optional_scalar_field {
    ($ty:ty, $tag:expr) => {
        impl ParamField for Option<$ty> {
            const TAG: TypeTag = $tag;

            fn from_coerced(value: Value) -> MappingResult<Self> {
                if value.is_null() {
                    return Ok(None);
                }
                let literal = value.to_string();
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|_| MappingError::coercion(literal, Self::TAG.name()))
            }
        }
    };
}

optional_scalar_field!(String, TypeTag::Str);
optional_scalar_field!(i32, TypeTag::Int);
optional_scalar_field!(i64, TypeTag::Int64);
optional_scalar_field!(f64, TypeTag::Float);
optional_scalar_field!(bool, TypeTag::Bool);
optional_scalar_field!(Vec<String>, TypeTag::StringSlice);

impl ParamField for Vec<String> {
    const TAG: TypeTag = TypeTag::StringSlice;

    fn from_coerced(value: Value) -> MappingResult<Self> {
        Ok(Option::<Vec<String>>::from_coerced(value)?.unwrap_or_default())
    }
}

/// Read parameter `key` into a typed field, choosing the tag from `T`
pub fn populate<T: ParamField>(
    params: &Params,
    key: &str,
    ctx: &mut CoercionContext,
) -> MappingResult<T> {
    let raw = params.get(key).unwrap_or(&Value::Null);
    coerce(raw, T::TAG, ctx)
        .and_then(T::from_coerced)
        .map_err(|e| e.for_parameter(key))
}

/// Commands whose own fields are filled from the parameter map
pub trait FromParams: Sized {
    fn from_params(params: &Params, ctx: &mut CoercionContext) -> MappingResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockFileSystem, MockHttpClient};
    use serde_json::json;

    fn ctx() -> CoercionContext {
        CoercionContext::new(Arc::new(MockFileSystem::new()), Arc::new(MockHttpClient::new()))
    }

    fn params(value: Value) -> Params {
        serde_json::from_value(value).unwrap()
    }

    fn shape() -> StructShape {
        StructShape::new("RunInstancesInput")
            .leaves(&["ImageId", "MinCount", "MaxCount", "SecurityGroupIds"])
            .structure(
                "IamInstanceProfile",
                StructShape::new("IamInstanceProfileSpecification").leaf("Name"),
            )
    }

    #[test]
    fn test_one_parameter_populates_two_fields() {
        let table = MappingTable::builder(shape())
            .map("count", "MinCount,MaxCount", TypeTag::Int64)
            .build()
            .unwrap();
        let mut request = table.new_request();

        table
            .inject(&params(json!({"count": "2"})), &mut request, &mut ctx())
            .unwrap();

        assert_eq!(request.to_value(), json!({"MinCount": 2, "MaxCount": 2}));
    }

    #[test]
    fn test_absent_and_null_parameters_are_skipped() {
        let table = MappingTable::builder(shape())
            .map("image", "ImageId", TypeTag::Str)
            .map("role", "IamInstanceProfile.Name", TypeTag::Str)
            .build()
            .unwrap();
        let mut request = table.new_request();

        table
            .inject(&params(json!({"role": null})), &mut request, &mut ctx())
            .unwrap();

        assert!(request.body().is_empty());
        assert!(table.setters(&params(json!({"image": "ami-1"}))).len() == 1);
    }

    #[test]
    fn test_errors_carry_external_parameter_name() {
        let table = MappingTable::builder(shape())
            .map_param("count", "instance-count", "MinCount", TypeTag::Int64)
            .map("image", "ImageId", TypeTag::Str)
            .build()
            .unwrap();
        let mut request = table.new_request();

        let err = table
            .inject(&params(json!({"instance-count": "lots"})), &mut request, &mut ctx())
            .unwrap_err();

        assert!(err.to_string().starts_with("parameter 'instance-count': "));
        assert_eq!(table.mappings()[0].field(), "count");
        assert_eq!(table.mappings()[1].param_name(), "image");
    }

    #[test]
    fn test_invalid_mapping_fails_at_build_time() {
        let err = MappingTable::builder(shape())
            .map("image", "ImageId", TypeTag::Str)
            .map("zone", "Placement.AvailabilityZone", TypeTag::Str)
            .map("bad", "Also[1]Bad", TypeTag::Str)
            .build()
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("parameter 'zone'"), "{}", message);
        assert!(message.contains("no field named 'Placement'"), "{}", message);
    }

    #[test]
    fn test_populate_infers_tag_from_field_type() {
        let p = params(json!({
            "name": 42,
            "count": "3",
            "ratio": "0.5",
            "force": "true",
            "groups": "sg-1",
        }));
        let mut ctx = ctx();

        let name: Option<String> = populate(&p, "name", &mut ctx).unwrap();
        let count: Option<i64> = populate(&p, "count", &mut ctx).unwrap();
        let ratio: Option<f64> = populate(&p, "ratio", &mut ctx).unwrap();
        let force: Option<bool> = populate(&p, "force", &mut ctx).unwrap();
        let groups: Vec<String> = populate(&p, "groups", &mut ctx).unwrap();
        let missing: Option<i32> = populate(&p, "missing", &mut ctx).unwrap();
        let missing_list: Vec<String> = populate(&p, "missing", &mut ctx).unwrap();

        assert_eq!(name.as_deref(), Some("42"));
        assert_eq!(count, Some(3));
        assert_eq!(ratio, Some(0.5));
        assert_eq!(force, Some(true));
        assert_eq!(groups, vec!["sg-1".to_string()]);
        assert_eq!(missing, None);
        assert!(missing_list.is_empty());
    }

    #[test]
    fn test_populate_reports_parameter_name() {
        let p = params(json!({"count": "three"}));

        let err = populate::<Option<i64>>(&p, "count", &mut ctx()).unwrap_err();
        assert!(err.to_string().contains("parameter 'count'"));
    }
}
