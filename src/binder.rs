//! # Parameter Binder Module
//!
//! Converts request data into typed handler arguments.
//!
//! ## Overview
//!
//! A route declares one [`ParamSpec`] per handler argument, in call order.
//! Each argument type implements [`FromParam`], which names the
//! [`ParamKind`] it binds as and performs the conversion:
//!
//! | Rust type | Kind | Source |
//! |-----------|------|--------|
//! | `i64`, `i32` | `Int` | positional segment, else [`RequestContext::query`] |
//! | `String` | `String` | positional segment, else [`RequestContext::query`] |
//! | `Vec<String>` | `StringList` | every submitted value for the name |
//! | [`Body<T>`] | `Struct` | whole body, by content type |
//! | `Box<T>` | `StructPointer` | whole body, by content type |
//!
//! Binding is all-or-nothing: the first failing argument aborts the call and
//! the handler never runs.
//!
//! ## Conversion Rules
//!
//! - `Int` accepts a string with strict integer syntax (empty means 0), an
//!   integer, or a float truncated toward zero. `null` binds as 0.
//! - `String` accepts a string verbatim or an integer, stringified. `null`
//!   binds as the empty string.
//! - Any other JSON type is rejected with [`BindError::Unsupported`].
//!
//! ## Validators
//!
//! Struct arguments may carry validators on their spec:
//!
//! ```rust
//! use hiweb::binder::ParamSpec;
//! use hiweb::error::ValidationError;
//!
//! #[derive(serde::Deserialize)]
//! struct Signup { user: String }
//!
//! let spec = ParamSpec::body("signup").validator(|s: &Signup| {
//!     if s.user.is_empty() {
//!         return Err(ValidationError::new("user", "required"));
//!     }
//!     Ok(())
//! });
//! # let _ = spec;
//! ```

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::{FormValues, RequestContext};
use crate::error::{BindError, ValidationError};

/// Target kind of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Int,
    String,
    StringList,
    Struct,
    StructPointer,
}

/// External check applied to a populated value.
pub trait Validator<T>: Send + Sync {
    fn validate(&self, value: &T) -> Result<(), ValidationError>;
}

impl<T, F> Validator<T> for F
where
    F: Fn(&T) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, value: &T) -> Result<(), ValidationError> {
        self(value)
    }
}

/// Self-validation rules of a struct, run by
/// [`RequestContext::parse_check`].
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// One declared handler parameter.
#[derive(Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    validators: Vec<Arc<dyn Any + Send + Sync>>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            validators: Vec::new(),
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Int)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String)
    }

    pub fn strings(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::StringList)
    }

    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Struct)
    }

    pub fn boxed(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::StructPointer)
    }

    /// Attach a validator for a struct argument of type `T`.
    pub fn validator<T: 'static>(mut self, v: impl Validator<T> + 'static) -> Self {
        let v: Arc<dyn Validator<T>> = Arc::new(v);
        self.validators.push(Arc::new(v));
        self
    }

    /// Validators registered for `T`, in registration order.
    #[must_use]
    pub fn validators_for<T: 'static>(&self) -> Vec<Arc<dyn Validator<T>>> {
        self.validators
            .iter()
            .filter_map(|v| v.downcast_ref::<Arc<dyn Validator<T>>>())
            .map(Arc::clone)
            .collect()
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// A handler argument the binder can produce.
pub trait FromParam: Sized {
    const KIND: ParamKind;

    /// Bind argument `index` using `spec`. `positional` is the trailing path
    /// segment at the same index, if the route captured one.
    fn from_param(
        ctx: &mut RequestContext,
        spec: &ParamSpec,
        index: usize,
        positional: Option<&str>,
    ) -> Result<Self, BindError>;
}

fn scalar(
    ctx: &mut RequestContext,
    spec: &ParamSpec,
    positional: Option<&str>,
) -> Result<Value, BindError> {
    match positional {
        Some(s) => Ok(Value::String(s.to_string())),
        None => ctx.query(&spec.name, None),
    }
}

/// Integer conversion shared by the binder and [`RequestContext::get_int`].
pub fn value_to_int(index: usize, name: &str, value: &Value) -> Result<i64, BindError> {
    match value {
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s.parse::<i64>().map_err(|e| BindError::InvalidInt {
            index,
            value: s.clone(),
            reason: e.to_string(),
        }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                Ok(f.trunc() as i64)
            } else {
                Err(BindError::Unsupported {
                    name: name.to_string(),
                    value: n.to_string(),
                })
            }
        }
        Value::Null => Ok(0),
        other => Err(BindError::Unsupported {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

/// String conversion shared by the binder and [`RequestContext::get_string`].
pub fn value_to_string(name: &str, value: &Value) -> Result<String, BindError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(BindError::Unsupported {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Map form fields onto `T` by field name. The first value of each field
/// is used.
pub fn form_to_struct<T: DeserializeOwned>(form: &FormValues) -> Result<T, BindError> {
    let mut ser = url::form_urlencoded::Serializer::new(String::new());
    for (key, values) in form {
        if let Some(first) = values.first() {
            ser.append_pair(key, first);
        }
    }
    Ok(serde_urlencoded::from_str(&ser.finish())?)
}

impl FromParam for i64 {
    const KIND: ParamKind = ParamKind::Int;

    fn from_param(
        ctx: &mut RequestContext,
        spec: &ParamSpec,
        index: usize,
        positional: Option<&str>,
    ) -> Result<Self, BindError> {
        let value = scalar(ctx, spec, positional)?;
        value_to_int(index, &spec.name, &value)
    }
}

impl FromParam for i32 {
    const KIND: ParamKind = ParamKind::Int;

    fn from_param(
        ctx: &mut RequestContext,
        spec: &ParamSpec,
        index: usize,
        positional: Option<&str>,
    ) -> Result<Self, BindError> {
        let wide = i64::from_param(ctx, spec, index, positional)?;
        i32::try_from(wide).map_err(|e| BindError::InvalidInt {
            index,
            value: wide.to_string(),
            reason: e.to_string(),
        })
    }
}

impl FromParam for String {
    const KIND: ParamKind = ParamKind::String;

    fn from_param(
        ctx: &mut RequestContext,
        spec: &ParamSpec,
        _index: usize,
        positional: Option<&str>,
    ) -> Result<Self, BindError> {
        let value = scalar(ctx, spec, positional)?;
        value_to_string(&spec.name, &value)
    }
}

impl FromParam for Vec<String> {
    const KIND: ParamKind = ParamKind::StringList;

    fn from_param(
        ctx: &mut RequestContext,
        spec: &ParamSpec,
        _index: usize,
        positional: Option<&str>,
    ) -> Result<Self, BindError> {
        match positional {
            Some(s) => Ok(vec![s.to_string()]),
            None => ctx.get_strings(&spec.name, None),
        }
    }
}

/// A struct argument populated from the whole request body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body<T>(pub T);

impl<T> Body<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Body<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Body<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

fn bind_struct<T: DeserializeOwned + 'static>(
    ctx: &mut RequestContext,
    spec: &ParamSpec,
) -> Result<T, BindError> {
    let validators = spec.validators_for::<T>();
    let refs: Vec<&dyn Validator<T>> = validators.iter().map(|v| v.as_ref()).collect();
    ctx.parse_valid(&refs)
}

impl<T: DeserializeOwned + 'static> FromParam for Body<T> {
    const KIND: ParamKind = ParamKind::Struct;

    fn from_param(
        ctx: &mut RequestContext,
        spec: &ParamSpec,
        _index: usize,
        _positional: Option<&str>,
    ) -> Result<Self, BindError> {
        bind_struct(ctx, spec).map(Body)
    }
}

impl<T: DeserializeOwned + 'static> FromParam for Box<T> {
    const KIND: ParamKind = ParamKind::StructPointer;

    fn from_param(
        ctx: &mut RequestContext,
        spec: &ParamSpec,
        _index: usize,
        _positional: Option<&str>,
    ) -> Result<Self, BindError> {
        bind_struct(ctx, spec).map(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebConfig;
    use crate::server::HttpRequest;
    use http::Method;
    use serde::Deserialize;
    use serde_json::json;

    fn ctx(content_type: &str, body: &str) -> RequestContext {
        RequestContext::new(
            HttpRequest::new(Method::POST, "/")
                .header("Content-Type", content_type)
                .body(body),
            Arc::new(WebConfig::default()),
        )
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(value_to_int(0, "n", &json!("42")).unwrap(), 42);
        assert_eq!(value_to_int(0, "n", &json!("")).unwrap(), 0);
        assert_eq!(value_to_int(0, "n", &json!(7)).unwrap(), 7);
        assert_eq!(value_to_int(0, "n", &json!(-3.9)).unwrap(), -3);
        assert_eq!(value_to_int(0, "n", &Value::Null).unwrap(), 0);
        assert!(matches!(
            value_to_int(0, "n", &json!(true)),
            Err(BindError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_int_failure_names_position() {
        match value_to_int(3, "n", &json!("abc")) {
            Err(BindError::InvalidInt { index, value, .. }) => {
                assert_eq!(index, 3);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(value_to_int(0, "n", &json!(" 1")).is_err());
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(value_to_string("s", &json!("x")).unwrap(), "x");
        assert_eq!(value_to_string("s", &json!(12)).unwrap(), "12");
        assert_eq!(value_to_string("s", &Value::Null).unwrap(), "");
        assert!(value_to_string("s", &json!({"a": 1})).is_err());
    }

    #[test]
    fn test_positional_wins() {
        let mut c = ctx("application/json", r#"{"id": 5}"#);
        let spec = ParamSpec::int("id");
        assert_eq!(i64::from_param(&mut c, &spec, 0, Some("9")).unwrap(), 9);
        assert_eq!(i64::from_param(&mut c, &spec, 0, None).unwrap(), 5);
    }

    #[test]
    fn test_i32_overflow() {
        let mut c = ctx("application/x-www-form-urlencoded", "n=99999999999");
        let spec = ParamSpec::int("n");
        assert!(i32::from_param(&mut c, &spec, 0, None).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Item {
        name: String,
    }

    #[test]
    fn test_struct_validators_run_in_order() {
        let spec = ParamSpec::body("item")
            .validator(|i: &Item| {
                if i.name.len() < 3 {
                    Err(ValidationError::new("name", "too short"))
                } else {
                    Ok(())
                }
            })
            .validator(|_: &Item| Err::<(), _>(ValidationError::new("name", "always")));
        assert_eq!(spec.validators_for::<Item>().len(), 2);

        let mut c = ctx("application/json", r#"{"name":"ab"}"#);
        match Body::<Item>::from_param(&mut c, &spec, 0, None) {
            Err(BindError::Validation(e)) => assert_eq!(e.message, "too short"),
            other => panic!("unexpected {other:?}"),
        }

        let mut c = ctx("application/json", r#"{"name":"abcd"}"#);
        match Box::<Item>::from_param(&mut c, &spec, 0, None) {
            Err(BindError::Validation(e)) => assert_eq!(e.message, "always"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_form_to_struct_first_value() {
        let mut form = FormValues::new();
        form.insert("name".into(), vec!["a".into(), "b".into()]);
        let item: Item = form_to_struct(&form).unwrap();
        assert_eq!(item.name, "a");
    }
}
