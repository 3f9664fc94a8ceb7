//! Typed handler adapters.
//!
//! Any `Fn(&mut RequestContext, A1, .., An) -> R` with up to eight
//! [`FromParam`] arguments is a [`Handler`]. Registration erases it into a
//! [`RouteFn`] that binds every argument in order and then calls it, so no
//! runtime type inspection happens per request.

use std::sync::Arc;

use crate::binder::{FromParam, ParamKind, ParamSpec};
use crate::context::RequestContext;
use crate::error::BindError;

/// Outcome of a handler that was reached.
pub type HandlerResult = anyhow::Result<()>;

/// Erased route target: binds arguments, then invokes the handler.
///
/// The outer `Err` is a binding failure; the handler never ran.
pub type RouteFn = Arc<
    dyn Fn(&mut RequestContext, &[ParamSpec], &[String]) -> Result<HandlerResult, BindError>
        + Send
        + Sync,
>;

/// Values a handler may return.
pub trait HandlerOutput {
    fn into_result(self) -> HandlerResult;
}

impl HandlerOutput for () {
    fn into_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E: Into<anyhow::Error>> HandlerOutput for Result<(), E> {
    fn into_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

/// A function callable with arguments produced by the binder.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Kinds of the arguments after the context, in call order.
    fn kinds() -> Vec<ParamKind>;

    fn call(
        &self,
        ctx: &mut RequestContext,
        specs: &[ParamSpec],
        positional: &[String],
    ) -> Result<HandlerResult, BindError>;
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn(&mut RequestContext, $($arg),*) -> R + Send + Sync + 'static,
            R: HandlerOutput,
            $($arg: FromParam,)*
        {
            fn kinds() -> Vec<ParamKind> {
                vec![$(<$arg as FromParam>::KIND),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(
                &self,
                ctx: &mut RequestContext,
                specs: &[ParamSpec],
                positional: &[String],
            ) -> Result<HandlerResult, BindError> {
                let mut index = 0usize;
                $(
                    let spec = specs.get(index).ok_or(BindError::MissingSpec { index })?;
                    let $arg = <$arg as FromParam>::from_param(
                        ctx,
                        spec,
                        index,
                        positional.get(index).map(String::as_str),
                    )?;
                    index += 1;
                )*
                Ok((self)(ctx, $($arg),*).into_result())
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Erase a typed handler into a [`RouteFn`].
pub fn erase<H, Args>(handler: H) -> RouteFn
where
    H: Handler<Args>,
{
    Arc::new(
        move |ctx: &mut RequestContext, specs: &[ParamSpec], positional: &[String]| {
            handler.call(ctx, specs, positional)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Body;
    use crate::config::WebConfig;
    use crate::server::HttpRequest;
    use http::Method;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Payload {
        v: i64,
    }

    fn kinds_of<H: Handler<Args>, Args>(_: &H) -> Vec<ParamKind> {
        H::kinds()
    }

    #[test]
    fn test_kinds_follow_signature() {
        let h = |_: &mut RequestContext, _: i64, _: String, _: Vec<String>, _: Body<Payload>| {};
        assert_eq!(
            kinds_of(&h),
            vec![
                ParamKind::Int,
                ParamKind::String,
                ParamKind::StringList,
                ParamKind::Struct
            ]
        );
    }

    #[test]
    fn test_call_binds_in_order() {
        let f = erase(|ctx: &mut RequestContext, a: i64, b: String| {
            ctx.response_mut().write(format!("{a}-{b}").as_bytes());
        });
        let mut ctx = RequestContext::new(
            HttpRequest::new(Method::GET, "/x?b=two"),
            Arc::new(WebConfig::default()),
        );
        let specs = [ParamSpec::int("a"), ParamSpec::string("b")];
        let out = f(&mut ctx, &specs, &["1".to_string()]).unwrap();
        assert!(out.is_ok());
        assert_eq!(ctx.response().body(), b"1-two");
    }

    #[test]
    fn test_handler_error_is_returned() {
        let f = erase(|_: &mut RequestContext| -> anyhow::Result<()> {
            Err(anyhow::anyhow!("boom"))
        });
        let mut ctx = RequestContext::new(
            HttpRequest::new(Method::GET, "/"),
            Arc::new(WebConfig::default()),
        );
        let out = f(&mut ctx, &[], &[]).unwrap();
        assert_eq!(out.unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_missing_spec() {
        let f = erase(|_: &mut RequestContext, _: Box<Payload>| {});
        let mut ctx = RequestContext::new(
            HttpRequest::new(Method::GET, "/"),
            Arc::new(WebConfig::default()),
        );
        assert!(matches!(
            f(&mut ctx, &[], &[]),
            Err(BindError::MissingSpec { index: 0 })
        ));
    }
}
