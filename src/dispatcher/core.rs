use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use http::{HeaderMap, Method};
use tracing::{debug, error, info, info_span};

use crate::binder::ParamSpec;
use crate::config::WebConfig;
use crate::context::RequestContext;
use crate::error::{RouteError, WebError};
use crate::handler::Handler;
use crate::router::{Route, RouteEntry, RouteTable};
use crate::security;
use crate::server::{HttpRequest, HttpResponse};

/// CORS headers set on every response for a matched path.
pub const CORS_HEADERS: [(&str, &str); 5] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "*"),
    ("Access-Control-Allow-Methods", "*"),
    ("Access-Control-Expose-Headers", "Content-Disposition"),
    ("Access-Control-Allow-Credentials", "true"),
];

/// Routes requests to typed handlers.
///
/// Built once before serving; [`Dispatcher::dispatch`] takes `&self` and may
/// be called from any number of threads.
pub struct Dispatcher {
    config: Arc<WebConfig>,
    routes: RouteTable,
}

impl Dispatcher {
    pub fn new(config: Arc<WebConfig>) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Arc<WebConfig> {
        &self.config
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Add a route built with [`Route`].
    pub fn register(&mut self, entry: RouteEntry) -> Result<(), RouteError> {
        self.routes.insert(entry)
    }

    /// Register `handler` for `pattern` and `method` in one call.
    pub fn route<H, Args>(
        &mut self,
        pattern: &str,
        method: &str,
        params: Vec<ParamSpec>,
        requires_auth: bool,
        handler: H,
    ) -> Result<(), RouteError>
    where
        H: Handler<Args>,
    {
        let entry = Route::new(pattern, method)
            .params(params)
            .auth(requires_auth)
            .to(handler)?;
        self.register(entry)
    }

    /// Run one request through CORS, method, IP, auth and binding checks and
    /// the handler.
    pub fn dispatch(&self, req: HttpRequest) -> HttpResponse {
        let path = req.path().to_string();
        let Some(matched) = self.routes.resolve(&path) else {
            debug!(method = %req.method, path = %path, "no route for path");
            return HttpResponse {
                status: 404,
                headers: HeaderMap::new(),
                body: b"404 page not found\n".to_vec(),
            };
        };

        let mut ctx = RequestContext::new(req, Arc::clone(&self.config));
        let request_id = ctx.request_id();
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %ctx.method(),
            path = %path
        );
        let _enter = span.enter();

        apply_cors(&mut ctx);
        if ctx.method() == Method::OPTIONS {
            ctx.response_mut().write_status(200);
            return finish(ctx);
        }

        let Some(entry) = matched.entry_for(ctx.method()) else {
            error!(method = %ctx.method(), url = %ctx.uri(), "not found route url");
            let method = ctx.method().to_string();
            reject(&mut ctx, &WebError::MethodNotFound(method));
            return finish(ctx);
        };

        let remote = ctx.remote_addr();
        if !remote.is_empty() && !ctx.is_loopback() && self.config.blocked_ips.contains(&remote) {
            error!(ip = %remote, "filter ip");
            reject(&mut ctx, &WebError::Forbidden(remote));
            return finish(ctx);
        }

        ctx.set_segments(matched.segments.clone());
        let segments = &matched.segments;
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run(entry, &mut ctx, segments)));
        if let Err(panic) = outcome {
            let panic_message = panic_message(panic.as_ref());
            let backtrace = Backtrace::force_capture();
            error!(
                panic_message = %panic_message,
                backtrace = %backtrace,
                "recovered from handler panic"
            );
            ctx.response_mut().reset();
            apply_cors(&mut ctx);
            reject(&mut ctx, &WebError::Fault(panic_message));
        }
        finish(ctx)
    }

    fn run(&self, entry: &RouteEntry, ctx: &mut RequestContext, segments: &[String]) {
        if entry.requires_auth {
            if let Err(e) = security::authenticate(&self.config, ctx) {
                reject(ctx, &WebError::Auth(e));
                return;
            }
        }

        info!(
            method = %ctx.method(),
            url = %ctx.uri(),
            ip = %ctx.remote_addr(),
            ct = %ctx.content_type(),
            auth = entry.requires_auth,
            "request accepted"
        );

        match entry.invoke(ctx, segments) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(url = %ctx.uri(), error = %e, "handler failed");
                if ctx.response().status().is_none() {
                    reject(ctx, &WebError::Handler(e));
                }
            }
            Err(e) => {
                error!(method = %ctx.method(), url = %ctx.uri(), error = %e, "param err");
                reject(ctx, &WebError::Bind(e));
            }
        }
    }
}

fn apply_cors(ctx: &mut RequestContext) {
    for (k, v) in CORS_HEADERS {
        ctx.set_header(k, v);
    }
}

fn reject(ctx: &mut RequestContext, err: &WebError) {
    let response = ctx.response_mut();
    response.write_status(err.status());
    response.write(err.client_message().as_bytes());
}

fn finish(mut ctx: RequestContext) -> HttpResponse {
    let request_id = ctx.request_id().to_string();
    ctx.set_header("X-Request-Id", &request_id);
    ctx.into_response()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
