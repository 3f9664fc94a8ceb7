//! Log events emitted by the dispatcher, captured with a scoped JSON
//! subscriber.

use std::io::Write;
use std::sync::{Arc, Mutex};

use hiweb::server::HttpRequest;
use hiweb::{Dispatcher, ParamSpec, RequestContext, WebConfig};
use http::Method;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture<F: FnOnce()>(f: F) -> String {
    let out = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(out.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    out.text()
}

fn dispatcher() -> Dispatcher {
    let mut d = Dispatcher::new(Arc::new(WebConfig::default()));
    d.route("/boom", "GET", vec![], false, |_: &mut RequestContext| -> () {
        panic!("handler exploded");
    })
    .unwrap();
    d.route("/n", "GET", vec![ParamSpec::int("n")], false, |_: &mut RequestContext, _: i64| {})
        .unwrap();
    d.route("/secure", "GET", vec![], true, |_: &mut RequestContext| {})
        .unwrap();
    d
}

#[test]
fn test_panic_is_logged_with_request_id() {
    let d = dispatcher();
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let logs = capture(|| {
        let res = d.dispatch(HttpRequest::new(Method::GET, "/boom").header("X-Request-Id", id));
        assert_eq!(res.status, 400);
    });
    assert!(logs.contains("recovered from handler panic"), "{logs}");
    assert!(logs.contains("handler exploded"), "{logs}");
    assert!(logs.contains(id), "{logs}");
}

#[test]
fn test_bind_failure_and_auth_rejection_are_logged() {
    let d = dispatcher();
    let logs = capture(|| {
        assert_eq!(d.dispatch(HttpRequest::new(Method::GET, "/n?n=x")).status, 400);
        assert_eq!(d.dispatch(HttpRequest::new(Method::GET, "/secure")).status, 401);
    });
    assert!(logs.contains("param err"), "{logs}");
    assert!(logs.contains("convert int failed"), "{logs}");
    assert!(logs.contains("auth rejected"), "{logs}");
}

#[test]
fn test_accepted_request_is_logged_with_fields() {
    let d = dispatcher();
    let logs = capture(|| {
        d.dispatch(
            HttpRequest::new(Method::GET, "/n?n=4")
                .header("Content-Type", "text/plain")
                .peer("192.0.2.7:9000".parse().unwrap()),
        );
    });
    assert!(logs.contains("request accepted"), "{logs}");
    assert!(logs.contains("192.0.2.7"), "{logs}");
    assert!(logs.contains("text/plain"), "{logs}");
}
