//! End-to-end tests over a real socket
//!
//! Starts the blocking listener on an ephemeral port and drives it with raw
//! HTTP/1.1 requests, checking that the dispatcher's response reaches the
//! wire intact.

use std::sync::Arc;

use hiweb::{Dispatcher, ParamSpec, RequestContext, WebConfig};
use serde_json::{json, Value};

mod common;
use common::http::{parse_response, send_request};
use common::test_server;

fn service(config: WebConfig) -> Dispatcher {
    let mut d = Dispatcher::new(Arc::new(config));
    d.route(
        "/echo",
        "POST",
        vec![ParamSpec::string("name"), ParamSpec::int("n")],
        false,
        |ctx: &mut RequestContext, name: String, n: i64| {
            ctx.serve_json(200, &json!({ "name": name, "n": n })).unwrap();
        },
    )
    .unwrap();
    d.route("/ip", "GET", vec![], false, |ctx: &mut RequestContext| {
        let ip = ctx.remote_addr();
        ctx.serve_body(200, ip.as_bytes());
    })
    .unwrap();
    d
}

#[test]
fn test_form_post_round_trip() {
    let (handle, addr) = test_server::start(service(WebConfig::default()));
    let body = "name=ann&n=3";
    let raw = send_request(
        &addr,
        &format!(
            "POST /echo HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        ),
    );
    handle.stop();

    let res = parse_response(&raw);
    assert_eq!(res.status, 200);
    assert_eq!(res.header("access-control-allow-origin"), Some("*"));
    assert!(res.header("x-request-id").is_some());
    let v: Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(v, json!({ "name": "ann", "n": 3 }));
}

#[test]
fn test_unknown_path_over_socket() {
    let (handle, addr) = test_server::start(service(WebConfig::default()));
    let raw = send_request(
        &addr,
        "GET /nope HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
    );
    handle.stop();
    let res = parse_response(&raw);
    assert_eq!(res.status, 404);
    assert_eq!(res.body_str(), "404 page not found\n");
}

#[test]
fn test_peer_address_is_visible_to_handlers() {
    let (handle, addr) = test_server::start(service(WebConfig::default()));
    let raw = send_request(&addr, "GET /ip HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
    let forwarded = send_request(
        &addr,
        "GET /ip HTTP/1.1\r\nHost: x\r\nConnection: close\r\nX-Forwarded-For: 203.0.113.9\r\n\r\n",
    );
    handle.stop();
    assert_eq!(parse_response(&raw).body_str(), "127.0.0.1");
    assert_eq!(parse_response(&forwarded).body_str(), "203.0.113.9");
}

#[test]
fn test_oversized_body_is_413() {
    let mut config = WebConfig::default();
    config.max_body_bytes = 16;
    config.max_multipart_bytes = 16;
    let (handle, addr) = test_server::start(service(config));
    let body = "name=".to_string() + &"a".repeat(64);
    let raw = send_request(
        &addr,
        &format!(
            "POST /echo HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        ),
    );
    handle.stop();
    assert_eq!(parse_response(&raw).status, 413);
}
