#![allow(dead_code)]

pub mod http {
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Send a raw request and read until the server closes the connection.
    pub fn send_request(addr: &SocketAddr, req: &str) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 4096];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        buf
    }

    pub struct RawResponse {
        pub status: u16,
        /// Lower-cased header names
        pub headers: HashMap<String, String>,
        pub body: Vec<u8>,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
        }

        pub fn body_str(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    pub fn parse_response(raw: &[u8]) -> RawResponse {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("header terminator");
        let head = String::from_utf8_lossy(&raw[..split]).into_owned();
        let body = raw[split + 4..].to_vec();
        let mut status = 0;
        let mut headers = HashMap::new();
        for line in head.lines() {
            if line.starts_with("HTTP/1.") {
                status = line.split_whitespace().nth(1).unwrap_or("0").parse().unwrap();
            } else if let Some((name, val)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), val.trim().to_string());
            }
        }
        RawResponse {
            status,
            headers,
            body,
        }
    }
}

pub mod test_server {
    use hiweb::server::{HttpServer, ServerHandle};
    use hiweb::Dispatcher;
    use std::net::SocketAddr;

    /// Start `dispatcher` on an ephemeral loopback port.
    pub fn start(dispatcher: Dispatcher) -> (ServerHandle, SocketAddr) {
        let handle = HttpServer::new(dispatcher)
            .with_workers(2)
            .start("127.0.0.1:0")
            .unwrap();
        handle.wait_ready().unwrap();
        let addr = handle.local_addr();
        (handle, addr)
    }
}
