//! Blocking TCP server feeding accepted connections to a fixed worker pool.

use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ServingSettings;

use super::http::{self, HttpError};
use super::routes;
use super::service::InferenceService;

/// Worker and connection limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub workers: usize,
    pub max_body_bytes: usize,
    pub io_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from(&ServingSettings::default())
    }
}

impl From<&ServingSettings> for ServerOptions {
    fn from(settings: &ServingSettings) -> Self {
        Self {
            workers: settings.workers.max(1),
            max_body_bytes: settings.max_body_bytes,
            io_timeout: Duration::from_secs(settings.io_timeout_secs.max(1)),
        }
    }
}

/// Bound listener plus the shared scorer it serves.
pub struct ScoringServer {
    listener: TcpListener,
    service: Arc<InferenceService>,
    options: ServerOptions,
}

/// Background server started by [`ScoringServer::spawn`].
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl ScoringServer {
    pub fn bind(
        addr: impl ToSocketAddrs,
        service: Arc<InferenceService>,
        options: ServerOptions,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            service,
            options,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the process exits.
    pub fn run(self) -> io::Result<()> {
        self.run_until(Arc::new(AtomicBool::new(false)))
    }

    /// Serve on a background thread until the handle is shut down.
    pub fn spawn(self) -> io::Result<ServerHandle> {
        let addr = self.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("attrition-accept".into())
            .spawn(move || self.run_until(flag))?;
        Ok(ServerHandle {
            addr,
            shutdown,
            thread: Some(thread),
        })
    }

    fn run_until(self, shutdown: Arc<AtomicBool>) -> io::Result<()> {
        let addr = self.local_addr()?;
        let (tx, rx) = mpsc::channel::<TcpStream>();
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = Vec::with_capacity(self.options.workers);
        for idx in 0..self.options.workers {
            let rx = Arc::clone(&rx);
            let service = Arc::clone(&self.service);
            let options = self.options.clone();
            workers.push(
                thread::Builder::new()
                    .name(format!("attrition-worker-{idx}"))
                    .spawn(move || worker_loop(&rx, &service, &options))?,
            );
        }
        info!(
            "Scoring server listening on {addr} with {} workers",
            self.options.workers
        );

        for stream in self.listener.incoming() {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            match stream {
                Ok(stream) => {
                    if tx.send(stream).is_err() {
                        warn!("All scoring workers exited; stopping server");
                        break;
                    }
                }
                Err(err) => warn!("Failed to accept connection: {err}"),
            }
        }

        drop(tx);
        for worker in workers {
            let _ = worker.join();
        }
        info!("Scoring server on {addr} stopped");
        Ok(())
    }
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub fn shutdown(mut self) -> io::Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> io::Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.shutdown.store(true, Ordering::Relaxed);
        // Wake the blocking accept so it observes the flag.
        let _ = TcpStream::connect(self.addr);
        thread
            .join()
            .map_err(|_| io::Error::other("scoring server thread panicked"))?
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn worker_loop(
    rx: &Mutex<Receiver<TcpStream>>,
    service: &InferenceService,
    options: &ServerOptions,
) {
    loop {
        let next = match rx.lock() {
            Ok(guard) => guard.recv(),
            Err(_) => return,
        };
        let Ok(stream) = next else {
            return;
        };
        if let Err(err) = handle_connection(stream, service, options) {
            debug!("Connection ended with error: {err}");
        }
    }
}

fn handle_connection(
    stream: TcpStream,
    service: &InferenceService,
    options: &ServerOptions,
) -> io::Result<()> {
    stream.set_read_timeout(Some(options.io_timeout))?;
    stream.set_write_timeout(Some(options.io_timeout))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let response = match http::read_request(&mut reader, options.max_body_bytes) {
        Ok(request) => routes::handle(service, &request),
        Err(HttpError::Io(err)) => return Err(err),
        Err(err @ HttpError::BodyTooLarge { .. }) => {
            let mut response = routes::bad_request(&err);
            response.status = 413;
            response
        }
        Err(err @ HttpError::Malformed(_)) => routes::bad_request(&err),
    };
    http::write_response(&mut writer, &response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::logreg::LogRegModel;
    use std::io::{Read, Write};

    fn server(options: ServerOptions) -> ScoringServer {
        let service = InferenceService::new(LogRegModel {
            coefficients: vec![2.0],
            intercept: -1.0,
            feature_names: vec!["x".into()],
        });
        ScoringServer::bind("127.0.0.1:0", Arc::new(service), options).unwrap()
    }

    fn roundtrip(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(raw.as_bytes()).unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn options_follow_serving_settings() {
        let settings = ServingSettings {
            workers: 0,
            io_timeout_secs: 0,
            ..ServingSettings::default()
        };
        let options = ServerOptions::from(&settings);
        assert_eq!(options.workers, 1);
        assert_eq!(options.io_timeout, Duration::from_secs(1));
        assert_eq!(options.max_body_bytes, settings.max_body_bytes);
    }

    #[test]
    fn serves_predictions_until_shutdown() {
        let handle = server(ServerOptions::default()).spawn().unwrap();
        let body = r#"{"features":[0.5]}"#;
        let raw = format!(
            "POST /predict HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let out = roundtrip(handle.addr(), &raw);
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"), "{out}");
        assert!(out.ends_with(r#""probability":0.5,"status":"success"}"#), "{out}");
        handle.shutdown().unwrap();
    }

    #[test]
    fn malformed_request_gets_json_400() {
        let handle = server(ServerOptions::default()).spawn().unwrap();
        let out = roundtrip(handle.addr(), "nonsense\r\n\r\n");
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{out}");
        assert!(out.contains(r#"{"error":"#), "{out}");
        handle.shutdown().unwrap();
    }

    #[test]
    fn oversized_body_gets_413() {
        let options = ServerOptions {
            max_body_bytes: 8,
            ..ServerOptions::default()
        };
        let handle = server(options).spawn().unwrap();
        let out = roundtrip(
            handle.addr(),
            "POST /predict HTTP/1.1\r\nContent-Length: 64\r\n\r\n",
        );
        assert!(out.starts_with("HTTP/1.1 413 Payload Too Large\r\n"), "{out}");
        handle.shutdown().unwrap();
    }
}
