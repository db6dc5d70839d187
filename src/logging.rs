//! Tracing subscriber setup

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::fmt::{format::FmtSpan, MakeWriter};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Targets that log at `info` regardless of the application level, so the
/// per-request spans opened by `TracingLogger` and server start/stop lines
/// are printed without `RUST_LOG`.
const ACCESS_LOG_TARGETS: [&str; 2] = ["tracing_actix_web", "actix_server"];

/// Build the filter: `RUST_LOG` first, then the configured crate level and
/// the access log targets.
pub fn env_filter(logging: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env().add_directive(
        format!("fraud_detection_form={}", logging.level)
            .parse()
            .with_context(|| format!("Invalid log level '{}'", logging.level))?,
    );
    for target in ACCESS_LOG_TARGETS {
        filter = filter.add_directive(format!("{target}=info").parse()?);
    }
    Ok(filter)
}

/// Build a subscriber writing to `writer` in the configured format.
///
/// Span close events are enabled: a request span closing is the access log
/// line, carrying method, route, status and timings.
pub fn subscriber<W>(logging: &LoggingConfig, writer: W) -> Result<Box<dyn Subscriber + Send + Sync>>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(logging)?)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(writer);

    Ok(match logging.format.as_str() {
        "json" => Box::new(builder.json().finish()),
        _ => Box::new(builder.finish()),
    })
}

/// Install the global subscriber, writing to stdout
pub fn init(logging: &LoggingConfig) -> Result<()> {
    subscriber(logging, std::io::stdout)?
        .try_init()
        .context("Failed to install tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_actix_web::TracingLogger;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'w> MakeWriter<'w> for Capture {
        type Writer = Capture;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    fn logging(level: &str, format: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            format: format.to_string(),
        }
    }

    #[::core::prelude::v1::test]
    fn test_filter_rejects_bad_level() {
        assert!(env_filter(&logging("info", "pretty")).is_ok());

        let err = env_filter(&logging("loud", "pretty")).unwrap_err();
        assert!(err.to_string().contains("Invalid log level 'loud'"));
    }

    #[actix_web::test]
    async fn test_request_span_is_logged_on_close() {
        let capture = Capture::default();
        let subscriber = subscriber(&logging("warn", "pretty"), capture.clone()).unwrap();
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = test::init_service(
            App::new()
                .wrap(TracingLogger::default())
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());
        drop(resp);

        let out = capture.contents();
        assert!(out.contains("HTTP request"), "no request span in {out:?}");
        assert!(out.contains("GET"), "no method in {out:?}");
        assert!(out.contains("close"), "no close event in {out:?}");
    }
}
