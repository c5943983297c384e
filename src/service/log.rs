use std::{
   future::{ready, Ready},
   io::Write,
   time::Instant,
};

use actix_web::{
   dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
   Error,
};
use colored::Colorize;
use env_logger::{Builder, Env};
use futures_util::future::LocalBoxFuture;
use log::{info, Level};

/// One line per request: method, path, status and latency.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
   S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
   S::Future: 'static,
   B: 'static,
{
   type Response = ServiceResponse<B>;
   type Error = Error;
   type InitError = ();
   type Transform = LoggerMiddlewareService<S>;
   type Future = Ready<Result<Self::Transform, Self::InitError>>;

   fn new_transform(&self, service: S) -> Self::Future {
      ready(Ok(LoggerMiddlewareService { service }))
   }
}

pub struct LoggerMiddlewareService<S> {
   service: S,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
   S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
   S::Future: 'static,
   B: 'static,
{
   type Response = ServiceResponse<B>;
   type Error = Error;
   type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

   forward_ready!(service);

   fn call(&self, req: ServiceRequest) -> Self::Future {
      let started = Instant::now();
      let line = format!("{} {}", req.method(), req.path());
      let fut = self.service.call(req);

      Box::pin(async move {
         let res = fut.await?;
         info!(
            "{} -> {} ({} ms)",
            line,
            res.status().as_u16(),
            started.elapsed().as_millis()
         );
         Ok(res)
      })
   }
}

fn level_tag(level: Level) -> String {
   let padded = format!("{:<5}", level);
   let tag = padded.as_str();
   match level {
      Level::Error => tag.red().bold(),
      Level::Warn => tag.yellow().bold(),
      Level::Info => tag.green().bold(),
      Level::Debug => tag.blue().bold(),
      Level::Trace => tag.magenta().bold(),
   }
   .to_string()
}

/// Level comes from `RUST_LOG`, `info` when unset.
pub fn init_logger() {
   Builder::from_env(Env::default().default_filter_or("info"))
      .format(|buf, record| {
         writeln!(
            buf,
            "{} {} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            level_tag(record.level()),
            record.target(),
            record.args()
         )
      })
      .init()
}
