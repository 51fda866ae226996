//! Application handler injected into the server.

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::http::request::Request;
use crate::http::response::ResponseWriter;

/// Turns one parsed request into response bytes.
///
/// The handler owns the whole response: it writes the status line, headers
/// and body through the [`ResponseWriter`]. Nothing is returned to the
/// worker; errors are the handler's to report.
///
/// Any `Fn(ResponseWriter, Request) -> impl Future<Output = ()>` closure is
/// a handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, writer: ResponseWriter, request: Request) -> BoxFuture<'static, ()>;
}

impl<F, Fut> Handler for F
where
    F: Fn(ResponseWriter, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, writer: ResponseWriter, request: Request) -> BoxFuture<'static, ()> {
        Box::pin(self(writer, request))
    }
}
