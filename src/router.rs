//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Shared state travels
//! with the router as typed extensions and is copied into every request.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Extensions, Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    extensions: Extensions,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), extensions: Extensions::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use stowage::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_file(_: Request) -> Response { Response::text("") }
    /// # async fn delete_file(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,    "/upload/files/{stored_name}", get_file)
    ///     .on(Method::DELETE, "/upload/files/{stored_name}", delete_file);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics on a malformed or conflicting route. Routes are static, so this
    /// surfaces at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Attach shared state, readable from handlers via
    /// [`Request::extension`]. Cloned once per request, so wrap large values
    /// in an `Arc`.
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Routes one request and produces one response.
    ///
    /// Unknown paths get `404`; a path registered only under other methods
    /// gets `405` with an `allow` header.
    pub async fn handle(&self, mut req: Request) -> Response {
        let Some((handler, params)) = self.lookup(req.method(), req.path()) else {
            return self.fallback(&req);
        };

        req.set_params(params);
        req.extensions_mut().extend(self.extensions.clone());
        handler.call(req).await
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn fallback(&self, req: &Request) -> Response {
        let mut allowed: Vec<&str> = self.routes.iter()
            .filter(|(_, tree)| tree.at(req.path()).is_ok())
            .map(|(method, _)| method.as_str())
            .collect();

        if allowed.is_empty() {
            return Response::status(StatusCode::NOT_FOUND);
        }

        allowed.sort_unstable();
        Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header("allow", &allowed.join(", "))
            .no_body()
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http_body_util::Full;

    use super::*;

    fn request(method: Method, uri: &str) -> Request {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap();
        Request::from_http(req)
    }

    async fn echo_param(req: Request) -> String {
        req.param("name").unwrap_or_default().to_owned()
    }

    #[derive(Clone)]
    struct Greeting(&'static str);

    async fn greet(req: Request) -> String {
        req.extension::<Greeting>().map(|g| g.0).unwrap_or("none").to_owned()
    }

    #[tokio::test]
    async fn routes_by_method_and_path() {
        let router = Router::new().on(Method::GET, "/things/{name}", echo_param);

        let res = router.handle(request(Method::GET, "/things/lamp")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.into_bytes().await.unwrap(), Bytes::from_static(b"lamp"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let router = Router::new().on(Method::GET, "/things/{name}", echo_param);
        let res = router.handle(request(Method::GET, "/nope")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_lists_allowed_ones() {
        let router = Router::new()
            .on(Method::GET, "/things/{name}", echo_param)
            .on(Method::DELETE, "/things/{name}", echo_param);

        let res = router.handle(request(Method::POST, "/things/lamp")).await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("DELETE, GET"));
    }

    #[tokio::test]
    async fn extensions_reach_handlers() {
        let router = Router::new()
            .on(Method::GET, "/greet", greet)
            .extension(Greeting("hello"));

        let res = router.handle(request(Method::GET, "/greet")).await;
        assert_eq!(res.into_bytes().await.unwrap(), Bytes::from_static(b"hello"));
    }
}
