//! Path routing
//!
//! A request is routed by exact path match (query string ignored). Paths
//! without an entry use the fallback route.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::routing::{get, MethodRouter};
use axum::Router;
use bytes::Bytes;

use super::handler::{self, Shared};
use crate::error::{Error, Result};
use crate::protocol::constants::{DEFAULT_STATUS_BODY, DEFAULT_VIDEO_PATH};

/// What to serve for a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The live MJPEG stream
    Stream,
    /// A fixed body, after which the connection closes
    Static { content_type: String, body: Bytes },
}

impl Route {
    /// A `text/plain` static route
    pub fn text(body: impl Into<String>) -> Self {
        Route::Static {
            content_type: "text/plain".to_string(),
            body: Bytes::from(body.into()),
        }
    }
}

/// Path to route mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: BTreeMap<String, Route>,
    fallback: Route,
}

impl RouteTable {
    /// Empty table answering every path with `fallback`
    pub fn new(fallback: Route) -> Self {
        Self {
            routes: BTreeMap::new(),
            fallback,
        }
    }

    /// Add or replace the route for `path`
    pub fn route(mut self, path: impl Into<String>, route: Route) -> Self {
        self.routes.insert(path.into(), route);
        self
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, &Route)> {
        self.routes.iter().map(|(path, route)| (path.as_str(), route))
    }

    pub fn fallback(&self) -> &Route {
        &self.fallback
    }

    /// First path (in sort order) that serves the stream
    pub fn stream_path(&self) -> Option<&str> {
        self.routes
            .iter()
            .find(|(_, route)| **route == Route::Stream)
            .map(|(path, _)| path.as_str())
    }

    /// Paths are literal: they start with `/` and carry no capture syntax
    pub fn validate(&self) -> Result<()> {
        for (path, route) in &self.routes {
            if !path.starts_with('/') || path.contains(['{', '}', ':', '*']) {
                return Err(Error::InvalidConfig(format!("invalid route path: {:?}", path)));
            }
            content_type(route)?;
        }
        content_type(&self.fallback)?;
        Ok(())
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(Route::text(DEFAULT_STATUS_BODY)).route(DEFAULT_VIDEO_PATH, Route::Stream)
    }
}

fn content_type(route: &Route) -> Result<Option<HeaderValue>> {
    match route {
        Route::Stream => Ok(None),
        Route::Static { content_type, .. } => HeaderValue::from_str(content_type)
            .map(Some)
            .map_err(|_| Error::InvalidConfig(format!("invalid content type: {:?}", content_type))),
    }
}

fn method_router(route: &Route) -> Result<MethodRouter<Arc<Shared>>> {
    let router = match (route, content_type(route)?) {
        (Route::Static { body, .. }, Some(content_type)) => {
            let body = body.clone();
            get(move |request: Request| handler::fixed(request, content_type.clone(), body.clone()))
        }
        _ => get(handler::stream),
    };
    Ok(router.fallback(handler::method_not_allowed))
}

/// Build the request router for one server instance
pub(crate) fn build(shared: Arc<Shared>) -> Result<Router> {
    let routes = &shared.config.routes;
    routes.validate()?;

    let mut router = Router::new();
    for (path, route) in routes.routes() {
        router = router.route(path, method_router(route)?);
    }

    let router = match (routes.fallback(), content_type(routes.fallback())?) {
        (Route::Static { body, .. }, Some(content_type)) => {
            let body = body.clone();
            router.fallback(move |request: Request| handler::fixed(request, content_type.clone(), body.clone()))
        }
        _ => router.fallback(handler::stream),
    };

    Ok(router.with_state(shared))
}
