//! Request routing.
//!
//! Maps a method and path to an [`Operation`]. The route table is fixed:
//!
//! | Path | Methods |
//! |---|---|
//! | `/todos` | `GET` list, `POST` create |
//! | `/todos/{id}` | `GET` get, `PUT`/`PATCH` update, `DELETE` delete |
//! | `/health` | `GET` |
//! | `/ready` | `GET` |
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use taskd_server::{route, Operation, RouteMatch};
//!
//! let matched = route(&Method::GET, "/todos/7");
//! assert_eq!(
//!     matched,
//!     RouteMatch::Matched { operation: Operation::GetItem, id: Some("7") }
//! );
//! ```

use http::Method;

/// Operations the server dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `GET /todos`
    ListItems,
    /// `POST /todos`
    CreateItem,
    /// `GET /todos/{id}`
    GetItem,
    /// `PUT|PATCH /todos/{id}`
    UpdateItem,
    /// `DELETE /todos/{id}`
    DeleteItem,
    /// `GET /health`
    Health,
    /// `GET /ready`
    Ready,
}

impl Operation {
    /// Operation ID used in logs, metrics and the request context.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::ListItems => "listItems",
            Self::CreateItem => "createItem",
            Self::GetItem => "getItem",
            Self::UpdateItem => "updateItem",
            Self::DeleteItem => "deleteItem",
            Self::Health => "health",
            Self::Ready => "ready",
        }
    }

    /// Returns `true` for probes, which bypass admission.
    #[must_use]
    pub const fn is_probe(self) -> bool {
        matches!(self, Self::Health | Self::Ready)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Result of routing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch<'a> {
    /// A route matched.
    Matched {
        /// The operation to run.
        operation: Operation,
        /// The raw `{id}` segment, for item routes.
        id: Option<&'a str>,
    },
    /// The path exists but not for this method.
    MethodNotAllowed,
    /// No route has this path.
    NotFound,
}

/// Routes `method` and `path`.
///
/// A single trailing slash is ignored. The `{id}` segment is returned
/// unparsed; the handler validates it.
#[must_use]
pub fn route<'a>(method: &Method, path: &'a str) -> RouteMatch<'a> {
    let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(path);
    let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

    let matched = |operation| RouteMatch::Matched { operation, id: None };

    match segments.as_slice() {
        ["todos"] => match *method {
            Method::GET => matched(Operation::ListItems),
            Method::POST => matched(Operation::CreateItem),
            _ => RouteMatch::MethodNotAllowed,
        },
        ["todos", id] if !id.is_empty() => {
            let operation = match *method {
                Method::GET => Operation::GetItem,
                Method::PUT | Method::PATCH => Operation::UpdateItem,
                Method::DELETE => Operation::DeleteItem,
                _ => return RouteMatch::MethodNotAllowed,
            };
            RouteMatch::Matched {
                operation,
                id: Some(id),
            }
        }
        ["health"] if *method == Method::GET => matched(Operation::Health),
        ["ready"] if *method == Method::GET => matched(Operation::Ready),
        ["health" | "ready"] => RouteMatch::MethodNotAllowed,
        _ => RouteMatch::NotFound,
    }
}
