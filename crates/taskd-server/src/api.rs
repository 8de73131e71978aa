//! Item endpoints.
//!
//! Decodes payloads, runs boundary validation, calls the [`ItemService`] and
//! encodes the success response. Failures are returned as [`ItemError`] for
//! the server to classify.

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::Serialize;

use taskd_core::{
    parse_item_id, CreateItemRequest, ErrorResponse, ItemError, ItemResult, RequestContext,
    UpdateItemRequest,
};
use taskd_service::ItemService;

use crate::router::Operation;

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// Runs an item operation.
///
/// `id` is the raw `{id}` path segment for item routes.
pub(crate) fn dispatch(
    service: &ItemService,
    ctx: &RequestContext,
    operation: Operation,
    id: Option<&str>,
    body: &[u8],
) -> ItemResult<HttpResponse> {
    match operation {
        Operation::ListItems => {
            let items = service.list_all(ctx)?;
            json_response(StatusCode::OK, &items)
        }
        Operation::CreateItem => {
            let request: CreateItemRequest = decode(body)?;
            request.validate()?;
            let item = service.create(ctx, request.title, request.description)?;
            json_response(StatusCode::CREATED, &item)
        }
        Operation::GetItem => {
            let id = parse_item_id(id.unwrap_or_default())?;
            let item = service.get_by_id(ctx, id)?;
            json_response(StatusCode::OK, &item)
        }
        Operation::UpdateItem => {
            let id = parse_item_id(id.unwrap_or_default())?;
            let request: UpdateItemRequest = decode(body)?;
            request.validate()?;
            let item = service.update(ctx, id, &request.into_patch())?;
            json_response(StatusCode::OK, &item)
        }
        Operation::DeleteItem => {
            let id = parse_item_id(id.unwrap_or_default())?;
            service.delete(ctx, id)?;
            Ok(empty_response(StatusCode::NO_CONTENT))
        }
        Operation::Health | Operation::Ready => Err(ItemError::internal(format!(
            "{operation} is not an item operation"
        ))),
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> ItemResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ItemError::invalid_field("body", format!("invalid JSON: {e}")))
}

/// Serializes `value` as a JSON response.
pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> ItemResult<HttpResponse> {
    let body = serde_json::to_vec(value)
        .map_err(|e| ItemError::internal_with_source("failed to encode response", e))?;
    Ok(with_json_body(status, body))
}

/// Builds the response for a classified failure.
pub(crate) fn error_response(error: &ErrorResponse) -> HttpResponse {
    with_json_body(error.status(), error.to_json())
}

/// Builds a `{"error": message}` response outside the classifier, for
/// routing and admission refusals.
pub(crate) fn message_response(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message });
    with_json_body(status, body.to_string().into_bytes())
}

pub(crate) fn empty_response(status: StatusCode) -> HttpResponse {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn with_json_body(status: StatusCode, body: Vec<u8>) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http_body_util::BodyExt;
    use taskd_core::{ErrorKind, Item};
    use taskd_store::MemoryStore;

    use super::*;

    fn service() -> ItemService {
        ItemService::new(Arc::new(MemoryStore::new()))
    }

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_created_item() {
        let service = service();
        let ctx = RequestContext::new();
        let response = dispatch(
            &service,
            &ctx,
            Operation::CreateItem,
            None,
            br#"{"title":"Learn Rust","description":"Read the book","completed":true}"#,
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "application/json"
        );
        let json = body_json(response).await;
        assert_eq!(json["id"], 1);
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn test_create_validation_rejected_before_store() {
        let service = service();
        let ctx = RequestContext::new();
        let err = dispatch(&service, &ctx, Operation::CreateItem, None, br#"{"title":""}"#)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.field_errors().unwrap().contains("title"));
        assert!(service.list_all(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_body_is_validation_error() {
        let service = service();
        let ctx = RequestContext::new();
        let err = dispatch(&service, &ctx, Operation::CreateItem, None, b"{not json").unwrap_err();
        assert!(err.field_errors().unwrap().contains("body"));

        let err = dispatch(&service, &ctx, Operation::UpdateItem, Some("1"), b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_bad_id_is_validation_error() {
        let service = service();
        let ctx = RequestContext::new();
        let err = dispatch(&service, &ctx, Operation::GetItem, Some("abc"), b"").unwrap_err();
        assert!(err.field_errors().unwrap().contains("id"));

        let err = dispatch(&service, &ctx, Operation::DeleteItem, Some("0"), b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = service();
        let ctx = RequestContext::new();
        service.create(&ctx, "Write tests", None).unwrap();

        let response = dispatch(
            &service,
            &ctx,
            Operation::UpdateItem,
            Some("1"),
            br#"{"completed":true}"#,
        )
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let item: Item = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(item.title, "Write tests");
        assert!(item.completed);

        let response = dispatch(&service, &ctx, Operation::DeleteItem, Some("1"), b"").unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(http::header::CONTENT_TYPE).is_none());

        let err = dispatch(&service, &ctx, Operation::GetItem, Some("1"), b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_is_ordered() {
        let service = service();
        let ctx = RequestContext::new();
        for title in ["first", "second", "third"] {
            service.create(&ctx, title, None).unwrap();
        }

        let response = dispatch(&service, &ctx, Operation::ListItems, None, b"").unwrap();
        let json = body_json(response).await;
        let ids: Vec<u64> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_message_response_shape() {
        let response = message_response(StatusCode::NOT_FOUND, "route not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "route not found"})
        );
    }
}
