/// Success response envelope
///
/// Single-item and mutation endpoints return
/// `{ "success": true, "message"?: "...", "data"?: ... }`. List endpoints put
/// `{ "<items>": [...], "pagination": {...} }` inside `data`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hourglass_shared::models::PageRequest;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            status: StatusCode::CREATED,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// A response carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Pagination block of list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: i64,
    pub items_per_page: u32,
}

impl Pagination {
    pub fn new(page: PageRequest, total_items: i64) -> Self {
        let total_items = total_items.max(0);
        let per_page = i64::from(page.limit);
        let total_pages = (total_items + per_page - 1) / per_page;

        Self {
            current_page: page.page,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total_items,
            items_per_page: page.limit,
        }
    }
}

/// Builds `{ "<key>": items, "pagination": {...} }`
pub fn paginated<T: Serialize>(
    key: &str,
    items: Vec<T>,
    page: PageRequest,
    total: i64,
) -> Result<ApiResponse<Value>, serde_json::Error> {
    let mut data = Map::new();
    data.insert(key.to_string(), serde_json::to_value(items)?);
    data.insert(
        "pagination".to_string(),
        serde_json::to_value(Pagination::new(page, total))?,
    );
    Ok(ApiResponse::ok(Value::Object(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_rounds_up() {
        let page = PageRequest::new(Some(2), Some(10));
        let pagination = Pagination::new(page, 21);
        assert_eq!(pagination.current_page, 2);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.total_items, 21);
        assert_eq!(pagination.items_per_page, 10);

        assert_eq!(Pagination::new(page, 0).total_pages, 0);
        assert_eq!(Pagination::new(page, 20).total_pages, 2);
    }

    #[test]
    fn test_paginated_shape() {
        let response = paginated("projects", vec![1, 2], PageRequest::default(), 2).unwrap();
        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["projects"], serde_json::json!([1, 2]));
        assert_eq!(body["data"]["pagination"]["totalItems"], 2);
        assert_eq!(body["data"]["pagination"]["itemsPerPage"], 10);
        assert!(body.get("message").is_none());
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created(1, "Created").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
