//! Canned JSON bodies served in mock mode.
//!
//! Shapes mirror the real todo API: `{success, message?, data}` envelopes
//! around tasks, categories, feedback and analytics.

use serde_json::{json, Value};

use crate::http::ApiRequest;

/// Last non-empty path segment, used to echo resource IDs.
fn path_id(request: &ApiRequest) -> String {
    request
        .path()
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("0")
        .to_string()
}

/// String field from the JSON body, or a fallback.
fn body_str(request: &ApiRequest, field: &str, fallback: &str) -> String {
    request
        .json_body()
        .and_then(|body| body.get(field).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| fallback.to_string())
}

fn sample_task(id: &str, title: &str, completed: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "Mock task generated for development",
        "completed": completed,
        "priority": "medium",
        "categoryId": "cat-1",
        "dueDate": "2026-11-01T09:00:00Z",
        "createdAt": "2026-10-01T08:00:00Z",
        "updatedAt": "2026-10-02T08:00:00Z"
    })
}

pub fn login(request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "message": "OTP sent successfully",
        "data": {
            "phone": body_str(request, "phone", "+15550100"),
            "otpExpiresIn": 300
        }
    })
}

pub fn verify_otp(request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "message": "OTP verified successfully",
        "data": {
            "accessToken": "mock-access-token",
            "refreshToken": "mock-refresh-token",
            "expiresIn": 3600,
            "user": {
                "id": "user-1",
                "phone": body_str(request, "phone", "+15550100"),
                "name": "Mock User"
            }
        }
    })
}

pub fn logout(_request: &ApiRequest) -> Value {
    json!({ "success": true, "message": "Logged out successfully" })
}

pub fn profile(_request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "data": {
            "id": "user-1",
            "phone": "+15550100",
            "name": "Mock User",
            "createdAt": "2026-01-15T10:00:00Z"
        }
    })
}

pub fn task_list(_request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "data": {
            "tasks": [
                sample_task("task-1", "Buy groceries", false),
                sample_task("task-2", "Finish quarterly report", true),
                sample_task("task-3", "Book dentist appointment", false)
            ],
            "pagination": { "page": 1, "limit": 20, "total": 3, "totalPages": 1 }
        }
    })
}

pub fn task_detail(request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "data": sample_task(&path_id(request), "Buy groceries", false)
    })
}

pub fn task_create(request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "message": "Task created successfully",
        "data": sample_task("task-new", &body_str(request, "title", "New task"), false)
    })
}

pub fn task_update(request: &ApiRequest) -> Value {
    let title = body_str(request, "title", "Updated task");
    let completed = request
        .json_body()
        .and_then(|body| body.get("completed").and_then(Value::as_bool))
        .unwrap_or(false);

    json!({
        "success": true,
        "message": "Task updated successfully",
        "data": sample_task(&path_id(request), &title, completed)
    })
}

pub fn task_delete(request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "message": "Task deleted successfully",
        "data": { "id": path_id(request) }
    })
}

pub fn task_analytics(_request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "data": {
            "totalTasks": 24,
            "completedTasks": 15,
            "pendingTasks": 7,
            "overdueTasks": 2,
            "completionRate": 62.5,
            "byCategory": [
                { "categoryId": "cat-1", "name": "Personal", "total": 10, "completed": 7 },
                { "categoryId": "cat-2", "name": "Work", "total": 14, "completed": 8 }
            ],
            "byPriority": { "high": 5, "medium": 12, "low": 7 },
            "weeklyTrend": [
                { "week": "2026-W39", "created": 6, "completed": 4 },
                { "week": "2026-W40", "created": 8, "completed": 5 },
                { "week": "2026-W41", "created": 10, "completed": 6 }
            ]
        }
    })
}

pub fn task_bulk(request: &ApiRequest) -> Value {
    let body = request.json_body();
    let processed = body
        .as_ref()
        .and_then(|b| b.get("ids").and_then(Value::as_array).map(Vec::len))
        .unwrap_or(0);
    let operation = body
        .as_ref()
        .and_then(|b| b.get("operation").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "update".to_string());

    json!({
        "success": true,
        "message": "Bulk operation completed",
        "data": {
            "operation": operation,
            "processed": processed,
            "succeeded": processed,
            "failed": 0,
            "errors": []
        }
    })
}

pub fn category_list(_request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "data": [
            { "id": "cat-1", "name": "Personal", "color": "#4CAF50", "taskCount": 10 },
            { "id": "cat-2", "name": "Work", "color": "#2196F3", "taskCount": 14 }
        ]
    })
}

pub fn category_create(request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "message": "Category created successfully",
        "data": {
            "id": "cat-new",
            "name": body_str(request, "name", "New category"),
            "color": body_str(request, "color", "#9E9E9E"),
            "taskCount": 0
        }
    })
}

pub fn feedback_create(request: &ApiRequest) -> Value {
    json!({
        "success": true,
        "message": "Feedback submitted successfully",
        "data": {
            "id": "feedback-1",
            "message": body_str(request, "message", ""),
            "rating": request
                .json_body()
                .and_then(|b| b.get("rating").and_then(Value::as_u64))
                .unwrap_or(5),
            "createdAt": "2026-10-19T12:00:00Z"
        }
    })
}

pub fn not_found(request: &ApiRequest) -> Value {
    json!({
        "success": false,
        "error": {
            "code": "NOT_FOUND",
            "message": format!("No mock registered for {} {}", request.method(), request.path())
        }
    })
}
