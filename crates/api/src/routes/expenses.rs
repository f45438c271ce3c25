//! Expense routes.
//!
//! Handlers translate HTTP into calls on the expense engine. Notifications
//! produced by a successful write are handed to the relay after the engine
//! has returned, so delivery never delays or fails the response.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use expensa_core::expense::{
    ApprovalAction, ApprovalActionInput, EditExpenseInput, ExpenseNotification, ListFilter,
    SubmitExpenseInput,
};
use expensa_shared::types::{ExpenseDetailId, ExpenseId};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(submit_expense).get(list_expenses))
        .route("/expenses/summary", get(summarize_expenses))
        .route(
            "/expenses/{id}",
            get(get_expense).patch(edit_expense).delete(delete_expense),
        )
        .route("/expenses/{id}/approval", post(decide_expense))
        .route("/expense-details/{id}", get(get_expense_detail))
}

/// Request body for an approval decision.
#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    /// `approve` or `reject`.
    pub action: ApprovalAction,
    /// Required when rejecting.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

fn dispatch(state: &AppState, notification: Option<ExpenseNotification>) {
    let _ = state.notifications.fire_opt(notification);
}

/// POST `/expenses` - Submit an expense.
async fn submit_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<SubmitExpenseInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let outcome = state.expenses.submit(input, auth.actor_id()).await?;
    dispatch(&state, outcome.notification());
    Ok((StatusCode::CREATED, Json(outcome.expense)))
}

/// GET `/expenses` - One page of expenses, newest first.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<ListFilter>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(filter) = query?;
    let page = state.expenses.list(&filter, auth.actor_id()).await?;
    Ok(Json(page))
}

/// GET `/expenses/summary` - Totals for every expense matching the filter.
async fn summarize_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    query: Result<Query<ListFilter>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(filter) = query?;
    let summary = state.expenses.summarize(&filter, auth.actor_id()).await?;
    Ok(Json(summary))
}

/// GET `/expenses/{id}` - One expense by record ID.
async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<ExpenseId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.expenses.get(id, auth.actor_id()).await?))
}

/// GET `/expense-details/{id}` - One expense by detail ID.
async fn get_expense_detail(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<ExpenseDetailId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.expenses.get_by_detail(id, auth.actor_id()).await?))
}

/// PATCH `/expenses/{id}` - Replace the editable fields of an expense.
async fn edit_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<ExpenseId>, PathRejection>,
    payload: Result<Json<SubmitExpenseInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(record_id) = id?;
    let Json(fields) = payload?;
    let outcome = state
        .expenses
        .edit(EditExpenseInput { record_id, fields }, auth.actor_id())
        .await?;
    dispatch(&state, outcome.notification());
    Ok(Json(outcome.expense))
}

/// DELETE `/expenses/{id}` - Remove both rows of an expense.
async fn delete_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<ExpenseId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.expenses.delete(id, auth.actor_id()).await?))
}

/// POST `/expenses/{id}/approval` - Approve or reject a pending expense.
async fn decide_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<ExpenseId>, PathRejection>,
    payload: Result<Json<ApprovalRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(record_id) = id?;
    let Json(request) = payload?;
    let input = ApprovalActionInput {
        record_id,
        action: request.action,
        rejection_reason: request.rejection_reason,
    };
    let outcome = state.expenses.decide(input, auth.actor_id()).await?;
    dispatch(&state, outcome.notification());
    Ok(Json(outcome.expense))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use rstest::rstest;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{AppState, create_router};
    use expensa_core::expense::memory::{
        InMemoryExpenseStore, RecordingDispatcher, StaticRoleResolver,
    };
    use expensa_core::expense::{ExpenseNotification, ExpenseService, NotificationRelay};
    use expensa_shared::types::ActorId;
    use expensa_shared::{JwtConfig, JwtService};

    struct Harness {
        app: Router,
        jwt: Arc<JwtService>,
        admin: ActorId,
        approver: ActorId,
        outsider: ActorId,
        sent: Arc<RecordingDispatcher>,
    }

    impl Harness {
        fn new() -> Self {
            let admin = ActorId::new();
            let approver = ActorId::new();
            let roles = StaticRoleResolver::new()
                .with_financial_admin(admin)
                .with_top_level(approver);
            let sent = Arc::new(RecordingDispatcher::new());
            let jwt = Arc::new(JwtService::new(&JwtConfig {
                secret: "route-test-secret".to_string(),
                access_token_expiry_secs: 900,
            }));

            let state = AppState {
                jwt_service: Arc::clone(&jwt),
                expenses: Arc::new(ExpenseService::new(
                    Arc::new(InMemoryExpenseStore::new()),
                    Arc::new(roles),
                )),
                notifications: Arc::new(NotificationRelay::new(sent.clone())),
            };

            Self {
                app: create_router(state),
                jwt,
                admin,
                approver,
                outsider: ActorId::new(),
                sent,
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            actor: Option<ActorId>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(actor) = actor {
                let token = self.jwt.generate_access_token(actor).unwrap();
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn submit(&self, actor: ActorId, amount: &str) -> Value {
            let (status, body) = self
                .call(Method::POST, "/api/v1/expenses", Some(actor), Some(expense(amount)))
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body
        }

        async fn notifications(&self) -> Vec<ExpenseNotification> {
            for _ in 0..20 {
                tokio::task::yield_now().await;
            }
            self.sent.sent()
        }
    }

    fn expense(amount: &str) -> Value {
        json!({
            "title": "Client dinner",
            "amount": amount,
            "category": "meals",
            "expense_date": "2026-09-14",
            "payment_method": "card"
        })
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let h = Harness::new();
        let (status, body) = h.call(Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let h = Harness::new();
        let (status, body) = h
            .call(Method::POST, "/api/v1/expenses", None, Some(expense("10")))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHENTICATED");
    }

    #[rstest]
    #[case::garbage(false)]
    #[case::foreign_secret(true)]
    #[tokio::test]
    async fn test_invalid_token_is_unauthenticated(#[case] signed: bool) {
        let h = Harness::new();
        let token = if signed {
            JwtService::new(&JwtConfig {
                secret: "some-other-secret".to_string(),
                access_token_expiry_secs: 900,
            })
            .generate_access_token(h.admin)
            .unwrap()
        } else {
            "not-a-jwt".to_string()
        };
        let request = Request::builder()
            .uri("/api/v1/expenses")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "UNAUTHENTICATED");
    }

    #[rstest]
    #[case("4999.99", "auto_approved", false)]
    #[case("5000", "pending", true)]
    #[tokio::test]
    async fn test_admin_submission_is_classified(
        #[case] amount: &str,
        #[case] status: &str,
        #[case] notifies: bool,
    ) {
        let h = Harness::new();
        let body = h.submit(h.admin, amount).await;

        assert_eq!(body["approval_status"], status);
        assert_eq!(body["record_type"], "contractor_expense");
        assert_eq!(body["contractor_id"], json!(h.admin));
        assert_eq!(body["created_by"], json!(h.admin));

        let sent = h.notifications().await;
        assert_eq!(sent.len(), usize::from(notifies));
        if notifies {
            assert_eq!(sent[0].kind(), "approval_requested");
        }
    }

    #[tokio::test]
    async fn test_top_level_submission_is_self_approved() {
        let h = Harness::new();
        let body = h.submit(h.approver, "20000").await;

        assert_eq!(body["approval_status"], "approved");
        assert_eq!(body["record_type"], "company_expense");
        assert_eq!(body["approved_by"], json!(h.approver));
        assert!(h.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_outsider_is_forbidden() {
        let h = Harness::new();
        let (status, body) = h
            .call(Method::POST, "/api/v1/expenses", Some(h.outsider), Some(expense("10")))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_a_validation_error() {
        let h = Harness::new();
        let (status, body) = h
            .call(Method::POST, "/api/v1/expenses", Some(h.admin), Some(expense("0")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_shape() {
        let h = Harness::new();
        let (status, body) = h
            .call(Method::POST, "/api/v1/expenses", Some(h.admin), Some(json!([1, 2])))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_record_and_detail_lookups_agree() {
        let h = Harness::new();
        let created = h.submit(h.admin, "120").await;
        let id = created["id"].as_str().unwrap();
        let detail_id = created["detail_id"].as_str().unwrap();

        let (status, by_record) = h
            .call(Method::GET, &format!("/api/v1/expenses/{id}"), Some(h.admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, by_detail) = h
            .call(
                Method::GET,
                &format!("/api/v1/expense-details/{detail_id}"),
                Some(h.admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_record, by_detail);
    }

    #[tokio::test]
    async fn test_reject_then_notify_submitter() {
        let h = Harness::new();
        let created = h.submit(h.admin, "7500").await;
        let id = created["id"].as_str().unwrap();
        let uri = format!("/api/v1/expenses/{id}/approval");

        let (status, body) = h
            .call(
                Method::POST,
                &uri,
                Some(h.approver),
                Some(json!({ "action": "reject", "rejection_reason": "No receipt" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["approval_status"], "rejected");
        assert_eq!(body["rejection_reason"], "No receipt");

        let sent = h.notifications().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].kind(), "expense_rejected");

        let (status, body) = h
            .call(Method::POST, &uri, Some(h.approver), Some(json!({ "action": "approve" })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "INVALID_STATE_TRANSITION");
    }

    #[tokio::test]
    async fn test_admin_cannot_approve() {
        let h = Harness::new();
        let created = h.submit(h.admin, "7500").await;
        let id = created["id"].as_str().unwrap();

        let (status, _) = h
            .call(
                Method::POST,
                &format!("/api/v1/expenses/{id}/approval"),
                Some(h.admin),
                Some(json!({ "action": "approve" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_edit_reclassifies_and_approved_locks() {
        let h = Harness::new();
        let created = h.submit(h.admin, "7500").await;
        let id = created["id"].as_str().unwrap();
        let uri = format!("/api/v1/expenses/{id}");

        let (status, body) = h
            .call(Method::PATCH, &uri, Some(h.admin), Some(expense("300")))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["approval_status"], "auto_approved");
        assert_eq!(body["edit_history"].as_array().unwrap().len(), 1);

        let (status, body) = h
            .call(Method::PATCH, &uri, Some(h.admin), Some(expense("9000")))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["approval_status"], "pending");
        assert_eq!(body["approved_by"], Value::Null);
        assert_eq!(body["edit_history"].as_array().unwrap().len(), 2);

        let (status, _) = h
            .call(
                Method::POST,
                &format!("{uri}/approval"),
                Some(h.approver),
                Some(json!({ "action": "approve" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = h
            .call(Method::PATCH, &uri, Some(h.admin), Some(expense("400")))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "INVALID_STATE_TRANSITION");
    }

    #[tokio::test]
    async fn test_delete_removes_both_rows() {
        let h = Harness::new();
        let created = h.submit(h.admin, "50").await;
        let id = created["id"].as_str().unwrap();
        let detail_id = created["detail_id"].as_str().unwrap();
        let uri = format!("/api/v1/expenses/{id}");

        let (status, _) = h.call(Method::DELETE, &uri, Some(h.admin), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = h.call(Method::DELETE, &uri, Some(h.approver), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = h.call(Method::GET, &uri, Some(h.admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "EXPENSE_NOT_FOUND");

        let (status, _) = h
            .call(
                Method::GET,
                &format!("/api/v1/expense-details/{detail_id}"),
                Some(h.admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summary_ignores_pagination() {
        let h = Harness::new();
        for amount in ["100", "200", "6000"] {
            h.submit(h.admin, amount).await;
        }

        let (status, page) = h
            .call(Method::GET, "/api/v1/expenses?page_size=1", Some(h.admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
        assert_eq!(page["total_count"], 3);

        let (status, summary) = h
            .call(
                Method::GET,
                "/api/v1/expenses/summary?page_size=1",
                Some(h.admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["total_amount"], "6300");
        assert_eq!(summary["per_status_amount"]["pending"], "6000");
        assert_eq!(summary["per_status_amount"]["auto_approved"], "300");
    }

    #[tokio::test]
    async fn test_summary_filters_by_status() {
        let h = Harness::new();
        h.submit(h.admin, "100").await;
        h.submit(h.admin, "6000").await;

        let (status, summary) = h
            .call(
                Method::GET,
                "/api/v1/expenses/summary?approval_status=pending",
                Some(h.admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["total_amount"], "6000");
        assert_eq!(summary["total_count"], 1);
    }
}
