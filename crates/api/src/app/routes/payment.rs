use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    response::Response,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AccountContext;

/// Create a payment request the caller wants to be paid.
pub async fn request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    body: Result<Json<dto::AmountRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services.processor.request_payment(ctx.account(), &body.amount).await {
        Ok(receipt) => dto::ok(receipt),
        Err(e) => errors::transaction_error(e),
    }
}

/// Pay somebody else's payment request.
pub async fn send(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    body: Result<Json<dto::ProcessPaymentRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services
        .processor
        .process_payment(ctx.account(), &body.transaction_id)
        .await
    {
        Ok(receipt) => dto::ok(receipt),
        Err(e) => errors::transaction_error(e),
    }
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    body: Result<Json<dto::TransferRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services
        .processor
        .transfer(ctx.account(), &body.recipient_identifier, &body.amount)
        .await
    {
        Ok(receipt) => dto::ok(receipt),
        Err(e) => errors::transaction_error(e),
    }
}
