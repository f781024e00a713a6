use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    response::Response,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AccountContext;

pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    body: Result<Json<dto::AmountRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services.processor.withdraw(ctx.account(), &body.amount).await {
        Ok(receipt) => dto::ok(receipt),
        Err(e) => errors::transaction_error(e),
    }
}

pub async fn cash_in(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    body: Result<Json<dto::AmountRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services.processor.cash_in(ctx.account(), &body.amount).await {
        Ok(receipt) => dto::ok(receipt),
        Err(e) => errors::transaction_error(e),
    }
}
