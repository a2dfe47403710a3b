//! `POST /v1/token/consume` — dispatches to `ConsumeTxnManager` by phase
//! (§4.5, §6).

use axum::extract::{Extension, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::AuthenticatedToken;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ConsumeRequest {
    Pre {
        amount: i64,
        reason: String,
        timeout_s: Option<u64>,
    },
    Post {
        txn_id: String,
        final_amount: Option<i64>,
        elapsed_ms: Option<u64>,
    },
    Cancel {
        txn_id: String,
    },
    Single {
        amount: i64,
        reason: String,
    },
}

#[derive(Serialize)]
pub struct TxnView {
    pub transaction_id: String,
    pub status: &'static str,
    pub pre_quota: i64,
    pub final_quota: Option<i64>,
}

impl From<relay_billing::ConsumeTransaction> for TxnView {
    fn from(txn: relay_billing::ConsumeTransaction) -> Self {
        let status = match txn.status {
            relay_billing::TxnStatus::Pending => "pending",
            relay_billing::TxnStatus::Confirmed => "confirmed",
            relay_billing::TxnStatus::Canceled => "canceled",
            relay_billing::TxnStatus::AutoConfirmed => "auto_confirmed",
        };
        Self {
            transaction_id: txn.transaction_id,
            status,
            pre_quota: txn.pre_quota,
            final_quota: txn.final_quota,
        }
    }
}

pub async fn consume_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    Json(request): Json<ConsumeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match request {
        ConsumeRequest::Pre { amount, reason, timeout_s } => {
            let (txn_id, remain_quota) = state
                .billing
                .pre(auth.token_id, auth.user_id, amount, reason, timeout_s, &state.config)?;
            Ok(Json(json!({ "txn_id": txn_id, "remain_quota": remain_quota })))
        }
        ConsumeRequest::Post { txn_id, final_amount, elapsed_ms } => {
            let txn = state.billing.post(&txn_id, final_amount, elapsed_ms)?;
            Ok(Json(serde_json::to_value(TxnView::from(txn)).unwrap()))
        }
        ConsumeRequest::Cancel { txn_id } => {
            let txn = state.billing.cancel(&txn_id)?;
            Ok(Json(serde_json::to_value(TxnView::from(txn)).unwrap()))
        }
        ConsumeRequest::Single { amount, reason } => {
            let txn = state
                .billing
                .single(auth.token_id, auth.user_id, amount, reason, &state.config)?;
            Ok(Json(serde_json::to_value(TxnView::from(txn)).unwrap()))
        }
    }
}
