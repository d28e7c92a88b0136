// Invoice handlers
// Resident-facing invoice listing and payment submission, plus the admin
// review surface.

use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        invoice::{Invoice, ReviewInvoiceRequest, VerificationStatus},
        ledger::LedgerEntry,
    },
    utils::{ApiError, ApiResponse},
};

/// GET /api/user/invoices
pub async fn list_my_invoices(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Invoice>>>, ApiError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let invoices = Invoice::list_for_user(&mut conn, auth_user.user_id).await?;

    Ok(ApiResponse::ok(invoices))
}

/// GET /api/user/invoices/{id}
/// A foreign invoice id answers 404, same as a nonexistent one.
pub async fn get_my_invoice(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let invoice = Invoice::find_by_id(&mut conn, invoice_id)
        .await?
        .filter(|inv| inv.user_id == auth_user.user_id)
        .ok_or(ApiError::NotFound)?;

    Ok(ApiResponse::ok(invoice))
}

struct PaymentForm {
    payment_method: String,
    amount: i64,
    receipt: Option<(Vec<u8>, String, String)>, // bytes, content type, extension
}

// The client filename never shapes the storage key beyond a known
// extension; anything else falls back to the content type.
const RECEIPT_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "pdf"];

fn extension_for(content_type: &str, filename: Option<&str>) -> String {
    if let Some(ext) = filename.and_then(|f| f.rsplit('.').next()) {
        let ext = ext.to_ascii_lowercase();
        if RECEIPT_EXTENSIONS.contains(&ext.as_str()) {
            return ext;
        }
    }
    match content_type {
        "image/png" => "png".to_string(),
        "image/jpeg" => "jpg".to_string(),
        "application/pdf" => "pdf".to_string(),
        _ => "bin".to_string(),
    }
}

async fn parse_payment_form(mut multipart: Multipart) -> Result<PaymentForm, ApiError> {
    let mut payment_method = None;
    let mut amount = None;
    let mut receipt = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {}", e)))?
    {
        match field.name() {
            Some("payment_method") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                payment_method = Some(value.trim().to_string());
            }
            Some("amount") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                let parsed: i64 = value.trim().parse().map_err(|_| {
                    ApiError::Validation("Amount must be a whole number of Rupiah".to_string())
                })?;
                amount = Some(parsed);
            }
            Some("receipt") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let filename = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                if !bytes.is_empty() {
                    let ext = extension_for(&content_type, filename.as_deref());
                    receipt = Some((bytes.to_vec(), content_type, ext));
                }
            }
            _ => {}
        }
    }

    let payment_method = payment_method
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::Validation("payment_method is required".to_string()))?;
    let amount =
        amount.ok_or_else(|| ApiError::Validation("amount is required".to_string()))?;
    if amount <= 0 {
        return Err(ApiError::Validation(
            "Payment amount must be positive".to_string(),
        ));
    }

    Ok(PaymentForm {
        payment_method,
        amount,
        receipt,
    })
}

/// POST /api/user/invoices/{id}/payment (multipart)
/// The receipt upload happens before any row mutation; an upload failure
/// aborts the whole request.
pub async fn submit_payment(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(invoice_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let form = parse_payment_form(multipart).await?;

    let receipt_url = match form.receipt {
        Some((bytes, content_type, ext)) => {
            let path = format!(
                "{}/{}/{}.{}",
                auth_user.cluster_id,
                invoice_id,
                Uuid::new_v4(),
                ext
            );
            Some(state.storage_service.upload(&path, bytes, &content_type).await?)
        }
        None => None,
    };

    let invoice = state
        .payment_service
        .submit_payment(
            auth_user.user_id,
            invoice_id,
            form.payment_method,
            form.amount,
            receipt_url,
        )
        .await?;

    Ok(ApiResponse::ok_with_message(
        invoice,
        "Payment submitted for verification",
    ))
}

#[derive(Debug, Deserialize)]
pub struct InvoiceListQuery {
    pub status: Option<String>,
}

/// GET /api/admin/invoices?status=not_checked
pub async fn list_cluster_invoices(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<ApiResponse<Vec<Invoice>>>, ApiError> {
    let verification = match query.status.as_deref() {
        Some(raw) => Some(
            VerificationStatus::from_str(raw)
                .map_err(|_| ApiError::Validation(format!("Unknown status filter: {}", raw)))?,
        ),
        None => None,
    };

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    let invoices =
        Invoice::list_for_cluster(&mut conn, auth_user.cluster_id, verification).await?;

    Ok(ApiResponse::ok(invoices))
}

/// GET /api/admin/invoices/{id}/ledger
pub async fn invoice_ledger(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<LedgerEntry>>>, ApiError> {
    let mut conn = state
        .diesel_pool
        .get()
        .await
        .map_err(|e| ApiError::Database(e.to_string()))?;

    // Confirm the invoice belongs to the admin's cluster first
    Invoice::find_by_id(&mut conn, invoice_id)
        .await?
        .filter(|inv| inv.cluster_id == auth_user.cluster_id)
        .ok_or(ApiError::NotFound)?;

    let entries = LedgerEntry::list_for_invoice(&mut conn, invoice_id).await?;

    Ok(ApiResponse::ok(entries))
}

/// POST /api/admin/invoices/{id}/review
pub async fn review_invoice(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<ReviewInvoiceRequest>,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let invoice = state
        .payment_service
        .review(auth_user.cluster_id, invoice_id, request.decision)
        .await?;

    Ok(ApiResponse::ok_with_message(invoice, "Review recorded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions_pass_through() {
        assert_eq!(extension_for("image/png", Some("receipt.PNG")), "png");
        assert_eq!(extension_for("image/jpeg", Some("bukti.jpeg")), "jpeg");
        assert_eq!(extension_for("application/pdf", Some("kwitansi.pdf")), "pdf");
    }

    #[test]
    fn test_hostile_filename_cannot_shape_the_storage_key() {
        // A slash in the filename tail must not reach the object path
        assert_eq!(extension_for("image/png", Some("x.a/b")), "png");
        assert_eq!(extension_for("application/octet-stream", Some("x.a/b")), "bin");
        assert_eq!(
            extension_for("application/octet-stream", Some("evil.....////")),
            "bin"
        );
    }

    #[test]
    fn test_unknown_extension_falls_back_to_content_type() {
        assert_eq!(extension_for("image/jpeg", Some("photo.exe")), "jpg");
        assert_eq!(extension_for("application/octet-stream", Some("photo.exe")), "bin");
        assert_eq!(extension_for("application/pdf", None), "pdf");
    }
}
