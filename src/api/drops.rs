/// Drop endpoints: list, locate, upload
use crate::{
    context::AppContext,
    drops::models::{Confidence, Drop},
    drops::service::{UploadImage, UploadRequest},
    error::{DropError, DropResult},
    location::ResolveStatus,
};
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build drop routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/drops", get(list_drops))
        .route("/api/locate", post(locate))
        .route("/api/upload", post(upload))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    visitor: Option<String>,
}

/// GET /api/drops — all drops, optionally filtered to one visitor
async fn list_drops(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> DropResult<Json<Vec<Drop>>> {
    let drops = ctx
        .query_service
        .list_drops(visitor_filter(params.visitor.as_deref()))
        .await?;
    Ok(Json(drops))
}

/// An empty `visitor` value means no filter, not "match records with an
/// empty visitor id" (which every migrated legacy record has).
fn visitor_filter(raw: Option<&str>) -> Option<&str> {
    raw.filter(|v| !v.is_empty())
}

/// Response body for location resolution; always best-effort, never a
/// hard failure once the input itself is acceptable
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocateResponse {
    lat: f64,
    lng: f64,
    location_name: String,
    confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_path: Option<String>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// POST /api/locate — resolve a location for an uploaded photo
async fn locate(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> DropResult<Json<LocateResponse>> {
    let form = parse_form(multipart).await?;

    let image = form
        .image
        .filter(|img| !img.data.is_empty())
        .ok_or_else(|| DropError::Validation("No image uploaded.".to_string()))?;
    ctx.blob_store.check_size(image.data.len())?;

    let resolution = ctx
        .resolver
        .resolve_image(
            &image.data,
            image.original_name.as_deref(),
            image.content_type.as_deref(),
        )
        .await;

    let (status, reason) = match resolution.status {
        ResolveStatus::Ok => ("ok", None),
        ResolveStatus::Fallback { reason } => ("fallback", Some(reason)),
    };

    Ok(Json(LocateResponse {
        lat: resolution.location.lat,
        lng: resolution.location.lng,
        location_name: resolution.location.location_name,
        confidence: resolution.location.confidence,
        image_path: resolution.location.image_path,
        status,
        reason,
    }))
}

/// POST /api/upload — persist a drop
///
/// Partial success (image stored, record not) comes back as 207 with the
/// drop flagged unsaved: shown to this user, not guaranteed visible to
/// others.
async fn upload(State(ctx): State<AppContext>, multipart: Multipart) -> DropResult<Response> {
    let form = parse_form(multipart).await?;

    let lat = parse_coordinate(form.lat.as_deref())?;
    let lng = parse_coordinate(form.lng.as_deref())?;

    // Manual pin without a label: reverse-geocode a name for it
    let location_name = match form.location_name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => {
            crate::drops::models::validate_coordinates(lat, lng)?;
            let resolution = ctx.resolver.resolve_manual(lat, lng, None).await;
            resolution.location.location_name
        }
    };

    let drop = ctx
        .drop_service
        .upload(UploadRequest {
            image: form.image,
            existing_image_path: form.existing_image_path,
            lat,
            lng,
            location_name,
            contributor_handle: form.contributor_handle.unwrap_or_default(),
            visitor_id: form.visitor_id.unwrap_or_default(),
        })
        .await?;

    if drop.unsaved {
        Ok((StatusCode::MULTI_STATUS, Json(drop)).into_response())
    } else {
        Ok(Json(drop).into_response())
    }
}

fn parse_coordinate(raw: Option<&str>) -> DropResult<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| {
            DropError::Validation("Invalid location data. Please try again.".to_string())
        })
}

/// Parsed multipart form fields shared by locate and upload
#[derive(Debug, Default)]
struct DropForm {
    image: Option<UploadImage>,
    existing_image_path: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
    location_name: Option<String>,
    contributor_handle: Option<String>,
    visitor_id: Option<String>,
}

async fn parse_form(mut multipart: Multipart) -> DropResult<DropForm> {
    let mut form = DropForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let original_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let data = field.bytes().await.map_err(invalid_form)?.to_vec();
                form.image = Some(UploadImage {
                    data,
                    original_name,
                    content_type,
                });
            }
            "existingImagePath" => {
                form.existing_image_path = Some(field.text().await.map_err(invalid_form)?)
            }
            "lat" => form.lat = Some(field.text().await.map_err(invalid_form)?),
            "lng" => form.lng = Some(field.text().await.map_err(invalid_form)?),
            "locationName" => {
                form.location_name = Some(field.text().await.map_err(invalid_form)?)
            }
            // Older clients still send twitterHandle
            "contributorHandle" | "twitterHandle" => {
                form.contributor_handle = Some(field.text().await.map_err(invalid_form)?)
            }
            "visitorId" => form.visitor_id = Some(field.text().await.map_err(invalid_form)?),
            _ => {
                // Unknown fields are drained and ignored
                let _ = field.bytes().await.map_err(invalid_form)?;
            }
        }
    }

    Ok(form)
}

fn invalid_form(e: axum::extract::multipart::MultipartError) -> DropError {
    tracing::error!("Form parse error: {}", e);
    DropError::Validation("Invalid request. Please try uploading again.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate(Some("12.97")).unwrap(), 12.97);
        assert_eq!(parse_coordinate(Some(" -77.5 ")).unwrap(), -77.5);
        assert!(parse_coordinate(Some("abc")).is_err());
        assert!(parse_coordinate(None).is_err());
    }

    #[test]
    fn test_empty_visitor_param_means_no_filter() {
        assert_eq!(visitor_filter(None), None);
        assert_eq!(visitor_filter(Some("")), None);
        assert_eq!(visitor_filter(Some("v-1")), Some("v-1"));
    }

    #[test]
    fn test_locate_response_shape() {
        let body = LocateResponse {
            lat: 12.97,
            lng: 77.59,
            location_name: "Indiranagar".to_string(),
            confidence: Confidence::Medium,
            image_path: Some("/uploads/1-a.jpg".to_string()),
            status: "ok",
            reason: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["locationName"], "Indiranagar");
        assert_eq!(json["confidence"], "medium");
        assert_eq!(json["imagePath"], "/uploads/1-a.jpg");
        assert_eq!(json["status"], "ok");
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn test_locate_response_fallback_reason_serialized() {
        let body = LocateResponse {
            lat: 12.97,
            lng: 77.59,
            location_name: "Bangalore".to_string(),
            confidence: Confidence::None,
            image_path: None,
            status: "fallback",
            reason: Some("timeout".to_string()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "fallback");
        assert_eq!(json["reason"], "timeout");
        assert!(json.get("imagePath").is_none());
    }
}
