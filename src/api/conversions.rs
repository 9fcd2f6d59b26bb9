use std::io::Cursor;
use std::sync::Arc;

use reqwest::Url;
use rocket::http::{ContentType, Header, Status};
use rocket::response::status::{Accepted, Created};
use rocket::serde::json::Json;
use rocket::State;
use rocket::{request::Request, response::{self, Responder, Response}};

use crate::api::ApiError;
use crate::converter::ConversionService;
use crate::images::ImageFormat;
use crate::models::conversion::{ConversionRequest, ConversionResponse};

pub const BASE_PATH: &str = "/api/v1/images/conversions";

fn file_path(file_name: &str) -> String {
    format!("{}/{}", BASE_PATH, file_name)
}

fn parse_source(source_image: &str) -> Result<Url, ApiError> {
    Url::parse(source_image)
        .map_err(|e| ApiError::InvalidUrl(format!("{} is not a valid URL: {}", source_image, e)))
}

#[get("/formats")]
pub fn formats(service: &State<Arc<ConversionService>>) -> Json<Vec<&'static str>> {
    Json(service.supported_formats())
}

#[post("/convert", data = "<request>")]
pub async fn convert(
    request: Json<ConversionRequest>,
    service: &State<Arc<ConversionService>>,
) -> Result<Created<Json<ConversionResponse>>, ApiError> {
    let request = request.into_inner();
    let url = parse_source(&request.source_image)?;

    let file_name = service.convert(&url, &request.to_format).await?;
    let path = file_path(&file_name);

    Ok(Created::new(path.clone()).body(Json(ConversionResponse {
        format: request.to_format,
        path,
    })))
}

/// Accepts the request and answers with the predicted path straight away.
/// Failures, including unsupported formats, only reach the result sink.
#[post("/convert/async", data = "<request>")]
pub async fn convert_async(
    request: Json<ConversionRequest>,
    service: &State<Arc<ConversionService>>,
) -> Result<Accepted<Json<ConversionResponse>>, ApiError> {
    let request = request.into_inner();
    let url = parse_source(&request.source_image)?;

    log::info!("Accepted asynchronous conversion of {} to {}", url, request.to_format);

    let file_name = service.derive_key(&url, &request.to_format);
    service
        .inner()
        .convert_async(url, request.to_format.clone())
        .await;

    Ok(Accepted(Json(ConversionResponse {
        format: request.to_format,
        path: file_path(&file_name),
    })))
}

#[get("/<file_name>")]
pub fn get_image(
    file_name: &str,
    service: &State<Arc<ConversionService>>,
) -> Result<ImageResponse, ApiError> {
    match service.get(file_name) {
        Some(data) => Ok(ImageResponse {
            file_name: file_name.to_string(),
            data,
        }),
        None => {
            log::debug!("{} not found in cache", file_name);
            Err(ApiError::NotFound(file_name.to_string()))
        }
    }
}

// Responder for converted image data
pub struct ImageResponse {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl<'r> Responder<'r, 'static> for ImageResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let content_type = ImageFormat::from_file_name(&self.file_name)
            .and_then(|format| ContentType::parse_flexible(format.content_type()))
            .unwrap_or(ContentType::Binary);
        let etag = format!("\"{:x}\"", md5::compute(&self.data));

        // Cached entries never change, so a matching ETag is always still valid
        if let Some(if_none_match) = req.headers().get_one("If-None-Match") {
            if if_none_match == etag {
                return Response::build()
                    .status(Status::NotModified)
                    .header(Header::new("ETag", etag))
                    .header(Header::new("Cache-Control", "public, max-age=86400"))
                    .ok();
            }
        }

        Response::build()
            .header(content_type)
            .header(Header::new(
                "Content-Disposition",
                format!("inline; filename={}", self.file_name),
            ))
            .header(Header::new("Cache-Control", "public, max-age=86400"))
            .header(Header::new("ETag", etag))
            .sized_body(self.data.len(), Cursor::new(self.data))
            .ok()
    }
}
