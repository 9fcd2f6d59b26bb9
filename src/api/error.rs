use crate::images::ConversionError;
use rocket::http::{ContentType, Status};
use serde_json::json;
use std::io::Cursor;

#[derive(Debug)]
pub enum ApiError {
    ConversionError(ConversionError),
    InvalidUrl(String),
    NotFound(String),
}

impl From<ConversionError> for ApiError {
    fn from(error: ConversionError) -> Self {
        ApiError::ConversionError(error)
    }
}

fn json_error(status: Status, error: &str, message: String) -> rocket::response::Result<'static> {
    let body = json!({
        "error": error,
        "message": message
    })
    .to_string();

    rocket::Response::build()
        .status(status)
        .header(ContentType::JSON)
        .sized_body(body.len(), Cursor::new(body))
        .ok()
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        match self {
            ApiError::ConversionError(ConversionError::UnsupportedFormat(message)) => {
                json_error(Status::BadRequest, "Unsupported format", message)
            }
            ApiError::InvalidUrl(message) => {
                json_error(Status::BadRequest, "Invalid source image", message)
            }
            ApiError::NotFound(file_name) => json_error(
                Status::NotFound,
                "Not found",
                format!("{} not found", file_name),
            ),
            ApiError::ConversionError(error @ ConversionError::Network(_))
            | ApiError::ConversionError(error @ ConversionError::Fetch(_)) => {
                log::error!("Source image could not be fetched: {}", error);
                json_error(Status::BadGateway, "Image network error", error.to_string())
            }
            ApiError::ConversionError(error) => {
                log::error!("Image conversion failed: {}", error);
                json_error(
                    Status::InternalServerError,
                    "Image conversion error",
                    error.to_string(),
                )
            }
        }
    }
}
