use actix_multipart::Multipart;
use futures::stream::TryStreamExt;

use crate::services::image_service::UploadedFile;
use crate::utils::AppError;

/// Upper bound for a whole multipart body.
pub const MAX_FORM_BYTES: usize = 10 * 1024 * 1024;

/// A multipart body split into text parts and file parts, in arrival order.
#[derive(Debug, Default)]
pub struct FormParts {
    pub fields: Vec<(String, String)>,
    pub files: Vec<UploadedFile>,
}

impl FormParts {
    /// Removes and returns the first file sent under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.field == name)?;
        Some(self.files.remove(index))
    }
}

/// Drains the multipart stream. Parts with a filename are files, the rest
/// are UTF-8 text fields.
pub async fn read_form(mut payload: Multipart) -> Result<FormParts, AppError> {
    let mut parts = FormParts::default();
    let mut total = 0usize;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(String::from);
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            total += chunk.len();
            if total > MAX_FORM_BYTES {
                return Err(AppError::InvalidRequest("Request body too large".to_string()));
            }
            bytes.extend_from_slice(&chunk);
        }

        match file_name {
            Some(file_name) => {
                if bytes.is_empty() {
                    // Browsers send an empty part for an untouched file input
                    continue;
                }
                parts.files.push(UploadedFile {
                    field: name,
                    file_name: Some(file_name),
                    content_type,
                    bytes,
                });
            }
            None => {
                let value = String::from_utf8(bytes).map_err(|_| {
                    AppError::InvalidRequest(format!("Field '{}' is not valid UTF-8", name))
                })?;
                parts.fields.push((name, value));
            }
        }
    }

    Ok(parts)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use actix_web::{http::header::CONTENT_TYPE, test, web, App, HttpResponse};

    pub(crate) const BOUNDARY: &str = "vfood-test-boundary";

    /// Builds a multipart body from text parts and `(field, filename, bytes)` files.
    pub(crate) fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        for (name, file_name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY, name, file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    pub(crate) fn multipart_content_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    async fn echo(payload: Multipart) -> Result<HttpResponse, AppError> {
        let mut form = read_form(payload).await?;
        let avatar = form.take_file("avtFile");
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "fields": form.fields,
            "avatar": avatar.map(|f| (f.file_name, f.content_type, f.bytes.len())),
            "otherFiles": form.files.len(),
        })))
    }

    #[actix_web::test]
    async fn test_read_form_splits_text_and_files() {
        let app = test::init_service(App::new().route("/", web::post().to(echo))).await;

        let body = multipart_body(
            &[("name", "Bún Bò"), ("tag", "hot")],
            &[("avtFile", "me.png", b"\x89PNG"), ("images", "a.png", b"abc")],
        );
        let req = test::TestRequest::post()
            .uri("/")
            .insert_header((CONTENT_TYPE, multipart_content_type()))
            .set_payload(body)
            .to_request();

        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["fields"][0][0], "name");
        assert_eq!(json["fields"][0][1], "Bún Bò");
        assert_eq!(json["fields"][1][1], "hot");
        assert_eq!(json["avatar"][0], "me.png");
        assert_eq!(json["avatar"][1], "image/png");
        assert_eq!(json["avatar"][2], 4);
        assert_eq!(json["otherFiles"], 1);
    }

    #[actix_web::test]
    async fn test_empty_file_part_is_skipped() {
        let app = test::init_service(App::new().route("/", web::post().to(echo))).await;

        let body = multipart_body(&[], &[("avtFile", "", b"")]);
        let req = test::TestRequest::post()
            .uri("/")
            .insert_header((CONTENT_TYPE, multipart_content_type()))
            .set_payload(body)
            .to_request();

        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(json["avatar"].is_null());
        assert_eq!(json["otherFiles"], 0);
    }
}
