//! `fetch`-backed [`HttpTransport`]

use crate::storage::js_message;
use async_trait::async_trait;
use js_sys::{Array, Uint8Array};
use pdfsmaller_core::api::{FormPart, FormValue, RequestBody};
use pdfsmaller_core::{ApiError, ApiRequest, ApiResponse, HttpTransport};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, FormData, Request, RequestInit, RequestMode, Response};

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl HttpTransport for FetchTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let window = web_sys::window().ok_or_else(|| ApiError::Request("No window".into()))?;

        let opts = RequestInit::new();
        opts.set_method(request.method.as_str());
        opts.set_mode(RequestMode::Cors);
        match &request.body {
            RequestBody::Empty => {}
            RequestBody::Json(value) => opts.set_body(&JsValue::from_str(&value.to_string())),
            // the browser writes the multipart boundary header itself
            RequestBody::Multipart(parts) => opts.set_body(&build_form(parts)?.into()),
        }

        let js_request = Request::new_with_str_and_init(&request.url, &opts).map_err(request_error)?;
        for (name, value) in &request.headers {
            js_request
                .headers()
                .set(name, value)
                .map_err(request_error)?;
        }

        let response = JsFuture::from(window.fetch_with_request(&js_request))
            .await
            .map_err(|e| ApiError::Network(js_message(&e)))?;
        let response: Response = response
            .dyn_into()
            .map_err(|_| ApiError::InvalidResponse("fetch did not return a Response".into()))?;

        let buffer = response.array_buffer().map_err(invalid_response)?;
        let buffer = JsFuture::from(buffer).await.map_err(invalid_response)?;

        Ok(ApiResponse {
            status: response.status(),
            status_text: response.status_text(),
            body: Uint8Array::new(&buffer).to_vec(),
        })
    }
}

fn build_form(parts: &[FormPart]) -> Result<FormData, ApiError> {
    let form = FormData::new().map_err(request_error)?;
    for part in parts {
        let appended = match &part.value {
            FormValue::Text(text) => form.append_with_str(&part.name, text),
            FormValue::File {
                file_name,
                mime_type,
                bytes,
            } => {
                let blob = bytes_to_blob(bytes, mime_type).map_err(request_error)?;
                form.append_with_blob_and_filename(&part.name, &blob, file_name)
            }
        };
        appended.map_err(request_error)?;
    }
    Ok(form)
}

pub(crate) fn bytes_to_blob(bytes: &[u8], mime_type: &str) -> Result<Blob, JsValue> {
    let chunks = Array::of1(&Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    options.set_type(mime_type);
    Blob::new_with_u8_array_sequence_and_options(&chunks, &options)
}

fn request_error(e: JsValue) -> ApiError {
    ApiError::Request(js_message(&e))
}

fn invalid_response(e: JsValue) -> ApiError {
    ApiError::InvalidResponse(js_message(&e))
}
