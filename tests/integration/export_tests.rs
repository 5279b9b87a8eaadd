//! Export endpoint integration tests.
//!
//! Tests verify:
//! - Each output format carries the requested DPI in its resolution field
//! - Alpha handling per format
//! - Multipart and JSON data URL inputs
//! - Error codes for bad input

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ColorType, ImageFormat};
use serde_json::json;

use figexport::format::tiff::{TiffFile, TiffTag};

use super::test_utils::{
    decode, encode, gray_image, jfif_density, json_request, multipart_request, png_chunk,
    rgb_image, rgba_png, send, test_router, MultipartBody,
};

fn upload(image: &[u8]) -> MultipartBody {
    MultipartBody::new().file("image", "figure.png", image)
}

// =============================================================================
// Formats
// =============================================================================

#[tokio::test]
async fn test_png_export_keeps_alpha_and_dpi() {
    let body = upload(&rgba_png(20, 10)).text("dpi", "300");
    let response = send(test_router(), multipart_request("/api/export-png", body)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(
        response.header("content-disposition"),
        Some("attachment; filename=\"figure.png\"")
    );
    assert_eq!(response.header("cache-control"), Some("no-transform"));

    let image = decode(&response.body);
    assert_eq!((image.width(), image.height()), (20, 10));
    assert_eq!(image.color(), ColorType::Rgba8);

    // 300 dpi = 11811 pixels per metre
    let phys = png_chunk(&response.body, b"pHYs").expect("pHYs chunk");
    assert_eq!(&phys[0..4], &11811u32.to_be_bytes());
    assert_eq!(&phys[4..8], &11811u32.to_be_bytes());
    assert_eq!(phys[8], 1);
}

#[tokio::test]
async fn test_jpeg_export_drops_alpha_and_records_density() {
    let body = upload(&rgba_png(16, 16)).text("quality", "999");
    let response = send(test_router(), multipart_request("/api/export-jpeg", body)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/jpeg"));

    let image = decode(&response.body);
    assert_eq!(image.color(), ColorType::Rgb8);
    assert_eq!(jfif_density(&response.body), Some((1, 600, 600)));
}

#[tokio::test]
async fn test_jpg_alias() {
    let body = upload(&rgba_png(8, 8)).text("dpi", "72");
    let response = send(test_router(), multipart_request("/api/export-JPG", body)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/jpeg"));
    assert_eq!(
        response.header("content-disposition"),
        Some("attachment; filename=\"figure.jpeg\"")
    );
    assert_eq!(jfif_density(&response.body), Some((1, 72, 72)));
}

#[tokio::test]
async fn test_tiff_export_resolution() {
    let body = upload(&rgba_png(12, 6)).text("dpi", "1200");
    let response = send(test_router(), multipart_request("/api/export-tiff", body)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/tiff"));

    let file = TiffFile::parse(&response.body).unwrap();
    let values = file.values();
    let ifd = &file.ifds()[0];
    let read = |tag| values.read_u64(ifd.get_entry_by_tag(tag).unwrap()).unwrap();
    let rational = |tag| values.read_rational(ifd.get_entry_by_tag(tag).unwrap()).unwrap();

    assert_eq!(rational(TiffTag::XResolution), 1200.0);
    assert_eq!(rational(TiffTag::YResolution), 1200.0);
    assert_eq!(read(TiffTag::ResolutionUnit), 2);
    assert_eq!(read(TiffTag::Compression), 5);
    assert_eq!(read(TiffTag::SamplesPerPixel), 3);

    let image = decode(&response.body);
    assert_eq!((image.width(), image.height()), (12, 6));
}

#[tokio::test]
async fn test_pdf_page_size_follows_dpi() {
    let png = encode(&rgb_image(300, 150), ImageFormat::Png);
    let body = upload(&png).text("dpi", "150");
    let response = send(test_router(), multipart_request("/api/export-pdf", body)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/pdf"));
    assert!(response.body.starts_with(b"%PDF-"));

    let document = lopdf::Document::load_mem(&response.body).unwrap();
    let pages = document.get_pages();
    assert_eq!(pages.len(), 1);

    let page_id = *pages.values().next().unwrap();
    let page = document.get_object(page_id).unwrap().as_dict().unwrap();
    let media_box: Vec<f32> = page
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect();
    assert_eq!(media_box, vec![0.0, 0.0, 144.0, 72.0]);
}

#[tokio::test]
async fn test_pdf_dpi_is_clamped() {
    let png = encode(&gray_image(100, 50), ImageFormat::Png);
    let body = upload(&png).text("dpi", "5");
    let response = send(test_router(), multipart_request("/api/export-pdf", body)).await;
    assert_eq!(response.status, StatusCode::OK);

    // Clamped to 50 dpi: 100 px = 144 pt
    let document = lopdf::Document::load_mem(&response.body).unwrap();
    let page_id = *document.get_pages().values().next().unwrap();
    let page = document.get_object(page_id).unwrap().as_dict().unwrap();
    let width = page.get(b"MediaBox").unwrap().as_array().unwrap()[2]
        .as_float()
        .unwrap();
    assert_eq!(width, 144.0);
}

// =============================================================================
// JSON Data URLs
// =============================================================================

#[tokio::test]
async fn test_data_url_export_json_mode() {
    let url = format!("data:image/png;base64,{}", STANDARD.encode(rgba_png(10, 10)));
    let request = json_request(
        "/api/export-png?mode=json",
        &json!({"canvasDataUrl": url, "dpi": "96"}),
    );
    let response = send(test_router(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["format"], "png");

    let png = STANDARD.decode(body["base64"].as_str().unwrap()).unwrap();
    let phys = png_chunk(&png, b"pHYs").unwrap();
    // 96 dpi = 3779.5 pixels per metre, rounded
    assert_eq!(&phys[0..4], &3780u32.to_be_bytes());
}

#[tokio::test]
async fn test_malformed_query_falls_back_to_download() {
    let body = upload(&rgba_png(6, 6));
    let response = send(
        test_router(),
        multipart_request("/api/export-png?mode=json&mode=json", body),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(decode(&response.body).width(), 6);
}

#[tokio::test]
async fn test_data_url_default_dpi() {
    let url = format!("data:image/png;base64,{}", STANDARD.encode(rgba_png(4, 4)));
    let request = json_request("/api/export-jpeg", &json!({"canvasDataUrl": url, "dpi": "x"}));
    let response = send(test_router(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(jfif_density(&response.body), Some((1, 600, 600)));
}

#[tokio::test]
async fn test_data_url_bad_base64() {
    let request = json_request(
        "/api/export-png",
        &json!({"canvasDataUrl": "data:image/png;base64,%%%"}),
    );
    let response = send(test_router(), request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["error"], "Export failed");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("base64_decode"));
}

#[tokio::test]
async fn test_data_url_missing() {
    let request = json_request("/api/export-png", &json!({"dpi": 300}));
    let response = send(test_router(), request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["details"], "missing_or_invalid_canvasDataUrl");
}

#[tokio::test]
async fn test_bad_json_body() {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/export-png")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = send(test_router(), request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["details"]
        .as_str()
        .unwrap()
        .starts_with("bad_json"));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_unsupported_format() {
    let body = upload(&rgba_png(4, 4));
    let response = send(test_router(), multipart_request("/api/export-gif", body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["error"], "Export failed");
    assert_eq!(body["details"], "unsupported format: gif");
}

#[tokio::test]
async fn test_missing_file() {
    let body = MultipartBody::new().text("dpi", "300");
    let response = send(test_router(), multipart_request("/api/export-png", body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["details"], "missing_file");
}

#[tokio::test]
async fn test_unidentified_image() {
    let body = upload(b"this is not an image");
    let response = send(test_router(), multipart_request("/api/export-png", body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["details"], "unidentified_image");
}

#[tokio::test]
async fn test_format_checked_before_file() {
    let body = MultipartBody::new();
    let response = send(test_router(), multipart_request("/api/export-bmp", body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["details"], "unsupported format: bmp");
}
