use crate::analyze::AnalysisError;

// ── Fetched image ────────────────────────────────────────────────────────────

pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

// ── HTTP fetch + decode ──────────────────────────────────────────────────────

/// Download the image at `url` and verify the body decodes as an image.
///
/// Transport errors and non-2xx statuses are download failures (the caller
/// maps them to 400); a body that is not a decodable image is an upstream
/// failure, since by then the URL itself was served successfully.
pub async fn fetch_image(
    client: &reqwest::Client,
    url: &str,
) -> Result<FetchedImage, AnalysisError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|_| AnalysisError::DownloadFailed(url.to_string()))?;

    if !response.status().is_success() {
        return Err(AnalysisError::DownloadFailed(url.to_string()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|_| AnalysisError::DownloadFailed(url.to_string()))?
        .to_vec();

    let format = image::guess_format(&bytes)
        .map_err(|e| AnalysisError::Upstream(format!("Unrecognized image data: {}", e)))?;

    // Full decode confirms the body is an actual image, not just a matching
    // magic number.
    image::load_from_memory(&bytes)
        .map_err(|e| AnalysisError::Upstream(format!("Failed to decode image: {}", e)))?;

    Ok(FetchedImage {
        bytes,
        mime_type: format.to_mime_type(),
    })
}
