use serde_json::{Map, Value};
use url::Url;

use crate::extract;
use crate::fetch;
use crate::gemini::GeminiClient;

// ── Prompts ──────────────────────────────────────────────────────────────────

/// Substituted on the analyze endpoint when the caller omits a prompt. The
/// JSON instruction keeps the response compatible with the extractor.
pub const DEFAULT_ANALYSIS_PROMPT: &str =
    "Analyze this advertisement image and provide insights about the marketing \
     strategy. Respond with a single JSON object mapping each insight name to \
     its value.";

/// Fixed prompt for the ad-insights endpoint. Every field must appear in the
/// model's JSON output, with the literal string 'None' when it cannot be
/// confidently identified.
pub const AD_INSIGHTS_PROMPT: &str =
    "Analyze this ad image for key marketing elements. Provide a structured JSON response with the following keys. \
     Ensure each key is present in the JSON output. If a feature cannot be confidently identified, use 'None' as the value.\n\n\
     Product Name: Extract only the **brand name and product type** (e.g., 'Himalaya Shampoo', 'Nike Shoes', 'Samsung TV'). Do not include extra details.\n\
     Position of product: Provide the exact placement of the product (e.g., center, top-right, bottom-left, etc.).\n\
     Position of logo: Provide the exact placement of the brand logo (e.g., top-left, top-right, center, etc.).\n\
     Image Entities: Identify the key objects, people, or concepts visually present in the image (as a list of strings), ensuring that any line breaks (`\\n`) are replaced with spaces.\n\
     Image Text Entities: Extract all discernible text from the image (as a list of strings), ensuring that any line breaks (`\\n`) are replaced with spaces.\n\
     Offer in Adv: Extract the full price drop information in a clear format: 'Price slashed from ₹100 to ₹50'. Ensure that both the original and discounted prices are included with the correct currency symbol (₹). If a discount percentage (e.g., 'Flat 50% off') or special deals (e.g., 'Buy One Get One Free') are present, extract them fully and accurately. If no offer is present, state 'None'.\
     Performance Claim: If the ad makes any performance-related claims (e.g., 'Lasts 24 hours', 'Fastest delivery', '95% customer satisfaction'), extract the claim text. If none, use 'None'.\n\
     Contrast in Adv: Assess the overall contrast in the ad (High, Medium, Low, None).\n\
     Gender: Predict the primary target gender for this ad (Male, Female, Unisex, Not Applicable).\n\
     Headline Size: Determine the approximate size of the main headline relative to other text (Small, Medium, Large, None).\n\
     Subheadline Size: Determine the approximate size of the subheadline(s) relative to other text (Small, Medium, Large, None).\n\
     CTA Button: If a call-to-action button is present, extract the text on it. If not, use 'None'.\n\
     Engagement Prediction: Predict the likely level of user engagement with this ad (Likely, Neutral, Unlikely, None).\n\
     Brand Keywords: Based on the visual and textual content, identify potential keywords associated with the brand or product (as a list of strings), ensuring that any line breaks (`\\n`) are replaced with spaces.\n\
     Overall Sentiment: Describe the overall feeling or emotion conveyed by the ad (e.g., positive, neutral, exciting, informative, None).\n\
     Key Message: Summarize the main message the ad is trying to communicate in one concise sentence (or 'None' if unclear).\n\
     Recommendation: Deliver a precise, impactful recommendation to boost brand growth, customer engagement, and preference.";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("Failed to download image from URL: {0}")]
    DownloadFailed(String),
    #[error("Failed to parse model response")]
    MalformedModelResponse,
    #[error("Failed to analyze image: {0}")]
    Upstream(String),
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve the effective prompt for the analyze endpoint: the caller's prompt
/// verbatim, or the default marketing-analysis prompt when omitted.
pub fn select_prompt(custom: Option<&str>) -> &str {
    custom.unwrap_or(DEFAULT_ANALYSIS_PROMPT)
}

/// Run the full pipeline: validate the URL, download and decode the image,
/// send it to the model with `prompt`, and extract the embedded JSON object.
pub async fn analyze_image(
    http: &reqwest::Client,
    gemini: &GeminiClient,
    image_url: &str,
    prompt: &str,
) -> Result<Map<String, Value>, AnalysisError> {
    validate_url(image_url)?;
    let image = fetch::fetch_image(http, image_url).await?;
    let response_text = gemini.generate_content(prompt, &image).await?;
    extract::extract_json_object(&response_text)
}

/// Ad-insights variant: always uses the fixed marketing prompt, then merges
/// the caller's `brand_id` into the result.
pub async fn get_ad_details(
    http: &reqwest::Client,
    gemini: &GeminiClient,
    image_url: &str,
    brand_id: Option<i64>,
) -> Result<Map<String, Value>, AnalysisError> {
    let mut details = analyze_image(http, gemini, image_url, AD_INSIGHTS_PROMPT).await?;
    extract::merge_brand_id(&mut details, brand_id);
    Ok(details)
}

// ── URL validation ───────────────────────────────────────────────────────────

fn validate_url(image_url: &str) -> Result<(), AnalysisError> {
    let parsed = Url::parse(image_url)
        .map_err(|_| AnalysisError::InvalidUrl(format!("Invalid image URL: {}", image_url)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AnalysisError::InvalidUrl(format!(
            "Unsupported URL scheme '{}' for image URL: {}",
            other, image_url
        ))),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
