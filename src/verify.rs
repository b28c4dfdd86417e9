use anyhow::bail;
use url::Url;

/// Marker phrase identifying a gas plan fact sheet.
pub const GAS_PLAN_MARKER: &str = "estimated gas cost";

/// Case-insensitive substring containment check on extracted text.
pub fn contains_marker(text: &str, marker: &str) -> bool {
    text.to_lowercase().contains(&marker.to_lowercase())
}

/// Terminal assertion of the workflow: fails with a descriptive error
/// when the marker is absent, including when the text is empty because
/// every fetch strategy failed.
pub fn verify_contains_marker(text: &str, marker: &str) -> anyhow::Result<()> {
    if contains_marker(text, marker) {
        return Ok(());
    }
    bail!(
        "extracted document text ({} characters) does not contain required marker {:?}",
        text.len(),
        marker
    )
}

/// Precondition guaranteed by the navigation layer: the fact-sheet URL
/// ends in a recognizable PDF extension.
pub fn is_pdf_url(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".pdf")
}
