//! Small shared helpers: site naming and output file naming.

use chrono::Local;
use url::Url;

use crate::error::AppError;

/// Hostname of a URL with any leading `www.` stripped, lowercased.
/// Used as the site identifier on stored documents.
pub fn site_domain(url: &str) -> Result<String, AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::Config(format!("invalid URL {url}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::Config(format!("URL has no host: {url}")))?;
    let host = host.to_ascii_lowercase();
    Ok(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Collection name for a site: the first DNS label of the domain.
/// `https://www.diariodecadiz.es/...` maps to `diariodecadiz`.
pub fn collection_name_from_url(url: &str) -> Result<String, AppError> {
    let domain = site_domain(url)?;
    let label = domain.split('.').next().unwrap_or(&domain);
    if label.is_empty() {
        return Err(AppError::Config(format!("URL has no usable host: {url}")));
    }
    Ok(label.to_string())
}

/// Timestamped output filename for one harvest run,
/// e.g. `diariodecadiz.es_20250830_143502.json`.
pub fn run_output_filename(site_url: &str) -> Result<String, AppError> {
    let name = site_domain(site_url)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    Ok(format!("{name}_{stamp}.json"))
}
