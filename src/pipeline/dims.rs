use anyhow::{Context, Result};
use tracing::info;

use crate::config::SurrogateKeys;
use crate::frame::{Frame, FrameError};

/// Placeholder tokens left behind by the report generator; normalized to
/// empty strings before any dimension is projected so every dimension (and
/// the fact pass) sees the same values.
const PLACEHOLDER_TOKENS: [&str; 2] = ["None", "nan"];

/// The seven dimension tables, in export order. Account, ad group and ads
/// carry no surrogate key; they are referenced by their natural columns.
#[derive(Debug)]
pub struct Dimensions {
    pub account: Frame,
    pub ad_group: Frame,
    pub ads: Frame,
    pub customer: Frame,
    pub device: Frame,
    pub network: Frame,
    pub urls: Frame,
}

pub fn normalize_placeholders(table: &mut Frame) {
    table.replace_str(&PLACEHOLDER_TOKENS, "");
}

/// Derive every dimension from the typed table: project, stable-sort on the
/// natural column, drop duplicate rows, then (for the keyed dimensions)
/// assign 0-based surrogate keys in row order.
#[tracing::instrument(level = "info", skip_all)]
pub fn extract_dimensions(table: &Frame, keys: &SurrogateKeys) -> Result<Dimensions> {
    let account = dimension(
        table,
        &["Account number", "Account name", "Account status"],
        "Account number",
        None,
    )
    .context("account dimension")?;

    let ad_group = dimension(
        table,
        &[
            "Ad group ID",
            "Ad group",
            "Ad group status",
            "Language",
            "Currency code",
        ],
        "Ad group ID",
        None,
    )
    .context("ad group dimension")?;

    let ads = dimension(
        table,
        &[
            "Ad ID",
            "Ad group ID",
            "Ad description",
            "Ad distribution",
            "Ad status",
            "Ad title",
            "Ad type",
        ],
        "Ad ID",
        None,
    )
    .context("ads dimension")?;

    let customer = dimension(
        table,
        &["Customer", "Campaign name", "Campaign status"],
        "Campaign name",
        Some(keys.customer.as_str()),
    )
    .context("customer dimension")?;

    let device = dimension(
        table,
        &["Device type", "Device OS"],
        "Device type",
        Some(keys.device.as_str()),
    )
    .context("device dimension")?;

    let network = dimension(
        table,
        &["Network", "Top vs. other"],
        "Top vs. other",
        Some(keys.network.as_str()),
    )
    .context("network dimension")?;

    let urls = url_dimension(table, &keys.url).context("url dimension")?;

    info!(
        account = account.n_rows(),
        ad_group = ad_group.n_rows(),
        ads = ads.n_rows(),
        customer = customer.n_rows(),
        device = device.n_rows(),
        network = network.n_rows(),
        urls = urls.n_rows(),
        "dimension tables extracted"
    );

    Ok(Dimensions {
        account,
        ad_group,
        ads,
        customer,
        device,
        network,
        urls,
    })
}

fn dimension(
    table: &Frame,
    columns: &[&str],
    sort_column: &str,
    key: Option<&str>,
) -> Result<Frame, FrameError> {
    let mut dim = table.select(columns)?;
    dim.sort_by(sort_column)?;
    dim.dedup();
    if let Some(name) = key {
        dim.insert_key(name)?;
    }
    Ok(dim)
}

/// The URL dimension synthesizes `Navigation URL` (destination ++ final URL)
/// before dedup, so the derived column participates in dedup and sort.
fn url_dimension(table: &Frame, key: &str) -> Result<Frame, FrameError> {
    let mut dim = table.select(&[
        "Display URL",
        "Tracking Template",
        "Final App URL",
        "Final Mobile URL",
        "Custom Parameters",
        "Destination URL",
        "Final URL",
    ])?;
    dim.concat_str("Navigation URL", "Destination URL", "Final URL")?;
    dim.drop_columns(&["Destination URL", "Final URL"])?;
    dim.sort_by("Navigation URL")?;
    dim.dedup();
    dim.insert_key(key)?;
    Ok(dim)
}
