use anyhow::{Context, Result};
use tracing::info;

use crate::config::SurrogateKeys;
use crate::frame::Frame;
use crate::pipeline::dims::Dimensions;

/// Descriptive columns fully captured by the account / ad group / ads
/// dimensions. They are dropped outright: those dimensions are referenced by
/// their natural columns (`Account number`, `Ad ID`), not by key.
const CAPTURED_COLUMNS: [&str; 14] = [
    "Account name",
    "Account status",
    "Ad group ID",
    "Ad group",
    "Ad group status",
    "Ad description",
    "Ad distribution",
    "Ad status",
    "Ad title",
    "Ad type",
    "Language",
    "Currency code",
    "Final URL",
    "Destination URL",
];

/// Build the fact table: substitute the url/device/network/customer
/// attribute columns with their dimension surrogate keys via left joins,
/// reconcile the duplicate columns each join produces, verify the key
/// columns, and sort by date.
#[tracing::instrument(level = "info", skip_all)]
pub fn build_fact(table: &Frame, dims: &Dimensions, keys: &SurrogateKeys) -> Result<Frame> {
    let mut fact = table.clone();

    // Same derivation as the url dimension, recomputed on the working copy.
    fact.concat_str("Navigation URL", "Destination URL", "Final URL")
        .context("deriving Navigation URL")?;
    fact.drop_columns(&CAPTURED_COLUMNS)
        .context("dropping captured dimension columns")?;

    let on = ["Tracking Template", "Navigation URL", "Display URL"];
    let mut fact = fact.left_join(&dims.urls, &on).context("url join")?;
    fact.drop_columns(&[
        "Final Mobile URL_x",
        "Final App URL_x",
        "Final App URL_y",
        "Final Mobile URL_y",
        "Custom Parameters_x",
        "Custom Parameters_y",
    ])
    .context("reconciling url join columns")?;
    fact.drop_columns(&on).context("dropping url join columns")?;

    let on = ["Device type", "Device OS"];
    let mut fact = fact.left_join(&dims.device, &on).context("device join")?;
    fact.drop_columns(&on)
        .context("dropping device join columns")?;

    let on = ["Top vs. other", "Network"];
    let mut fact = fact.left_join(&dims.network, &on).context("network join")?;
    fact.drop_columns(&on)
        .context("dropping network join columns")?;

    let on = ["Customer", "Campaign name"];
    let mut fact = fact
        .left_join(&dims.customer, &on)
        .context("customer join")?;
    fact.drop_columns(&["Campaign status_x", "Campaign status_y"])
        .context("reconciling customer join columns")?;
    fact.drop_columns(&on)
        .context("dropping customer join columns")?;

    // The url key is nullable (an unmatched composite yields null); the
    // other three must be present on every row.
    fact.require_key(&keys.customer, false)?;
    fact.require_key(&keys.device, false)?;
    fact.require_key(&keys.network, false)?;
    fact.require_key(&keys.url, true)?;

    fact.sort_by("Gregorian date")
        .context("sorting fact table by date")?;

    info!(rows = fact.n_rows(), "fact table built");
    Ok(fact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Value;
    use crate::pipeline::dims::extract_dimensions;
    use crate::pipeline::testutil::{sample_keys, sample_table, sample_table_with_url_suffix};
    use chrono::NaiveDate;

    #[test]
    fn fact_row_count_matches_typed_table() {
        let table = sample_table();
        let keys = sample_keys();
        let dims = extract_dimensions(&table, &keys).unwrap();
        let fact = build_fact(&table, &dims, &keys).unwrap();
        assert_eq!(fact.n_rows(), table.n_rows());
    }

    #[test]
    fn fact_is_sorted_by_date() {
        let table = sample_table();
        let keys = sample_keys();
        let dims = extract_dimensions(&table, &keys).unwrap();
        let fact = build_fact(&table, &dims, &keys).unwrap();
        let dates: Vec<&Value> = fact.column_values("Gregorian date").unwrap();
        assert_eq!(
            *dates[0],
            Value::Date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap())
        );
        assert_eq!(
            *dates[dates.len() - 1],
            Value::Date(NaiveDate::from_ymd_opt(2023, 1, 5).unwrap())
        );
    }

    #[test]
    fn fact_keys_reference_existing_dimension_rows() {
        let table = sample_table();
        let keys = sample_keys();
        let dims = extract_dimensions(&table, &keys).unwrap();
        let fact = build_fact(&table, &dims, &keys).unwrap();

        for (dim, key) in [
            (&dims.customer, "Customer Key"),
            (&dims.device, "Device Key"),
            (&dims.network, "Network Key"),
            (&dims.urls, "URL Key"),
        ] {
            let dim_keys = dim.column_values(key).unwrap();
            for v in fact.column_values(key).unwrap() {
                assert!(dim_keys.contains(&v), "{} value {:?}", key, v);
            }
        }
    }

    #[test]
    fn captured_and_join_columns_are_gone() {
        let table = sample_table();
        let keys = sample_keys();
        let dims = extract_dimensions(&table, &keys).unwrap();
        let fact = build_fact(&table, &dims, &keys).unwrap();
        for name in [
            "Account name",
            "Ad group",
            "Destination URL",
            "Final URL",
            "Tracking Template",
            "Navigation URL",
            "Display URL",
            "Device type",
            "Network",
            "Customer",
            "Campaign name",
            "Campaign status_x",
            "Campaign status_y",
        ] {
            assert!(fact.column_index(name).is_err(), "{} survived", name);
        }
        // Natural references to the keyless dimensions stay.
        assert!(fact.column_index("Account number").is_ok());
        assert!(fact.column_index("Ad ID").is_ok());
    }

    #[test]
    fn unmatched_url_composite_yields_null_key_not_row_loss() {
        // Dimensions come from the base table; the fact input carries a URL
        // composite the url dimension has never seen.
        let base = sample_table();
        let keys = sample_keys();
        let dims = extract_dimensions(&base, &keys).unwrap();

        let altered = sample_table_with_url_suffix("?utm=new");
        let fact = build_fact(&altered, &dims, &keys).unwrap();
        assert_eq!(fact.n_rows(), altered.n_rows());
        let url_keys = fact.column_values("URL Key").unwrap();
        assert!(url_keys.iter().any(|v| v.is_null()));
    }
}
