pub mod dims;
pub mod fact;
pub mod load;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::frame::Frame;

/// A fully built output table. The name is the destination table name; the
/// export collaborator iterates this explicit collection.
#[derive(Debug)]
pub struct NamedTable {
    pub name: &'static str,
    pub frame: Frame,
}

/// Everything one run produces: the typed table plus the named outputs
/// (seven dimensions, then the fact table), in export order.
#[derive(Debug)]
pub struct RunOutput {
    pub typed: Frame,
    pub tables: Vec<NamedTable>,
}

/// Run the pipeline: load the report, normalize placeholder tokens once,
/// extract the dimensions, build the fact table. Any stage failure aborts
/// the run; nothing reaches the export collaborator half-built.
pub fn run(config: &Config) -> Result<RunOutput> {
    let mut typed = load::load(
        Path::new(&config.general.process_file),
        &config.file_types,
    )
    .context("loading report")?;

    // Normalized once, globally: the dimensions and the fact builder must
    // see the same values or the substitution joins would mismatch.
    dims::normalize_placeholders(&mut typed);

    let dims = dims::extract_dimensions(&typed, &config.keys)
        .context("extracting dimension tables")?;
    let fact =
        fact::build_fact(&typed, &dims, &config.keys).context("building fact table")?;

    let tables = vec![
        NamedTable {
            name: "dim_account",
            frame: dims.account,
        },
        NamedTable {
            name: "dim_ad_group",
            frame: dims.ad_group,
        },
        NamedTable {
            name: "dim_ads",
            frame: dims.ads,
        },
        NamedTable {
            name: "dim_customer",
            frame: dims.customer,
        },
        NamedTable {
            name: "dim_device",
            frame: dims.device,
        },
        NamedTable {
            name: "dim_network",
            frame: dims.network,
        },
        NamedTable {
            name: "dim_urls",
            frame: dims.urls,
        },
        NamedTable {
            name: "fct_stats",
            frame: fact,
        },
    ];

    info!(tables = tables.len(), "pipeline complete");
    Ok(RunOutput { typed, tables })
}


#[cfg(test)]
mod tests {
    use super::testutil::sample_report_csv;
    use super::*;
    use crate::config::{Config, Database, General, SurrogateKeys};
    use crate::frame::ColumnType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_for(path: &std::path::Path) -> Config {
        Config {
            general: General {
                process_file: path.to_string_lossy().into_owned(),
                log_file: None,
            },
            file_types: [
                ("Gregorian date".to_string(), ColumnType::Date),
                ("Account number".to_string(), ColumnType::Integer),
                ("Account status".to_string(), ColumnType::Category),
                ("Campaign status".to_string(), ColumnType::Category),
                ("Device type".to_string(), ColumnType::Category),
                ("Device OS".to_string(), ColumnType::Category),
                ("Network".to_string(), ColumnType::Category),
                ("Top vs. other".to_string(), ColumnType::Category),
            ]
            .into_iter()
            .collect(),
            keys: SurrogateKeys {
                customer: "Customer Key".to_string(),
                device: "Device Key".to_string(),
                network: "Network Key".to_string(),
                url: "URL Key".to_string(),
            },
            database: Database {
                host: "localhost".to_string(),
                name: "adstats".to_string(),
                user: "adstar".to_string(),
                plain_pwd: true,
                password_val: Some("unused".to_string()),
                password_var: None,
            },
        }
    }

    #[test]
    fn run_produces_all_named_tables_in_export_order() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(sample_report_csv().as_bytes()).unwrap();
        tmp.flush().unwrap();

        let output = run(&config_for(tmp.path())).unwrap();
        let names: Vec<&str> = output.tables.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "dim_account",
                "dim_ad_group",
                "dim_ads",
                "dim_customer",
                "dim_device",
                "dim_network",
                "dim_urls",
                "fct_stats",
            ]
        );

        let fact = &output.tables.last().unwrap().frame;
        assert_eq!(fact.n_rows(), output.typed.n_rows());
        assert_eq!(output.typed.n_rows(), 3);
    }

    #[test]
    fn run_fails_before_export_on_bad_data() {
        let mut tmp = NamedTempFile::new().unwrap();
        let broken = sample_report_csv().replace("[9001]", "9001");
        tmp.write_all(broken.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let err = run(&config_for(tmp.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("Ad ID"));
    }
}
