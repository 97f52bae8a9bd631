use anyhow::{Context, Result};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions};
use sqlx::query::Query;
use sqlx::MySql;
use tracing::info;

use crate::config::Database;
use crate::frame::{Frame, Value};
use crate::pipeline::NamedTable;

/// Append every output table to its correspondingly named destination
/// table. The connection is acquired here, once per run, and closed before
/// returning whether the export succeeded or failed. Export runs only after
/// the whole pipeline has produced its tables, so a failed run never leaves
/// partial tables behind it in the store.
pub async fn append_tables(db: &Database, tables: &[NamedTable]) -> Result<()> {
    let url = db.url()?;
    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .with_context(|| format!("connecting to database `{}` on {}", db.name, db.host))?;

    let result = append_all(&pool, tables).await;
    pool.close().await;
    result
}

async fn append_all(pool: &MySqlPool, tables: &[NamedTable]) -> Result<()> {
    for table in tables {
        append_table(pool, table)
            .await
            .with_context(|| format!("exporting table `{}`", table.name))?;
    }
    Ok(())
}

async fn append_table(pool: &MySqlPool, table: &NamedTable) -> Result<()> {
    let frame = &table.frame;
    sqlx::query(&create_table_sql(table.name, frame))
        .execute(pool)
        .await
        .context("creating destination table")?;

    let insert = insert_sql(table.name, frame);
    let mut tx = pool.begin().await.context("starting transaction")?;
    for row in frame.rows() {
        let mut query = sqlx::query(&insert);
        for value in row {
            query = bind_value(query, value);
        }
        query.execute(&mut *tx).await.context("inserting row")?;
    }
    tx.commit().await.context("committing transaction")?;

    info!(table = table.name, rows = frame.n_rows(), "table appended");
    Ok(())
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Str(s) => query.bind(s.as_str()),
        Value::Int(i) => query.bind(*i),
        Value::Key(k) => query.bind(*k),
        Value::Date(d) => query.bind(*d),
    }
}

/// MySQL column type for one frame column, from its first non-null value.
/// All-null columns fall back to TEXT.
fn sql_type(frame: &Frame, idx: usize) -> &'static str {
    for row in frame.rows() {
        match &row[idx] {
            Value::Null => continue,
            Value::Key(_) => return "SMALLINT",
            Value::Int(_) => return "BIGINT",
            Value::Date(_) => return "DATE",
            Value::Str(_) => return "TEXT",
        }
    }
    "TEXT"
}

fn create_table_sql(name: &str, frame: &Frame) -> String {
    let columns: Vec<String> = frame
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| format!("`{}` {}", c, sql_type(frame, i)))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS `{}` ({})",
        name,
        columns.join(", ")
    )
}

fn insert_sql(name: &str, frame: &Frame) -> String {
    let columns: Vec<String> = frame
        .columns()
        .iter()
        .map(|c| format!("`{}`", c))
        .collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO `{}` ({}) VALUES ({})",
        name,
        columns.join(", "),
        placeholders
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn frame() -> Frame {
        Frame::from_rows(
            vec![
                "Device Key".to_string(),
                "Gregorian date".to_string(),
                "Clicks".to_string(),
                "URL Key".to_string(),
            ],
            vec![vec![
                Value::Key(0),
                Value::Date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()),
                Value::Str("4".to_string()),
                Value::Null,
            ]],
        )
        .unwrap()
    }

    #[test]
    fn create_table_sql_infers_types_per_column() {
        let sql = create_table_sql("fct_stats", &frame());
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `fct_stats` (`Device Key` SMALLINT, \
             `Gregorian date` DATE, `Clicks` TEXT, `URL Key` TEXT)"
        );
    }

    #[test]
    fn insert_sql_quotes_columns_and_counts_placeholders() {
        let sql = insert_sql("fct_stats", &frame());
        assert_eq!(
            sql,
            "INSERT INTO `fct_stats` (`Device Key`, `Gregorian date`, `Clicks`, `URL Key`) \
             VALUES (?, ?, ?, ?)"
        );
    }
}
