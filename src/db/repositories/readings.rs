use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::{
    db::{
        helpers::{cell_to_json, quote_identifier, to_i64},
        Database,
    },
    error::{FetchError, MalformedResponseError},
    fetch::{ReadingStore, StoreQuery},
    models::RawRecord,
};

impl Database {
    /// Column names of `table`, empty when the table does not exist.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let table = table.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
            let names = stmt
                .query_map(params![table], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to read table info")?;
            Ok(names)
        })
        .await
    }

    pub async fn fetch_recent_rows(&self, query: &StoreQuery) -> Result<Vec<RawRecord>, FetchError> {
        let query = query.clone();
        self.execute(move |conn| Ok(query_rows(conn, &query)))
            .await
            .map_err(|err| FetchError::unavailable(format!("{err:#}")))?
    }
}

impl ReadingStore for Database {
    async fn fetch_rows(&self, query: &StoreQuery) -> Result<Vec<RawRecord>, FetchError> {
        self.fetch_recent_rows(query).await
    }
}

fn unavailable(err: rusqlite::Error) -> FetchError {
    FetchError::unavailable(err.to_string())
}

fn query_rows(conn: &mut Connection, query: &StoreQuery) -> Result<Vec<RawRecord>, FetchError> {
    let sql = format!(
        "SELECT * FROM {} ORDER BY {} {} LIMIT ?1",
        quote_identifier(&query.table),
        quote_identifier(&query.order_by),
        query.direction.as_sql(),
    );
    let limit = to_i64(query.limit).map_err(|err| FetchError::unavailable(err.to_string()))?;

    let mut stmt = conn.prepare(&sql).map_err(unavailable)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query(params![limit]).map_err(unavailable)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(unavailable)? {
        let mut record = RawRecord::new();
        for (index, column) in columns.iter().enumerate() {
            let cell = row.get_ref(index).map_err(unavailable)?;
            let value = cell_to_json(cell, column).map_err(MalformedResponseError::new)?;
            record.insert(column.clone(), value);
        }
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::SortDirection;
    use serde_json::Value;

    async fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.execute(|conn| {
            conn.execute_batch(
                "CREATE TABLE \"Main data\" (
                    id INTEGER PRIMARY KEY,
                    created_at TEXT NOT NULL,
                    \"Respiration Rate\" REAL,
                    \"Heart Rate\" REAL,
                    \"Presence Detection\" INTEGER
                );",
            )?;
            for second in 1..=5 {
                conn.execute(
                    "INSERT INTO \"Main data\" (created_at, \"Respiration Rate\", \"Heart Rate\", \"Presence Detection\")
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        format!("2024-05-01T12:00:0{second}+00:00"),
                        14.0,
                        60.0 + f64::from(second),
                        1,
                    ],
                )?;
            }
            Ok(())
        })
        .await
        .unwrap();
        db
    }

    fn query(limit: usize) -> StoreQuery {
        StoreQuery {
            table: "Main data".into(),
            order_by: "created_at".into(),
            direction: SortDirection::Descending,
            limit,
        }
    }

    #[tokio::test]
    async fn returns_newest_rows_first() {
        let db = seeded().await;

        let rows = db.fetch_rows(&query(3)).await.unwrap();

        let stamps: Vec<_> = rows.iter().map(|r| r["created_at"].clone()).collect();
        assert_eq!(
            stamps,
            vec![
                Value::from("2024-05-01T12:00:05+00:00"),
                Value::from("2024-05-01T12:00:04+00:00"),
                Value::from("2024-05-01T12:00:03+00:00"),
            ]
        );
        assert_eq!(rows[0]["Heart Rate"], Value::from(65.0));
        assert_eq!(rows[0]["Presence Detection"], Value::from(1));
    }

    #[tokio::test]
    async fn blob_cells_are_malformed() {
        let db = seeded().await;
        db.execute(|conn| {
            conn.execute(
                "INSERT INTO \"Main data\" (created_at, \"Heart Rate\") VALUES ('2024-05-01T12:00:09Z', x'00ff')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let err = db.fetch_rows(&query(10)).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_table_is_unavailable() {
        let db = Database::open_in_memory().unwrap();
        let err = db.fetch_rows(&query(10)).await.unwrap_err();
        assert!(matches!(err, FetchError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn lists_table_columns() {
        let db = seeded().await;
        let columns = db.table_columns("Main data").await.unwrap();
        assert!(columns.iter().any(|c| c == "created_at"));
        assert!(db.table_columns("nope").await.unwrap().is_empty());
    }
}
