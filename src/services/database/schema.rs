use super::backend::Database;
use super::types::{ForeignKeyInfo, SchemaMap, TableSchema};
use crate::error::DatabaseError;

/// Retrieves tables, columns and foreign keys for every base table the
/// connection can see.
pub async fn reflect<D: Database>(db: &mut D) -> Result<SchemaMap, DatabaseError> {
    let table_names = db.table_names().await?;
    let mut tables = Vec::with_capacity(table_names.len());

    for table_name in table_names {
        let columns = db.columns(&table_name).await?;
        let foreign_keys = db.foreign_keys(&table_name).await?;

        tables.push(TableSchema {
            table_name,
            columns,
            foreign_keys,
        });
    }

    tracing::info!(tables = tables.len(), "Reflected schema");
    Ok(SchemaMap { tables })
}

/// One column of a foreign key, as the catalog queries return it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ForeignKeyColumn {
    pub constraint_name: String,
    pub column_name: String,
    pub referred_table: String,
    pub referred_column: String,
}

/// Folds consecutive rows of the same constraint into one [`ForeignKeyInfo`].
/// Rows must already be ordered by constraint, then key position.
pub(crate) fn group_foreign_keys(rows: Vec<ForeignKeyColumn>) -> Vec<ForeignKeyInfo> {
    let mut grouped: Vec<(String, ForeignKeyInfo)> = Vec::new();

    for row in rows {
        match grouped.last_mut() {
            Some((name, fk)) if *name == row.constraint_name => {
                fk.constrained_columns.push(row.column_name);
                fk.referred_columns.push(row.referred_column);
            }
            _ => grouped.push((
                row.constraint_name,
                ForeignKeyInfo {
                    constrained_columns: vec![row.column_name],
                    referred_table: row.referred_table,
                    referred_columns: vec![row.referred_column],
                },
            )),
        }
    }

    grouped.into_iter().map(|(_, fk)| fk).collect()
}

pub(crate) mod postgres {
    use sqlx::{PgConnection, Row};

    use super::{ForeignKeyColumn, group_foreign_keys};
    use crate::services::database::types::{ColumnDetail, ForeignKeyInfo};

    pub async fn table_names(conn: &mut PgConnection) -> Result<Vec<String>, sqlx::Error> {
        let query = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
                AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(query).fetch_all(&mut *conn).await?;
        rows.iter().map(|row| row.try_get("table_name")).collect()
    }

    pub async fn columns(
        conn: &mut PgConnection,
        table_name: &str,
    ) -> Result<Vec<ColumnDetail>, sqlx::Error> {
        let query = r#"
            SELECT
                a.attname::text AS column_name,
                upper(format_type(a.atttypid, a.atttypmod)) AS data_type
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relname = $1
                AND n.nspname = current_schema()
                AND a.attnum > 0
                AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let rows = sqlx::query(query)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| {
                Ok::<_, sqlx::Error>(ColumnDetail {
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                })
            })
            .collect()
    }

    pub async fn foreign_keys(
        conn: &mut PgConnection,
        table_name: &str,
    ) -> Result<Vec<ForeignKeyInfo>, sqlx::Error> {
        let query = r#"
            SELECT
                con.conname::text AS constraint_name,
                a.attname::text AS column_name,
                ref.relname::text AS referred_table,
                ra.attname::text AS referred_column
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_class ref ON ref.oid = con.confrelid
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(attnum, ref_attnum, ord)
            JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
            JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.ref_attnum
            WHERE con.contype = 'f'
                AND c.relname = $1
                AND n.nspname = current_schema()
            ORDER BY con.conname, k.ord
        "#;

        let rows = sqlx::query(query)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .map(|row| {
                Ok::<_, sqlx::Error>(ForeignKeyColumn {
                    constraint_name: row.try_get("constraint_name")?,
                    column_name: row.try_get("column_name")?,
                    referred_table: row.try_get("referred_table")?,
                    referred_column: row.try_get("referred_column")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(group_foreign_keys(columns))
    }
}

/// information_schema columns come back as binary strings on some MySQL
/// versions, hence the casts.
pub(crate) mod mysql {
    use sqlx::{MySqlConnection, Row};

    use super::{ForeignKeyColumn, group_foreign_keys};
    use crate::services::database::types::{ColumnDetail, ForeignKeyInfo};

    pub async fn table_names(conn: &mut MySqlConnection) -> Result<Vec<String>, sqlx::Error> {
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
                AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows = sqlx::query(query).fetch_all(&mut *conn).await?;
        rows.iter().map(|row| row.try_get("table_name")).collect()
    }

    pub async fn columns(
        conn: &mut MySqlConnection,
        table_name: &str,
    ) -> Result<Vec<ColumnDetail>, sqlx::Error> {
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(UPPER(COLUMN_TYPE) AS CHAR) AS data_type
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE()
                AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query(query)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| {
                Ok::<_, sqlx::Error>(ColumnDetail {
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                })
            })
            .collect()
    }

    pub async fn foreign_keys(
        conn: &mut MySqlConnection,
        table_name: &str,
    ) -> Result<Vec<ForeignKeyInfo>, sqlx::Error> {
        let query = r#"
            SELECT
                CAST(CONSTRAINT_NAME AS CHAR) AS constraint_name,
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(REFERENCED_TABLE_NAME AS CHAR) AS referred_table,
                CAST(REFERENCED_COLUMN_NAME AS CHAR) AS referred_column
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE()
                AND TABLE_NAME = ?
                AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;

        let rows = sqlx::query(query)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .map(|row| {
                Ok::<_, sqlx::Error>(ForeignKeyColumn {
                    constraint_name: row.try_get("constraint_name")?,
                    column_name: row.try_get("column_name")?,
                    referred_table: row.try_get("referred_table")?,
                    referred_column: row.try_get("referred_column")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(group_foreign_keys(columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::types::ColumnDetail;
    use crate::testing::{open_sqlite, shop_database};

    fn fk_column(constraint: &str, column: &str, table: &str, referred: &str) -> ForeignKeyColumn {
        ForeignKeyColumn {
            constraint_name: constraint.to_string(),
            column_name: column.to_string(),
            referred_table: table.to_string(),
            referred_column: referred.to_string(),
        }
    }

    #[test]
    fn test_group_foreign_keys_keeps_key_order() {
        let grouped = group_foreign_keys(vec![
            fk_column("fk_stock_bin", "region", "bins", "region"),
            fk_column("fk_stock_bin", "bin_code", "bins", "code"),
            fk_column("fk_stock_item", "item_id", "items", "id"),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].constrained_columns, vec!["region", "bin_code"]);
        assert_eq!(grouped[0].referred_columns, vec!["region", "code"]);
        assert_eq!(grouped[1].to_string(), "item_id references items(id)");
    }

    #[test]
    fn test_group_foreign_keys_empty() {
        assert!(group_foreign_keys(Vec::new()).is_empty());
    }

    #[test]
    fn test_reflect_two_table_schema() {
        smol::block_on(async {
            let (_dir, path) = shop_database().await;
            let mut conn = open_sqlite(&path).await;

            let schema = reflect(&mut conn).await.unwrap();

            let names: Vec<&str> = schema.tables.iter().map(|t| t.table_name.as_str()).collect();
            assert_eq!(names, vec!["customers", "orders"]);

            let customers = schema.get("customers").unwrap();
            assert_eq!(
                customers.columns,
                vec![
                    ColumnDetail {
                        column_name: "id".to_string(),
                        data_type: "INTEGER".to_string(),
                    },
                    ColumnDetail {
                        column_name: "name".to_string(),
                        data_type: "TEXT".to_string(),
                    },
                ]
            );
            assert!(customers.foreign_keys.is_empty());

            let orders = schema.get("orders").unwrap();
            assert_eq!(
                orders.column_lines(),
                vec!["id (INTEGER)", "customer_id (INTEGER)", "total (REAL)"]
            );
            assert_eq!(
                orders.relationship_lines(),
                vec!["customer_id references customers(id)"]
            );
        });
    }

    #[test]
    fn test_reflect_empty_database() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let mut conn = open_sqlite(&dir.path().join("empty.db")).await;

            let schema = reflect(&mut conn).await.unwrap();
            assert!(schema.is_empty());
        });
    }
}
