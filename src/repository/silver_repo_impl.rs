// ==========================================
// 销售数据仓库 - 银层 Repository 实现
// ==========================================
// 职责: 实现银层整表替换与读取（使用 rusqlite）
// 替换流程（单事务）:
//   1. 新批次写入 TEMP 暂存表
//   2. DELETE 目标表 → INSERT ... SELECT 暂存表
//   3. DROP 暂存表 → COMMIT
//   任一步失败整体回滚，目标表保持上次成功内容
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::{
    LoadBatch, SilverCategory, SilverCustomer, SilverCustomerDemographic, SilverEntity,
    SilverLocation, SilverProduct, SilverSalesDetail,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::silver_repo::SilverRepository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ===== 列定义（与 db.rs 建表语句一致）=====
const CUSTOMER_COLUMNS: &[&str] = &[
    "cst_id",
    "cst_key",
    "cst_firstname",
    "cst_lastname",
    "cst_marital_status",
    "cst_gndr",
    "cst_create_date",
    "dwh_create_date",
];
const PRODUCT_COLUMNS: &[&str] = &[
    "prd_id",
    "cat_id",
    "prd_key",
    "prd_nm",
    "prd_cost",
    "prd_line",
    "prd_start_dt",
    "prd_end_dt",
    "dwh_create_date",
];
const SALES_COLUMNS: &[&str] = &[
    "sls_ord_num",
    "sls_prd_key",
    "sls_cust_id",
    "sls_order_dt",
    "sls_ship_dt",
    "sls_due_dt",
    "sls_sales",
    "sls_quantity",
    "sls_price",
    "dwh_create_date",
];
const DEMOGRAPHIC_COLUMNS: &[&str] = &["cid", "bdate", "gen", "dwh_create_date"];
const LOCATION_COLUMNS: &[&str] = &["cid", "cntry", "dwh_create_date"];
const CATEGORY_COLUMNS: &[&str] = &["id", "cat", "subcat", "maintenance", "dwh_create_date"];

// ==========================================
// 值转换
// ==========================================
fn date_value(date: Option<NaiveDate>) -> Value {
    Value::from(date.map(|d| d.format("%Y-%m-%d").to_string()))
}

fn timestamp_value(ts: &DateTime<Utc>) -> Value {
    Value::from(ts.to_rfc3339())
}

fn read_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn read_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn customer_values(r: &SilverCustomer) -> Vec<Value> {
    vec![
        Value::from(r.cst_id),
        Value::from(r.cst_key.clone()),
        Value::from(r.cst_firstname.clone()),
        Value::from(r.cst_lastname.clone()),
        Value::from(r.cst_marital_status.clone()),
        Value::from(r.cst_gndr.clone()),
        date_value(r.cst_create_date),
        timestamp_value(&r.dwh_create_date),
    ]
}

fn product_values(r: &SilverProduct) -> Vec<Value> {
    vec![
        Value::from(r.prd_id),
        Value::from(r.cat_id.clone()),
        Value::from(r.prd_key.clone()),
        Value::from(r.prd_nm.clone()),
        Value::from(r.prd_cost),
        Value::from(r.prd_line.clone()),
        date_value(r.prd_start_dt),
        date_value(r.prd_end_dt),
        timestamp_value(&r.dwh_create_date),
    ]
}

fn sales_values(r: &SilverSalesDetail) -> Vec<Value> {
    vec![
        Value::from(r.sls_ord_num.clone()),
        Value::from(r.sls_prd_key.clone()),
        Value::from(r.sls_cust_id),
        date_value(r.sls_order_dt),
        date_value(r.sls_ship_dt),
        date_value(r.sls_due_dt),
        Value::from(r.sls_sales),
        Value::from(r.sls_quantity),
        Value::from(r.sls_price),
        timestamp_value(&r.dwh_create_date),
    ]
}

fn demographic_values(r: &SilverCustomerDemographic) -> Vec<Value> {
    vec![
        Value::from(r.cid.clone()),
        date_value(r.bdate),
        Value::from(r.gen.clone()),
        timestamp_value(&r.dwh_create_date),
    ]
}

fn location_values(r: &SilverLocation) -> Vec<Value> {
    vec![
        Value::from(r.cid.clone()),
        Value::from(r.cntry.clone()),
        timestamp_value(&r.dwh_create_date),
    ]
}

fn category_values(r: &SilverCategory) -> Vec<Value> {
    vec![
        Value::from(r.id.clone()),
        Value::from(r.cat.clone()),
        Value::from(r.subcat.clone()),
        Value::from(r.maintenance.clone()),
        timestamp_value(&r.dwh_create_date),
    ]
}

// ==========================================
// SilverRepositoryImpl
// ==========================================
pub struct SilverRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl SilverRepositoryImpl {
    /// 打开数据库并确保银层 schema 存在
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 共享已有连接（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 两阶段整表替换
    fn replace_table<T>(
        &self,
        entity: SilverEntity,
        columns: &[&str],
        rows: &[T],
        to_values: fn(&T) -> Vec<Value>,
    ) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let count = Self::replace_table_tx(&tx, entity, columns, rows, to_values)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!(entity = %entity, rows = count, "银层整表替换完成");
        Ok(count)
    }

    /// 在事务中完成暂存 + 交换（出错时由 Transaction drop 回滚）
    fn replace_table_tx<T>(
        tx: &Transaction,
        entity: SilverEntity,
        columns: &[&str],
        rows: &[T],
        to_values: fn(&T) -> Vec<Value>,
    ) -> RepositoryResult<usize> {
        let table = entity.table_name();
        let stage = format!("stage_{}", table);
        let column_list = columns.join(", ");

        // 阶段 1: 暂存
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS temp.{stage};
             CREATE TEMP TABLE {stage} AS SELECT {column_list} FROM main.{table} WHERE 0;"
        ))?;

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO temp.{stage} ({column_list}) VALUES ({placeholders})"
            ))?;
            for row in rows {
                stmt.execute(params_from_iter(to_values(row)))?;
            }
        }

        // 阶段 2: 交换
        tx.execute(&format!("DELETE FROM main.{table}"), [])?;
        let count = tx.execute(
            &format!(
                "INSERT INTO main.{table} ({column_list}) SELECT {column_list} FROM temp.{stage} ORDER BY rowid"
            ),
            [],
        )?;
        tx.execute_batch(&format!("DROP TABLE temp.{stage};"))?;

        Ok(count)
    }

    fn query_all<T>(
        &self,
        entity: SilverEntity,
        columns: &[&str],
        map_row: fn(&Row) -> rusqlite::Result<T>,
    ) -> RepositoryResult<Vec<T>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY rowid",
            columns.join(", "),
            entity.table_name()
        ))?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    fn map_load_batch(row: &Row) -> rusqlite::Result<LoadBatch> {
        let entity_name: String = row.get(1)?;
        let entity = SilverEntity::from_table_name(&entity_name).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("未知实体: {}", entity_name).into(),
            )
        })?;

        Ok(LoadBatch {
            batch_id: row.get(0)?,
            entity,
            source_rows: row.get(2)?,
            rejected_rows: row.get(3)?,
            dropped_rows: row.get(4)?,
            loaded_rows: row.get(5)?,
            warning_count: row.get(6)?,
            conflict_count: row.get(7)?,
            audit_failures: row.get(8)?,
            loaded_at: read_timestamp(row, 9)?,
            elapsed_ms: row.get(10)?,
            dq_report_json: row.get(11)?,
        })
    }
}

#[async_trait]
impl SilverRepository for SilverRepositoryImpl {
    async fn replace_customers(&self, rows: Vec<SilverCustomer>) -> RepositoryResult<usize> {
        self.replace_table(SilverEntity::Customer, CUSTOMER_COLUMNS, &rows, customer_values)
    }

    async fn replace_products(&self, rows: Vec<SilverProduct>) -> RepositoryResult<usize> {
        self.replace_table(SilverEntity::Product, PRODUCT_COLUMNS, &rows, product_values)
    }

    async fn replace_sales(&self, rows: Vec<SilverSalesDetail>) -> RepositoryResult<usize> {
        self.replace_table(SilverEntity::SalesDetail, SALES_COLUMNS, &rows, sales_values)
    }

    async fn replace_customer_demographics(
        &self,
        rows: Vec<SilverCustomerDemographic>,
    ) -> RepositoryResult<usize> {
        self.replace_table(
            SilverEntity::CustomerDemographic,
            DEMOGRAPHIC_COLUMNS,
            &rows,
            demographic_values,
        )
    }

    async fn replace_locations(&self, rows: Vec<SilverLocation>) -> RepositoryResult<usize> {
        self.replace_table(SilverEntity::Location, LOCATION_COLUMNS, &rows, location_values)
    }

    async fn replace_categories(&self, rows: Vec<SilverCategory>) -> RepositoryResult<usize> {
        self.replace_table(SilverEntity::Category, CATEGORY_COLUMNS, &rows, category_values)
    }

    async fn list_customers(&self) -> RepositoryResult<Vec<SilverCustomer>> {
        self.query_all(SilverEntity::Customer, CUSTOMER_COLUMNS, |row| {
            Ok(SilverCustomer {
                cst_id: row.get(0)?,
                cst_key: row.get(1)?,
                cst_firstname: row.get(2)?,
                cst_lastname: row.get(3)?,
                cst_marital_status: row.get(4)?,
                cst_gndr: row.get(5)?,
                cst_create_date: read_date(row, 6)?,
                dwh_create_date: read_timestamp(row, 7)?,
            })
        })
    }

    async fn list_products(&self) -> RepositoryResult<Vec<SilverProduct>> {
        self.query_all(SilverEntity::Product, PRODUCT_COLUMNS, |row| {
            Ok(SilverProduct {
                prd_id: row.get(0)?,
                cat_id: row.get(1)?,
                prd_key: row.get(2)?,
                prd_nm: row.get(3)?,
                prd_cost: row.get(4)?,
                prd_line: row.get(5)?,
                prd_start_dt: read_date(row, 6)?,
                prd_end_dt: read_date(row, 7)?,
                dwh_create_date: read_timestamp(row, 8)?,
            })
        })
    }

    async fn list_sales(&self) -> RepositoryResult<Vec<SilverSalesDetail>> {
        self.query_all(SilverEntity::SalesDetail, SALES_COLUMNS, |row| {
            Ok(SilverSalesDetail {
                sls_ord_num: row.get(0)?,
                sls_prd_key: row.get(1)?,
                sls_cust_id: row.get(2)?,
                sls_order_dt: read_date(row, 3)?,
                sls_ship_dt: read_date(row, 4)?,
                sls_due_dt: read_date(row, 5)?,
                sls_sales: row.get(6)?,
                sls_quantity: row.get(7)?,
                sls_price: row.get(8)?,
                dwh_create_date: read_timestamp(row, 9)?,
            })
        })
    }

    async fn list_customer_demographics(&self) -> RepositoryResult<Vec<SilverCustomerDemographic>> {
        self.query_all(SilverEntity::CustomerDemographic, DEMOGRAPHIC_COLUMNS, |row| {
            Ok(SilverCustomerDemographic {
                cid: row.get(0)?,
                bdate: read_date(row, 1)?,
                gen: row.get(2)?,
                dwh_create_date: read_timestamp(row, 3)?,
            })
        })
    }

    async fn list_locations(&self) -> RepositoryResult<Vec<SilverLocation>> {
        self.query_all(SilverEntity::Location, LOCATION_COLUMNS, |row| {
            Ok(SilverLocation {
                cid: row.get(0)?,
                cntry: row.get(1)?,
                dwh_create_date: read_timestamp(row, 2)?,
            })
        })
    }

    async fn list_categories(&self) -> RepositoryResult<Vec<SilverCategory>> {
        self.query_all(SilverEntity::Category, CATEGORY_COLUMNS, |row| {
            Ok(SilverCategory {
                id: row.get(0)?,
                cat: row.get(1)?,
                subcat: row.get(2)?,
                maintenance: row.get(3)?,
                dwh_create_date: read_timestamp(row, 4)?,
            })
        })
    }

    async fn count_rows(&self, entity: SilverEntity) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", entity.table_name()),
            [],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|e| RepositoryError::FieldValueError {
            field: "count".to_string(),
            message: e.to_string(),
        })
    }

    async fn insert_load_batch(&self, batch: LoadBatch) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO silver_load_batch (
                batch_id, entity, source_rows, rejected_rows, dropped_rows,
                loaded_rows, warning_count, conflict_count, audit_failures,
                loaded_at, elapsed_ms, dq_report_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                batch.batch_id,
                batch.entity.table_name(),
                batch.source_rows,
                batch.rejected_rows,
                batch.dropped_rows,
                batch.loaded_rows,
                batch.warning_count,
                batch.conflict_count,
                batch.audit_failures,
                batch.loaded_at.to_rfc3339(),
                batch.elapsed_ms,
                batch.dq_report_json,
            ],
        )?;
        Ok(())
    }

    async fn list_load_batches(&self, batch_id: Option<&str>) -> RepositoryResult<Vec<LoadBatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, entity, source_rows, rejected_rows, dropped_rows,
                   loaded_rows, warning_count, conflict_count, audit_failures,
                   loaded_at, elapsed_ms, dq_report_json
            FROM silver_load_batch
            WHERE ?1 IS NULL OR batch_id = ?1
            ORDER BY loaded_at DESC, entity ASC
            "#,
        )?;
        let batches = stmt
            .query_map(params![batch_id], Self::map_load_batch)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn repo() -> SilverRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        SilverRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn location(cid: &str, cntry: &str) -> SilverLocation {
        SilverLocation {
            cid: Some(cid.to_string()),
            cntry: cntry.to_string(),
            dwh_create_date: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_replace_overwrites_previous_contents() {
        let repo = repo();
        repo.replace_locations(vec![location("A", "Germany"), location("B", "n/a")])
            .await
            .unwrap();
        repo.replace_locations(vec![location("C", "France")]).await.unwrap();

        let rows = repo.list_locations().await.unwrap();
        assert_eq!(rows, vec![location("C", "France")]);
        assert_eq!(repo.count_rows(SilverEntity::Location).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_contents() {
        let repo = repo();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let customer = |id: i64| SilverCustomer {
            cst_id: id,
            cst_key: None,
            cst_firstname: None,
            cst_lastname: None,
            cst_marital_status: "n/a".to_string(),
            cst_gndr: "Other".to_string(),
            cst_create_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            dwh_create_date: at,
        };
        repo.replace_customers(vec![customer(1)]).await.unwrap();

        // 主键冲突在交换阶段触发
        let result = repo.replace_customers(vec![customer(2), customer(2)]).await;

        assert!(matches!(result, Err(RepositoryError::UniqueConstraintViolation(_))));
        assert_eq!(repo.list_customers().await.unwrap(), vec![customer(1)]);
    }
}
