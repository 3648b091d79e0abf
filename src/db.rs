// ==========================================
// 销售数据仓库 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表（银层六表 + 批次审计 + config_kv）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 幂等创建银层 schema
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SILVER_SCHEMA_SQL)?;

    match read_schema_version(conn)? {
        Some(v) if v >= CURRENT_SCHEMA_VERSION => {}
        Some(v) => {
            tracing::warn!(found = v, expected = CURRENT_SCHEMA_VERSION, "schema_version 低于预期");
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION],
            )?;
        }
        None => {
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION],
            )?;
        }
    }
    Ok(())
}

// 日期列存 ISO 文本（YYYY-MM-DD），时间戳存 RFC3339
const SILVER_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS crm_cust_info (
    cst_id INTEGER PRIMARY KEY,
    cst_key TEXT,
    cst_firstname TEXT,
    cst_lastname TEXT,
    cst_marital_status TEXT NOT NULL,
    cst_gndr TEXT NOT NULL,
    cst_create_date TEXT,
    dwh_create_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS crm_prd_info (
    prd_id INTEGER PRIMARY KEY,
    cat_id TEXT,
    prd_key TEXT,
    prd_nm TEXT,
    prd_cost INTEGER NOT NULL,
    prd_line TEXT NOT NULL,
    prd_start_dt TEXT,
    prd_end_dt TEXT,
    dwh_create_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS crm_sales_details (
    sls_ord_num TEXT,
    sls_prd_key TEXT,
    sls_cust_id INTEGER,
    sls_order_dt TEXT,
    sls_ship_dt TEXT,
    sls_due_dt TEXT,
    sls_sales INTEGER,
    sls_quantity INTEGER,
    sls_price INTEGER,
    dwh_create_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS erp_cust_az12 (
    cid TEXT,
    bdate TEXT,
    gen TEXT NOT NULL,
    dwh_create_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS erp_loc_a101 (
    cid TEXT,
    cntry TEXT NOT NULL,
    dwh_create_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS erp_px_cat_g1v2 (
    id TEXT,
    cat TEXT,
    subcat TEXT,
    maintenance TEXT,
    dwh_create_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS silver_load_batch (
    batch_id TEXT NOT NULL,
    entity TEXT NOT NULL,
    source_rows INTEGER NOT NULL,
    rejected_rows INTEGER NOT NULL,
    dropped_rows INTEGER NOT NULL,
    loaded_rows INTEGER NOT NULL,
    warning_count INTEGER NOT NULL,
    conflict_count INTEGER NOT NULL,
    audit_failures INTEGER NOT NULL,
    loaded_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    dq_report_json TEXT,
    PRIMARY KEY (batch_id, entity)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND (name LIKE 'crm_%' OR name LIKE 'erp_%')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }
}
