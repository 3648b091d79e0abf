// ==========================================
// 销售数据仓库 - 命令行入口
// ==========================================
// 用法: sales-dwh [bronze_dir] [db_path]
// - bronze_dir: 铜层根目录（默认 ./datasets）
// - db_path: 银层数据库（默认 SALES_DWH_DB_PATH 或用户数据目录）
// ==========================================

use anyhow::{bail, Context};
use sales_dwh::app::{get_default_db_path, AppState};
use sales_dwh::domain::RunContext;
use sales_dwh::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let bronze_dir = args.next().unwrap_or_else(|| "datasets".to_string());
    let db_path = args.next().unwrap_or_else(get_default_db_path);

    tracing::info!("==================================================");
    tracing::info!("{} - 银层装载", sales_dwh::APP_NAME);
    tracing::info!("系统版本: {}", sales_dwh::VERSION);
    tracing::info!("==================================================");

    let state = AppState::new(db_path.clone())
        .with_context(|| format!("无法打开数据库: {}", db_path))?;

    let ctx = RunContext::now();
    let summary = state
        .run_silver_load(&bronze_dir, &ctx)
        .await
        .with_context(|| format!("无法读取铜层目录: {}", bronze_dir))?;

    println!("batch_id: {}", summary.batch_id);
    println!(
        "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8} {:>6} {:>10}",
        "entity", "source", "rejected", "dropped", "loaded", "warning", "audit", "elapsed_ms"
    );
    for (entity, result) in &summary.results {
        match result {
            Ok(r) => println!(
                "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8} {:>6} {:>10}",
                entity.table_name(),
                r.batch.source_rows,
                r.batch.rejected_rows,
                r.batch.dropped_rows,
                r.batch.loaded_rows,
                r.batch.warning_count,
                r.batch.audit_failures,
                r.batch.elapsed_ms
            ),
            Err(e) => println!("{:<20} FAILED: {}", entity.table_name(), e),
        }
    }
    println!("total elapsed: {} ms", summary.elapsed_time.as_millis());

    if summary.failed() > 0 {
        bail!("{} 个实体装载失败", summary.failed());
    }
    Ok(())
}
