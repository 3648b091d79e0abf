// ==========================================
// SilverRepository 集成测试
// ==========================================
// 测试目标: 文件数据库上的整表替换、空值往返、批次审计查询
// ==========================================


use chrono::{NaiveDate, TimeZone, Utc};
use sales_dwh::domain::{LoadBatch, SilverEntity, SilverProduct, SilverSalesDetail};
use sales_dwh::repository::{SilverRepository, SilverRepositoryImpl};
use test_helpers::create_test_db;

fn sale(ord: &str, order_dt: Option<NaiveDate>, sales: Option<i64>) -> SilverSalesDetail {
    SilverSalesDetail {
        sls_ord_num: Some(ord.to_string()),
        sls_prd_key: None,
        sls_cust_id: Some(21768),
        sls_order_dt: order_dt,
        sls_ship_dt: None,
        sls_due_dt: NaiveDate::from_ymd_opt(2011, 1, 10),
        sls_sales: sales,
        sls_quantity: Some(1),
        sls_price: None,
        dwh_create_date: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
    }
}

fn batch(batch_id: &str, entity: SilverEntity, hour: u32) -> LoadBatch {
    LoadBatch {
        batch_id: batch_id.to_string(),
        entity,
        source_rows: 10,
        rejected_rows: 1,
        dropped_rows: 2,
        loaded_rows: 7,
        warning_count: 3,
        conflict_count: 1,
        audit_failures: 0,
        loaded_at: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap(),
        elapsed_ms: 12,
        dq_report_json: None,
    }
}

#[tokio::test]
async fn test_sales_roundtrip_preserves_nulls_and_order() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = SilverRepositoryImpl::new(&db_path).unwrap();

    let rows = vec![
        sale("SO2", None, Some(50)),
        sale("SO1", NaiveDate::from_ymd_opt(2010, 12, 29), None),
        sale("SO2", None, Some(50)),
    ];
    let written = repo.replace_sales(rows.clone()).await.unwrap();

    assert_eq!(written, 3);
    assert_eq!(repo.list_sales().await.unwrap(), rows);
}

#[tokio::test]
async fn test_contents_survive_reopen() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let product = SilverProduct {
        prd_id: 210,
        cat_id: Some("CO_RF".to_string()),
        prd_key: Some("FR-R92B-58".to_string()),
        prd_nm: Some("HL Road Frame - Black- 58".to_string()),
        prd_cost: 0,
        prd_line: "Road".to_string(),
        prd_start_dt: NaiveDate::from_ymd_opt(2003, 7, 1),
        prd_end_dt: None,
        dwh_create_date: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
    };

    {
        let repo = SilverRepositoryImpl::new(&db_path).unwrap();
        repo.replace_products(vec![product.clone()]).await.unwrap();
    }

    let reopened = SilverRepositoryImpl::new(&db_path).unwrap();
    assert_eq!(reopened.list_products().await.unwrap(), vec![product]);
    assert_eq!(reopened.count_rows(SilverEntity::Customer).await.unwrap(), 0);
}

#[tokio::test]
async fn test_load_batches_filter_and_order() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = SilverRepositoryImpl::new(&db_path).unwrap();

    repo.insert_load_batch(batch("B1", SilverEntity::Customer, 8)).await.unwrap();
    repo.insert_load_batch(batch("B1", SilverEntity::Category, 8)).await.unwrap();
    repo.insert_load_batch(batch("B2", SilverEntity::Customer, 9)).await.unwrap();

    // 同 batch_id + entity 覆盖
    let mut rerun = batch("B1", SilverEntity::Customer, 8);
    rerun.loaded_rows = 8;
    rerun.dq_report_json = Some("{}".to_string());
    repo.insert_load_batch(rerun.clone()).await.unwrap();

    let all = repo.list_load_batches(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].batch_id, "B2", "newest first");

    let b1 = repo.list_load_batches(Some("B1")).await.unwrap();
    assert_eq!(b1.len(), 2);
    let customer = b1.iter().find(|b| b.entity == SilverEntity::Customer).unwrap();
    assert_eq!(customer, &rerun);

    assert!(repo.list_load_batches(Some("B3")).await.unwrap().is_empty());
}
