// ==========================================
// 销售数据仓库 - 银层装载器实现
// ==========================================
// 职责: 整合铜层 → 银层装载流程
// 流程: 读取 → DQ 校验 → 转换（去重/规整/修复/派生）→ 零行复核 → 整表替换 → 批次审计
// 红线: 单实体失败不影响其他实体；写入失败时银层表保持上次成功状态
// ==========================================

use crate::cleansing::cleansing_trait::{BronzeBatch, BronzeSource, DqValidator, SilverLoader};
use crate::cleansing::dq_validator::DqValidatorImpl;
use crate::cleansing::entity_pipelines::SilverTransformer;
use crate::cleansing::error::{CleansingError, CleansingResult};
use crate::cleansing::silver_audit::SilverAuditor;
use crate::config::{CleansingConfig, CleansingConfigReader};
use crate::domain::{
    AuditFinding, BronzeRecord, DqReport, DqViolation, EntityLoadResult, LoadBatch,
    LoadRunSummary, RunContext, SilverEntity,
};
use crate::repository::{RepositoryError, SilverRepository};
use futures::future::join_all;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// 单实体装载中间结果
struct EntityOutcome {
    report: DqReport,
    rejected_rows: usize,
    dropped_rows: usize,
    repaired_rows: usize,
    loaded_rows: usize,
    audit_findings: Vec<AuditFinding>,
}

// ==========================================
// SilverLoaderImpl - 银层装载器实现
// ==========================================
pub struct SilverLoaderImpl<S, R, C>
where
    S: BronzeSource,
    R: SilverRepository,
    C: CleansingConfigReader,
{
    // 铜层数据源
    source: S,

    // 银层仓储
    silver_repo: R,

    // 配置读取器
    config: C,

    // 校验组件
    dq_validator: Box<dyn DqValidator>,
}

impl<S, R, C> SilverLoaderImpl<S, R, C>
where
    S: BronzeSource,
    R: SilverRepository,
    C: CleansingConfigReader,
{
    /// 创建新的 SilverLoader 实例
    ///
    /// # 参数
    /// - source: 铜层数据源
    /// - silver_repo: 银层仓储
    /// - config: 配置读取器
    /// - dq_validator: DQ 校验器
    pub fn new(source: S, silver_repo: R, config: C, dq_validator: Box<dyn DqValidator>) -> Self {
        Self {
            source,
            silver_repo,
            config,
            dq_validator,
        }
    }

    /// 使用默认校验器
    pub fn with_defaults(source: S, silver_repo: R, config: C) -> Self {
        Self::new(source, silver_repo, config, Box::new(DqValidatorImpl))
    }

    pub fn silver_repo(&self) -> &R {
        &self.silver_repo
    }
}

#[async_trait::async_trait]
impl<S, R, C> SilverLoader for SilverLoaderImpl<S, R, C>
where
    S: BronzeSource,
    R: SilverRepository,
    C: CleansingConfigReader,
{
    #[instrument(skip(self, entity, ctx), fields(batch_id = %ctx.batch_id, entity = %entity))]
    async fn load_entity(
        &self,
        entity: SilverEntity,
        ctx: &RunContext,
    ) -> CleansingResult<EntityLoadResult> {
        let start_time = Instant::now();
        info!("开始装载银层实体");

        // === 步骤 1: 读取配置 ===
        debug!("步骤 1: 读取清洗配置");
        let config = self.config.get_cleansing_config().await?;
        let transformer = SilverTransformer::with_config(config.clone());
        let auditor = SilverAuditor::new(config.clone());

        // === 步骤 2 ~ 5: 实体管道 ===
        let outcome = match entity {
            SilverEntity::Customer => self.load_customers(ctx, &transformer, &auditor).await?,
            SilverEntity::Product => self.load_products(ctx, &transformer, &auditor).await?,
            SilverEntity::SalesDetail => self.load_sales(ctx, &transformer, &auditor).await?,
            SilverEntity::CustomerDemographic => {
                self.load_customer_demographics(ctx, &config, &transformer, &auditor)
                    .await?
            }
            SilverEntity::Location => self.load_locations(ctx, &transformer, &auditor).await?,
            SilverEntity::Category => self.load_categories(ctx, &transformer, &auditor).await?,
        };

        for finding in &outcome.audit_findings {
            warn!(
                check = %finding.check,
                offending_rows = finding.offending_rows,
                sample = ?finding.sample,
                "零行复核未通过"
            );
        }

        // === 步骤 6: 记录批次信息 ===
        let elapsed_time = start_time.elapsed();
        let summary = outcome.report.summary.clone();
        let dq_report_json = serde_json::to_string(&outcome.report)
            .map_err(|e| CleansingError::InternalError(format!("DQ 报告序列化失败: {}", e)))?;

        let batch = LoadBatch {
            batch_id: ctx.batch_id.clone(),
            entity,
            source_rows: to_i64(summary.total_rows),
            rejected_rows: to_i64(outcome.rejected_rows),
            dropped_rows: to_i64(outcome.dropped_rows),
            loaded_rows: to_i64(outcome.loaded_rows),
            warning_count: to_i64(summary.warning),
            conflict_count: to_i64(summary.conflict),
            audit_failures: to_i64(outcome.audit_findings.len()),
            loaded_at: ctx.loaded_at,
            elapsed_ms: i64::try_from(elapsed_time.as_millis()).unwrap_or(i64::MAX),
            dq_report_json: Some(dq_report_json),
        };
        // 银层已替换提交，审计记录写入失败不回退实体结果
        let batch_recorded = match self.silver_repo.insert_load_batch(batch.clone()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "批次审计记录写入失败，银层数据已替换");
                false
            }
        };

        info!(
            source_rows = summary.total_rows,
            rejected = outcome.rejected_rows,
            dropped = outcome.dropped_rows,
            repaired = outcome.repaired_rows,
            loaded = outcome.loaded_rows,
            warnings = summary.warning,
            audit_failures = outcome.audit_findings.len(),
            elapsed_ms = elapsed_time.as_millis(),
            "银层实体装载完成"
        );

        Ok(EntityLoadResult {
            batch,
            summary,
            audit_findings: outcome.audit_findings,
            batch_recorded,
            elapsed_time,
        })
    }

    #[instrument(skip(self, ctx), fields(batch_id = %ctx.batch_id))]
    async fn load_all(&self, ctx: &RunContext) -> LoadRunSummary {
        let start_time = Instant::now();
        info!(entities = SilverEntity::ALL.len(), "开始装载银层");

        // 各实体互不依赖，并发执行
        let tasks = SilverEntity::ALL.into_iter().map(|entity| async move {
            let result = match self.load_entity(entity, ctx).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    error!(entity = %entity, error = %e, "银层实体装载失败");
                    Err(e.to_string())
                }
            };
            (entity, result)
        });
        let results = join_all(tasks).await;

        let summary = LoadRunSummary {
            batch_id: ctx.batch_id.clone(),
            results,
            elapsed_time: start_time.elapsed(),
        };

        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            elapsed_ms = summary.elapsed_time.as_millis(),
            "银层装载完成"
        );
        summary
    }
}

// 辅助方法
impl<S, R, C> SilverLoaderImpl<S, R, C>
where
    S: BronzeSource,
    R: SilverRepository,
    C: CleansingConfigReader,
{
    /// 生成 DQ 报告（映射失败行 + 映射告警 + 通用检查 + 实体专属检查）
    fn build_report<T: BronzeRecord>(
        &self,
        ctx: &RunContext,
        entity: SilverEntity,
        batch: &BronzeBatch<T>,
        extra: Vec<DqViolation>,
    ) -> DqReport {
        let profiles: Vec<_> = batch.records.iter().map(|r| r.profile()).collect();
        let (checked, groups) = self
            .dq_validator
            .validate_profiles(&profiles, entity.is_deduplicated());

        let mut violations = batch.rejected.clone();
        violations.extend(batch.warnings.iter().cloned());
        violations.extend(checked);
        violations.extend(extra);

        let report = self.dq_validator.generate_dq_report(
            &ctx.batch_id,
            entity,
            batch.source_rows(),
            violations,
            groups,
        );
        info!(
            errors = report.summary.error,
            warnings = report.summary.warning,
            conflicts = report.summary.conflict,
            duplicate_keys = report.duplicate_groups.len(),
            "DQ 校验完成"
        );
        report
    }

    async fn load_customers(
        &self,
        ctx: &RunContext,
        transformer: &SilverTransformer,
        auditor: &SilverAuditor,
    ) -> CleansingResult<EntityOutcome> {
        let entity = SilverEntity::Customer;
        let batch = self.source.read_customers().await?;
        let report = self.build_report(ctx, entity, &batch, Vec::new());
        let rejected_rows = batch.rejected.len();

        let output = transformer.transform_customers(batch.records, ctx);
        let audit_findings = auditor.audit_customers(&output.rows);
        let loaded_rows = self
            .silver_repo
            .replace_customers(output.rows)
            .await
            .map_err(|e| write_error(entity, e))?;

        Ok(EntityOutcome {
            report,
            rejected_rows,
            dropped_rows: output.dropped_rows,
            repaired_rows: output.repaired_rows,
            loaded_rows,
            audit_findings,
        })
    }

    async fn load_products(
        &self,
        ctx: &RunContext,
        transformer: &SilverTransformer,
        auditor: &SilverAuditor,
    ) -> CleansingResult<EntityOutcome> {
        let entity = SilverEntity::Product;
        let batch = self.source.read_products().await?;
        let report = self.build_report(ctx, entity, &batch, Vec::new());
        let rejected_rows = batch.rejected.len();

        let output = transformer.transform_products(batch.records, ctx);
        let audit_findings = auditor.audit_products(&output.rows);
        let loaded_rows = self
            .silver_repo
            .replace_products(output.rows)
            .await
            .map_err(|e| write_error(entity, e))?;

        Ok(EntityOutcome {
            report,
            rejected_rows,
            dropped_rows: output.dropped_rows,
            repaired_rows: output.repaired_rows,
            loaded_rows,
            audit_findings,
        })
    }

    async fn load_sales(
        &self,
        ctx: &RunContext,
        transformer: &SilverTransformer,
        auditor: &SilverAuditor,
    ) -> CleansingResult<EntityOutcome> {
        let entity = SilverEntity::SalesDetail;
        let batch = self.source.read_sales().await?;
        let extra = self.dq_validator.validate_sales_consistency(&batch.records);
        let report = self.build_report(ctx, entity, &batch, extra);
        let rejected_rows = batch.rejected.len();

        let output = transformer.transform_sales(batch.records, ctx);
        let audit_findings = auditor.audit_sales(&output.rows);
        let loaded_rows = self
            .silver_repo
            .replace_sales(output.rows)
            .await
            .map_err(|e| write_error(entity, e))?;

        Ok(EntityOutcome {
            report,
            rejected_rows,
            dropped_rows: output.dropped_rows,
            repaired_rows: output.repaired_rows,
            loaded_rows,
            audit_findings,
        })
    }

    async fn load_customer_demographics(
        &self,
        ctx: &RunContext,
        config: &CleansingConfig,
        transformer: &SilverTransformer,
        auditor: &SilverAuditor,
    ) -> CleansingResult<EntityOutcome> {
        let entity = SilverEntity::CustomerDemographic;
        let batch = self.source.read_customer_demographics().await?;
        let extra =
            self.dq_validator
                .validate_birthdates(&batch.records, config.birthdate_floor, ctx.today);
        let report = self.build_report(ctx, entity, &batch, extra);
        let rejected_rows = batch.rejected.len();

        let output = transformer.transform_customer_demographics(batch.records, ctx);
        let audit_findings = auditor.audit_customer_demographics(&output.rows, ctx.today);
        let loaded_rows = self
            .silver_repo
            .replace_customer_demographics(output.rows)
            .await
            .map_err(|e| write_error(entity, e))?;

        Ok(EntityOutcome {
            report,
            rejected_rows,
            dropped_rows: output.dropped_rows,
            repaired_rows: output.repaired_rows,
            loaded_rows,
            audit_findings,
        })
    }

    async fn load_locations(
        &self,
        ctx: &RunContext,
        transformer: &SilverTransformer,
        auditor: &SilverAuditor,
    ) -> CleansingResult<EntityOutcome> {
        let entity = SilverEntity::Location;
        let batch = self.source.read_locations().await?;
        let report = self.build_report(ctx, entity, &batch, Vec::new());
        let rejected_rows = batch.rejected.len();

        let output = transformer.transform_locations(batch.records, ctx);
        let audit_findings = auditor.audit_locations(&output.rows);
        let loaded_rows = self
            .silver_repo
            .replace_locations(output.rows)
            .await
            .map_err(|e| write_error(entity, e))?;

        Ok(EntityOutcome {
            report,
            rejected_rows,
            dropped_rows: output.dropped_rows,
            repaired_rows: output.repaired_rows,
            loaded_rows,
            audit_findings,
        })
    }

    async fn load_categories(
        &self,
        ctx: &RunContext,
        transformer: &SilverTransformer,
        auditor: &SilverAuditor,
    ) -> CleansingResult<EntityOutcome> {
        let entity = SilverEntity::Category;
        let batch = self.source.read_categories().await?;
        let report = self.build_report(ctx, entity, &batch, Vec::new());
        let rejected_rows = batch.rejected.len();

        let output = transformer.transform_categories(batch.records, ctx);
        let audit_findings = auditor.audit_categories(&output.rows);
        let loaded_rows = self
            .silver_repo
            .replace_categories(output.rows)
            .await
            .map_err(|e| write_error(entity, e))?;

        Ok(EntityOutcome {
            report,
            rejected_rows,
            dropped_rows: output.dropped_rows,
            repaired_rows: output.repaired_rows,
            loaded_rows,
            audit_findings,
        })
    }
}

fn write_error(entity: SilverEntity, source: RepositoryError) -> CleansingError {
    error!(entity = %entity, error = %source, "银层写入失败，已回滚");
    CleansingError::SilverWriteError {
        entity: entity.table_name().to_string(),
        source,
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
