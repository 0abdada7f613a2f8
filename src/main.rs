// ==========================================
// 导入规范化引擎 - 命令行入口
// ==========================================
// 用法:
//   import-normalizer init-db <db_path>
//   import-normalizer normalize <db_path> <tenant_id> <rows.json>
//   import-normalizer renormalize <db_path> <tenant_id> [max_records]
// db_path 为 "-" 时使用默认数据库路径
// ==========================================

use anyhow::{bail, Context};
use import_normalizer::config::{ConfigManager, EngineConfigReader};
use import_normalizer::db::{default_db_path, initialize_schema, open_sqlite_connection};
use import_normalizer::domain::RawImportRow;
use import_normalizer::normalizer::{NormalizationService, RenormalizeOptions};
use import_normalizer::repository::{ModelRecordRepositoryImpl, SnapshotRepositoryImpl};
use import_normalizer::{logging, APP_NAME, VERSION};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

const USAGE: &str = "用法:
  import-normalizer init-db <db_path>
  import-normalizer normalize <db_path> <tenant_id> <rows.json>
  import-normalizer renormalize <db_path> <tenant_id> [max_records]
(db_path 为 - 时使用默认路径)";

fn resolve_db_path(arg: &str) -> String {
    if arg == "-" {
        default_db_path()
    } else {
        arg.to_string()
    }
}

fn open_database(arg: &str) -> anyhow::Result<Arc<Mutex<Connection>>> {
    let db_path = resolve_db_path(arg);
    tracing::info!(db_path = %db_path, "使用数据库");
    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    initialize_schema(&conn).context("建表失败")?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn build_service(
    conn: &Arc<Mutex<Connection>>,
) -> anyhow::Result<(
    NormalizationService<SnapshotRepositoryImpl, ConfigManager>,
    Arc<ConfigManager>,
)> {
    let config = Arc::new(
        ConfigManager::from_connection(Arc::clone(conn))
            .map_err(|e| anyhow::anyhow!("配置管理器初始化失败: {}", e))?,
    );
    let snapshots = Arc::new(SnapshotRepositoryImpl::from_connection(Arc::clone(conn)));
    Ok((
        NormalizationService::new(snapshots, Arc::clone(&config)),
        config,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    tracing::info!("{} v{}", APP_NAME, VERSION);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        bail!("缺少子命令");
    };

    match command.as_str() {
        "init-db" => {
            let db_arg = args.get(1).map(String::as_str).unwrap_or("-");
            open_database(db_arg)?;
            println!("{}", resolve_db_path(db_arg));
        }
        "normalize" => {
            let (Some(db_arg), Some(tenant_id), Some(rows_path)) =
                (args.get(1), args.get(2), args.get(3))
            else {
                eprintln!("{}", USAGE);
                bail!("normalize 参数不足");
            };

            let raw = std::fs::read_to_string(rows_path)
                .with_context(|| format!("无法读取行文件: {}", rows_path))?;
            let rows: Vec<RawImportRow> =
                serde_json::from_str(&raw).context("行文件格式错误")?;

            let conn = open_database(db_arg)?;
            let (service, _) = build_service(&conn)?;
            let result = service.run_import(tenant_id, rows).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "renormalize" => {
            let (Some(db_arg), Some(tenant_id)) = (args.get(1), args.get(2)) else {
                eprintln!("{}", USAGE);
                bail!("renormalize 参数不足");
            };
            let max_records = match args.get(3) {
                Some(v) => Some(v.parse::<usize>().context("max_records 必须是正整数")?),
                None => None,
            };

            let conn = open_database(db_arg)?;
            let (service, config) = build_service(&conn)?;
            let batch_size = config
                .get_renormalize_batch_size(tenant_id)
                .await
                .map_err(|e| anyhow::anyhow!("配置读取失败: {}", e))?;
            let records = ModelRecordRepositoryImpl::from_connection(Arc::clone(&conn));

            let options = RenormalizeOptions {
                batch_size,
                max_records,
                ..RenormalizeOptions::default()
            };
            let report = service
                .renormalize_models(&records, tenant_id, &options)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        other => {
            eprintln!("{}", USAGE);
            bail!("未知子命令: {}", other);
        }
    }

    Ok(())
}
