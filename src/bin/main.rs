use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use strategy_vault::chain::{HttpLedger, Ledger, OnChainPersister};
use strategy_vault::config;
use strategy_vault::execution::ExecutionTracker;
use strategy_vault::lifecycle::LifecycleCoordinator;
use strategy_vault::storage::{
    JsonFileRepository, StrategyPlan, StrategyStatus, StrategyStore,
};
use strategy_vault::wallet::{
    CallbackParams, CallbackResolution, ClientStore, ConnectOutcome, HttpWalletProvider,
    JsonFileClientStore, WalletConnector, WalletProvider,
};

/// 收益策略的本地存儲與帳本提交工具
#[derive(Parser)]
#[command(name = "strategy_vault", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 保存策略計劃為本地記錄
    Save {
        /// 策略名稱
        #[arg(long)]
        name: String,
        /// 策略計劃的 JSON 文件
        #[arg(long)]
        file: PathBuf,
        /// 逗號分隔的標籤
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// 列出策略記錄
    List {
        /// 按聚合狀態過濾（saved/executing/completed/failed）
        #[arg(long)]
        status: Option<String>,
    },
    /// 對名稱、目標與標籤做查詢
    Search { query: String },
    /// 顯示單筆策略記錄
    Show { id: String },
    /// 刪除策略記錄
    Delete { id: String },
    /// 顯示策略的執行歷史
    History { id: String },
    /// 顯示策略的績效指標
    Performance { id: String },
    /// 連接錢包
    Connect,
    /// 處理重定向著陸 URL
    Callback { url: String },
    /// 斷開錢包
    Disconnect,
    /// 顯示錢包連接狀態
    Status,
    /// 把策略提交到帳本
    Execute { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化配置
    config::init_config()?;
    let app_config = config::get_config();

    // 初始化日誌系統
    let _log_guard = init_logging(&app_config.log)?;

    // 組裝各組件
    let repository = Arc::new(JsonFileRepository::new(&app_config.storage.strategies_file));
    let store = Arc::new(StrategyStore::new(repository));
    let tracker = Arc::new(ExecutionTracker::new(store.clone()));

    let client_store: Arc<dyn ClientStore> =
        Arc::new(JsonFileClientStore::new(&app_config.storage.client_store_file));
    let provider: Arc<dyn WalletProvider> = Arc::new(HttpWalletProvider::new(&app_config.wallet)?);
    let connector = Arc::new(WalletConnector::new(
        provider,
        client_store.clone(),
        app_config.wallet.connect_timeout(),
        app_config.wallet.pending_ttl(),
    ));

    let ledger: Arc<dyn Ledger> = Arc::new(HttpLedger::new(&app_config.ledger)?);
    let persister = Arc::new(OnChainPersister::new(
        connector.clone(),
        ledger,
        app_config.ledger.submit_timeout(),
    ));
    let coordinator = LifecycleCoordinator::new(
        tracker.clone(),
        connector.clone(),
        persister,
        client_store.clone(),
        app_config.wallet.pending_ttl(),
    );

    match cli.command {
        Command::Save { name, file, tags } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("無法讀取計劃文件: {}", file.display()))?;
            let plan: StrategyPlan =
                serde_json::from_str(&content).context("無法解析策略計劃 JSON")?;

            let tags = if tags.is_empty() { None } else { Some(tags) };
            let saved = store
                .save(plan, &name, tags)
                .await
                .ok_or_else(|| anyhow!("保存策略失敗，詳見日誌"))?;
            println!("策略已保存: {}", saved.id);
        }
        Command::List { status } => {
            let strategies = match status {
                Some(status) => {
                    let status =
                        StrategyStatus::from_str(&status).map_err(|e| anyhow!(e))?;
                    store.list_by_status(status).await
                }
                None => store.list_all().await,
            };
            print_strategy_lines(&strategies);
        }
        Command::Search { query } => {
            let strategies = store.search(&query).await;
            print_strategy_lines(&strategies);
        }
        Command::Show { id } => {
            let strategy = store
                .get_by_id(&id)
                .await
                .ok_or_else(|| anyhow!("策略不存在: {}", id))?;
            println!("{}", serde_json::to_string_pretty(&strategy)?);
        }
        Command::Delete { id } => {
            if store.delete(&id).await {
                println!("策略已刪除: {}", id);
            } else {
                println!("策略不存在: {}", id);
            }
        }
        Command::History { id } => {
            let strategy = store
                .get_by_id(&id)
                .await
                .ok_or_else(|| anyhow!("策略不存在: {}", id))?;
            if strategy.execution_history.is_empty() {
                println!("策略 {} 尚無執行記錄", id);
            }
            for record in &strategy.execution_history {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
        Command::Performance { id } => {
            let strategy = store
                .get_by_id(&id)
                .await
                .ok_or_else(|| anyhow!("策略不存在: {}", id))?;
            match strategy.performance {
                Some(performance) => {
                    println!("{}", serde_json::to_string_pretty(&performance)?)
                }
                None => println!("策略 {} 尚無績效指標", id),
            }
        }
        Command::Connect => {
            connector.restore_on_load().await;
            match connector.connect().await? {
                ConnectOutcome::Connected(session) => {
                    println!("錢包已連接: {}", session.account_id);
                }
                ConnectOutcome::RedirectInitiated { authorization_url } => {
                    println!("請在瀏覽器中打開以下地址完成授權:");
                    println!("{}", authorization_url);
                    println!("完成後使用 callback 子命令提交著陸 URL");
                }
                ConnectOutcome::AlreadyConnecting => {
                    println!("已有一次連接在進行中");
                }
            }
        }
        Command::Callback { url } => {
            connector.restore_on_load().await;
            let params = CallbackParams::from_url(&url).context("無法解析著陸 URL")?;

            match connector.resume_from_callback(&params).await? {
                CallbackResolution::Session(session) => {
                    println!("錢包已連接: {}", session.account_id);
                }
                CallbackResolution::Expired => {
                    println!("授權已過期，請重新連接");
                }
                CallbackResolution::NotAPendingCallback => {}
            }

            if let Some(receipt) = coordinator.resume_from_callback(&params).await? {
                println!(
                    "策略 {} 已確認寫入帳本: {}",
                    receipt.strategy_id, receipt.transaction_hash
                );
            }
        }
        Command::Disconnect => {
            connector.restore_on_load().await;
            connector.disconnect().await;
            println!("錢包已斷開");
        }
        Command::Status => {
            connector.restore_on_load().await;
            let connected = connector.is_wallet_connected().await;
            match connector.connected_session().await {
                Some(session) if connected => {
                    println!("狀態: {}", connector.connection_state().await);
                    println!("帳戶: {}", session.account_id);
                    if let Some(balance) = session.balance {
                        println!("餘額: {}", balance);
                    }
                }
                _ => println!("狀態: {}", connector.connection_state().await),
            }
        }
        Command::Execute { id } => {
            connector.restore_on_load().await;
            let strategy = store
                .get_by_id(&id)
                .await
                .ok_or_else(|| anyhow!("策略不存在: {}", id))?;

            let receipt = coordinator.execute(&strategy).await?;
            println!(
                "策略 {} 已寫入帳本: {}",
                receipt.strategy_id, receipt.transaction_hash
            );
        }
    }

    Ok(())
}

fn print_strategy_lines(strategies: &[strategy_vault::storage::SavedStrategy]) {
    if strategies.is_empty() {
        println!("沒有符合條件的策略");
        return;
    }
    for strategy in strategies {
        println!(
            "{}  [{}]  {}  ({})",
            strategy.id,
            strategy.status,
            strategy.name,
            strategy.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

// 初始化日誌系統
fn init_logging(log_config: &config::LogConfig) -> Result<Option<WorkerGuard>> {
    let level = match log_config.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // 默認為INFO
    };

    let guard = if let Some(directory) = &log_config.directory {
        let file_appender = tracing_appender::rolling::daily(directory, "strategy_vault.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_max_level(level)
            .with_writer(non_blocking)
            .with_ansi(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;
        Some(guard)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_max_level(level)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;
        None
    };

    info!("日誌系統初始化完成");
    Ok(guard)
}
