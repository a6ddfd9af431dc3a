use anyhow::Result;
use std::io::Write;

use etf_monitor::build_monitor;
use etf_monitor::models::settings::Settings;
use etf_monitor::services::dashboard::{build_view, render};
use etf_monitor::services::scheduler::{CycleReport, PollScheduler};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config_path = Settings::resolve_path(std::env::args().nth(1));
    let settings = match Settings::load(&config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("配置加载失败: {:#}", e);
            std::process::exit(1);
        }
    };

    // 日志写 stderr，避免与 stdout 的行情面板交错
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(settings).await {
        log::error!("程序运行出错: {:?}", e);
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<()> {
    let (monitor, schedule) = build_monitor(&settings)?;

    println!(
        "开始监控ETF: {}({})，每{}秒(+0~{}秒随机)更新一次...",
        settings.name, settings.code, settings.poll_interval_secs, settings.poll_jitter_secs
    );
    println!(
        "报警设置: 价格变动≥{}% | 主力资金>{:.0}亿元",
        settings.alert_price_change_pct,
        settings.alert_flow_main / 10000.0
    );
    println!("历史数据保存至: {}", monitor.log().path().display());

    let present = |report: &CycleReport| {
        let view = build_view(report.quote(), report.source_label(), &report.alerts, &report.bars);
        print!("{}{}", CLEAR_SCREEN, render(&view));
        let _ = std::io::stdout().flush();
    };
    // 尽早注册信号处理；轮询中途按下 Ctrl+C 会在本轮结束后的休眠点生效
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = stop_tx.send(());
            }
            Err(e) => log::error!("无法监听 Ctrl+C 信号: {}", e),
        }
    });
    let shutdown = async move {
        if stop_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let mut scheduler = PollScheduler::new(schedule);
    let summary = scheduler.run(&monitor, present, shutdown).await;

    println!("\n监控已停止，共轮询 {} 次，保存 {} 条记录", summary.cycles, summary.persisted);
    let log = monitor.log();
    if let Ok(size) = log.size_bytes() {
        let path = std::fs::canonicalize(log.path()).unwrap_or_else(|_| log.path().to_path_buf());
        println!("历史数据已保存至: {} ({:.2} KB)", path.display(), size as f64 / 1024.0);
    }
    match log.record_count() {
        Ok(total) => println!("历史文件累计 {} 条记录", total),
        Err(e) => log::warn!("读取历史文件失败: {}", e),
    }
    Ok(())
}
