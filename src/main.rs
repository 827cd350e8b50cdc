use clap::Parser;
use led_relay::adapters::{self, serial};
use led_relay::core::session::report_error;
use led_relay::utils::error::ErrorSeverity;
use led_relay::utils::{logger, validation::Validate};
use led_relay::{CliConfig, RelayError, Session};
use std::time::Duration;
use tokio::io::BufReader;

fn exit_code(error: &RelayError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,      // 無法辨識的指令，不算失敗
        ErrorSeverity::Medium => 2,   // AI 服務錯誤，可重試
        ErrorSeverity::High => 1,     // 裝置或設定錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn fail(error: &RelayError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());
    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 {}", error.recovery_suggestion());
    std::process::exit(exit_code(error).max(1));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 需在解析參數前載入，環境變數才會被 clap 讀到
    let dotenv = dotenvy::dotenv();

    let args = CliConfig::parse();

    let config = match args.resolve() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(args.verbose);
            fail(&e);
        }
    };

    if config.logging.json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    if args.list_ports {
        match serial::available_ports() {
            Ok(ports) if ports.is_empty() => println!("No serial ports found"),
            Ok(ports) => {
                println!("Available serial ports:");
                for port in &ports {
                    println!("  {}", serial::describe_port(port));
                }
            }
            Err(e) => fail(&e),
        }
        return Ok(());
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    tracing::info!("🚀 Starting led-relay");
    tracing::debug!("Resolved config: {:?}", config.serial);

    let gateway = match adapters::build_gateway(&config) {
        Ok(gateway) => gateway,
        Err(e) => fail(&e),
    };

    // 無法開啟裝置時沒有任何動作可做，直接結束
    let channel = match adapters::open_channel(&config) {
        Ok(channel) => channel,
        Err(e) => fail(&e),
    };

    let blink_interval = Duration::from_millis(config.session.blink_interval_ms);
    let mut session = Session::new(gateway, channel, blink_interval);
    let mut stdout = tokio::io::stdout();

    if let Some(text) = &args.once {
        let result = session.handle_line(text).await;
        let code = match &result {
            Ok(outcome) => {
                session.report(outcome, &mut stdout).await?;
                0
            }
            Err(e) => {
                tracing::warn!("Command failed: {}", e);
                report_error(e, &mut stdout).await?;
                exit_code(e)
            }
        };
        session.shutdown();
        if code > 0 {
            std::process::exit(code);
        }
        return Ok(());
    }

    println!("💡 Type /help for commands, quit to exit");
    let summary = session.run(BufReader::new(tokio::io::stdin()), &mut stdout).await;
    session.shutdown();

    match summary {
        Ok(summary) => {
            println!(
                "👋 Bye! {} command(s) sent, {} failed",
                summary.dispatched, summary.failed
            );
            Ok(())
        }
        Err(e) => fail(&e),
    }
}
