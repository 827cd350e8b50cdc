use clap::Parser;
use led_relay::utils::{logger, validation::Validate};
use led_relay::{adapters, interpret, CliConfig, CompletionGateway, ControlByte, Instruction};

/// 測試 AI gateway：只顯示回覆與轉換結果，不連接硬體
#[derive(Parser)]
#[command(name = "gateway_probe")]
#[command(about = "Send one prompt to the AI service and show how it would be interpreted")]
struct Args {
    /// Text to send, e.g. "Turn on the LED if robotics is interesting."
    prompt: String,

    #[command(flatten)]
    relay: CliConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logger::init_cli_logger(args.relay.verbose);

    let config = args.relay.resolve()?;
    config.validate()?;

    println!("🚀 Probing AI gateway");
    println!("  Endpoint: {}", config.gateway.endpoint);
    println!("  Model: {}", config.gateway.model);
    println!("  Prompt: {}", args.prompt);
    println!();

    let gateway = adapters::build_gateway(&config)?;
    let reply = gateway.complete(&args.prompt).await?;

    println!("🤖 Raw reply:");
    for line in reply.lines() {
        println!("  {}", line);
    }
    println!();

    match reply.parse::<Instruction>() {
        Ok(instruction) => match interpret(&instruction) {
            Ok(bytes) => {
                let wire: String = bytes.iter().map(|b: &ControlByte| b.as_char()).collect();
                println!("✅ Instruction: {}", instruction);
                println!("📡 Bytes: {}", wire);
            }
            Err(e) => println!("⚠️ Instruction {} rejected: {}", instruction, e),
        },
        Err(e) => println!("⚠️ {}", e),
    }

    Ok(())
}
