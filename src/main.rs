//! Pagewright - 内容管理智能体
//!
//! 入口：初始化日志、加载配置、装配引擎，并运行标准输入上的对话循环。
//! 用法：`pagewright [config.toml]`；`/ops` 列出可用操作，`/clear` 清空历史，`/exit` 退出。

use std::path::PathBuf;

use anyhow::Context;
use pagewright::{
    agent::create_agent,
    config::load_config,
    engine::EngineEvent,
    memory::ConversationHistory,
    ChatRequest,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pagewright::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let engine = create_agent(&cfg).context("Failed to create agent")?;

    // 过程事件：实时打印操作调用
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let engine = engine.with_event_tx(event_tx);
    tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            match ev {
                EngineEvent::OperationCall { name, args } => eprintln!("  -> {name} {args}"),
                EngineEvent::OperationOutcome { name, ok: false, preview } => {
                    eprintln!("  !! {name}: {preview}")
                }
                EngineEvent::Fallback { reason } => eprintln!("  (fallback: {reason})"),
                _ => {}
            }
        }
    });

    let mut history = ConversationHistory::new(cfg.app.max_context_turns);
    let conversation_id = uuid::Uuid::new_v4().to_string();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{} ready. Type /ops for operations, /exit to quit.", cfg.app.name);
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                history.clear();
                println!("History cleared.");
                continue;
            }
            "/ops" => {
                for d in engine.registry().describe_all() {
                    println!("  {:<22} {}", d.name, d.description);
                }
                continue;
            }
            _ => {}
        }

        let request = ChatRequest::new(history.with_user_input(input))
            .with_conversation_id(conversation_id.clone());
        let response = engine.chat(request).await;

        println!("{}", response.text);
        if !response.operations_executed.is_empty() {
            let names: Vec<&str> = response.operations_executed.iter().map(|o| o.name()).collect();
            println!("[operations: {}]", names.join(", "));
        }
        println!("[{}]", response.termination_reason.as_str());
        history.record_exchange(input, &response.text);
    }

    Ok(())
}
