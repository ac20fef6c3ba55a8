//! Console demo: one simulated guild, events in on stdin, replies out on
//! stdout.
//!
//! ```text
//! cargo run -p console-bot -- --config demos/console-bot/roomkeeper.toml \
//!     < demos/console-bot/events.jsonl
//! ```
//!
//! Each stdin line is a JSON `GatewayEvent`. Voice events are applied to
//! the simulated guild first, so `before` may be omitted: it is filled in
//! from where the member actually was.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use roomkeeper::{Bot, BotConfig};
use roomkeeper_platform::{MemoryPlatform, Platform};
use roomkeeper_protocol::{
    ChannelId, Codec, GatewayEvent, GuildId, JsonCodec, Reply,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "console-bot")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file. Without one, a single "gaming" category is used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(short, long, default_value = "roomkeeper=info,console_bot=info")]
    log: String,

    /// Id of the simulated guild
    #[arg(short, long, default_value_t = 1)]
    guild: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    roomkeeper::init_tracing(&args.log);

    let config = match &args.config {
        Some(path) => BotConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BotConfig::default(),
    };

    let guild_id = GuildId(args.guild);
    let platform = Arc::new(MemoryPlatform::new().with_guild(guild_id));
    let mut bot = Bot::builder()
        .config(config)
        .build(Arc::clone(&platform))?;

    bot.handle_event(GatewayEvent::Ready).await;
    for channel in platform.channels(guild_id).await? {
        println!(
            "{} {:<8} {}{}",
            channel.id,
            channel.kind.to_string(),
            channel.name,
            channel
                .parent_id
                .map(|p| format!(" (in {p})"))
                .unwrap_or_default()
        );
    }

    let codec = JsonCodec;
    let mut printed = 0;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: GatewayEvent = match codec.decode(line.as_bytes()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable line");
                continue;
            }
        };

        let event = match event {
            GatewayEvent::VoiceStateUpdate(update) => {
                match platform.apply_voice_state(&update).await {
                    Ok(update) => GatewayEvent::VoiceStateUpdate(update),
                    Err(e) => {
                        tracing::warn!(error = %e, "voice move rejected");
                        continue;
                    }
                }
            }
            other => other,
        };
        bot.handle_event(event).await;

        // Moves and deletions made by the bot come back as events.
        loop {
            let followups = platform.take_events().await;
            if followups.is_empty() {
                break;
            }
            for event in followups {
                bot.handle_event(event).await;
            }
        }

        let replies = platform.replies().await;
        for (channel_id, reply) in &replies[printed..] {
            print_reply(&codec, *channel_id, reply)?;
        }
        printed = replies.len();
    }

    let state = bot.state();
    println!("{} room(s) open at exit", state.registry.len());
    for record in state.registry.iter() {
        println!(
            "  {} owner={} private={} allowed={:?}",
            record.room_id(),
            record.owner(),
            record.is_private(),
            record.allowed_users()
        );
    }
    Ok(())
}

fn print_reply(
    codec: &JsonCodec,
    channel_id: ChannelId,
    reply: &Reply,
) -> Result<()> {
    match reply {
        Reply::Text(text) => println!("[{channel_id}] {text}"),
        Reply::Embed(_) => {
            let json = codec.encode(reply)?;
            println!("[{channel_id}] {}", String::from_utf8_lossy(&json));
        }
    }
    Ok(())
}
