use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use debate_audio::media::{
    AutoplayPolicy, EventTarget, InteractionKind, SimulatedCaptureDevice, SimulatedPlaybackElement,
};
use debate_audio::{
    create_router, AppState, Config, DebateRoomAudio, InteractionHub, MediaStream,
    MicrophoneConfig, MicrophoneSession, PlaybackPolicy, TokenIssuer,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "debate-audio", about = "Debate room audio sessions and room-join tokens")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/debate-audio")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the room-join token endpoint
    Serve,
    /// Run a simulated debate room with autoplay-blocked listeners
    Demo {
        /// Number of remote participants
        #[arg(long, default_value_t = 2)]
        participants: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Demo { participants } => demo(cfg, participants).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let issuer = TokenIssuer::from(&cfg.livekit);
    if issuer.api_key.is_none() || issuer.api_secret.is_none() {
        tracing::warn!("LiveKit credentials missing; token requests will fail");
    }

    let app = create_router(AppState::new(issuer));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}

async fn demo(cfg: Config, participants: usize) -> Result<()> {
    let device = Arc::new(SimulatedCaptureDevice::new());
    device.set_input_level(48);

    let hub = InteractionHub::new();
    let element_hub = hub.clone();

    let microphone = MicrophoneSession::new(device.clone(), MicrophoneConfig::from(&cfg.microphone));
    let mut room = DebateRoomAudio::new(
        "local-user",
        microphone,
        Box::new(move |_user_id: &str| {
            Arc::new(SimulatedPlaybackElement::new(AutoplayPolicy::RequiresActivation(
                element_hub.clone(),
            ))) as Arc<dyn debate_audio::PlaybackElement>
        }),
        hub.clone(),
        PlaybackPolicy::from(&cfg.playback),
    );

    if let Err(e) = room.join_microphone().await {
        info!("Microphone unavailable: {}", e);
    }
    room.toggle_local_mute();

    for i in 0..participants {
        let user_id = format!("speaker-{}", i + 1);
        let role = if i % 2 == 0 { "agree" } else { "disagree" };
        room.participant_metadata(&user_id, &format!(r#"{{"role":"{}"}}"#, role));
        room.remote_stream_available(&user_id, MediaStream::with_audio_tracks(1))
            .await;
    }

    tokio::time::sleep(Duration::from_millis(400)).await;
    info!("Before interaction: {}", serde_json::to_string(&room.peers())?);
    info!("Microphone: {}", serde_json::to_string(&room.microphone().status())?);

    hub.dispatch(EventTarget::Document, InteractionKind::PointerDown);
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!("After interaction: {}", serde_json::to_string(&room.peers())?);

    room.leave().await;
    info!("Left room; {} track(s) still holding the microphone", device.live_track_count());

    Ok(())
}
