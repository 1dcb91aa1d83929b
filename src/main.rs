use anyhow::{bail, Context};
use clap::Parser;
use explainer_narration::api::GeminiClient;
use explainer_narration::config::{
    AppConfig, NarrationConfig, DEFAULT_GEMINI_MODEL, DEFAULT_TTS_PROGRAM,
};
use explainer_narration::speech::{CommandSynthesizer, SpeechQuality};
use explainer_narration::video::Ffmpeg;
use explainer_narration::{NarrationPipeline, NarrationRequest};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "explainer-narration")]
#[command(about = "Add synchronized AI narration to a rendered explainer video", long_about = None)]
struct Args {
    /// Rendered video to narrate
    #[arg(short, long)]
    video: PathBuf,

    /// Narration script text, optionally with [SYNC: <seconds>] markers
    #[arg(short, long, conflicts_with_all = ["script_file", "prompt"])]
    script: Option<String>,

    /// Narration script file
    #[arg(short = 'f', long, conflicts_with = "prompt")]
    script_file: Option<PathBuf>,

    /// Topic to generate narration for with Gemini
    #[arg(short, long)]
    prompt: Option<String>,

    /// Animation source to time a generated narration against
    #[arg(long, requires = "prompt")]
    code_file: Option<PathBuf>,

    /// Output video path (derived from --output-dir when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for derived output paths
    #[arg(long, default_value = "./videos")]
    output_dir: PathBuf,

    /// Speech quality hint
    #[arg(short, long, value_enum, default_value_t = SpeechQuality::Medium)]
    quality: SpeechQuality,

    /// Multiply video timestamps by this factor before muxing (e.g. 1.25)
    #[arg(long)]
    speed_factor: Option<f64>,

    /// JSON file overriding narration tunables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gemini API key
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = build_config(&args).await?;

    let script = load_script(&args, &config).await?;
    info!("Narration script length: {} characters", script.len());

    let ffmpeg = Ffmpeg::new(config.ffmpeg_path.clone());
    let synthesizer = CommandSynthesizer::new(config.tts_program.clone(), ffmpeg);
    let pipeline = NarrationPipeline::new(config, Box::new(synthesizer));

    let request = NarrationRequest {
        script,
        video_path: args.video.clone(),
        output_path: args.output.clone(),
    };

    match pipeline.run(&request).await {
        Ok(path) => {
            info!("Narrated video completed successfully!");
            println!("{}", path.display());
            Ok(())
        }
        Err(e) => {
            error!("Narration failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn build_config(args: &Args) -> anyhow::Result<AppConfig> {
    let narration = match &args.config {
        Some(path) => NarrationConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => NarrationConfig::default(),
    };

    let ffmpeg_path = AppConfig::resolve_ffmpeg(std::env::var("FFMPEG_PATH").ok())?;

    Ok(AppConfig {
        gemini_api_key: args
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok()),
        gemini_model: std::env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
        ffmpeg_path,
        tts_program: std::env::var("TTS_PROGRAM")
            .unwrap_or_else(|_| DEFAULT_TTS_PROGRAM.to_string()),
        output_dir: args.output_dir.clone(),
        quality: args.quality,
        speed_factor: args.speed_factor,
        narration,
    })
}

async fn load_script(args: &Args, config: &AppConfig) -> anyhow::Result<String> {
    if let Some(text) = &args.script {
        return Ok(text.clone());
    }

    if let Some(path) = &args.script_file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read script file: {}", path.display()));
    }

    let Some(prompt) = &args.prompt else {
        bail!("One of --script, --script-file or --prompt must be provided");
    };

    let Some(api_key) = config.gemini_api_key.clone() else {
        bail!("GEMINI_API_KEY not found. Set it via --api-key or the GEMINI_API_KEY environment variable");
    };
    let client = GeminiClient::new(api_key, config.gemini_model.clone())?;

    match &args.code_file {
        Some(path) => {
            let code = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read animation code: {}", path.display()))?;
            Ok(client.generate_synced_narration(&code, prompt).await?)
        }
        None => Ok(client.generate_narration_script(prompt).await?),
    }
}
