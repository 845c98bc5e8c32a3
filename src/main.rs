use ai_viewer::config::Config;
use ai_viewer::nn::{NoUploads, get_model, get_model_summary, resolve};
use ai_viewer::server::{AppState, ModelStore};
use ai_viewer::{mdview, server};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "ai_viewer")]
#[command(version)]
#[command(about = "玩具神经网络结构与激活值的可视化后端", long_about = None)]
struct Cli {
    /// TOML 配置文件
    #[arg(short, long, global = true, env = "AI_VIEWER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动模型可视化服务
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        bind: Option<String>,

        /// 上传模型的存放目录
        #[arg(long)]
        upload_dir: Option<PathBuf>,

        /// CNN 推理用的示例图片
        #[arg(long)]
        image_path: Option<PathBuf>,
    },

    /// 启动 Markdown 浏览服务
    MdViewer {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        default_root: Option<PathBuf>,

        #[arg(long)]
        browse_root: Option<PathBuf>,

        #[arg(long)]
        public_dir: Option<PathBuf>,
    },

    /// 把内置模型保存为模型文件，可直接用于上传
    Export {
        /// tiny_resnet 或 mini_transformer
        model: String,

        output: PathBuf,

        /// 只保存参数字典（上传时会被拒绝）
        #[arg(long)]
        state_dict: bool,
    },

    /// 打印内置模型的结构摘要（JSON）
    Summary { model: String },

    /// 输出缺省配置
    ConfigGen {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.logging.tracing_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve {
            port,
            bind,
            upload_dir,
            image_path,
        } => {
            let mut settings = config.server;
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(bind) = bind {
                settings.bind = bind;
            }
            if let Some(dir) = upload_dir {
                settings.upload_dir = dir;
            }
            if let Some(path) = image_path {
                settings.image_path = path;
            }

            let addr: SocketAddr = format!("{}:{}", settings.bind, settings.port)
                .parse()
                .with_context(|| format!("监听地址无效: {}:{}", settings.bind, settings.port))?;
            let store = ModelStore::open(&settings.upload_dir).with_context(|| {
                format!("无法创建上传目录 {}", settings.upload_dir.display())
            })?;
            let state = AppState::new(store, &settings)?;

            let (bound, serving) = warp::serve(server::routes(state))
                .try_bind_with_graceful_shutdown(addr, shutdown_signal())?;
            info!("AI Model Viewer API 运行于 http://{bound}");
            info!(
                upload_dir = %settings.upload_dir.display(),
                image = %settings.image_path.display(),
                image_found = settings.image_path.exists(),
                cors_origin = %settings.cors_origin,
                "服务配置"
            );
            serving.await;
            info!("服务已停止");
        }

        Commands::MdViewer {
            port,
            default_root,
            browse_root,
            public_dir,
        } => {
            let mut settings = config.md_viewer;
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(root) = default_root {
                settings.default_root = root;
            }
            if let Some(root) = browse_root {
                settings.browse_root = root;
            }
            if let Some(dir) = public_dir {
                settings.public_dir = dir;
            }

            let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
            let (bound, serving) = warp::serve(mdview::routes(settings.clone()))
                .try_bind_with_graceful_shutdown(addr, shutdown_signal())?;
            info!("MD Viewer 运行于 http://{bound}");
            info!(
                default_root = %settings.default_root.display(),
                browse_root = %settings.browse_root.display(),
                "目录配置"
            );
            serving.await;
            info!("服务已停止");
        }

        Commands::Export {
            model,
            output,
            state_dict,
        } => {
            let network = get_model(&model)?;
            if state_dict {
                network.save_state_dict(&output)?;
            } else {
                network.save(&output)?;
            }
            println!("已保存 {model} 到 {}", output.display());
        }

        Commands::Summary { model } => {
            let resolved = resolve(&model, &NoUploads)?;
            let summary = get_model_summary(&resolved.network);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::ConfigGen { output } => {
            let content = Config::default().to_toml();
            if let Some(path) = output {
                std::fs::write(&path, &content)?;
                println!("配置已写入: {}", path.display());
            } else {
                println!("{content}");
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("无法监听 Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
