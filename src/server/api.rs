/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 模型可视化服务的 REST 接口
 *
 * 每个请求的模型加载、结构分析、前向传播与渲染都放在 tokio 的阻塞线程池里执行，
 * 请求之间不共享网络实例。
 */

use super::error::{ApiError, error_response};
use super::store::{ModelStore, UploadedModel};
use crate::config::{ConfigError, ServerConfig};
use crate::nn::{
    BUILTIN_MODELS, Checkpoint, InputSpec, LayerDescriptor, ModelError, ModelOrigin,
    get_model_summary, resolve, run_inference,
};
use bytes::BufMut;
use futures_util::{TryFutureExt, TryStreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// 各请求共享的状态
#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<ModelStore>,
    image_path: Arc<PathBuf>,
    cors_origin: String,
    max_upload_bytes: u64,
}

impl AppState {
    pub fn new(store: ModelStore, settings: &ServerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            cors_origin: settings.checked_cors_origin()?.to_string(),
            store: Arc::new(store),
            image_path: Arc::new(settings.image_path.clone()),
            max_upload_bytes: settings.max_upload_bytes,
        })
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    id: String,
    name: String,
    #[serde(rename = "type")]
    model_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom: Option<bool>,
}

#[derive(Debug, Serialize)]
struct UploadStructure {
    name: String,
    total_params: usize,
    layers: Vec<LayerDescriptor>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    model_id: String,
    name: String,
    structure: UploadStructure,
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let root = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "message": "AI Model Viewer API" })));

    let list = warp::path("models")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_list);

    let upload = warp::path("models")
        .and(warp::path("upload"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(state.max_upload_bytes))
        .and(with_state(state.clone()))
        .and_then(handle_upload);

    let delete = warp::path("models")
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(handle_delete);

    let summary = warp::path("models")
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_summary);

    let layers = warp::path("models")
        .and(warp::path::param::<String>())
        .and(warp::path("layers"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_layers);

    let inference = warp::path("inference")
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(handle_inference);

    let cors = warp::cors()
        .allow_origin(state.cors_origin.as_str())
        .allow_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allow_headers(vec![
            "accept",
            "authorization",
            "content-type",
            "origin",
            "x-requested-with",
        ])
        .allow_credentials(true);

    root.or(list)
        .or(upload)
        .or(delete)
        .or(summary)
        .or(layers)
        .or(inference)
        .recover(handle_rejection)
        .with(cors)
}

// =============================================================================
// Filters
// =============================================================================

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_list(state: AppState) -> Result<Response, Infallible> {
    let mut models: Vec<ModelEntry> = BUILTIN_MODELS
        .iter()
        .map(|m| ModelEntry {
            id: m.id.to_string(),
            name: m.name.to_string(),
            model_type: m.type_tag.to_string(),
            custom: None,
        })
        .collect();
    models.extend(state.store.list().into_iter().map(|m| ModelEntry {
        model_type: m.model_type.to_uppercase(),
        id: m.id,
        name: m.name,
        custom: Some(true),
    }));
    Ok(warp::reply::json(&serde_json::json!({ "models": models })).into_response())
}

async fn handle_summary(name: String, state: AppState) -> Result<Response, Infallible> {
    let started = Instant::now();
    let result = blocking(&state, {
        let name = name.clone();
        move |store| Ok(get_model_summary(&resolve(&name, store)?.network))
    })
    .await;
    debug!(model = %name, elapsed = ?started.elapsed(), "结构分析完成");
    Ok(respond(result))
}

async fn handle_layers(name: String, state: AppState) -> Result<Response, Infallible> {
    let result = blocking(&state, move |store| {
        let summary = get_model_summary(&resolve(&name, store)?.network);
        Ok(serde_json::json!({ "layers": summary.layers }))
    })
    .await;
    Ok(respond(result))
}

async fn handle_inference(name: String, state: AppState) -> Result<Response, Infallible> {
    let started = Instant::now();
    let image_path = state.image_path.clone();
    let result = blocking(&state, {
        let name = name.clone();
        move |store| {
            let mut resolved = resolve(&name, store)?;
            let image = inference_image(&name, resolved.origin, &image_path);
            run_inference(
                &mut resolved.network,
                &name,
                &resolved.kind,
                image,
                resolved.input,
            )
        }
    })
    .await;
    match &result {
        Ok(r) => debug!(
            model = %name,
            steps = r.steps.len(),
            elapsed = ?started.elapsed(),
            "推理完成"
        ),
        Err(ApiError::NotFound(_)) => {}
        Err(e) => error!(model = %name, "推理失败: {e}"),
    }
    Ok(respond(result))
}

async fn handle_delete(id: String, state: AppState) -> Result<Response, Infallible> {
    let removed = match state.store.remove(&id) {
        Ok(true) => {
            info!(model = %id, "已删除上传模型");
            Ok(serde_json::json!({ "success": true }))
        }
        Ok(false) => Err(ApiError::NotFound(format!("找不到模型: {id}"))),
        Err(e) => {
            warn!(model = %id, "删除模型文件失败: {e}");
            Err(ApiError::Internal(format!("删除模型文件失败: {e}")))
        }
    };
    Ok(respond(removed))
}

async fn handle_upload(form: FormData, state: AppState) -> Result<Response, Infallible> {
    let result = upload(form, &state).await;
    if let Err(e) = &result {
        warn!("拒绝上传: {e}");
    }
    Ok(respond(result))
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "上传文件过大".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        (StatusCode::BAD_REQUEST, format!("请求无效: {err:?}"))
    };
    Ok(error_response(status, &detail))
}

// =============================================================================
// Upload
// =============================================================================

/// 表单字段；未填写的可选字段取缺省值
#[derive(Debug)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    name: Option<String>,
    model_type: String,
    input: InputSpec,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self {
            file: None,
            name: None,
            model_type: "cnn".to_string(),
            input: InputSpec::default(),
        }
    }
}

async fn read_form(form: FormData) -> Result<UploadForm, ApiError> {
    let parts: Vec<(String, Option<String>, Vec<u8>)> = form
        .and_then(|part| {
            let field = part.name().to_string();
            let filename = part.filename().map(str::to_string);
            part.stream()
                .try_fold(Vec::new(), |mut buf, data| {
                    buf.put(data);
                    async move { Ok::<_, warp::Error>(buf) }
                })
                .map_ok(move |buf| (field, filename, buf))
        })
        .try_collect()
        .await
        .map_err(|e| ApiError::BadRequest(format!("表单解析失败: {e}")))?;

    let mut form = UploadForm::default();
    for (field, filename, data) in parts {
        match field.as_str() {
            "file" => form.file = Some((filename.unwrap_or_default(), data)),
            "name" => form.name = Some(text_field(&field, data)?),
            "model_type" => form.model_type = text_field(&field, data)?,
            "input_channels" => form.input.channels = dim_field(&field, data)?,
            "input_height" => form.input.height = dim_field(&field, data)?,
            "input_width" => form.input.width = dim_field(&field, data)?,
            _ => {}
        }
    }
    Ok(form)
}

fn text_field(field: &str, data: Vec<u8>) -> Result<String, ApiError> {
    String::from_utf8(data).map_err(|_| ApiError::BadRequest(format!("字段{field}不是有效的UTF-8文本")))
}

fn dim_field(field: &str, data: Vec<u8>) -> Result<usize, ApiError> {
    let text = text_field(field, data)?;
    match text.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ApiError::BadRequest(format!("字段{field}须为正整数: {text}"))),
    }
}

fn has_model_extension(filename: &str) -> bool {
    filename.ends_with(".pt") || filename.ends_with(".pth")
}

async fn upload(form: FormData, state: &AppState) -> Result<UploadResponse, ApiError> {
    let form = read_form(form).await?;
    let (filename, bytes) = form
        .file
        .ok_or_else(|| ApiError::BadRequest("缺少字段: file".to_string()))?;
    let name = form
        .name
        .ok_or_else(|| ApiError::BadRequest("缺少字段: name".to_string()))?;
    if !has_model_extension(&filename) {
        return Err(ApiError::BadRequest("仅支持 .pt 或 .pth 文件".to_string()));
    }

    let id = ModelStore::new_id();
    let file_path = state.store.path_for(&id);
    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("保存模型文件失败: {e}")))?;

    let loaded = {
        let path = file_path.clone();
        tokio::task::spawn_blocking(move || -> Result<_, ModelError> {
            let network = Checkpoint::load(&path)?.into_network()?;
            Ok(get_model_summary(&network))
        })
        .await
    };
    let summary = match loaded {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            discard(&file_path).await;
            return Err(load_error(e));
        }
        Err(e) => {
            discard(&file_path).await;
            return Err(e.into());
        }
    };

    state.store.insert(UploadedModel {
        id: id.clone(),
        name: name.clone(),
        file_path,
        model_type: form.model_type,
        input_shape: form.input.shape(),
    });
    info!(model = %id, name = %name, params = summary.total_params, "已登记上传模型");

    Ok(UploadResponse {
        success: true,
        model_id: id,
        name,
        structure: UploadStructure {
            name: summary.model_name,
            total_params: summary.total_params,
            layers: summary.layers,
        },
    })
}

/// 参数字典单独提示，其余读取失败统一为500
fn load_error(err: ModelError) -> ApiError {
    match err {
        ModelError::StateDict => ApiError::from(ModelError::StateDict),
        other => ApiError::Internal(format!("模型加载失败: {other}")),
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), "清理上传文件失败: {e}");
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// 只有 tiny_resnet 与上传模型会用到示例图片，且图片必须存在
fn inference_image<'a>(name: &str, origin: ModelOrigin, image_path: &'a Path) -> Option<&'a Path> {
    if !image_path.exists() {
        return None;
    }
    match origin {
        ModelOrigin::Builtin if name == "tiny_resnet" => Some(image_path),
        ModelOrigin::Uploaded => Some(image_path),
        ModelOrigin::Builtin => None,
    }
}

async fn blocking<T, F>(state: &AppState, job: F) -> Result<T, ApiError>
where
    F: FnOnce(&ModelStore) -> Result<T, ModelError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    let value = tokio::task::spawn_blocking(move || job(store.as_ref())).await??;
    Ok(value)
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(body) => warp::reply::json(&body).into_response(),
        Err(e) => e.into_response(),
    }
}
