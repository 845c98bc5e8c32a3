//! 模型可视化服务：内置/上传模型的结构、推理与上传管理

mod api;
mod error;
mod store;

pub use api::{AppState, routes};
pub use error::ApiError;
pub use store::{ModelStore, UploadedModel};

#[cfg(test)]
mod tests;
