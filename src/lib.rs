//! # AI Viewer
//!
//! 玩具神经网络（Tiny ResNet / Mini Transformer 以及用户上传的模型）的可视化后端：
//! 给出逐层结构与参数量，跑一次推理并把每层激活渲染成 viridis 热力图。
//! 另附一个只读的 Markdown 浏览服务。
//!

pub mod config;
pub mod errors;
pub mod mdview;
pub mod nn;
pub mod server;
pub mod tensor;
pub mod vision;
