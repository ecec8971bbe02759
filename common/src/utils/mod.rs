pub mod config;
pub mod model_name;
pub mod template_engine;
