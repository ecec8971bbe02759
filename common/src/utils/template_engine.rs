pub use minijinja::{Environment, Value};
use minijinja::UndefinedBehavior;
use std::sync::Arc;

/// Templates compiled into the calling crate, registered by name.
#[derive(Clone)]
pub struct TemplateEngine {
    env: Arc<Environment<'static>>,
}

#[macro_export]
macro_rules! create_template_engine {
    // Takes (name, path relative to the calling source file) pairs
    ($(($name:expr, $path:literal)),+ $(,)?) => {{
        $crate::utils::template_engine::TemplateEngine::with_templates(&[
            $(($name, include_str!($path))),+
        ])
    }};
}

impl TemplateEngine {
    pub fn with_templates(
        templates: &[(&'static str, &'static str)],
    ) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        for (name, source) in templates {
            env.add_template(*name, *source)?;
        }
        Ok(Self { env: Arc::new(env) })
    }

    pub fn render(&self, name: &str, ctx: &Value) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}
