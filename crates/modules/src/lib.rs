//! Built-in module implementations registered by default by the host and CLI.

use std::sync::Arc;

use relay_engine::Module;

pub mod echo;
pub mod response_formatter;

pub use echo::EchoModule;
pub use response_formatter::ResponseFormatterModule;

/// The default module set handed to the registry at startup.
pub fn builtin_modules() -> Vec<Arc<dyn Module>> {
    vec![Arc::new(EchoModule), Arc::new(ResponseFormatterModule)]
}
