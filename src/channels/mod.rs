mod line;
mod webhook;

pub use line::LineGateway;
pub use webhook::{router, WebhookState};
