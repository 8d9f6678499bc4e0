pub mod run_view;

pub use run_view::{AgentActivity, AgentView, PiiNotice, RunView};
