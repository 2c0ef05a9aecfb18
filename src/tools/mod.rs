//! Tools the agent can call
//!
//! # Architecture
//!
//! ```text
//! ToolCall{name, arguments} → ToolDispatcher::execute
//!                                  ↓
//!                 catalog check → ToolRequest::parse (typed args)
//!                                  ↓
//!      ┌──────────┬──────────┬─────┴─────┬────────────┬─────────────┐
//!    shell       fs        git/search   artifact    remote        vector
//!  (sh -c)   (workspace)  (git, rg)    (builder)  (terminal,    (knowledge)
//!                                                  editor,
//!                                                  missions)
//!                                  ↓
//!                 {success, ...} or {success: false, error}
//! ```

pub mod args;
pub mod catalog;
pub mod dispatcher;
pub mod fs;
pub mod git;
pub mod remote;
pub mod search;
pub mod shell;
pub mod workspace;

pub use args::{parse_raw_arguments, ToolRequest};
pub use catalog::{is_known_tool, tool_definitions, CODE_INTERPRETER};
pub use dispatcher::{failure, ToolDispatcher, ToolExecutor};
pub use remote::CollaboratorClient;
pub use workspace::Workspace;
