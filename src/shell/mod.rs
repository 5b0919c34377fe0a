//! External command execution and host probes.

pub mod command;
pub mod mock;
pub mod platform;

pub use command::{
    args, format_command, CommandOptions, CommandResult, CommandRunner, SystemRunner,
};
pub use mock::{Invocation, MockResponse, MockRunner};
pub use platform::{invoking_user, is_ci, is_elevated, is_raspberry_pi};
