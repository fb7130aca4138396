// Library root
// ------------
// Core of the `grind` command-line client. The binary (`main.rs`) parses
// arguments and reports errors; everything that talks to the server or
// touches local state lives here.
//
// Module responsibilities:
// - `api`: blocking JSON-over-HTTPS client for the CodeGrinder API.
// - `config`: the per-user session file (host and cookie) and the
//   command-line diagnostic flags.
// - `version`: the client/server compatibility gate run before every command.
// - `bootstrap`: first-time cookie capture, verification and save.
// - `dotfile`: `.grind` assignment records in problem-set directories.
// - `error`: the error type shared by all of the above.
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod dotfile;
pub mod error;
pub mod version;

pub use api::{ApiClient, Method, Params};
pub use config::{Config, ConfigStore, Diagnostics};
pub use error::{GrindError, Result};
