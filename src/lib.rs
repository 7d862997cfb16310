//! A small interactive command interpreter.
//!
//! This crate reads command lines, splits them on the control operators
//! `&&`, `;` and `|`, detects the redirections `<`, `>` and `>>`, and runs the
//! resulting external programs (or the builtins `cd` and `history`) with the
//! requested descriptor wiring, waiting for every child it spawns.
//!
//! The main entry point is [`Interpreter`], which owns one session's state
//! and runs lines from any [`io_adapters::LineSource`]. The lower layers
//! ([`parser`], [`external`], [`pipeline`], [`redirect`]) are public for
//! embedding and testing.

pub mod builtin;
pub mod command;
pub mod config;
pub mod external;
pub mod history;
pub mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod redirect;
pub mod signals;

pub use config::Config;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
