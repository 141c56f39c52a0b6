//! Deploy QA builds of hot-api-mono to QA environments.
//!
//! A deployment waits for the branch's "qa build" workflow run, takes the
//! image tag from its job logs, points `areas/<env>.yaml` in the qa-env
//! working copy at that tag, pushes the change and waits for the
//! provisioning workflow it triggers.
pub mod cli;
pub mod config;
pub mod deploy;
pub mod envfile;
pub mod error;
pub mod github;
pub mod prompt;
pub mod telemetry;
pub mod vcs;

#[cfg(test)]
mod test_support;
