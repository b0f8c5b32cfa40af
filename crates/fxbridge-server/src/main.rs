// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The renderer process.
//!
//! Creates the named segment, loads the page and runs the render pump until the
//! host asks for shutdown or the process is interrupted. With `--delete` it only
//! removes the named segment.

mod cli;
mod config;

use anyhow::{Context, Result};
use cli::{ArgsError, Invocation};
use config::BridgeConfig;
use env_logger::{Builder, Env};
use fxbridge_core::ExitStatus;
use std::process::ExitCode;

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let status = run(std::env::args_os());
    if !status.is_success() {
        log::debug!("Exiting with status {status:?}");
    }
    ExitCode::from(status.code())
}

fn run<I>(args: I) -> ExitStatus
where
    I: IntoIterator<Item = std::ffi::OsString>,
{
    let invocation = match cli::parse_from(args) {
        Ok(invocation) => invocation,
        Err(ArgsError::Help) => {
            eprintln!("{}", cli::usage());
            return ExitStatus::ERROR | ExitStatus::ARGS_ERROR;
        }
        Err(e) => {
            eprintln!("{e}\n\n{}", cli::usage());
            return ExitStatus::ERROR | ExitStatus::ARGS_ERROR;
        }
    };

    if invocation.delete {
        return delete(&invocation.name);
    }

    let config = match BridgeConfig::resolve(&invocation) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitStatus::ERROR | ExitStatus::ARGS_ERROR;
        }
    };

    serve(&invocation, &config)
}

#[cfg(unix)]
fn delete(name: &str) -> ExitStatus {
    use fxbridge_infra::{DeleteOutcome, SharedSegment};

    match SharedSegment::delete(name) {
        Ok(DeleteOutcome::Removed) => ExitStatus::SUCCESS,
        Ok(DeleteOutcome::Absent) => {
            log::info!("No shared segment named {name}");
            ExitStatus::SUCCESS
        }
        Err(e) => {
            log::error!("Could not delete shared segment: {e}");
            ExitStatus::ERROR | ExitStatus::ALLOCATION_ERROR
        }
    }
}

#[cfg(unix)]
fn serve(invocation: &Invocation, config: &BridgeConfig) -> ExitStatus {
    use fxbridge_infra::SharedSegment;

    let segment = match SharedSegment::create_or_replace(&invocation.name, &config.segment) {
        Ok(segment) => segment,
        Err(e) => {
            log::error!("Could not allocate shared segment: {e}");
            return ExitStatus::ERROR | ExitStatus::ALLOCATION_ERROR;
        }
    };

    let stop = signals::install();
    match render(&segment, invocation, config, stop) {
        Ok(()) => ExitStatus::SUCCESS,
        Err(e) => {
            log::error!("Render loop failed: {e:#}");
            ExitStatus::ERROR | ExitStatus::RUNTIME_ERROR
        }
    }
    // Dropping the owning segment unlinks its name.
}

#[cfg(unix)]
fn render(
    segment: &fxbridge_infra::SharedSegment,
    invocation: &Invocation,
    config: &BridgeConfig,
    stop: &std::sync::atomic::AtomicBool,
) -> Result<()> {
    use fxbridge_core::platform::RenderSurface;
    use fxbridge_infra::platform::headless::DEFAULT_SIZE;
    use fxbridge_infra::HeadlessPage;
    use fxbridge_runtime::RenderPump;

    let (max_width, max_height) = segment.frame_channel().max_dimensions();
    let mut page = HeadlessPage::with_size(
        DEFAULT_SIZE.0.min(max_width),
        DEFAULT_SIZE.1.min(max_height),
    );
    let url = config.startup_url(invocation);
    page.load_content(url)
        .with_context(|| format!("could not load {url}"))?;

    let mut pump = RenderPump::new(
        page,
        segment.event_channel(),
        segment.frame_channel(),
        config.pump,
    );
    let stats = pump.run(stop);

    if !pump.frame_path_open() {
        log::warn!("Shared segment was deleted while rendering");
    }
    log::info!(
        "Rendered {} frames for {}",
        stats.frames_published,
        segment.name().unwrap_or("<unnamed>")
    );
    Ok(())
}

#[cfg(not(unix))]
fn delete(name: &str) -> ExitStatus {
    log::error!("Cannot delete {name}: shared segments need a Unix host");
    ExitStatus::ERROR | ExitStatus::ALLOCATION_ERROR
}

#[cfg(not(unix))]
fn serve(invocation: &Invocation, _config: &BridgeConfig) -> ExitStatus {
    log::error!(
        "Cannot create {}: shared segments need a Unix host",
        invocation.name
    );
    ExitStatus::ERROR | ExitStatus::ALLOCATION_ERROR
}

#[cfg(unix)]
mod signals {
    use std::sync::atomic::{AtomicBool, Ordering};

    static STOP: AtomicBool = AtomicBool::new(false);

    extern "C" fn request_stop(_signal: libc::c_int) {
        STOP.store(true, Ordering::Release);
    }

    /// Routes SIGINT and SIGTERM to the returned flag.
    pub fn install() -> &'static AtomicBool {
        let handler = request_stop as extern "C" fn(libc::c_int) as libc::sighandler_t;
        for signal in [libc::SIGINT, libc::SIGTERM] {
            // SAFETY: the handler only stores to an atomic.
            let previous = unsafe { libc::signal(signal, handler) };
            if previous == libc::SIG_ERR {
                log::warn!("Could not install handler for signal {signal}");
            }
        }
        &STOP
    }
}
