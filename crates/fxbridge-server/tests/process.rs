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

//! Runs the built binary and checks its exit codes and segment lifecycle.

use fxbridge_core::ExitStatus;
use fxbridge_infra::SharedSegment;
use std::io::Write;
use std::process::{Child, Command, Output, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const BIN: &str = env!("CARGO_BIN_EXE_fxbridge-server");

fn unique_name() -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    format!(
        "/fxb-srv-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

fn server(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch fxbridge-server")
}

fn exit_code(output: &Output) -> u8 {
    output.status.code().expect("terminated by a signal") as u8
}

#[test]
fn help_prints_usage_and_reports_an_argument_error() {
    let output = server(&["--help"]);
    assert_eq!(
        exit_code(&output),
        (ExitStatus::ERROR | ExitStatus::ARGS_ERROR).code()
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--name"));
}

#[test]
fn missing_name_is_an_argument_error() {
    let output = server(&[]);
    assert_eq!(
        exit_code(&output),
        (ExitStatus::ERROR | ExitStatus::ARGS_ERROR).code()
    );
}

#[test]
fn bad_config_file_is_an_argument_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{ "segment": { "max_width": 0 } }"#)
        .unwrap();
    let path = file.path().to_str().unwrap().to_owned();

    let output = server(&["-n", &unique_name(), "-c", &path]);
    assert_eq!(
        exit_code(&output),
        (ExitStatus::ERROR | ExitStatus::ARGS_ERROR).code()
    );
}

#[cfg(unix)]
#[test]
fn deleting_a_missing_segment_succeeds_twice() {
    let name = unique_name();
    for _ in 0..2 {
        let output = server(&["-n", &name, "-d"]);
        assert_eq!(exit_code(&output), ExitStatus::SUCCESS.code());
    }
}

#[cfg(unix)]
fn small_config() -> tempfile::NamedTempFile {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    config
        .write_all(br#"{ "segment": { "max_width": 640, "max_height": 480, "event_capacity": 64 } }"#)
        .unwrap();
    config
}

/// Starts a server on `name` and waits until its first frame is published.
#[cfg(unix)]
fn start_server(name: &str, config: &tempfile::NamedTempFile) -> (Child, SharedSegment) {
    let config_path = config.path().to_str().unwrap();
    let mut child = Command::new(BIN)
        .args(["-n", name, "-c", config_path, "--tick-ms", "5"])
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to launch fxbridge-server");

    let deadline = Instant::now() + Duration::from_secs(10);
    let segment = loop {
        match SharedSegment::attach(name) {
            Ok(segment) => break segment,
            Err(_) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(5)),
            Err(e) => {
                let _ = child.kill();
                panic!("server never created {name}: {e}");
            }
        }
    };

    while segment.frame_channel().generation() == 0 {
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("server never published a frame");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    (child, segment)
}

#[cfg(unix)]
#[test]
fn server_publishes_frames_and_cleans_up_on_shutdown() {
    let name = unique_name();
    let config = small_config();
    let (mut child, segment) = start_server(&name, &config);

    let frame = segment
        .frame_channel()
        .current()
        .unwrap()
        .expect("a published frame");
    assert_eq!(frame.dimensions(), (640, 480));
    assert_eq!(segment.creator_pid(), child.id());

    segment.request_shutdown();
    let status = child.wait().expect("server did not exit");
    assert_eq!(status.code(), Some(0));

    assert!(SharedSegment::attach(&name).is_err());
}

#[cfg(unix)]
#[test]
fn second_server_on_a_name_in_use_fails_without_disturbing_the_first() {
    let name = unique_name();
    let config = small_config();
    let (mut first, segment) = start_server(&name, &config);

    let config_path = config.path().to_str().unwrap().to_owned();
    let second = server(&["-n", &name, "-c", &config_path]);
    assert_eq!(
        exit_code(&second),
        (ExitStatus::ERROR | ExitStatus::ALLOCATION_ERROR).code()
    );

    assert!(!segment.is_retired());
    let before = segment.frame_channel().generation();
    segment.frame_channel().request_size(320, 240);
    let deadline = Instant::now() + Duration::from_secs(10);
    while segment.frame_channel().generation() == before {
        if Instant::now() >= deadline {
            let _ = first.kill();
            panic!("first server stopped publishing");
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    segment.request_shutdown();
    let status = first.wait().expect("server did not exit");
    assert_eq!(status.code(), Some(0));
}
