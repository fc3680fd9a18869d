// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Print the detected format and dimensions for each file argument.

use std::env;
use std::process::ExitCode;

use zenprobe::ImageInfo;

fn main() -> ExitCode {
    env_logger::init();

    let files: Vec<String> = env::args().skip(1).collect();
    if files.is_empty() {
        eprintln!("Usage: imgprobe <image-file>...");
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for path in &files {
        match ImageInfo::from_path(path) {
            Ok(info) => println!("{}: {}, {} x {}", path, info.format, info.width, info.height),
            Err(error) => {
                eprintln!("{path}: {error}");
                failed = true;
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
