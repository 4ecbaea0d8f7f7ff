//! JUDITH VM command-line driver.
//!
//! Usage:
//!   juvm                      # run the built-in test assembly
//!   juvm file.jdll            # execute an assembly
//!   juvm file.jdll out.txt    # execute, redirecting program output

use std::env;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use juvm::Vm;

const DEFAULT_ENTRY: &str = "res/test.jdll";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let entry_path = match args.first() {
        Some(path) => PathBuf::from(path),
        None => {
            println!("no arguments - juvm test mode");
            PathBuf::from(DEFAULT_ENTRY)
        }
    };
    let out_path = args.get(1).map(PathBuf::from);

    let mut vm = match out_path {
        Some(ref path) => {
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() && !dir.exists() {
                    if let Err(e) = fs::create_dir_all(dir) {
                        eprintln!("juvm: cannot create {}: {}", dir.display(), e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            match File::create(path) {
                Ok(file) => Vm::with_output(Box::new(BufWriter::new(file))),
                Err(e) => {
                    eprintln!("juvm: cannot create {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => Vm::new(),
    };

    match vm.start(&entry_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("juvm: {}", e);
            ExitCode::FAILURE
        }
    }
}
