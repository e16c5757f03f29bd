use std::{
    ffi::CString,
    os::unix::prelude::OsStrExt,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::atomic::Ordering,
};

use fuser::MountOption;
use path_clean::PathClean;
use zipmount::{
    fs::ZipFs,
    session::{MountOptions, Session},
    zip_codec::ZipCodec,
};

const PROGRAM: &str = "zipmount";
// keep in sync with the `zip` dependency in Cargo.toml; the crate does not
// expose its own version at runtime
const ZIP_CRATE_VERSION: &str = "0.6";

fn print_usage() {
    eprintln!("usage: {} [options] <zip-file> <mountpoint>", PROGRAM);
    eprintln!();
    eprintln!("general options:");
    eprintln!("    -o opt,[opt...]        mount options");
    eprintln!("    -h   --help            print help");
    eprintln!("    -V   --version         print version");
    eprintln!("    -r   -o ro             open archive in read-only mode");
    eprintln!("    -o force_precise_time  keep sub-second timestamps");
    eprintln!();
}

fn print_version() {
    eprintln!("{} version: {}", PROGRAM, env!("CARGO_PKG_VERSION"));
    eprintln!("zip crate version: {}", ZIP_CRATE_VERSION);
}

fn access_ok(path: &Path, mode: libc::c_int) -> bool {
    let Ok(path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(path.as_ptr(), mode) == 0 }
}

/// Saving rewrites the archive and renames it into place, so both the
/// file and its parent directory must be writable.
fn is_file_writable(path: &Path) -> bool {
    if access_ok(path, libc::F_OK) && !access_ok(path, libc::W_OK) {
        return false;
    }
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    !(access_ok(parent, libc::F_OK) && !access_ok(parent, libc::W_OK))
}

fn known_mount_option(opt: &str) -> Option<MountOption> {
    match opt {
        "allow_other" => Some(MountOption::AllowOther),
        "allow_root" => Some(MountOption::AllowRoot),
        "auto_unmount" => Some(MountOption::AutoUnmount),
        "dev" => Some(MountOption::Dev),
        "nodev" => Some(MountOption::NoDev),
        "suid" => Some(MountOption::Suid),
        "nosuid" => Some(MountOption::NoSuid),
        "exec" => Some(MountOption::Exec),
        "noexec" => Some(MountOption::NoExec),
        "atime" => Some(MountOption::Atime),
        "noatime" => Some(MountOption::NoAtime),
        "sync" => Some(MountOption::Sync),
        "async" => Some(MountOption::Async),
        "dirsync" => Some(MountOption::DirSync),
        _ => None,
    }
}

fn main() -> ExitCode {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print_usage();
        return ExitCode::SUCCESS;
    }
    if args.contains(["-V", "--version"]) {
        print_version();
        return ExitCode::SUCCESS;
    }

    let mut readonly = args.contains("-r");
    let mut force_precise_time = false;
    let mut mount_opts = vec![
        MountOption::FSName(PROGRAM.to_string()),
        MountOption::DefaultPermissions,
    ];
    loop {
        match args.opt_value_from_str::<_, String>("-o") {
            Ok(Some(group)) => {
                for opt in group.split(',').filter(|o| !o.is_empty()) {
                    match opt {
                        "ro" => readonly = true,
                        "force_precise_time" => force_precise_time = true,
                        other => match known_mount_option(other) {
                            Some(v) => mount_opts.push(v),
                            None => mount_opts.push(MountOption::CUSTOM(other.to_string())),
                        },
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("{}: {}", PROGRAM, e);
                return ExitCode::FAILURE;
            }
        }
    }

    let rest = args.finish();
    if rest.len() != 2 {
        if rest.len() > 2 {
            eprintln!(
                "{}: only two arguments allowed: filename and mountpoint",
                PROGRAM
            );
        } else {
            print_usage();
        }
        return ExitCode::FAILURE;
    }
    let archive = match std::env::current_dir() {
        Ok(cwd) => cwd.join(&rest[0]).clean(),
        Err(_) => PathBuf::from(&rest[0]),
    };
    let mountpoint = PathBuf::from(&rest[1]);

    // an unwritable archive (or parent directory) degrades to read-only
    if !readonly && !is_file_writable(&archive) {
        readonly = true;
    }
    if readonly {
        mount_opts.push(MountOption::RO);
    }

    let codec = match ZipCodec::open(&archive, readonly) {
        Ok(codec) => codec,
        Err(e) => {
            eprintln!("{}: cannot open {}: {}", PROGRAM, archive.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    let session = match Session::open(
        Box::new(codec),
        MountOptions {
            readonly,
            force_precise_time,
        },
        uid,
        gid,
    ) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}: cannot read {}: {}", PROGRAM, archive.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let fs = ZipFs::new(session);
    let commit_failed = fs.commit_flag();
    if let Err(e) = fuser::mount2(fs, &mountpoint, &mount_opts) {
        eprintln!("{}: mount failed: {}", PROGRAM, e);
        return ExitCode::FAILURE;
    }
    if commit_failed.load(Ordering::SeqCst) {
        eprintln!("{}: failed to save the archive", PROGRAM);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
