use crate::{
    fs::ZipFs,
    req_rep::Request,
    session::{MountOptions, Session},
    stub_codec::StubCodec,
};

/// A small archive exercising directories, nested files and symlinks:
/// `docs/`, `docs/readme.txt`, `notes.txt`, `link -> notes.txt`.
pub fn sample_codec() -> StubCodec {
    let mut codec = StubCodec::new();
    codec.push_dir("docs");
    codec.push_file("docs/readme.txt", b"hello from the archive");
    codec.push_file("notes.txt", b"top-level notes");
    codec.push_symlink("link", "notes.txt");
    codec
}

pub fn create_fs() -> ZipFs {
    create_fs_with(sample_codec(), false)
}

pub fn create_fs_readonly() -> ZipFs {
    create_fs_with(sample_codec(), true)
}

pub fn create_fs_with(codec: StubCodec, readonly: bool) -> ZipFs {
    let session = Session::open(
        Box::new(codec),
        MountOptions {
            readonly,
            force_precise_time: false,
        },
        0,
        0,
    )
    .unwrap();
    ZipFs::new(session)
}

pub fn create_fs_precise(codec: StubCodec) -> ZipFs {
    let session = Session::open(
        Box::new(codec),
        MountOptions {
            readonly: false,
            force_precise_time: true,
        },
        0,
        0,
    )
    .unwrap();
    ZipFs::new(session)
}

pub fn req() -> Request {
    Request {
        uid: 0,
        gid: 0,
        pid: 0,
    }
}
