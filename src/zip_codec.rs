//! Production codec over the `zip` crate. Mutations are recorded against a
//! live entry table; `close` materializes them by writing a sibling temp
//! file and renaming it over the original, so a failed save never leaves a
//! half-written archive behind.

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use zip::{read::ZipArchive, write::FileOptions, CompressionMethod, ZipWriter};

use crate::{
    codec::{ArchiveCodec, EntryStat, EntryStream, StreamSource},
    error::Error,
};

fn zerr(e: zip::result::ZipError) -> Error {
    Error::Archive(e.to_string())
}

fn to_zip_datetime(mtime: i64) -> zip::DateTime {
    time::OffsetDateTime::from_unix_timestamp(mtime)
        .ok()
        .and_then(|t| zip::DateTime::try_from(t).ok())
        .unwrap_or_default()
}

enum Origin {
    /// Backed by an entry of the opened archive, by original index.
    Archive(usize),
    /// Backed by a pull source registered through add/replace.
    Pending(Box<dyn StreamSource>),
}

struct Entry {
    name: String,
    stat: EntryStat,
    origin: Origin,
    deleted: bool,
    new_mtime: Option<i64>,
    new_mode: Option<u32>,
}

impl Entry {
    fn meta_changed(&self) -> bool {
        self.new_mtime.is_some() || self.new_mode.is_some()
    }
}

pub struct ZipCodec {
    path: PathBuf,
    archive: ZipArchive<File>,
    entries: Vec<Entry>,
    readonly: bool,
    dirty: bool,
}

impl ZipCodec {
    pub fn open(path: &Path, readonly: bool) -> Result<Self, Error> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file).map_err(zerr)?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let f = archive.by_index_raw(i).map_err(zerr)?;
            let mtime = f
                .last_modified()
                .to_time()
                .map(|t| t.unix_timestamp())
                .unwrap_or(0);
            entries.push(Entry {
                name: f.name().to_string(),
                stat: EntryStat {
                    size: f.size(),
                    mtime,
                    mode: f.unix_mode(),
                    is_dir: f.is_dir(),
                },
                origin: Origin::Archive(i),
                deleted: false,
                new_mtime: None,
                new_mode: None,
            });
        }
        Ok(ZipCodec {
            path: path.to_path_buf(),
            archive,
            entries,
            readonly,
            dirty: false,
        })
    }

    fn entry(&self, index: u64) -> Result<&Entry, Error> {
        self.entries
            .get(index as usize)
            .ok_or_else(|| Error::Archive(format!("no entry {}", index)))
    }

    fn entry_mut(&mut self, index: u64) -> Result<&mut Entry, Error> {
        self.entries
            .get_mut(index as usize)
            .ok_or_else(|| Error::Archive(format!("no entry {}", index)))
    }

    fn check_writable(&self) -> Result<(), Error> {
        if self.readonly {
            Err(Error::Archive("archive opened read-only".into()))
        } else {
            Ok(())
        }
    }
}

struct ZipEntryStream<'a> {
    file: zip::read::ZipFile<'a>,
}

impl EntryStream for ZipEntryStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.file
            .read(buf)
            .map_err(|e| Error::EntryRead(e.to_string()))
    }

    fn close(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }
}

impl ArchiveCodec for ZipCodec {
    fn num_entries(&self) -> u64 {
        self.entries.len() as u64
    }

    fn entry_name(&self, index: u64) -> Result<String, Error> {
        Ok(self.entry(index)?.name.clone())
    }

    fn entry_stat(&self, index: u64) -> Result<EntryStat, Error> {
        Ok(self.entry(index)?.stat.clone())
    }

    fn entry_open(&mut self, index: u64) -> Result<Box<dyn EntryStream + '_>, Error> {
        let archive_index = match self.entry(index)?.origin {
            Origin::Archive(i) => i,
            Origin::Pending(_) => {
                return Err(Error::Archive(format!("entry {} has no stored data", index)))
            }
        };
        let file = self.archive.by_index(archive_index).map_err(zerr)?;
        Ok(Box::new(ZipEntryStream { file }))
    }

    fn add(&mut self, name: &str, source: Box<dyn StreamSource>) -> Result<u64, Error> {
        self.check_writable()?;
        let st = source.stat();
        self.entries.push(Entry {
            name: name.to_string(),
            stat: EntryStat {
                size: st.size,
                mtime: st.mtime,
                mode: Some(st.mode),
                is_dir: st.mode & libc::S_IFMT == libc::S_IFDIR,
            },
            origin: Origin::Pending(source),
            deleted: false,
            new_mtime: None,
            new_mode: None,
        });
        self.dirty = true;
        Ok(self.entries.len() as u64 - 1)
    }

    fn replace(&mut self, index: u64, source: Box<dyn StreamSource>) -> Result<(), Error> {
        self.check_writable()?;
        let st = source.stat();
        let entry = self.entry_mut(index)?;
        entry.stat.size = st.size;
        entry.stat.mtime = st.mtime;
        entry.origin = Origin::Pending(source);
        self.dirty = true;
        Ok(())
    }

    fn rename(&mut self, index: u64, new_name: &str) -> Result<(), Error> {
        self.check_writable()?;
        self.entry_mut(index)?.name = new_name.to_string();
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, index: u64) -> Result<(), Error> {
        self.check_writable()?;
        self.entry_mut(index)?.deleted = true;
        self.dirty = true;
        Ok(())
    }

    fn set_times(&mut self, index: u64, mtime: i64) -> Result<(), Error> {
        self.check_writable()?;
        self.entry_mut(index)?.new_mtime = Some(mtime);
        self.dirty = true;
        Ok(())
    }

    fn set_mode(&mut self, index: u64, mode: u32) -> Result<(), Error> {
        self.check_writable()?;
        self.entry_mut(index)?.new_mode = Some(mode);
        self.dirty = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if !self.dirty || self.readonly {
            return Ok(());
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive.zip".into());
        let tmp_path = self
            .path
            .with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));

        let tmp = File::create(&tmp_path)?;
        let mut writer = ZipWriter::new(tmp);
        let ZipCodec {
            archive, entries, ..
        } = self;
        let res = write_entries(archive, entries, &mut writer);
        let res = res.and_then(|()| writer.finish().map_err(zerr));
        match res {
            Ok(out) => {
                out.sync_all()?;
                drop(out);
                std::fs::rename(&tmp_path, &self.path)?;
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                Err(e)
            }
        }
    }

    fn discard(&mut self) {
        for entry in &mut self.entries {
            entry.deleted = false;
            entry.new_mtime = None;
            entry.new_mode = None;
        }
        self.dirty = false;
    }
}

fn file_options(mode: u32, mtime: i64, size: u64) -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(mode & 0o7777)
        .last_modified_time(to_zip_datetime(mtime))
        .large_file(size > u32::MAX as u64)
}

fn write_entries(
    archive: &mut ZipArchive<File>,
    entries: &mut [Entry],
    writer: &mut ZipWriter<File>,
) -> Result<(), Error> {
    for entry in entries.iter_mut() {
        if entry.deleted {
            continue;
        }
        let meta_changed = entry.meta_changed();
        match &mut entry.origin {
            Origin::Archive(i) => {
                if meta_changed {
                    // raw copy cannot rewrite header fields, so recompress
                    let mode = entry
                        .new_mode
                        .or(entry.stat.mode)
                        .unwrap_or(if entry.stat.is_dir { 0o040755 } else { 0o100644 });
                    let mtime = entry.new_mtime.unwrap_or(entry.stat.mtime);
                    let mut src = archive.by_index(*i).map_err(zerr)?;
                    let mut data = Vec::new();
                    src.read_to_end(&mut data)?;
                    drop(src);
                    write_fresh_entry(writer, &entry.name, mode, mtime, data.len() as u64, &data)?;
                } else {
                    let src = archive.by_index_raw(*i).map_err(zerr)?;
                    if src.name() == entry.name {
                        writer.raw_copy_file(src).map_err(zerr)?;
                    } else {
                        let name = entry.name.clone();
                        writer.raw_copy_file_rename(src, name).map_err(zerr)?;
                    }
                }
            }
            Origin::Pending(source) => {
                let st = source.stat();
                let mode = entry.new_mode.unwrap_or(st.mode);
                let mtime = entry.new_mtime.unwrap_or(st.mtime);
                source.open();
                match mode & libc::S_IFMT {
                    libc::S_IFDIR => {
                        writer
                            .add_directory(entry.name.trim_end_matches('/'), file_options(mode, mtime, 0))
                            .map_err(zerr)?;
                    }
                    libc::S_IFLNK => {
                        let mut target = Vec::new();
                        let mut buf = [0u8; 4096];
                        loop {
                            let n = source.read(&mut buf);
                            if n == 0 {
                                break;
                            }
                            target.extend_from_slice(&buf[..n]);
                        }
                        let target = String::from_utf8_lossy(&target).into_owned();
                        writer
                            .add_symlink(&entry.name, &target, file_options(mode, mtime, 0))
                            .map_err(zerr)?;
                    }
                    _ => {
                        writer
                            .start_file(&entry.name, file_options(mode, mtime, st.size))
                            .map_err(zerr)?;
                        let mut buf = [0u8; 4096];
                        loop {
                            let n = source.read(&mut buf);
                            if n == 0 {
                                break;
                            }
                            writer.write_all(&buf[..n])?;
                        }
                    }
                }
                source.close();
            }
        }
    }
    Ok(())
}

fn write_fresh_entry(
    writer: &mut ZipWriter<File>,
    name: &str,
    mode: u32,
    mtime: i64,
    size: u64,
    data: &[u8],
) -> Result<(), Error> {
    let opts = file_options(mode, mtime, size);
    match mode & libc::S_IFMT {
        libc::S_IFDIR => writer
            .add_directory(name.trim_end_matches('/'), opts)
            .map_err(zerr),
        libc::S_IFLNK => {
            let target = String::from_utf8_lossy(data).into_owned();
            writer.add_symlink(name, &target, opts).map_err(zerr)
        }
        _ => {
            writer.start_file(name, opts).map_err(zerr)?;
            writer.write_all(data)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs::File,
        io::Write,
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use zip::{write::FileOptions, ZipWriter};

    use crate::{
        bigbuffer::BigBuffer,
        codec::ArchiveCodec,
        error::Error,
    };

    use super::ZipCodec;

    fn scratch_zip(entries: &[(&str, &[u8])]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("zipmount-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir(&dir).unwrap();
        let path = dir.join("fixture.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        for (name, data) in entries {
            if let Some(dir_name) = name.strip_suffix('/') {
                writer
                    .add_directory(dir_name, FileOptions::default())
                    .unwrap();
            } else {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap();
        path
    }

    fn read_entry(codec: &mut ZipCodec, index: u64) -> Vec<u8> {
        let size = codec.entry_stat(index).unwrap().size;
        let bb = BigBuffer::read_from_codec(codec, index, size).unwrap();
        let mut buf = vec![0u8; size as usize];
        bb.read(&mut buf, 0);
        buf
    }

    #[test]
    fn opens_and_reads_entries() {
        let path = scratch_zip(&[("docs/", b""), ("docs/a.txt", b"alpha"), ("b.txt", b"beta")]);
        let mut codec = ZipCodec::open(&path, true).unwrap();
        assert_eq!(codec.num_entries(), 3);
        assert_eq!(codec.entry_name(1).unwrap(), "docs/a.txt");
        assert!(codec.entry_stat(0).unwrap().is_dir);
        assert_eq!(read_entry(&mut codec, 1), b"alpha");
        assert_eq!(read_entry(&mut codec, 2), b"beta");
    }

    #[test]
    fn readonly_codec_refuses_mutation() {
        let path = scratch_zip(&[("a.txt", b"a")]);
        let mut codec = ZipCodec::open(&path, true).unwrap();
        assert!(matches!(codec.delete(0), Err(Error::Archive(_))));
    }

    #[test]
    fn rewrite_round_trips_through_the_archive() {
        let path = scratch_zip(&[("keep.txt", b"keep me"), ("drop.txt", b"drop me")]);
        let mut codec = ZipCodec::open(&path, false).unwrap();

        // add a file streamed from a buffer, rename the kept entry,
        // delete the other one
        let bb = Arc::new(Mutex::new(BigBuffer::new()));
        bb.lock().unwrap().write(b"fresh contents", 0);
        let mut id = 0;
        BigBuffer::save_to_codec(&bb, &mut codec, "fresh.txt", true, 1700000000, 0o100600, &mut id)
            .unwrap();
        codec.rename(0, "kept.txt").unwrap();
        codec.delete(1).unwrap();
        codec.close().unwrap();

        let mut reopened = ZipCodec::open(&path, true).unwrap();
        assert_eq!(reopened.num_entries(), 2);
        assert_eq!(reopened.entry_name(0).unwrap(), "kept.txt");
        assert_eq!(read_entry(&mut reopened, 0), b"keep me");
        assert_eq!(reopened.entry_name(1).unwrap(), "fresh.txt");
        let stat = reopened.entry_stat(1).unwrap();
        assert_eq!(stat.size, 14);
        assert_eq!(stat.mode.map(|m| m & 0o777), Some(0o600));
        assert_eq!(read_entry(&mut reopened, 1), b"fresh contents");
    }

    #[test]
    fn metadata_change_survives_rewrite() {
        let path = scratch_zip(&[("a.txt", b"contents")]);
        let mut codec = ZipCodec::open(&path, false).unwrap();
        codec.set_mode(0, 0o100640).unwrap();
        codec.set_times(0, 946684800).unwrap();
        codec.close().unwrap();

        let mut reopened = ZipCodec::open(&path, true).unwrap();
        let stat = reopened.entry_stat(0).unwrap();
        assert_eq!(stat.mode.map(|m| m & 0o777), Some(0o640));
        assert_eq!(stat.mtime, 946684800);
        assert_eq!(read_entry(&mut reopened, 0), b"contents");
    }

    #[test]
    fn untouched_archive_is_not_rewritten() {
        let path = scratch_zip(&[("a.txt", b"a")]);
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();
        let mut codec = ZipCodec::open(&path, false).unwrap();
        codec.close().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);
    }
}
