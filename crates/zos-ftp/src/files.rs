//! Local-file convenience wrappers over the transfer pipeline.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::Path;

use crate::attributes::DataSpec;
use crate::error::Result;
use crate::log;
use crate::session::FtpSession;
use crate::transfer::TransferType;

impl FtpSession {
    /// Upload a local file to `remote`, overwriting it if present.
    /// Dataset attributes, when given, are pinned with one `SITE`
    /// exchange before the store.
    pub fn put(
        &self,
        local: impl AsRef<Path>,
        remote: &str,
        transfer_type: TransferType,
        specs: &[DataSpec],
    ) -> Result<u64> {
        if !specs.is_empty() {
            self.set_data_specs(specs)?;
        }

        let local = local.as_ref();
        log::internal(&format!("attempting to open source file: {}", local.display()));
        let mut file = File::open(local)?;

        log::internal(&format!("starting transfer to: {remote}"));
        let (bytes, _) = self.store_reader(remote, &mut file, transfer_type)?;
        log::internal(&format!(
            "successfully transferred {bytes} bytes to {remote}"
        ));
        Ok(bytes)
    }

    /// Download `remote` into a local file, overwriting it if
    /// present.
    pub fn get(
        &self,
        remote: &str,
        local: impl AsRef<Path>,
        transfer_type: TransferType,
    ) -> Result<u64> {
        let local = local.as_ref();
        log::internal(&format!("creating local file: {}", local.display()));
        let mut file = File::create(local)?;

        log::internal(&format!("starting transfer from: {remote}"));
        let (bytes, _) = self.retrieve_writer(remote, &mut file, transfer_type)?;
        log::internal(&format!(
            "successfully transferred {bytes} bytes from {remote}"
        ));
        Ok(bytes)
    }

    /// Download `remote` starting at `offset`, writing into the local
    /// file at the same offset. Offset zero truncates first.
    pub fn get_at(
        &self,
        remote: &str,
        local: impl AsRef<Path>,
        transfer_type: TransferType,
        offset: u64,
    ) -> Result<u64> {
        let local = local.as_ref();
        log::internal(&format!("opening local file: {}", local.display()));
        let mut file = OpenOptions::new().create(true).write(true).open(local)?;

        if offset == 0 {
            file.set_len(0)?;
        }
        file.seek(SeekFrom::Start(offset))?;

        log::internal(&format!(
            "starting transfer from {remote} at offset {offset}"
        ));
        let (bytes, _) =
            self.retrieve_writer_at(remote, &mut file, transfer_type, Some(offset))?;
        log::internal(&format!(
            "successfully transferred {bytes} bytes from {remote}"
        ));
        Ok(bytes)
    }
}
