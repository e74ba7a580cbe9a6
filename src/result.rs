// Copyright 2024 TAKKT Industrial & Packaging GmbH
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
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{
    Display,
    Formatter,
};

macro_rules! bail {
    ($($tt:tt)*) => {
        return Err(anyhow::anyhow!($($tt)*)).into_config()
    };
}
pub(crate) use bail;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub(crate) enum Error {
    /// Missing or invalid settings. Raised before any network call is made.
    Config(anyhow::Error),
    /// The file to upload could not be read, or can't be uploaded as a multipart upload.
    Source(anyhow::Error),
    /// The storage service didn't create the multipart upload. Nothing needs cleaning up.
    OpenTransaction(anyhow::Error),
    /// A part exhausted its attempts, or the upload was cancelled while parts were in flight.
    PartFailed(PartFailure),
    /// Every part was uploaded but completing the multipart upload failed.
    ///
    /// The state of the upload on the remote side is unknown at this point: the service may or
    /// may not have assembled the object.
    Finalize {
        upload_id: String,
        source: anyhow::Error,
    },
}

#[derive(Debug)]
pub(crate) struct PartFailure {
    pub(crate) upload_id: String,
    pub(crate) part_number: i32,
    pub(crate) attempts: u32,
    pub(crate) cause: anyhow::Error,
    /// Set if aborting the multipart upload failed as well.
    pub(crate) abort_error: Option<anyhow::Error>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(err) => write!(f, "Invalid configuration: {:#}", err),
            Error::Source(err) => write!(f, "Unable to read the file to upload: {:#}", err),
            Error::OpenTransaction(err) => {
                write!(f, "Failed to create the multipart upload: {:#}", err)
            }
            Error::PartFailed(failure) => Display::fmt(failure, f),
            Error::Finalize { upload_id, source } => write!(
                f,
                "Failed to complete multipart upload {}, the upload may or may not have been assembled: {:#}",
                upload_id, source,
            ),
        }
    }
}

impl Display for PartFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Part {} of multipart upload {} failed after {} attempt(s): {:#}",
            self.part_number, self.upload_id, self.attempts, self.cause,
        )?;
        if let Some(abort_error) = &self.abort_error {
            write!(
                f,
                " (aborting the multipart upload failed as well: {:#})",
                abort_error
            )?;
        }
        Ok(())
    }
}

pub(crate) trait StdResultExt<T, E> {
    fn into_config(self) -> Result<T, Error>;
}

impl<T, E> StdResultExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_config(self) -> Result<T, Error> {
        self.map_err(|err| Error::Config(anyhow::Error::new(err)))
    }
}

pub(crate) trait AnyhowResultExt<T> {
    fn into_config(self) -> Result<T, Error>;

    fn into_source(self) -> Result<T, Error>;

    fn into_open_transaction(self) -> Result<T, Error>;
}

impl<T> AnyhowResultExt<T> for std::result::Result<T, anyhow::Error> {
    fn into_config(self) -> Result<T, Error> {
        self.map_err(Error::Config)
    }

    fn into_source(self) -> Result<T, Error> {
        self.map_err(Error::Source)
    }

    fn into_open_transaction(self) -> Result<T, Error> {
        self.map_err(Error::OpenTransaction)
    }
}
