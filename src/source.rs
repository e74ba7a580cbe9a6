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

use crate::{
    consts::DEFAULT_CONTENT_TYPE,
    result::{
        AnyhowResultExt,
        Result,
    },
};
use anyhow::Context;
use bytes::Bytes;
use std::path::{
    Path,
    PathBuf,
};
use tracing::debug;

/// The file to upload, read into memory in its entirety.
#[derive(Debug)]
pub(crate) struct Source {
    pub(crate) path: PathBuf,
    pub(crate) bytes: Bytes,
    pub(crate) content_type: String,
}

impl Source {
    /// Reads the whole file at `path`.
    pub(crate) async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path = path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize file path {}", path.display()))
            .into_source()?;

        debug!("Reading file into memory: {}", path.display());
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
            .into_source()?;
        let content_type = detect_content_type(&path);
        debug!(
            "Read {} bytes with content type {}",
            bytes.len(),
            content_type
        );

        Ok(Self {
            path,
            bytes: Bytes::from(bytes),
            content_type,
        })
    }

    /// The object key used when none is given explicitly: the name of the file.
    pub(crate) fn default_key(&self) -> Result<String> {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| {
                format!(
                    "Can't derive an object key from {}, please provide one explicitly",
                    self.path.display()
                )
            })
            .into_source()
    }

    pub(crate) fn len(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn detect_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_owned()
}
